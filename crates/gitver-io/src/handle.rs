use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A bounded FIFO pool of open file handles against a single path.
///
/// A Repository is not required to be safe for concurrent use across
/// threads (callers wanting parallelism open separate Repository
/// instances), so the pool's queue is a plain `RefCell`, not a `Mutex`.
///
/// Obtaining a handle either dequeues an idle one (reset to offset 0) or
/// opens a new one. Returning a handle re-enqueues it, unless the pool is
/// already at capacity, in which case it is simply dropped (closed).
pub struct HandlePool {
    path: PathBuf,
    idle: RefCell<VecDeque<File>>,
    capacity: usize,
}

/// No hard cap by default: a workload with deep delta chains may legitimately
/// want many concurrently-checked-out handles during recursive base lookups.
const DEFAULT_CAPACITY: usize = usize::MAX;

impl HandlePool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            idle: RefCell::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check out a handle, reset to the start of the file.
    pub fn acquire(&self) -> io::Result<PooledHandle<'_>> {
        let existing = self.idle.borrow_mut().pop_front();
        let mut file = match existing {
            Some(f) => f,
            None => File::open(&self.path)?,
        };
        file.seek(SeekFrom::Start(0))?;
        Ok(PooledHandle {
            pool: self,
            file: Some(file),
        })
    }

    fn release(&self, file: File) {
        let mut idle = self.idle.borrow_mut();
        if idle.len() < self.capacity {
            idle.push_back(file);
        }
        // else: drop it, closing the fd.
    }

    /// Number of idle handles currently held by the pool (for tests).
    pub fn idle_count(&self) -> usize {
        self.idle.borrow().len()
    }
}

/// A checked-out file handle. Re-enters the pool on drop.
pub struct PooledHandle<'a> {
    pool: &'a HandlePool,
    file: Option<File>,
}

impl PooledHandle<'_> {
    /// Seek to an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.file_mut().seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Read exactly `buf.len()` bytes starting at `offset`.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.seek_to(offset)?;
        self.file_mut().read_exact(buf)
    }

    fn file_mut(&mut self) -> &mut File {
        self.file.as_mut().expect("file present until drop")
    }
}

impl Read for PooledHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut().read(buf)
    }
}

impl Drop for PooledHandle<'_> {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            self.pool.release(file);
        }
    }
}
