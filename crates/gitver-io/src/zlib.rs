use std::io::{self, Read};

use flate2::read::ZlibDecoder;

/// A non-seekable, length-bounded readable byte stream over a zlib frame.
///
/// Two callers feed this the same way: the pack reader, which knows the
/// declared uncompressed size from the entry header (or the delta script's
/// result size) before a single byte has been inflated, and the loose
/// object reader, which knows it from the `"<type> <len>\0"` prefix inside
/// the inflated stream itself. Either way, by the time a `ZLibStream` is
/// constructed the bound is known, so reads past it are refused rather than
/// trusting zlib's own end-of-stream marker alone.
pub struct ZLibStream<R> {
    inflate: ZlibDecoder<R>,
    remaining: u64,
}

impl<R: Read> ZLibStream<R> {
    /// Wrap `source`, positioned at the start of a zlib frame, bounding the
    /// inflated output to `declared_len` bytes.
    pub fn new(source: R, declared_len: u64) -> Self {
        Self {
            inflate: ZlibDecoder::new(source),
            remaining: declared_len,
        }
    }

    /// Bytes not yet read from this stream.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Read the stream to completion into a fresh `Vec`.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.remaining as usize);
        self.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read> Read for ZLibStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let n = self.inflate.read(&mut buf[..want])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn reads_declared_length() {
        let payload = b"tree 12345\0rest of commit body here".to_vec();
        let compressed = zlib_compress(&payload);
        let mut stream = ZLibStream::new(compressed.as_slice(), payload.len() as u64);
        let out = {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            buf
        };
        assert_eq!(out, payload);
    }

    #[test]
    fn stops_at_declared_bound_even_if_more_available() {
        let payload = b"0123456789".to_vec();
        let compressed = zlib_compress(&payload);
        let stream = ZLibStream::new(compressed.as_slice(), 4);
        let out = stream.read_to_vec().unwrap();
        assert_eq!(out, b"0123");
    }

    #[test]
    fn empty_payload() {
        let compressed = zlib_compress(b"");
        let stream = ZLibStream::new(compressed.as_slice(), 0);
        assert_eq!(stream.remaining(), 0);
        let out = stream.read_to_vec().unwrap();
        assert!(out.is_empty());
    }
}
