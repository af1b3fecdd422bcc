use crate::{HashError, ObjectId};

/// Fan-out table mapping a hash's first byte to a cumulative object count.
///
/// Used by pack index files for fast lookup: entry `b` holds the number of
/// objects whose first hash byte is `<= b`, so `range(b)` bounds a binary
/// search over the sorted name table to the objects starting with `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutTable {
    table: [u32; 256],
}

impl FanoutTable {
    /// Build a fan-out table from a sorted slice of OIDs.
    ///
    /// The OIDs **must** be sorted; this function does not verify order.
    pub fn build(oids: &[ObjectId]) -> Self {
        let mut table = [0u32; 256];
        for oid in oids {
            table[oid.first_byte() as usize] += 1;
        }
        for i in 1..256 {
            table[i] += table[i - 1];
        }
        Self { table }
    }

    /// The index range `[start, end)` into the sorted name table for OIDs
    /// whose first byte equals `first_byte`.
    pub fn range(&self, first_byte: u8) -> std::ops::Range<usize> {
        let end = self.table[first_byte as usize] as usize;
        let start = if first_byte == 0 {
            0
        } else {
            self.table[(first_byte - 1) as usize] as usize
        };
        start..end
    }

    /// Total number of objects tracked by this fan-out table.
    pub fn total(&self) -> u32 {
        self.table[255]
    }

    /// Read from the on-disk format used by pack index files: 256 big-endian
    /// `u32` values (1024 bytes).
    pub fn from_bytes(data: &[u8]) -> Result<Self, HashError> {
        if data.len() < 1024 {
            return Err(HashError::InvalidHashLength {
                expected: 1024,
                actual: data.len(),
            });
        }
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let offset = i * 4;
            *entry = u32::from_be_bytes(data[offset..offset + 4].try_into().unwrap());
        }
        Self::validate(&table)?;
        Ok(Self { table })
    }

    fn validate(table: &[u32; 256]) -> Result<(), HashError> {
        for i in 1..256 {
            if table[i] < table[i - 1] {
                return Err(HashError::InvalidHashLength {
                    expected: table[i - 1] as usize,
                    actual: table[i] as usize,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_oid(first_byte: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[0] = first_byte;
        ObjectId::from_array(bytes)
    }

    #[test]
    fn build_and_lookup() {
        let mut oids: Vec<ObjectId> =
            vec![make_oid(0), make_oid(0), make_oid(1), make_oid(5), make_oid(0xff)];
        oids.sort();

        let ft = FanoutTable::build(&oids);
        assert_eq!(ft.total(), 5);
        assert_eq!(ft.range(0), 0..2);
        assert_eq!(ft.range(1), 2..3);
        assert_eq!(ft.range(2), 3..3);
        assert_eq!(ft.range(5), 3..4);
        assert_eq!(ft.range(0xff), 4..5);
    }

    #[test]
    fn bytes_roundtrip() {
        let oids: Vec<ObjectId> = (0..=255u8).map(make_oid).collect();
        let ft = FanoutTable::build(&oids);
        let mut buf = Vec::with_capacity(1024);
        for v in ft.table {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        let ft2 = FanoutTable::from_bytes(&buf).unwrap();
        assert_eq!(ft, ft2);
    }

    #[test]
    fn rejects_non_decreasing_violation() {
        let mut buf = vec![0u8; 1024];
        buf[0..4].copy_from_slice(&10u32.to_be_bytes());
        buf[4..8].copy_from_slice(&5u32.to_be_bytes());
        assert!(FanoutTable::from_bytes(&buf).is_err());
    }

    #[test]
    fn from_bytes_too_short() {
        assert!(matches!(
            FanoutTable::from_bytes(&[0u8; 100]),
            Err(HashError::InvalidHashLength { .. })
        ));
    }
}
