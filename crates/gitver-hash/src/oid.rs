use std::fmt;
use std::str::FromStr;

use crate::hex::{hex_decode, hex_to_string};
use crate::HashError;

/// A git object identifier: the 20-byte SHA-1 digest of an object's canonical
/// `"<type> <len>\0<payload>"` encoding.
///
/// `ObjectId::EMPTY` (all zeros) is the distinguished "absent" value used
/// throughout the reader to mean "no object" without needing an `Option`
/// at every call site that cares about unborn branches or missing paths.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The all-zero OID, meaning "absent".
    pub const EMPTY: Self = Self([0u8; 20]);

    /// Construct from a raw 20-byte digest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 20 {
            return Err(HashError::InvalidHashLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Construct from an owned 20-byte array (infallible).
    pub fn from_array(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse 40 hex characters, case-insensitive. Fails on length or alphabet
    /// mismatch with `InvalidObjectId`-class errors from [`HashError`].
    pub fn parse(hex: &str) -> Result<Self, HashError> {
        if hex.len() != 40 {
            return Err(HashError::InvalidHexLength {
                expected: 40,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; 20];
        hex_decode(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the distinguished "absent" value.
    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// 40 lowercase hex characters.
    pub fn format(&self) -> String {
        hex_to_string(&self.0)
    }

    /// The first byte of the digest, used to index a fan-out table.
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// The loose-object path components: `("xx", "yyyy...")`.
    pub fn loose_path_parts(&self) -> (String, String) {
        let hex = self.format();
        (hex[..2].to_string(), hex[2..].to_string())
    }

    /// Reinterpret the first 2 bytes of the digest as a `u16` in host byte
    /// order. Used by the version-encoding collaborator to derive a short,
    /// stable numeric suffix from a commit hash.
    pub fn truncated_u16(&self) -> u16 {
        u16::from_ne_bytes([self.0[0], self.0[1]])
    }

    /// Reinterpret the first 4 bytes of the digest as an `i32` in host byte
    /// order. Used by the version-encoding collaborator.
    pub fn truncated_i32(&self) -> i32 {
        i32::from_ne_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.format()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HEX: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";

    #[test]
    fn parse_and_format_roundtrip() {
        let oid = ObjectId::parse(HEX).unwrap();
        assert_eq!(oid.format(), HEX);
        assert_eq!(ObjectId::parse(&oid.format()).unwrap(), oid);
    }

    #[test]
    fn parse_is_case_insensitive() {
        let lower = ObjectId::parse(HEX).unwrap();
        let upper = ObjectId::parse(&HEX.to_ascii_uppercase()).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.format(), HEX, "format always lowercases");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            ObjectId::parse("abcd"),
            Err(HashError::InvalidHexLength { .. })
        ));
    }

    #[test]
    fn rejects_bad_alphabet() {
        let bad = "z".repeat(40);
        assert!(matches!(
            ObjectId::parse(&bad),
            Err(HashError::InvalidHex { .. })
        ));
    }

    #[test]
    fn empty_is_all_zero_and_distinguished() {
        assert!(ObjectId::EMPTY.is_empty());
        let nonzero = ObjectId::parse(HEX).unwrap();
        assert!(!nonzero.is_empty());
        assert_ne!(ObjectId::EMPTY, nonzero);
    }

    #[test]
    fn ordering_is_lexicographic_on_bytes() {
        let a = ObjectId::parse("0000000000000000000000000000000000000001").unwrap();
        let b = ObjectId::parse("0000000000000000000000000000000000000002").unwrap();
        assert!(a < b);
    }

    #[test]
    fn usable_as_hashmap_key() {
        let oid = ObjectId::parse(HEX).unwrap();
        let mut map = HashMap::new();
        map.insert(oid, "value");
        assert_eq!(map.get(&oid), Some(&"value"));
    }

    #[test]
    fn loose_path_parts_split_2_38() {
        let oid = ObjectId::parse(HEX).unwrap();
        let (dir, file) = oid.loose_path_parts();
        assert_eq!(dir, "da");
        assert_eq!(file, &HEX[2..]);
    }

    #[test]
    fn truncated_views_read_leading_bytes() {
        let oid = ObjectId::from_array([
            0xef, 0xbe, 0xad, 0xde, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]);
        assert_eq!(oid.truncated_u16(), u16::from_ne_bytes([0xef, 0xbe]));
        assert_eq!(
            oid.truncated_i32(),
            i32::from_ne_bytes([0xef, 0xbe, 0xad, 0xde])
        );
    }
}
