//! Fixed-schema record: `{ a: u32, b: string[<=11] }`.
//!
//! A row is serialized to exactly 16 bytes on disk: 12 bytes holding `b`
//! (NUL-padded, not required to carry a trailing NUL when `b` is 11 bytes
//! long) followed by 4 little-endian bytes holding `a`. This is also the
//! key layout used by every leaf and interior cell in the tree.

use crate::errors::Error;

/// Column `b`'s maximum length in characters.
pub const COLUMN_B_MAX_LEN: usize = 11;
/// On-disk width of the key field (`b`, NUL-padded).
pub const KEY_SIZE: usize = 12;
/// On-disk width of the value field (`a`).
pub const VALUE_SIZE: usize = 4;
/// Total cell width shared by leaf and interior nodes.
pub const ROW_SIZE: usize = KEY_SIZE + VALUE_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub a: u32,
    pub b: String,
}

impl Row {
    pub fn new(a: u32, b: &str) -> Result<Row, Error> {
        if b.len() > COLUMN_B_MAX_LEN {
            return Err(Error::BadInput(
                "String for column `b` is too long.".to_string(),
            ));
        }
        Ok(Row {
            a,
            b: b.to_string(),
        })
    }

    /// Encodes the key field only: 12 bytes, NUL-padded.
    pub fn encode_key(b: &str) -> [u8; KEY_SIZE] {
        let mut buf = [0u8; KEY_SIZE];
        let bytes = b.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        buf
    }

    /// Decodes a 12-byte key field back into a `String`, stopping at the
    /// first NUL byte (C-string semantics).
    pub fn decode_key(raw: &[u8]) -> String {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }

    /// Encodes the full 16-byte cell payload: `[key(12) | a(4)]`.
    pub fn encode(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        buf[..KEY_SIZE].copy_from_slice(&Self::encode_key(&self.b));
        buf[KEY_SIZE..ROW_SIZE].copy_from_slice(&self.a.to_le_bytes());
        buf
    }

    pub fn decode(raw: &[u8]) -> Row {
        let b = Self::decode_key(&raw[..KEY_SIZE]);
        let mut a_bytes = [0u8; VALUE_SIZE];
        a_bytes.copy_from_slice(&raw[KEY_SIZE..ROW_SIZE]);
        Row {
            a: u32::from_le_bytes(a_bytes),
            b,
        }
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.a, self.b)
    }
}
