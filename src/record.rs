//! On-disk layout constants and the fixed-size catalog record
//!
//! Every record occupies one 64-byte slot in the reserved region. Fields
//! are encoded little-endian, field by field; the in-memory struct layout
//! is never written to disk.

use crate::error::{CapsuleError, Result};
use serde::Serialize;

/// Block size in bytes (1 KiB)
pub const BLOCK_SIZE: usize = 1024;

/// Number of leading blocks reserved for the catalog
pub const RESERVED_BLOCKS: u32 = 8;

/// Serialized size of one catalog slot
pub const RECORD_SIZE: usize = 64;

/// Maximum number of records the reserved region can hold
pub const CATALOG_CAPACITY: usize = RESERVED_BLOCKS as usize * BLOCK_SIZE / RECORD_SIZE;

/// Width of the on-disk name field, including the terminating NUL
pub const NAME_FIELD_LEN: usize = 48;

/// Maximum significant name length in bytes
pub const MAX_NAME_LEN: usize = NAME_FIELD_LEN - 1;

/// Number of blocks needed to hold `byte_len` bytes of content
pub fn blocks_for(byte_len: u32) -> u32 {
    byte_len.div_ceil(BLOCK_SIZE as u32)
}

/// One stored item's catalog entry
///
/// Records in memory are always in use; the on-disk `used` flag only marks
/// which slots of the reserved region hold live records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// First data block index (≥ RESERVED_BLOCKS)
    pub begin: u32,

    /// Logical content size in bytes
    pub byte_len: u32,

    /// Occupied block count: ceil(byte_len / BLOCK_SIZE)
    pub blocks: u32,

    /// Item name, unique within a container, at most 47 bytes
    pub name: String,
}

impl Record {
    /// Create a record for `byte_len` bytes of content at `begin`
    pub fn new(name: impl Into<String>, begin: u32, byte_len: u32) -> Self {
        Record {
            begin,
            byte_len,
            blocks: blocks_for(byte_len),
            name: name.into(),
        }
    }

    /// One past the last occupied block
    pub fn end(&self) -> u32 {
        self.begin + self.blocks
    }

    /// Serialize into a 64-byte slot
    pub fn encode(&self, slot: &mut [u8]) -> Result<()> {
        debug_assert_eq!(slot.len(), RECORD_SIZE);

        let name = self.name.as_bytes();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(CapsuleError::InvalidName(self.name.clone()));
        }

        slot[0..4].copy_from_slice(&1u32.to_le_bytes());
        slot[4..8].copy_from_slice(&self.begin.to_le_bytes());
        slot[8..12].copy_from_slice(&self.byte_len.to_le_bytes());
        slot[12..16].copy_from_slice(&self.blocks.to_le_bytes());

        slot[16..].fill(0);
        slot[16..16 + name.len()].copy_from_slice(name);

        Ok(())
    }

    /// Parse a 64-byte slot; `Ok(None)` for unused slots
    pub fn decode(slot: &[u8]) -> Result<Option<Self>> {
        debug_assert_eq!(slot.len(), RECORD_SIZE);

        let used = u32::from_le_bytes(slot[0..4].try_into().unwrap());
        if used == 0 {
            return Ok(None);
        }

        let begin = u32::from_le_bytes(slot[4..8].try_into().unwrap());
        let byte_len = u32::from_le_bytes(slot[8..12].try_into().unwrap());
        let blocks = u32::from_le_bytes(slot[12..16].try_into().unwrap());

        let name_field = &slot[16..16 + NAME_FIELD_LEN];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_LEN);
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(CapsuleError::CorruptContainer(
                "catalog slot marked used but its name is empty or unterminated".into(),
            ));
        }
        let name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| {
                CapsuleError::CorruptContainer("catalog slot name is not valid UTF-8".into())
            })?
            .to_string();

        if begin < RESERVED_BLOCKS {
            return Err(CapsuleError::CorruptContainer(format!(
                "record \"{name}\" begins at block {begin}, inside the reserved region"
            )));
        }
        if blocks != blocks_for(byte_len) {
            return Err(CapsuleError::CorruptContainer(format!(
                "record \"{name}\" block count {blocks} does not match its {byte_len}-byte length"
            )));
        }

        Ok(Some(Record {
            begin,
            byte_len,
            blocks,
            name,
        }))
    }
}

/// Validate a name for use as a catalog key
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CapsuleError::InvalidName("empty name".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CapsuleError::InvalidName(format!(
            "\"{name}\" is longer than {MAX_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_for() {
        assert_eq!(blocks_for(0), 0);
        assert_eq!(blocks_for(1), 1);
        assert_eq!(blocks_for(1024), 1);
        assert_eq!(blocks_for(1025), 2);
        assert_eq!(blocks_for(1500), 2);
    }

    #[test]
    fn test_capacity_constant() {
        assert_eq!(CATALOG_CAPACITY, 128);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let record = Record::new("report.txt", 10, 1500);
        let mut slot = [0u8; RECORD_SIZE];
        record.encode(&mut slot).unwrap();

        let decoded = Record::decode(&slot).unwrap().unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.blocks, 2);
        assert_eq!(decoded.end(), 12);
    }

    #[test]
    fn test_decode_unused_slot() {
        let slot = [0u8; RECORD_SIZE];
        assert!(Record::decode(&slot).unwrap().is_none());
    }

    #[test]
    fn test_encode_rejects_overlong_name() {
        let record = Record::new("n".repeat(MAX_NAME_LEN + 1), 8, 100);
        let mut slot = [0u8; RECORD_SIZE];
        assert!(matches!(
            record.encode(&mut slot),
            Err(CapsuleError::InvalidName(_))
        ));
    }

    #[test]
    fn test_decode_rejects_begin_in_reserved_region() {
        let record = Record::new("a.txt", 8, 100);
        let mut slot = [0u8; RECORD_SIZE];
        record.encode(&mut slot).unwrap();
        slot[4..8].copy_from_slice(&3u32.to_le_bytes());

        assert!(matches!(
            Record::decode(&slot),
            Err(CapsuleError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_decode_rejects_inconsistent_block_count() {
        let record = Record::new("a.txt", 8, 100);
        let mut slot = [0u8; RECORD_SIZE];
        record.encode(&mut slot).unwrap();
        slot[12..16].copy_from_slice(&7u32.to_le_bytes());

        assert!(matches!(
            Record::decode(&slot),
            Err(CapsuleError::CorruptContainer(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8_name() {
        let record = Record::new("a.txt", 8, 100);
        let mut slot = [0u8; RECORD_SIZE];
        record.encode(&mut slot).unwrap();
        slot[16] = 0xFF;
        slot[17] = 0xFE;

        assert!(matches!(
            Record::decode(&slot),
            Err(CapsuleError::CorruptContainer(_))
        ));
    }
}
