//! Fixed-capacity catalog of stored items
//!
//! The catalog lives in the container's reserved region as an array of
//! 64-byte slots. In memory it holds only live records, kept sorted by
//! ascending `begin` after every mutation; the allocator walks the sorted
//! sequence to find gaps, so the ordering is a correctness requirement,
//! not a serialization nicety.

use crate::error::{CapsuleError, Result};
use crate::record::{Record, CATALOG_CAPACITY, RECORD_SIZE};

/// In-memory catalog, sorted by ascending `begin`
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<Record>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Catalog {
            records: Vec::new(),
        }
    }

    /// Parse the reserved region into a catalog
    ///
    /// Keeps only slots marked used and re-sorts by `begin`. Persisted
    /// catalogs are written sorted, but loaded data is not trusted.
    pub fn from_bytes(region: &[u8]) -> Result<Self> {
        debug_assert_eq!(region.len(), CATALOG_CAPACITY * RECORD_SIZE);

        let mut records = Vec::new();
        for slot in region.chunks_exact(RECORD_SIZE) {
            if let Some(record) = Record::decode(slot)? {
                records.push(record);
            }
        }
        records.sort_by_key(|r| r.begin);

        Ok(Catalog { records })
    }

    /// Serialize the catalog into a reserved-region image
    ///
    /// Records are written in ascending-`begin` order; remaining slots are
    /// zeroed. Overflow is an error, never a silent truncation.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.records.len() > CATALOG_CAPACITY {
            return Err(CapsuleError::CapacityExceeded(self.records.len()));
        }

        let mut region = vec![0u8; CATALOG_CAPACITY * RECORD_SIZE];
        for (record, slot) in self.records.iter().zip(region.chunks_exact_mut(RECORD_SIZE)) {
            record.encode(slot)?;
        }

        Ok(region)
    }

    /// Whether a record with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Look up a record by name
    pub fn find(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Records in ascending-`begin` order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total data blocks occupied by live records
    pub fn blocks_in_use(&self) -> u32 {
        self.records.iter().map(|r| r.blocks).sum()
    }

    /// Insert a record, preserving sort order
    pub fn insert(&mut self, record: Record) -> Result<()> {
        if self.exists(&record.name) {
            return Err(CapsuleError::NameConflict(record.name));
        }
        if self.records.len() >= CATALOG_CAPACITY {
            return Err(CapsuleError::CapacityExceeded(self.records.len() + 1));
        }

        let at = self.records.partition_point(|r| r.begin <= record.begin);
        self.records.insert(at, record);

        Ok(())
    }

    /// Remove a record by name, returning it
    ///
    /// The block gap it leaves is not closed; the allocator reuses or
    /// compacts it later.
    pub fn remove(&mut self, name: &str) -> Result<Record> {
        let index = self
            .records
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| CapsuleError::NameNotFound(name.to_string()))?;

        Ok(self.records.remove(index))
    }

    /// Rename a record in place
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        if self.records.iter().any(|r| r.name == to && r.name != from) {
            return Err(CapsuleError::NameConflict(to.to_string()));
        }

        let record = self
            .records
            .iter_mut()
            .find(|r| r.name == from)
            .ok_or_else(|| CapsuleError::NameNotFound(from.to_string()))?;
        record.name = to.to_string();

        Ok(())
    }

    /// Move the record at `index` to a new starting block, re-sorting
    ///
    /// Used by defragmentation after the record's data blocks have been
    /// copied to their new position.
    pub(crate) fn relocate(&mut self, index: usize, new_begin: u32) {
        self.records[index].begin = new_begin;
        self.records.sort_by_key(|r| r.begin);
    }
}
