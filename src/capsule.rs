//! Main capsule API
//!
//! `Capsule` owns one container file and orchestrates the backing store,
//! the catalog and the allocator. Data-block writes are durable as soon as
//! an operation returns; the catalog itself is only written back to the
//! reserved region on [`Capsule::close`] (or, best effort, on drop).

use crate::allocator;
use crate::catalog::Catalog;
use crate::error::{CapsuleError, Result};
use crate::io::CapsuleFile;
use crate::record::{self, Record, BLOCK_SIZE, RESERVED_BLOCKS};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One row of the [`Capsule::list_files`] report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// First occupied data block
    pub begin: u32,
    /// Occupied block count
    pub blocks: u32,
    /// Logical content size in bytes
    pub byte_len: u32,
    /// Item name
    pub name: String,
}

/// Per-block ownership in the [`Capsule::file_map`] report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BlockOwner {
    /// Catalog region block
    Reserved,
    /// Unallocated data block
    Free,
    /// Data block owned by the named item
    File(String),
}

/// Container usage counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapsuleStats {
    pub total_blocks: u32,
    pub reserved_blocks: u32,
    pub blocks_used: u32,
    pub free_blocks: u32,
    pub file_count: usize,
}

/// A mounted container
///
/// Exactly one `Capsule` owns a given container at a time; all mutating
/// operations take `&mut self` and run synchronously to completion.
pub struct Capsule {
    store: CapsuleFile,
    catalog: Catalog,
    /// Always RESERVED_BLOCKS plus the sum of record block counts
    blocks_used: u32,
    flushed: bool,
}

impl Capsule {
    /// Create a new zero-filled container of `total_blocks` blocks
    pub fn create<P: AsRef<Path>>(total_blocks: u32, path: P) -> Result<Self> {
        let store = CapsuleFile::create(path, total_blocks)?;
        tracing::info!(
            "Created container {} with {} blocks",
            store.path().display(),
            total_blocks
        );

        Ok(Capsule {
            store,
            catalog: Catalog::new(),
            blocks_used: RESERVED_BLOCKS,
            flushed: false,
        })
    }

    /// Open an existing container and load its catalog
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut store = CapsuleFile::open(path)?;

        let region = store.read_blocks(0, RESERVED_BLOCKS)?;
        let catalog = Catalog::from_bytes(&region)?;
        Self::validate_loaded(&catalog, store.total_blocks())?;

        let blocks_used = RESERVED_BLOCKS + catalog.blocks_in_use();
        tracing::info!(
            "Opened container {}: {} files, {}/{} blocks used",
            store.path().display(),
            catalog.len(),
            blocks_used,
            store.total_blocks()
        );

        Ok(Capsule {
            store,
            catalog,
            blocks_used,
            flushed: false,
        })
    }

    /// Copy a host file into the container under its file name
    ///
    /// The catalog record is inserted only after every data block has been
    /// written, so a failed copy leaves the container unchanged.
    pub fn add_file<P: AsRef<Path>>(&mut self, source: P) -> Result<()> {
        let source = source.as_ref();
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CapsuleError::InvalidName(format!("{} has no usable file name", source.display()))
            })?
            .to_string();
        record::validate_name(&name)?;

        if self.catalog.exists(&name) {
            return Err(CapsuleError::NameConflict(name));
        }

        let content = std::fs::read(source)?;
        let byte_len = u32::try_from(content.len()).map_err(|_| CapsuleError::OutOfSpace {
            requested: u32::MAX,
            free: self.free_blocks(),
        })?;
        let blocks = record::blocks_for(byte_len);

        if blocks > self.free_blocks() {
            return Err(CapsuleError::OutOfSpace {
                requested: blocks,
                free: self.free_blocks(),
            });
        }

        let begin = allocator::allocate(&mut self.store, &mut self.catalog, blocks)?;

        if blocks > 0 {
            // Zero-pad the trailing partial block; source bytes past
            // byte_len are never read.
            let mut padded = content;
            padded.resize(blocks as usize * BLOCK_SIZE, 0);
            self.store.write_blocks(begin, &padded)?;
        }

        self.catalog.insert(Record::new(name, begin, byte_len))?;
        self.blocks_used += blocks;

        Ok(())
    }

    /// Remove an item, leaving its block gap for later reuse
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let record = self.catalog.remove(name)?;
        // The counter tracks blocks, not bytes.
        self.blocks_used -= record.blocks;
        Ok(())
    }

    /// Rename an item in place
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        record::validate_name(to)?;
        self.catalog.rename(from, to)
    }

    /// Copy an item's exact content out of the container into `dest`
    pub fn download<P: AsRef<Path>>(&mut self, name: &str, dest: P) -> Result<()> {
        let record = self
            .catalog
            .find(name)
            .ok_or_else(|| CapsuleError::NameNotFound(name.to_string()))?;
        let (begin, byte_len, blocks) = (record.begin, record.byte_len, record.blocks);

        let mut out = File::create(dest)?;
        let mut remaining = byte_len as usize;
        for block in begin..begin + blocks {
            let data = self.store.read_blocks(block, 1)?;
            let take = remaining.min(BLOCK_SIZE);
            out.write_all(&data[..take])?;
            remaining -= take;
        }
        out.flush()?;

        Ok(())
    }

    /// Whether an item with this name is stored
    pub fn exists(&self, name: &str) -> bool {
        self.catalog.exists(name)
    }

    /// Report all items in ascending-`begin` order
    pub fn list_files(&self) -> Vec<FileEntry> {
        self.catalog
            .records()
            .iter()
            .map(|r| FileEntry {
                begin: r.begin,
                blocks: r.blocks,
                byte_len: r.byte_len,
                name: r.name.clone(),
            })
            .collect()
    }

    /// Per-block ownership across the whole container
    pub fn file_map(&self) -> Vec<BlockOwner> {
        let mut map = vec![BlockOwner::Free; self.store.total_blocks() as usize];
        for slot in map.iter_mut().take(RESERVED_BLOCKS as usize) {
            *slot = BlockOwner::Reserved;
        }
        for record in self.catalog.records() {
            for block in record.begin..record.end() {
                map[block as usize] = BlockOwner::File(record.name.clone());
            }
        }
        map
    }

    /// Render the file map as one bracket symbol per block
    pub fn render_map(&self) -> String {
        self.file_map()
            .iter()
            .map(|owner| match owner {
                BlockOwner::Reserved => "[FS]".to_string(),
                BlockOwner::Free => "[+]".to_string(),
                BlockOwner::File(name) => format!("[{name}]"),
            })
            .collect()
    }

    /// Container usage counters
    pub fn stats(&self) -> CapsuleStats {
        CapsuleStats {
            total_blocks: self.store.total_blocks(),
            reserved_blocks: RESERVED_BLOCKS,
            blocks_used: self.blocks_used,
            free_blocks: self.free_blocks(),
            file_count: self.catalog.len(),
        }
    }

    /// Free data blocks remaining
    pub fn free_blocks(&self) -> u32 {
        self.store.total_blocks() - self.blocks_used
    }

    /// Path of the backing container file
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Serialize the catalog into the reserved region and release the handle
    ///
    /// The explicit, reportable way to end a session. Dropping a `Capsule`
    /// without closing still flushes best effort, but any failure is only
    /// logged.
    pub fn close(mut self) -> Result<()> {
        self.flush_catalog()?;
        self.flushed = true;
        Ok(())
    }

    fn flush_catalog(&mut self) -> Result<()> {
        let region = self.catalog.to_bytes()?;
        self.store.write_blocks(0, &region)?;
        self.store.sync()?;
        Ok(())
    }

    fn validate_loaded(catalog: &Catalog, total_blocks: u32) -> Result<()> {
        let mut cursor = RESERVED_BLOCKS;
        for record in catalog.records() {
            if record.begin < cursor {
                return Err(CapsuleError::CorruptContainer(format!(
                    "record \"{}\" overlaps the blocks before it",
                    record.name
                )));
            }
            if record.end() > total_blocks {
                return Err(CapsuleError::CorruptContainer(format!(
                    "record \"{}\" extends past the end of the container",
                    record.name
                )));
            }
            cursor = record.end();
        }
        Ok(())
    }
}

impl Drop for Capsule {
    fn drop(&mut self) {
        if self.flushed {
            return;
        }
        if let Err(err) = self.flush_catalog() {
            tracing::warn!(
                "Failed to flush catalog for {} on drop: {}",
                self.store.path().display(),
                err
            );
        }
    }
}
