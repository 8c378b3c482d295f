//! Disk I/O for capsule containers
//!
//! A container is one ordinary file addressed in whole blocks. All reads
//! and writes are block-aligned and synchronous.

use crate::error::{CapsuleError, Result};
use crate::record::{BLOCK_SIZE, RESERVED_BLOCKS};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Disk-backed container storage
pub struct CapsuleFile {
    file: std::fs::File,
    path: PathBuf,
    total_blocks: u32,
}

impl CapsuleFile {
    /// Create a new zero-filled container of `total_blocks` blocks
    pub fn create<P: AsRef<Path>>(path: P, total_blocks: u32) -> Result<Self> {
        if total_blocks <= RESERVED_BLOCKS {
            return Err(CapsuleError::InvalidSize(total_blocks));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        let zeros = vec![0u8; BLOCK_SIZE];
        for _ in 0..total_blocks {
            file.write_all(&zeros)?;
        }
        file.flush()?;

        Ok(CapsuleFile {
            file,
            path: path.as_ref().to_path_buf(),
            total_blocks,
        })
    }

    /// Open an existing container, inferring the block count from its length
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(CapsuleError::CorruptContainer(format!(
                "container length {len} is not a multiple of the block size"
            )));
        }
        let total_blocks = (len / BLOCK_SIZE as u64) as u32;
        if total_blocks <= RESERVED_BLOCKS {
            return Err(CapsuleError::CorruptContainer(format!(
                "container holds only {total_blocks} blocks, no room past the reserved region"
            )));
        }

        Ok(CapsuleFile {
            file,
            path: path.as_ref().to_path_buf(),
            total_blocks,
        })
    }

    /// Read `count` consecutive blocks starting at `index`
    pub fn read_blocks(&mut self, index: u32, count: u32) -> Result<Vec<u8>> {
        self.check_range(index, count)?;

        self.file
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        let mut buffer = vec![0u8; count as usize * BLOCK_SIZE];
        self.file.read_exact(&mut buffer)?;

        Ok(buffer)
    }

    /// Write block-aligned data starting at block `index`
    ///
    /// `data` must be a whole number of blocks; callers pad a trailing
    /// partial block with zeros before writing.
    pub fn write_blocks(&mut self, index: u32, data: &[u8]) -> Result<()> {
        debug_assert_eq!(data.len() % BLOCK_SIZE, 0);
        let count = (data.len() / BLOCK_SIZE) as u32;
        self.check_range(index, count)?;

        self.file
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        self.file.write_all(data)?;
        self.file.flush()?;

        Ok(())
    }

    /// Total number of blocks in the container
    pub fn total_blocks(&self) -> u32 {
        self.total_blocks
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync all writes to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn check_range(&self, index: u32, count: u32) -> Result<()> {
        let end = index as u64 + count as u64;
        if end > self.total_blocks as u64 {
            return Err(CapsuleError::OutOfBounds {
                start: index,
                end: end as u32,
                total: self.total_blocks,
            });
        }
        Ok(())
    }
}
