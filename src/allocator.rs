//! Contiguous first-fit allocation with on-demand defragmentation
//!
//! The allocator has no state of its own: it walks the catalog's sorted
//! records to enumerate free gaps in ascending address order. When no
//! single gap is wide enough but the aggregate free space is, it compacts
//! the container one record at a time and retries, bounded by the catalog
//! length so the loop always terminates.

use crate::catalog::Catalog;
use crate::error::{CapsuleError, Result};
use crate::io::CapsuleFile;
use crate::record::RESERVED_BLOCKS;

/// Find a contiguous run of `requested` free blocks, compacting if needed
///
/// Returns the run's first block index. Fails `OutOfSpace` immediately,
/// without compacting, when the aggregate free space is already short.
pub fn allocate(store: &mut CapsuleFile, catalog: &mut Catalog, requested: u32) -> Result<u32> {
    let total = store.total_blocks();
    let free = total - RESERVED_BLOCKS - catalog.blocks_in_use();
    if requested > free {
        return Err(CapsuleError::OutOfSpace { requested, free });
    }

    // Each compaction step moves one record, so one pass over the catalog
    // fully packs the data region.
    for _ in 0..=catalog.len() {
        if let Some(start) = first_fit(catalog, total, requested) {
            return Ok(start);
        }
        if !compact_once(store, catalog)? {
            break;
        }
    }

    Err(CapsuleError::OutOfSpace { requested, free })
}

/// First gap of at least `requested` blocks, in ascending address order
///
/// Candidate gaps are the run before the first record, the holes between
/// consecutive records, and the tail after the last record.
fn first_fit(catalog: &Catalog, total_blocks: u32, requested: u32) -> Option<u32> {
    let mut cursor = RESERVED_BLOCKS;
    for record in catalog.records() {
        if record.begin - cursor >= requested {
            return Some(cursor);
        }
        cursor = record.end();
    }

    if total_blocks - cursor >= requested {
        Some(cursor)
    } else {
        None
    }
}

/// One compaction step: slide the earliest gapped record down
///
/// Locates the first record that does not sit flush against the blocks
/// before it, copies its data to the gap's start and updates its `begin`.
/// Returns false when the data region is already fully packed.
pub fn compact_once(store: &mut CapsuleFile, catalog: &mut Catalog) -> Result<bool> {
    let mut cursor = RESERVED_BLOCKS;
    let mut target = None;
    for (index, record) in catalog.records().iter().enumerate() {
        if record.begin > cursor {
            target = Some((index, cursor, record.begin, record.blocks));
            break;
        }
        cursor = record.end();
    }

    let Some((index, dest, src, blocks)) = target else {
        return Ok(false);
    };

    if blocks > 0 {
        let data = store.read_blocks(src, blocks)?;
        store.write_blocks(dest, &data)?;
    }
    tracing::debug!("Defragmenting: moved {} blocks from {} to {}", blocks, src, dest);
    catalog.relocate(index, dest);

    Ok(true)
}
