//! Capsule container filesystem
//!
//! A minimal single-file virtual filesystem: one ordinary file emulates a
//! block device, a fixed-capacity catalog of stored items lives in the
//! container's reserved leading blocks, and every item occupies one
//! contiguous run of blocks. When free space is fragmented, the allocator
//! compacts the container on demand instead of failing early.
//!
//! ## Container layout
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │            Capsule container file            │
//! ├──────────────────────────────────────────────┤
//! │ Blocks 0..8: catalog region                  │
//! │  - 128 slots of 64 bytes, little-endian      │
//! │  - used flag, begin, byte length, blocks,    │
//! │    NUL-terminated name (max 47 bytes)        │
//! ├──────────────────────────────────────────────┤
//! │ Blocks 8..N: data region                     │
//! │  - one contiguous run per stored item        │
//! │  - 1 KiB blocks, final block zero-padded     │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types for container operations
//! - [`record`] - On-disk layout constants and the 64-byte catalog record
//! - [`io`] - Block-aligned synchronous container I/O
//! - [`catalog`] - Sorted fixed-capacity record table
//! - [`allocator`] - First-fit allocation with bounded defragmentation
//! - [`capsule`] - High-level container operations
//!
//! ## Example
//!
//! ```rust,no_run
//! use capsule_fs::Capsule;
//!
//! let mut capsule = Capsule::create(64, "archive.cap")?;
//! capsule.add_file("report.txt")?;
//! for entry in capsule.list_files() {
//!     println!("{} at block {} ({} bytes)", entry.name, entry.begin, entry.byte_len);
//! }
//! capsule.download("report.txt", "/tmp/report.txt")?;
//! capsule.close()?;
//! # Ok::<(), capsule_fs::CapsuleError>(())
//! ```
//!
//! ## Durability model
//!
//! Data blocks are durable as soon as the mutating operation returns.
//! Catalog changes live in memory for the whole session and are written
//! back to the reserved region only by [`Capsule::close`]; dropping a
//! handle without closing flushes best effort and logs any failure. There
//! is no journaling and no repair of a container whose catalog was never
//! flushed.

pub mod allocator;
pub mod capsule;
pub mod catalog;
pub mod error;
pub mod io;
pub mod record;

pub use capsule::{BlockOwner, Capsule, CapsuleStats, FileEntry};
pub use catalog::Catalog;
pub use error::{CapsuleError, Result};
pub use io::CapsuleFile;
pub use record::{
    Record, BLOCK_SIZE, CATALOG_CAPACITY, MAX_NAME_LEN, RECORD_SIZE, RESERVED_BLOCKS,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
