use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapsuleError {
    #[error("Invalid container size: {0} blocks (must exceed the reserved region)")]
    InvalidSize(u32),

    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    #[error("A file named \"{0}\" already exists in the container")]
    NameConflict(String),

    #[error("No file named \"{0}\" exists in the container")]
    NameNotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Out of space: {requested} blocks requested, {free} free")]
    OutOfSpace { requested: u32, free: u32 },

    #[error("Catalog capacity exceeded: {0} records")]
    CapacityExceeded(usize),

    #[error("Block access out of bounds: blocks [{start}, {end}) of {total}")]
    OutOfBounds { start: u32, end: u32, total: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CapsuleError>;
