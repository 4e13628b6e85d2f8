/// Errors produced while packing, unpacking, or multiplexing event records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// A read or skip would pass the end of the buffer.
    #[error("read out of bounds ({requested} bytes at offset {offset}, buffer is {length} bytes)")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        length: usize,
    },

    /// A write would exceed the destination capacity. Nothing was written.
    #[error("buffer full ({requested} bytes requested, {remaining} of {capacity} remaining)")]
    BufferFull {
        requested: usize,
        remaining: usize,
        capacity: usize,
    },

    /// A frame header or index table is inconsistent with the data that follows.
    #[error("malformed frame: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, WireError>;
