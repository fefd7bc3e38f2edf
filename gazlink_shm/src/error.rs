//! Error types for shared memory operations

use thiserror::Error;

/// Errors that can occur during shared memory operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Segment already exists
    ///
    /// Returned by `create` when another process won the creation race.
    /// Callers resolve it by falling back to `attach`.
    #[error("Segment already exists: {name}")]
    AlreadyExists {
        /// Segment name
        name: String,
    },

    /// Segment backing file does not exist yet
    ///
    /// This is the "not created yet" case that flips the caller into
    /// initializer role — distinct from a present-but-inaccessible file.
    #[error("Segment not found: {name}")]
    NotFound {
        /// Segment name
        name: String,
    },

    /// Backing file exists but cannot be opened
    #[error("Permission denied accessing segment: {name}")]
    PermissionDenied {
        /// Segment name
        name: String,
    },

    /// Attached segment does not match the declared layout
    #[error("Segment layout mismatch for {name}: {reason}")]
    LayoutMismatch {
        /// Segment name
        name: String,
        /// What disagreed (magic, hash, size)
        reason: String,
    },

    /// Block name not declared in the segment layout
    #[error("Unknown block '{block}' in segment {segment}")]
    UnknownBlock {
        /// Segment name
        segment: String,
        /// Requested block name
        block: String,
    },

    /// Caller supplied data of the wrong shape for a block
    #[error("Shape mismatch for block '{block}': expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Block name
        block: String,
        /// Declared element count
        expected: usize,
        /// Supplied element count
        actual: usize,
    },

    /// Record type size disagrees with the block declaration
    #[error("Record size mismatch for block '{block}': block is {expected} bytes, record is {actual} bytes")]
    RecordSizeMismatch {
        /// Block name
        block: String,
        /// Declared block size in bytes
        expected: usize,
        /// Supplied record size in bytes
        actual: usize,
    },

    /// Torn-read retries exhausted under write contention
    #[error("Read contention on segment {name} - retry recommended")]
    ReadContention {
        /// Segment name
        name: String,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type for shared memory operations
pub type ShmResult<T> = Result<T, ShmError>;
