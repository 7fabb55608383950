use thiserror::Error;

/// Result type for queue and pipeline construction
pub type Result<T> = std::result::Result<T, PipeError>;

/// Errors that can occur while constructing a queue or pipeline
#[derive(Error, Debug)]
pub enum PipeError {
    /// A queue or pipeline stage was declared with a zero record width
    #[error("record width must be nonzero")]
    ZeroElementSize,

    /// The initial buffer allocation could not be satisfied
    #[error("failed to allocate a {0}-byte queue buffer")]
    Alloc(usize),
}
