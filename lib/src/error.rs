use thiserror::Error;

/// Errors returned by the validating downsampling entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested output size is negative.
    #[error("invalid threshold {0}: must be zero or positive")]
    InvalidThreshold(i64),
}

pub type Result<T> = std::result::Result<T, Error>;
