//! Errors raised by element sources.

/// Failure of an upstream element producer.
///
/// The resolver never inspects or rewraps these; they reach the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed element at record {record}: {message}")]
    Parse { record: usize, message: String },
    #[error("source cannot be reset")]
    NotResettable,
    #[error("{0}")]
    Other(String),
}
