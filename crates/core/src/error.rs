//! Core error types for srcquery

/// Broad classification of a [`QueryError`].
///
/// Callers use this to decide what to do with a failure: only `Timeout`
/// ever triggers a retry (directory failover), everything else surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Header/tag mismatch, unterminated string, bad fragment index
    Malformed,
    /// Decompressed size or CRC mismatch
    Integrity,
    /// No response within the allotted time
    Timeout,
    /// Resolve/dial/read/write failure
    Transport,
    /// Query attempted without a remote address
    MissingAddress,
    /// Invalid client configuration
    Config,
}

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Packet appears malformed: {0}")]
    Malformed(String),

    #[error("Packet contains fewer players than reported: declared {declared}, room for at most {available}")]
    MissingPlayers { declared: u8, available: usize },

    #[error("Response header does not match")]
    HeaderMismatch,

    #[error("Decompressed payload is not the expected size: expected {expected}, got {actual}")]
    PayloadSizeMismatch { expected: u32, actual: usize },

    #[error("CRC validation failed on decompressed payload: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("The server did not respond in time")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("The server does not have a remote address set")]
    NoAddress,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QueryError {
    /// Shorthand for a [`QueryError::Malformed`] with a message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        QueryError::Malformed(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Malformed(_)
            | QueryError::MissingPlayers { .. }
            | QueryError::HeaderMismatch => ErrorKind::Malformed,
            QueryError::PayloadSizeMismatch { .. }
            | QueryError::CrcMismatch { .. }
            | QueryError::Decompression(_) => ErrorKind::Integrity,
            QueryError::Timeout => ErrorKind::Timeout,
            QueryError::Io(e) => match e.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ErrorKind::Timeout,
                _ => ErrorKind::Transport,
            },
            QueryError::NoAddress => ErrorKind::MissingAddress,
            QueryError::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
