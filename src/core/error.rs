use std::io;
use thiserror::Error;

/// Custom error types for the printer protocol client
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encoded frame of {length} bytes exceeds the 16-bit length field")]
    SizeOverflow { length: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    /// Creates a new protocol mismatch error
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Error::ProtocolMismatch(msg.into())
    }

    /// Creates a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Creates a new invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::mismatch("test error");
        assert!(matches!(err, Error::ProtocolMismatch(_)));
        assert_eq!(err.to_string(), "Protocol mismatch: test error");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_size_overflow_message() {
        let err = Error::SizeOverflow { length: 70000 };
        assert!(err.to_string().contains("70000"));
    }
}
