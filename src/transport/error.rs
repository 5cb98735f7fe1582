//! Transport layer error types.
//!
//! A receive timeout is not an error here: the socket reports it as "no
//! packet" and the session carries on with fewer observations.

use std::io;

use thiserror::Error;

/// Transport layer errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error (socket operations).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The lab host name did not resolve to an address.
    #[error("cannot resolve {0}")]
    Resolve(String),

    /// The peer closed a TCP link.
    #[error("connection closed")]
    ConnectionClosed,

    /// A TCP reply line was not valid UTF-8.
    #[error("reply is not valid text")]
    InvalidText,
}

impl TransportError {
    /// Check if the session can keep going after this error.
    ///
    /// Only the current exchange is lost; the socket is still usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::InvalidText)
    }

    /// Check if this error is fatal to the session.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        assert!(TransportError::ConnectionClosed.is_fatal());
        assert!(TransportError::Resolve("lab".into()).is_fatal());
        assert!(TransportError::Io(io::Error::other("test")).is_fatal());

        assert!(!TransportError::InvalidText.is_fatal());
        assert!(TransportError::InvalidText.is_recoverable());
    }
}
