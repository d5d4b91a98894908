//! Error types for corpus loading, analysis, and agreement scoring.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading corpora or computing agreements.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A corpus row or morphosyntactic tag could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The caller supplied something unusable (unknown filter code, bad
    /// annotator name, malformed CLI argument).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal invariant did not hold (missing subtree, clause label
    /// not found, contingency marginals out of balance).
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// A corpus file or directory was missing or unreadable.
    #[error("corpus error: {0}")]
    Corpus(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create an invalid-input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an invariant-violation error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// Create a corpus-layout error.
    pub fn corpus(msg: impl Into<String>) -> Self {
        Error::Corpus(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::parse("bad tag");
        assert_eq!(err.to_string(), "parse error: bad tag");

        let err = Error::invalid_input("unknown filter '9z'");
        assert!(err.to_string().contains("unknown filter"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
