//! Error types for UMB operations
//!
//! One error enum covers the whole codec. Errors raised while a streaming
//! encoder is being drained by an `io::Read` consumer travel inside an
//! `std::io::Error` and are unwrapped back to their original variant by the
//! `From<io::Error>` conversion.

use std::io;
use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating UMB data
#[derive(Debug, Error)]
pub enum UmbError {
    /// Malformed, missing or unrecognised metadata
    #[error("schema error: {0}")]
    Schema(String),

    /// A bit field width or value outside what the codec can represent
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Stored byte length disagrees with the length implied by the metadata
    #[error("size mismatch for \"{entry}\": expected {expected} bytes, found {actual}")]
    SizeMismatch {
        entry: String,
        expected: u64,
        actual: u64,
    },

    /// Missing archive entry, annotation or alias
    #[error("not found: {0}")]
    NotFound(String),

    /// Alias or per-entity data registered twice
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// Underlying file, archive or compression failure
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl UmbError {
    pub fn schema(msg: impl Into<String>) -> Self {
        UmbError::Schema(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        UmbError::Encoding(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        UmbError::NotFound(msg.into())
    }

    pub fn duplicate(msg: impl Into<String>) -> Self {
        UmbError::Duplicate(msg.into())
    }

    /// Wrap this error so it can cross an `io::Read`/`io::Write` boundary
    pub fn into_io(self) -> io::Error {
        match self {
            UmbError::Io(err) => err,
            other => io::Error::other(other),
        }
    }
}

impl From<io::Error> for UmbError {
    fn from(err: io::Error) -> Self {
        let wrapped = err
            .get_ref()
            .is_some_and(|inner| inner.is::<UmbError>());
        if !wrapped {
            return UmbError::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<UmbError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(inner)) => UmbError::Io(io::Error::other(inner)),
            None => UmbError::Io(io::Error::other("empty wrapped error")),
        }
    }
}

impl From<serde_json::Error> for UmbError {
    fn from(err: serde_json::Error) -> Self {
        UmbError::Schema(format!("invalid index JSON: {err}"))
    }
}

/// Result type for UMB operations
pub type Result<T> = std::result::Result<T, UmbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_round_trip_keeps_variant() {
        let err = UmbError::SizeMismatch {
            entry: "exit-rates.bin".into(),
            expected: 24,
            actual: 16,
        };
        let back = UmbError::from(err.into_io());
        match back {
            UmbError::SizeMismatch {
                entry,
                expected,
                actual,
            } => {
                assert_eq!(entry, "exit-rates.bin");
                assert_eq!(expected, 24);
                assert_eq!(actual, 16);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "truncated");
        assert!(matches!(UmbError::from(err), UmbError::Io(_)));
    }

    #[test]
    fn test_json_error_is_schema() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(UmbError::from(err), UmbError::Schema(_)));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            UmbError::not_found("entry \"x.bin\"").to_string(),
            "not found: entry \"x.bin\""
        );
        assert_eq!(
            UmbError::schema("bad").to_string(),
            "schema error: bad"
        );
    }
}
