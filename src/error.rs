use std::error;
use std::fmt;
use std::io;
use std::result;

use csvstream_core::{ConfigError, Utf8Error};

/// A type alias for `Result<T, csvstream::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// Malformed CSV is never an error. The tokenizer always produces some
/// interpretation of its input, so the only errors that reading can produce
/// are I/O failures, UTF-8 failures and usage errors.
#[derive(Debug)]
pub enum Error {
    /// An I/O error from the underlying reader or writer, unchanged.
    Io(io::Error),
    /// A value in the input is not valid UTF-8.
    ///
    /// The record containing the value has been consumed when this is
    /// returned, so reading can resume with the next record.
    Utf8 {
        /// The index of the record, counting from zero, among the records
        /// read so far by this tokenizer.
        record: u64,
        /// The index of the offending field within its record.
        field: usize,
        /// The corresponding UTF-8 error.
        err: Utf8Error,
    },
    /// An invalid configuration was assigned. The previous configuration
    /// remains in effect.
    Config(ConfigError),
    /// The tokenizer or writer was used after it was closed.
    Closed,
    /// A value must be delimited to be written faithfully, but the writer
    /// has no value delimiter. Nothing of the record was written.
    DelimiterRequired {
        /// The index of the record, counting from zero, among the records
        /// written so far by this writer.
        record: u64,
        /// The index of the offending field within its record.
        field: usize,
    },
}

impl Error {
    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::Other, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            Error::Utf8 { ref err, .. } => Some(err),
            Error::Config(ref err) => Some(err),
            Error::Closed => None,
            Error::DelimiterRequired { .. } => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Utf8 { record, field, ref err } => write!(
                f,
                "CSV parse error: record {} (field {}): {}",
                record, field, err
            ),
            Error::Config(ref err) => {
                write!(f, "CSV configuration error: {}", err)
            }
            Error::Closed => {
                write!(f, "CSV error: tokenizer or writer is closed")
            }
            Error::DelimiterRequired { record, field } => write!(
                f,
                "CSV write error: record {} (field {}): value must be \
                 delimited, but no value delimiter is set",
                record, field
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use csvstream_core::ConfigError;

    use super::Error;

    #[test]
    fn io_roundtrip() {
        let err = Error::from(io::Error::new(io::ErrorKind::Other, "boom"));
        assert!(err.is_io_error());
        let back: io::Error = err.into();
        assert_eq!(back.to_string(), "boom");
    }

    #[test]
    fn config_source() {
        let err = Error::from(ConfigError::SpaceSeparator);
        assert!(!err.is_io_error());
        assert!(err.source().is_some());
        assert!(err.to_string().contains("space character"));
    }

    #[test]
    fn closed_into_io() {
        let err: io::Error = Error::Closed.into();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert!(err.to_string().contains("closed"));
    }
}
