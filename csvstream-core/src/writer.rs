use std::error;
use std::fmt;

use memchr::memchr;

use crate::config::{is_whitespace, validate, ConfigError, CR, LF};

/// A record terminator to use when writing.
///
/// Reading always recognizes `\r\n`, `\r` and `\n` as record terminators,
/// independent of this setting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Terminator {
    /// Writes `\r\n`.
    CRLF,
    /// Writes the byte given.
    Any(u8),
}

impl Terminator {
    /// Returns true if this terminator writes `\r\n`.
    pub fn is_crlf(&self) -> bool {
        match *self {
            Terminator::CRLF => true,
            Terminator::Any(_) => false,
        }
    }

    /// The bytes written after each record.
    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Terminator::CRLF => b"\r\n",
            Terminator::Any(ref b) => std::slice::from_ref(b),
        }
    }
}

/// The default is the platform line ending: `\r\n` on Windows and `\n`
/// everywhere else.
impl Default for Terminator {
    fn default() -> Terminator {
        if cfg!(windows) {
            Terminator::CRLF
        } else {
            Terminator::Any(LF)
        }
    }
}

impl PartialEq<u8> for Terminator {
    #[inline]
    fn eq(&self, &other: &u8) -> bool {
        match *self {
            Terminator::CRLF => other == CR || other == LF,
            Terminator::Any(b) => other == b,
        }
    }
}

/// An error that occurs when a value must be delimited but the encoder has
/// no value delimiter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DelimiterRequired {
    field: usize,
}

impl DelimiterRequired {
    /// The index of the offending field within its record.
    pub fn field(&self) -> usize {
        self.field
    }
}

impl fmt::Display for DelimiterRequired {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "field {} must be delimited, but no value delimiter is set",
            self.field
        )
    }
}

impl error::Error for DelimiterRequired {}

/// Encodes records into bytes that a tokenizer with the same separator and
/// delimiter reads back unchanged.
///
/// A value is wrapped in the delimiter when it contains the separator, the
/// delimiter, a line break or the terminator byte, when it starts or ends
/// with whitespace (which the tokenizer would otherwise trim), or when
/// "always delimit" is enabled. Delimiters inside a wrapped value are
/// doubled.
///
/// The encoder owns no buffer. Callers pass the output buffer to every
/// call, which lets a writer encode a complete record before committing
/// any of it.
#[derive(Clone, Debug)]
pub struct Encoder {
    separator: u8,
    delimiter: Option<u8>,
    always_delimit: bool,
    term: Terminator,
}

impl Default for Encoder {
    fn default() -> Encoder {
        Encoder {
            separator: b',',
            delimiter: Some(b'"'),
            always_delimit: false,
            term: Terminator::default(),
        }
    }
}

impl Encoder {
    /// Creates a new encoder with the default configuration.
    pub fn new() -> Encoder {
        Encoder::default()
    }

    /// The value separator. The default is `b','`.
    pub fn value_separator(&self) -> u8 {
        self.separator
    }

    /// The value delimiter. The default is `Some(b'"')`.
    pub fn value_delimiter(&self) -> Option<u8> {
        self.delimiter
    }

    /// Whether every value is delimited. The default is `false`.
    pub fn always_delimit(&self) -> bool {
        self.always_delimit
    }

    /// The record terminator.
    pub fn terminator(&self) -> Terminator {
        self.term
    }

    /// Set the value separator.
    pub fn set_value_separator(
        &mut self,
        sep: u8,
    ) -> Result<(), ConfigError> {
        validate(sep, self.delimiter)?;
        self.separator = sep;
        Ok(())
    }

    /// Set the value delimiter. `None` disables delimiting entirely, which
    /// is rejected while "always delimit" is enabled.
    pub fn set_value_delimiter(
        &mut self,
        delim: Option<u8>,
    ) -> Result<(), ConfigError> {
        validate(self.separator, delim)?;
        if delim.is_none() && self.always_delimit {
            return Err(ConfigError::DelimiterRequired);
        }
        self.delimiter = delim;
        Ok(())
    }

    /// Set whether every value is delimited, whether it needs it or not.
    pub fn set_always_delimit(
        &mut self,
        yes: bool,
    ) -> Result<(), ConfigError> {
        if yes && self.delimiter.is_none() {
            return Err(ConfigError::DelimiterRequired);
        }
        self.always_delimit = yes;
        Ok(())
    }

    /// Set the record terminator.
    pub fn set_terminator(&mut self, term: Terminator) {
        self.term = term;
    }

    /// Returns true if `value` must be wrapped in the delimiter to survive
    /// a round trip, ignoring the "always delimit" setting.
    pub fn needs_delimiting(&self, value: &[u8]) -> bool {
        match (value.first(), value.last()) {
            (Some(&first), Some(&last)) => {
                if is_whitespace(first) || is_whitespace(last) {
                    return true;
                }
            }
            _ => return false,
        }
        value.iter().any(|&b| self.is_structural(b))
    }

    fn is_structural(&self, b: u8) -> bool {
        b == self.separator
            || Some(b) == self.delimiter
            || b == CR
            || b == LF
            || self.term == b
    }

    /// Append a single value to `out`.
    ///
    /// `field` is the index of the value within its record. Every value
    /// after the first is preceded by the separator.
    pub fn encode_field(
        &self,
        value: &[u8],
        field: usize,
        out: &mut Vec<u8>,
    ) -> Result<(), DelimiterRequired> {
        if field > 0 {
            out.push(self.separator);
        }
        if !self.always_delimit && !self.needs_delimiting(value) {
            out.extend_from_slice(value);
            return Ok(());
        }
        let delim = match self.delimiter {
            None => return Err(DelimiterRequired { field }),
            Some(delim) => delim,
        };
        out.reserve(value.len() + 2);
        out.push(delim);
        let mut rest = value;
        while let Some(i) = memchr(delim, rest) {
            out.extend_from_slice(&rest[..=i]);
            out.push(delim);
            rest = &rest[i + 1..];
        }
        out.extend_from_slice(rest);
        out.push(delim);
        Ok(())
    }

    /// Append the record terminator to `out`.
    pub fn encode_terminator(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.term.as_bytes());
    }

    /// Append a complete record, including its terminator, to `out`.
    ///
    /// On error, `out` is truncated back to its length before the call.
    /// Returns the number of values written.
    pub fn encode_record<I, T>(
        &self,
        values: I,
        out: &mut Vec<u8>,
    ) -> Result<usize, DelimiterRequired>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let start = out.len();
        let mut count = 0;
        for value in values {
            if let Err(err) = self.encode_field(value.as_ref(), count, out) {
                out.truncate(start);
                return Err(err);
            }
            count += 1;
        }
        self.encode_terminator(out);
        Ok(count)
    }
}
