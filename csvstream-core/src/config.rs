use std::error;
use std::fmt;

/// The carriage return byte, one half of a CRLF record terminator.
pub const CR: u8 = b'\r';
/// The line feed byte.
pub const LF: u8 = b'\n';
/// The space byte. It is reserved as whitespace and can never be structural.
pub const SPACE: u8 = b' ';
/// The tab byte. It is trimmed like a space, but may be used as a separator.
pub const TAB: u8 = b'\t';

/// Returns true if and only if `b` is whitespace that may be trimmed from
/// the edges of an unquoted value.
#[inline]
pub fn is_whitespace(b: u8) -> bool {
    b == SPACE || b == TAB
}

/// An error that occurs when an invalid configuration is assigned.
///
/// Configuration is always validated at the point of assignment. When an
/// assignment fails, the configuration that was in effect before the call
/// is left untouched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The space character was used as the value separator.
    SpaceSeparator,
    /// The space character was used as the value delimiter.
    SpaceDelimiter,
    /// The value separator and the value delimiter are the same byte.
    SeparatorIsDelimiter(u8),
    /// A line break (`\r` or `\n`) was used as a separator or delimiter.
    /// Line breaks always terminate records.
    LineBreak(u8),
    /// A structural character must be a single ASCII byte.
    NonAscii(u8),
    /// Writing with "always delimit" requires a value delimiter. This occurs
    /// when the delimiter is removed while "always delimit" is enabled, or
    /// when "always delimit" is enabled while there is no delimiter.
    DelimiterRequired,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::SpaceSeparator => {
                write!(f, "the space character cannot be a value separator")
            }
            ConfigError::SpaceDelimiter => {
                write!(f, "the space character cannot be a value delimiter")
            }
            ConfigError::SeparatorIsDelimiter(b) => write!(
                f,
                "value separator and value delimiter must differ, \
                 but both are {:?}",
                b as char
            ),
            ConfigError::LineBreak(b) => write!(
                f,
                "line break {:?} cannot be a value separator or delimiter",
                b as char
            ),
            ConfigError::NonAscii(b) => write!(
                f,
                "structural characters must be ASCII, but got byte \\x{:02X}",
                b
            ),
            ConfigError::DelimiterRequired => write!(
                f,
                "a value delimiter is required while values are always \
                 delimited"
            ),
        }
    }
}

impl error::Error for ConfigError {}

/// Checks a single structural byte in isolation.
fn check_structural(b: u8, space_err: ConfigError) -> Result<(), ConfigError> {
    if b == SPACE {
        Err(space_err)
    } else if b == CR || b == LF {
        Err(ConfigError::LineBreak(b))
    } else if !b.is_ascii() {
        Err(ConfigError::NonAscii(b))
    } else {
        Ok(())
    }
}

/// Validates a separator/delimiter combination.
///
/// This is shared by the parser configuration and the field encoder so that
/// both sides of a round trip accept exactly the same structural
/// characters.
pub fn validate(
    separator: u8,
    delimiter: Option<u8>,
) -> Result<(), ConfigError> {
    check_structural(separator, ConfigError::SpaceSeparator)?;
    if let Some(delimiter) = delimiter {
        check_structural(delimiter, ConfigError::SpaceDelimiter)?;
        if delimiter == separator {
            return Err(ConfigError::SeparatorIsDelimiter(separator));
        }
    }
    Ok(())
}

/// The configuration of a tokenizer.
///
/// All setters validate the new value against the rest of the configuration
/// and leave the configuration unchanged when they fail. Setting a value to
/// its current value is always a no-op.
///
/// When the `serde` feature is enabled, this type can be serialized and
/// deserialized. Since deserialization bypasses the setters, consumers
/// should call [`ParserConfig::validate`] on a deserialized configuration.
/// The tokenizer constructors do this for you.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserConfig {
    value_separator: u8,
    value_delimiter: Option<u8>,
    preserve_leading_whitespace: bool,
    preserve_trailing_whitespace: bool,
}

impl Default for ParserConfig {
    fn default() -> ParserConfig {
        ParserConfig {
            value_separator: b',',
            value_delimiter: Some(b'"'),
            preserve_leading_whitespace: false,
            preserve_trailing_whitespace: false,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with the defaults: `,` separates values,
    /// `"` delimits values and whitespace around unquoted text is trimmed.
    pub fn new() -> ParserConfig {
        ParserConfig::default()
    }

    /// Check every invariant of this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self.value_separator, self.value_delimiter)
    }

    /// The byte that separates values within a record.
    pub fn value_separator(&self) -> u8 {
        self.value_separator
    }

    /// Set the byte that separates values within a record.
    pub fn set_value_separator(
        &mut self,
        separator: u8,
    ) -> Result<(), ConfigError> {
        validate(separator, self.value_delimiter)?;
        self.value_separator = separator;
        Ok(())
    }

    /// The byte that delimits (quotes) values, if any.
    pub fn value_delimiter(&self) -> Option<u8> {
        self.value_delimiter
    }

    /// Set the byte that delimits values. `None` disables quoting entirely.
    pub fn set_value_delimiter(
        &mut self,
        delimiter: Option<u8>,
    ) -> Result<(), ConfigError> {
        validate(self.value_separator, delimiter)?;
        self.value_delimiter = delimiter;
        Ok(())
    }

    /// Whether leading whitespace outside of quotes is kept.
    pub fn preserve_leading_whitespace(&self) -> bool {
        self.preserve_leading_whitespace
    }

    /// Keep (or trim) leading whitespace outside of quotes.
    pub fn set_preserve_leading_whitespace(&mut self, yes: bool) {
        self.preserve_leading_whitespace = yes;
    }

    /// Whether trailing whitespace outside of quotes is kept.
    pub fn preserve_trailing_whitespace(&self) -> bool {
        self.preserve_trailing_whitespace
    }

    /// Keep (or trim) trailing whitespace outside of quotes.
    pub fn set_preserve_trailing_whitespace(&mut self, yes: bool) {
        self.preserve_trailing_whitespace = yes;
    }

    /// Build the byte classifier for this configuration.
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.value_separator, self.value_delimiter)
    }
}

/// Classifies bytes as structural (separator, delimiter, CR or LF) or not.
///
/// The classifier first applies a cheap bit mask test: the mask is the
/// bitwise OR of all structural bytes, so any byte with a bit set outside
/// of the mask cannot be structural. Bytes that pass the mask test are
/// resolved with exact comparisons. The mask only ever produces false
/// positives, never false negatives, so `is_special` is exact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Classifier {
    mask: u8,
    separator: u8,
    delimiter: Option<u8>,
}

impl Classifier {
    /// Create a classifier for the given separator and optional delimiter.
    pub fn new(separator: u8, delimiter: Option<u8>) -> Classifier {
        let mask = separator | delimiter.unwrap_or(0) | CR | LF;
        Classifier { mask, separator, delimiter }
    }

    /// The precomputed mask.
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// The separator this classifier recognizes.
    #[inline]
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// The delimiter this classifier recognizes, if any.
    #[inline]
    pub fn delimiter(&self) -> Option<u8> {
        self.delimiter
    }

    /// Returns false only if `b` is definitely not structural.
    #[inline(always)]
    pub fn is_possibly_special(&self, b: u8) -> bool {
        b & self.mask == b
    }

    /// Returns true if and only if `b` is the separator, the delimiter, CR
    /// or LF.
    #[inline]
    pub fn is_special(&self, b: u8) -> bool {
        self.is_possibly_special(b)
            && (b == self.separator
                || Some(b) == self.delimiter
                || b == CR
                || b == LF)
    }

    /// Returns true if `b` is the delimiter.
    #[inline]
    pub fn is_delimiter(&self, b: u8) -> bool {
        Some(b) == self.delimiter
    }
}
