use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use bstr::ByteSlice;
use csvstream_core::{
    Classifier, ParserConfig, Utf8Error, ValueAccumulator, ValueList, CR, LF,
};
use memchr::{memchr, memchr2, memchr3};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::record::{DataRecord, HeaderRecord};

const DEFAULT_BUFFER_CAPACITY: usize = 64 * (1 << 10);

/// Builds a CSV tokenizer with various configuration knobs.
///
/// This builder can be used to tweak the value separator, value delimiter,
/// whitespace handling and the capacity of the input buffer. Every setter
/// that could produce an invalid dialect validates its argument and
/// returns an error without changing anything.
#[derive(Debug)]
pub struct TokenizerBuilder {
    capacity: usize,
    config: ParserConfig,
}

impl Default for TokenizerBuilder {
    fn default() -> TokenizerBuilder {
        TokenizerBuilder {
            capacity: DEFAULT_BUFFER_CAPACITY,
            config: ParserConfig::default(),
        }
    }
}

impl TokenizerBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a tokenizer, call one of the methods
    /// starting with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use csvstream::TokenizerBuilder;
    ///
    /// # fn main() -> csvstream::Result<()> {
    /// let data = "city;country\nBoston;United States\n";
    /// let mut tok = TokenizerBuilder::new()
    ///     .value_separator(b';')?
    ///     .from_reader(data.as_bytes());
    ///
    /// let header = tok.parse_record(None)?.unwrap();
    /// assert_eq!(header.get(1), Some("country"));
    /// let record = tok.parse_record(None)?.unwrap();
    /// assert_eq!(record.get(0), Some("Boston"));
    /// assert!(tok.parse_record(None)?.is_none());
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> TokenizerBuilder {
        TokenizerBuilder::default()
    }

    /// Build a tokenizer from this configuration that reads from `rdr`.
    ///
    /// The reader is buffered for you automatically, so you should not wrap
    /// it in a `BufReader`.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Tokenizer<R> {
        Tokenizer::new(self, rdr)
    }

    /// Build a tokenizer from this configuration that reads the file at
    /// `path`.
    pub fn from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<Tokenizer<File>> {
        Ok(Tokenizer::new(self, File::open(path)?))
    }

    /// The value separator.
    ///
    /// It must be a single ASCII byte, and it may not be a space, a line
    /// break or the value delimiter.
    ///
    /// The default is `b','`.
    pub fn value_separator(
        &mut self,
        sep: u8,
    ) -> Result<&mut TokenizerBuilder> {
        self.config.set_value_separator(sep)?;
        Ok(self)
    }

    /// The value delimiter (the quote character).
    ///
    /// `None` disables quoting entirely, in which case every byte other
    /// than the separator and line breaks is literal.
    ///
    /// The default is `Some(b'"')`.
    pub fn value_delimiter(
        &mut self,
        delim: Option<u8>,
    ) -> Result<&mut TokenizerBuilder> {
        self.config.set_value_delimiter(delim)?;
        Ok(self)
    }

    /// Whether to keep whitespace at the start of a value that is outside
    /// of quotes.
    ///
    /// This is disabled by default.
    pub fn preserve_leading_whitespace(
        &mut self,
        yes: bool,
    ) -> &mut TokenizerBuilder {
        self.config.set_preserve_leading_whitespace(yes);
        self
    }

    /// Whether to keep whitespace at the end of a value that is outside of
    /// quotes.
    ///
    /// This is disabled by default.
    pub fn preserve_trailing_whitespace(
        &mut self,
        yes: bool,
    ) -> &mut TokenizerBuilder {
        self.config.set_preserve_trailing_whitespace(yes);
        self
    }

    /// Replace the whole parser configuration.
    ///
    /// The configuration is validated first, which matters for one that
    /// was deserialized rather than built with its setters.
    pub fn config(
        &mut self,
        config: ParserConfig,
    ) -> Result<&mut TokenizerBuilder> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Set the capacity (in bytes) of the input buffer.
    ///
    /// The buffer is allocated once and never grows. A capacity of `0` is
    /// raised to `1`.
    pub fn buffer_capacity(
        &mut self,
        capacity: usize,
    ) -> &mut TokenizerBuilder {
        self.capacity = capacity;
        self
    }
}

/// A streaming CSV tokenizer.
///
/// The tokenizer reads from any `io::Read` through a fixed size buffer and
/// turns it into records of owned strings. It never fails on malformed
/// CSV. Every input has exactly one interpretation:
///
/// * Records end at `\r\n`, `\r`, `\n` or the end of input.
/// * Values are split on the separator, except inside quotes.
/// * A delimiter anywhere in a value opens a quoted region, and the next
///   delimiter that is not doubled closes it. A doubled delimiter inside
///   quotes is one literal delimiter. A quoted region that is still open
///   at the end of input is closed implicitly.
/// * Spaces and tabs at the edges of a value are trimmed (unless the
///   corresponding `preserve_*` option is set), but never those that were
///   inside quotes.
///
/// Values are built without copying when possible: as long as a value is
/// one contiguous run of the input buffer, its string is made straight
/// from that run.
///
/// # Example
///
/// ```
/// use csvstream::Tokenizer;
///
/// # fn main() -> csvstream::Result<()> {
/// let data = "a, \" b \" ,c\n\"x\"\"y\",z";
/// let mut tok = Tokenizer::from_reader(data.as_bytes());
///
/// let record = tok.parse_record(None)?.unwrap();
/// assert_eq!(record.into_values(), vec!["a", " b ", "c"]);
/// let record = tok.parse_record(None)?.unwrap();
/// assert_eq!(record.into_values(), vec!["x\"y", "z"]);
/// assert!(tok.parse_record(None)?.is_none());
/// # Ok(())
/// # }
/// ```
pub struct Tokenizer<R> {
    /// The underlying reader. `None` once the tokenizer is closed.
    rdr: Option<R>,
    /// The input buffer. Its length is the capacity; only `pos..end` is
    /// unread input.
    buf: Vec<u8>,
    pos: usize,
    end: usize,
    /// Set once the reader returned zero bytes.
    eof: bool,
    /// Whether the scanner is inside a quoted region. This never survives
    /// a record boundary.
    in_quotes: bool,
    passed_first_record: bool,
    /// The number of records parsed or skipped so far.
    record: u64,
    config: ParserConfig,
    classifier: Classifier,
    value: ValueAccumulator,
    values: ValueList,
    /// Whether each value taken so far had to be copied.
    #[cfg(test)]
    copies: Vec<bool>,
}

impl<R: fmt::Debug> fmt::Debug for Tokenizer<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("rdr", &self.rdr)
            .field("unread", &self.buf[self.pos..self.end].as_bstr())
            .field("capacity", &self.buf.len())
            .field("eof", &self.eof)
            .field("in_quotes", &self.in_quotes)
            .field("passed_first_record", &self.passed_first_record)
            .field("record", &self.record)
            .field("config", &self.config)
            .finish()
    }
}

impl Tokenizer<File> {
    /// Create a tokenizer with the default configuration that reads the
    /// file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Tokenizer<File>> {
        TokenizerBuilder::new().from_path(path)
    }
}

impl<R: io::Read> Tokenizer<R> {
    fn new(builder: &TokenizerBuilder, rdr: R) -> Tokenizer<R> {
        let capacity = builder.capacity.max(1);
        Tokenizer {
            rdr: Some(rdr),
            buf: vec![0; capacity],
            pos: 0,
            end: 0,
            eof: false,
            in_quotes: false,
            passed_first_record: false,
            record: 0,
            classifier: builder.config.classifier(),
            config: builder.config.clone(),
            value: ValueAccumulator::new(),
            values: ValueList::new(),
            #[cfg(test)]
            copies: vec![],
        }
    }

    /// Create a tokenizer with the default configuration that reads from
    /// `rdr`.
    pub fn from_reader(rdr: R) -> Tokenizer<R> {
        TokenizerBuilder::new().from_reader(rdr)
    }

    /// Create a tokenizer with the given configuration that reads from
    /// `rdr`.
    ///
    /// This fails if the configuration is invalid.
    pub fn with_config(rdr: R, config: ParserConfig) -> Result<Tokenizer<R>> {
        let mut builder = TokenizerBuilder::new();
        builder.config(config)?;
        Ok(builder.from_reader(rdr))
    }

    /// Returns true if another record may be available.
    ///
    /// This returns true whenever unread input remains, which may refill
    /// the input buffer. A `true` result therefore always precedes a
    /// non-`None` result from `parse_record`.
    pub fn has_more_records(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.fill_buf()
    }

    /// Parse the next record.
    ///
    /// The `header`, if given, is attached to the record. This returns
    /// `None` once the input is exhausted.
    ///
    /// If a value in the record is not valid UTF-8, then the whole record
    /// is still consumed and an `Error::Utf8` is returned for the first
    /// such value. Parsing may continue with the next record.
    pub fn parse_record(
        &mut self,
        header: Option<&Arc<HeaderRecord>>,
    ) -> Result<Option<DataRecord>> {
        self.ensure_open()?;
        if !self.fill_buf()? {
            return Ok(None);
        }
        self.in_quotes = false;
        self.value.clear();
        self.values.clear();
        let mut utf8_err = None;
        let values = loop {
            if !self.fill_buf()? {
                // End of input closes any open quote and ends the record.
                self.in_quotes = false;
                let last = self.take_value(&mut utf8_err);
                break self.values.take_with(last);
            }
            if self.in_quotes {
                self.scan_quoted()?;
                continue;
            }

            let start = self.pos;
            let mut i = start;
            while i < self.end && !self.classifier.is_special(self.buf[i]) {
                i += 1;
            }
            if i > start {
                self.value.notify_chars_included(
                    &self.buf[..self.end],
                    start,
                    i - start,
                    false,
                );
                self.pos = i;
            }
            if i == self.end {
                continue;
            }

            let b = self.buf[i];
            self.pos += 1;
            if b == self.classifier.separator() {
                let value = self.take_value(&mut utf8_err);
                self.values.push(value);
            } else if self.classifier.is_delimiter(b) {
                self.value.notify_char_excluded();
                self.in_quotes = true;
            } else if b == CR {
                let last = self.take_value(&mut utf8_err);
                if self.fill_buf()? && self.buf[self.pos] == LF {
                    self.pos += 1;
                }
                break self.values.take_with(last);
            } else {
                debug_assert_eq!(b, LF);
                let last = self.take_value(&mut utf8_err);
                break self.values.take_with(last);
            }
        };

        let record = self.record;
        self.record += 1;
        self.passed_first_record = true;
        if let Some((field, err)) = utf8_err {
            return Err(Error::Utf8 { record, field, err });
        }
        Ok(Some(DataRecord::new(header.cloned(), values)))
    }

    /// Parse records into `out` until it is full or the input is
    /// exhausted.
    ///
    /// Records are written from the start of `out`, and the number written
    /// is returned. Slots after that are left untouched. To fill part of a
    /// larger buffer, pass a subslice such as `&mut buf[offset..offset + n]`.
    ///
    /// If an error occurs, the records parsed before it stay in `out`.
    pub fn parse_records(
        &mut self,
        header: Option<&Arc<HeaderRecord>>,
        out: &mut [Option<DataRecord>],
    ) -> Result<usize> {
        let mut count = 0;
        for slot in out.iter_mut() {
            match self.parse_record(header)? {
                None => break,
                Some(record) => *slot = Some(record),
            }
            count += 1;
        }
        trace!(requested = out.len(), parsed = count, "parsed record batch");
        Ok(count)
    }

    /// Skip the next record without building any of its values.
    ///
    /// Returns `false` only when the input is exhausted. Skipped records
    /// are never validated as UTF-8.
    pub fn skip_record(&mut self) -> Result<bool> {
        self.ensure_open()?;
        if !self.fill_buf()? {
            return Ok(false);
        }
        self.value.clear();
        let delim = self.classifier.delimiter();
        let mut in_quotes = false;
        while self.fill_buf()? {
            let hay = &self.buf[self.pos..self.end];
            match (in_quotes, delim) {
                (true, Some(delim)) => match memchr(delim, hay) {
                    None => self.pos = self.end,
                    Some(i) => {
                        // A doubled delimiter closes and reopens the quoted
                        // region, which amounts to the same thing.
                        self.pos += i + 1;
                        in_quotes = false;
                    }
                },
                _ => {
                    let found = match delim {
                        None => memchr2(CR, LF, hay),
                        Some(delim) => memchr3(delim, CR, LF, hay),
                    };
                    let i = match found {
                        None => {
                            self.pos = self.end;
                            continue;
                        }
                        Some(i) => i,
                    };
                    let b = hay[i];
                    self.pos += i + 1;
                    if b == CR {
                        if self.fill_buf()? && self.buf[self.pos] == LF {
                            self.pos += 1;
                        }
                        break;
                    } else if b == LF {
                        break;
                    }
                    in_quotes = true;
                }
            }
        }
        self.in_quotes = false;
        self.record += 1;
        self.passed_first_record = true;
        Ok(true)
    }

    /// Skip up to `n` records.
    ///
    /// Returns the number of records actually skipped, which is less than
    /// `n` only if the input was exhausted first.
    pub fn skip_records(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n && self.skip_record()? {
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Returns a borrowed iterator over all remaining records.
    ///
    /// Iteration stops at the end of input or once the tokenizer is
    /// closed.
    pub fn records(&mut self) -> DataRecords<'_, R> {
        DataRecords { tok: self, header: None }
    }

    /// Returns a borrowed iterator over all remaining records, each of
    /// which carries `header`.
    pub fn records_with_header(
        &mut self,
        header: Arc<HeaderRecord>,
    ) -> DataRecords<'_, R> {
        DataRecords { tok: self, header: Some(header) }
    }

    /// Materialize the value under construction and reset the accumulator.
    ///
    /// A UTF-8 failure is remembered (only the first one in a record) and
    /// replaced by an empty value so the record can still be consumed.
    fn take_value(
        &mut self,
        utf8_err: &mut Option<(usize, Utf8Error)>,
    ) -> String {
        let field = self.values.len();
        #[cfg(test)]
        self.copies.push(self.value.is_copied());
        let res = self.value.to_string(
            &self.buf[..self.end],
            self.config.preserve_leading_whitespace(),
            self.config.preserve_trailing_whitespace(),
        );
        self.value.clear();
        match res {
            Ok(value) => value,
            Err(err) => {
                if utf8_err.is_none() {
                    *utf8_err = Some((field, err));
                }
                String::new()
            }
        }
    }

    /// Consume input inside a quoted region, up to and including the next
    /// delimiter that is not doubled.
    fn scan_quoted(&mut self) -> Result<()> {
        let delim = match self.classifier.delimiter() {
            Some(delim) => delim,
            None => {
                self.in_quotes = false;
                return Ok(());
            }
        };
        let start = self.pos;
        let found = memchr(delim, &self.buf[start..self.end]);
        let len = found.unwrap_or(self.end - start);
        self.value.notify_chars_included(
            &self.buf[..self.end],
            start,
            len,
            true,
        );
        self.pos = start + len;
        if found.is_none() {
            return Ok(());
        }
        self.pos += 1;
        self.value.notify_char_excluded();
        if self.fill_buf()? && self.buf[self.pos] == delim {
            self.value.notify_char_included(
                &self.buf[..self.end],
                self.pos,
                true,
            );
            self.pos += 1;
        } else {
            self.in_quotes = false;
        }
        Ok(())
    }

    /// Make sure there is unread input in the buffer.
    ///
    /// Returns false only at the end of input. The accumulator is told
    /// before the buffer is overwritten.
    fn fill_buf(&mut self) -> Result<bool> {
        if self.pos < self.end {
            return Ok(true);
        }
        if self.eof {
            return Ok(false);
        }
        let rdr = match self.rdr {
            None => return Err(Error::Closed),
            Some(ref mut rdr) => rdr,
        };
        self.value.notify_buffer_refilling(&self.buf[..self.end]);
        let n = rdr.read(&mut self.buf)?;
        self.pos = 0;
        self.end = n;
        if n == 0 {
            self.eof = true;
            debug!(records = self.record, "reached end of CSV input");
            return Ok(false);
        }
        trace!(bytes = n, "refilled CSV input buffer");
        Ok(true)
    }
}

impl<R> Tokenizer<R> {
    fn ensure_open(&self) -> Result<()> {
        if self.rdr.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }

    /// Returns true if at least one record has been parsed or skipped.
    ///
    /// This is useful for treating the first record as a header.
    pub fn passed_first_record(&self) -> bool {
        self.passed_first_record
    }

    /// The current parser configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// The value separator.
    pub fn value_separator(&self) -> u8 {
        self.config.value_separator()
    }

    /// Change the value separator. The change applies from the next record
    /// on.
    pub fn set_value_separator(&mut self, sep: u8) -> Result<()> {
        self.ensure_open()?;
        self.config.set_value_separator(sep)?;
        self.classifier = self.config.classifier();
        debug!(separator = ?(sep as char), "changed value separator");
        Ok(())
    }

    /// The value delimiter.
    pub fn value_delimiter(&self) -> Option<u8> {
        self.config.value_delimiter()
    }

    /// Change the value delimiter. The change applies from the next record
    /// on.
    pub fn set_value_delimiter(&mut self, delim: Option<u8>) -> Result<()> {
        self.ensure_open()?;
        self.config.set_value_delimiter(delim)?;
        self.classifier = self.config.classifier();
        let shown = delim.map(|b| b as char);
        debug!(delimiter = ?shown, "changed value delimiter");
        Ok(())
    }

    /// Whether leading whitespace outside of quotes is kept.
    pub fn preserve_leading_whitespace(&self) -> bool {
        self.config.preserve_leading_whitespace()
    }

    /// Set whether leading whitespace outside of quotes is kept.
    pub fn set_preserve_leading_whitespace(
        &mut self,
        yes: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        self.config.set_preserve_leading_whitespace(yes);
        debug!(preserve = yes, "changed leading whitespace handling");
        Ok(())
    }

    /// Whether trailing whitespace outside of quotes is kept.
    pub fn preserve_trailing_whitespace(&self) -> bool {
        self.config.preserve_trailing_whitespace()
    }

    /// Set whether trailing whitespace outside of quotes is kept.
    pub fn set_preserve_trailing_whitespace(
        &mut self,
        yes: bool,
    ) -> Result<()> {
        self.ensure_open()?;
        self.config.set_preserve_trailing_whitespace(yes);
        debug!(preserve = yes, "changed trailing whitespace handling");
        Ok(())
    }

    /// Close this tokenizer, dropping the underlying reader and any
    /// buffered input.
    ///
    /// Every later operation fails with `Error::Closed`. Closing twice is
    /// harmless.
    pub fn close(&mut self) {
        if self.rdr.take().is_some() {
            debug!(records = self.record, "closed CSV tokenizer");
        }
        self.pos = 0;
        self.end = 0;
    }

    /// Returns true if this tokenizer has been closed.
    pub fn is_closed(&self) -> bool {
        self.rdr.is_none()
    }

    /// Returns a reference to the underlying reader, unless closed.
    pub fn get_ref(&self) -> Option<&R> {
        self.rdr.as_ref()
    }

    /// Returns a mutable reference to the underlying reader, unless closed.
    ///
    /// Reading from it directly will likely confuse the tokenizer, since
    /// some of its input may already be buffered.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.rdr.as_mut()
    }

    /// Unwraps this tokenizer, returning the underlying reader.
    ///
    /// Any buffered input is lost. This fails if the tokenizer is closed.
    pub fn into_inner(self) -> Result<R> {
        self.rdr.ok_or(Error::Closed)
    }
}

/// A borrowed iterator over the records of a tokenizer.
///
/// The lifetime `'r` refers to the lifetime of the `Tokenizer` it borrows.
pub struct DataRecords<'r, R> {
    tok: &'r mut Tokenizer<R>,
    header: Option<Arc<HeaderRecord>>,
}

impl<'r, R: io::Read> Iterator for DataRecords<'r, R> {
    type Item = Result<DataRecord>;

    fn next(&mut self) -> Option<Result<DataRecord>> {
        if self.tok.is_closed() {
            return None;
        }
        match self.tok.parse_record(self.header.as_ref()) {
            Ok(None) => None,
            Ok(Some(record)) => Some(Ok(record)),
            Err(err) => Some(Err(err)),
        }
    }
}
