use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csvstream_core::{Encoder, Terminator};
use tracing::debug;

use crate::error::{Error, Result};

/// Builds a CSV writer with various configuration knobs.
///
/// The separator and delimiter should match those of the tokenizer that
/// will read the output.
#[derive(Debug)]
pub struct WriterBuilder {
    capacity: usize,
    encoder: Encoder,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder { capacity: 8 * (1 << 10), encoder: Encoder::new() }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use csvstream::{Terminator, WriterBuilder};
    ///
    /// # fn main() -> csvstream::Result<()> {
    /// let mut wtr = WriterBuilder::new()
    ///     .value_separator(b'\t')?
    ///     .terminator(Terminator::Any(b'\n'))
    ///     .from_writer(vec![]);
    /// wtr.write_record(&["a", "b\tc"])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?).unwrap();
    /// assert_eq!(data, "a\t\"b\tc\"\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes to `wtr`.
    ///
    /// The writer is buffered for you automatically.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Writer<W> {
        Writer::new(self, wtr)
    }

    /// Build a CSV writer from this configuration that writes to the file
    /// at `path`. The file is created if it does not exist and truncated
    /// otherwise.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        Ok(Writer::new(self, File::create(path)?))
    }

    /// The value separator. The default is `b','`.
    pub fn value_separator(&mut self, sep: u8) -> Result<&mut WriterBuilder> {
        self.encoder.set_value_separator(sep)?;
        Ok(self)
    }

    /// The value delimiter. The default is `Some(b'"')`.
    ///
    /// With `None`, writing a value that needs delimiting fails.
    pub fn value_delimiter(
        &mut self,
        delim: Option<u8>,
    ) -> Result<&mut WriterBuilder> {
        self.encoder.set_value_delimiter(delim)?;
        Ok(self)
    }

    /// Whether to delimit every value, even those that do not need it.
    ///
    /// This is disabled by default.
    pub fn always_delimit(&mut self, yes: bool) -> Result<&mut WriterBuilder> {
        self.encoder.set_always_delimit(yes)?;
        Ok(self)
    }

    /// The record terminator.
    ///
    /// The default is `\r\n` on Windows and `\n` everywhere else.
    pub fn terminator(&mut self, term: Terminator) -> &mut WriterBuilder {
        self.encoder.set_terminator(term);
        self
    }

    /// The capacity of the output buffer, in bytes.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A CSV writer.
///
/// Each record is encoded in full before any of it is written, so a record
/// that fails to encode leaves the output untouched. Output is buffered;
/// call `flush`, `close` or `into_inner` to be sure it reaches the
/// underlying writer.
///
/// Everything this writer produces reads back unchanged through a
/// `Tokenizer` configured with the same separator and delimiter.
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    /// `None` once the writer is closed.
    wtr: Option<io::BufWriter<W>>,
    encoder: Encoder,
    /// The encoded form of the record being written.
    scratch: Vec<u8>,
    records: u64,
}

impl Writer<File> {
    /// Create a writer with the default configuration that writes to the
    /// file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    fn new(builder: &WriterBuilder, wtr: W) -> Writer<W> {
        Writer {
            wtr: Some(io::BufWriter::with_capacity(builder.capacity, wtr)),
            encoder: builder.encoder.clone(),
            scratch: vec![],
            records: 0,
        }
    }

    /// Create a writer with the default configuration that writes to `wtr`.
    pub fn from_writer(wtr: W) -> Writer<W> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Write a single record.
    ///
    /// A record with no values writes just the terminator, which reads back
    /// as a record with one empty value.
    ///
    /// # Example
    ///
    /// ```
    /// use csvstream::{Terminator, WriterBuilder};
    ///
    /// # fn main() -> csvstream::Result<()> {
    /// let mut wtr = WriterBuilder::new()
    ///     .terminator(Terminator::Any(b'\n'))
    ///     .from_writer(vec![]);
    /// wtr.write_record(&["a", "b,c", " d"])?;
    /// wtr.write_record(vec![String::from("say \"hi\"")])?;
    ///
    /// let data = String::from_utf8(wtr.into_inner()?).unwrap();
    /// assert_eq!(data, "a,\"b,c\",\" d\"\n\"say \"\"hi\"\"\"\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_record<I, T>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let wtr = self.wtr.as_mut().ok_or(Error::Closed)?;
        self.scratch.clear();
        let record = self.records;
        let values = values.into_iter().map(StrBytes);
        self.encoder
            .encode_record(values, &mut self.scratch)
            .map_err(|err| Error::DelimiterRequired {
                record,
                field: err.field(),
            })?;
        wtr.write_all(&self.scratch)?;
        self.records += 1;
        Ok(())
    }

    /// The number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Flush the buffer to the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        let wtr = self.wtr.as_mut().ok_or(Error::Closed)?;
        wtr.flush()?;
        debug!(records = self.records, "flushed CSV writer");
        Ok(())
    }

    /// Flush and drop the underlying writer.
    ///
    /// Every later operation fails with `Error::Closed`. Closing an already
    /// closed writer does nothing.
    pub fn close(&mut self) -> Result<()> {
        let mut wtr = match self.wtr.take() {
            None => return Ok(()),
            Some(wtr) => wtr,
        };
        wtr.flush()?;
        debug!(records = self.records, "closed CSV writer");
        Ok(())
    }

    /// Returns true if this writer has been closed.
    pub fn is_closed(&self) -> bool {
        self.wtr.is_none()
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        let wtr = self.wtr.take().ok_or(Error::Closed)?;
        wtr.into_inner().map_err(|err| Error::Io(err.into_error()))
    }

    /// Returns a reference to the underlying writer, unless closed.
    pub fn get_ref(&self) -> Option<&W> {
        self.wtr.as_ref().map(|wtr| wtr.get_ref())
    }

    /// The encoder holding this writer's configuration.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Change the value separator.
    pub fn set_value_separator(&mut self, sep: u8) -> Result<()> {
        self.ensure_open()?;
        self.encoder.set_value_separator(sep)?;
        debug!(separator = ?(sep as char), "changed value separator");
        Ok(())
    }

    /// Change the value delimiter.
    pub fn set_value_delimiter(&mut self, delim: Option<u8>) -> Result<()> {
        self.ensure_open()?;
        self.encoder.set_value_delimiter(delim)?;
        let shown = delim.map(|b| b as char);
        debug!(delimiter = ?shown, "changed value delimiter");
        Ok(())
    }

    /// Change whether every value is delimited.
    pub fn set_always_delimit(&mut self, yes: bool) -> Result<()> {
        self.ensure_open()?;
        self.encoder.set_always_delimit(yes)?;
        debug!(always = yes, "changed value delimiting");
        Ok(())
    }

    /// Change the record terminator.
    pub fn set_terminator(&mut self, term: Terminator) -> Result<()> {
        self.ensure_open()?;
        self.encoder.set_terminator(term);
        debug!(terminator = ?term, "changed record terminator");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.wtr.is_none() {
            return Err(Error::Closed);
        }
        Ok(())
    }
}

/// Views a string value as the bytes the encoder works on.
struct StrBytes<T>(T);

impl<T: AsRef<str>> AsRef<[u8]> for StrBytes<T> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref().as_bytes()
    }
}
