/*!
The `csvstream` crate provides a streaming CSV tokenizer and writer.

The tokenizer reads from any `std::io::Read` through a fixed size buffer
and produces records of owned strings. It never rejects malformed CSV;
instead, every input has one well defined interpretation. Values are made
directly from the input buffer whenever they are a contiguous run of it,
and are only copied when a quote had to be dropped from their middle or the
buffer was refilled while they were being read.

The writer is the tokenizer's inverse: it delimits a value only when the
tokenizer would not read it back unchanged otherwise.

# Brief overview

* [`Tokenizer`] reads records. [`TokenizerBuilder`] configures it.
* [`Writer`] writes records. [`WriterBuilder`] configures it.
* [`DataRecord`] is a parsed record, optionally tied to a shared
  [`HeaderRecord`].
* [`ParserConfig`] holds the dialect a tokenizer reads. With the `serde`
  feature (on by default), it can be loaded from any serde format.
* [`Error`] covers every failure. Malformed CSV is never one of them.

The buffer-level pieces (value accumulation, byte classification and field
encoding) live in the `csvstream-core` crate, which does no I/O.

# Logging

This crate emits [`tracing`](https://docs.rs/tracing) events: `trace`
level on every buffer refill and record batch, and `debug` level on end of
input, configuration changes, flushes and closes. It never installs a
subscriber.

# Example

This example reads a header, then every record after it, and writes the
records back out with semicolons.

```
use std::sync::Arc;

use csvstream::{HeaderRecord, Terminator, Tokenizer, WriterBuilder};

# fn main() -> csvstream::Result<()> {
let data = "\
city,country,pop
Boston,United States,4628910
\"Concord, MA\",United States,42695
";
let mut tok = Tokenizer::from_reader(data.as_bytes());
let header = match tok.parse_record(None)? {
    None => return Ok(()),
    Some(record) => Arc::new(HeaderRecord::from(record)),
};

let mut wtr = WriterBuilder::new()
    .value_separator(b';')?
    .terminator(Terminator::Any(b'\n'))
    .from_writer(vec![]);
for result in tok.records_with_header(header) {
    let record = result?;
    wtr.write_record(&[record.get_by_name("city").unwrap_or("")])?;
}

let out = String::from_utf8(wtr.into_inner()?).unwrap();
assert_eq!(out, "Boston\nConcord, MA\n");
# Ok(())
# }
```
*/

#![deny(missing_docs)]

pub use csvstream_core::{
    ConfigError, DelimiterRequired, Encoder, ParserConfig, Terminator,
    Utf8Error,
};

pub use crate::error::{Error, Result};
pub use crate::record::{DataRecord, FieldIter, HeaderRecord};
pub use crate::tokenizer::{DataRecords, Tokenizer, TokenizerBuilder};
pub use crate::writer::{Writer, WriterBuilder};

mod error;
mod record;
mod tokenizer;
mod writer;
