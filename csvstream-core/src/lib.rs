/*!
`csvstream-core` provides the buffer-level pieces of a streaming CSV
tokenizer and writer. It performs no I/O of its own.

The pieces are:

* [`ParserConfig`] and [`Classifier`]: the structural characters of a
  dialect and a cheap test for bytes that might be one of them.
* [`ValueAccumulator`]: builds a single value from positions in a caller
  owned input buffer, copying only when the value stops being a contiguous
  slice of that buffer.
* [`ValueList`]: the reusable list of values in the record under
  construction.
* [`Encoder`]: the inverse of the tokenizer, which wraps values in the
  delimiter only when they need it.

Most users want the `csvstream` crate instead, which drives these pieces
over any `std::io::Read` or `std::io::Write`.

# Example

This shows how a scanner reports a value to the accumulator. The quotes
around `"b c"` are dropped, and the value is still materialized straight
from the input buffer.

```
use csvstream_core::ValueAccumulator;

let buf = b"a,\"b c\"";
let mut acc = ValueAccumulator::new();
acc.notify_char_excluded();
acc.notify_chars_included(buf, 3, 3, true);
acc.notify_char_excluded();
assert_eq!(acc.to_string(buf, false, false).unwrap(), "b c");
assert!(!acc.is_copied());
```
*/

#![deny(missing_docs)]

pub use crate::config::{
    is_whitespace, validate, Classifier, ConfigError, ParserConfig, CR, LF,
    SPACE, TAB,
};
pub use crate::value::{Utf8Error, ValueAccumulator};
pub use crate::values::{Iter as ValueIter, ValueList};
pub use crate::writer::{DelimiterRequired, Encoder, Terminator};

mod config;
mod value;
mod values;
mod writer;
