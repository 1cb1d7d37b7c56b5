use std::error;
use std::fmt;

use bstr::ByteSlice;

use crate::config::is_whitespace;

/// A UTF-8 validation error for a single materialized value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Utf8Error {
    valid_up_to: usize,
}

impl Utf8Error {
    /// The index into the value up to which valid UTF-8 was verified.
    pub fn valid_up_to(&self) -> usize {
        self.valid_up_to
    }
}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid UTF-8 in value near byte index {}",
            self.valid_up_to
        )
    }
}

impl error::Error for Utf8Error {}

/// Builds the text of a single value from notifications sent by a scanner.
///
/// The accumulator never owns the scanner's input buffer. Instead, it
/// tracks a *demarcation*: a run of bytes in the input buffer that is, so
/// far, a contiguous copy of the value. As long as the value stays a single
/// run within a single buffer fill, materializing it slices the input buffer
/// directly. When that stops being true (a byte inside the value had to be
/// dropped, or the input buffer is about to be refilled), the demarcated run
/// is copied into a local buffer that is reused across values.
///
/// The accumulator also tracks the *protected span*: the part of the value
/// produced inside quotes. Whitespace trimming never enters it.
///
/// Every method that may need to read the input takes it as a parameter,
/// and callers must pass the same buffer (unchanged) that the positions
/// they reported refer to.
#[derive(Clone, Default)]
pub struct ValueAccumulator {
    /// Start of the demarcated run in the input buffer.
    run_start: usize,
    /// Length of the demarcated run.
    run_len: usize,
    /// Set when a byte was dropped after the current run began. The run is
    /// copied out before the next byte is included.
    gap: bool,
    /// Runs that were copied out of the input buffer, in order.
    local: Vec<u8>,
    /// Whether `local` holds a prefix of the value.
    copied: bool,
    /// The logical length of the value so far.
    len: usize,
    /// The protected span, as offsets into the logical value.
    quoted: Option<(usize, usize)>,
}

impl fmt::Debug for ValueAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ValueAccumulator")
            .field("run_start", &self.run_start)
            .field("run_len", &self.run_len)
            .field("gap", &self.gap)
            .field("local", &self.local.as_bstr())
            .field("copied", &self.copied)
            .field("len", &self.len)
            .field("quoted", &self.quoted)
            .finish()
    }
}

impl ValueAccumulator {
    /// Create a new empty accumulator.
    pub fn new() -> ValueAccumulator {
        ValueAccumulator::default()
    }

    /// Reset this accumulator for a new value.
    ///
    /// The local copy buffer keeps its allocation.
    pub fn clear(&mut self) {
        self.run_start = 0;
        self.run_len = 0;
        self.gap = false;
        self.local.clear();
        self.copied = false;
        self.len = 0;
        self.quoted = None;
    }

    /// The logical length of the value in bytes, before trimming.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if and only if no byte has been included yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if this value could not be kept as a single view into
    /// the input buffer.
    pub fn is_copied(&self) -> bool {
        self.copied
    }

    /// Record that `buf[pos]` belongs to the value.
    ///
    /// `was_quoted` indicates whether the byte was read inside quotes, which
    /// extends the protected span.
    #[inline]
    pub fn notify_char_included(
        &mut self,
        buf: &[u8],
        pos: usize,
        was_quoted: bool,
    ) {
        self.notify_chars_included(buf, pos, 1, was_quoted);
    }

    /// Record that `buf[pos..pos + len]` belongs to the value.
    pub fn notify_chars_included(
        &mut self,
        buf: &[u8],
        pos: usize,
        len: usize,
        was_quoted: bool,
    ) {
        if len == 0 {
            return;
        }
        debug_assert!(pos + len <= buf.len());
        if self.gap {
            self.flush(buf);
        }
        if self.run_len == 0 {
            self.run_start = pos;
        }
        debug_assert_eq!(self.run_start + self.run_len, pos);
        self.run_len += len;
        if was_quoted {
            let start = self.quoted.map_or(self.len, |(start, _)| start);
            self.quoted = Some((start, self.len + len));
        }
        self.len += len;
    }

    /// Record that the byte just consumed does not belong to the value.
    ///
    /// This happens for delimiters and for the first half of a doubled
    /// delimiter. The value can no longer be a single view into the input
    /// buffer if anything follows, so the demarcated run is copied out
    /// before the next byte is included. A value whose dropped bytes all sit
    /// at its edges, like the quotes around `"abc"`, stays a view.
    #[inline]
    pub fn notify_char_excluded(&mut self) {
        if self.run_len > 0 {
            self.gap = true;
        }
    }

    /// Copy everything demarcated so far out of `buf`, which the caller is
    /// about to overwrite.
    pub fn notify_buffer_refilling(&mut self, buf: &[u8]) {
        self.flush(buf);
    }

    /// Materialize the value as an owned string.
    ///
    /// Leading and trailing whitespace (space or tab) is trimmed unless the
    /// corresponding `preserve_*` flag is set. Trimming never removes
    /// anything from the protected span.
    ///
    /// This does not reset the accumulator. Call `clear` before starting the
    /// next value.
    pub fn to_string(
        &mut self,
        buf: &[u8],
        preserve_leading: bool,
        preserve_trailing: bool,
    ) -> Result<String, Utf8Error> {
        let bytes: &[u8] = if !self.copied {
            if self.run_len == 0 {
                &[]
            } else {
                &buf[self.run_start..self.run_start + self.run_len]
            }
        } else {
            self.flush(buf);
            &self.local
        };
        debug_assert_eq!(bytes.len(), self.len);

        let (lead_limit, trail_limit) = match self.quoted {
            None => (bytes.len(), 0),
            Some((start, end)) => (start, end),
        };
        let mut start = 0;
        if !preserve_leading {
            while start < lead_limit && is_whitespace(bytes[start]) {
                start += 1;
            }
        }
        let mut end = bytes.len();
        if !preserve_trailing {
            let floor = start.max(trail_limit);
            while end > floor && is_whitespace(bytes[end - 1]) {
                end -= 1;
            }
        }
        match bytes[start..end].to_str() {
            Ok(s) => Ok(s.to_string()),
            Err(err) => Err(Utf8Error { valid_up_to: err.valid_up_to() }),
        }
    }

    /// Move the demarcated run into the local buffer.
    fn flush(&mut self, buf: &[u8]) {
        self.gap = false;
        if self.run_len == 0 {
            return;
        }
        let (start, end) = (self.run_start, self.run_start + self.run_len);
        self.local.extend_from_slice(&buf[start..end]);
        self.run_len = 0;
        self.copied = true;
    }
}

#[cfg(test)]
mod tests {
    use super::ValueAccumulator;

    fn include_all(
        acc: &mut ValueAccumulator,
        buf: &[u8],
        start: usize,
        end: usize,
        quoted: bool,
    ) {
        for pos in start..end {
            acc.notify_char_included(buf, pos, quoted);
        }
    }

    fn finish(acc: &mut ValueAccumulator, buf: &[u8]) -> String {
        acc.to_string(buf, false, false).unwrap()
    }

    #[test]
    fn empty() {
        let mut acc = ValueAccumulator::new();
        assert!(acc.is_empty());
        assert_eq!(finish(&mut acc, b""), "");
        assert!(!acc.is_copied());
    }

    #[test]
    fn debug_shows_copied_bytes() {
        let buf = b"ab";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 0, 2, false);
        acc.notify_buffer_refilling(buf);
        let shown = format!("{:?}", acc);
        assert!(shown.starts_with("ValueAccumulator"), "{}", shown);
        assert!(shown.contains(r#"local: "ab""#), "{}", shown);
    }

    #[test]
    fn contiguous_is_a_view() {
        let buf = b"xxfoobarxx";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 2, 8, false);
        assert_eq!(acc.len(), 6);
        assert_eq!(finish(&mut acc, buf), "foobar");
        assert!(!acc.is_copied());
    }

    #[test]
    fn bulk_include() {
        let buf = b"foo,bar";
        let mut acc = ValueAccumulator::new();
        acc.notify_chars_included(buf, 4, 3, false);
        assert_eq!(finish(&mut acc, buf), "bar");
        assert!(!acc.is_copied());
    }

    #[test]
    fn edge_exclusions_stay_a_view() {
        // "abc"
        let buf = b"\"abc\"";
        let mut acc = ValueAccumulator::new();
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 1, 4, true);
        acc.notify_char_excluded();
        assert_eq!(finish(&mut acc, buf), "abc");
        assert!(!acc.is_copied());
    }

    #[test]
    fn inner_exclusion_copies() {
        // "a""b" with the first quote of the pair dropped.
        let buf = b"\"a\"\"b\"";
        let mut acc = ValueAccumulator::new();
        acc.notify_char_excluded();
        acc.notify_char_included(buf, 1, true);
        acc.notify_char_excluded();
        acc.notify_char_included(buf, 3, true);
        acc.notify_char_included(buf, 4, true);
        acc.notify_char_excluded();
        assert_eq!(finish(&mut acc, buf), "a\"b");
        assert!(acc.is_copied());
    }

    #[test]
    fn refill_copies() {
        let mut acc = ValueAccumulator::new();
        let mut buf = *b"foo";
        include_all(&mut acc, &buf, 0, 3, false);
        acc.notify_buffer_refilling(&buf);
        buf.copy_from_slice(b"bar");
        include_all(&mut acc, &buf, 0, 3, false);
        assert_eq!(finish(&mut acc, &buf), "foobar");
        assert!(acc.is_copied());
    }

    #[test]
    fn refill_before_any_byte_stays_a_view() {
        let mut acc = ValueAccumulator::new();
        acc.notify_buffer_refilling(b"zzz");
        include_all(&mut acc, b"abc", 0, 3, false);
        assert_eq!(finish(&mut acc, b"abc"), "abc");
        assert!(!acc.is_copied());
    }

    #[test]
    fn trims_unquoted() {
        let buf = b" \t foo bar \t ";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 0, buf.len(), false);
        assert_eq!(acc.to_string(buf, false, false).unwrap(), "foo bar");
        assert_eq!(acc.to_string(buf, true, false).unwrap(), " \t foo bar");
        assert_eq!(acc.to_string(buf, false, true).unwrap(), "foo bar \t ");
        assert_eq!(acc.to_string(buf, true, true).unwrap(), " \t foo bar \t ");
    }

    #[test]
    fn all_whitespace_trims_to_empty() {
        let buf = b"   ";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 0, 3, false);
        assert_eq!(finish(&mut acc, buf), "");
        assert_eq!(acc.to_string(buf, true, true).unwrap(), "   ");
    }

    #[test]
    fn protected_span_is_never_trimmed() {
        // Models `  " a "  ` with quotes dropped.
        let buf = b"  \" a \"  ";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 0, 2, false);
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 3, 6, true);
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 7, 9, false);
        assert_eq!(finish(&mut acc, buf), " a ");
        assert_eq!(acc.to_string(buf, true, false).unwrap(), "   a ");
        assert_eq!(acc.to_string(buf, false, true).unwrap(), " a   ");
    }

    #[test]
    fn protected_span_covers_every_quoted_region() {
        // Models `" a" x "b "`: the protected span runs from the first
        // quoted byte to the last one.
        let mut acc = ValueAccumulator::new();
        let buf = b"\" a\" x \"b \"";
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 1, 3, true);
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 4, 7, false);
        acc.notify_char_excluded();
        include_all(&mut acc, buf, 8, 10, true);
        acc.notify_char_excluded();
        assert_eq!(finish(&mut acc, buf), " a x b ");
    }

    #[test]
    fn clear_resets() {
        let buf = b"\"a\"\"b\"";
        let mut acc = ValueAccumulator::new();
        acc.notify_char_included(buf, 1, true);
        acc.notify_char_excluded();
        acc.notify_char_included(buf, 3, true);
        assert!(acc.is_copied());
        acc.clear();
        assert!(acc.is_empty());
        assert!(!acc.is_copied());
        include_all(&mut acc, b"  x  ", 0, 5, false);
        assert_eq!(finish(&mut acc, b"  x  "), "x");
    }

    #[test]
    fn invalid_utf8() {
        let buf = b"ab\xFFcd";
        let mut acc = ValueAccumulator::new();
        include_all(&mut acc, buf, 0, buf.len(), false);
        let err = acc.to_string(buf, false, false).unwrap_err();
        assert_eq!(err.valid_up_to(), 2);
    }

    #[test]
    fn multibyte_split_across_refill() {
        let text = "é".as_bytes();
        let mut acc = ValueAccumulator::new();
        acc.notify_char_included(&text[..1], 0, false);
        acc.notify_buffer_refilling(&text[..1]);
        acc.notify_char_included(&text[1..], 0, false);
        assert_eq!(finish(&mut acc, &text[1..]), "é");
    }
}
