use std::iter::FromIterator;
use std::ops;
use std::slice;
use std::sync::Arc;

/// The names of the columns of a CSV source.
///
/// A header is usually parsed from the first record with
/// [`Tokenizer::parse_record`](crate::Tokenizer::parse_record) and then
/// wrapped in an `Arc` so that it can be shared by every record that
/// follows.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct HeaderRecord {
    names: Vec<String>,
}

impl HeaderRecord {
    /// Create a header from a sequence of column names.
    pub fn new<I, T>(names: I) -> HeaderRecord
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        HeaderRecord { names: names.into_iter().map(Into::into).collect() }
    }

    /// Return the name of column `i`, if it exists.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(|s| &**s)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if and only if this header has no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns an iterator over the column names.
    pub fn iter(&self) -> FieldIter<'_> {
        FieldIter(self.names.iter())
    }

    /// Returns the index of the first column named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl From<Vec<String>> for HeaderRecord {
    fn from(names: Vec<String>) -> HeaderRecord {
        HeaderRecord { names }
    }
}

impl From<DataRecord> for HeaderRecord {
    /// Reinterpret a parsed record as a header.
    fn from(record: DataRecord) -> HeaderRecord {
        HeaderRecord { names: record.values }
    }
}

impl<T: Into<String>> FromIterator<T> for HeaderRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> HeaderRecord {
        HeaderRecord::new(iter)
    }
}

impl<'a> IntoIterator for &'a HeaderRecord {
    type IntoIter = FieldIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> FieldIter<'a> {
        self.iter()
    }
}

/// A single parsed record, optionally tied to the header of its source.
///
/// Records own their values, so they outlive the tokenizer that produced
/// them. The header is shared, never copied.
///
/// When the `serde` feature is enabled, a record serializes as the sequence
/// of its values. The header is not serialized.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DataRecord {
    #[cfg_attr(feature = "serde", serde(skip))]
    header: Option<Arc<HeaderRecord>>,
    values: Vec<String>,
}

impl DataRecord {
    /// Create a record from its values and an optional header.
    ///
    /// The number of values need not match the number of columns in the
    /// header.
    pub fn new(
        header: Option<Arc<HeaderRecord>>,
        values: Vec<String>,
    ) -> DataRecord {
        DataRecord { header, values }
    }

    /// The header this record was parsed with, if any.
    pub fn header(&self) -> Option<&Arc<HeaderRecord>> {
        self.header.as_ref()
    }

    /// Return the value at index `i`, if it exists.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.values.get(i).map(|s| &**s)
    }

    /// Return the value in the column named `name`.
    ///
    /// This returns `None` if the record has no header, if the header has no
    /// such column, or if this record is shorter than the header.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        let i = self.header.as_ref()?.index_of(name)?;
        self.get(i)
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if and only if this record has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> FieldIter<'_> {
        FieldIter(self.values.iter())
    }

    /// Consume this record and return its values.
    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

impl ops::Index<usize> for DataRecord {
    type Output = str;

    fn index(&self, i: usize) -> &str {
        &self.values[i]
    }
}

impl<'a> IntoIterator for &'a DataRecord {
    type IntoIter = FieldIter<'a>;
    type Item = &'a str;

    fn into_iter(self) -> FieldIter<'a> {
        self.iter()
    }
}

impl<T: AsRef<str>> PartialEq<[T]> for DataRecord {
    fn eq(&self, other: &[T]) -> bool {
        self.values.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| a == b.as_ref())
    }
}

/// An iterator over the fields of a `HeaderRecord` or `DataRecord`.
#[derive(Clone, Debug)]
pub struct FieldIter<'a>(slice::Iter<'a, String>);

impl<'a> Iterator for FieldIter<'a> {
    type Item = &'a str;

    #[inline]
    fn next(&mut self) -> Option<&'a str> {
        self.0.next().map(|s| &**s)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a> DoubleEndedIterator for FieldIter<'a> {
    #[inline]
    fn next_back(&mut self) -> Option<&'a str> {
        self.0.next_back().map(|s| &**s)
    }
}

impl<'a> ExactSizeIterator for FieldIter<'a> {}
