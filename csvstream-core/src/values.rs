use std::slice;

/// The smallest capacity a list grows to on its first push.
const MIN_CAPACITY: usize = 4;

/// An append-only, reusable list of the values in one record.
///
/// Capacity grows by doubling (starting at 4) and is never given back, so a
/// tokenizer that reuses one list allocates only until it has seen its
/// widest record.
#[derive(Clone, Debug, Default)]
pub struct ValueList {
    values: Vec<String>,
}

impl ValueList {
    /// Create a new empty list without allocating.
    pub fn new() -> ValueList {
        ValueList::default()
    }

    /// Append a value.
    pub fn push(&mut self, value: String) {
        if self.values.len() == self.values.capacity() {
            let grow = self.values.capacity().max(MIN_CAPACITY);
            self.values.reserve_exact(grow);
        }
        self.values.push(value);
    }

    /// Remove every value, keeping the allocation.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// The value at index `i`, if it exists.
    pub fn get(&self, i: usize) -> Option<&str> {
        self.values.get(i).map(|s| &**s)
    }

    /// The number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if and only if this list holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The number of values this list can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// An iterator over the values in order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.values.iter())
    }

    /// Move every value out into an exact-size vector.
    ///
    /// Returns `None` when the list is empty. The list is left empty and
    /// keeps its allocation.
    pub fn take(&mut self) -> Option<Vec<String>> {
        if self.values.is_empty() {
            return None;
        }
        let mut out = Vec::with_capacity(self.values.len());
        out.extend(self.values.drain(..));
        Some(out)
    }

    /// Move every value out into an exact-size vector with `last` appended.
    ///
    /// This is how a record is completed: the final value never needs to
    /// enter the list. The list is left empty and keeps its allocation.
    pub fn take_with(&mut self, last: String) -> Vec<String> {
        let mut out = Vec::with_capacity(self.values.len() + 1);
        out.extend(self.values.drain(..));
        out.push(last);
        out
    }
}

/// An iterator over the values in a `ValueList`.
#[derive(Clone, Debug)]
pub struct Iter<'a>(slice::Iter<'a, String>);

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.0.next().map(|s| &**s)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {}

impl<'a> IntoIterator for &'a ValueList {
    type Item = &'a str;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}
