//! Case-insensitive, insertion-ordered header multimap.

use crate::proto::{HeaderMap, HeaderValue};

/// Canonical form of a header name: ASCII lower-case, as carried by HTTP/2.
pub fn canonical_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

/// Text of a wire header.
///
/// The cooked `value` wins when it is non-empty; otherwise `raw_value` is
/// decoded (invalid UTF-8 is replaced, never rejected).
pub fn header_text(header: &HeaderValue) -> String {
    if !header.value.is_empty() {
        return header.value.clone();
    }
    String::from_utf8_lossy(&header.raw_value).into_owned()
}

/// Multimap from canonical header name to one or more values.
///
/// Entries are append-only: there is no way to remove or overwrite a value
/// once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key`, keeping any existing values.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        let key = canonical_key(key);
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Fold every header of a wire header map into this one.
    pub fn extend_from_wire(&mut self, map: &HeaderMap) {
        for header in &map.headers {
            self.append(&header.key, header_text(header));
        }
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).first().map(String::as_str)
    }

    /// All values recorded for `key`, in arrival order.
    pub fn get_all(&self, key: &str) -> &[String] {
        let key = canonical_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        !self.get_all(key).is_empty()
    }

    /// Iterate over `(name, values)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, values)| (k.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
