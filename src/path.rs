//! Keys and paths into nested values.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A single step into a mapping or a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Key {
    Field(String),
    Index(usize),
}

/// A location inside a tree, outermost key first.
pub type Path = Vec<Key>;

impl Key {
    /// Returns the key as a mapping field name.
    pub fn as_field(&self) -> Cow<'_, str> {
        match self {
            Key::Field(name) => Cow::Borrowed(name),
            Key::Index(index) => Cow::Owned(index.to_string()),
        }
    }

    /// Returns the key as a sequence index.
    ///
    /// Fields holding a decimal number are accepted, so `"1"` and `1` address
    /// the same element of a sequence.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Field(name) => name.parse().ok(),
            Key::Index(index) => Some(*index),
        }
    }

    /// Whether two keys address the same slot.
    pub fn same_slot(&self, other: &Key) -> bool {
        self.as_field() == other.as_field()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(name) => f.write_str(name),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Field(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Field(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// Parses a dotted path such as `server.hosts.0`.
///
/// Every segment becomes a [`Key::Field`]; numeric fields still address
/// sequence elements. The empty string is the empty path.
pub fn parse_path(path: &str) -> Path {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.').map(Key::from).collect()
}

/// Renders a path back into dotted form.
pub fn display_path(path: &[Key]) -> String {
    path.iter()
        .map(|key| key.as_field())
        .collect::<Vec<_>>()
        .join(".")
}

/// Whether one of the two paths is a prefix of the other.
pub fn overlaps(a: &[Key], b: &[Key]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.same_slot(y))
}

/// Walks `path` into a plain value.
///
/// Returns `None` when a segment is missing or when the walk hits a scalar
/// before the path is exhausted.
pub fn reach<'v>(value: &'v Value, path: &[Key]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key.as_field().as_ref()),
        Value::Array(items) => key.as_index().and_then(|index| items.get(index)),
        _ => None,
    })
}
