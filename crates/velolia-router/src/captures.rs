//! Placeholder values captured from a matched path.
//!
//! Most routes have one or two placeholders, so values are kept inline on
//! the stack for up to four captures.

use serde_json::{Map, Value};
use smallvec::SmallVec;

const INLINE_CAPTURES: usize = 4;

/// Placeholder name/value pairs in declaration order.
///
/// # Example
///
/// ```rust
/// use velolia_router::Captures;
///
/// let mut captures = Captures::new();
/// captures.push("post", "42");
/// captures.push("comment", "7");
///
/// assert_eq!(captures.get("post"), Some("42"));
/// assert_eq!(captures.get("missing"), None);
/// assert_eq!(captures.sole(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captures {
    inner: SmallVec<[(String, String); INLINE_CAPTURES]>,
}

impl Captures {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// The value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The only captured value, when exactly one exists.
    #[must_use]
    pub fn sole(&self) -> Option<&str> {
        match self.inner.as_slice() {
            [(_, value)] => Some(value),
            _ => None,
        }
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// The captures as a JSON object of strings.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.inner
            .iter()
            .map(|(n, v)| (n.clone(), Value::String(v.clone())))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Captures {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Captures {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut captures = Captures::new();
        captures.push("id", "123");
        captures.push("name", "alice");

        assert_eq!(captures.get("id"), Some("123"));
        assert_eq!(captures.get("name"), Some("alice"));
        assert_eq!(captures.get("unknown"), None);
        assert_eq!(captures.len(), 2);
    }

    #[test]
    fn test_sole_requires_exactly_one() {
        let mut captures = Captures::new();
        assert_eq!(captures.sole(), None);

        captures.push("post", "9");
        assert_eq!(captures.sole(), Some("9"));

        captures.push("comment", "1");
        assert_eq!(captures.sole(), None);
    }

    #[test]
    fn test_iteration_keeps_declaration_order() {
        let captures: Captures = vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();

        let pairs: Vec<_> = captures.iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);

        let keys: Vec<_> = captures.to_map().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_many_captures_spill_to_heap() {
        let mut captures = Captures::new();
        for i in 0..10 {
            captures.push(format!("key{i}"), format!("value{i}"));
        }

        assert_eq!(captures.len(), 10);
        assert_eq!(captures.get("key5"), Some("value5"));
    }
}
