//! Path normalisation and placeholder patterns.
//!
//! Placeholder syntax:
//!
//! | Token | Meaning |
//! |---|---|
//! | `{post}` | required, captures one segment |
//! | `{post:\d+}` | same; the constraint is accepted and ignored (braces inside it must balance) |
//! | `{post?}` | optional; the preceding `/` becomes optional too |

use std::borrow::Cow;

use regex::Regex;
use tracing::warn;

use crate::captures::Captures;

/// Collapses redundant separators and enforces a single leading `/`.
///
/// Any query string or fragment is dropped.
///
/// ```rust
/// use velolia_router::normalize_path;
///
/// assert_eq!(normalize_path("//admin///users/"), "/admin/users");
/// assert_eq!(normalize_path(""), "/");
/// assert_eq!(normalize_path("/posts?page=2"), "/posts");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Joins a group prefix onto the current one.
#[must_use]
pub fn normalize_prefix(existing: &str, new: &str) -> String {
    normalize_path(&format!(
        "{}/{}",
        existing.trim_end_matches('/'),
        new.trim_matches('/')
    ))
}

/// One `{...}` token of a route path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    name: String,
    optional: bool,
}

impl Placeholder {
    /// The placeholder name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the placeholder was declared with a trailing `?`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

#[derive(Debug)]
pub(crate) enum Token<'a> {
    Literal(&'a str),
    Placeholder(Placeholder),
}

/// Splits a path into literal runs and placeholder tokens.
///
/// Braces inside a constraint nest, so `{id:\d{3}}` is one token.
pub(crate) fn tokenize(path: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        let Some(close) = closing_brace(rest, open) else {
            break;
        };
        if open > 0 {
            tokens.push(Token::Literal(&rest[..open]));
        }

        let inner = &rest[open + 1..close];
        let head = inner.split_once(':').map_or(inner, |(head, _)| head);
        let (name, optional) = match head.strip_suffix('?') {
            Some(name) => (name, true),
            None => (head, false),
        };
        tokens.push(Token::Placeholder(Placeholder {
            name: name.trim().to_string(),
            optional,
        }));

        rest = &rest[close + 1..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    tokens
}

fn closing_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0_usize;
    for (offset, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// A compiled route path.
///
/// # Example
///
/// ```rust
/// use velolia_router::PathPattern;
///
/// let pattern = PathPattern::compile("/posts/{post}/comments/{comment?}");
/// assert!(pattern.is_dynamic());
///
/// let captures = pattern.captures("/posts/42/comments").unwrap();
/// assert_eq!(captures.get("post"), Some("42"));
/// assert_eq!(captures.get("comment"), None);
///
/// assert!(pattern.captures("/posts").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    path: String,
    placeholders: Vec<Placeholder>,
    matcher: Option<Regex>,
}

impl PathPattern {
    /// Compiles a normalised path.
    ///
    /// A path is dynamic iff it contains `{`. A dynamic path whose matcher
    /// cannot be built is kept but never matches.
    #[must_use]
    pub fn compile(path: &str) -> Self {
        if !path.contains('{') {
            return Self {
                path: path.to_string(),
                placeholders: Vec::new(),
                matcher: None,
            };
        }

        let mut placeholders = Vec::new();
        let mut source = String::from("^");
        for token in tokenize(path) {
            match token {
                Token::Literal(text) => source.push_str(&regex::escape(text)),
                Token::Placeholder(placeholder) => {
                    if placeholder.optional && source.ends_with('/') {
                        source.pop();
                        source.push_str("(?:/([^/]+))?");
                    } else if placeholder.optional {
                        source.push_str("([^/]+)?");
                    } else {
                        source.push_str("([^/]+)");
                    }
                    placeholders.push(placeholder);
                }
            }
        }
        source.push('$');

        let matcher = match Regex::new(&source) {
            Ok(regex) => Some(regex),
            Err(err) => {
                warn!(path = %path, error = %err, "route pattern failed to compile");
                None
            }
        };

        Self {
            path: path.to_string(),
            placeholders,
            matcher,
        }
    }

    /// The normalised source path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the path has placeholders.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.path.contains('{')
    }

    /// Placeholders in declaration order.
    #[must_use]
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Matches a normalised request path.
    ///
    /// Static patterns compare literally. Captured values are percent-decoded,
    /// so `%2F` inside a segment comes back as `/`. Unfilled optional
    /// placeholders are left out of the returned captures.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let Some(matcher) = &self.matcher else {
            return (!self.is_dynamic() && self.path == path).then(Captures::new);
        };

        let found = matcher.captures(path)?;
        let mut captures = Captures::new();
        for (index, placeholder) in self.placeholders.iter().enumerate() {
            if let Some(value) = found.get(index + 1) {
                let raw = value.as_str();
                let decoded = urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned);
                captures.push(placeholder.name.clone(), decoded);
            }
        }
        Some(captures)
    }
}
