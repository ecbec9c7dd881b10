use std::fmt;

use serde::{Deserialize, Serialize};

/// A storage namespace: the key one whole collection lives under.
///
/// Namespaces are plain lowercase identifiers (`resources`, `records`) so the
/// file backend can use them directly as file stems. Anything else is
/// rejected at construction, which keeps key collisions and path traversal
/// out of the backends entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace, validating the identifier.
    ///
    /// Valid: non-empty, ASCII lowercase alphanumerics and underscores.
    pub fn new(name: &str) -> Option<Self> {
        let ok = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        ok.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
