//! Bound SQL statements
//!
//! A [`Sql`] pairs an immutable SQL string with positional bound parameters.
//! Parameters are bound through the client rather than substituted into the
//! string, so argument values can never alter the statement shape.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, ParamsFromIter};
use std::fmt;
use std::slice;

/// An immutable SQL statement with positional bound parameters.
///
/// Build one with [`Sql::new`] and chain [`Sql::bind`] for each `?N`
/// placeholder in the text:
///
/// ```rust,ignore
/// let sql = Sql::new("SELECT word FROM words WHERE word = ?1")
///     .bind("a".to_string());
/// ```
#[derive(Debug, Clone)]
pub struct Sql {
    text: String,
    params: Vec<Value>,
}

impl Sql {
    /// Create a statement with no bound parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Append one positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    /// The SQL text of this statement.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The bound parameters, in a form accepted by `rusqlite` execution
    /// methods.
    pub fn params(&self) -> ParamsFromIter<slice::Iter<'_, Value>> {
        params_from_iter(self.params.iter())
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Sql::new(text)
    }
}

impl From<String> for Sql {
    fn from(text: String) -> Self {
        Sql::new(text)
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
