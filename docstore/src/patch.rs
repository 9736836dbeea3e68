//! Partial document updates: ordered `path -> value` assignments applied with `json_set`.

use serde_json::Value;

use crate::error::Result;
use crate::predicate::{bind_value, validate_path, SqliteQuery};

/// Ordered set of path assignments. Later entries win when paths repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPatch {
    fields: Vec<(String, Value)>,
}

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `path` to `value`; any JSON value is accepted, including arrays and objects.
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((path.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Renders `json_set(data, '<path>', json(?), ...)`.
    pub(crate) fn set_expr(&self) -> Result<String> {
        let mut expr = String::from("json_set(data");
        for (path, _) in &self.fields {
            validate_path(path)?;
            expr.push_str(&format!(", '{}', json(?)", path));
        }
        expr.push(')');
        Ok(expr)
    }

    /// Binds each value as JSON text so `json(?)` restores its type.
    pub(crate) fn bind_all<'q>(&self, mut query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        for (_, value) in &self.fields {
            query = bind_value(query, &Value::String(value.to_string()));
        }
        query
    }
}

impl<P: Into<String>, V: Into<Value>> FromIterator<(P, V)> for FieldPatch {
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |patch, (path, value)| patch.set(path, value))
    }
}
