//! Path predicates: ordered `path = value` terms rendered into a parameterized WHERE fragment.
//!
//! Paths use SQLite JSON path syntax (`$.name`, `$.address.city`, `$.tags[0]`) and are
//! inlined as string literals after validation. Values are always bound parameters.

use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

use crate::error::{DocStoreError, Result};
use crate::schema::CollectionSchema;

/// Reserved identity path.
pub const ID_PATH: &str = "$.id";

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Checks that `path` is a JSON path that is safe to inline into SQL.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('$') {
        return Err(DocStoreError::InvalidInput(format!(
            "JSON path must start with '$': {:?}",
            path
        )));
    }
    if path.contains(['\'', '\0', ';']) {
        return Err(DocStoreError::InvalidInput(format!(
            "JSON path contains a forbidden character: {:?}",
            path
        )));
    }
    Ok(())
}

/// SQL expression extracting `path` from the payload, using the lookup column for `$.id`.
pub(crate) fn path_expr(path: &str, schema: &CollectionSchema) -> Result<String> {
    validate_path(path)?;
    if path == ID_PATH {
        return Ok(schema.id_expr().to_string());
    }
    Ok(format!("json_extract(data, '{}')", path))
}

/// Conjunction of equality terms over JSON paths, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicate matching documents whose `$.id` equals `id`.
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::new().eq(ID_PATH, id)
    }

    /// Adds a `path = value` term. JSON `null` matches an explicit null or a missing path.
    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((path.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.terms.iter().map(|(path, value)| (path.as_str(), value))
    }

    /// Renders the terms for a collection with the given schema.
    pub fn build(&self, schema: &CollectionSchema) -> Result<WhereClause> {
        let mut fragments = Vec::with_capacity(self.terms.len());
        let mut params = Vec::with_capacity(self.terms.len());

        for (path, value) in &self.terms {
            let expr = path_expr(path, schema)?;
            if value.is_null() {
                fragments.push(format!("{} IS NULL", expr));
            } else {
                fragments.push(format!("{} = ?", expr));
                params.push(value.clone());
            }
        }

        Ok(WhereClause {
            sql: fragments.join(" AND "),
            params,
        })
    }
}

impl<P: Into<String>, V: Into<Value>> FromIterator<(P, V)> for Predicate {
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |predicate, (path, value)| predicate.eq(path, value))
    }
}

/// A rendered predicate: the condition text (without `WHERE`) and its parameters in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// ` WHERE <cond>` or an empty string when there are no terms.
    pub fn to_sql(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql)
        }
    }

    pub(crate) fn bind_all<'q>(&self, mut query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        for value in &self.params {
            query = bind_value(query, value);
        }
        query
    }
}

/// Binds a JSON value with the SQLite type `json_extract` would produce for it.
pub(crate) fn bind_value<'q>(query: SqliteQuery<'q>, value: &Value) -> SqliteQuery<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        // json_extract yields 1/0 for true/false
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}
