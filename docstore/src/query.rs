//! List query options: filter, ordering and paging for [`crate::DocumentStore::list`].

use crate::error::Result;
use crate::predicate::{path_expr, Predicate, SqliteQuery, WhereClause};
use crate::schema::CollectionSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub path: String,
    pub direction: Direction,
}

/// Structured replacement for a raw clause tail. Without ordering, rows come back in
/// insertion (rowid) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Predicate,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, path: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            path: path.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the tail after `SELECT data FROM <collection>`.
    pub(crate) fn render(&self, schema: &CollectionSchema) -> Result<RenderedQuery> {
        let where_clause = self.filter.build(schema)?;
        let mut sql = where_clause.to_sql();

        if self.order_by.is_empty() {
            sql.push_str(" ORDER BY rowid");
        } else {
            let mut terms = Vec::with_capacity(self.order_by.len());
            for order in &self.order_by {
                terms.push(format!(
                    "{} {}",
                    path_expr(&order.path, schema)?,
                    order.direction.as_sql()
                ));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        let limit = match (self.limit, self.offset) {
            (Some(limit), _) => Some(i64::try_from(limit).unwrap_or(i64::MAX)),
            (None, Some(_)) => Some(-1),
            (None, None) => None,
        };
        let offset = self.offset.map(|o| i64::try_from(o).unwrap_or(i64::MAX));
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }
        if offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        Ok(RenderedQuery {
            tail: sql,
            where_clause,
            limit,
            offset,
        })
    }
}

pub(crate) struct RenderedQuery {
    pub tail: String,
    where_clause: WhereClause,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl RenderedQuery {
    pub(crate) fn bind_all<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        let mut query = self.where_clause.bind_all(query);
        if let Some(limit) = self.limit {
            query = query.bind(limit);
        }
        if let Some(offset) = self.offset {
            query = query.bind(offset);
        }
        query
    }
}
