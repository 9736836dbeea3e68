//! Collection bootstrapping: creates the table behind a collection on first use.
//!
//! Every collection is a table with one JSON payload column `data`. When the lookup
//! column is enabled the table also declares a generated `id` column computed from
//! `$.id`, plus an index over it. Creation happens at most once per name per
//! [`SchemaInitializer`]; later calls hit the in-process cache.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DocStoreError, Result};

/// SQL expression for a document's identity when there is no lookup column.
pub(crate) const ID_PATH_EXPR: &str = "json_extract(data, '$.id')";

const MAX_NAME_LEN: usize = 64;

/// Table layout options applied when a collection is first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Declare the generated `id` column and index it.
    pub id_lookup_column: bool,
    /// Make the `id` index unique so duplicate ids are rejected by SQLite.
    pub unique_ids: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            id_lookup_column: true,
            unique_ids: false,
        }
    }
}

/// What the initializer learned about an existing collection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    /// The table has the generated `id` column.
    pub has_id_column: bool,
}

impl CollectionSchema {
    /// SQL expression that yields the document identity.
    pub fn id_expr(&self) -> &'static str {
        if self.has_id_column {
            "id"
        } else {
            ID_PATH_EXPR
        }
    }
}

/// Idempotent, per-name cached table creation.
#[derive(Clone, Default)]
pub struct SchemaInitializer {
    options: SchemaOptions,
    known: Arc<RwLock<HashMap<String, CollectionSchema>>>,
}

impl SchemaInitializer {
    pub fn new(options: SchemaOptions) -> Self {
        Self {
            options,
            known: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn options(&self) -> SchemaOptions {
        self.options
    }

    /// Ensures the collection table exists, creating it on the first call for `name`.
    pub async fn ensure(&self, pool: &SqlitePool, name: &str) -> Result<CollectionSchema> {
        validate_collection_name(name)?;
        if let Some(schema) = self.known.read().await.get(name) {
            return Ok(*schema);
        }

        // The DDL is idempotent; racing first uses may both run it.
        let mut conn = pool.acquire().await?;
        let schema = self.create(&mut conn, name).await?;
        self.known.write().await.insert(name.to_string(), schema);
        Ok(schema)
    }

    /// Caches `name` when its table is already committed with the expected layout.
    ///
    /// Reads through a spare pool connection so that tables created by an open,
    /// uncommitted transaction are not seen. Returns `None` when the table is missing,
    /// incomplete, or no connection is free.
    pub async fn adopt_committed(
        &self,
        pool: &SqlitePool,
        name: &str,
    ) -> Result<Option<CollectionSchema>> {
        validate_collection_name(name)?;
        if let Some(schema) = self.known.read().await.get(name) {
            return Ok(Some(*schema));
        }
        let mut conn = match pool.try_acquire() {
            Some(conn) => conn,
            None if pool.size() < pool.options().get_max_connections() => pool.acquire().await?,
            None => return Ok(None),
        };

        if !table_exists(&mut conn, name).await? {
            return Ok(None);
        }
        let has_id_column = has_id_column(&mut conn, name).await?;
        if has_id_column
            && self.options.id_lookup_column
            && !index_exists(&mut conn, name).await?
        {
            return Ok(None);
        }

        let schema = CollectionSchema { has_id_column };
        debug!(collection = name, has_id_column, "Adopted committed collection");
        self.known.write().await.insert(name.to_string(), schema);
        Ok(Some(schema))
    }

    /// Like [`Self::ensure`] but runs on a caller-owned connection or transaction.
    ///
    /// The result is not cached: a rollback of the caller's transaction also undoes the DDL.
    /// Pair it with [`Self::adopt_committed`] so the name is cached once the table is committed.
    pub async fn ensure_on(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<CollectionSchema> {
        validate_collection_name(name)?;
        if let Some(schema) = self.known.read().await.get(name) {
            return Ok(*schema);
        }
        self.create(conn, name).await
    }

    /// Returns true when `name` has already been ensured by this initializer.
    pub async fn is_known(&self, name: &str) -> bool {
        self.known.read().await.contains_key(name)
    }

    async fn create(&self, conn: &mut SqliteConnection, name: &str) -> Result<CollectionSchema> {
        let ddl = create_table_sql(name, self.options.id_lookup_column);
        debug!(collection = name, sql = %ddl, "ensuring collection table");
        sqlx::query(&ddl).execute(&mut *conn).await?;

        let has_id_column = has_id_column(conn, name).await?;
        if has_id_column && self.options.id_lookup_column {
            let ddl = create_index_sql(name, self.options.unique_ids);
            debug!(collection = name, sql = %ddl, "ensuring id index");
            sqlx::query(&ddl).execute(&mut *conn).await?;
        }

        info!(collection = name, has_id_column, "Collection ready");
        Ok(CollectionSchema { has_id_column })
    }
}

async fn has_id_column(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_xinfo(?) WHERE name = 'id'")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

async fn table_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

async fn index_exists(conn: &mut SqliteConnection, name: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?")
            .bind(format!("idx_{name}_id"))
            .fetch_one(&mut *conn)
            .await?;
    Ok(count > 0)
}

fn create_table_sql(name: &str, id_lookup_column: bool) -> String {
    if id_lookup_column {
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{name}" (
                data TEXT NOT NULL CHECK (json_valid(data)),
                id GENERATED ALWAYS AS ({ID_PATH_EXPR}) VIRTUAL
            )"#
        )
    } else {
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{name}" (
                data TEXT NOT NULL CHECK (json_valid(data))
            )"#
        )
    }
}

fn create_index_sql(name: &str, unique: bool) -> String {
    let unique = if unique { "UNIQUE " } else { "" };
    format!(r#"CREATE {unique}INDEX IF NOT EXISTS "idx_{name}_id" ON "{name}" (id)"#)
}

/// Collection names become table names, so they must be plain SQL identifiers.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_NAME_LEN {
        return Err(DocStoreError::InvalidInput(format!(
            "invalid collection name: {:?}",
            name
        )));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(DocStoreError::InvalidInput(format!(
            "collection name uses reserved prefix: {:?}",
            name
        )));
    }
    Ok(())
}
