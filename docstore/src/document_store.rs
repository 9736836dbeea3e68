//! Document store: CRUD, partial patches and typed listing over JSON collections.
//!
//! Uses SqlitePoolManager and SchemaInitializer; documents go through the codec
//! except for [`DocumentStore::patch_fields`], which edits the stored JSON in place.
//! External: SQLite (JSON1 functions) via sqlx.

use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

use crate::codec::{self, Message};
use crate::config::StoreConfig;
use crate::error::{DocStoreError, Result};
use crate::patch::FieldPatch;
use crate::predicate::Predicate;
use crate::query::ListQuery;
use crate::repository::Collection;
use crate::schema::{CollectionSchema, SchemaInitializer, SchemaOptions};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct DocumentStore {
    pool_manager: SqlitePoolManager,
    schema: SchemaInitializer,
}

impl DocumentStore {
    /// Opens a store on `database_url` with default settings.
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::connect(&StoreConfig::with_url(database_url)).await
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let pool_manager = SqlitePoolManager::new(config).await?;
        Ok(Self {
            pool_manager,
            schema: SchemaInitializer::new(config.schema_options()),
        })
    }

    /// Builds a store on an existing pool.
    pub fn from_pool(pool: SqlitePool, options: SchemaOptions) -> Self {
        Self {
            pool_manager: SqlitePoolManager::from_pool(pool),
            schema: SchemaInitializer::new(options),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.pool_manager.pool()
    }

    pub fn schema(&self) -> &SchemaInitializer {
        &self.schema
    }

    /// Typed handle on one collection.
    pub fn collection<M: Message>(&self, name: impl Into<String>) -> Collection<M> {
        Collection::new(self.clone(), name.into())
    }

    /// Starts a transaction for the `*_tx` operations.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool().begin().await?)
    }

    /// Creates the collection table if this store has not seen `collection` yet.
    pub async fn ensure_collection(&self, collection: &str) -> Result<CollectionSchema> {
        self.schema.ensure(self.pool(), collection).await
    }

    /// Schema lookup for the `*_tx` operations. A table created inside `tx` is cached only
    /// after it has been committed and seen by a later call.
    async fn ensure_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
    ) -> Result<CollectionSchema> {
        if let Some(schema) = self.schema.adopt_committed(self.pool(), collection).await? {
            return Ok(schema);
        }
        self.schema.ensure_on(&mut **tx, collection).await
    }

    pub async fn insert<M: Message>(&self, collection: &str, message: &M) -> Result<()> {
        self.ensure_collection(collection).await?;
        let mut tx = self.begin().await?;
        let result = self.insert_tx(&mut tx, collection, message).await;
        finish(tx, result).await
    }

    pub async fn insert_tx<M: Message>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        message: &M,
    ) -> Result<()> {
        self.ensure_tx(tx, collection).await?;
        let payload = codec::encode(message)?;
        insert_payload(&mut **tx, collection, payload).await
    }

    /// Inserts `message` unless a document with `id` exists. Returns true if inserted.
    ///
    /// The probe and the insert are one statement, so concurrent callers cannot both insert.
    pub async fn insert_if_not_exist<M: Message>(
        &self,
        collection: &str,
        id: impl Into<Value>,
        message: &M,
    ) -> Result<bool> {
        let schema = self.ensure_collection(collection).await?;
        let payload = codec::encode(message)?;
        let clause = Predicate::by_id(id).build(&schema)?;

        let sql = format!(
            r#"INSERT INTO "{collection}" (data) SELECT json(?) WHERE NOT EXISTS (SELECT 1 FROM "{collection}" WHERE {})"#,
            clause.sql
        );
        debug!(collection, sql = %sql, "insert_if_not_exist");
        let result = clause
            .bind_all(sqlx::query(&sql).bind(payload))
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the documents with `id`, or inserts `message` when there are none.
    ///
    /// Runs in one transaction that writes first, so concurrent upserts of a new id
    /// produce a single document.
    pub async fn upsert<M: Message>(
        &self,
        collection: &str,
        id: impl Into<Value>,
        message: &M,
    ) -> Result<()> {
        let schema = self.ensure_collection(collection).await?;
        let payload = codec::encode(message)?;
        let id = id.into();

        let mut tx = self.begin().await?;
        let result: Result<()> = async {
            let updated =
                update_payload(&mut tx, &schema, collection, id, payload.clone()).await?;
            if updated == 0 {
                insert_payload(&mut tx, collection, payload).await?;
            }
            Ok(())
        }
        .await;
        finish(tx, result).await
    }

    pub async fn get_by_id<M: Message>(&self, collection: &str, id: impl Into<Value>) -> Result<M> {
        self.get(collection, &Predicate::by_id(id)).await
    }

    /// Returns the first document (in insertion order) matching every term of `predicate`.
    ///
    /// Fails with [`DocStoreError::NotFound`] when nothing matches.
    pub async fn get<M: Message>(&self, collection: &str, predicate: &Predicate) -> Result<M> {
        if predicate.is_empty() {
            return Err(DocStoreError::InvalidInput(
                "get requires at least one predicate term".to_string(),
            ));
        }
        let schema = self.ensure_collection(collection).await?;
        let clause = predicate.build(&schema)?;

        let sql = format!(
            r#"SELECT data FROM "{collection}"{} ORDER BY rowid LIMIT 1"#,
            clause.to_sql()
        );
        debug!(collection, sql = %sql, "get");
        let row = clause
            .bind_all(sqlx::query(&sql))
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                codec::decode(data.as_bytes())
            }
            None => Err(DocStoreError::not_found(collection)),
        }
    }

    /// Lists documents decoded as `M`. Stops at the first row that fails to decode.
    pub async fn list<M: Message>(&self, collection: &str, query: &ListQuery) -> Result<Vec<M>> {
        let schema = self.ensure_collection(collection).await?;
        let rendered = query.render(&schema)?;

        let sql = format!(r#"SELECT data FROM "{collection}"{}"#, rendered.tail);
        debug!(collection, sql = %sql, "list");
        let rows = rendered
            .bind_all(sqlx::query(&sql))
            .fetch_all(self.pool())
            .await?;

        decode_rows(collection, rows)
    }

    /// Lists documents using raw clause text appended after `SELECT data FROM <collection>`.
    ///
    /// The clauses are not parameterized; pass trusted text only.
    pub async fn list_raw<M: Message>(&self, collection: &str, clauses: &[&str]) -> Result<Vec<M>> {
        self.ensure_collection(collection).await?;

        let mut sql = format!(r#"SELECT data FROM "{collection}""#);
        if !clauses.is_empty() {
            sql.push(' ');
            sql.push_str(&clauses.join(" "));
        }
        debug!(collection, sql = %sql, "list_raw");
        let rows = sqlx::query(&sql).fetch_all(self.pool()).await?;

        decode_rows(collection, rows)
    }

    /// Number of documents matching `predicate` (all documents when it is empty).
    pub async fn count(&self, collection: &str, predicate: &Predicate) -> Result<u64> {
        let schema = self.ensure_collection(collection).await?;
        let clause = predicate.build(&schema)?;

        let sql = format!(r#"SELECT COUNT(*) AS n FROM "{collection}"{}"#, clause.to_sql());
        debug!(collection, sql = %sql, "count");
        let row = clause
            .bind_all(sqlx::query(&sql))
            .fetch_one(self.pool())
            .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    /// Replaces the whole payload of every document with `id`. Returns rows affected;
    /// zero is not an error.
    pub async fn update<M: Message>(
        &self,
        collection: &str,
        id: impl Into<Value>,
        message: &M,
    ) -> Result<u64> {
        self.ensure_collection(collection).await?;
        let id = id.into();
        let mut tx = self.begin().await?;
        let result = self.update_tx(&mut tx, collection, id, message).await;
        finish(tx, result).await
    }

    pub async fn update_tx<M: Message>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        id: impl Into<Value>,
        message: &M,
    ) -> Result<u64> {
        let schema = self.ensure_tx(tx, collection).await?;
        let payload = codec::encode(message)?;
        update_payload(&mut **tx, &schema, collection, id.into(), payload).await
    }

    /// Sets individual paths inside the stored documents with `id`, leaving other
    /// paths untouched. No codec or schema validation is involved. Returns rows affected.
    pub async fn patch_fields(
        &self,
        collection: &str,
        id: impl Into<Value>,
        fields: &FieldPatch,
    ) -> Result<u64> {
        let schema = self.ensure_collection(collection).await?;
        if fields.is_empty() {
            return Ok(0);
        }
        let set_expr = fields.set_expr()?;
        let clause = Predicate::by_id(id).build(&schema)?;

        let sql = format!(
            r#"UPDATE "{collection}" SET data = {set_expr} WHERE {}"#,
            clause.sql
        );
        debug!(collection, sql = %sql, "patch_fields");
        let result = clause
            .bind_all(fields.bind_all(sqlx::query(&sql)))
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Deletes every document with `id`. Returns rows deleted.
    pub async fn delete(&self, collection: &str, id: impl Into<Value>) -> Result<u64> {
        self.ensure_collection(collection).await?;
        let id = id.into();
        let mut tx = self.begin().await?;
        let result = self.delete_tx(&mut tx, collection, id).await;
        finish(tx, result).await
    }

    pub async fn delete_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        collection: &str,
        id: impl Into<Value>,
    ) -> Result<u64> {
        let schema = self.ensure_tx(tx, collection).await?;
        let clause = Predicate::by_id(id).build(&schema)?;

        let sql = format!(r#"DELETE FROM "{collection}" WHERE {}"#, clause.sql);
        debug!(collection, sql = %sql, "delete");
        let result = clause
            .bind_all(sqlx::query(&sql))
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected())
    }
}

async fn insert_payload(
    conn: &mut SqliteConnection,
    collection: &str,
    payload: String,
) -> Result<()> {
    let sql = format!(r#"INSERT INTO "{collection}" (data) VALUES (json(?))"#);
    debug!(collection, sql = %sql, "insert");
    sqlx::query(&sql).bind(payload).execute(conn).await?;
    Ok(())
}

async fn update_payload(
    conn: &mut SqliteConnection,
    schema: &CollectionSchema,
    collection: &str,
    id: Value,
    payload: String,
) -> Result<u64> {
    let clause = Predicate::by_id(id).build(schema)?;
    let sql = format!(
        r#"UPDATE "{collection}" SET data = json(?) WHERE {}"#,
        clause.sql
    );
    debug!(collection, sql = %sql, "update");
    let result = clause
        .bind_all(sqlx::query(&sql).bind(payload))
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

fn decode_rows<M: Message>(collection: &str, rows: Vec<SqliteRow>) -> Result<Vec<M>> {
    let mut messages = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let data: String = row.try_get("data")?;
        let message = serde_json::from_str(&data).map_err(|source| DocStoreError::RowDecode {
            collection: collection.to_string(),
            index,
            source,
        })?;
        messages.push(message);
    }
    debug!(collection, rows = messages.len(), "decoded rows");
    Ok(messages)
}

/// Commits on success; otherwise rolls back and returns the original error.
async fn finish<T>(tx: Transaction<'static, Sqlite>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
