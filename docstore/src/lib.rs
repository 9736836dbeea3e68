//! Docstore crate: JSON document persistence on SQLite, addressed by JSON paths.
//!
//! ## Modules
//!
//! - [`error`] – DocStoreError and Result
//! - [`config`] – StoreConfig (env loading, validation)
//! - [`codec`] – Message trait, encode/decode
//! - [`schema`] – SchemaInitializer (lazy, per-collection table creation)
//! - [`predicate`] – Predicate and its WHERE rendering
//! - [`patch`] – FieldPatch for partial updates
//! - [`query`] – ListQuery (filter, ordering, paging)
//! - [`document_store`] – DocumentStore (CRUD, patch, list)
//! - [`repository`] – Repository trait, typed Collection handle
//! - [`sqlite_pool`] – SqlitePoolManager
//!
//! ## Example
//!
//! ```rust,no_run
//! use docstore::{DocumentStore, FieldPatch};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     name: String,
//! }
//!
//! # async fn run() -> docstore::Result<()> {
//! let store = DocumentStore::new("sqlite:app.db").await?;
//! store
//!     .insert("users", &User { id: "u1".into(), name: "Alice".into() })
//!     .await?;
//! store
//!     .patch_fields("users", "u1", &FieldPatch::new().set("$.name", "Bob"))
//!     .await?;
//! let user: User = store.get_by_id("users", "u1").await?;
//! assert_eq!(user.name, "Bob");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod document_store;
pub mod error;
pub mod patch;
pub mod predicate;
pub mod query;
pub mod repository;
pub mod schema;
pub mod sqlite_pool;


pub use codec::{decode, decode_into, encode, Message};
pub use config::StoreConfig;
pub use document_store::DocumentStore;
pub use error::{DocStoreError, Result};
pub use patch::FieldPatch;
pub use predicate::{Predicate, WhereClause, ID_PATH};
pub use query::{Direction, ListQuery, OrderBy};
pub use repository::{Collection, Repository};
pub use schema::{CollectionSchema, SchemaInitializer, SchemaOptions};
pub use sqlite_pool::SqlitePoolManager;
