//! Document store error types.
//!
//! Returned by every [`crate::DocumentStore`] operation. Storage errors are carried
//! unmodified inside [`DocStoreError::Database`]; nothing is retried.

use thiserror::Error;

/// Errors that can occur when using document store operations.
#[derive(Error, Debug)]
pub enum DocStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No document matched; used by callers to branch on absence.
    #[error("Not found: no matching document in {collection}")]
    NotFound { collection: String },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// A row returned by a list query could not be decoded; iteration stops at `index`.
    #[error("Failed to decode row {index} of {collection}: {source}")]
    RowDecode {
        collection: String,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    /// The caller broke an input contract (bad collection name, bad path, empty predicate).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl DocStoreError {
    pub(crate) fn not_found(collection: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
        }
    }

    /// Returns true for the "no matching document" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, DocStoreError>;
