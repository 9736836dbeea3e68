//! Store config: database URL, pool size, lookup column options. Loaded from env.

use std::env;

use crate::error::{DocStoreError, Result};
use crate::schema::SchemaOptions;

const DEFAULT_DATABASE_URL: &str = "sqlite:docstore.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection and schema settings for a [`crate::DocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// DOCSTORE_DATABASE_URL, falling back to DATABASE_URL (`sqlite:` URL or file path)
    pub database_url: String,
    /// DOCSTORE_MAX_CONNECTIONS
    pub max_connections: u32,
    /// DOCSTORE_ID_COLUMN: declare the generated `id` column and index it
    pub id_lookup_column: bool,
    /// DOCSTORE_UNIQUE_IDS: make the `id` index unique
    pub unique_ids: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            id_lookup_column: true,
            unique_ids: false,
        }
    }
}

impl StoreConfig {
    /// Config for the given database URL with every other setting at its default.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Load from environment variables; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let database_url = env::var("DOCSTORE_DATABASE_URL")
            .or_else(|_| env::var("DATABASE_URL"))
            .unwrap_or(defaults.database_url);
        let max_connections = match env::var("DOCSTORE_MAX_CONNECTIONS") {
            Ok(s) => s.parse().map_err(|_| {
                DocStoreError::Config(format!("DOCSTORE_MAX_CONNECTIONS is not a number: {}", s))
            })?,
            Err(_) => defaults.max_connections,
        };
        let id_lookup_column = env_flag("DOCSTORE_ID_COLUMN")?.unwrap_or(defaults.id_lookup_column);
        let unique_ids = env_flag("DOCSTORE_UNIQUE_IDS")?.unwrap_or(defaults.unique_ids);

        let config = Self {
            database_url,
            max_connections,
            id_lookup_column,
            unique_ids,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            return Err(DocStoreError::Config("database URL is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(DocStoreError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.unique_ids && !self.id_lookup_column {
            return Err(DocStoreError::Config(
                "unique_ids requires the id lookup column".to_string(),
            ));
        }
        Ok(())
    }

    pub fn schema_options(&self) -> SchemaOptions {
        SchemaOptions {
            id_lookup_column: self.id_lookup_column,
            unique_ids: self.unique_ids,
        }
    }
}

fn env_flag(name: &str) -> Result<Option<bool>> {
    match env::var(name) {
        Ok(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(DocStoreError::Config(format!(
                "{} must be a boolean, got: {}",
                name, s
            ))),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        env::remove_var("DOCSTORE_DATABASE_URL");
        env::remove_var("DATABASE_URL");
        env::remove_var("DOCSTORE_MAX_CONNECTIONS");
        env::remove_var("DOCSTORE_ID_COLUMN");
        env::remove_var("DOCSTORE_UNIQUE_IDS");
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = StoreConfig::from_env().unwrap();

        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.database_url, "sqlite:docstore.db");
        assert_eq!(config.max_connections, 5);
        assert!(config.id_lookup_column);
        assert!(!config.unique_ids);
    }

    #[test]
    #[serial]
    fn test_from_env_custom_values() {
        clear_env();
        env::set_var("DATABASE_URL", "fallback.db");
        env::set_var("DOCSTORE_DATABASE_URL", "sqlite:custom.db");
        env::set_var("DOCSTORE_MAX_CONNECTIONS", "2");
        env::set_var("DOCSTORE_UNIQUE_IDS", "true");

        let config = StoreConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.database_url, "sqlite:custom.db");
        assert_eq!(config.max_connections, 2);
        assert!(config.unique_ids);
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_to_database_url() {
        clear_env();
        env::set_var("DATABASE_URL", "fallback.db");

        let config = StoreConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.database_url, "fallback.db");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_flag() {
        clear_env();
        env::set_var("DOCSTORE_ID_COLUMN", "maybe");

        let result = StoreConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(DocStoreError::Config(_))));
    }

    #[test]
    fn test_validate_unique_requires_lookup_column() {
        let config = StoreConfig {
            id_lookup_column: false,
            unique_ids: true,
            ..StoreConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_connections() {
        let config = StoreConfig {
            max_connections: 0,
            ..StoreConfig::default()
        };

        assert!(config.validate().is_err());
    }
}
