//! CLI parser and command execution over a [`DocumentStore`] of raw JSON documents.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docstore::{Direction, DocumentStore, FieldPatch, ListQuery, Predicate, ID_PATH};
use serde_json::Value;
use tracing::debug;

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "JSON document store on SQLite: put, get, find, list, patch, delete", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database URL or file path; overrides DOCSTORE_DATABASE_URL / DATABASE_URL.
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Insert a JSON document (with --upsert, replace the document with the same id).
    Put {
        collection: String,
        document: String,
        #[arg(long)]
        upsert: bool,
    },
    /// Print the document with the given id.
    Get { collection: String, id: String },
    /// Print the first document matching every path=value term.
    Find {
        collection: String,
        #[arg(required = true)]
        terms: Vec<String>,
    },
    /// Print documents, optionally filtered, ordered and paged.
    List {
        collection: String,
        #[arg(short = 'w', long = "where")]
        terms: Vec<String>,
        #[arg(long)]
        order_by: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long)]
        offset: Option<u64>,
    },
    /// Set path=value fields on the document with the given id.
    Patch {
        collection: String,
        id: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Delete every document with the given id.
    Delete { collection: String, id: String },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Put { .. } => "put",
            Commands::Get { .. } => "get",
            Commands::Find { .. } => "find",
            Commands::List { .. } => "list",
            Commands::Patch { .. } => "patch",
            Commands::Delete { .. } => "delete",
        }
    }
}

/// Parses a command-line value as JSON when it is valid JSON, otherwise as a string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Parses `path=value`. A path without a leading `$` is taken relative to the root.
pub fn parse_assignment(raw: &str) -> Result<(String, Value)> {
    let Some((path, value)) = raw.split_once('=') else {
        bail!("expected path=value, got: {}", raw);
    };
    let path = path.trim();
    if path.is_empty() {
        bail!("empty path in: {}", raw);
    }
    Ok((normalize_path(path), parse_value(value)))
}

/// `name` becomes `$.name`; paths already rooted at `$` are kept.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{}", path)
    }
}

fn parse_predicate(terms: &[String]) -> Result<Predicate> {
    terms
        .iter()
        .map(|t| parse_assignment(t))
        .collect::<Result<Vec<_>>>()
        .map(|pairs| pairs.into_iter().collect())
}

/// Runs one command and returns what should be printed.
pub async fn execute(store: &DocumentStore, command: Commands) -> Result<String> {
    debug!(command = command.name(), "Executing command");
    match command {
        Commands::Put {
            collection,
            document,
            upsert,
        } => {
            let document: Value =
                serde_json::from_str(&document).context("Document is not valid JSON")?;
            if upsert {
                let id = document
                    .get("id")
                    .cloned()
                    .with_context(|| format!("--upsert needs a document with {}", ID_PATH))?;
                store.upsert(&collection, id, &document).await?;
            } else {
                store.insert(&collection, &document).await?;
            }
            Ok(serde_json::to_string_pretty(&document)?)
        }
        Commands::Get { collection, id } => {
            let document: Value = store.get_by_id(&collection, parse_value(&id)).await?;
            Ok(serde_json::to_string_pretty(&document)?)
        }
        Commands::Find { collection, terms } => {
            let predicate = parse_predicate(&terms)?;
            let document: Value = store.get(&collection, &predicate).await?;
            Ok(serde_json::to_string_pretty(&document)?)
        }
        Commands::List {
            collection,
            terms,
            order_by,
            desc,
            limit,
            offset,
        } => {
            let mut query = ListQuery::new().filter(parse_predicate(&terms)?);
            if let Some(path) = order_by {
                let direction = if desc { Direction::Desc } else { Direction::Asc };
                query = query.order_by(normalize_path(&path), direction);
            }
            query.limit = limit;
            query.offset = offset;
            let documents: Vec<Value> = store.list(&collection, &query).await?;
            Ok(serde_json::to_string_pretty(&documents)?)
        }
        Commands::Patch {
            collection,
            id,
            fields,
        } => {
            let patch = fields
                .iter()
                .map(|f| parse_assignment(f))
                .collect::<Result<FieldPatch>>()?;
            let affected = store.patch_fields(&collection, parse_value(&id), &patch).await?;
            Ok(format!("patched {} document(s)", affected))
        }
        Commands::Delete { collection, id } => {
            let deleted = store.delete(&collection, parse_value(&id)).await?;
            Ok(format!("deleted {} document(s)", deleted))
        }
    }
}
