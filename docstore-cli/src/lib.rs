//! # docstore-cli
//!
//! Command-line front end for the docstore crate: argument parsing, command execution,
//! tracing initialization.

pub mod cli;
pub mod logger;

pub use cli::{execute, Cli, Commands};
pub use logger::init_tracing;
