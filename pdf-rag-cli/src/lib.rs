//! Command-line front end for `pdf-rag`.
//!
//! Subcommands:
//!
//! - `ingest <folder>` : add a folder's documents to the persisted index
//! - `query <text> [--k N]` : answer one question
//! - `rebuild-index [folder]` : rebuild the index from scratch
//! - `chat` : interactive question loop
//!
//! Exit codes: 0 success, 1 configuration error, 2 missing input,
//! 3 external-service failure, 130 interrupted by Ctrl-C.

pub mod args;
pub mod commands;
pub mod exit;
pub mod telemetry;

pub use args::{Cli, Command, Settings};
pub use commands::execute;
