//! CLI module
//!
//! Command-line interface over the listing engine.
//!
//! # Commands
//!
//! - `fetch` - Page through a JSON endpoint
//! - `infer` - Show the pagination state found in a JSON document

mod app;
mod commands;

pub use app::App;
pub use commands::{Cli, Commands, OutputFormat};
