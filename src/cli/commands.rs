//! CLI commands and argument parsing

use crate::config::PaginatorChoice;
use crate::types::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Paginated listings over JSON endpoints
#[derive(Parser, Debug)]
#[command(name = "async-listing")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Listing configuration file (YAML or JSON)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (overrides --verbose)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level the log subscriber should start at
    pub fn log_level(&self) -> tracing::Level {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => tracing::Level::DEBUG,
            (None, false) => tracing::Level::INFO,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch pages from a JSON endpoint
    Fetch {
        /// Endpoint URL
        url: String,

        /// Pagination strategy (default: inferred from the first response)
        #[arg(short, long)]
        paginator: Option<PaginatorChoice>,

        /// Maximum number of pages to fetch
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Print one accumulated result instead of one message per page
        #[arg(long)]
        accumulate: bool,

        /// Query parameter (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        query: Vec<(String, String)>,

        /// Dotted path of the paginated value in the response body
        #[arg(long)]
        result_path: Option<String>,

        /// Paginator state to start from (JSON, eg. '{"page": 3}')
        #[arg(long)]
        state_json: Option<String>,
    },

    /// Show the pagination state inferred from a JSON document
    Infer {
        /// JSON file, or `-` for stdin
        input: PathBuf,

        /// Query the document was requested with (repeatable)
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Indented JSON
    Pretty,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{s}`"))
}
