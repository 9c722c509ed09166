//! Configuration types for runners and listings
//!
//! Configurations are plain YAML or JSON documents. Unknown keys are
//! rejected, and the error names the valid ones.

use crate::equality::Trigger;
use crate::error::{Error, Result};
use crate::pagination::PaginatorKind;
use crate::types::{JsonObject, JsonValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Runner Config
// ============================================================================

/// Options for an [`AsyncRunner`](crate::runner::AsyncRunner)
///
/// Callbacks cannot be expressed in a document; attach them with
/// [`RunnerOptions::on_success`](crate::runner::RunnerOptions::on_success).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// When to invoke automatically
    #[serde(default)]
    pub trigger: Trigger,

    /// Argument list for triggered calls and `run()`
    #[serde(default)]
    pub args: Vec<JsonValue>,
}

impl RunnerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        parse_yaml(yaml, "runner")
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        parse_json(json, "runner")
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_file(path.as_ref(), "runner")
    }
}

// ============================================================================
// Listing Config
// ============================================================================

/// Options for an [`AsyncListing`](crate::listing::AsyncListing) and the
/// endpoint feeding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ListingConfig {
    /// `DEEP` (default) or `MANUAL`
    #[serde(default = "default_listing_trigger")]
    pub trigger: Trigger,

    /// Initial query
    #[serde(default)]
    pub query: JsonObject,

    /// Append consecutive pages instead of replacing them
    #[serde(default)]
    pub accumulate_pages: bool,

    /// Paginator to drive the listing with; none when absent
    #[serde(default)]
    pub paginator: Option<PaginatorChoice>,

    /// Dotted path of the paginated value inside the response body
    #[serde(default)]
    pub result_path: Option<String>,

    /// HTTP client settings for endpoint listings
    #[serde(default)]
    pub http: HttpConfig,
}

fn default_listing_trigger() -> Trigger {
    Trigger::Deep
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            trigger: default_listing_trigger(),
            query: JsonObject::new(),
            accumulate_pages: false,
            paginator: None,
            result_path: None,
            http: HttpConfig::default(),
        }
    }
}

impl ListingConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = parse_yaml(yaml, "listing")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = parse_json(json, "listing")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = load_file(path.as_ref(), "listing")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations a listing cannot honor
    pub fn validate(&self) -> Result<()> {
        crate::listing::validate_trigger(self.trigger)?;
        if self.accumulate_pages && self.paginator.is_none() {
            return Err(Error::config(
                "When `accumulatePages` is set `paginator` must be provided",
            ));
        }
        Ok(())
    }
}

/// Paginator named in a listing configuration
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PaginatorChoice {
    /// Pick a strategy from the first response
    #[default]
    Inferred,
    PageNumber,
    Cursor,
    LimitOffset,
}

impl PaginatorChoice {
    /// The fixed strategy, or `None` for inferred
    pub fn kind(self) -> Option<PaginatorKind> {
        match self {
            PaginatorChoice::Inferred => None,
            PaginatorChoice::PageNumber => Some(PaginatorKind::PageNumber),
            PaginatorChoice::Cursor => Some(PaginatorKind::Cursor),
            PaginatorChoice::LimitOffset => Some(PaginatorKind::LimitOffset),
        }
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: crate::types::StringMap,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            headers: Default::default(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

// ============================================================================
// Loading
// ============================================================================

fn parse_yaml<T: DeserializeOwned>(yaml: &str, what: &str) -> Result<T> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse {what} config YAML: {e}")))
}

fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| Error::config(format!("Failed to parse {what} config JSON: {e}")))
}

fn load_file<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read {what} config '{}': {e}",
                path.display()
            ))
        }
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&content, what),
        _ => parse_yaml(&content, what),
    }
}
