//! CLI app - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{ListingConfig, PaginatorChoice};
use crate::equality::Trigger;
use crate::error::{Error, Result, ResultExt};
use crate::http::JsonEndpoint;
use crate::listing::{AsyncListing, ListingOptions};
use crate::pagination::{
    infer_kind, infer_pagination_state, CursorPaginator, InferredPaginator, LimitOffsetPaginator,
    PageNumberPaginator, PaginationRequestDetails, Paginator,
};
use crate::types::{JsonObject, JsonValue};
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// CLI app
pub struct App {
    cli: Cli,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                url,
                paginator,
                pages,
                accumulate,
                query,
                result_path,
                state_json,
            } => {
                let mut config = self.load_config()?;
                config.query.extend(
                    query
                        .iter()
                        .map(|(key, value)| (key.clone(), JsonValue::String(value.clone()))),
                );
                if let Some(choice) = paginator {
                    config.paginator = Some(*choice);
                }
                config.accumulate_pages |= *accumulate;
                if result_path.is_some() {
                    config.result_path.clone_from(result_path);
                }
                // The CLI always pages; without a choice the strategy is inferred
                let choice = *config.paginator.get_or_insert(PaginatorChoice::Inferred);
                config.validate()?;

                let fetch = Fetch {
                    config: &config,
                    url,
                    pages: (*pages).max(1),
                    state_json: state_json.as_deref(),
                };
                match choice {
                    PaginatorChoice::Inferred => self.fetch::<InferredPaginator>(fetch).await,
                    PaginatorChoice::PageNumber => self.fetch::<PageNumberPaginator>(fetch).await,
                    PaginatorChoice::Cursor => self.fetch::<CursorPaginator>(fetch).await,
                    PaginatorChoice::LimitOffset => self.fetch::<LimitOffsetPaginator>(fetch).await,
                }
            }
            Commands::Infer { input, query } => {
                let query = query
                    .iter()
                    .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
                    .collect();
                self.infer(input, query)
            }
        }
    }

    /// Load the listing configuration, or defaults without `--config`
    fn load_config(&self) -> Result<ListingConfig> {
        match &self.cli.config {
            Some(path) => ListingConfig::load(path),
            None => Ok(ListingConfig::default()),
        }
    }

    /// Page through an endpoint with paginator `P`
    async fn fetch<P: Paginator + Default>(&self, fetch: Fetch<'_>) -> Result<()> {
        let config = fetch.config;
        let paginator = Arc::new(P::default());
        if let Some(state) = fetch.state_json {
            let state: P::State = serde_json::from_str(state)
                .map_err(|e| Error::config(format!("Invalid paginator state JSON: {e}")))?;
            paginator.set_current_state(state);
        }

        let mut endpoint = JsonEndpoint::with_config(fetch.url, &config.http)?;
        if let Some(path) = &config.result_path {
            endpoint = endpoint.with_result_path(path);
        }

        let options = ListingOptions::from_config(config)
            .with_trigger(Trigger::Deep)
            .with_paginator(Arc::clone(&paginator));
        let listing = AsyncListing::new(endpoint.into_action(), options)?;

        let mut state = listing.settled().await;
        let mut fetched = 1;
        loop {
            if let Some(error) = state.error.take() {
                return Err(Error::Action(error));
            }
            if !config.accumulate_pages {
                self.output_message(&json!({
                    "type": "PAGE",
                    "page": fetched,
                    "items": state.result.clone().unwrap_or_default(),
                    "state": serde_json::to_value(paginator.current_state())?,
                    "hasNextPage": paginator.has_next_page(),
                }))?;
            }

            if fetched >= fetch.pages || !paginator.has_next_page() {
                break;
            }
            paginator.next()?;
            // A settling fetch may already have picked the move up
            listing.sync()?;
            state = listing.settled().await;
            fetched += 1;
        }

        let items = state.result.unwrap_or_default();
        info!(pages = fetched, items = items.len(), "Fetch complete");
        if config.accumulate_pages {
            self.output_message(&json!({
                "type": "RESULT",
                "pages": fetched,
                "items": items,
                "state": serde_json::to_value(paginator.current_state())?,
            }))?;
        }
        Ok(())
    }

    /// Print the pagination state inferred from a document
    fn infer(&self, input: &Path, query: JsonObject) -> Result<()> {
        let content = read_input(input)?;
        let body: JsonValue = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON document '{}'", input.display()))?;

        let details = PaginationRequestDetails::new(body).with_query(query);
        let response = infer_pagination_state(&details).ok_or(Error::InferenceFailed)?;
        let kind = infer_kind(&response).ok_or(Error::InferenceFailed)?;
        debug!(paginator = %kind, "Inferred pagination state");

        // Results are the page itself, not state
        let mut state = serde_json::to_value(&response)?;
        if let Some(map) = state.as_object_mut() {
            map.remove("results");
        }
        self.output_message(&json!({
            "type": "STATE",
            "paginator": kind.type_name(),
            "state": state,
            "results": response.results.map_or(0, |results| results.len()),
        }))
    }

    /// Write one message in the selected format
    fn output_message(&self, message: &JsonValue) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(message)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(message)?,
        };
        println!("{line}");
        Ok(())
    }
}

/// Arguments of one `fetch` run after merging config and flags
struct Fetch<'a> {
    config: &'a ListingConfig,
    url: &'a str,
    pages: usize,
    state_json: Option<&'a str>,
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        return Ok(content);
    }
    std::fs::read_to_string(input).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: input.display().to_string(),
            }
        } else {
            Error::Io(e)
        }
    })
}
