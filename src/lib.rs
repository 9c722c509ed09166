// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! # async-listing
//!
//! Asynchronous action runners and paginated listings over externally owned
//! state.
//!
//! ## Features
//!
//! - **Action Runner**: Invoke an async action, track loading/result/error and
//!   drop the outcome of superseded calls
//! - **Trigger Policies**: Re-invoke automatically when arguments change under
//!   `SHALLOW` or `DEEP` comparison, or only on demand with `MANUAL`
//! - **Paginators**: Page number, cursor and limit/offset strategies, plus one
//!   that infers the strategy from the first response
//! - **Listings**: Fetch pages on query or pagination changes, optionally
//!   accumulating consecutive pages
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use async_listing::http::JsonEndpoint;
//! use async_listing::listing::{AsyncListing, ListingOptions};
//! use async_listing::pagination::{InferredPaginator, Paginator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> async_listing::Result<()> {
//!     let endpoint = JsonEndpoint::new("https://api.example.com/users")?;
//!     let paginator = Arc::new(InferredPaginator::default());
//!     let listing = AsyncListing::new(
//!         endpoint.into_action(),
//!         ListingOptions::new().with_paginator(Arc::clone(&paginator)),
//!     )?;
//!
//!     let first = listing.settled().await;
//!     if paginator.has_next_page() {
//!         paginator.next()?;
//!         listing.sync()?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       AsyncListing                        │
//! │  query + paginator → fetch → (accumulated) items          │
//! └───────────────────────────────────────────────────────────┘
//!               │                              │
//! ┌─────────────┴─────────────┐  ┌─────────────┴─────────────┐
//! │        AsyncRunner        │  │        Paginators         │
//! ├───────────────────────────┤  ├───────────────────────────┤
//! │ call ids, RunState        │  │ PageNumber   Cursor       │
//! │ MANUAL / SHALLOW / DEEP   │  │ LimitOffset  Inferred     │
//! └───────────────────────────┘  └───────────────────────────┘
//!                                              │
//!                                ┌─────────────┴─────────────┐
//!                                │  StatePair / StateCell    │
//!                                └───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Externally owned state pairs
pub mod state;

/// Trigger policies and argument comparison
pub mod equality;

/// Paginators and response shape inference
pub mod pagination;

/// Async action runner
pub mod runner;

/// Paginated listing orchestration
pub mod listing;

/// Runner and listing configuration
pub mod config;

/// JSON endpoint executor
pub mod http;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use equality::Trigger;
pub use listing::{AsyncListing, ListingOptions};
pub use pagination::Paginator;
pub use runner::{Action, AsyncRunner, RunState, RunnerOptions};
pub use state::{StateCell, StatePair};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
