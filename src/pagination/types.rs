//! Pagination types and traits
//!
//! Defines the core pagination abstractions shared by every paginator.

use crate::error::Result;
use crate::state::{StateBinding, StatePair};
use crate::types::{deserialize_opt_u64, deserialize_present, JsonObject, JsonValue, StringMap};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Paginator Kind
// ============================================================================

/// Concrete pagination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaginatorKind {
    /// `page` / `pageSize`
    PageNumber,
    /// `cursor` / `pageSize`
    Cursor,
    /// `limit` / `offset`
    LimitOffset,
}

impl PaginatorKind {
    /// Type name used in usage errors
    pub fn type_name(self) -> &'static str {
        match self {
            Self::PageNumber => "PageNumberPaginator",
            Self::Cursor => "CursorPaginator",
            Self::LimitOffset => "LimitOffsetPaginator",
        }
    }
}

impl fmt::Display for PaginatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

// ============================================================================
// Request Init
// ============================================================================

/// Outgoing request options a paginator merges its parameters into
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestInit {
    /// Query string parameters
    pub query: JsonObject,
    /// Arguments used to resolve the URL
    pub url_args: JsonObject,
    /// Extra request headers
    pub headers: StringMap,
}

impl RequestInit {
    /// Create empty request options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create request options with an initial query
    pub fn from_query(query: JsonObject) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Set a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Set a URL argument
    pub fn with_url_arg(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.url_args.insert(key.into(), value.into());
        self
    }

    /// Set a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Query parameters rendered as strings, ready for a URL
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter_map(|(key, value)| {
                let rendered = match value {
                    JsonValue::Null => return None,
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Some((key.clone(), rendered))
            })
            .collect()
    }
}

// ============================================================================
// Request Details
// ============================================================================

/// What a completed request looked like, as seen by shape inference
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginationRequestDetails {
    /// Query string parameters the request was made with
    pub query: JsonObject,
    /// Decoded response body (or the part of it under a result path)
    pub decoded_body: JsonValue,
    /// Resolved URL
    pub url: Option<String>,
}

impl PaginationRequestDetails {
    /// Create details for a decoded body
    pub fn new(decoded_body: JsonValue) -> Self {
        Self {
            decoded_body,
            ..Self::default()
        }
    }

    /// Set the query the request was made with
    pub fn with_query(mut self, query: JsonObject) -> Self {
        self.query = query;
        self
    }

    /// Set the resolved URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Numeric query parameter, accepting numeric strings
    pub(crate) fn query_u64(&self, key: &str) -> Option<u64> {
        self.query.get(key).and_then(crate::types::as_u64)
    }
}

// ============================================================================
// Normalized Response
// ============================================================================

/// Backend-neutral pagination details extracted from a response
///
/// Fields wrapped in `Option<Option<_>>` distinguish a missing key (`None`)
/// from an explicit `null` (`Some(None)`); the inferred paginator picks its
/// strategy from key presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    /// Items on this page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<JsonValue>>,

    /// Total number of records available
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<u64>,

    /// Page size reported (or inferred) for this response
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,

    /// Limit reported for this response
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<Option<u64>>,

    /// Cursor of the following page
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<Option<String>>,

    /// Cursor of the preceding page
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_cursor: Option<Option<String>>,
}

impl PaginationResponse {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page items
    pub fn with_results(mut self, results: Vec<JsonValue>) -> Self {
        self.results = Some(results);
        self
    }

    /// Set the total record count
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Set the page size
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Set the limit key (`None` means present but unknown)
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the next cursor
    pub fn with_next_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.next_cursor = Some(Some(cursor.into()));
        self
    }

    /// Mark the next cursor as present but empty
    pub fn without_next_cursor(mut self) -> Self {
        self.next_cursor = Some(None);
        self
    }

    /// Set the previous cursor
    pub fn with_previous_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.previous_cursor = Some(Some(cursor.into()));
        self
    }

    /// Mark the previous cursor as present but empty
    pub fn without_previous_cursor(mut self) -> Self {
        self.previous_cursor = Some(None);
        self
    }

    /// Whether either cursor key is present
    pub fn has_cursor_keys(&self) -> bool {
        self.next_cursor.is_some() || self.previous_cursor.is_some()
    }

    pub(crate) fn next_cursor(&self) -> Option<String> {
        self.next_cursor.clone().flatten()
    }

    pub(crate) fn previous_cursor(&self) -> Option<String> {
        self.previous_cursor.clone().flatten()
    }

    pub(crate) fn limit(&self) -> Option<u64> {
        self.limit.flatten()
    }
}

// ============================================================================
// Paginator Trait
// ============================================================================

/// Restorable pagination state
pub trait CurrentState:
    Clone + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> CurrentState for T where
    T: Clone + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Derived, non-restorable pagination bookkeeping
pub trait InternalState: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// True once a response has been applied
    fn response_is_set(&self) -> bool;

    /// Record that a response has been applied
    fn mark_response_set(&mut self);
}

/// Core trait shared by every paginator
///
/// State lives in externally supplied [`StatePair`]s; a paginator only reads
/// and writes through them. The `*_state` methods compute a state without
/// committing it, the bare verbs commit what the `*_state` method returns.
pub trait Paginator: Send + Sync + 'static {
    /// Restorable state, eg. `{page, pageSize}`
    type State: CurrentState;
    /// Derived state, eg. `{total}`
    type Internal: InternalState;

    /// Current (restorable) state
    fn current_state(&self) -> Self::State;

    /// Internal (derived) state
    fn internal_state(&self) -> Self::Internal;

    /// Commit a new current state
    fn set_current_state(&self, state: Self::State);

    /// Commit a new internal state; marks the response as set
    fn set_internal_state(&self, state: Self::Internal);

    /// Rebind to new externally owned state
    fn replace_state_controllers(
        &self,
        current: StatePair<Self::State>,
        internal: StatePair<Self::Internal>,
    );

    /// True once `set_response` has run at least once
    fn response_is_set(&self) -> bool {
        self.internal_state().response_is_set()
    }

    /// Whether there are results after the current page
    fn has_next_page(&self) -> bool;

    /// Whether there are results before the current page
    fn has_previous_page(&self) -> bool;

    /// State for the first page
    fn first_state(&self) -> Result<Option<Self::State>>;

    /// State for the next page, if known
    fn next_state(&self) -> Result<Option<Self::State>>;

    /// State for the previous page, if known
    fn previous_state(&self) -> Result<Option<Self::State>>;

    /// State for the last page, if known
    fn last_state(&self) -> Result<Option<Self::State>>;

    /// Go to the first page
    fn first(&self) -> Result<()> {
        if let Some(state) = self.first_state()? {
            self.set_current_state(state);
        }
        Ok(())
    }

    /// Go to the next page; no-op while the next page is unknown
    fn next(&self) -> Result<()> {
        if let Some(state) = self.next_state()? {
            self.set_current_state(state);
        }
        Ok(())
    }

    /// Go to the previous page; no-op while the previous page is unknown
    fn previous(&self) -> Result<()> {
        if let Some(state) = self.previous_state()? {
            self.set_current_state(state);
        }
        Ok(())
    }

    /// Go to the last page; no-op while the last page is unknown
    fn last(&self) -> Result<()> {
        if let Some(state) = self.last_state()? {
            self.set_current_state(state);
        }
        Ok(())
    }

    /// Merge pagination parameters into outgoing request options
    fn get_request_init(&self, init: RequestInit) -> RequestInit;

    /// Update internal bookkeeping from a normalized response
    fn set_response(&self, response: &PaginationResponse) -> Result<()>;

    /// Normalize a raw response for this paginator, or `None` when the
    /// response is not recognizably paginated this way
    fn pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse>
    where
        Self: Sized;
}

// ============================================================================
// State Controllers
// ============================================================================

/// The two state bindings every paginator reads and writes through
pub(crate) struct Controllers<S, I> {
    current: StateBinding<S>,
    internal: StateBinding<I>,
}

impl<S: Clone, I: InternalState> Controllers<S, I> {
    pub(crate) fn new(current: StatePair<S>, internal: StatePair<I>) -> Self {
        Self {
            current: StateBinding::new(current),
            internal: StateBinding::new(internal),
        }
    }

    pub(crate) fn current(&self) -> S {
        self.current.get()
    }

    pub(crate) fn internal(&self) -> I {
        self.internal.get()
    }

    pub(crate) fn set_current(&self, state: S) {
        self.current.set(state);
    }

    pub(crate) fn set_internal(&self, mut state: I) {
        state.mark_response_set();
        self.internal.set(state);
    }

    /// Write internal state without touching the response flag
    pub(crate) fn replace_internal(&self, state: I) {
        self.internal.set(state);
    }

    pub(crate) fn rebind(&self, current: StatePair<S>, internal: StatePair<I>) {
        self.current.rebind(current);
        self.internal.rebind(internal);
    }

    pub(crate) fn bindings(&self) -> (StateBinding<S>, StateBinding<I>) {
        (self.current.clone(), self.internal.clone())
    }
}

impl<S: fmt::Debug, I: fmt::Debug> fmt::Debug for Controllers<S, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controllers")
            .field("current", &self.current)
            .field("internal", &self.internal)
            .finish()
    }
}

/// Insert a positive number into an outgoing query
pub(crate) fn insert_u64(query: &mut JsonObject, key: &str, value: Option<u64>) {
    if let Some(v) = value.filter(|v| *v > 0) {
        query.insert(key.to_string(), JsonValue::from(v));
    }
}
