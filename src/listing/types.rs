//! Listing types

use crate::config::ListingConfig;
use crate::equality::Trigger;
use crate::error::{Error, Result};
use crate::runner::Action;
use crate::types::JsonObject;
use std::fmt;
use std::sync::Arc;

/// What a listing passes to its executor on every fetch
pub struct ListingRequest<P> {
    /// Query at the time of the fetch
    pub query: JsonObject,
    /// The listing's paginator, if it has one
    pub paginator: Option<Arc<P>>,
}

impl<P> Clone for ListingRequest<P> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            paginator: self.paginator.clone(),
        }
    }
}

impl<P> fmt::Debug for ListingRequest<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingRequest")
            .field("query", &self.query)
            .field("paginator", &self.paginator.is_some())
            .finish()
    }
}

/// Executor fetching one page of items
pub type ListingAction<T, P> = Action<ListingRequest<P>, Vec<T>>;

/// Listing options
pub struct ListingOptions<P> {
    /// `DEEP` fetches on every change, `MANUAL` waits for `run()`
    pub trigger: Trigger,
    pub query: JsonObject,
    /// Append each next page to the items fetched so far
    pub accumulate_pages: bool,
    pub paginator: Option<Arc<P>>,
}

impl<P> ListingOptions<P> {
    /// `DEEP` options with an empty query and no paginator
    pub fn new() -> Self {
        Self {
            trigger: Trigger::Deep,
            query: JsonObject::new(),
            accumulate_pages: false,
            paginator: None,
        }
    }

    /// Options from a loaded configuration
    ///
    /// The paginator named by the configuration is built by the caller.
    pub fn from_config(config: &ListingConfig) -> Self {
        Self {
            trigger: config.trigger,
            query: config.query.clone(),
            accumulate_pages: config.accumulate_pages,
            paginator: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_query(mut self, query: JsonObject) -> Self {
        self.query = query;
        self
    }

    pub fn with_accumulate_pages(mut self, accumulate: bool) -> Self {
        self.accumulate_pages = accumulate;
        self
    }

    pub fn with_paginator(mut self, paginator: Arc<P>) -> Self {
        self.paginator = Some(paginator);
        self
    }

    /// Reject option combinations a listing cannot honor
    pub fn validate(&self) -> Result<()> {
        validate_trigger(self.trigger)?;
        if self.accumulate_pages && self.paginator.is_none() {
            return Err(Error::config(
                "When `accumulatePages` is set `paginator` must be provided",
            ));
        }
        Ok(())
    }
}

/// Listings compare queries structurally, so only `MANUAL` and `DEEP` apply
pub(crate) fn validate_trigger(trigger: Trigger) -> Result<()> {
    match trigger {
        Trigger::Manual | Trigger::Deep => Ok(()),
        Trigger::Shallow => Err(Error::invalid_value(
            "trigger",
            "Invalid trigger SHALLOW. Valid triggers for a listing are: MANUAL, DEEP",
        )),
    }
}

impl<P> Default for ListingOptions<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ListingOptions<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListingOptions")
            .field("trigger", &self.trigger)
            .field("query", &self.query)
            .field("accumulate_pages", &self.accumulate_pages)
            .field("paginator", &self.paginator.is_some())
            .finish()
    }
}
