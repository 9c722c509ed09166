//! Paginated listing orchestration
//!
//! An [`AsyncListing`] wraps an [`AsyncRunner`] whose action fetches one page
//! of items for the current query and paginator state. It decides when a new
//! fetch is due, resets the paginator when the query or executor changes and
//! optionally accumulates consecutive pages into one sequence.
//!
//! The listing cannot observe paginator writes on its own. After moving the
//! paginator (`next()`, `set_page()`, ...) call [`AsyncListing::sync`] so the
//! change is picked up; `set_query` and `set_execute` sync implicitly, and so
//! does every settled fetch.
//!
//! # Example
//!
//! ```ignore
//! let paginator = Arc::new(PageNumberPaginator::default());
//! let listing = AsyncListing::new(
//!     endpoint.into_action(),
//!     ListingOptions::new().with_paginator(paginator.clone()),
//! )?;
//! let first_page = listing.settled().await;
//!
//! paginator.next()?;
//! listing.sync()?;
//! ```

mod types;

pub(crate) use types::validate_trigger;
pub use types::{ListingAction, ListingOptions, ListingRequest};

use crate::equality::Trigger;
use crate::error::{Error, Result};
use crate::pagination::{InferredPaginator, Paginator};
use crate::runner::{AsyncRunner, RunHandle, RunState, RunnerOptions};
use crate::types::JsonObject;
use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, warn};

/// What a change in the tracked inputs asks for
enum Step {
    Idle,
    First,
    Run,
}

/// Inputs of the next fetch and what the last one saw
struct Tracking<T, P: Paginator> {
    trigger: Trigger,
    query: JsonObject,
    execute: ListingAction<T, P>,
    initial_run: bool,
    last_query: JsonObject,
    last_execute: ListingAction<T, P>,
    /// Paginator state the latest fetch ran with
    last_pagination: Option<P::State>,
    /// Paginator state the latest fetch reported as next
    next_pagination: Option<P::State>,
    /// Replace instead of append on the next settled fetch
    should_reset: bool,
    /// Bumped by every fetch start and every reset; older fetches are stale
    generation: u64,
}

/// What a fetch decided when it started
struct Ticket {
    generation: u64,
    reset: bool,
}

struct Inner<T, P: Paginator> {
    runner: AsyncRunner<(), Vec<T>>,
    paginator: Option<Arc<P>>,
    accumulate_pages: bool,
    tracking: Mutex<Tracking<T, P>>,
    /// Held from planning until the planned call has started
    evaluation: Mutex<()>,
}

impl<T, P> Inner<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Paginator,
{
    fn lock(&self) -> MutexGuard<'_, Tracking<T, P>> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The runner's action: snapshot inputs, await the executor, merge pages
    fn fetch(weak: &Weak<Self>) -> BoxFuture<'static, Result<Vec<T>>> {
        let Some(inner) = weak.upgrade() else {
            return futures::future::ready(Err(Error::Disposed)).boxed();
        };
        let (execute, request, ticket) = inner.begin_fetch();
        let future = execute.call(request);
        let weak = weak.clone();

        async move {
            let items = future.await?;
            Ok(match weak.upgrade() {
                Some(inner) => inner.finish_fetch(&ticket, items),
                None => items,
            })
        }
        .boxed()
    }

    fn begin_fetch(&self) -> (ListingAction<T, P>, ListingRequest<P>, Ticket) {
        let mut tracking = self.lock();
        if let Some(paginator) = &self.paginator {
            let current = paginator.current_state();
            // Only a move to the announced next page keeps accumulating
            if tracking.next_pagination.as_ref() != Some(&current) {
                tracking.should_reset = true;
            }
            if paginator.response_is_set() {
                tracking.last_pagination = Some(current);
            }
        }
        tracking.last_query = tracking.query.clone();
        tracking.last_execute = tracking.execute.clone();
        tracking.initial_run = false;
        tracking.generation += 1;

        let ticket = Ticket {
            generation: tracking.generation,
            reset: tracking.should_reset,
        };
        let request = ListingRequest {
            query: tracking.query.clone(),
            paginator: self.paginator.clone(),
        };
        (tracking.execute.clone(), request, ticket)
    }

    fn finish_fetch(&self, ticket: &Ticket, items: Vec<T>) -> Vec<T> {
        let previous = self.runner.state().result;
        let mut tracking = self.lock();
        if tracking.generation != ticket.generation {
            // The runner drops this outcome too; leave the bookkeeping alone
            debug!(generation = ticket.generation, "Skipping superseded fetch");
            return items;
        }
        if let Some(paginator) = self.paginator.as_ref().filter(|p| p.response_is_set()) {
            tracking.last_pagination = Some(paginator.current_state());
            tracking.next_pagination = paginator.next_state().ok().flatten();
        }

        if self.accumulate_pages && !ticket.reset {
            let mut accumulated = previous.unwrap_or_default();
            debug!(
                previous = accumulated.len(),
                added = items.len(),
                "Accumulating page"
            );
            accumulated.extend(items);
            accumulated
        } else {
            tracking.should_reset = false;
            items
        }
    }

    /// Re-evaluate the tracked inputs, fetching or resetting as needed
    fn evaluate(&self) -> Result<Option<RunHandle<Vec<T>>>> {
        let _evaluation = self.begin_evaluation();
        loop {
            let is_loading = self.runner.state().is_loading;
            let (step, reset) = self.plan(is_loading);
            if reset {
                self.reset_runner();
            }
            match step {
                Step::Idle => return Ok(None),
                Step::Run => return Ok(Some(self.runner.run())),
                Step::First => {
                    if let Some(paginator) = &self.paginator {
                        debug!("Query changed, returning paginator to the first page");
                        paginator.first()?;
                    }
                    self.lock().next_pagination = None;
                }
            }
        }
    }

    fn begin_evaluation(&self) -> MutexGuard<'_, ()> {
        self.evaluation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the runner and make any fetch in flight stale
    fn reset_runner(&self) {
        self.lock().generation += 1;
        self.runner.reset();
    }

    fn plan(&self, is_loading: bool) -> (Step, bool) {
        let mut tracking = self.lock();
        let manual = tracking.trigger.is_manual();

        let paginator = self.paginator.as_ref().filter(|p| p.response_is_set());
        let pagination_state = paginator.map(|p| p.current_state());
        let pagination_changed = matches!(
            (&pagination_state, &tracking.last_pagination),
            (Some(state), Some(last)) if state != last
        );
        let query_changed = tracking.query != tracking.last_query;
        let execute_changed = !tracking.execute.same(&tracking.last_execute);

        let should_fetch = !manual
            && !is_loading
            && (pagination_changed || query_changed || execute_changed || tracking.initial_run);

        if should_fetch && (query_changed || execute_changed) {
            tracking.last_query = tracking.query.clone();
            tracking.last_execute = tracking.execute.clone();
            if self.accumulate_pages {
                tracking.should_reset = true;
            }
        }

        let reset = manual && (query_changed || pagination_changed || execute_changed);
        if reset {
            tracking.last_pagination = pagination_state.clone();
        }

        let off_first_page = paginator.is_some_and(|p| {
            matches!(p.first_state(), Ok(Some(first)) if Some(&first) != pagination_state.as_ref())
        });

        let step = if (query_changed || execute_changed) && off_first_page {
            Step::First
        } else if should_fetch {
            Step::Run
        } else {
            Step::Idle
        };
        (step, reset)
    }

    /// Settled fetches can reveal changes made while they were loading
    fn after_settle(weak: &Weak<Self>) {
        if let Some(inner) = weak.upgrade() {
            if let Err(e) = inner.evaluate() {
                warn!(error = %e, "Failed to re-evaluate listing after fetch");
            }
        }
    }
}

/// A paginated, optionally accumulating listing over an async executor
///
/// Dropping the listing disposes its runner; outcomes of fetches still in
/// flight are dropped.
pub struct AsyncListing<T, P: Paginator = InferredPaginator> {
    inner: Arc<Inner<T, P>>,
}

impl<T, P> AsyncListing<T, P>
where
    T: Clone + Send + Sync + 'static,
    P: Paginator,
{
    /// Create a listing; with a `DEEP` trigger the first fetch starts
    /// immediately, which requires a tokio runtime
    pub fn new(execute: ListingAction<T, P>, options: ListingOptions<P>) -> Result<Self> {
        options.validate()?;
        if !options.trigger.is_manual() && Handle::try_current().is_err() {
            return Err(Error::config(
                "AsyncListing with a DEEP trigger must be created inside a tokio runtime",
            ));
        }

        let ListingOptions {
            trigger,
            query,
            accumulate_pages,
            paginator,
        } = options;

        let inner = Arc::new_cyclic(|weak: &Weak<Inner<T, P>>| {
            let action = {
                let weak = weak.clone();
                crate::runner::Action::new(move |()| Inner::fetch(&weak))
            };
            let on_success = {
                let weak = weak.clone();
                move |_: &Vec<T>| Inner::after_settle(&weak)
            };
            let on_error = {
                let weak = weak.clone();
                move |_: &Arc<Error>| Inner::after_settle(&weak)
            };
            let options = RunnerOptions::new(())
                .on_success(on_success)
                .on_error(on_error);

            Inner {
                runner: AsyncRunner::idle(action, options),
                paginator,
                accumulate_pages,
                tracking: Mutex::new(Tracking {
                    trigger,
                    last_query: query.clone(),
                    last_execute: execute.clone(),
                    query,
                    execute,
                    initial_run: true,
                    last_pagination: None,
                    next_pagination: None,
                    should_reset: false,
                    generation: 0,
                }),
                evaluation: Mutex::new(()),
            }
        });

        let listing = Self { inner };
        listing.inner.evaluate()?;
        Ok(listing)
    }

    /// Replace the query; a structural change refetches from the first page
    pub fn set_query(&self, query: JsonObject) -> Result<Option<RunHandle<Vec<T>>>> {
        self.inner.lock().query = query;
        self.inner.evaluate()
    }

    /// Replace the executor; a different action refetches from the first page
    pub fn set_execute(&self, execute: ListingAction<T, P>) -> Result<Option<RunHandle<Vec<T>>>> {
        self.inner.lock().execute = execute;
        self.inner.evaluate()
    }

    /// Switch between `MANUAL` and `DEEP`
    pub fn set_trigger(&self, trigger: Trigger) -> Result<Option<RunHandle<Vec<T>>>> {
        validate_trigger(trigger)?;
        self.inner.lock().trigger = trigger;
        self.inner.evaluate()
    }

    /// Pick up paginator changes made since the last evaluation
    ///
    /// Returns the handle of the fetch this started, if any.
    pub fn sync(&self) -> Result<Option<RunHandle<Vec<T>>>> {
        self.inner.evaluate()
    }

    /// Fetch now with the current query and paginator state
    pub fn run(&self) -> RunHandle<Vec<T>> {
        let _evaluation = self.inner.begin_evaluation();
        self.inner.runner.run()
    }

    /// Clear the result and any accumulated pages
    pub fn reset(&self) {
        let _evaluation = self.inner.begin_evaluation();
        self.inner.lock().should_reset = true;
        self.inner.reset_runner();
    }

    /// Snapshot of the listing state
    pub fn state(&self) -> RunState<Vec<T>> {
        self.inner.runner.state()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RunState<Vec<T>>> {
        self.inner.runner.subscribe()
    }

    /// Wait until no fetch is loading and return that state
    pub async fn settled(&self) -> RunState<Vec<T>> {
        self.inner.runner.settled().await
    }

    pub fn paginator(&self) -> Option<&Arc<P>> {
        self.inner.paginator.as_ref()
    }

    pub fn query(&self) -> JsonObject {
        self.inner.lock().query.clone()
    }

    pub fn trigger(&self) -> Trigger {
        self.inner.lock().trigger
    }

    pub fn accumulates_pages(&self) -> bool {
        self.inner.accumulate_pages
    }
}

impl<T, P: Paginator> std::fmt::Debug for AsyncListing<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tracking = self.inner.tracking.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("AsyncListing")
            .field("trigger", &tracking.trigger)
            .field("query", &tracking.query)
            .field("accumulate_pages", &self.inner.accumulate_pages)
            .field("last_pagination", &tracking.last_pagination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
