//! Async action runner
//!
//! Invokes an asynchronous action, tracks its lifecycle and decides when to
//! re-invoke it.
//!
//! # Overview
//!
//! Every invocation gets a call id and becomes the current call. Whatever
//! was current before is stale from that moment: its outcome is dropped
//! without touching the [`RunState`] or firing callbacks. `reset()` and
//! disposal make the current call stale as well. The underlying future is
//! never aborted; it runs to completion and its [`RunHandle`] still resolves.
//!
//! With a non-manual [`Trigger`], [`AsyncRunner::update`] plays the role of
//! a re-render: it fires a call when the arguments changed under the
//! trigger's comparison, when the action changed identity, or when the
//! trigger just switched away from `MANUAL`.

mod types;

pub use types::{Action, Callback, RunHandle, RunState, RunnerOptions};

use crate::equality::{ShallowEq, Trigger};
use crate::error::{Error, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};
use types::Outcome;

struct Calls<A, T> {
    next_id: u64,
    current: Option<u64>,
    disposed: bool,
    action: Action<A, T>,
    trigger: Trigger,
    /// Arguments of the last comparison that reported a change
    memo_args: A,
    /// Arguments from the latest update, used by `run()`
    latest_args: A,
    on_success: Option<Callback<T>>,
    on_error: Option<Callback<Arc<Error>>>,
}

struct Shared<A, T> {
    calls: Mutex<Calls<A, T>>,
    state: watch::Sender<RunState<T>>,
}

impl<A, T: Clone> Shared<A, T> {
    fn lock(&self) -> MutexGuard<'_, Calls<A, T>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply an outcome if `id` is still the current call
    fn settle(
        &self,
        id: u64,
        outcome: &Outcome<T>,
        on_success: Option<Callback<T>>,
        on_error: Option<Callback<Arc<Error>>>,
    ) {
        {
            let mut calls = self.lock();
            if calls.disposed || calls.current != Some(id) {
                debug!(call_id = id, "Dropping outcome of superseded call");
                return;
            }
            calls.current = None;
            self.state.send_modify(|state| {
                state.is_loading = false;
                match outcome {
                    Ok(value) => {
                        state.result = Some(value.clone());
                        state.error = None;
                    }
                    Err(error) => {
                        state.result = None;
                        state.error = Some(Arc::clone(error));
                    }
                }
            });
        }

        debug!(call_id = id, ok = outcome.is_ok(), "Call settled");
        match outcome {
            Ok(value) => {
                if let Some(callback) = on_success {
                    callback(value);
                }
            }
            Err(error) => {
                if let Some(callback) = on_error {
                    callback(error);
                }
            }
        }
    }
}

/// Runs an [`Action`] and publishes its [`RunState`]
///
/// Dropping the runner disposes it.
pub struct AsyncRunner<A, T> {
    shared: Arc<Shared<A, T>>,
}

impl<A, T> AsyncRunner<A, T>
where
    A: Clone + ShallowEq + PartialEq + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create a runner; a non-manual trigger fires the first call right away
    pub fn new(action: Action<A, T>, options: RunnerOptions<A, T>) -> Result<Self> {
        let fire = (!options.trigger.is_manual()).then(|| options.args.clone());
        let runner = Self::idle(action.clone(), options);
        if let Some(args) = fire {
            runner.execute(&action, args)?;
        }
        Ok(runner)
    }

    /// Create a runner that waits for the first `run()` or `update()`
    pub(crate) fn idle(action: Action<A, T>, options: RunnerOptions<A, T>) -> Self {
        let RunnerOptions {
            trigger,
            args,
            on_success,
            on_error,
        } = options;
        let (state, _) = watch::channel(RunState::default());

        Self {
            shared: Arc::new(Shared {
                calls: Mutex::new(Calls {
                    next_id: 0,
                    current: None,
                    disposed: false,
                    action,
                    trigger,
                    memo_args: args.clone(),
                    latest_args: args,
                    on_success,
                    on_error,
                }),
                state,
            }),
        }
    }

    /// Supply the latest action and options
    ///
    /// Returns the handle of the call this update fired, if any.
    pub fn update(
        &self,
        action: Action<A, T>,
        options: RunnerOptions<A, T>,
    ) -> Result<Option<RunHandle<T>>> {
        let fire = {
            let mut calls = self.shared.lock();
            if calls.disposed {
                return Ok(None);
            }

            let unchanged = options.trigger.comparator::<A>();
            let args_changed = !unchanged(&calls.memo_args, &options.args);
            if args_changed {
                calls.memo_args = options.args.clone();
            }
            let action_changed = !calls.action.same(&action);
            let leaving_manual = calls.trigger.is_manual() && !options.trigger.is_manual();

            calls.action = action;
            calls.trigger = options.trigger;
            calls.latest_args = options.args;
            calls.on_success = options.on_success;
            calls.on_error = options.on_error;

            let fire = !options.trigger.is_manual()
                && (args_changed || action_changed || leaving_manual);
            fire.then(|| (calls.action.clone(), calls.memo_args.clone()))
        };

        match fire {
            Some((action, args)) => self.execute(&action, args).map(Some),
            None => Ok(None),
        }
    }

    /// Invoke the action with the latest arguments
    pub fn run(&self) -> RunHandle<T> {
        let (action, args) = {
            let calls = self.shared.lock();
            (calls.action.clone(), calls.latest_args.clone())
        };
        self.run_checked(&action, args)
    }

    /// Invoke the action with explicit arguments
    pub fn run_with(&self, args: A) -> RunHandle<T> {
        let action = self.shared.lock().action.clone();
        self.run_checked(&action, args)
    }

    fn run_checked(&self, action: &Action<A, T>, args: A) -> RunHandle<T> {
        if self.is_disposed() {
            warn!("run() was called after the runner was disposed. This has no effect");
            return RunHandle::rejected(Error::Disposed);
        }
        self.execute(action, args)
            .unwrap_or_else(RunHandle::rejected)
    }

    /// Start a call and make it the current one
    fn execute(&self, action: &Action<A, T>, args: A) -> Result<RunHandle<T>> {
        let runtime = Handle::try_current().map_err(|_| {
            Error::config("AsyncRunner can only start calls inside a tokio runtime")
        })?;

        let (id, on_success, on_error) = {
            let mut calls = self.shared.lock();
            let id = calls.next_id;
            calls.next_id += 1;
            calls.current = Some(id);
            self.shared.state.send_modify(|state| state.is_loading = true);
            (id, calls.on_success.clone(), calls.on_error.clone())
        };
        debug!(call_id = id, "Starting call");

        let future = action.call(args);
        let (tx, rx) = oneshot::channel();
        let shared = Arc::downgrade(&self.shared);
        runtime.spawn(async move {
            let outcome = future.await.map_err(Arc::new);
            if let Some(shared) = shared.upgrade() {
                shared.settle(id, &outcome, on_success, on_error);
            }
            let _ = tx.send(outcome);
        });

        Ok(RunHandle::pending(rx))
    }

    /// Drop the current call's outcome and clear the state
    pub fn reset(&self) {
        let mut calls = self.shared.lock();
        calls.current = None;
        self.shared.state.send_replace(RunState::default());
    }

    /// Stop applying outcomes; later `run()` calls are rejected
    pub fn dispose(&self) {
        let mut calls = self.shared.lock();
        calls.disposed = true;
        calls.current = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Current trigger
    pub fn trigger(&self) -> Trigger {
        self.shared.lock().trigger
    }

    /// Snapshot of the run state
    pub fn state(&self) -> RunState<T> {
        self.shared.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RunState<T>> {
        self.shared.state.subscribe()
    }

    /// Wait until no call is loading and return that state
    pub async fn settled(&self) -> RunState<T> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }
}

impl<A, T> Drop for AsyncRunner<A, T> {
    fn drop(&mut self) {
        let mut calls = self.shared.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.disposed = true;
        calls.current = None;
    }
}

impl<A, T> std::fmt::Debug for AsyncRunner<A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let calls = self.shared.calls.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("AsyncRunner")
            .field("trigger", &calls.trigger)
            .field("current", &calls.current)
            .field("disposed", &calls.disposed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
