//! Runner types
//!
//! Action, options, observable state and the per-call handle.

use crate::config::RunnerConfig;
use crate::equality::Trigger;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

// ============================================================================
// Action
// ============================================================================

type ActionFn<A, T> = dyn Fn(A) -> BoxFuture<'static, Result<T>> + Send + Sync;

/// An asynchronous operation invoked with an argument set
///
/// Identity matters: two `Action`s are the same only when one was cloned
/// from the other. Wrapping the same closure twice yields two different
/// actions, and swapping actions on a triggered runner fires a new call.
pub struct Action<A, T> {
    f: Arc<ActionFn<A, T>>,
}

impl<A, T> Action<A, T> {
    /// Wrap an async function
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        A: 'static,
        T: 'static,
    {
        Self {
            f: Arc::new(move |args| f(args).boxed()),
        }
    }

    /// Whether `other` is this very action
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    pub(crate) fn call(&self, args: A) -> BoxFuture<'static, Result<T>> {
        (self.f)(args)
    }
}

impl<A, T> Clone for Action<A, T> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A, T> fmt::Debug for Action<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Action")
            .field(&Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

// ============================================================================
// Options
// ============================================================================

/// Callback invoked with a settled outcome
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Runner options
pub struct RunnerOptions<A, T> {
    /// When to invoke automatically
    pub trigger: Trigger,
    /// Arguments for triggered calls and for `run()`
    pub args: A,
    /// Called after the current call succeeds
    pub on_success: Option<Callback<T>>,
    /// Called after the current call fails
    pub on_error: Option<Callback<Arc<Error>>>,
}

impl<A, T> RunnerOptions<A, T> {
    /// Manual options with `args`
    pub fn new(args: A) -> Self {
        Self {
            trigger: Trigger::Manual,
            args,
            on_success: None,
            on_error: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_args(mut self, args: A) -> Self {
        self.args = args;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&Arc<Error>) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl<T> RunnerOptions<Vec<JsonValue>, T> {
    /// Options from a loaded configuration (callbacks are code-only)
    pub fn from_config(config: RunnerConfig) -> Self {
        Self::new(config.args).with_trigger(config.trigger)
    }
}

impl<A: Default, T> Default for RunnerOptions<A, T> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

impl<A: Clone, T> Clone for RunnerOptions<A, T> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger,
            args: self.args.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<A: fmt::Debug, T> fmt::Debug for RunnerOptions<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerOptions")
            .field("trigger", &self.trigger)
            .field("args", &self.args)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

// ============================================================================
// Run State
// ============================================================================

/// Externally visible outcome of the latest call
///
/// At most one of `result` and `error` is set. While a new call is loading
/// the previous outcome stays visible.
#[derive(Debug, Clone)]
pub struct RunState<T> {
    pub is_loading: bool,
    pub result: Option<T>,
    pub error: Option<Arc<Error>>,
}

impl<T> RunState<T> {
    /// Neither loading nor holding an outcome
    pub fn is_idle(&self) -> bool {
        !self.is_loading && self.result.is_none() && self.error.is_none()
    }
}

impl<T> Default for RunState<T> {
    fn default() -> Self {
        Self {
            is_loading: false,
            result: None,
            error: None,
        }
    }
}

// ============================================================================
// Run Handle
// ============================================================================

pub(crate) type Outcome<T> = std::result::Result<T, Arc<Error>>;

enum HandleInner<T> {
    Pending(oneshot::Receiver<Outcome<T>>),
    Rejected(Option<Error>),
}

/// Resolves with the outcome of one call
///
/// The handle always reflects what the action returned, even when the call
/// was superseded and its outcome never reached the runner state.
pub struct RunHandle<T> {
    inner: HandleInner<T>,
}

impl<T> RunHandle<T> {
    pub(crate) fn pending(rx: oneshot::Receiver<Outcome<T>>) -> Self {
        Self {
            inner: HandleInner::Pending(rx),
        }
    }

    pub(crate) fn rejected(error: Error) -> Self {
        Self {
            inner: HandleInner::Rejected(Some(error)),
        }
    }
}

impl<T> Future for RunHandle<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            HandleInner::Pending(rx) => Pin::new(rx).poll(cx).map(|received| match received {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(Error::Action(error)),
                Err(_) => Err(Error::Cancelled),
            }),
            HandleInner::Rejected(error) => {
                Poll::Ready(Err(error.take().unwrap_or(Error::Cancelled)))
            }
        }
    }
}

impl<T> fmt::Debug for RunHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &self.inner {
            HandleInner::Pending(_) => "pending",
            HandleInner::Rejected(_) => "rejected",
        };
        f.debug_tuple("RunHandle").field(&status).finish()
    }
}
