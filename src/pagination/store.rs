//! Paginator store
//!
//! Owns the state a paginator reads and writes, the way a component-local
//! hook would: current state in a caller-supplied or private [`StateCell`],
//! internal state always private. `refresh()` rebinds the paginator to
//! fresh pairs from those cells.

use super::types::Paginator;
use crate::state::{StateCell, StatePair};
use std::sync::Arc;

/// A paginator together with the cells holding its state
pub struct PaginatorStore<P: Paginator> {
    paginator: Arc<P>,
    current: StateCell<P::State>,
    internal: StateCell<P::Internal>,
}

impl<P: Paginator> PaginatorStore<P> {
    /// Create a paginator over private state cells
    pub fn new(build: impl FnOnce(StatePair<P::State>, StatePair<P::Internal>) -> P) -> Self {
        Self::with_current(StateCell::default(), build)
    }

    /// Create a paginator whose current state lives in `current`, eg. a cell
    /// restored from a URL or a saved session
    pub fn with_current(
        current: StateCell<P::State>,
        build: impl FnOnce(StatePair<P::State>, StatePair<P::Internal>) -> P,
    ) -> Self {
        let internal = StateCell::default();
        let paginator = Arc::new(build(current.pair(), internal.pair()));
        Self {
            paginator,
            current,
            internal,
        }
    }

    /// Shared handle to the paginator
    pub fn paginator(&self) -> Arc<P> {
        Arc::clone(&self.paginator)
    }

    /// Cell holding the current (restorable) state
    pub fn current(&self) -> &StateCell<P::State> {
        &self.current
    }

    /// Snapshot of the internal state
    pub fn internal_state(&self) -> P::Internal {
        self.internal.get()
    }

    /// Rebind the paginator to the latest committed state
    pub fn refresh(&self) {
        self.paginator
            .replace_state_controllers(self.current.pair(), self.internal.pair());
    }
}

impl<P: Paginator> std::fmt::Debug for PaginatorStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaginatorStore")
            .field("current", &self.current.get())
            .field("internal", &self.internal.get())
            .finish_non_exhaustive()
    }
}
