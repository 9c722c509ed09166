//! Rebindable state slot
//!
//! A consumer may hand a component a fresh `StatePair` on every tick. Between
//! two rebinds, reads must observe the component's own latest write even if
//! the external store has not reflected it yet, so the slot caches the last
//! written value until the next rebind replaces it.

use super::types::{Setter, StatePair};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

struct Slot<T> {
    value: T,
    setter: Setter<T>,
}

/// Cloneable handle to a rebindable state slot
pub(crate) struct StateBinding<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T: Clone> StateBinding<T> {
    pub(crate) fn new(pair: StatePair<T>) -> Self {
        let (value, setter) = pair.into_parts();
        Self {
            slot: Arc::new(Mutex::new(Slot { value, setter })),
        }
    }

    /// Latest value: the last write, or the value of the last rebind
    pub(crate) fn get(&self) -> T {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    /// Record `next` locally and commit it through the bound setter
    pub(crate) fn set(&self, next: T) {
        let setter = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.value = next.clone();
            Arc::clone(&slot.setter)
        };
        // Setter runs unlocked; it may call back into other bindings.
        setter(next);
    }

    /// Replace both the value and the setter
    pub(crate) fn rebind(&self, pair: StatePair<T>) {
        let (value, setter) = pair.into_parts();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.value = value;
        slot.setter = setter;
    }
}

impl<T> Clone for StateBinding<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_tuple("StateBinding").field(&slot.value).finish()
    }
}
