//! In-memory state store
//!
//! `StateCell` plays the role of a component-local state hook: it owns a
//! value and hands out [`StatePair`]s whose setter writes back into it.

use super::types::StatePair;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared in-memory state store
#[derive(Debug)]
pub struct StateCell<T> {
    /// Current value
    value: Arc<RwLock<T>>,
    /// Number of writes committed so far
    writes: Arc<AtomicU64>,
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    /// Create a new cell holding `value`
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(value)),
            writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Snapshot of the current value
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current value
    pub fn set(&self, next: T) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Update the current value in place
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.value.write().unwrap_or_else(PoisonError::into_inner));
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of writes committed through this cell or its pairs
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Hand out a pair reflecting the current value
    pub fn pair(&self) -> StatePair<T> {
        let cell = self.clone();
        StatePair::new(self.get(), move |next| cell.set(next))
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + Serialize + DeserializeOwned + 'static> StateCell<T> {
    /// Restore a cell from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: T = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse state JSON: {e}")))?;
        Ok(Self::new(value))
    }

    /// Export the current value as a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.get())?)
    }
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            writes: Arc::clone(&self.writes),
        }
    }
}
