//! State pair types
//!
//! A `StatePair` is the minimal `[value, setValue]` contract through which
//! components receive externally-owned state.

use std::fmt;
use std::sync::Arc;

/// Setter half of a [`StatePair`]
pub type Setter<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Current value plus the setter that commits a new one
#[derive(Clone)]
pub struct StatePair<T> {
    value: T,
    setter: Setter<T>,
}

impl<T> StatePair<T> {
    /// Create a pair from a value and a setter closure
    pub fn new(value: T, setter: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            value,
            setter: Arc::new(setter),
        }
    }

    /// Create a pair from an already shared setter
    pub fn from_parts(value: T, setter: Setter<T>) -> Self {
        Self { value, setter }
    }

    /// Create a pair whose setter discards every write
    pub fn detached(value: T) -> Self {
        Self::new(value, |_| {})
    }

    /// The value at the time the pair was created
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Commit a new value through the setter
    pub fn set(&self, next: T) {
        (self.setter)(next);
    }

    /// Split into value and setter
    pub fn into_parts(self) -> (T, Setter<T>) {
        (self.value, self.setter)
    }
}

impl<T: Default> StatePair<T> {
    /// Detached pair holding the default value
    pub fn detached_default() -> Self {
        Self::detached(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for StatePair<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatePair")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}
