//! Equality policies
//!
//! Decide whether two successive invocation argument sets are "unchanged".
//!
//! # Overview
//!
//! - `Trigger::Manual` - arguments are always considered unchanged, so
//!   nothing is ever triggered automatically
//! - `Trigger::Shallow` - compares scalars by value and shared handles
//!   (`Arc`) by identity; see [`ShallowEq`]
//! - `Trigger::Deep` - full structural comparison via `PartialEq`

mod shallow;

pub use shallow::ShallowEq;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Comparison strategy: returns `true` when `prev` and `next` are equal
pub type Comparator<A> = fn(&A, &A) -> bool;

/// Trigger policy deciding when an action is invoked automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trigger {
    /// Only invoke when `run()` is called explicitly
    #[default]
    Manual,
    /// Invoke when arguments change under shallow comparison
    Shallow,
    /// Invoke when arguments change under deep comparison
    Deep,
}

impl Trigger {
    /// All valid trigger names
    pub const NAMES: [&'static str; 3] = ["MANUAL", "SHALLOW", "DEEP"];

    /// Check if this is the manual trigger
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }

    /// Comparison strategy for this trigger
    pub fn comparator<A: ShallowEq + PartialEq>(self) -> Comparator<A> {
        match self {
            Self::Manual => always_equal::<A>,
            Self::Shallow => is_equal::<A>,
            Self::Deep => is_deep_equal::<A>,
        }
    }

    /// Canonical upper-case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Shallow => "SHALLOW",
            Self::Deep => "DEEP",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(Self::Manual),
            "SHALLOW" => Ok(Self::Shallow),
            "DEEP" => Ok(Self::Deep),
            _ => Err(Error::invalid_value(
                "trigger",
                format!(
                    "Invalid trigger {s}. Valid triggers are: {}",
                    Self::NAMES.join(", ")
                ),
            )),
        }
    }
}

fn always_equal<A>(_prev: &A, _next: &A) -> bool {
    true
}

/// Shallow equality
pub fn is_equal<A: ShallowEq + ?Sized>(a: &A, b: &A) -> bool {
    a.shallow_eq(b)
}

/// Deep (structural) equality
pub fn is_deep_equal<A: PartialEq + ?Sized>(a: &A, b: &A) -> bool {
    a == b
}

#[cfg(test)]
mod tests;
