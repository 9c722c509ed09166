//! Externally-owned state module
//!
//! Every stateful component in this crate reads and writes its state through
//! a [`StatePair`]: the current value plus a setter. Where the value actually
//! lives (an in-memory [`StateCell`], a URL, a parent-owned store) is up to
//! the caller.
//!
//! # Overview
//!
//! The state module provides:
//! - `StatePair` - Current value + setter handed to paginators
//! - `StateCell` - Shared in-memory store that hands out pairs
//! - `StateBinding` - Crate-internal slot that keeps the last written value
//!   readable until the next rebind

mod binding;
mod cell;
mod types;

pub(crate) use binding::StateBinding;
pub use cell::StateCell;
pub use types::{Setter, StatePair};
