//! Pagination module
//!
//! Supports: Page Number, Cursor, Limit/Offset, Inferred
//!
//! # Overview
//!
//! Every paginator shares the [`Paginator`] interface: a restorable current
//! state, derived internal state, navigation (`first`/`next`/`previous`/
//! `last` plus their non-mutating `*_state` twins), `get_request_init` to
//! shape outgoing requests and `set_response` to absorb a normalized
//! response. State lives in externally supplied [`StatePair`]s.
//!
//! [`StatePair`]: crate::state::StatePair

mod cursor;
mod inference;
mod inferred;
mod limit_offset;
mod middleware;
mod page_number;
mod store;
mod types;

pub use cursor::{CursorInternal, CursorPaginator, CursorState};
pub use inference::{infer_pagination_state, link_params};
pub use inferred::{infer_kind, InferredInternal, InferredPaginator, InferredState, InferredStrategy};
pub use limit_offset::{LimitOffsetInternal, LimitOffsetPaginator, LimitOffsetState};
pub use middleware::{apply_pagination, value_at};
pub use page_number::{PageNumberInternal, PageNumberPaginator, PageNumberState};
pub use store::PaginatorStore;
pub use types::{
    CurrentState, InternalState, PaginationRequestDetails, PaginationResponse, Paginator,
    PaginatorKind, RequestInit,
};
