//! Inferred pagination
//!
//! The inferred paginator holds no pagination logic of its own. The first
//! response it sees decides which concrete strategy applies:
//! `nextCursor`/`previousCursor` keys mean cursor pagination, a `limit` key
//! means limit/offset, a `total` means page numbers. From then on every call
//! is delegated to that strategy, which reads and writes through
//! projections of the inferred state pairs.
//!
//! The discovered kind is stored in [`InferredInternal::paginator`], so a
//! paginator re-created against the same internal state picks up where the
//! previous one left off.

use super::cursor::{CursorInternal, CursorPaginator, CursorState};
use super::inference::infer_pagination_state;
use super::limit_offset::{LimitOffsetInternal, LimitOffsetPaginator, LimitOffsetState};
use super::page_number::{PageNumberInternal, PageNumberPaginator, PageNumberState};
use super::types::{
    Controllers, InternalState, PaginationRequestDetails, PaginationResponse, Paginator,
    PaginatorKind, RequestInit,
};
use crate::error::{Error, Result};
use crate::state::{StateCell, StatePair};
use crate::types::{deserialize_opt_u64, JsonValue};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

// ============================================================================
// State
// ============================================================================

/// Restorable state of whichever strategy was inferred
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredState {
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u64>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u64>,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub offset: Option<u64>,
}

/// Derived state, including the discovered strategy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferredInternal {
    /// Strategy picked by the first response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paginator: Option<PaginatorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<String>,
    #[serde(default)]
    pub response_is_set: bool,
}

impl InternalState for InferredInternal {
    fn response_is_set(&self) -> bool {
        self.response_is_set
    }

    fn mark_response_set(&mut self) {
        self.response_is_set = true;
    }
}

impl From<PageNumberState> for InferredState {
    fn from(state: PageNumberState) -> Self {
        Self {
            page: state.page,
            page_size: state.page_size,
            ..Self::default()
        }
    }
}

impl From<InferredState> for PageNumberState {
    fn from(state: InferredState) -> Self {
        Self {
            page: state.page,
            page_size: state.page_size,
        }
    }
}

impl From<CursorState> for InferredState {
    fn from(state: CursorState) -> Self {
        Self {
            cursor: state.cursor,
            page_size: state.page_size,
            ..Self::default()
        }
    }
}

impl From<InferredState> for CursorState {
    fn from(state: InferredState) -> Self {
        Self {
            cursor: state.cursor,
            page_size: state.page_size,
        }
    }
}

impl From<LimitOffsetState> for InferredState {
    fn from(state: LimitOffsetState) -> Self {
        Self {
            limit: state.limit,
            offset: state.offset,
            ..Self::default()
        }
    }
}

impl From<InferredState> for LimitOffsetState {
    fn from(state: InferredState) -> Self {
        Self {
            limit: state.limit,
            offset: state.offset,
        }
    }
}

impl From<PageNumberInternal> for InferredInternal {
    fn from(internal: PageNumberInternal) -> Self {
        Self {
            paginator: Some(PaginatorKind::PageNumber),
            total: internal.total,
            response_is_set: internal.response_is_set,
            ..Self::default()
        }
    }
}

impl From<InferredInternal> for PageNumberInternal {
    fn from(internal: InferredInternal) -> Self {
        Self {
            total: internal.total,
            response_is_set: internal.response_is_set,
        }
    }
}

impl From<CursorInternal> for InferredInternal {
    fn from(internal: CursorInternal) -> Self {
        Self {
            paginator: Some(PaginatorKind::Cursor),
            next_cursor: internal.next_cursor,
            previous_cursor: internal.previous_cursor,
            response_is_set: internal.response_is_set,
            ..Self::default()
        }
    }
}

impl From<InferredInternal> for CursorInternal {
    fn from(internal: InferredInternal) -> Self {
        Self {
            next_cursor: internal.next_cursor,
            previous_cursor: internal.previous_cursor,
            response_is_set: internal.response_is_set,
        }
    }
}

impl From<LimitOffsetInternal> for InferredInternal {
    fn from(internal: LimitOffsetInternal) -> Self {
        Self {
            paginator: Some(PaginatorKind::LimitOffset),
            total: internal.total,
            response_is_set: internal.response_is_set,
            ..Self::default()
        }
    }
}

impl From<InferredInternal> for LimitOffsetInternal {
    fn from(internal: InferredInternal) -> Self {
        Self {
            total: internal.total,
            response_is_set: internal.response_is_set,
        }
    }
}

// ============================================================================
// Strategy
// ============================================================================

/// A concrete paginator that can run on projected inferred state
trait Projected: Paginator + Sized
where
    Self::State: From<InferredState>,
    Self::Internal: From<InferredInternal>,
    InferredState: From<Self::State>,
    InferredInternal: From<Self::Internal>,
{
    fn build(current: StatePair<Self::State>, internal: StatePair<Self::Internal>) -> Self;
}

impl Projected for PageNumberPaginator {
    fn build(current: StatePair<PageNumberState>, internal: StatePair<PageNumberInternal>) -> Self {
        Self::new(current, internal)
    }
}

impl Projected for CursorPaginator {
    fn build(current: StatePair<CursorState>, internal: StatePair<CursorInternal>) -> Self {
        Self::new(current, internal)
    }
}

impl Projected for LimitOffsetPaginator {
    fn build(
        current: StatePair<LimitOffsetState>,
        internal: StatePair<LimitOffsetInternal>,
    ) -> Self {
        Self::new(current, internal)
    }
}

type InferredControllers = Controllers<InferredState, InferredInternal>;

/// Pairs for a concrete paginator that write through the inferred bindings
fn projected_pairs<P>(
    controllers: &InferredControllers,
) -> (StatePair<P::State>, StatePair<P::Internal>)
where
    P: Projected,
    P::State: From<InferredState>,
    P::Internal: From<InferredInternal>,
    InferredState: From<P::State>,
    InferredInternal: From<P::Internal>,
{
    let (current, internal) = controllers.bindings();
    let current_value = P::State::from(current.get());
    let internal_value = P::Internal::from(internal.get());
    (
        StatePair::new(current_value, move |next: P::State| {
            current.set(InferredState::from(next))
        }),
        StatePair::new(internal_value, move |next: P::Internal| {
            internal.set(InferredInternal::from(next))
        }),
    )
}

fn build<P>(controllers: &InferredControllers) -> P
where
    P: Projected,
    P::State: From<InferredState>,
    P::Internal: From<InferredInternal>,
    InferredState: From<P::State>,
    InferredInternal: From<P::Internal>,
{
    let (current, internal) = projected_pairs::<P>(controllers);
    P::build(current, internal)
}

fn rebind<P>(paginator: &P, controllers: &InferredControllers)
where
    P: Projected,
    P::State: From<InferredState>,
    P::Internal: From<InferredInternal>,
    InferredState: From<P::State>,
    InferredInternal: From<P::Internal>,
{
    let (current, internal) = projected_pairs::<P>(controllers);
    paginator.replace_state_controllers(current, internal);
}

/// The concrete paginator an [`InferredPaginator`] delegates to
#[derive(Debug)]
pub enum InferredStrategy {
    PageNumber(PageNumberPaginator),
    Cursor(CursorPaginator),
    LimitOffset(LimitOffsetPaginator),
}

macro_rules! delegate {
    ($strategy:expr, $p:ident => $body:expr) => {
        match $strategy {
            InferredStrategy::PageNumber($p) => $body,
            InferredStrategy::Cursor($p) => $body,
            InferredStrategy::LimitOffset($p) => $body,
        }
    };
}

impl InferredStrategy {
    fn new(kind: PaginatorKind, controllers: &InferredControllers) -> Self {
        match kind {
            PaginatorKind::PageNumber => Self::PageNumber(build(controllers)),
            PaginatorKind::Cursor => Self::Cursor(build(controllers)),
            PaginatorKind::LimitOffset => Self::LimitOffset(build(controllers)),
        }
    }

    fn rebind(&self, controllers: &InferredControllers) {
        delegate!(self, p => rebind(p, controllers))
    }

    /// Which strategy this is
    pub fn kind(&self) -> PaginatorKind {
        match self {
            Self::PageNumber(_) => PaginatorKind::PageNumber,
            Self::Cursor(_) => PaginatorKind::Cursor,
            Self::LimitOffset(_) => PaginatorKind::LimitOffset,
        }
    }
}

/// Pick a strategy from key presence in a normalized response
pub fn infer_kind(response: &PaginationResponse) -> Option<PaginatorKind> {
    if response.has_cursor_keys() {
        Some(PaginatorKind::Cursor)
    } else if response.limit.is_some() {
        Some(PaginatorKind::LimitOffset)
    } else if response.total.is_some() {
        Some(PaginatorKind::PageNumber)
    } else {
        None
    }
}

// ============================================================================
// Inferred Paginator
// ============================================================================

/// Paginator whose strategy is discovered from the first response
#[derive(Debug)]
pub struct InferredPaginator {
    controllers: InferredControllers,
    strategy: Mutex<Option<Arc<InferredStrategy>>>,
}

impl InferredPaginator {
    /// Create a paginator bound to the given state pairs
    pub fn new(current: StatePair<InferredState>, internal: StatePair<InferredInternal>) -> Self {
        Self {
            controllers: Controllers::new(current, internal),
            strategy: Mutex::new(None),
        }
    }

    /// The strategy delegated to, once known
    pub fn strategy(&self) -> Option<Arc<InferredStrategy>> {
        let mut slot = self.strategy.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            if let Some(kind) = self.controllers.internal().paginator {
                *slot = Some(Arc::new(InferredStrategy::new(kind, &self.controllers)));
            }
        }
        slot.clone()
    }

    /// The inferred strategy kind, once known
    pub fn kind(&self) -> Option<PaginatorKind> {
        self.strategy().map(|s| s.kind())
    }

    /// Point the strategy at the latest inferred state, or drop it when the
    /// recorded kind no longer matches
    fn reproject(&self) {
        let recorded = self.controllers.internal().paginator;
        let mut slot = self.strategy.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(strategy) if Some(strategy.kind()) == recorded => {
                let strategy = Arc::clone(strategy);
                drop(slot);
                strategy.rebind(&self.controllers);
            }
            Some(_) => *slot = None,
            None => {}
        }
    }

    fn inferred(&self, method: &str) -> Result<Arc<InferredStrategy>> {
        self.strategy().ok_or_else(|| Error::not_inferred(method))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Total number of records (page number and limit/offset only)
    pub fn total(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::PageNumber(p)) => Ok(p.total()),
            Some(InferredStrategy::LimitOffset(p)) => Ok(p.total()),
            Some(InferredStrategy::Cursor(_)) => {
                Err(Error::not_valid_for("total", PaginatorKind::Cursor))
            }
        }
    }

    pub fn total_pages(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::PageNumber(p)) => Ok(p.total_pages()),
            Some(_) => Err(Error::only_valid_for("total_pages", PaginatorKind::PageNumber)),
        }
    }

    pub fn page(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::PageNumber(p)) => Ok(p.page()),
            Some(_) => Err(Error::only_valid_for("page", PaginatorKind::PageNumber)),
        }
    }

    pub fn page_size(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::PageNumber(p)) => Ok(p.page_size()),
            Some(InferredStrategy::Cursor(p)) => Ok(p.page_size()),
            Some(InferredStrategy::LimitOffset(_)) => Err(Error::usage(
                "page_size is not valid for LimitOffsetPaginator. Use limit instead.",
            )),
        }
    }

    pub fn cursor(&self) -> Result<Option<String>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::Cursor(p)) => Ok(p.cursor()),
            Some(_) => Err(Error::only_valid_for("cursor", PaginatorKind::Cursor)),
        }
    }

    pub fn next_cursor(&self) -> Result<Option<String>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::Cursor(p)) => Ok(p.next_cursor()),
            Some(_) => Err(Error::only_valid_for("next_cursor", PaginatorKind::Cursor)),
        }
    }

    pub fn previous_cursor(&self) -> Result<Option<String>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::Cursor(p)) => Ok(p.previous_cursor()),
            Some(_) => Err(Error::only_valid_for("previous_cursor", PaginatorKind::Cursor)),
        }
    }

    pub fn limit(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::LimitOffset(p)) => Ok(p.limit()),
            Some(_) => Err(Error::only_valid_for("limit", PaginatorKind::LimitOffset)),
        }
    }

    pub fn offset(&self) -> Result<Option<u64>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::LimitOffset(p)) => Ok(Some(p.offset())),
            Some(_) => Err(Error::only_valid_for("offset", PaginatorKind::LimitOffset)),
        }
    }

    // ========================================================================
    // State Builders and Mutators
    // ========================================================================

    /// State for `page`; `None` unless page numbers were inferred
    pub fn page_state(&self, page: Option<u64>) -> Result<Option<InferredState>> {
        match self.strategy().as_deref() {
            Some(InferredStrategy::PageNumber(p)) => p.page_state(page).map(|s| Some(s.into())),
            _ => Ok(None),
        }
    }

    pub fn set_page(&self, page: Option<u64>) -> Result<()> {
        match &*self.inferred("set_page()")? {
            InferredStrategy::PageNumber(p) => p.set_page(page),
            _ => Err(Error::only_valid_for("set_page()", PaginatorKind::PageNumber)),
        }
    }

    /// State for `page_size`; `None` for limit/offset
    pub fn page_size_state(&self, page_size: Option<u64>) -> Result<Option<InferredState>> {
        match self.strategy().as_deref() {
            Some(InferredStrategy::PageNumber(p)) => {
                p.page_size_state(page_size).map(|s| Some(s.into()))
            }
            Some(InferredStrategy::Cursor(p)) => {
                p.page_size_state(page_size).map(|s| Some(s.into()))
            }
            _ => Ok(None),
        }
    }

    pub fn set_page_size(&self, page_size: Option<u64>) -> Result<()> {
        match &*self.inferred("set_page_size()")? {
            InferredStrategy::PageNumber(p) => p.set_page_size(page_size),
            InferredStrategy::Cursor(p) => p.set_page_size(page_size),
            InferredStrategy::LimitOffset(_) => Err(Error::not_valid_for(
                "set_page_size()",
                PaginatorKind::LimitOffset,
            )),
        }
    }

    /// State for `limit`; `None` unless limit/offset was inferred
    pub fn limit_state(&self, limit: Option<u64>) -> Result<Option<InferredState>> {
        match self.strategy().as_deref() {
            Some(InferredStrategy::LimitOffset(p)) => p.limit_state(limit).map(|s| Some(s.into())),
            _ => Ok(None),
        }
    }

    pub fn set_limit(&self, limit: Option<u64>) -> Result<()> {
        match &*self.inferred("set_limit()")? {
            InferredStrategy::LimitOffset(p) => p.set_limit(limit),
            _ => Err(Error::only_valid_for("set_limit()", PaginatorKind::LimitOffset)),
        }
    }

    /// State for `offset`; `None` unless limit/offset was inferred
    pub fn offset_state(&self, offset: Option<u64>) -> Result<Option<InferredState>> {
        match self.strategy().as_deref() {
            Some(InferredStrategy::LimitOffset(p)) => Ok(Some(p.offset_state(offset).into())),
            _ => Ok(None),
        }
    }

    pub fn set_offset(&self, offset: Option<u64>) -> Result<()> {
        match &*self.inferred("set_offset()")? {
            InferredStrategy::LimitOffset(p) => {
                p.set_offset(offset);
                Ok(())
            }
            _ => Err(Error::only_valid_for("set_offset()", PaginatorKind::LimitOffset)),
        }
    }
}

impl Default for InferredPaginator {
    fn default() -> Self {
        Self::new(StateCell::default().pair(), StateCell::default().pair())
    }
}

impl Paginator for InferredPaginator {
    type State = InferredState;
    type Internal = InferredInternal;

    fn current_state(&self) -> InferredState {
        self.controllers.current()
    }

    fn internal_state(&self) -> InferredInternal {
        self.controllers.internal()
    }

    fn set_current_state(&self, state: InferredState) {
        self.controllers.set_current(state);
        self.reproject();
    }

    fn set_internal_state(&self, mut state: InferredInternal) {
        if state.paginator.is_none() {
            state.paginator = self.kind();
        }
        self.controllers.set_internal(state);
        self.reproject();
    }

    fn replace_state_controllers(
        &self,
        current: StatePair<InferredState>,
        internal: StatePair<InferredInternal>,
    ) {
        self.controllers.rebind(current, internal);
        self.reproject();
    }

    fn has_next_page(&self) -> bool {
        self.strategy()
            .is_some_and(|s| delegate!(&*s, p => p.has_next_page()))
    }

    fn has_previous_page(&self) -> bool {
        self.strategy()
            .is_some_and(|s| delegate!(&*s, p => p.has_previous_page()))
    }

    fn first_state(&self) -> Result<Option<InferredState>> {
        match self.strategy() {
            Some(s) => delegate!(&*s, p => Ok(p.first_state()?.map(InferredState::from))),
            None => Ok(None),
        }
    }

    fn next_state(&self) -> Result<Option<InferredState>> {
        match self.strategy() {
            Some(s) => delegate!(&*s, p => Ok(p.next_state()?.map(InferredState::from))),
            None => Ok(None),
        }
    }

    fn previous_state(&self) -> Result<Option<InferredState>> {
        match self.strategy() {
            Some(s) => delegate!(&*s, p => Ok(p.previous_state()?.map(InferredState::from))),
            None => Ok(None),
        }
    }

    fn last_state(&self) -> Result<Option<InferredState>> {
        match self.strategy().as_deref() {
            None => Ok(None),
            Some(InferredStrategy::Cursor(_)) => {
                Err(Error::not_valid_for("last()", PaginatorKind::Cursor))
            }
            Some(InferredStrategy::PageNumber(p)) => Ok(p.last_state()?.map(Into::into)),
            Some(InferredStrategy::LimitOffset(p)) => Ok(p.last_state()?.map(Into::into)),
        }
    }

    fn first(&self) -> Result<()> {
        delegate!(&*self.inferred("first()")?, p => p.first())
    }

    fn next(&self) -> Result<()> {
        delegate!(&*self.inferred("next()")?, p => p.next())
    }

    fn previous(&self) -> Result<()> {
        delegate!(&*self.inferred("previous()")?, p => p.previous())
    }

    fn last(&self) -> Result<()> {
        match &*self.inferred("last()")? {
            InferredStrategy::Cursor(_) => {
                Err(Error::not_valid_for("last()", PaginatorKind::Cursor))
            }
            InferredStrategy::PageNumber(p) => p.last(),
            InferredStrategy::LimitOffset(p) => p.last(),
        }
    }

    fn get_request_init(&self, mut init: RequestInit) -> RequestInit {
        if let Some(strategy) = self.strategy() {
            return delegate!(&*strategy, p => p.get_request_init(init));
        }
        // Not inferred yet: pass restored state through, caller keys win
        if let Ok(JsonValue::Object(state)) = serde_json::to_value(self.controllers.current()) {
            for (key, value) in state {
                init.query.entry(key).or_insert(value);
            }
        }
        init
    }

    fn set_response(&self, response: &PaginationResponse) -> Result<()> {
        let strategy = match self.strategy() {
            Some(strategy) => strategy,
            None => {
                let kind = infer_kind(response).ok_or(Error::InferenceFailed)?;
                debug!(paginator = %kind, "Inferred pagination strategy");
                let strategy = Arc::new(InferredStrategy::new(kind, &self.controllers));
                *self.strategy.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::clone(&strategy));
                strategy
            }
        };
        delegate!(&*strategy, p => p.set_response(response))
    }

    fn pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
        infer_pagination_state(details)
    }
}
