//! Limit / offset pagination
//!
//! Sends `limit` and `offset`; expects `total` and `limit` back.

use super::inference;
use super::types::{
    insert_u64, Controllers, InternalState, PaginationRequestDetails, PaginationResponse,
    Paginator, RequestInit,
};
use crate::error::{Error, Result};
use crate::state::{StateCell, StatePair};
use crate::types::deserialize_opt_u64;
use serde::{Deserialize, Serialize};

/// Restorable limit / offset state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOffsetState {
    /// Records per page
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit: Option<u64>,
    /// Records to skip; `None` is the first page
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub offset: Option<u64>,
}

impl LimitOffsetState {
    /// Create a state with `limit` and `offset`
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset).filter(|o| *o > 0),
        }
    }
}

/// Derived limit / offset state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitOffsetInternal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub response_is_set: bool,
}

impl InternalState for LimitOffsetInternal {
    fn response_is_set(&self) -> bool {
        self.response_is_set
    }

    fn mark_response_set(&mut self) {
        self.response_is_set = true;
    }
}

/// Limit / offset based paginator
#[derive(Debug)]
pub struct LimitOffsetPaginator {
    controllers: Controllers<LimitOffsetState, LimitOffsetInternal>,
}

impl LimitOffsetPaginator {
    /// Create a paginator bound to the given state pairs
    pub fn new(
        current: StatePair<LimitOffsetState>,
        internal: StatePair<LimitOffsetInternal>,
    ) -> Self {
        Self {
            controllers: Controllers::new(current, internal),
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.controllers.internal().total
    }

    pub fn limit(&self) -> Option<u64> {
        self.controllers.current().limit
    }

    /// Current offset; an unset offset is 0
    pub fn offset(&self) -> u64 {
        self.controllers.current().offset.unwrap_or(0)
    }

    /// State for `limit`, realigning the offset to a page boundary.
    /// `None` clears both limit and offset.
    pub fn limit_state(&self, limit: Option<u64>) -> Result<LimitOffsetState> {
        let Some(limit) = limit else {
            return Ok(LimitOffsetState::default());
        };
        if limit < 1 {
            return Err(Error::validation("limit", limit, 1));
        }
        let current = self.controllers.current();
        let offset = self.offset();
        if current.limit != Some(limit) && offset > 0 {
            return Ok(LimitOffsetState::new(limit, (offset / limit) * limit));
        }
        Ok(LimitOffsetState {
            limit: Some(limit),
            ..current
        })
    }

    /// Change the limit
    pub fn set_limit(&self, limit: Option<u64>) -> Result<()> {
        let state = self.limit_state(limit)?;
        self.commit(state);
        Ok(())
    }

    /// State for `offset`; `None` or 0 removes the offset
    pub fn offset_state(&self, offset: Option<u64>) -> LimitOffsetState {
        LimitOffsetState {
            offset: offset.filter(|o| *o > 0),
            ..self.controllers.current()
        }
    }

    /// Change the offset
    pub fn set_offset(&self, offset: Option<u64>) {
        self.commit(self.offset_state(offset));
    }

    fn commit(&self, state: LimitOffsetState) {
        if state != self.controllers.current() {
            self.controllers.set_current(state);
        }
    }
}

impl Default for LimitOffsetPaginator {
    fn default() -> Self {
        Self::new(StateCell::default().pair(), StateCell::default().pair())
    }
}

impl Paginator for LimitOffsetPaginator {
    type State = LimitOffsetState;
    type Internal = LimitOffsetInternal;

    fn current_state(&self) -> LimitOffsetState {
        self.controllers.current()
    }

    fn internal_state(&self) -> LimitOffsetInternal {
        self.controllers.internal()
    }

    fn set_current_state(&self, state: LimitOffsetState) {
        self.controllers.set_current(state);
    }

    fn set_internal_state(&self, state: LimitOffsetInternal) {
        self.controllers.set_internal(state);
    }

    fn replace_state_controllers(
        &self,
        current: StatePair<LimitOffsetState>,
        internal: StatePair<LimitOffsetInternal>,
    ) {
        self.controllers.rebind(current, internal);
    }

    fn has_next_page(&self) -> bool {
        match (self.limit(), self.total()) {
            (Some(limit), Some(total)) => self.offset() + limit < total,
            _ => false,
        }
    }

    fn has_previous_page(&self) -> bool {
        self.total().is_some() && self.offset() > 0
    }

    fn first_state(&self) -> Result<Option<LimitOffsetState>> {
        Ok(Some(self.offset_state(None)))
    }

    fn next_state(&self) -> Result<Option<LimitOffsetState>> {
        Ok(self
            .limit()
            .map(|limit| self.offset_state(Some(self.offset() + limit))))
    }

    fn previous_state(&self) -> Result<Option<LimitOffsetState>> {
        Ok(self
            .limit()
            .map(|limit| self.offset_state(Some(self.offset().saturating_sub(limit)))))
    }

    fn last_state(&self) -> Result<Option<LimitOffsetState>> {
        match (self.total(), self.limit()) {
            (Some(total), Some(limit)) if limit > 0 => {
                let pages = total.div_ceil(limit);
                Ok(Some(self.offset_state(Some(pages.saturating_sub(1) * limit))))
            }
            _ => Ok(None),
        }
    }

    fn get_request_init(&self, mut init: RequestInit) -> RequestInit {
        let current = self.controllers.current();
        insert_u64(&mut init.query, "limit", current.limit);
        insert_u64(&mut init.query, "offset", current.offset);
        init
    }

    fn set_response(&self, response: &PaginationResponse) -> Result<()> {
        self.controllers.set_internal(LimitOffsetInternal {
            total: response.total,
            response_is_set: true,
        });
        if let Some(limit) = response.limit().filter(|l| *l > 0) {
            if self.limit() != Some(limit) {
                self.set_limit(Some(limit))?;
            }
        }
        Ok(())
    }

    fn pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
        inference::limit_offset_state(details)
    }
}
