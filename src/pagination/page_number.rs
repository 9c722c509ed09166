//! Page number pagination
//!
//! Sends `page` and `pageSize`; expects `total` (or `count`) and optionally
//! `pageSize` back.

use super::inference;
use super::types::{
    insert_u64, Controllers, InternalState, PaginationRequestDetails, PaginationResponse,
    Paginator, RequestInit,
};
use crate::error::{Error, Result};
use crate::state::{StateCell, StatePair};
use crate::types::deserialize_opt_u64;
use serde::{Deserialize, Serialize};

/// Restorable page number state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumberState {
    /// Current page (1-based)
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page: Option<u64>,
    /// Records per page
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,
}

impl PageNumberState {
    /// Create a state for `page` with `page_size`
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

/// Derived page number state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageNumberInternal {
    /// Total number of records on the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default)]
    pub response_is_set: bool,
}

impl InternalState for PageNumberInternal {
    fn response_is_set(&self) -> bool {
        self.response_is_set
    }

    fn mark_response_set(&mut self) {
        self.response_is_set = true;
    }
}

/// Page number based paginator
#[derive(Debug)]
pub struct PageNumberPaginator {
    controllers: Controllers<PageNumberState, PageNumberInternal>,
}

impl PageNumberPaginator {
    /// Create a paginator bound to the given state pairs
    pub fn new(
        current: StatePair<PageNumberState>,
        internal: StatePair<PageNumberInternal>,
    ) -> Self {
        Self {
            controllers: Controllers::new(current, internal),
        }
    }

    /// Total number of records, once a response is known
    pub fn total(&self) -> Option<u64> {
        self.controllers.internal().total
    }

    /// Total number of pages, once both total and page size are known
    pub fn total_pages(&self) -> Option<u64> {
        match (self.total(), self.page_size()) {
            (Some(total), Some(size)) if size > 0 => Some(total.div_ceil(size)),
            _ => None,
        }
    }

    /// Current page
    pub fn page(&self) -> Option<u64> {
        self.controllers.current().page
    }

    /// Current page size
    pub fn page_size(&self) -> Option<u64> {
        self.controllers.current().page_size
    }

    /// State for `page`; `None` removes the page and keeps the page size
    pub fn page_state(&self, page: Option<u64>) -> Result<PageNumberState> {
        if let Some(page) = page.filter(|p| *p < 1) {
            return Err(Error::validation("page", page, 1));
        }
        Ok(PageNumberState {
            page,
            ..self.controllers.current()
        })
    }

    /// Go to `page`
    pub fn set_page(&self, page: Option<u64>) -> Result<()> {
        let state = self.page_state(page)?;
        self.commit(state);
        Ok(())
    }

    /// State for `page_size`, keeping the first record of the current page
    /// visible. `None` clears both page and page size.
    pub fn page_size_state(&self, page_size: Option<u64>) -> Result<PageNumberState> {
        let Some(size) = page_size else {
            return Ok(PageNumberState::default());
        };
        if size < 1 {
            return Err(Error::validation("pageSize", size, 1));
        }
        let current = self.controllers.current();
        match (current.page, current.page_size) {
            (Some(page), Some(old)) if page > 0 && old > 0 && old != size => {
                let first_record = (page - 1) * old;
                Ok(PageNumberState::new(first_record.div_ceil(size).max(1), size))
            }
            _ => Ok(PageNumberState {
                page_size: Some(size),
                ..current
            }),
        }
    }

    /// Change the page size
    pub fn set_page_size(&self, page_size: Option<u64>) -> Result<()> {
        let state = self.page_size_state(page_size)?;
        self.commit(state);
        Ok(())
    }

    fn commit(&self, state: PageNumberState) {
        if state != self.controllers.current() {
            self.controllers.set_current(state);
        }
    }
}

impl Default for PageNumberPaginator {
    fn default() -> Self {
        Self::new(StateCell::default().pair(), StateCell::default().pair())
    }
}

impl Paginator for PageNumberPaginator {
    type State = PageNumberState;
    type Internal = PageNumberInternal;

    fn current_state(&self) -> PageNumberState {
        self.controllers.current()
    }

    fn internal_state(&self) -> PageNumberInternal {
        self.controllers.internal()
    }

    fn set_current_state(&self, state: PageNumberState) {
        self.controllers.set_current(state);
    }

    fn set_internal_state(&self, state: PageNumberInternal) {
        self.controllers.set_internal(state);
    }

    fn replace_state_controllers(
        &self,
        current: StatePair<PageNumberState>,
        internal: StatePair<PageNumberInternal>,
    ) {
        self.controllers.rebind(current, internal);
    }

    fn has_next_page(&self) -> bool {
        let current = self.controllers.current();
        match (current.page_size, self.total()) {
            (Some(size), Some(total)) if size > 0 && total > 0 => {
                current.page.unwrap_or(1) * size < total
            }
            _ => false,
        }
    }

    fn has_previous_page(&self) -> bool {
        self.page().unwrap_or(1) > 1
    }

    fn first_state(&self) -> Result<Option<PageNumberState>> {
        self.page_state(Some(1)).map(Some)
    }

    fn next_state(&self) -> Result<Option<PageNumberState>> {
        self.page_state(Some(self.page().unwrap_or(1) + 1)).map(Some)
    }

    fn previous_state(&self) -> Result<Option<PageNumberState>> {
        self.page_state(Some(self.page().unwrap_or(1).saturating_sub(1)))
            .map(Some)
    }

    fn last_state(&self) -> Result<Option<PageNumberState>> {
        match self.total_pages() {
            Some(pages) => self.page_state(Some(pages.max(1))).map(Some),
            None => Ok(None),
        }
    }

    fn get_request_init(&self, mut init: RequestInit) -> RequestInit {
        let current = self.controllers.current();
        insert_u64(&mut init.query, "pageSize", current.page_size);
        insert_u64(&mut init.query, "page", current.page);
        init
    }

    fn set_response(&self, response: &PaginationResponse) -> Result<()> {
        self.controllers.set_internal(PageNumberInternal {
            total: response.total,
            response_is_set: true,
        });
        if let Some(size) = response.page_size.filter(|s| *s > 0) {
            if self.page_size() != Some(size) {
                self.set_page_size(Some(size))?;
            }
        }
        let current = self.controllers.current();
        if current.page.is_none() && current.page_size.is_some() {
            self.controllers.set_current(PageNumberState {
                page: Some(1),
                ..current
            });
        }
        Ok(())
    }

    fn pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
        inference::page_number_state(details)
    }
}
