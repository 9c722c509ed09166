//! Cursor pagination
//!
//! Sends `cursor` and `pageSize`; expects `nextCursor` and `previousCursor`
//! back. The first page is the absence of a cursor.

use super::inference;
use super::types::{
    insert_u64, Controllers, InternalState, PaginationRequestDetails, PaginationResponse,
    Paginator, RequestInit,
};
use crate::error::{Error, Result};
use crate::state::{StateCell, StatePair};
use crate::types::{deserialize_opt_u64, JsonValue};
use serde::{Deserialize, Serialize};

/// Restorable cursor state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    /// Cursor of the current page; `None` is the first page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Records per page
    #[serde(
        default,
        deserialize_with = "deserialize_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub page_size: Option<u64>,
}

/// Derived cursor state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorInternal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_cursor: Option<String>,
    #[serde(default)]
    pub response_is_set: bool,
}

impl InternalState for CursorInternal {
    fn response_is_set(&self) -> bool {
        self.response_is_set
    }

    fn mark_response_set(&mut self) {
        self.response_is_set = true;
    }
}

/// Cursor based paginator
#[derive(Debug)]
pub struct CursorPaginator {
    controllers: Controllers<CursorState, CursorInternal>,
}

impl CursorPaginator {
    /// Create a paginator bound to the given state pairs
    pub fn new(current: StatePair<CursorState>, internal: StatePair<CursorInternal>) -> Self {
        Self {
            controllers: Controllers::new(current, internal),
        }
    }

    pub fn cursor(&self) -> Option<String> {
        self.controllers.current().cursor
    }

    pub fn page_size(&self) -> Option<u64> {
        self.controllers.current().page_size
    }

    pub fn next_cursor(&self) -> Option<String> {
        self.controllers.internal().next_cursor
    }

    pub fn previous_cursor(&self) -> Option<String> {
        self.controllers.internal().previous_cursor
    }

    /// State for `page_size`; `None` removes the page size
    pub fn page_size_state(&self, page_size: Option<u64>) -> Result<CursorState> {
        if let Some(size) = page_size.filter(|s| *s < 1) {
            return Err(Error::validation("pageSize", size, 1));
        }
        Ok(CursorState {
            page_size,
            ..self.controllers.current()
        })
    }

    /// Change the page size, forgetting both known cursors when it differs
    pub fn set_page_size(&self, page_size: Option<u64>) -> Result<()> {
        let state = self.page_size_state(page_size)?;
        if self.page_size() != page_size {
            let internal = self.controllers.internal();
            self.controllers.replace_internal(CursorInternal {
                next_cursor: None,
                previous_cursor: None,
                ..internal
            });
        }
        if state != self.controllers.current() {
            self.controllers.set_current(state);
        }
        Ok(())
    }
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self::new(StateCell::default().pair(), StateCell::default().pair())
    }
}

impl Paginator for CursorPaginator {
    type State = CursorState;
    type Internal = CursorInternal;

    fn current_state(&self) -> CursorState {
        self.controllers.current()
    }

    fn internal_state(&self) -> CursorInternal {
        self.controllers.internal()
    }

    fn set_current_state(&self, state: CursorState) {
        self.controllers.set_current(state);
    }

    fn set_internal_state(&self, state: CursorInternal) {
        self.controllers.set_internal(state);
    }

    fn replace_state_controllers(
        &self,
        current: StatePair<CursorState>,
        internal: StatePair<CursorInternal>,
    ) {
        self.controllers.rebind(current, internal);
    }

    fn has_next_page(&self) -> bool {
        self.next_cursor().is_some_and(|c| !c.is_empty())
    }

    fn has_previous_page(&self) -> bool {
        self.previous_cursor().is_some_and(|c| !c.is_empty())
    }

    fn first_state(&self) -> Result<Option<CursorState>> {
        Ok(Some(CursorState {
            cursor: None,
            ..self.controllers.current()
        }))
    }

    fn next_state(&self) -> Result<Option<CursorState>> {
        Ok(self.next_cursor().map(|cursor| CursorState {
            cursor: Some(cursor),
            ..self.controllers.current()
        }))
    }

    fn previous_state(&self) -> Result<Option<CursorState>> {
        Ok(self.previous_cursor().map(|cursor| CursorState {
            cursor: Some(cursor),
            ..self.controllers.current()
        }))
    }

    fn last_state(&self) -> Result<Option<CursorState>> {
        Ok(None)
    }

    fn get_request_init(&self, mut init: RequestInit) -> RequestInit {
        let current = self.controllers.current();
        insert_u64(&mut init.query, "pageSize", current.page_size);
        if let Some(cursor) = current.cursor.filter(|c| !c.is_empty()) {
            init.query.insert("cursor".to_string(), JsonValue::String(cursor));
        }
        init
    }

    fn set_response(&self, response: &PaginationResponse) -> Result<()> {
        self.controllers.set_internal(CursorInternal {
            next_cursor: response.next_cursor(),
            previous_cursor: response.previous_cursor(),
            response_is_set: true,
        });
        if let Some(size) = response.page_size.filter(|s| *s > 0) {
            let current = self.controllers.current();
            if current.page_size != Some(size) {
                self.controllers.set_current(CursorState {
                    page_size: Some(size),
                    ..current
                });
            }
        }
        Ok(())
    }

    fn pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
        inference::cursor_state(details)
    }
}
