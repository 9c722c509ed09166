//! Response shape inference
//!
//! Each paginator recognizes its own response shape and normalizes it into a
//! [`PaginationResponse`]. `None` means "not paginated this way, try the
//! next one". Bodies that are arrays (or not objects at all) are treated as
//! unpaginated data.
//!
//! Cursor and limit/offset responses look alike apart from their navigation
//! links, so those two require `cursor=` / `limit=` or `offset=` markers in
//! the `next`/`previous` links.

use super::types::{PaginationRequestDetails, PaginationResponse};
use crate::types::{as_u64, JsonObject, JsonValue};
use std::collections::HashMap;

/// Query parameters embedded in a navigation link
pub fn link_params(link: &str) -> HashMap<String, String> {
    let Some((_, query)) = link.split_once('?') else {
        return HashMap::new();
    };
    let query = query.split('#').next().unwrap_or_default();
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

/// Try every strategy: cursor, then limit/offset, then page number
pub fn infer_pagination_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
    cursor_state(details)
        .or_else(|| limit_offset_state(details))
        .or_else(|| page_number_state(details))
}

fn body_object(details: &PaginationRequestDetails) -> Option<&JsonObject> {
    details.decoded_body.as_object()
}

fn results(body: &JsonObject) -> Option<Vec<JsonValue>> {
    body.get("results").and_then(JsonValue::as_array).cloned()
}

fn link<'a>(body: &'a JsonObject, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.is_empty())
}

fn positive(body: &JsonObject, key: &str) -> Option<u64> {
    body.get(key).and_then(as_u64).filter(|n| *n > 0)
}

fn has_total(body: &JsonObject) -> bool {
    body.contains_key("count") || body.contains_key("total")
}

/// `count` wins whenever the key is present, even when it is null
fn total(body: &JsonObject) -> Option<&JsonValue> {
    body.get("count").or_else(|| body.get("total"))
}

fn cursor_value(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn cursor_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
    let body = body_object(details)?;
    // A count means limit/offset or page numbers
    if has_total(body) {
        return None;
    }

    let next = link(body, "next").map(link_params);
    let previous = link(body, "previous").map(link_params);
    let has_cursor =
        |params: &Option<HashMap<String, String>>| params.as_ref().is_some_and(|p| p.contains_key("cursor"));
    let linked = has_cursor(&next) || has_cursor(&previous);

    let (next_cursor, previous_cursor) = if linked {
        (
            next.and_then(|mut p| p.remove("cursor")),
            previous.and_then(|mut p| p.remove("cursor")),
        )
    } else if body.contains_key("nextCursor") || body.contains_key("previousCursor") {
        (
            cursor_value(body.get("nextCursor")),
            cursor_value(body.get("previousCursor")),
        )
    } else {
        return None;
    };

    Some(PaginationResponse {
        results: results(body),
        page_size: positive(body, "pageSize"),
        next_cursor: Some(next_cursor.filter(|c| !c.is_empty())),
        previous_cursor: Some(previous_cursor.filter(|c| !c.is_empty())),
        ..PaginationResponse::default()
    })
}

pub(crate) fn limit_offset_state(
    details: &PaginationRequestDetails,
) -> Option<PaginationResponse> {
    let body = body_object(details)?;
    if !(body.contains_key("next") || body.contains_key("previous")) || !has_total(body) {
        return None;
    }

    let params = link(body, "previous")
        .or_else(|| link(body, "next"))
        .map(link_params)
        .unwrap_or_default();
    // Page number responses share this structure; only the link params differ
    if !params.contains_key("limit") && !params.contains_key("offset") {
        return None;
    }

    let limit = params
        .get("limit")
        .and_then(|l| l.trim().parse::<u64>().ok())
        .filter(|l| *l > 0);

    Some(PaginationResponse {
        results: results(body),
        total: total(body).and_then(as_u64),
        limit: Some(limit),
        ..PaginationResponse::default()
    })
}

pub(crate) fn page_number_state(details: &PaginationRequestDetails) -> Option<PaginationResponse> {
    let body = body_object(details)?;
    let results = results(body)?;
    let total = match total(body)? {
        JsonValue::Number(n) => n.as_u64()?,
        _ => return None,
    };

    let on_first_page = details.query_u64("page").map_or(true, |page| page == 1);
    let page_size = positive(body, "pageSize").or_else(|| {
        let len = results.len() as u64;
        (total > len && on_first_page && len > 0).then_some(len)
    });

    Some(PaginationResponse {
        results: Some(results),
        total: Some(total),
        page_size,
        ..PaginationResponse::default()
    })
}
