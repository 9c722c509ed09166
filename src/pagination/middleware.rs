//! Pagination middleware
//!
//! Glue between a decoded response body and a paginator: normalize the body
//! with the paginator's shape inference, feed the result to `set_response`
//! and hand back just the page's items.

use super::types::{PaginationRequestDetails, Paginator};
use crate::error::Result;
use crate::types::JsonValue;
use tracing::warn;

/// Apply a response to `paginator` and return the page's items
///
/// With a `result_path` (dotted, eg. `data.users`) the paginated value is
/// read from that path and the items are spliced back in its place, leaving
/// the rest of the body untouched. Unpaginated responses are returned as-is.
pub fn apply_pagination<P: Paginator>(
    paginator: &P,
    details: &PaginationRequestDetails,
    result_path: Option<&str>,
) -> Result<JsonValue> {
    let path = result_path.filter(|p| !p.is_empty());
    let target = match path {
        Some(path) => match value_at(&details.decoded_body, path) {
            Some(value) => value.clone(),
            None => {
                warn!(path, "Result path not found in response; pagination skipped");
                return Ok(details.decoded_body.clone());
            }
        },
        None => details.decoded_body.clone(),
    };

    let scoped = PaginationRequestDetails {
        decoded_body: target,
        ..details.clone()
    };
    let Some(state) = P::pagination_state(&scoped) else {
        warn!(
            url = details.url.as_deref().unwrap_or_default(),
            "Paginator supplied but response does not look paginated"
        );
        return Ok(details.decoded_body.clone());
    };

    paginator.set_response(&state)?;
    let results = JsonValue::Array(state.results.unwrap_or_default());

    Ok(match path {
        Some(path) => {
            let mut body = details.decoded_body.clone();
            set_value_at(&mut body, path, results);
            body
        }
        None => results,
    })
}

/// Read the value at a dotted path
pub fn value_at<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(value, |current, part| current.as_object()?.get(part))
}

fn set_value_at(value: &mut JsonValue, path: &str, replacement: JsonValue) {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;
    for part in path.split('.').filter(|part| !part.is_empty()) {
        match current.as_object_mut().and_then(|map| map.get_mut(part)) {
            Some(next) => current = next,
            None => return,
        }
    }
    *current = replacement;
}
