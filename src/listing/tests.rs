//! Tests for listing orchestration

use super::*;
use crate::pagination::{
    apply_pagination, PageNumberPaginator, PaginationRequestDetails, PaginationResponse,
    RequestInit,
};
use crate::runner::Action;
use crate::types::{as_u64, JsonValue};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

const PAGE_SIZE: u64 = 5;
const TOTAL: u64 = 30;

/// Serve numbered items; `base` in the query offsets them
async fn serve_numbered(request: ListingRequest<PageNumberPaginator>) -> Result<Vec<u64>> {
    let paginator = request
        .paginator
        .ok_or_else(|| Error::config("paginator required"))?;
    let base = request.query.get("base").and_then(as_u64).unwrap_or(0);
    let page = paginator.page().unwrap_or(1);
    let size = paginator.page_size().unwrap_or(PAGE_SIZE);
    paginator.set_response(
        &PaginationResponse::new()
            .with_total(TOTAL)
            .with_page_size(size),
    )?;
    let start = base + (page - 1) * size;
    Ok((start..start + size).collect())
}

fn numbered_pages(calls: Arc<AtomicUsize>) -> ListingAction<u64, PageNumberPaginator> {
    Action::new(move |request: ListingRequest<PageNumberPaginator>| {
        calls.fetch_add(1, Ordering::SeqCst);
        serve_numbered(request)
    })
}

/// Executor ignoring pagination entirely
fn static_items(calls: Arc<AtomicUsize>) -> ListingAction<u64, PageNumberPaginator> {
    Action::new(move |_request: ListingRequest<PageNumberPaginator>| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(vec![1, 2, 3]) }
    })
}

fn query(value: JsonValue) -> JsonObject {
    match value {
        JsonValue::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn items(state: &RunState<Vec<u64>>) -> Vec<u64> {
    state.result.clone().unwrap_or_default()
}

// ============================================================================
// Option Validation Tests
// ============================================================================

#[tokio::test]
async fn test_accumulate_requires_paginator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = AsyncListing::new(
        static_items(Arc::clone(&calls)),
        ListingOptions::new().with_accumulate_pages(true),
    )
    .unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("`paginator` must be provided"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shallow_trigger_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = AsyncListing::new(
        static_items(calls),
        ListingOptions::new().with_trigger(Trigger::Shallow),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}

#[test]
fn test_deep_listing_requires_runtime() {
    let calls = Arc::new(AtomicUsize::new(0));
    let err = AsyncListing::new(static_items(Arc::clone(&calls)), ListingOptions::new())
        .unwrap_err();
    assert!(err.is_configuration());

    // MANUAL waits for run(), so no runtime is needed yet
    let listing = AsyncListing::new(
        static_items(calls),
        ListingOptions::new().with_trigger(Trigger::Manual),
    )
    .unwrap();
    assert!(listing.state().is_idle());

    // run() spawns on whichever runtime is current when it is called
    let err = futures::executor::block_on(listing.run()).unwrap_err();
    assert!(err.is_configuration());

    let items = tokio_test::block_on(async { listing.run().await }).unwrap();
    assert_eq!(items, vec![1, 2, 3]);
}

// ============================================================================
// Triggered Fetch Tests
// ============================================================================

#[tokio::test]
async fn test_initial_fetch_and_structural_query_compare() {
    let calls = Arc::new(AtomicUsize::new(0));
    let listing = AsyncListing::new(
        static_items(Arc::clone(&calls)),
        ListingOptions::new().with_query(query(json!({"q": "a", "tags": [1, 2]}))),
    )
    .unwrap();

    assert!(listing.state().is_loading);
    assert_eq!(items(&listing.settled().await), vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // A freshly built but equal query is not a change
    let fired = listing
        .set_query(query(json!({"q": "a", "tags": [1, 2]})))
        .unwrap();
    assert!(fired.is_none());

    listing
        .set_query(query(json!({"q": "b", "tags": [1, 2]})))
        .unwrap()
        .expect("changed query fetches")
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(listing.query(), query(json!({"q": "b", "tags": [1, 2]})));
}

#[tokio::test]
async fn test_executor_change_refetches() {
    let first_calls = Arc::new(AtomicUsize::new(0));
    let second_calls = Arc::new(AtomicUsize::new(0));
    let listing = AsyncListing::new(
        static_items(Arc::clone(&first_calls)),
        ListingOptions::new(),
    )
    .unwrap();
    listing.settled().await;

    listing
        .set_execute(static_items(Arc::clone(&second_calls)))
        .unwrap()
        .expect("new executor fetches")
        .await
        .unwrap();
    assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pagination_change_replaces_page() {
    let calls = Arc::new(AtomicUsize::new(0));
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::clone(&calls)),
        ListingOptions::new().with_paginator(Arc::clone(&paginator)),
    )
    .unwrap();

    assert_eq!(items(&listing.settled().await), vec![0, 1, 2, 3, 4]);
    assert_eq!(paginator.page(), Some(1));

    // Nothing moved: nothing to fetch
    assert!(listing.sync().unwrap().is_none());

    paginator.next().unwrap();
    let page = listing
        .sync()
        .unwrap()
        .expect("page change fetches")
        .await
        .unwrap();
    assert_eq!(page, vec![5, 6, 7, 8, 9]);
    assert_eq!(items(&listing.state()), vec![5, 6, 7, 8, 9]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_query_change_returns_to_first_page() {
    let calls = Arc::new(AtomicUsize::new(0));
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::clone(&calls)),
        ListingOptions::new().with_paginator(Arc::clone(&paginator)),
    )
    .unwrap();
    listing.settled().await;

    paginator.set_page(Some(4)).unwrap();
    listing.sync().unwrap().expect("jump fetches").await.unwrap();
    assert_eq!(items(&listing.state()), vec![15, 16, 17, 18, 19]);

    let page = listing
        .set_query(query(json!({"base": 100})))
        .unwrap()
        .expect("query change fetches")
        .await
        .unwrap();
    assert_eq!(paginator.page(), Some(1));
    assert_eq!(page, vec![100, 101, 102, 103, 104]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_fetch_is_captured_and_not_retried() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let failing = Action::new(move |_: ListingRequest<PageNumberPaginator>| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move { Err::<Vec<u64>, _>(Error::http_status(503, "Service unavailable")) }
    });
    let listing = AsyncListing::new(failing, ListingOptions::new()).unwrap();

    let state = listing.settled().await;
    assert!(state.result.is_none());
    assert_eq!(
        state.error.map(|e| e.to_string()).as_deref(),
        Some("HTTP 503: Service unavailable")
    );

    assert!(listing.sync().unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Accumulation Tests
// ============================================================================

#[tokio::test]
async fn test_accumulates_next_pages_until_query_changes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::clone(&calls)),
        ListingOptions::new()
            .with_paginator(Arc::clone(&paginator))
            .with_accumulate_pages(true),
    )
    .unwrap();
    assert_eq!(items(&listing.settled().await).len(), 5);

    for _ in 0..2 {
        paginator.next().unwrap();
        listing.sync().unwrap().expect("next page fetches").await.unwrap();
    }
    assert_eq!(items(&listing.state()), (0..15).collect::<Vec<_>>());

    listing
        .set_query(query(json!({"base": 100})))
        .unwrap()
        .expect("query change fetches")
        .await
        .unwrap();
    assert_eq!(items(&listing.state()), vec![100, 101, 102, 103, 104]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_jumping_pages_discards_accumulation() {
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::new(AtomicUsize::new(0))),
        ListingOptions::new()
            .with_paginator(Arc::clone(&paginator))
            .with_accumulate_pages(true),
    )
    .unwrap();
    listing.settled().await;

    paginator.next().unwrap();
    listing.sync().unwrap().expect("next page fetches").await.unwrap();
    assert_eq!(items(&listing.state()).len(), 10);

    paginator.last().unwrap();
    listing.sync().unwrap().expect("jump fetches").await.unwrap();
    assert_eq!(items(&listing.state()), vec![25, 26, 27, 28, 29]);
}

#[tokio::test]
async fn test_superseded_jump_does_not_consume_reset() {
    // Third call (the jump) answers before the fourth (the re-run)
    let calls = Arc::new(AtomicUsize::new(0));
    let execute = {
        let calls = Arc::clone(&calls);
        Action::new(move |request: ListingRequest<PageNumberPaginator>| {
            let delay = match calls.fetch_add(1, Ordering::SeqCst) {
                2 => 10,
                3 => 60,
                _ => 0,
            };
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                serve_numbered(request).await
            }
        })
    };
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        execute,
        ListingOptions::new()
            .with_paginator(Arc::clone(&paginator))
            .with_accumulate_pages(true),
    )
    .unwrap();
    listing.settled().await;
    paginator.next().unwrap();
    listing.sync().unwrap().expect("next page fetches").await.unwrap();
    assert_eq!(items(&listing.state()).len(), 10);

    paginator.last().unwrap();
    let jump = listing.sync().unwrap().expect("jump fetches");
    let rerun = listing.run();

    assert_eq!(jump.await.unwrap(), vec![25, 26, 27, 28, 29]);
    assert!(listing.state().is_loading);
    assert_eq!(rerun.await.unwrap(), vec![25, 26, 27, 28, 29]);
    assert_eq!(items(&listing.state()), vec![25, 26, 27, 28, 29]);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_reset_discards_accumulation() {
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::new(AtomicUsize::new(0))),
        ListingOptions::new()
            .with_paginator(Arc::clone(&paginator))
            .with_accumulate_pages(true),
    )
    .unwrap();
    listing.settled().await;
    paginator.next().unwrap();
    listing.sync().unwrap().expect("next page fetches").await.unwrap();

    listing.reset();
    assert!(listing.state().is_idle());

    listing.run().await.unwrap();
    assert_eq!(items(&listing.state()), vec![5, 6, 7, 8, 9]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_paging_on_worker_threads_fetches_each_page_once() {
    for _ in 0..20 {
        let calls = Arc::new(AtomicUsize::new(0));
        let paginator = Arc::new(PageNumberPaginator::default());
        let listing = AsyncListing::new(
            numbered_pages(Arc::clone(&calls)),
            ListingOptions::new()
                .with_paginator(Arc::clone(&paginator))
                .with_accumulate_pages(true),
        )
        .unwrap();
        let mut state = listing.settled().await;

        while paginator.has_next_page() {
            paginator.next().unwrap();
            // The settle of the previous page may start this fetch first
            listing.sync().unwrap();
            state = listing.settled().await;
        }

        assert_eq!(items(&state), (0..TOTAL).collect::<Vec<_>>());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }
}

// ============================================================================
// Manual Trigger Tests
// ============================================================================

#[tokio::test]
async fn test_manual_listing_resets_instead_of_fetching() {
    let calls = Arc::new(AtomicUsize::new(0));
    let paginator = Arc::new(PageNumberPaginator::default());
    let listing = AsyncListing::new(
        numbered_pages(Arc::clone(&calls)),
        ListingOptions::new()
            .with_trigger(Trigger::Manual)
            .with_paginator(Arc::clone(&paginator)),
    )
    .unwrap();
    assert!(listing.state().is_idle());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    listing.run().await.unwrap();
    assert_eq!(items(&listing.state()).len(), 5);

    // Stale results are cleared, nothing is fetched
    assert!(listing
        .set_query(query(json!({"base": 50})))
        .unwrap()
        .is_none());
    assert!(listing.state().is_idle());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    listing.run().await.unwrap();
    assert_eq!(items(&listing.state()), vec![50, 51, 52, 53, 54]);

    paginator.next().unwrap();
    assert!(listing.sync().unwrap().is_none());
    assert!(listing.state().is_idle());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_switching_to_deep_fetches_pending_changes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let listing = AsyncListing::new(
        static_items(Arc::clone(&calls)),
        ListingOptions::new().with_trigger(Trigger::Manual),
    )
    .unwrap();

    listing
        .set_trigger(Trigger::Deep)
        .unwrap()
        .expect("initial fetch still pending")
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(listing.set_trigger(Trigger::Shallow).is_err());
    assert_eq!(listing.trigger(), Trigger::Deep);
}

// ============================================================================
// Inferred Pagination Tests
// ============================================================================

/// Serve a DRF style body of 12 records through the pagination middleware
async fn serve_json(request: ListingRequest<InferredPaginator>) -> Result<Vec<JsonValue>> {
    let paginator = request
        .paginator
        .ok_or_else(|| Error::config("paginator required"))?;
    let init = paginator.get_request_init(RequestInit::from_query(request.query));
    let page = init.query.get("page").and_then(as_u64).unwrap_or(1);
    let start = (page - 1) * 5;
    let results: Vec<JsonValue> = (start..(start + 5).min(12))
        .map(|id| json!({"id": id}))
        .collect();
    let body = json!({"count": 12, "results": results});
    let details = PaginationRequestDetails::new(body).with_query(init.query);
    match apply_pagination(&*paginator, &details, None)? {
        JsonValue::Array(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

#[tokio::test]
async fn test_inferred_listing_over_json_bodies() {
    let executor: ListingAction<JsonValue, InferredPaginator> = Action::new(serve_json);

    let paginator = Arc::new(InferredPaginator::default());
    let listing = AsyncListing::new(
        executor,
        ListingOptions::new().with_paginator(Arc::clone(&paginator)),
    )
    .unwrap();

    let state = listing.settled().await;
    assert_eq!(state.result.map(|items| items.len()), Some(5));
    assert_eq!(paginator.kind(), Some(crate::pagination::PaginatorKind::PageNumber));
    assert_eq!(paginator.page_size().unwrap(), Some(5));

    paginator.last().unwrap();
    let page = listing
        .sync()
        .unwrap()
        .expect("last page fetches")
        .await
        .unwrap();
    assert_eq!(page, vec![json!({"id": 10}), json!({"id": 11})]);
}
