//! Tests for the async action runner

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Action echoing its arguments, recording every invocation
fn recording_action<A>() -> (Action<A, A>, Arc<Mutex<Vec<A>>>)
where
    A: Clone + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);
    let action = Action::new(move |args: A| {
        recorded.lock().unwrap().push(args.clone());
        async move { Ok(args) }
    });
    (action, calls)
}

/// Action whose call `n` resolves when the matching sender fires
fn gated_action(
    count: u32,
) -> (Action<u32, u32>, HashMap<u32, oneshot::Sender<Result<u32>>>) {
    let mut senders = HashMap::new();
    let mut receivers = HashMap::new();
    for n in 1..=count {
        let (tx, rx) = oneshot::channel();
        senders.insert(n, tx);
        receivers.insert(n, rx);
    }
    let gates = Arc::new(Mutex::new(receivers));
    let action = Action::new(move |n: u32| {
        let gate = gates.lock().unwrap().remove(&n);
        async move {
            match gate {
                Some(rx) => rx.await.unwrap_or(Err(Error::Cancelled)),
                None => Err(Error::Other(format!("no gate for call {n}"))),
            }
        }
    });
    (action, senders)
}

// ============================================================================
// Manual Trigger Tests
// ============================================================================

#[tokio::test]
async fn test_manual_runner_waits_for_run() {
    let (action, calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action, RunnerOptions::new((1,))).unwrap();

    assert!(runner.state().is_idle());
    assert!(calls.lock().unwrap().is_empty());

    let value = runner.run().await.unwrap();
    assert_eq!(value, (1,));
    let state = runner.state();
    assert!(!state.is_loading);
    assert_eq!(state.result, Some((1,)));
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_run_with_overrides_args() {
    let (action, calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action, RunnerOptions::new((1,))).unwrap();

    assert_eq!(runner.run_with((7,)).await.unwrap(), (7,));
    assert_eq!(*calls.lock().unwrap(), vec![(7,)]);
}

#[tokio::test]
async fn test_manual_update_never_fires() {
    let (action, calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action.clone(), RunnerOptions::new((1,))).unwrap();

    assert!(runner.update(action.clone(), RunnerOptions::new((2,))).unwrap().is_none());
    let (other, _) = recording_action::<(i32,)>();
    assert!(runner.update(other, RunnerOptions::new((3,))).unwrap().is_none());
    assert!(calls.lock().unwrap().is_empty());

    // run() picks up the latest args
    runner.run().await.unwrap();
    assert_eq!(runner.state().result, Some((3,)));
}

// ============================================================================
// Automatic Trigger Tests
// ============================================================================

#[tokio::test]
async fn test_shallow_trigger_fires_once_per_change() {
    let (action, calls) = recording_action::<(i32, String)>();
    let options =
        |args: (i32, String)| RunnerOptions::new(args).with_trigger(Trigger::Shallow);

    let runner = AsyncRunner::new(action.clone(), options((1, "a".into()))).unwrap();
    assert!(runner.state().is_loading);
    runner.settled().await;

    let fired = runner
        .update(action.clone(), options((1, "a".into())))
        .unwrap();
    assert!(fired.is_none());
    assert_eq!(calls.lock().unwrap().len(), 1);

    let handle = runner
        .update(action.clone(), options((2, "a".into())))
        .unwrap()
        .expect("changed args fire a call");
    assert_eq!(handle.await.unwrap(), (2, "a".to_string()));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![(1, "a".to_string()), (2, "a".to_string())]
    );
}

#[tokio::test]
async fn test_shallow_trigger_sees_fresh_arcs_as_changed() {
    let (action, calls) = recording_action::<(Arc<Vec<i32>>,)>();
    let options = |args| RunnerOptions::new(args).with_trigger(Trigger::Shallow);

    let shared = Arc::new(vec![1]);
    let runner = AsyncRunner::new(action.clone(), options((Arc::clone(&shared),))).unwrap();
    runner.settled().await;

    assert!(runner
        .update(action.clone(), options((Arc::clone(&shared),)))
        .unwrap()
        .is_none());
    runner
        .update(action.clone(), options((Arc::new(vec![1]),)))
        .unwrap()
        .expect("new allocation fires")
        .await
        .unwrap();
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_deep_trigger_tolerates_fresh_values() {
    let (action, calls) = recording_action::<(Arc<Vec<i32>>,)>();
    let options = |args| RunnerOptions::new(args).with_trigger(Trigger::Deep);

    let runner = AsyncRunner::new(action.clone(), options((Arc::new(vec![1]),))).unwrap();
    runner.settled().await;

    assert!(runner
        .update(action.clone(), options((Arc::new(vec![1]),)))
        .unwrap()
        .is_none());
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_action_identity_change_fires() {
    let (first, first_calls) = recording_action::<(i32,)>();
    let (second, second_calls) = recording_action::<(i32,)>();
    let options = || RunnerOptions::new((1,)).with_trigger(Trigger::Deep);

    let runner = AsyncRunner::new(first, options()).unwrap();
    runner.settled().await;

    runner
        .update(second, options())
        .unwrap()
        .expect("new action fires")
        .await
        .unwrap();
    assert_eq!(first_calls.lock().unwrap().len(), 1);
    assert_eq!(second_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_switching_trigger_away_from_manual_fires() {
    let (action, calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action.clone(), RunnerOptions::new((1,))).unwrap();

    let handle = runner
        .update(
            action.clone(),
            RunnerOptions::new((1,)).with_trigger(Trigger::Deep),
        )
        .unwrap()
        .expect("leaving MANUAL fires even with equal args");
    handle.await.unwrap();
    assert_eq!(calls.lock().unwrap().len(), 1);

    // Back to MANUAL: nothing fires
    assert!(runner
        .update(action.clone(), RunnerOptions::new((5,)))
        .unwrap()
        .is_none());
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert_eq!(runner.trigger(), Trigger::Manual);
}

// ============================================================================
// Stale Call Tests
// ============================================================================

#[tokio::test]
async fn test_superseded_call_never_fires_callbacks() {
    let (action, mut gates) = gated_action(2);
    let successes = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&successes);
    let runner = AsyncRunner::new(
        action,
        RunnerOptions::new(0).on_success(move |v: &u32| seen.lock().unwrap().push(*v)),
    )
    .unwrap();

    let first = runner.run_with(1);
    let second = runner.run_with(2);

    gates.remove(&2).unwrap().send(Ok(20)).unwrap();
    assert_eq!(second.await.unwrap(), 20);

    gates.remove(&1).unwrap().send(Ok(10)).unwrap();
    // The stale call still resolves its own handle
    assert_eq!(first.await.unwrap(), 10);

    assert_eq!(*successes.lock().unwrap(), vec![20]);
    assert_eq!(runner.state().result, Some(20));
}

#[tokio::test]
async fn test_stale_failure_is_dropped() {
    let (action, mut gates) = gated_action(2);
    let errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    let runner = AsyncRunner::new(
        action,
        RunnerOptions::new(0).on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    let first = runner.run_with(1);
    let second = runner.run_with(2);

    gates
        .remove(&1)
        .unwrap()
        .send(Err(Error::Other("boom".into())))
        .unwrap();
    assert!(first.await.is_err());
    assert!(runner.state().is_loading);
    assert!(runner.state().error.is_none());

    gates.remove(&2).unwrap().send(Ok(2)).unwrap();
    second.await.unwrap();
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(runner.state().result, Some(2));
}

#[tokio::test]
async fn test_reset_wins_over_in_flight_call() {
    let (action, mut gates) = gated_action(1);
    let successes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&successes);
    let runner = AsyncRunner::new(
        action,
        RunnerOptions::new(0).on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();

    let handle = runner.run_with(1);
    assert!(runner.state().is_loading);
    runner.reset();
    assert!(runner.state().is_idle());

    gates.remove(&1).unwrap().send(Ok(1)).unwrap();
    assert_eq!(handle.await.unwrap(), 1);
    assert!(runner.state().is_idle());
    assert_eq!(successes.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Outcome Tests
// ============================================================================

#[tokio::test]
async fn test_failure_is_captured_not_rethrown() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&errors);
    let action = Action::new(|fail: bool| async move {
        if fail {
            Err(Error::http_status(500, "Server error"))
        } else {
            Ok("ok".to_string())
        }
    });
    let runner = AsyncRunner::new(
        action,
        RunnerOptions::new(true).on_error(move |e: &Arc<Error>| {
            seen.lock().unwrap().push(e.to_string());
        }),
    )
    .unwrap();

    let err = runner.run().await.unwrap_err();
    assert_eq!(
        err.action_error().map(ToString::to_string),
        Some("HTTP 500: Server error".to_string())
    );

    let state = runner.state();
    assert!(state.result.is_none());
    assert_eq!(state.error.map(|e| e.to_string()).as_deref(), Some("HTTP 500: Server error"));
    assert_eq!(*errors.lock().unwrap(), vec!["HTTP 500: Server error".to_string()]);

    // A later success clears the error
    runner.run_with(false).await.unwrap();
    let state = runner.state();
    assert_eq!(state.result.as_deref(), Some("ok"));
    assert!(state.error.is_none());
}

async fn parse_number(args: (String,)) -> Result<i64> {
    let value = args
        .0
        .parse::<i64>()
        .map_err(|e| anyhow::anyhow!("not a number: {e}"))?;
    Ok(value)
}

#[tokio::test]
async fn test_any_error_type_converts() {
    let runner = AsyncRunner::new(
        Action::new(parse_number),
        RunnerOptions::new(("42".to_string(),)),
    )
    .unwrap();
    assert_eq!(runner.run().await.unwrap(), 42);

    let err = runner.run_with(("x".to_string(),)).await.unwrap_err();
    assert!(matches!(err.action_error(), Some(Error::Anyhow(_))));
    let state = runner.state();
    assert!(state.result.is_none());
    assert!(state
        .error
        .is_some_and(|e| e.to_string().starts_with("not a number")));
}

#[tokio::test]
async fn test_previous_result_stays_visible_while_loading() {
    let (action, mut gates) = gated_action(2);
    let runner = AsyncRunner::new(action, RunnerOptions::new(0)).unwrap();

    let first = runner.run_with(1);
    gates.remove(&1).unwrap().send(Ok(1)).unwrap();
    first.await.unwrap();

    let second = runner.run_with(2);
    let loading = runner.state();
    assert!(loading.is_loading);
    assert_eq!(loading.result, Some(1));

    gates.remove(&2).unwrap().send(Ok(2)).unwrap();
    second.await.unwrap();
    assert_eq!(runner.settled().await.result, Some(2));
}

#[tokio::test]
async fn test_success_callback_is_read_at_call_time() {
    let (action, _calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action.clone(), RunnerOptions::new((1,))).unwrap();

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    runner
        .update(
            action,
            RunnerOptions::new((1,)).on_success(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    runner.run().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Disposal Tests
// ============================================================================

#[tokio::test]
async fn test_run_after_dispose_is_rejected() {
    let (action, calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action, RunnerOptions::new((1,))).unwrap();
    runner.dispose();

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, Error::Disposed));
    assert!(calls.lock().unwrap().is_empty());
    assert!(runner.state().is_idle());
}

#[tokio::test]
async fn test_dispose_drops_in_flight_outcome() {
    let (action, mut gates) = gated_action(1);
    let runner = AsyncRunner::new(action, RunnerOptions::new(0)).unwrap();
    let mut rx = runner.subscribe();

    let handle = runner.run_with(1);
    runner.dispose();
    gates.remove(&1).unwrap().send(Ok(1)).unwrap();
    handle.await.unwrap();

    assert!(rx.borrow_and_update().result.is_none());
}

#[tokio::test]
async fn test_dropped_runner_still_resolves_handle() {
    let (action, mut gates) = gated_action(1);
    let runner = AsyncRunner::new(action, RunnerOptions::new(0)).unwrap();
    let handle = runner.run_with(1);
    drop(runner);

    gates.remove(&1).unwrap().send(Ok(5)).unwrap();
    assert_eq!(handle.await.unwrap(), 5);
}

// ============================================================================
// Configuration Error Tests
// ============================================================================

#[test]
fn test_triggered_runner_requires_runtime() {
    let (action, _calls) = recording_action::<(i32,)>();
    let err = AsyncRunner::new(action, RunnerOptions::new((1,)).with_trigger(Trigger::Deep))
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_run_outside_runtime_rejects() {
    let (action, _calls) = recording_action::<(i32,)>();
    let runner = AsyncRunner::new(action, RunnerOptions::new((1,))).unwrap();
    let err = futures::executor::block_on(runner.run()).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_options_from_config() {
    let config = crate::config::RunnerConfig::from_yaml_str("trigger: SHALLOW\nargs: [1, \"a\"]\n")
        .unwrap();
    let options: RunnerOptions<_, ()> = RunnerOptions::from_config(config);
    assert_eq!(options.trigger, Trigger::Shallow);
    assert_eq!(options.args, vec![serde_json::json!(1), serde_json::json!("a")]);
}
