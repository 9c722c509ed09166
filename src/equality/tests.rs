//! Tests for equality policies

use super::*;
use serde_json::json;
use std::sync::Arc;
use test_case::test_case;

// ============================================================================
// Trigger Tests
// ============================================================================

#[test_case("MANUAL", Trigger::Manual ; "manual")]
#[test_case("shallow", Trigger::Shallow ; "lowercase shallow")]
#[test_case(" Deep ", Trigger::Deep ; "padded deep")]
fn test_trigger_from_str(input: &str, expected: Trigger) {
    assert_eq!(input.parse::<Trigger>().unwrap(), expected);
}

#[test]
fn test_trigger_from_str_lists_valid_names() {
    let err = "ONCE".parse::<Trigger>().unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("MANUAL, SHALLOW, DEEP"));
}

#[test]
fn test_trigger_default_is_manual() {
    assert_eq!(Trigger::default(), Trigger::Manual);
    assert!(Trigger::Manual.is_manual());
    assert!(!Trigger::Deep.is_manual());
}

#[test]
fn test_trigger_serde_names() {
    assert_eq!(serde_json::to_value(Trigger::Shallow).unwrap(), json!("SHALLOW"));
    let trigger: Trigger = serde_json::from_value(json!("DEEP")).unwrap();
    assert_eq!(trigger, Trigger::Deep);
    assert!(serde_json::from_value::<Trigger>(json!("deep")).is_err());
}

// ============================================================================
// Comparator Tests
// ============================================================================

#[test]
fn test_manual_comparator_always_equal() {
    let cmp = Trigger::Manual.comparator::<(i32, String)>();
    assert!(cmp(&(1, "a".into()), &(2, "b".into())));
}

#[test]
fn test_shallow_comparator_primitives() {
    let cmp = Trigger::Shallow.comparator::<(i32, String)>();
    assert!(cmp(&(1, "a".into()), &(1, "a".into())));
    assert!(!cmp(&(1, "a".into()), &(1, "b".into())));
}

#[test]
fn test_shallow_comparator_arc_identity() {
    let shared = Arc::new(vec![1, 2, 3]);
    let cmp = Trigger::Shallow.comparator::<(Arc<Vec<i32>>,)>();
    assert!(cmp(&(Arc::clone(&shared),), &(Arc::clone(&shared),)));
    // Same contents, fresh allocation
    assert!(!cmp(&(shared,), &(Arc::new(vec![1, 2, 3]),)));
}

#[test]
fn test_deep_comparator_structural() {
    let cmp = Trigger::Deep.comparator::<(Arc<Vec<i32>>,)>();
    assert!(cmp(&(Arc::new(vec![1, 2, 3]),), &(Arc::new(vec![1, 2, 3]),)));
    assert!(!cmp(&(Arc::new(vec![1]),), &(Arc::new(vec![2]),)));
}

// ============================================================================
// ShallowEq Tests
// ============================================================================

#[test]
fn test_json_scalars_compare_by_value() {
    assert!(is_equal(&json!(1), &json!(1)));
    assert!(is_equal(&json!("a"), &json!("a")));
    assert!(is_equal(&json!(null), &json!(null)));
    assert!(!is_equal(&json!(true), &json!(1)));
}

#[test]
fn test_json_composites_compare_by_identity() {
    let object = json!({"a": 1});
    assert!(is_equal(&object, &object));
    assert!(!is_equal(&object, &json!({"a": 1})));
    assert!(is_deep_equal(&object, &json!({"a": 1})));
}

#[test]
fn test_vec_compares_as_argument_list() {
    let args = vec![json!(1), json!("x")];
    assert!(is_equal(&args, &vec![json!(1), json!("x")]));
    assert!(!is_equal(&args, &vec![json!(1)]));
    assert!(!is_equal(&vec![json!([1])], &vec![json!([1])]));
}

#[test]
fn test_option_shallow_eq() {
    assert!(is_equal(&Some(1), &Some(1)));
    assert!(is_equal(&None::<i32>, &None));
    assert!(!is_equal(&Some(1), &None));
}
