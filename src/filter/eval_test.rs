//! Tests for the filter evaluator

use super::*;
use crate::model::Origin;

fn make_record(type_id: u16, name: &str, length: u64, content: &str) -> Record {
    Record {
        arrival_time: 0.0,
        origin: Origin::Server,
        type_id,
        type_name: name.to_string(),
        byte_length: length,
        content: content.to_string(),
        raw_binary: None,
        ordinal: None,
    }
}

fn inventory(length: u64) -> Record {
    make_record(
        321,
        "InventoryNotify",
        length,
        r#"{"items": [{"name": "Sword", "count": 1}, {"name": "Shield", "count": 2}]}"#,
    )
}

// ============================================================================
// Empty filters
// ============================================================================

#[test]
fn test_empty_filters_match_everything() {
    let records = [
        inventory(20),
        make_record(1, "Ping", 0, ""),
        make_record(2, "Broken", 4, "{not json"),
    ];

    for record in &records {
        assert!(matches(record, "", "", CombinePolicy::And));
        assert!(matches(record, "   ", "  ", CombinePolicy::And));
    }
}

#[test]
fn test_default_state_is_empty() {
    let state = FilterState::default();
    assert!(state.is_empty());
    assert_eq!(state.combine(), CombinePolicy::And);
}

// ============================================================================
// Name filter
// ============================================================================

#[test]
fn test_name_filter_matches_exact_id() {
    let record = make_record(5, "SomethingElse", 4, "{}");
    assert!(name_matches(&record, "5"));
    assert!(name_matches(&record, " 5 "));
    assert!(!name_matches(&record, "55"));
}

#[test]
fn test_name_filter_is_case_insensitive_substring() {
    let record = make_record(9, "PlayerLoginReq", 4, "{}");
    assert!(name_matches(&record, "login"));
    assert!(name_matches(&record, "PLAYER"));
    assert!(!name_matches(&record, "logout"));
}

// ============================================================================
// Content filter
// ============================================================================

#[test]
fn test_some_with_length_and_structured_matcher() {
    let filter = "@some;len.10;[\"Sword\"]";

    assert!(matches(&inventory(10), "", filter, CombinePolicy::And));
    assert!(matches(&inventory(64), "", filter, CombinePolicy::And));
    assert!(!matches(&inventory(9), "", filter, CombinePolicy::And));

    let no_sword = make_record(321, "InventoryNotify", 40, r#"{"items": ["Axe"]}"#);
    assert!(!matches(&no_sword, "", filter, CombinePolicy::And));
}

#[test]
fn test_fallback_list_requires_all_tokens() {
    let both = make_record(1, "X", 4, r#"{"first": "a", "nested": {"second": ["b"]}}"#);
    let only_a = make_record(1, "X", 4, r#"{"first": "a"}"#);

    assert!(content_matches(&both, "a,b"));
    assert!(!content_matches(&only_a, "a,b"));
}

#[test]
fn test_some_directive_requires_any_token() {
    let only_a = make_record(1, "X", 4, r#"["a"]"#);
    assert!(content_matches(&only_a, "@some;a,b"));
    assert!(!content_matches(&only_a, "@some;c,d"));
}

#[test]
fn test_directives_only_apply_length() {
    let short = make_record(1, "X", 3, "");
    let long = make_record(1, "X", 30, "");
    assert!(!content_matches(&short, "@len.4;"));
    assert!(content_matches(&long, "@len.4;"));
}

#[test]
fn test_numeric_token_matches_numeric_leaf() {
    let record = make_record(1, "X", 4, r#"{"uid": 10001}"#);
    assert!(content_matches(&record, "10001"));
    assert!(content_matches(&record, "[10001]"));
    assert!(!content_matches(&record, "10002"));
}

#[test]
fn test_malformed_record_content_is_no_match() {
    let broken = make_record(1, "X", 100, "{\"items\": [");
    assert!(!content_matches(&broken, "Sword"));
}

#[test]
fn test_invalid_length_directive_is_no_match() {
    assert!(!content_matches(&inventory(100), "@len.lots;Sword"));

    let state = FilterState::new("", "@len.lots;Sword", CombinePolicy::And);
    assert!(state.query_error().is_some());
    assert!(!state.matches(&inventory(100)));
}

#[test]
fn test_integral_float_leaf_matches_integer_tokens() {
    let record = make_record(9, "Hit", 8, r#"{"damage": 5.0, "range": 1e2}"#);

    assert!(matches(&record, "", "[5]", CombinePolicy::And));
    assert!(matches(&record, "", "5", CombinePolicy::And));
    assert!(matches(&record, "", "[5.0]", CombinePolicy::And));
    assert!(matches(&record, "", "[100]", CombinePolicy::And));
    assert!(matches(&record, "", "5,100", CombinePolicy::And));
    assert!(!matches(&record, "", "[6]", CombinePolicy::And));
}

// ============================================================================
// Combination
// ============================================================================

#[test]
fn test_and_requires_both() {
    let record = inventory(20);
    assert!(matches(&record, "inventory", "Sword", CombinePolicy::And));
    assert!(!matches(&record, "inventory", "Axe", CombinePolicy::And));
    assert!(!matches(&record, "ping", "Sword", CombinePolicy::And));
}

#[test]
fn test_or_requires_either() {
    let record = inventory(20);
    assert!(matches(&record, "inventory", "Axe", CombinePolicy::Or));
    assert!(matches(&record, "ping", "Sword", CombinePolicy::Or));
    assert!(!matches(&record, "ping", "Axe", CombinePolicy::Or));
}

#[test]
fn test_or_with_blank_name_always_matches() {
    // A blank name filter is a match, so OR lets every record through
    let record = inventory(20);
    assert!(matches(&record, "", "Axe", CombinePolicy::Or));
}

#[test]
fn test_combine_policy_toggle() {
    assert_eq!(CombinePolicy::And.toggled(), CombinePolicy::Or);
    assert_eq!(CombinePolicy::Or.toggled().as_str(), "and");
}

// ============================================================================
// Purity
// ============================================================================

#[test]
fn test_evaluation_is_idempotent() {
    let record = inventory(20);
    let state = FilterState::new("inv", "@some;Sword,Axe", CombinePolicy::And);

    let first = state.matches(&record);
    let second = state.matches(&record);
    assert_eq!(first, second);
    assert_eq!(
        matches(&record, "inv", "@some;Sword,Axe", CombinePolicy::And),
        first
    );
}
