//! Tests for structured values and flattening

use super::*;

fn text(s: &str) -> Scalar {
    Scalar::Text(s.to_string())
}

#[test]
fn test_flatten_scalar() {
    let value = Value::parse("\"Sword\"").unwrap();
    assert_eq!(value.flatten(), vec![&text("Sword")]);
}

#[test]
fn test_flatten_discards_keys_and_nesting() {
    let value = Value::parse(
        r#"{"item": {"name": "Sword", "tags": ["rare", {"deep": [true, null]}]}, "count": 3}"#,
    )
    .unwrap();

    let leaves: Vec<String> = value.flatten().into_iter().map(Scalar::canonical).collect();
    assert_eq!(leaves.len(), 5);
    for expected in ["Sword", "rare", "true", "null", "3"] {
        assert!(leaves.contains(&expected.to_string()), "missing {expected}");
    }

    // Keys are not leaves
    assert!(!leaves.contains(&"name".to_string()));
    assert!(!leaves.contains(&"item".to_string()));
}

#[test]
fn test_empty_containers_have_no_leaves() {
    assert!(Value::parse("[]").unwrap().flatten().is_empty());
    assert!(Value::parse("{}").unwrap().flatten().is_empty());
    assert!(Value::parse("[[], {}]").unwrap().leaf_set().is_empty());
}

#[test]
fn test_leaf_set_membership_uses_canonical_text() {
    let leaves = Value::parse(r#"{"id": 5, "flag": false, "name": "5"}"#)
        .unwrap()
        .leaf_set();

    assert_eq!(leaves.len(), 2);
    assert!(leaves.contains(&text("5")));
    assert!(leaves.contains(&Scalar::Bool(false)));
    assert!(leaves.contains(&text("false")));
    assert!(!leaves.contains(&text("Sword")));
}

#[test]
fn test_parse_rejects_malformed_json() {
    assert!(Value::parse("{\"a\": ").is_err());
    assert!(Value::parse("Sword").is_err());
    assert!(Value::parse("").is_err());
}

#[test]
fn test_numbers_compare_by_value() {
    let leaves = Value::parse(r#"{"damage": 5.0, "range": 1e2, "ratio": 0.5}"#)
        .unwrap()
        .leaf_set();

    let five = Value::parse("5").unwrap();
    let Value::Scalar(five) = five else {
        panic!("expected a scalar");
    };
    assert!(leaves.contains(&five));
    assert!(leaves.contains(&text("5")));
    assert!(leaves.contains(&text("5.0")));
    assert!(leaves.contains(&text("100")));
    assert!(leaves.contains(&text("0.5")));
    assert!(!leaves.contains(&text("6")));
    assert!(!leaves.contains(&text("0.25")));
}

#[test]
fn test_text_leaves_stay_verbatim() {
    let leaves = Value::parse(r#"["5.0"]"#).unwrap().leaf_set();

    assert!(leaves.contains(&text("5.0")));
    assert!(!leaves.contains(&text("5")));
}
