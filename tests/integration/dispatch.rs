//! Dispatch protocol integration tests
//!
//! Exercises the operation protocol end-to-end through `Value`, the way an
//! interpreter would drive it.

use indexmap::IndexMap;
use kestrel::runtime::error::RuntimeError;
use kestrel::runtime::value::{format_float, Value};

#[test]
fn float_formatting_round_trips_whole_numbers() {
    assert_eq!(format_float(3.0), "3.0");
    assert_eq!(format_float(2.5), "2.5");
    assert_eq!(Value::float(3.0).to_string(), "3.0");
}

#[test]
fn list_slicing_matches_reference_semantics() {
    let list = Value::list((0..5).map(Value::int).collect());

    let sliced = list
        .slice(&Value::int(1), &Value::int(4), &Value::int(1))
        .unwrap();
    assert_eq!(sliced.to_string(), "[1, 2, 3]");

    let reversed = list
        .slice(&Value::None, &Value::None, &Value::int(-1))
        .unwrap();
    assert_eq!(reversed.to_string(), "[4, 3, 2, 1, 0]");
}

#[test]
fn dictionary_membership_and_missing_keys() {
    let mut entries = IndexMap::new();
    entries.insert("a".to_string(), Value::int(1));
    let dict = Value::dict(entries);

    assert!(dict.contains(&Value::string("a")).unwrap());
    assert!(matches!(
        dict.get_item(&Value::string("b")).unwrap_err(),
        RuntimeError::Key(_)
    ));
}

#[test]
fn singleton_identity_is_observable() {
    assert!(Value::bool_of(true).equals(&kestrel::runtime::value::TRUE));
    assert!(Value::None.equals(&kestrel::runtime::value::NONE));
}

#[test]
fn zero_division_raises_for_every_numeric_kind() {
    assert!(matches!(
        Value::int(5).divide(&Value::int(0)).unwrap_err(),
        RuntimeError::ZeroDivision(_)
    ));
    assert!(matches!(
        Value::float(5.0).divide(&Value::float(0.0)).unwrap_err(),
        RuntimeError::ZeroDivision(_)
    ));
    assert!(matches!(
        Value::float(5.0).modulo(&Value::int(0)).unwrap_err(),
        RuntimeError::ZeroDivision(_)
    ));
}

#[test]
fn mixed_arithmetic_follows_promotion_rules() {
    // int + float -> float
    let sum = Value::int(1).add(&Value::float(0.5)).unwrap();
    assert_eq!(sum.to_string(), "1.5");

    // exact int division stays int, inexact promotes
    assert_eq!(Value::int(9).divide(&Value::int(3)).unwrap().to_string(), "3");
    assert_eq!(
        Value::int(9).divide(&Value::int(2)).unwrap().to_string(),
        "4.5"
    );
}

#[test]
fn string_operations_compose() {
    let greeting = Value::string("hi ")
        .multiply(&Value::int(2))
        .unwrap()
        .add(&Value::int(5))
        .unwrap();
    assert_eq!(greeting.to_string(), "hi hi 5");

    assert!(Value::string("hi hi 5")
        .contains(&Value::string("hi 5"))
        .unwrap());
}

#[test]
fn unsupported_operations_name_both_types() {
    let err = Value::list(vec![]).multiply(&Value::int(2)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("list"));
    assert!(message.starts_with("TypeError"));
}

#[test]
fn exceptions_surface_their_taxonomy_to_scripts() {
    let error = Value::int(1).divide(&Value::int(0)).unwrap_err();
    let exception = Value::exception(error, None);
    assert_eq!(
        exception.get_member("type").unwrap().to_string(),
        "ZeroDivisionError"
    );
    assert_eq!(
        exception.get_member("message").unwrap().to_string(),
        "Division by zero"
    );
    assert!(matches!(
        exception.get_member("cause").unwrap(),
        Value::None
    ));
}
