mod common;

use hospital_import::{
    columns,
    data::{RawValue, Value, ValueKind},
    normalize::{normalize_float, normalize_int, normalize_name, normalize_string},
};
use proptest::prelude::*;

fn text(value: &str) -> RawValue {
    RawValue::Text(value.to_string())
}

#[test]
fn floats_drop_non_finite_values() {
    assert_eq!(normalize_float(&text(" 18856.28 ")), Some(18856.28));
    assert_eq!(normalize_float(&text("NaN")), None);
    assert_eq!(normalize_float(&text("inf")), None);
    assert_eq!(normalize_float(&text("n/a")), None);
}

#[test]
fn fixture_columns_are_homogeneous_after_normalization() {
    let table = common::normalized_fixture(common::SAMPLE_FIXTURE);
    assert_eq!(table.len(), 9);
    for profile in table.profiles() {
        assert!(profile.is_homogeneous(), "{}", profile.summary());
    }
    let age = table.column_index(columns::AGE).unwrap();
    assert_eq!(table.rows()[6][age], Some(Value::Integer(30)));
    let admitted = table.column_index(columns::DATE_OF_ADMISSION).unwrap();
    assert_eq!(
        table.rows()[0][admitted].as_ref().map(Value::kind),
        Some(ValueKind::DateTime)
    );
    let name = table.column_index(columns::NAME).unwrap();
    assert_eq!(
        table.rows()[6][name],
        Some(Value::String("Bobby Jackson".to_string()))
    );
}

proptest! {
    #[test]
    fn name_normalization_is_idempotent(raw in "\\PC{0,40}") {
        let once = normalize_name(&RawValue::Text(raw));
        let twice = once.clone().and_then(|name| normalize_name(&RawValue::Text(name)));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn integer_normalization_is_idempotent(raw in "-?[0-9]{1,12}(\\.[05])?") {
        let once = normalize_int(&RawValue::Text(raw));
        let twice = once.and_then(|value| normalize_int(&RawValue::Integer(value)));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn string_normalization_is_idempotent(raw in "\\PC{0,30}") {
        let once = normalize_string(&RawValue::Text(raw));
        let twice = once.clone().and_then(|value| normalize_string(&RawValue::Text(value)));
        prop_assert_eq!(once, twice);
    }
}
