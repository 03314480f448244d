//! Per-column value coercion.
//!
//! Normalization is total: every raw scalar becomes either a typed [`Value`]
//! or `None`. Columns outside the catalogue keep the runtime type their text
//! parses as (integer, float or string), which is what the type-homogeneity
//! check later inspects.

use log::debug;

use crate::{
    columns::{self, ColumnKind},
    data::{RawTable, RawValue, Table, Value, parse_naive_datetime},
};

/// `"  bObBy jACksOn  "` becomes `"Bobby Jackson"`.
pub fn normalize_name(raw: &RawValue) -> Option<String> {
    let text = raw_text(raw)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut titled = String::with_capacity(trimmed.len());
    let mut at_word_start = true;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            titled.push(ch);
            at_word_start = true;
        } else if at_word_start {
            // Only the leading char of a multi-char expansion (`ß` -> `SS`)
            // stays uppercase.
            let mut upper = ch.to_uppercase();
            titled.extend(upper.next());
            titled.extend(upper.flat_map(char::to_lowercase));
            at_word_start = false;
        } else {
            titled.extend(ch.to_lowercase());
        }
    }
    Some(titled)
}

/// Accepts only values whose numeric form has no fractional part.
pub fn normalize_int(raw: &RawValue) -> Option<i64> {
    let value = match raw {
        RawValue::Integer(i) => return Some(*i),
        other => normalize_float(other)?,
    };
    if value.fract() != 0.0 || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}

pub fn normalize_float(raw: &RawValue) -> Option<f64> {
    let value = match raw {
        RawValue::Null => return None,
        RawValue::Integer(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
    };
    value.is_finite().then_some(value)
}

pub fn normalize_string(raw: &RawValue) -> Option<String> {
    let text = match raw {
        RawValue::Null => return None,
        RawValue::Float(f) if f.is_nan() => return None,
        RawValue::Text(text) => text.clone(),
        RawValue::Integer(i) => i.to_string(),
        RawValue::Float(f) => f.to_string(),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Unparseable dates become `None` rather than an error.
pub fn normalize_datetime(raw: &RawValue) -> Option<chrono::NaiveDateTime> {
    let text = raw_text(raw)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_naive_datetime(trimmed).ok()
}

pub fn normalize_value(raw: &RawValue, kind: Option<ColumnKind>) -> Option<Value> {
    match kind {
        Some(ColumnKind::Name) => normalize_name(raw).map(Value::String),
        Some(ColumnKind::Integer) => normalize_int(raw).map(Value::Integer),
        Some(ColumnKind::Float) => normalize_float(raw).map(Value::Float),
        Some(ColumnKind::DateTime) => normalize_datetime(raw).map(Value::DateTime),
        Some(ColumnKind::Text) => normalize_string(raw).map(Value::String),
        None => passthrough(raw),
    }
}

/// Produces the normalized table; never fails on cell content.
pub fn normalize_table(raw: &RawTable) -> Table {
    let kinds = raw
        .headers
        .iter()
        .map(|name| columns::kind_of(name))
        .collect::<Vec<_>>();
    for (name, kind) in raw.headers.iter().zip(&kinds) {
        if kind.is_none() {
            debug!("Column '{name}' is not catalogued; keeping raw values");
        }
    }
    let rows = raw
        .rows
        .iter()
        .map(|row| {
            kinds
                .iter()
                .enumerate()
                .map(|(idx, kind)| {
                    let cell = row.get(idx).unwrap_or(&RawValue::Null);
                    normalize_value(cell, *kind)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    Table::assemble(raw.headers.clone(), rows)
}

fn raw_text(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Null => None,
        RawValue::Text(text) => Some(text.clone()),
        RawValue::Integer(i) => Some(i.to_string()),
        RawValue::Float(f) if f.is_nan() => None,
        RawValue::Float(f) => Some(f.to_string()),
    }
}

fn passthrough(raw: &RawValue) -> Option<Value> {
    match raw {
        RawValue::Null => None,
        RawValue::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else if let Ok(int) = trimmed.parse::<i64>() {
                Some(Value::Integer(int))
            } else if let Some(float) = trimmed.parse::<f64>().ok().filter(|f| f.is_finite()) {
                Some(Value::Float(float))
            } else {
                Some(Value::String(text.clone()))
            }
        }
        RawValue::Integer(i) => Some(Value::Integer(*i)),
        RawValue::Float(f) if f.is_nan() => None,
        RawValue::Float(f) => Some(Value::Float(*f)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> RawValue {
        RawValue::Text(value.to_string())
    }

    #[test]
    fn normalize_name_title_cases_tokens() {
        assert_eq!(
            normalize_name(&text("  bObBy jACksOn  ")).as_deref(),
            Some("Bobby Jackson")
        );
        assert_eq!(normalize_name(&text("   ")), None);
        assert_eq!(normalize_name(&RawValue::Null), None);
    }

    #[test]
    fn normalize_name_keeps_one_capital_for_expanding_letters() {
        let once = normalize_name(&text("ßa müller"));
        assert_eq!(once.as_deref(), Some("Ssa Müller"));
        assert_eq!(once.clone().and_then(|n| normalize_name(&RawValue::Text(n))), once);
        assert_eq!(normalize_name(&text("ﬁsh")).as_deref(), Some("Fish"));
    }

    #[test]
    fn normalize_int_rejects_fractions() {
        assert_eq!(normalize_int(&text("42")), Some(42));
        assert_eq!(normalize_int(&text(" 42.0 ")), Some(42));
        assert_eq!(normalize_int(&text("42.8")), None);
        assert_eq!(normalize_int(&text("forty")), None);
        assert_eq!(normalize_int(&RawValue::Float(7.0)), Some(7));
    }

    #[test]
    fn normalize_float_is_best_effort() {
        assert_eq!(normalize_float(&text("abc")), None);
        assert_eq!(normalize_float(&RawValue::Integer(42)), Some(42.0));
        assert_eq!(normalize_float(&text("18856.28")), Some(18856.28));
        assert_eq!(normalize_float(&RawValue::Float(f64::NAN)), None);
    }

    #[test]
    fn normalize_string_trims_and_drops_empty() {
        assert_eq!(normalize_string(&text("  Aspirin ")).as_deref(), Some("Aspirin"));
        assert_eq!(normalize_string(&text("")), None);
        assert_eq!(normalize_string(&RawValue::Integer(3)).as_deref(), Some("3"));
    }

    #[test]
    fn normalize_datetime_maps_garbage_to_none() {
        assert!(normalize_datetime(&text("2024-01-31")).is_some());
        assert_eq!(normalize_datetime(&text("not a date")), None);
    }

    #[test]
    fn uncatalogued_columns_keep_raw_types() {
        let raw = RawTable::new(
            vec!["Extra".to_string(), "Age".to_string()],
            vec![
                vec![RawValue::Integer(1), text("30")],
                vec![text("one"), text("30.5")],
            ],
        );
        let table = normalize_table(&raw);
        assert!(!table.profiles()[0].is_homogeneous());
        assert_eq!(table.rows()[0][1], Some(Value::Integer(30)));
        assert_eq!(table.rows()[1][1], None);
    }
}
