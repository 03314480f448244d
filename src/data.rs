//! Raw and normalized table model.
//!
//! A [`RawTable`] holds what the source provider read: untyped scalars keyed
//! by column position. A [`Table`] holds normalized cells (`Option<Value>`)
//! and carries a per-column [`ColumnProfile`] recording which value kinds were
//! observed, so type homogeneity is a property of the table itself rather than
//! a separate inspection pass.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
    hash::{Hash, Hasher},
};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// An untyped scalar as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Runtime kind of a normalized value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    DateTime,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueKind::String => "str",
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::DateTime => "datetime",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Integer(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Float,
            Value::DateTime(_) => ValueKind::DateTime,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
        }
    }
}

// Floats compare by total order so that `Eq` and `Hash` agree for grouping.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Value::String(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::DateTime(dt) => dt.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (left, right) => left.kind().cmp(&right.kind()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Orders cells with nulls after every present value.
pub fn compare_cells(left: &Option<Value>, right: &Option<Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

pub fn display_cell(cell: &Option<Value>) -> String {
    cell.as_ref().map(Value::as_display).unwrap_or_default()
}

/// Observed value kinds and null count for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kinds: BTreeMap<ValueKind, usize>,
    pub nulls: usize,
}

impl ColumnProfile {
    pub fn is_homogeneous(&self) -> bool {
        self.kinds.len() == 1
    }

    pub fn summary(&self) -> String {
        let mut parts = self
            .kinds
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect::<Vec<_>>();
        if self.nulls > 0 {
            parts.push(format!("null: {}", self.nulls));
        }
        parts.join(", ")
    }
}

/// Normalized table: one `Option<Value>` per cell.
#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Option<Value>>>,
    profiles: Vec<ColumnProfile>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(anyhow!(
                "Row {} has {} cell(s) but the table declares {} column(s)",
                idx + 1,
                row.len(),
                headers.len()
            ));
        }
        Ok(Self::assemble(headers, rows))
    }

    /// Builds a table whose rows are known to match the header width.
    pub(crate) fn assemble(headers: Vec<String>, rows: Vec<Vec<Option<Value>>>) -> Self {
        let profiles = build_profiles(&headers, &rows);
        Self {
            headers,
            rows,
            profiles,
        }
    }

    /// Keeps the rows at `indices` (in the given order).
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let rows = indices
            .iter()
            .map(|&idx| self.rows[idx].clone())
            .collect::<Vec<_>>();
        Self::assemble(self.headers.clone(), rows)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<Value>>] {
        &self.rows
    }

    pub fn profiles(&self) -> &[ColumnProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn build_profiles(headers: &[String], rows: &[Vec<Option<Value>>]) -> Vec<ColumnProfile> {
    let mut profiles = headers
        .iter()
        .map(|name| ColumnProfile {
            name: name.clone(),
            ..ColumnProfile::default()
        })
        .collect::<Vec<_>>();
    for row in rows {
        for (profile, cell) in profiles.iter_mut().zip(row) {
            match cell {
                Some(value) => *profile.kinds.entry(value.kind()).or_insert(0) += 1,
                None => profile.nulls += 1,
            }
        }
    }
    profiles
}

pub fn parse_naive_date(value: &str) -> Result<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(anyhow!("Failed to parse '{value}' as date"))
}

pub fn parse_naive_datetime(value: &str) -> Result<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    parse_naive_date(value)
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| anyhow!("Failed to parse '{value}' as datetime"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_naive_datetime_accepts_plain_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(parse_naive_datetime("2024-01-31").unwrap(), expected);
        assert_eq!(parse_naive_datetime("01/31/2024").unwrap(), expected);
        assert!(parse_naive_datetime("31st of January").is_err());
    }

    #[test]
    fn float_values_hash_and_compare_consistently() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(Value::Float(1.5));
        set.insert(Value::Float(1.5));
        set.insert(Value::Integer(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn compare_cells_sorts_nulls_last() {
        let mut cells = vec![None, Some(Value::Integer(2)), Some(Value::Integer(1))];
        cells.sort_by(compare_cells);
        assert_eq!(
            cells,
            vec![Some(Value::Integer(1)), Some(Value::Integer(2)), None]
        );
    }

    #[test]
    fn table_profiles_count_kinds_and_nulls() {
        let table = Table::new(
            vec!["mixed".to_string()],
            vec![
                vec![Some(Value::Integer(1))],
                vec![Some(Value::String("x".to_string()))],
                vec![None],
            ],
        )
        .unwrap();
        let profile = &table.profiles()[0];
        assert!(!profile.is_homogeneous());
        assert_eq!(profile.nulls, 1);
        assert_eq!(profile.summary(), "str: 1, int: 1, null: 1");
    }

    #[test]
    fn table_rejects_ragged_rows() {
        let err = Table::new(vec!["a".to_string(), "b".to_string()], vec![vec![None]])
            .unwrap_err();
        assert!(err.to_string().contains("Row 1"));
    }
}
