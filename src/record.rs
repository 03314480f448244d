//! Statically typed view of one normalized hospitalization row.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::{
    columns,
    data::{Value, ValueKind},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("column '{column}' is absent from the row")]
    MissingColumn { column: String },
    #[error("column '{column}' holds a {found} value where {expected} was expected")]
    TypeMismatch {
        column: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct HospitalizationRecord {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub medical_condition: Option<String>,
    pub date_of_admission: Option<NaiveDateTime>,
    pub doctor: Option<String>,
    pub hospital: Option<String>,
    pub insurance_provider: Option<String>,
    pub billing_amount: Option<f64>,
    pub room_number: Option<i64>,
    pub admission_type: Option<String>,
    pub discharge_date: Option<NaiveDateTime>,
    pub medication: Option<String>,
    pub test_results: Option<String>,
}

impl HospitalizationRecord {
    /// Reads the record from a normalized row. A column missing from
    /// `headers` (or a row shorter than its headers) fails the whole row; a
    /// null cell does not.
    pub fn from_row(headers: &[String], row: &[Option<Value>]) -> Result<Self, MappingError> {
        let fields = RowFields { headers, row };
        Ok(Self {
            name: fields.text(columns::NAME)?,
            age: fields.integer(columns::AGE)?,
            gender: fields.text(columns::GENDER)?,
            blood_type: fields.text(columns::BLOOD_TYPE)?,
            medical_condition: fields.text(columns::MEDICAL_CONDITION)?,
            date_of_admission: fields.datetime(columns::DATE_OF_ADMISSION)?,
            doctor: fields.text(columns::DOCTOR)?,
            hospital: fields.text(columns::HOSPITAL)?,
            insurance_provider: fields.text(columns::INSURANCE_PROVIDER)?,
            billing_amount: fields.float(columns::BILLING_AMOUNT)?,
            room_number: fields.integer(columns::ROOM_NUMBER)?,
            admission_type: fields.text(columns::ADMISSION_TYPE)?,
            discharge_date: fields.datetime(columns::DISCHARGE_DATE)?,
            medication: fields.text(columns::MEDICATION)?,
            test_results: fields.text(columns::TEST_RESULTS)?,
        })
    }
}

struct RowFields<'a> {
    headers: &'a [String],
    row: &'a [Option<Value>],
}

impl<'a> RowFields<'a> {
    fn cell(&self, column: &str) -> Result<Option<&'a Value>, MappingError> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.row.get(idx))
            .map(Option::as_ref)
            .ok_or_else(|| MappingError::MissingColumn {
                column: column.to_string(),
            })
    }

    fn mismatch(column: &str, expected: ValueKind, found: &Value) -> MappingError {
        MappingError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: found.kind(),
        }
    }

    fn text(&self, column: &str) -> Result<Option<String>, MappingError> {
        match self.cell(column)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(Self::mismatch(column, ValueKind::String, other)),
        }
    }

    fn integer(&self, column: &str) -> Result<Option<i64>, MappingError> {
        match self.cell(column)? {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(Self::mismatch(column, ValueKind::Integer, other)),
        }
    }

    fn float(&self, column: &str) -> Result<Option<f64>, MappingError> {
        match self.cell(column)? {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(*f)),
            Some(Value::Integer(i)) => Ok(Some(*i as f64)),
            Some(other) => Err(Self::mismatch(column, ValueKind::Float, other)),
        }
    }

    fn datetime(&self, column: &str) -> Result<Option<NaiveDateTime>, MappingError> {
        match self.cell(column)? {
            None => Ok(None),
            Some(Value::DateTime(dt)) => Ok(Some(*dt)),
            Some(other) => Err(Self::mismatch(column, ValueKind::DateTime, other)),
        }
    }
}
