//! Column catalogue of the hospitalization dataset.
//!
//! Every expected column carries the [`ColumnKind`] its values are coerced to
//! during normalization.

pub const NAME: &str = "Name";
pub const AGE: &str = "Age";
pub const GENDER: &str = "Gender";
pub const BLOOD_TYPE: &str = "Blood Type";
pub const MEDICAL_CONDITION: &str = "Medical Condition";
pub const DATE_OF_ADMISSION: &str = "Date of Admission";
pub const DOCTOR: &str = "Doctor";
pub const HOSPITAL: &str = "Hospital";
pub const INSURANCE_PROVIDER: &str = "Insurance Provider";
pub const BILLING_AMOUNT: &str = "Billing Amount";
pub const ROOM_NUMBER: &str = "Room Number";
pub const ADMISSION_TYPE: &str = "Admission Type";
pub const DISCHARGE_DATE: &str = "Discharge Date";
pub const MEDICATION: &str = "Medication";
pub const TEST_RESULTS: &str = "Test Results";

/// Target type of a column after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Trimmed and title-cased person name.
    Name,
    Integer,
    Float,
    DateTime,
    Text,
}

pub const EXPECTED_COLUMNS: [(&str, ColumnKind); 15] = [
    (NAME, ColumnKind::Name),
    (AGE, ColumnKind::Integer),
    (GENDER, ColumnKind::Text),
    (BLOOD_TYPE, ColumnKind::Text),
    (MEDICAL_CONDITION, ColumnKind::Text),
    (DATE_OF_ADMISSION, ColumnKind::DateTime),
    (DOCTOR, ColumnKind::Text),
    (HOSPITAL, ColumnKind::Text),
    (INSURANCE_PROVIDER, ColumnKind::Text),
    (BILLING_AMOUNT, ColumnKind::Float),
    (ROOM_NUMBER, ColumnKind::Integer),
    (ADMISSION_TYPE, ColumnKind::Text),
    (DISCHARGE_DATE, ColumnKind::DateTime),
    (MEDICATION, ColumnKind::Text),
    (TEST_RESULTS, ColumnKind::Text),
];

/// Categorical columns surveyed for distinct values after cleaning.
pub const UNIQUE_VALUE_COLUMNS: [&str; 7] = [
    GENDER,
    BLOOD_TYPE,
    MEDICAL_CONDITION,
    ADMISSION_TYPE,
    INSURANCE_PROVIDER,
    MEDICATION,
    TEST_RESULTS,
];

pub fn expected_column_names() -> Vec<String> {
    EXPECTED_COLUMNS
        .iter()
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn kind_of(name: &str) -> Option<ColumnKind> {
    EXPECTED_COLUMNS
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, kind)| *kind)
}

/// Cell contents read as a missing value, matched after trimming. These are
/// the markers common CSV exporters and dataframe libraries write for nulls.
pub const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_marker(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_markers_match_after_trimming() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker(" N/A "));
        assert!(is_missing_marker("null"));
        assert!(!is_missing_marker("Nancy"));
        assert!(!is_missing_marker("n.a."));
    }
}
