//! Maps one normalized row to the nested hospitalization document.

use chrono::{NaiveDateTime, Utc};
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document, doc};
use uuid::Uuid;

use crate::{
    data::Value,
    record::{HospitalizationRecord, MappingError},
};

/// Builds the stored document for `record`. `now` becomes both `createdAt`
/// and `updatedAt`; the `_id` is a fresh v4 UUID.
pub fn record_to_document(record: &HospitalizationRecord, now: BsonDateTime) -> Document {
    doc! {
        "_id": Uuid::new_v4().to_string(),
        "patient": {
            "name": text(&record.name),
            "age": integer(record.age),
            "gender": text(&record.gender),
            "blood_type": text(&record.blood_type),
        },
        "medical": {
            "condition": text(&record.medical_condition),
            "test_results": text(&record.test_results),
        },
        "medication": text(&record.medication),
        "doctor": text(&record.doctor),
        "admission": {
            "hospital": text(&record.hospital),
            "admission_type": text(&record.admission_type),
            "room_number": integer(record.room_number),
            "date_of_admission": datetime(record.date_of_admission),
            "discharge_date": datetime(record.discharge_date),
        },
        "billing": {
            "amount": record.billing_amount.map_or(Bson::Null, Bson::Double),
            "insurance_provider": text(&record.insurance_provider),
        },
        "createdAt": now,
        "updatedAt": now,
    }
}

/// Maps a normalized row, timestamping it with the current time.
pub fn row_to_document(
    headers: &[String],
    row: &[Option<Value>],
) -> Result<Document, MappingError> {
    let record = HospitalizationRecord::from_row(headers, row)?;
    Ok(record_to_document(&record, current_timestamp()))
}

pub fn current_timestamp() -> BsonDateTime {
    BsonDateTime::from_millis(Utc::now().timestamp_millis())
}

pub fn to_bson_datetime(value: NaiveDateTime) -> BsonDateTime {
    BsonDateTime::from_millis(value.and_utc().timestamp_millis())
}

fn text(value: &Option<String>) -> Bson {
    value.clone().map_or(Bson::Null, Bson::String)
}

fn integer(value: Option<i64>) -> Bson {
    match value {
        None => Bson::Null,
        Some(v) => i32::try_from(v).map_or(Bson::Int64(v), Bson::Int32),
    }
}

fn datetime(value: Option<NaiveDateTime>) -> Bson {
    value.map_or(Bson::Null, |dt| Bson::DateTime(to_bson_datetime(dt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;
    use chrono::NaiveDate;

    fn sample_row() -> (Vec<String>, Vec<Option<Value>>) {
        let headers = columns::expected_column_names();
        let admitted = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let s = |v: &str| Some(Value::String(v.to_string()));
        let row = vec![
            s("Bobby Jackson"),
            Some(Value::Integer(30)),
            s("Male"),
            s("B-"),
            s("Cancer"),
            Some(Value::DateTime(admitted)),
            s("Matthew Smith"),
            s("Sons and Miller"),
            s("Blue Cross"),
            Some(Value::Float(18856.28)),
            Some(Value::Integer(328)),
            s("Urgent"),
            None,
            s("Paracetamol"),
            s("Normal"),
        ];
        (headers, row)
    }

    #[test]
    fn document_nests_groups_and_shares_timestamps() {
        let (headers, row) = sample_row();
        let doc = row_to_document(&headers, &row).unwrap();
        let patient = doc.get_document("patient").unwrap();
        assert_eq!(patient.get_str("name").unwrap(), "Bobby Jackson");
        assert_eq!(patient.get_i32("age").unwrap(), 30);
        let admission = doc.get_document("admission").unwrap();
        assert_eq!(admission.get_i32("room_number").unwrap(), 328);
        assert_eq!(admission.get("discharge_date"), Some(&Bson::Null));
        assert_eq!(doc.get_str("medication").unwrap(), "Paracetamol");
        assert_eq!(doc.get("createdAt"), doc.get("updatedAt"));
    }

    #[test]
    fn identical_rows_get_distinct_ids() {
        let (headers, row) = sample_row();
        let first = row_to_document(&headers, &row).unwrap();
        let second = row_to_document(&headers, &row).unwrap();
        assert_ne!(first.get_str("_id").unwrap(), second.get_str("_id").unwrap());
    }

    #[test]
    fn large_integers_stay_int64() {
        assert_eq!(integer(Some(i64::from(i32::MAX) + 1)), Bson::Int64(2_147_483_648));
        assert_eq!(integer(Some(7)), Bson::Int32(7));
    }
}
