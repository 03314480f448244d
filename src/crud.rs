//! Ad-hoc create/read/update/delete exercise against the destination.
//!
//! Inserts one synthetic hospitalization, reads it back next to a known
//! dataset patient, updates it, deletes it, tries a second insert with the
//! same `_id` and finally removes every synthetic copy.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use mongodb::bson::{Bson, Document, doc};
use uuid::Uuid;

use crate::{
    document::{current_timestamp, to_bson_datetime},
    store::DocumentStore,
};

pub const SYNTHETIC_PATIENT: &str = "Create TestPatient";
pub const KNOWN_PATIENT: &str = "Connor Hansen";

/// What each step of [`run_crud`] observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrudReport {
    pub inserted_id: String,
    pub known_patient_found: bool,
    pub synthetic_found: bool,
    pub modified: u64,
    pub deleted_one: u64,
    pub reinserted: bool,
    pub deleted_many: u64,
}

pub fn synthetic_hospitalization(id: &str) -> Result<Document> {
    let now = current_timestamp();
    let admitted = NaiveDate::from_ymd_opt(2025, 11, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .context("Building the synthetic admission date")?;
    Ok(doc! {
        "_id": id,
        "createdAt": now,
        "updatedAt": now,
        "patient": {
            "name": SYNTHETIC_PATIENT,
            "age": 58,
            "gender": "Male",
            "blood_type": "B+",
        },
        "medical": {
            "condition": "Hypertension",
            "test_results": "Normal",
        },
        "medication": "Aspirin",
        "doctor": "Test Doctor",
        "admission": {
            "hospital": "Test Hospital",
            "admission_type": "Routine",
            "room_number": 7,
            "date_of_admission": to_bson_datetime(admitted),
            "discharge_date": Bson::Null,
        },
        "billing": {
            "amount": 1234.56,
            "insurance_provider": "Test Insurance",
        },
    })
}

fn log_document(label: &str, document: Option<&Document>) {
    match document {
        Some(document) => {
            let extjson = Bson::Document(document.clone()).into_relaxed_extjson();
            let json = serde_json::to_string_pretty(&extjson)
                .unwrap_or_else(|_| format!("{document:?}"));
            info!("{label}:\n{json}");
        }
        None => info!("{label}: no document"),
    }
}

pub fn run_crud(store: &dyn DocumentStore) -> Result<CrudReport> {
    let namespace = store.namespace();
    let id = Uuid::new_v4().to_string();
    let hospitalization = synthetic_hospitalization(&id)?;
    let mut report = CrudReport::default();

    let inserted = store
        .insert_one(&hospitalization)
        .with_context(|| format!("Inserting the synthetic hospitalization into {namespace}"))?;
    report.inserted_id = match &inserted {
        Bson::String(id) => id.clone(),
        other => other.to_string(),
    };
    info!("[OK] Inserted patient {SYNTHETIC_PATIENT} with _id {}", report.inserted_id);

    let known = store
        .find_one(&doc! { "patient.name": KNOWN_PATIENT })
        .with_context(|| format!("Looking up {KNOWN_PATIENT}"))?;
    report.known_patient_found = known.is_some();
    log_document(&format!("Hospitalization of '{KNOWN_PATIENT}'"), known.as_ref());

    let synthetic_filter = doc! { "patient.name": SYNTHETIC_PATIENT };
    let synthetic = store
        .find_one(&synthetic_filter)
        .with_context(|| format!("Looking up {SYNTHETIC_PATIENT}"))?;
    report.synthetic_found = synthetic.is_some();
    log_document(&format!("Hospitalization of '{SYNTHETIC_PATIENT}'"), synthetic.as_ref());

    report.modified = store
        .update_one(
            &synthetic_filter,
            &doc! { "$set": { "billing.amount": 15000.0, "medical.test_results": "Improved" } },
        )
        .with_context(|| format!("Updating {SYNTHETIC_PATIENT}"))?;
    info!("[OK] Updated {} document(s)", report.modified);

    report.deleted_one = store
        .delete_one(&synthetic_filter)
        .with_context(|| format!("Deleting {SYNTHETIC_PATIENT}"))?;
    info!("[OK] Deleted {} hospitalization(s)", report.deleted_one);

    info!("Inserting the same hospitalization again");
    match store.insert_one(&hospitalization) {
        Ok(id) => {
            report.reinserted = true;
            info!("[OK] Re-insert succeeded with _id {id}");
        }
        Err(err) => warn!("[WARN] Re-insert rejected as expected: {err}"),
    }

    report.deleted_many = store
        .delete_many(&synthetic_filter)
        .with_context(|| format!("Removing every {SYNTHETIC_PATIENT} from {namespace}"))?;
    info!("[OK] Deleted {} hospitalization(s)", report.deleted_many);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{migrate, schema, store::MemoryStore};

    #[test]
    fn synthetic_document_passes_the_validator() {
        let document = synthetic_hospitalization("abc").unwrap();
        assert!(schema::validate_document(&document, &schema::hospitalization_validator()).is_ok());
    }

    #[test]
    fn crud_cycle_leaves_no_synthetic_patient() {
        let store = MemoryStore::new("db", "coll");
        migrate::create_collection(&store).unwrap();
        let report = run_crud(&store).unwrap();
        assert!(!report.known_patient_found);
        assert!(report.synthetic_found);
        assert_eq!(report.modified, 1);
        assert_eq!(report.deleted_one, 1);
        assert!(report.reinserted);
        assert_eq!(report.deleted_many, 1);
        assert_eq!(store.count_documents().unwrap(), 0);
    }

    #[test]
    fn update_sets_nested_fields() {
        let store = MemoryStore::new("db", "coll");
        let document = synthetic_hospitalization("xyz").unwrap();
        store.insert_one(&document).unwrap();
        store
            .update_one(
                &doc! { "_id": "xyz" },
                &doc! { "$set": { "billing.amount": 15000.0, "medical.test_results": "Improved" } },
            )
            .unwrap();
        let stored = store.find_one(&doc! { "_id": "xyz" }).unwrap().unwrap();
        let billing = stored.get_document("billing").unwrap();
        assert_eq!(billing.get_f64("amount").unwrap(), 15000.0);
        assert_eq!(
            stored.get_document("medical").unwrap().get_str("test_results").unwrap(),
            "Improved"
        );
    }
}
