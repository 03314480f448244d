//! Destination collection contract: the `$jsonSchema` validator, its
//! enforcement mode and the secondary indexes.
//!
//! [`validate_document`] evaluates the subset of `$jsonSchema` the validator
//! uses (`bsonType`, `required`, `properties`) so that the in-memory store
//! rejects the same documents the server would.

use mongodb::{
    IndexModel,
    bson::{Bson, Document, doc},
    options::IndexOptions,
};

pub const VALIDATION_LEVEL: &str = "strict";
pub const VALIDATION_ACTION: &str = "error";

pub fn hospitalization_validator() -> Document {
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["createdAt", "updatedAt", "patient", "admission"],
            "properties": {
                "createdAt": { "bsonType": "date" },
                "updatedAt": { "bsonType": "date" },
                "patient": {
                    "bsonType": "object",
                    "required": ["name", "gender", "blood_type"],
                    "properties": {
                        "name": { "bsonType": "string" },
                        "age": { "bsonType": ["int", "long", "double", "null"] },
                        "gender": { "bsonType": "string" },
                        "blood_type": { "bsonType": "string" },
                    },
                },
                "medical": {
                    "bsonType": "object",
                    "properties": {
                        "condition": { "bsonType": ["string", "null"] },
                        "test_results": { "bsonType": ["string", "null"] },
                    },
                },
                "medication": { "bsonType": ["string", "null"] },
                "doctor": { "bsonType": ["string", "null"] },
                "admission": {
                    "bsonType": "object",
                    "required": ["hospital", "date_of_admission"],
                    "properties": {
                        "hospital": { "bsonType": "string" },
                        "admission_type": { "bsonType": ["string", "null"] },
                        "room_number": { "bsonType": ["int", "long", "null"] },
                        "date_of_admission": { "bsonType": "date" },
                        "discharge_date": { "bsonType": ["date", "null"] },
                    },
                },
                "billing": {
                    "bsonType": "object",
                    "properties": {
                        "amount": { "bsonType": ["double", "decimal", "int", "long", "null"] },
                        "insurance_provider": { "bsonType": ["string", "null"] },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub keys: &'static [(&'static str, SortDirection)],
}

impl IndexSpec {
    pub fn keys_document(&self) -> Document {
        let mut keys = Document::new();
        for (field, direction) in self.keys {
            keys.insert(*field, direction.as_i32());
        }
        keys
    }

    pub fn to_model(&self) -> IndexModel {
        IndexModel::builder()
            .keys(self.keys_document())
            .options(IndexOptions::builder().name(self.name.to_string()).build())
            .build()
    }
}

pub const INDEXES: [IndexSpec; 5] = [
    IndexSpec {
        name: "idx_patient_name",
        keys: &[("patient.name", SortDirection::Ascending)],
    },
    IndexSpec {
        name: "idx_patient_age",
        keys: &[("patient.age", SortDirection::Ascending)],
    },
    IndexSpec {
        name: "idx_medical_condition",
        keys: &[("medical.condition", SortDirection::Ascending)],
    },
    IndexSpec {
        name: "idx_doctor",
        keys: &[("doctor", SortDirection::Ascending)],
    },
    // recent admissions per hospital
    IndexSpec {
        name: "idx_admission_hospital_date",
        keys: &[
            ("admission.hospital", SortDirection::Ascending),
            ("admission.date_of_admission", SortDirection::Descending),
        ],
    },
];

/// Checks `document` against a `{ "$jsonSchema": ... }` validator, returning
/// every violation found.
pub fn validate_document(document: &Document, validator: &Document) -> Result<(), Vec<String>> {
    let Ok(schema) = validator.get_document("$jsonSchema") else {
        return Ok(());
    };
    let mut errors = Vec::new();
    check_value(&Bson::Document(document.clone()), schema, "$", &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_value(value: &Bson, schema: &Document, path: &str, errors: &mut Vec<String>) {
    if let Some(allowed) = schema.get("bsonType") {
        let names = match allowed {
            Bson::String(name) => vec![name.as_str()],
            Bson::Array(items) => items.iter().filter_map(Bson::as_str).collect(),
            _ => Vec::new(),
        };
        let actual = bson_type_name(value);
        if !names.iter().any(|name| *name == actual) {
            errors.push(format!(
                "{path}: expected bsonType {} but found {actual}",
                names.join("|")
            ));
            return;
        }
    }

    let Bson::Document(object) = value else {
        return;
    };
    if let Ok(required) = schema.get_array("required") {
        for field in required.iter().filter_map(Bson::as_str) {
            if !object.contains_key(field) {
                errors.push(format!("{path}: missing required field '{field}'"));
            }
        }
    }
    if let Ok(properties) = schema.get_document("properties") {
        for (field, sub_schema) in properties {
            let (Some(child), Bson::Document(sub_schema)) = (object.get(field), sub_schema) else {
                continue;
            };
            check_value(child, sub_schema, &format!("{path}.{field}"), errors);
        }
    }
}

fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::Boolean(_) => "bool",
        Bson::Null => "null",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::DateTime(_) => "date",
        Bson::Decimal128(_) => "decimal",
        Bson::ObjectId(_) => "objectId",
        _ => "other",
    }
}
