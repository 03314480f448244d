//! Destination store abstraction.
//!
//! [`MongoStore`] talks to a live MongoDB deployment through the synchronous
//! driver. [`MemoryStore`] keeps documents in process, enforcing the same
//! validator subset and `_id` uniqueness; it backs `import --dry-run` and the
//! tests.

use std::cell::RefCell;

use log::{debug, info};
use mongodb::{
    bson::{Bson, Document, doc},
    error::ErrorKind,
    options::{ValidationAction, ValidationLevel},
    sync::{Client, Collection, Database},
};
use thiserror::Error;

use crate::{
    config::MongoSettings,
    schema::{self, IndexSpec},
};

const NAMESPACE_EXISTS: i32 = 48;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("document {id} failed validation: {}", reasons.join("; "))]
    Validation { id: String, reasons: Vec<String> },
    #[error("duplicate key: _id {id} already exists")]
    DuplicateKey { id: String },
    #[error("bulk insert wrote {inserted} document(s) and rejected {}", failures.len())]
    BulkWrite {
        inserted: usize,
        failures: Vec<StoreError>,
    },
    #[error("unsupported {0}")]
    Unsupported(String),
}

/// Operations the pipeline needs from the destination collection.
pub trait DocumentStore {
    /// Human-readable `database.collection` label for diagnostics.
    fn namespace(&self) -> String;
    fn ping(&self) -> Result<(), StoreError>;
    fn count_documents(&self) -> Result<u64, StoreError>;
    fn drop_collection(&self) -> Result<(), StoreError>;
    /// Creates the collection bound to `validator` in strict/error mode, or
    /// re-applies the validator when the collection already exists.
    fn create_collection(&self, validator: &Document) -> Result<(), StoreError>;
    fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError>;
    /// Unordered bulk insert; returns the number of inserted documents.
    fn insert_many(&self, documents: &[Document]) -> Result<usize, StoreError>;
    fn insert_one(&self, document: &Document) -> Result<Bson, StoreError>;
    fn find_one(&self, filter: &Document) -> Result<Option<Document>, StoreError>;
    /// Returns the number of modified documents.
    fn update_one(&self, filter: &Document, update: &Document) -> Result<u64, StoreError>;
    fn delete_one(&self, filter: &Document) -> Result<u64, StoreError>;
    fn delete_many(&self, filter: &Document) -> Result<u64, StoreError>;
}

pub struct MongoStore {
    database: Database,
    collection: Collection<Document>,
    collection_name: String,
}

impl MongoStore {
    pub fn connect(settings: &MongoSettings) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(settings.connection_string())?;
        let database = client.database(&settings.database);
        let collection = database.collection::<Document>(&settings.collection);
        debug!("Using {}.{}", settings.database, settings.collection);
        Ok(Self {
            database,
            collection,
            collection_name: settings.collection.clone(),
        })
    }
}

fn is_namespace_exists(err: &mongodb::error::Error) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(command) if command.code == NAMESPACE_EXISTS)
}

impl DocumentStore for MongoStore {
    fn namespace(&self) -> String {
        format!("{}.{}", self.database.name(), self.collection_name)
    }

    fn ping(&self) -> Result<(), StoreError> {
        self.database.run_command(doc! { "ping": 1 }).run()?;
        Ok(())
    }

    fn count_documents(&self) -> Result<u64, StoreError> {
        Ok(self.collection.count_documents(doc! {}).run()?)
    }

    fn drop_collection(&self) -> Result<(), StoreError> {
        self.collection.drop().run()?;
        Ok(())
    }

    fn create_collection(&self, validator: &Document) -> Result<(), StoreError> {
        let created = self
            .database
            .create_collection(&self.collection_name)
            .validator(validator.clone())
            .validation_level(ValidationLevel::Strict)
            .validation_action(ValidationAction::Error)
            .run();
        match created {
            Ok(()) => Ok(()),
            Err(err) if is_namespace_exists(&err) => {
                info!(
                    "Collection {} already exists; updating its validator",
                    self.namespace()
                );
                self.database
                    .run_command(doc! {
                        "collMod": &self.collection_name,
                        "validator": validator.clone(),
                        "validationLevel": schema::VALIDATION_LEVEL,
                        "validationAction": schema::VALIDATION_ACTION,
                    })
                    .run()?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        self.collection.create_index(spec.to_model()).run()?;
        Ok(())
    }

    fn insert_many(&self, documents: &[Document]) -> Result<usize, StoreError> {
        let result = self.collection.insert_many(documents).ordered(false).run()?;
        Ok(result.inserted_ids.len())
    }

    fn insert_one(&self, document: &Document) -> Result<Bson, StoreError> {
        Ok(self.collection.insert_one(document).run()?.inserted_id)
    }

    fn find_one(&self, filter: &Document) -> Result<Option<Document>, StoreError> {
        Ok(self.collection.find_one(filter.clone()).run()?)
    }

    fn update_one(&self, filter: &Document, update: &Document) -> Result<u64, StoreError> {
        let result = self
            .collection
            .update_one(filter.clone(), update.clone())
            .run()?;
        Ok(result.modified_count)
    }

    fn delete_one(&self, filter: &Document) -> Result<u64, StoreError> {
        Ok(self.collection.delete_one(filter.clone()).run()?.deleted_count)
    }

    fn delete_many(&self, filter: &Document) -> Result<u64, StoreError> {
        Ok(self.collection.delete_many(filter.clone()).run()?.deleted_count)
    }
}

#[derive(Debug, Default)]
struct MemoryCollection {
    validator: Option<Document>,
    indexes: Vec<String>,
    documents: Vec<Document>,
}

/// In-process collection honouring the validator, `_id` uniqueness and
/// unordered bulk-insert semantics.
#[derive(Debug)]
pub struct MemoryStore {
    namespace: String,
    state: RefCell<MemoryCollection>,
}

impl MemoryStore {
    pub fn new(database: &str, collection: &str) -> Self {
        Self {
            namespace: format!("{database}.{collection}"),
            state: RefCell::new(MemoryCollection::default()),
        }
    }

    pub fn documents(&self) -> Vec<Document> {
        self.state.borrow().documents.clone()
    }

    pub fn index_names(&self) -> Vec<String> {
        self.state.borrow().indexes.clone()
    }

    pub fn validator(&self) -> Option<Document> {
        self.state.borrow().validator.clone()
    }

    fn check_insert(state: &MemoryCollection, document: &Document) -> Result<(), StoreError> {
        let id = document
            .get("_id")
            .map(|id| id.to_string())
            .unwrap_or_default();
        if let Some(validator) = &state.validator {
            schema::validate_document(document, validator)
                .map_err(|reasons| StoreError::Validation {
                    id: id.clone(),
                    reasons,
                })?;
        }
        if document.get("_id").is_some_and(|candidate| {
            state
                .documents
                .iter()
                .any(|existing| existing.get("_id") == Some(candidate))
        }) {
            return Err(StoreError::DuplicateKey { id });
        }
        Ok(())
    }

    fn insert_into(state: &mut MemoryCollection, document: &Document) -> Result<Bson, StoreError> {
        Self::check_insert(state, document)?;
        let mut stored = document.clone();
        if !stored.contains_key("_id") {
            stored.insert("_id", mongodb::bson::oid::ObjectId::new());
        }
        let id = stored.get("_id").cloned().unwrap_or(Bson::Null);
        state.documents.push(stored);
        Ok(id)
    }
}

/// Resolves a dotted path such as `patient.name` inside `document`.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(path, expected)| lookup(document, path) == Some(expected))
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> bool {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            true
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(child)) => set_path(child, rest, value),
                _ => false,
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn namespace(&self) -> String {
        format!("memory:{}", self.namespace)
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn count_documents(&self) -> Result<u64, StoreError> {
        Ok(self.state.borrow().documents.len() as u64)
    }

    fn drop_collection(&self) -> Result<(), StoreError> {
        *self.state.borrow_mut() = MemoryCollection::default();
        Ok(())
    }

    fn create_collection(&self, validator: &Document) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.validator = Some(validator.clone());
        Ok(())
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        if !state.indexes.iter().any(|name| name == spec.name) {
            state.indexes.push(spec.name.to_string());
        }
        Ok(())
    }

    fn insert_many(&self, documents: &[Document]) -> Result<usize, StoreError> {
        let mut state = self.state.borrow_mut();
        let mut inserted = 0;
        let mut failures = Vec::new();
        for document in documents {
            match Self::insert_into(&mut state, document) {
                Ok(_) => inserted += 1,
                Err(err) => failures.push(err),
            }
        }
        if failures.is_empty() {
            Ok(inserted)
        } else {
            Err(StoreError::BulkWrite { inserted, failures })
        }
    }

    fn insert_one(&self, document: &Document) -> Result<Bson, StoreError> {
        Self::insert_into(&mut self.state.borrow_mut(), document)
    }

    fn find_one(&self, filter: &Document) -> Result<Option<Document>, StoreError> {
        Ok(self
            .state
            .borrow()
            .documents
            .iter()
            .find(|doc| matches_filter(doc, filter))
            .cloned())
    }

    fn update_one(&self, filter: &Document, update: &Document) -> Result<u64, StoreError> {
        let set = update
            .get_document("$set")
            .map_err(|_| StoreError::Unsupported("update without $set".to_string()))?;
        let mut state = self.state.borrow_mut();
        let validator = state.validator.clone();
        let Some(target) = state
            .documents
            .iter_mut()
            .find(|doc| matches_filter(doc, filter))
        else {
            return Ok(0);
        };
        let mut updated = target.clone();
        for (path, value) in set {
            if !set_path(&mut updated, path, value.clone()) {
                return Err(StoreError::Unsupported(format!("$set through non-object '{path}'")));
            }
        }
        if let Some(validator) = validator {
            schema::validate_document(&updated, &validator).map_err(|reasons| {
                StoreError::Validation {
                    id: updated.get("_id").map(|id| id.to_string()).unwrap_or_default(),
                    reasons,
                }
            })?;
        }
        let modified = u64::from(*target != updated);
        *target = updated;
        Ok(modified)
    }

    fn delete_one(&self, filter: &Document) -> Result<u64, StoreError> {
        let mut state = self.state.borrow_mut();
        match state
            .documents
            .iter()
            .position(|doc| matches_filter(doc, filter))
        {
            Some(idx) => {
                state.documents.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete_many(&self, filter: &Document) -> Result<u64, StoreError> {
        let mut state = self.state.borrow_mut();
        let before = state.documents.len();
        state.documents.retain(|doc| !matches_filter(doc, filter));
        Ok((before - state.documents.len()) as u64)
    }
}
