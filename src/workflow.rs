// 📝 Entry Workflow - pick category → validate → append → persist

use crate::record::{NormalizedRecord, RawEntry};
use crate::schema::{CategorySchema, SchemaRegistry};
use crate::store::{RecordCollection, RecordStore, StoreError};
use crate::validator::{validate, ValidationError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("record store failure: {0}")]
    Store(#[from] StoreError),
}

/// Outcome of one submission
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Appended and persisted
    Accepted(NormalizedRecord),
    /// Nothing stored; every problem found
    Rejected(Vec<ValidationError>),
}

impl Submission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Submission::Accepted(_))
    }
}

pub struct EntryWorkflow<'r, S: RecordStore> {
    registry: &'r SchemaRegistry,
    store: S,
    collection: RecordCollection,
}

impl<'r, S: RecordStore> EntryWorkflow<'r, S> {
    /// Load the collection and start accepting submissions.
    pub fn open(registry: &'r SchemaRegistry, store: S) -> Result<Self, WorkflowError> {
        let collection = store.load(registry)?;
        Ok(EntryWorkflow {
            registry,
            store,
            collection,
        })
    }

    pub fn categories(&self) -> &'r [CategorySchema] {
        self.registry.categories()
    }

    pub fn schema(&self, category: &str) -> Result<&'r CategorySchema, WorkflowError> {
        self.registry
            .get(category)
            .ok_or_else(|| WorkflowError::UnknownCategory(category.to_string()))
    }

    /// Stored records of a category, in insertion order
    pub fn records(&self, category: &str) -> Result<&[NormalizedRecord], WorkflowError> {
        self.schema(category)?;
        Ok(self.collection.records(category).unwrap_or(&[]))
    }

    pub fn collection(&self) -> &RecordCollection {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate one entry; on success append it and persist the collection.
    ///
    /// A failed save removes the appended record again, so the in-memory
    /// collection always matches what was last persisted.
    pub fn submit(&mut self, category: &str, raw: &RawEntry) -> Result<Submission, WorkflowError> {
        let schema = self.schema(category)?;

        let record = match validate(schema, raw) {
            Ok(record) => record,
            Err(errors) => {
                warn!(category, errors = errors.len(), "submission rejected");
                return Ok(Submission::Rejected(errors));
            }
        };

        self.collection.ensure_categories(self.registry);
        self.collection.append(category, record.clone());

        if let Err(e) = self.store.save(&self.collection) {
            self.collection.pop(category);
            return Err(e.into());
        }

        info!(
            category,
            total = self.collection.records(category).map_or(0, |r| r.len()),
            "record added"
        );
        Ok(Submission::Accepted(record))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::schema::registry;
    use crate::store::MemoryStore;

    fn picnic() -> RawEntry {
        RawEntry::new()
            .with("Nome Evento", "Picnic")
            .with("Data", "01/06/2024")
            .with("Luogo", "Parco")
            .with("Partecipanti", "Anna, Luca")
    }

    #[test]
    fn test_accepted_submission_is_persisted() {
        let mut workflow = EntryWorkflow::open(registry(), MemoryStore::new()).unwrap();

        let outcome = workflow.submit("Attività Familiari", &picnic()).unwrap();
        assert!(outcome.is_accepted());

        let records = workflow.records("Attività Familiari").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Nome Evento"), Some(&FieldValue::Text("Picnic".to_string())));
        assert_eq!(workflow.store().saved().as_ref(), Some(workflow.collection()));
    }

    #[test]
    fn test_rejected_submission_stores_nothing() {
        let mut workflow = EntryWorkflow::open(registry(), MemoryStore::new()).unwrap();

        let outcome = workflow
            .submit("Attività Familiari", &picnic().with("Nome Evento", " "))
            .unwrap();

        match outcome {
            Submission::Rejected(errors) => assert_eq!(errors[0].field(), "Nome Evento"),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(workflow.records("Attività Familiari").unwrap().is_empty());
        assert!(workflow.store().saved().is_none());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let mut workflow = EntryWorkflow::open(registry(), MemoryStore::failing()).unwrap();

        let result = workflow.submit("Attività Familiari", &picnic());

        assert!(matches!(result, Err(WorkflowError::Store(_))));
        assert!(workflow.records("Attività Familiari").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_category() {
        let mut workflow = EntryWorkflow::open(registry(), MemoryStore::new()).unwrap();

        assert!(matches!(
            workflow.submit("Ricette", &RawEntry::new()),
            Err(WorkflowError::UnknownCategory(_))
        ));
        assert!(matches!(
            workflow.records("Ricette"),
            Err(WorkflowError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_records_keep_insertion_order() {
        let mut workflow = EntryWorkflow::open(registry(), MemoryStore::new()).unwrap();

        for name in ["Natale", "Pasqua", "Ferragosto"] {
            let raw = RawEntry::new().with("Nome Tradizione", name);
            workflow.submit("Tradizioni Familiari", &raw).unwrap();
        }

        let names: Vec<String> = workflow
            .records("Tradizioni Familiari")
            .unwrap()
            .iter()
            .map(|r| r.get("Nome Tradizione").unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Natale", "Pasqua", "Ferragosto"]);
    }
}
