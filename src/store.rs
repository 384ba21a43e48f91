// 💾 Record Store - whole-collection load/save
//
// The collection is one JSON document, rewritten in full after every
// accepted submission.

use crate::record::NormalizedRecord;
use crate::schema::SchemaRegistry;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// RECORD COLLECTION
// ============================================================================

/// Category name → append-only list of records, in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordCollection {
    categories: Vec<(String, Vec<NormalizedRecord>)>,
}

impl RecordCollection {
    /// One empty list per registry category
    pub fn empty(registry: &SchemaRegistry) -> Self {
        RecordCollection {
            categories: registry
                .category_names()
                .map(|name| (name.to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Add an empty list for every registry category the collection lacks.
    pub fn ensure_categories(&mut self, registry: &SchemaRegistry) {
        for name in registry.category_names() {
            if self.records(name).is_none() {
                self.categories.push((name.to_string(), Vec::new()));
            }
        }
    }

    pub fn records(&self, category: &str) -> Option<&[NormalizedRecord]> {
        self.categories
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, records)| records.as_slice())
    }

    fn records_mut(&mut self, category: &str) -> Option<&mut Vec<NormalizedRecord>> {
        self.categories
            .iter_mut()
            .find(|(name, _)| name == category)
            .map(|(_, records)| records)
    }

    /// Append a record; returns false when the category is absent.
    pub fn append(&mut self, category: &str, record: NormalizedRecord) -> bool {
        match self.records_mut(category) {
            Some(records) => {
                records.push(record);
                true
            }
            None => false,
        }
    }

    /// Remove the most recently appended record of a category.
    pub fn pop(&mut self, category: &str) -> Option<NormalizedRecord> {
        self.records_mut(category).and_then(|records| records.pop())
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|(_, records)| records.len()).sum()
    }
}

impl Serialize for RecordCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (name, records) in &self.categories {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RecordCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CollectionVisitor;

        impl<'de> Visitor<'de> for CollectionVisitor {
            type Value = RecordCollection;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category names to record lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut collection = RecordCollection::default();
                while let Some((name, records)) =
                    access.next_entry::<String, Vec<NormalizedRecord>>()?
                {
                    collection.categories.push((name, records));
                }
                Ok(collection)
            }
        }

        deserializer.deserialize_map(CollectionVisitor)
    }
}

// ============================================================================
// STORE ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid record document: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize records: {0}")]
    Serialize(#[from] serde_json::Error),
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Durable home of the record collection
pub trait RecordStore {
    /// Persisted collection, or one empty list per category when nothing
    /// has been persisted yet.
    fn load(&self, registry: &SchemaRegistry) -> Result<RecordCollection, StoreError>;

    /// Overwrite persisted state with the full collection.
    fn save(&self, collection: &RecordCollection) -> Result<(), StoreError>;
}

// ============================================================================
// JSON FILE STORE
// ============================================================================

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn load(&self, registry: &SchemaRegistry) -> Result<RecordCollection, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no record document yet, starting empty");
                return Ok(RecordCollection::empty(registry));
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut collection: RecordCollection =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        for name in collection.category_names() {
            if !registry.contains(name) {
                warn!(category = name, "document holds a category the registry does not define");
            }
        }
        collection.ensure_categories(registry);

        debug!(
            path = %self.path.display(),
            records = collection.total_records(),
            "loaded record document"
        );
        Ok(collection)
    }

    fn save(&self, collection: &RecordCollection) -> Result<(), StoreError> {
        let content = to_pretty_json(collection)?;

        fs::write(&self.path, content).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            path = %self.path.display(),
            records = collection.total_records(),
            "saved record document"
        );
        Ok(())
    }
}

/// JSON with four-space indentation
fn to_pretty_json(collection: &RecordCollection) -> Result<Vec<u8>, StoreError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    collection.serialize(&mut serializer)?;
    Ok(buffer)
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store; keeps the last saved collection.
#[derive(Default)]
pub struct MemoryStore {
    saved: RefCell<Option<RecordCollection>>,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail, for exercising error paths
    pub fn failing() -> Self {
        MemoryStore {
            saved: RefCell::new(None),
            fail_saves: true,
        }
    }

    pub fn saved(&self) -> Option<RecordCollection> {
        self.saved.borrow().clone()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, registry: &SchemaRegistry) -> Result<RecordCollection, StoreError> {
        let mut collection = self
            .saved
            .borrow()
            .clone()
            .unwrap_or_else(|| RecordCollection::empty(registry));
        collection.ensure_categories(registry);
        Ok(collection)
    }

    fn save(&self, collection: &RecordCollection) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Write {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::new(ErrorKind::Other, "save refused"),
            });
        }
        *self.saved.borrow_mut() = Some(collection.clone());
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RawEntry};
    use crate::schema::registry;
    use crate::validator::validate;

    fn picnic() -> NormalizedRecord {
        let raw = RawEntry::new()
            .with("Nome Evento", "Picnic")
            .with("Data", "01/06/2024")
            .with("Partecipanti", "Anna, Luca");
        validate(registry().get("Attività Familiari").unwrap(), &raw).unwrap()
    }

    #[test]
    fn test_missing_document_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("family_data.json"));

        let collection = store.load(registry()).unwrap();

        assert_eq!(collection.category_names().count(), 15);
        for name in registry().category_names() {
            assert_eq!(collection.records(name).map(|r| r.len()), Some(0));
        }
    }

    #[test]
    fn test_load_after_save_is_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("family_data.json"));

        let mut collection = RecordCollection::empty(registry());
        assert!(collection.append("Attività Familiari", picnic()));
        store.save(&collection).unwrap();

        assert_eq!(store.load(registry()).unwrap(), collection);
    }

    #[test]
    fn test_full_precision_decimals_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("family_data.json"));

        let raw = RawEntry::new()
            .with("Simbolo", "ENI")
            .with("Tipo", "long")
            .with("Prezzo di Ingresso", 0.1 + 0.2)
            .with("Profitto/Perdita", 994.1414234726625);
        let trade = validate(registry().get("Attività di Trading").unwrap(), &raw).unwrap();

        let mut collection = RecordCollection::empty(registry());
        assert!(collection.append("Attività di Trading", trade));
        store.save(&collection).unwrap();

        let loaded = store.load(registry()).unwrap();
        assert_eq!(loaded, collection);
        assert_eq!(
            loaded.records("Attività di Trading").unwrap()[0].get("Profitto/Perdita"),
            Some(&FieldValue::Decimal(994.1414234726625))
        );
    }

    #[test]
    fn test_document_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("family_data.json"));

        let mut collection = RecordCollection::empty(registry());
        collection.append("Attività Familiari", picnic());
        store.save(&collection).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.starts_with("{\n    \"Attività Familiari\": [\n        {\n"));

        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["Attività Familiari"][0]["Nome Evento"], "Picnic");
        assert_eq!(
            value["Attività Familiari"][0]["Partecipanti"],
            serde_json::json!(["Anna", "Luca"])
        );
        assert_eq!(value["Note Libere"], serde_json::json!([]));
    }

    #[test]
    fn test_partial_document_gets_missing_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("family_data.json");
        fs::write(&path, r#"{"Note Libere": [], "Ricette": [{"Nome": "Tiramisù"}]}"#).unwrap();

        let collection = JsonFileStore::new(&path).load(registry()).unwrap();

        assert_eq!(collection.category_names().next(), Some("Note Libere"));
        assert!(collection.records("Attività Familiari").is_some());
        // Unknown categories are kept so a rewrite does not drop them
        assert_eq!(collection.records("Ricette").map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("family_data.json");
        fs::write(&path, "not json").unwrap();

        let result = JsonFileStore::new(&path).load(registry());
        assert!(matches!(result, Err(StoreError::Parse { .. })));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nope").join("family_data.json"));

        let result = store.save(&RecordCollection::empty(registry()));
        assert!(matches!(result, Err(StoreError::Write { .. })));
    }

    #[test]
    fn test_append_to_unknown_category() {
        let mut collection = RecordCollection::empty(registry());
        assert!(!collection.append("Ricette", picnic()));
        assert_eq!(collection.total_records(), 0);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.saved().is_none());

        let mut collection = store.load(registry()).unwrap();
        collection.append("Attività Familiari", picnic());
        store.save(&collection).unwrap();

        assert_eq!(store.load(registry()).unwrap(), collection);
        assert!(MemoryStore::failing().save(&collection).is_err());
    }
}
