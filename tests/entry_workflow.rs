use family_records::{
    registry, EntryWorkflow, FieldKind, FieldValue, JsonFileStore, RawEntry, RecordCollection,
    RecordStore, Submission, ValidationError, WorkflowError,
};
use std::fs;
use std::path::Path;

fn open(path: &Path) -> EntryWorkflow<'static, JsonFileStore> {
    EntryWorkflow::open(registry(), JsonFileStore::new(path)).unwrap()
}

fn picnic() -> RawEntry {
    RawEntry::new()
        .with("Nome Evento", "Picnic")
        .with("Data", "01/06/2024")
        .with("Ora", "12:30")
        .with("Luogo", " Villa Borghese ")
        .with("Partecipanti", "Anna, Luca ,, Marco")
        .with("Descrizione", "Pranzo al sacco")
        .with("Ricorrenza", "annuale")
        .with("Note", "")
}

#[test]
fn fresh_store_has_every_category_empty() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = open(&dir.path().join("family_data.json"));

    let names: Vec<&str> = workflow.collection().category_names().collect();
    assert_eq!(names.len(), 15);
    for category in workflow.categories() {
        assert!(workflow.records(&category.name).unwrap().is_empty());
    }
}

#[test]
fn valid_family_activity_is_appended_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("family_data.json");
    let mut workflow = open(&path);

    let outcome = workflow.submit("Attività Familiari", &picnic()).unwrap();
    let record = match outcome {
        Submission::Accepted(record) => record,
        Submission::Rejected(errors) => panic!("rejected: {:?}", errors),
    };

    assert_eq!(record.get("Luogo"), Some(&FieldValue::Text("Villa Borghese".to_string())));
    assert_eq!(
        record.get("Partecipanti"),
        Some(&FieldValue::List(vec![
            "Anna".to_string(),
            "Luca".to_string(),
            "Marco".to_string()
        ]))
    );

    let records = workflow.records("Attività Familiari").unwrap();
    assert_eq!(records, &[record.clone()][..]);

    // What is on disk matches what is in memory
    let reloaded = open(&path);
    assert_eq!(reloaded.records("Attività Familiari").unwrap(), &[record][..]);
    assert_eq!(reloaded.collection(), workflow.collection());
}

#[test]
fn rejected_entry_leaves_document_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("family_data.json");
    let mut workflow = open(&path);
    workflow.submit("Attività Familiari", &picnic()).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let outcome = workflow
        .submit("Attività Familiari", &picnic().with("Nome Evento", "   "))
        .unwrap();

    match outcome {
        Submission::Rejected(errors) => {
            assert!(errors.iter().any(|e| e.to_string().contains("Nome Evento")));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    assert_eq!(workflow.records("Attività Familiari").unwrap().len(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn every_required_field_rejects_blank_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut workflow = open(&dir.path().join("family_data.json"));

    for category in registry().categories() {
        for field in category.fields.iter().filter(|f| f.is_required()) {
            let raw = RawEntry::new().with(field.name.clone(), " ");
            let errors = match workflow.submit(&category.name, &raw).unwrap() {
                Submission::Rejected(errors) => errors,
                Submission::Accepted(_) => panic!("{} accepted blank {}", category.name, field.name),
            };
            assert!(errors.contains(&ValidationError::Required {
                field: field.name.clone()
            }));
        }
    }
    assert_eq!(workflow.collection().total_records(), 0);
}

#[test]
fn every_integer_field_rejects_negatives() {
    for category in registry().categories() {
        for field in category.fields.iter().filter(|f| f.kind == FieldKind::Integer) {
            let errors = family_records::validate(category, &RawEntry::new().with(field.name.clone(), -7i64))
                .unwrap_err();
            assert!(errors.contains(&ValidationError::NegativeInteger {
                field: field.name.clone()
            }));
        }
    }
}

#[test]
fn trading_entry_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut workflow = open(&dir.path().join("family_data.json"));
    let trade = RawEntry::new()
        .with("Simbolo", "ENI")
        .with("Data del Trade", "05/09/2024")
        .with("Tipo", "Short")
        .with("Quantità", 100i64)
        .with("Prezzo di Ingresso", 14.2)
        .with("Prezzo di Uscita", 14.9)
        .with("Profitto/Perdita", -70.0);

    assert!(workflow.submit("Attività di Trading", &trade).unwrap().is_accepted());

    let rejected = workflow
        .submit("Attività di Trading", &trade.clone().with("Tipo", "buy"))
        .unwrap();
    assert!(!rejected.is_accepted());
    assert_eq!(workflow.records("Attività di Trading").unwrap().len(), 1);
}

#[test]
fn unknown_category_is_an_error_not_a_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let mut workflow = open(&dir.path().join("family_data.json"));

    let result = workflow.submit("Ricette", &RawEntry::new().with("Nome", "Tiramisù"));
    assert!(matches!(result, Err(WorkflowError::UnknownCategory(name)) if name == "Ricette"));
}

#[test]
fn unwritable_store_keeps_collection_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut workflow = open(&dir.path().join("missing").join("family_data.json"));

    let result = workflow.submit("Attività Familiari", &picnic());

    assert!(matches!(result, Err(WorkflowError::Store(_))));
    assert_eq!(workflow.collection().total_records(), 0);
}

#[test]
fn load_returns_what_was_saved() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("family_data.json"));

    let mut workflow = EntryWorkflow::open(registry(), JsonFileStore::new(store.path())).unwrap();
    workflow.submit("Attività Familiari", &picnic()).unwrap();
    workflow
        .submit("Note Libere", &RawEntry::new().with("Titolo Nota", "Spesa").with("Testo", "latte, uova"))
        .unwrap();
    let saved: RecordCollection = workflow.collection().clone();

    store.save(&saved).unwrap();
    assert_eq!(store.load(registry()).unwrap(), saved);
}
