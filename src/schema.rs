// 📐 Shape Layer - Schema Registry
// Categories are data: one table of fields, interpreted by a single validator

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

// ============================================================================
// FIELD KINDS & RULES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    StringList,
}

impl FieldKind {
    pub fn name(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::StringList => "list",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Decimal)
    }
}

/// Explicit per-field rule tags.
///
/// Rules are attached to fields in the table instead of being inferred from
/// field names, so a field called "Date" can stay free text while "Data"
/// is a checked calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldRule {
    /// Must be non-empty after trimming
    Required,
    /// Decimal value must be >= 0
    NonNegative,
    /// Non-empty value must be a DD/MM/YYYY calendar date
    Date,
    /// Case-insensitive closed set of accepted values
    OneOf(Vec<String>),
}

impl FieldRule {
    fn applies_to(&self, kind: FieldKind) -> bool {
        match self {
            FieldRule::Required => !kind.is_numeric(),
            FieldRule::NonNegative => kind.is_numeric(),
            FieldRule::Date | FieldRule::OneOf(_) => kind == FieldKind::Text,
        }
    }
}

// ============================================================================
// FIELD DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub kind: FieldKind,
    pub rules: Vec<FieldRule>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldDefinition {
            name: name.into(),
            kind,
            rules: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Decimal)
    }

    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    /// Builder: add validation rule
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn required(self) -> Self {
        self.with_rule(FieldRule::Required)
    }

    pub fn date(self) -> Self {
        self.with_rule(FieldRule::Date)
    }

    pub fn non_negative(self) -> Self {
        self.with_rule(FieldRule::NonNegative)
    }

    pub fn one_of(self, values: &[&str]) -> Self {
        self.with_rule(FieldRule::OneOf(
            values.iter().map(|v| v.to_string()).collect(),
        ))
    }

    pub fn is_required(&self) -> bool {
        self.rules.contains(&FieldRule::Required)
    }

    pub fn is_date(&self) -> bool {
        self.rules.contains(&FieldRule::Date)
    }

    pub fn is_non_negative(&self) -> bool {
        self.rules.contains(&FieldRule::NonNegative)
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.rules.iter().find_map(|rule| match rule {
            FieldRule::OneOf(values) => Some(values.as_slice()),
            _ => None,
        })
    }
}

// ============================================================================
// CATEGORY SCHEMA
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CategorySchema {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl CategorySchema {
    pub fn new(name: impl Into<String>) -> Self {
        CategorySchema {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder: append a field (form order = insertion order)
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ============================================================================
// SCHEMA REGISTRY
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("category '{0}' is defined more than once")]
    DuplicateCategory(String),

    #[error("field '{field}' is defined more than once in category '{category}'")]
    DuplicateField { category: String, field: String },

    #[error("rule {rule:?} cannot apply to {kind:?} field '{field}' in category '{category}'")]
    RuleKindMismatch {
        category: String,
        field: String,
        kind: FieldKind,
        rule: FieldRule,
    },
}

/// SchemaRegistry - ordered catalog of record categories
///
/// The registry is the single source of truth for:
/// - Which categories exist (and their display order)
/// - Which fields each category collects
/// - How each field is validated
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    categories: Vec<CategorySchema>,
}

impl SchemaRegistry {
    /// Build a registry, refusing inconsistent tables.
    pub fn new(categories: Vec<CategorySchema>) -> Result<Self, SchemaError> {
        let mut seen_categories = HashSet::new();

        for category in &categories {
            if !seen_categories.insert(category.name.as_str()) {
                return Err(SchemaError::DuplicateCategory(category.name.clone()));
            }

            let mut seen_fields = HashSet::new();
            for field in &category.fields {
                if !seen_fields.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateField {
                        category: category.name.clone(),
                        field: field.name.clone(),
                    });
                }

                if let Some(rule) = field.rules.iter().find(|r| !r.applies_to(field.kind)) {
                    return Err(SchemaError::RuleKindMismatch {
                        category: category.name.clone(),
                        field: field.name.clone(),
                        kind: field.kind,
                        rule: rule.clone(),
                    });
                }
            }
        }

        Ok(SchemaRegistry { categories })
    }

    /// Get category schema by name
    pub fn get(&self, category: &str) -> Option<&CategorySchema> {
        self.categories.iter().find(|c| c.name == category)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.get(category).is_some()
    }

    /// List category names in registry order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn categories(&self) -> &[CategorySchema] {
        &self.categories
    }

    pub fn count(&self) -> usize {
        self.categories.len()
    }

    /// The fifteen family categories
    pub fn family() -> Result<Self, SchemaError> {
        Self::new(vec![
            CategorySchema::new("Attività Familiari")
                .field(FieldDefinition::text("Nome Evento").required())
                .field(FieldDefinition::text("Data").date())
                .field(FieldDefinition::text("Ora"))
                .field(FieldDefinition::text("Luogo"))
                .field(FieldDefinition::list("Partecipanti"))
                .field(FieldDefinition::text("Descrizione"))
                .field(FieldDefinition::text("Ricorrenza"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Inventario della Casa")
                .field(FieldDefinition::text("Nome Oggetto").required())
                .field(FieldDefinition::text("Categoria"))
                .field(FieldDefinition::integer("Quantità"))
                .field(FieldDefinition::text("Condizione"))
                .field(FieldDefinition::text("Posizione"))
                .field(FieldDefinition::text("Data di Acquisto").date())
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Inventario di Cibo e Generi Alimentari")
                .field(FieldDefinition::text("Nome Oggetto").required())
                .field(FieldDefinition::text("Categoria"))
                .field(FieldDefinition::integer("Quantità"))
                .field(FieldDefinition::text("Data di Scadenza").date())
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Faccende e Responsabilità")
                .field(FieldDefinition::text("Nome Compito").required())
                .field(FieldDefinition::text("Membro della Famiglia Assegnato"))
                .field(FieldDefinition::text("Frequenza"))
                .field(FieldDefinition::text("Data di Scadenza").date())
                .field(FieldDefinition::text("Stato"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Documenti Familiari")
                .field(FieldDefinition::text("Nome Documento").required())
                .field(FieldDefinition::text("Tipo"))
                .field(FieldDefinition::text("Data di Creazione").date())
                .field(FieldDefinition::text("Proprietario"))
                .field(FieldDefinition::text("Posizione"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Contatti Importanti")
                .field(FieldDefinition::text("Nome").required())
                .field(FieldDefinition::text("Relazione"))
                .field(FieldDefinition::text("Numero di Telefono"))
                .field(FieldDefinition::text("Email"))
                .field(FieldDefinition::text("Indirizzo"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Tradizioni Familiari")
                .field(FieldDefinition::text("Nome Tradizione").required())
                .field(FieldDefinition::text("Descrizione"))
                .field(FieldDefinition::text("Frequenza"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Obiettivi e Progetti Familiari")
                .field(FieldDefinition::text("Nome Obiettivo/Progetto").required())
                .field(FieldDefinition::text("Descrizione"))
                .field(FieldDefinition::text("Membro della Famiglia Assegnato(i)"))
                .field(FieldDefinition::text("Data di Inizio").date())
                .field(FieldDefinition::text("Data di Fine").date())
                .field(FieldDefinition::text("Stato"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Nuove Attività Fatte da Niccolò")
                .field(FieldDefinition::text("Nome Attività").required())
                .field(FieldDefinition::text("Data").date())
                .field(FieldDefinition::text("Descrizione"))
                .field(FieldDefinition::integer("Tempo Impiegato"))
                .field(FieldDefinition::text("Note"))
                .field(FieldDefinition::text("Completata")),
            CategorySchema::new("Informazioni di Emergenza")
                .field(FieldDefinition::text("Tipo Emergenza").required())
                .field(FieldDefinition::text("Descrizione Piano"))
                .field(FieldDefinition::text("Numeri di Contatto"))
                .field(FieldDefinition::text("Posizione delle Forniture"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Cartelle Sanitarie Familiari")
                .field(FieldDefinition::text("Nome Membro della Famiglia").required())
                .field(FieldDefinition::text("Condizione Sanitaria"))
                .field(FieldDefinition::text("Medicina"))
                .field(FieldDefinition::text("Medico"))
                .field(FieldDefinition::text("Date degli Appuntamenti"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Piani di Viaggio")
                .field(FieldDefinition::text("Destinazione").required())
                .field(FieldDefinition::text("Date"))
                .field(FieldDefinition::text("Alloggio"))
                .field(FieldDefinition::text("Trasporto"))
                .field(FieldDefinition::text("Itinerario"))
                .field(FieldDefinition::text("Lista di Cose da Portare"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Attività di Trading")
                .field(FieldDefinition::text("Simbolo").required())
                .field(FieldDefinition::text("Data del Trade").date())
                .field(FieldDefinition::text("Tipo").one_of(&["short", "long"]))
                .field(FieldDefinition::text("Ragione del Trade"))
                .field(FieldDefinition::integer("Quantità"))
                .field(FieldDefinition::decimal("Prezzo di Ingresso").non_negative())
                .field(FieldDefinition::decimal("Prezzo di Uscita").non_negative())
                // Profit/loss may legitimately be negative
                .field(FieldDefinition::decimal("Profitto/Perdita"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Progetti IT")
                .field(FieldDefinition::text("Nome Progetto").required())
                .field(FieldDefinition::text("Descrizione"))
                .field(FieldDefinition::list("Tecnologie"))
                .field(FieldDefinition::text("Data di Inizio").date())
                .field(FieldDefinition::text("Data di Fine").date())
                .field(FieldDefinition::text("Stato"))
                .field(FieldDefinition::text("Obiettivo"))
                .field(FieldDefinition::text("Risultati"))
                .field(FieldDefinition::text("Repository"))
                .field(FieldDefinition::text("Note")),
            CategorySchema::new("Note Libere")
                .field(FieldDefinition::text("Titolo Nota").required())
                .field(FieldDefinition::text("Data").date())
                .field(FieldDefinition::text("Testo").required())
                .field(FieldDefinition::list("Tag"))
                .field(FieldDefinition::text("Note Aggiuntive")),
        ])
    }
}

static FAMILY_REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| {
    // A broken built-in table is a programming defect: fail fast
    SchemaRegistry::family().expect("built-in family schema must be consistent")
});

/// Process-wide registry of the built-in categories
pub fn registry() -> &'static SchemaRegistry {
    &FAMILY_REGISTRY
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_registry_is_consistent() {
        let registry = SchemaRegistry::family();
        assert!(registry.is_ok(), "built-in table rejected: {:?}", registry.err());
        assert_eq!(registry.unwrap().count(), 15);
    }

    #[test]
    fn test_category_order_is_stable() {
        let names: Vec<&str> = registry().category_names().collect();
        assert_eq!(names.first(), Some(&"Attività Familiari"));
        assert_eq!(names.last(), Some(&"Note Libere"));
        assert_eq!(names[12], "Attività di Trading");
    }

    #[test]
    fn test_field_order_follows_table() {
        let schema = registry().get("Attività Familiari").unwrap();
        let fields: Vec<&str> = schema.field_names().collect();
        assert_eq!(
            fields,
            vec!["Nome Evento", "Data", "Ora", "Luogo", "Partecipanti", "Descrizione", "Ricorrenza", "Note"]
        );
    }

    #[test]
    fn test_trading_rules() {
        let trading = registry().get("Attività di Trading").unwrap();

        assert!(trading.get("Prezzo di Ingresso").unwrap().is_non_negative());
        assert!(trading.get("Prezzo di Uscita").unwrap().is_non_negative());
        assert!(!trading.get("Profitto/Perdita").unwrap().is_non_negative());
        assert_eq!(
            trading.get("Tipo").unwrap().allowed_values(),
            Some(&["short".to_string(), "long".to_string()][..])
        );
    }

    #[test]
    fn test_plural_date_fields_stay_free_text() {
        let travel = registry().get("Piani di Viaggio").unwrap();
        assert!(!travel.get("Date").unwrap().is_date());

        let documents = registry().get("Documenti Familiari").unwrap();
        assert!(documents.get("Data di Creazione").unwrap().is_date());
        assert!(documents.get("Tipo").unwrap().allowed_values().is_none());
    }

    #[test]
    fn test_unknown_category() {
        assert!(registry().get("Ricette").is_none());
        assert!(!registry().contains("Ricette"));
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let result = SchemaRegistry::new(vec![
            CategorySchema::new("A"),
            CategorySchema::new("A"),
        ]);
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateCategory("A".to_string()));
    }

    #[test]
    fn test_rejects_duplicate_field() {
        let result = SchemaRegistry::new(vec![CategorySchema::new("A")
            .field(FieldDefinition::text("x"))
            .field(FieldDefinition::integer("x"))]);
        assert!(matches!(result, Err(SchemaError::DuplicateField { .. })));
    }

    #[test]
    fn test_rejects_rule_on_wrong_kind() {
        let result = SchemaRegistry::new(vec![
            CategorySchema::new("A").field(FieldDefinition::integer("n").date()),
        ]);
        assert!(matches!(result, Err(SchemaError::RuleKindMismatch { .. })));

        let result = SchemaRegistry::new(vec![
            CategorySchema::new("A").field(FieldDefinition::text("t").non_negative()),
        ]);
        assert!(matches!(result, Err(SchemaError::RuleKindMismatch { .. })));
    }

    #[test]
    fn test_required_list_is_allowed() {
        let result = SchemaRegistry::new(vec![
            CategorySchema::new("A").field(FieldDefinition::list("tags").required()),
        ]);
        assert!(result.is_ok());
    }
}
