// Family Records - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod schema;     // Schema Registry - categories and fields as data
pub mod record;     // Raw entries and normalized records
pub mod validator;  // Field Validator - generic schema interpreter
pub mod store;      // Record Store - JSON document persistence
pub mod workflow;   // Entry Workflow - validate, append, persist
pub mod config;
pub mod logging;
pub mod export;     // CSV export

#[cfg(feature = "tui")]
pub mod ui;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use schema::{
    registry, CategorySchema, FieldDefinition, FieldKind, FieldRule, SchemaError, SchemaRegistry,
};
pub use record::{FieldValue, NormalizedRecord, RawEntry, RawValue};
pub use validator::{validate, ValidationError, ValidationResult};
pub use store::{JsonFileStore, MemoryStore, RecordCollection, RecordStore, StoreError};
pub use workflow::{EntryWorkflow, Submission, WorkflowError};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
