// ✅ Field Validator - one generic interpreter for every category schema
//
// Checks run on an immutable view of the raw entry. Normalized values are
// collected into a fresh record that is only handed back when every field
// of the category passed.

use crate::record::{FieldValue, NormalizedRecord, RawEntry, RawValue};
use crate::schema::{CategorySchema, FieldDefinition, FieldKind};
use chrono::{Datelike, NaiveDate};
use thiserror::Error;

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// A user-correctable problem with one field. `Display` is the message shown
/// to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required and cannot be empty.")]
    Required { field: String },

    #[error("Field '{field}' must be a non-negative number.")]
    NegativeInteger { field: String },

    #[error("Field '{field}' must be a whole number.")]
    NotAWholeNumber { field: String },

    #[error("Field '{field}' must be a valid number.")]
    InvalidNumber { field: String },

    #[error("Field '{field}' must be a non-negative value.")]
    NegativeValue { field: String },

    #[error("Field '{field}' must be a valid date in DD/MM/YYYY format.")]
    InvalidDate { field: String },

    #[error("Field '{field}' contains invalid values.")]
    InvalidList { field: String },

    #[error("Field '{field}' must be {}.", quote_choices(.allowed))]
    NotAllowed { field: String, allowed: Vec<String> },

    #[error("Field '{field}' is not part of category '{category}'.")]
    UnknownField { field: String, category: String },
}

impl ValidationError {
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::NegativeInteger { field }
            | ValidationError::NotAWholeNumber { field }
            | ValidationError::InvalidNumber { field }
            | ValidationError::NegativeValue { field }
            | ValidationError::InvalidDate { field }
            | ValidationError::InvalidList { field }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::UnknownField { field, .. } => field,
        }
    }
}

fn quote_choices(allowed: &[String]) -> String {
    let quoted: Vec<String> = allowed.iter().map(|v| format!("'{}'", v)).collect();
    match quoted.split_last() {
        None => "one of no values".to_string(),
        Some((only, [])) => only.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

pub type ValidationResult = Result<NormalizedRecord, Vec<ValidationError>>;

// ============================================================================
// VALIDATE
// ============================================================================

/// Validate a raw entry against a category schema.
///
/// Returns every error found (schema order, then unknown fields) or a record
/// holding exactly the schema's fields in schema order. Never panics.
pub fn validate(schema: &CategorySchema, raw: &RawEntry) -> ValidationResult {
    let mut errors = Vec::new();
    let mut record = NormalizedRecord::default();

    for field in &schema.fields {
        let value = raw.get(&field.name);

        let checked = match field.kind {
            FieldKind::Text => check_text(field, value),
            FieldKind::Integer => check_integer(field, value),
            FieldKind::Decimal => check_decimal(field, value),
            FieldKind::StringList => check_list(field, value),
        };

        match checked {
            Ok(normalized) => record.push(field.name.clone(), normalized),
            Err(mut field_errors) => errors.append(&mut field_errors),
        }
    }

    for name in raw.field_names() {
        if schema.get(name).is_none() {
            errors.push(ValidationError::UnknownField {
                field: name.to_string(),
                category: schema.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(record)
    } else {
        Err(errors)
    }
}

// ============================================================================
// PER-KIND CHECKS
// ============================================================================

type FieldCheck = Result<FieldValue, Vec<ValidationError>>;

/// Trimmed text view of any raw value; missing fields read as empty.
fn raw_text(value: Option<&RawValue>) -> String {
    match value {
        None => String::new(),
        Some(RawValue::Text(s)) => s.trim().to_string(),
        Some(RawValue::Integer(n)) => n.to_string(),
        Some(RawValue::Decimal(x)) => x.to_string(),
    }
}

fn check_text(field: &FieldDefinition, value: Option<&RawValue>) -> FieldCheck {
    let text = raw_text(value);
    let mut errors = Vec::new();

    if field.is_required() && text.is_empty() {
        errors.push(ValidationError::Required {
            field: field.name.clone(),
        });
    }

    if field.is_date() && !text.is_empty() && !is_valid_date(&text) {
        errors.push(ValidationError::InvalidDate {
            field: field.name.clone(),
        });
    }

    if let Some(allowed) = field.allowed_values() {
        let lowered = text.to_lowercase();
        if !allowed.iter().any(|v| v.to_lowercase() == lowered) {
            errors.push(ValidationError::NotAllowed {
                field: field.name.clone(),
                allowed: allowed.to_vec(),
            });
        }
    }

    if errors.is_empty() {
        Ok(FieldValue::Text(text))
    } else {
        Err(errors)
    }
}

// i64::MAX is not representable; its f64 rounding is 2^63, one past the range
const I64_MIN_F: f64 = i64::MIN as f64;
const I64_MAX_F: f64 = i64::MAX as f64;

fn check_integer(field: &FieldDefinition, value: Option<&RawValue>) -> FieldCheck {
    let not_whole = || {
        vec![ValidationError::NotAWholeNumber {
            field: field.name.clone(),
        }]
    };

    // Missing or blank input takes the widget default of 0
    let n = match value {
        None => 0,
        Some(RawValue::Integer(n)) => *n,
        // `as` saturates, so out-of-range values must be rejected first
        Some(RawValue::Decimal(x))
            if x.is_finite() && x.fract() == 0.0 && *x >= I64_MIN_F && *x < I64_MAX_F =>
        {
            *x as i64
        }
        Some(RawValue::Decimal(_)) => return Err(not_whole()),
        Some(RawValue::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0
            } else {
                s.parse::<i64>().map_err(|_| not_whole())?
            }
        }
    };

    if n < 0 {
        return Err(vec![ValidationError::NegativeInteger {
            field: field.name.clone(),
        }]);
    }

    Ok(FieldValue::Integer(n))
}

fn check_decimal(field: &FieldDefinition, value: Option<&RawValue>) -> FieldCheck {
    let invalid = || {
        vec![ValidationError::InvalidNumber {
            field: field.name.clone(),
        }]
    };

    let x = match value {
        None => 0.0,
        Some(RawValue::Integer(n)) => *n as f64,
        Some(RawValue::Decimal(x)) => *x,
        Some(RawValue::Text(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse::<f64>().map_err(|_| invalid())?
            }
        }
    };

    // "NaN" and "inf" parse as f64 but are not usable amounts
    if !x.is_finite() {
        return Err(invalid());
    }

    if field.is_non_negative() && x < 0.0 {
        return Err(vec![ValidationError::NegativeValue {
            field: field.name.clone(),
        }]);
    }

    Ok(FieldValue::Decimal(x))
}

fn check_list(field: &FieldDefinition, value: Option<&RawValue>) -> FieldCheck {
    let text = raw_text(value);

    if text.is_empty() {
        if field.is_required() {
            return Err(vec![ValidationError::Required {
                field: field.name.clone(),
            }]);
        }
        return Ok(FieldValue::List(Vec::new()));
    }

    let items: Vec<String> = text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect();

    if items.is_empty() {
        return Err(vec![ValidationError::InvalidList {
            field: field.name.clone(),
        }]);
    }

    Ok(FieldValue::List(items))
}

/// Strict DD/MM/YYYY: zero-padded day and month, four-digit year, real date.
pub fn is_valid_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[2] != b'/' || bytes[5] != b'/' {
        return false;
    }

    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !digits_ok {
        return false;
    }

    match NaiveDate::parse_from_str(text, "%d/%m/%Y") {
        Ok(date) => date.year() >= 1,
        Err(_) => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================
