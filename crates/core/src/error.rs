//! Error taxonomy for registry operations.
//!
//! Field-level problems are collected into [`ValidationErrors`] so callers can correct every
//! field in one pass. Storage-level constraint failures are mapped onto the same taxonomy by
//! [`constraint_violation`].

use serde::Serialize;
use std::fmt;

/// One failing field and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field that failed validation, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Records the error of `result` (if any) under `field` and returns the value on success.
    pub fn check<T, E: fmt::Display>(&mut self, field: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push(field, e.to_string());
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|e| e.field.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid {field} '{value}': expected {expected}")]
    Format {
        field: String,
        value: String,
        expected: String,
    },
    #[error("invalid name for {field} '{value}': {reason}")]
    Name {
        field: String,
        value: String,
        reason: String,
    },
    #[error("{entity} '{key}' already exists")]
    Uniqueness { entity: &'static str, key: String },
    #[error("referenced {entity} '{code}' does not exist")]
    Reference { entity: &'static str, code: String },
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

impl From<ValidationErrors> for RegistryError {
    fn from(errors: ValidationErrors) -> Self {
        RegistryError::Validation(errors)
    }
}

/// Maps a SQLite constraint failure onto the registry taxonomy.
///
/// Unique and primary-key violations become [`RegistryError::Uniqueness`], foreign-key
/// violations become [`RegistryError::Reference`]. Anything else stays a database error.
pub fn constraint_violation(err: rusqlite::Error, entity: &'static str, key: &str) -> RegistryError {
    use rusqlite::ffi;

    match &err {
        rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                RegistryError::Uniqueness {
                    entity,
                    key: key.to_string(),
                }
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => RegistryError::Reference {
                entity,
                code: key.to_string(),
            },
            _ => RegistryError::Database(err),
        },
        _ => RegistryError::Database(err),
    }
}
