//! Surrogate record identifiers.
//!
//! Patients and health-service contacts are keyed by a random token rather than a business
//! code. The registry uses a *canonical* UUID representation for those tokens:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Notes:
//! - This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! - Externally supplied identifiers (CLI arguments, REST paths, import files) may also be
//!   hyphenated or uppercase; [`RecordId::parse`] normalises them to canonical form.
//! - Values of the wrong length or with non-hex characters are rejected.

mod record_id;

pub use record_id::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
