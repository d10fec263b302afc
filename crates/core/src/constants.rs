//! Constants used throughout the registry core crate.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "clinica.sqlite3";

/// Default number of patients returned per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound accepted for a configured page size.
pub const MAX_PAGE_SIZE: usize = 500;

/// Maximum length of a catalog name.
pub const CATALOG_NAME_MAX_LEN: usize = 200;

/// Punctuation accepted in catalog names besides letters, digits and spaces.
pub const CATALOG_NAME_PUNCTUATION: &str = ".,-()/'";

/// Accepted input formats for dates (`fecha_nacimiento`, subscription dates).
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d"];

/// Accepted input formats for timestamps (attention start, triage time, date-time birth dates).
pub const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Earliest birth date accepted for a patient.
pub const MIN_BIRTH_YEAR: i32 = 1900;
