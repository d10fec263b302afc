//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Services never read process-wide environment variables while handling a request.

use crate::constants::{DEFAULT_DATABASE_PATH, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{RegistryError, RegistryResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
    page_size: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidInput` if the database path is empty or the page size
    /// is zero or above [`MAX_PAGE_SIZE`].
    pub fn new(database_path: PathBuf, page_size: usize) -> RegistryResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(RegistryError::InvalidInput(
                "database path cannot be empty".into(),
            ));
        }

        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(RegistryError::InvalidInput(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            database_path,
            page_size,
        })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Resolve the database path from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATABASE_PATH`].
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}

/// Parse the listing page size from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PAGE_SIZE`].
pub fn page_size_from_env_value(value: Option<String>) -> RegistryResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_PAGE_SIZE),
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| RegistryError::InvalidInput(format!("invalid page size: '{}'", v))),
    }
}
