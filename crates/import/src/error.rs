use crate::report::ImportReport;
use registry_core::RegistryError;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no input files given; pass at least one entity file")]
    NoInputFiles,
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("unsupported file format '{extension}' for {}; expected .csv, .xlsx, .xls or .json", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("{entity}: missing required columns: {}", columns.join(", "))]
    MissingColumns {
        entity: &'static str,
        columns: Vec<String>,
    },
    #[error("{}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("{entity} row {row}: {source}")]
    RowFailed {
        entity: &'static str,
        row: usize,
        #[source]
        source: RegistryError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type ImportResult<T> = std::result::Result<T, ImportError>;

/// An aborted import: the error plus the statistics of the entities completed before it.
///
/// Nothing in `report` was persisted; the whole run shares one rolled-back transaction.
#[derive(Debug)]
pub struct ImportFailure {
    pub report: ImportReport,
    pub error: ImportError,
}

impl fmt::Display for ImportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import aborted: {}", self.error)
    }
}

impl std::error::Error for ImportFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ImportError> for ImportFailure {
    fn from(error: ImportError) -> Self {
        Self {
            report: ImportReport::default(),
            error,
        }
    }
}
