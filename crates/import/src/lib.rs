//! # Registry Import
//!
//! Bulk loading of catalogs, patients and their related rows from CSV, spreadsheet and JSON
//! files.
//!
//! One file per entity is accepted. All files are read and their required columns checked
//! before anything is written; rows are then applied in dependency order inside a single
//! transaction, so a failing row leaves the database as it was. Re-running the same files is
//! a no-op: every row is an upsert keyed by its code or identifier.
//!
//! ```no_run
//! use registry_core::Database;
//! use registry_import::{ImportEntity, ImportOptions, ImportSources, Importer};
//! use std::sync::Arc;
//!
//! let db = Arc::new(Database::open(std::path::Path::new("clinica.sqlite3"))?);
//! let sources = ImportSources::new().with(ImportEntity::Country, "pais.csv");
//! let report = Importer::new(db).run(&sources, ImportOptions::default())?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod entity;
mod error;
mod importer;
mod report;
mod table;

pub use entity::ImportEntity;
pub use error::{ImportError, ImportFailure, ImportResult};
pub use importer::{load_sources, ImportOptions, ImportSources, Importer};
pub use report::{EntityStats, ImportReport};
pub use table::{parse_json_rows, read_table, Table, TableFormat, TableRow};
