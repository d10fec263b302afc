//! SQLite storage: connection handling, schema and transactions.
//!
//! A [`Database`] owns a single connection behind a mutex. Every write runs inside one
//! immediate transaction, which is committed when the closure succeeds and rolled back
//! otherwise. Foreign keys are enforced on every connection.

use crate::catalog::CatalogKind;
use crate::{RegistryError, RegistryResult};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PATIENT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS health_provider (
    code           TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    is_eps         TEXT NOT NULL DEFAULT 'NO' CHECK (is_eps IN ('SI', 'NO')),
    is_ips         TEXT NOT NULL DEFAULT 'NO' CHECK (is_ips IN ('SI', 'NO')),
    is_arl         TEXT NOT NULL DEFAULT 'NO' CHECK (is_arl IN ('SI', 'NO')),
    is_insurer     TEXT NOT NULL DEFAULT 'NO' CHECK (is_insurer IN ('SI', 'NO'))
);

CREATE TABLE IF NOT EXISTS diagnosis (
    code           TEXT PRIMARY KEY,
    name           TEXT NOT NULL UNIQUE,
    rare_disease   TEXT REFERENCES rare_disease(code) ON DELETE SET NULL
);

CREATE TABLE IF NOT EXISTS patient (
    id                  TEXT PRIMARY KEY,
    document_number     TEXT NOT NULL UNIQUE,
    first_name          TEXT NOT NULL,
    second_name         TEXT,
    first_surname       TEXT NOT NULL,
    second_surname      TEXT,
    birth_date          TEXT NOT NULL,
    biological_sex      TEXT NOT NULL,
    gender_identity     TEXT NOT NULL,
    residential_zone    TEXT NOT NULL,
    document_type       TEXT REFERENCES document_type(code) ON DELETE SET NULL,
    residence           TEXT REFERENCES municipality(code) ON DELETE SET NULL,
    occupation          TEXT REFERENCES occupation(code) ON DELETE SET NULL,
    ethnicity           TEXT REFERENCES ethnicity(code) ON DELETE SET NULL,
    ethnic_community    TEXT REFERENCES ethnic_community(code) ON DELETE SET NULL,
    health_provider     TEXT REFERENCES health_provider(code) ON DELETE SET NULL,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patient_surname ON patient(first_surname, first_name);

CREATE TABLE IF NOT EXISTS patient_country (
    id          INTEGER PRIMARY KEY,
    patient_id  TEXT NOT NULL REFERENCES patient(id) ON DELETE CASCADE,
    country     TEXT NOT NULL REFERENCES country(code) ON DELETE CASCADE,
    UNIQUE (patient_id, country)
);

CREATE TABLE IF NOT EXISTS patient_disability (
    id          INTEGER PRIMARY KEY,
    patient_id  TEXT NOT NULL REFERENCES patient(id) ON DELETE CASCADE,
    disability  TEXT NOT NULL REFERENCES disability(code) ON DELETE CASCADE,
    UNIQUE (patient_id, disability)
);

CREATE TABLE IF NOT EXISTS advance_directive (
    id               INTEGER PRIMARY KEY,
    patient_id       TEXT NOT NULL UNIQUE REFERENCES patient(id) ON DELETE CASCADE,
    has_directive    TEXT NOT NULL CHECK (has_directive IN ('SI', 'NO')),
    subscribed_on    TEXT,
    health_provider  TEXT NOT NULL REFERENCES health_provider(code) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS donation_opposition (
    id               INTEGER PRIMARY KEY,
    patient_id       TEXT NOT NULL UNIQUE REFERENCES patient(id) ON DELETE CASCADE,
    opposes          TEXT NOT NULL CHECK (opposes IN ('SI', 'NO')),
    subscribed_on    TEXT
);

CREATE TABLE IF NOT EXISTS health_service_contact (
    id                     TEXT PRIMARY KEY,
    patient_id             TEXT NOT NULL REFERENCES patient(id) ON DELETE CASCADE,
    health_provider        TEXT NOT NULL REFERENCES health_provider(code) ON DELETE CASCADE,
    treatment_modality     TEXT NOT NULL REFERENCES treatment_modality(code) ON DELETE CASCADE,
    entry_route            TEXT NOT NULL REFERENCES entry_route(code) ON DELETE CASCADE,
    attention_reason       TEXT NOT NULL REFERENCES attention_reason(code) ON DELETE CASCADE,
    diagnosis              TEXT NOT NULL REFERENCES diagnosis(code) ON DELETE CASCADE,
    rare_disease           TEXT REFERENCES rare_disease(code) ON DELETE SET NULL,
    attention_started_at   TEXT NOT NULL,
    triaged_at             TEXT NOT NULL,
    service_group          TEXT NOT NULL,
    care_setting           TEXT NOT NULL,
    triage_classification  TEXT NOT NULL,
    diagnosis_type         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contact_patient_start
    ON health_service_contact(patient_id, attention_started_at);
"#;

/// Builds the full schema: one plain `(code, name)` table per simple catalog followed by
/// the tables with extra columns and the patient-side tables.
fn schema_sql() -> String {
    let mut sql = String::new();
    for kind in CatalogKind::ALL {
        if kind.has_extra_columns() {
            continue;
        }
        let unique = if kind.name_unique() { " UNIQUE" } else { "" };
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    code TEXT PRIMARY KEY,\n    name TEXT NOT NULL{}\n);\n",
            kind.table(),
            unique
        ));
    }
    sql.push_str(PATIENT_SCHEMA);
    sql
}

/// SQL function lowercasing with full Unicode rules; SQLite's `lower()` only folds ASCII.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Collation ordering names alphabetically, ignoring case and accents.
pub const NAME_COLLATION: &str = "registry_name";

/// Lowercases `text` and strips the acute accent and diaeresis from vowels, so that
/// `Álvarez` files under `a`.
pub fn name_sort_key(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            other => other,
        })
        .collect()
}

fn compare_names(a: &str, b: &str) -> Ordering {
    name_sort_key(a)
        .cmp(&name_sort_key(b))
        .then_with(|| a.cmp(b))
}

fn register_text_functions(conn: &Connection) -> RegistryResult<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )?;
    conn.create_collation(NAME_COLLATION, compare_names)?;
    Ok(())
}

/// Handle to the registry database.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (creating if needed) the database file at `path` and applies the schema.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn open_in_memory() -> RegistryResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> RegistryResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        register_text_functions(&conn)?;
        conn.execute_batch(&schema_sql())?;
        tracing::debug!("database schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> RegistryResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Runs a read-only closure against the connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> RegistryResult<T>) -> RegistryResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Runs `f` inside one immediate transaction, committing only if `f` succeeds.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        self.write_as(f)
    }

    /// [`Database::write`] for callers that abort with their own error type.
    pub fn write_as<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RegistryError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RegistryError::from)?;
        let out = f(&tx)?;
        tx.commit().map_err(RegistryError::from)?;
        Ok(out)
    }

    /// Runs `f` inside one transaction that is always rolled back.
    ///
    /// Every statement executes (so constraint checks fire) but nothing is persisted.
    pub fn rehearse<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        self.rehearse_as(f)
    }

    /// [`Database::rehearse`] for callers that abort with their own error type.
    pub fn rehearse_as<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RegistryError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RegistryError::from)?;
        let out = f(&tx);
        tx.rollback().map_err(RegistryError::from)?;
        out
    }
}
