//! Patient nationalities and disabilities.
//!
//! Both are junction tables keyed by `(patient_id, code)`. A replacement computes the
//! difference against the stored set and applies removals and additions in the caller's
//! transaction, so a failure leaves the previous set in place.

use crate::catalog::CatalogKind;
use crate::error::{constraint_violation, RegistryResult};
use crate::repositories::catalog::require;
use crate::repositories::patient::require_patient;
use crate::repositories::Upserted;
use crate::validation::validate_code;
use registry_uuid::RecordId;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::BTreeSet;

/// The multi-valued patient attributes stored in junction tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipKind {
    Nationality,
    Disability,
}

impl MembershipKind {
    fn table(self) -> &'static str {
        match self {
            MembershipKind::Nationality => "patient_country",
            MembershipKind::Disability => "patient_disability",
        }
    }

    fn column(self) -> &'static str {
        match self {
            MembershipKind::Nationality => "country",
            MembershipKind::Disability => "disability",
        }
    }

    pub fn catalog(self) -> CatalogKind {
        match self {
            MembershipKind::Nationality => CatalogKind::Country,
            MembershipKind::Disability => CatalogKind::Disability,
        }
    }

    pub fn entity(self) -> &'static str {
        match self {
            MembershipKind::Nationality => "patient nationality",
            MembershipKind::Disability => "patient disability",
        }
    }
}

/// Codes added and removed by a replacement, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Current codes for the patient, sorted.
pub fn members(conn: &Connection, kind: MembershipKind, patient: RecordId) -> RegistryResult<Vec<String>> {
    let sql = format!(
        "SELECT {col} FROM {table} WHERE patient_id = ?1 ORDER BY {col}",
        col = kind.column(),
        table = kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([patient], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_member(conn: &Connection, kind: MembershipKind, patient: RecordId, code: &str) -> RegistryResult<()> {
    let sql = format!(
        "INSERT INTO {} (patient_id, {}) VALUES (?1, ?2)",
        kind.table(),
        kind.column()
    );
    conn.execute(&sql, params![patient, code])
        .map_err(|e| constraint_violation(e, kind.entity(), code))?;
    Ok(())
}

/// Replaces the patient's set with `codes`. Duplicates in `codes` are collapsed.
///
/// Every code is checked (format, then existence) before the first write.
pub fn replace_members(
    conn: &Connection,
    kind: MembershipKind,
    patient: RecordId,
    codes: &[String],
) -> RegistryResult<MembershipChange> {
    require_patient(conn, patient)?;

    let mut wanted = BTreeSet::new();
    for raw in codes {
        wanted.insert(validate_code(kind.catalog(), raw)?);
    }
    for code in &wanted {
        require(conn, kind.catalog(), code)?;
    }

    let current: BTreeSet<String> = members(conn, kind, patient)?.into_iter().collect();
    let change = MembershipChange {
        added: wanted.difference(&current).cloned().collect(),
        removed: current.difference(&wanted).cloned().collect(),
    };

    let delete_sql = format!(
        "DELETE FROM {} WHERE patient_id = ?1 AND {} = ?2",
        kind.table(),
        kind.column()
    );
    for code in &change.removed {
        conn.execute(&delete_sql, params![patient, code])?;
    }
    for code in &change.added {
        insert_member(conn, kind, patient, code)?;
    }

    tracing::debug!(
        patient_id = %patient,
        kind = kind.entity(),
        added = change.added.len(),
        removed = change.removed.len(),
        "membership replaced"
    );
    Ok(change)
}

/// Adds one code to the patient's set if it is not already there.
pub fn add_member(
    conn: &Connection,
    kind: MembershipKind,
    patient: RecordId,
    raw_code: &str,
) -> RegistryResult<Upserted> {
    require_patient(conn, patient)?;
    let code = validate_code(kind.catalog(), raw_code)?;
    require(conn, kind.catalog(), &code)?;

    let sql = format!(
        "SELECT 1 FROM {} WHERE patient_id = ?1 AND {} = ?2",
        kind.table(),
        kind.column()
    );
    let present = conn
        .query_row(&sql, params![patient, code], |_| Ok(()))
        .optional()?
        .is_some();
    if present {
        return Ok(Upserted::Unchanged);
    }
    insert_member(conn, kind, patient, &code)?;
    Ok(Upserted::Created)
}
