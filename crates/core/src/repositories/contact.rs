//! Health-service contact storage and service.
//!
//! Every lookup is scoped by both the patient and the contact identifier; a contact that
//! belongs to another patient is reported as not found.

use crate::contact::{ContactDraft, HealthServiceContact, ValidatedContact};
use crate::db::Database;
use crate::error::{constraint_violation, RegistryError, RegistryResult};
use crate::repositories::catalog::require;
use crate::repositories::patient::require_patient;
use crate::repositories::Upserted;
use registry_uuid::RecordId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const ENTITY: &str = "health service contact";

const COLUMNS: &str = "id, patient_id, health_provider, treatment_modality, entry_route, \
    attention_reason, diagnosis, rare_disease, attention_started_at, triaged_at, \
    service_group, care_setting, triage_classification, diagnosis_type";

fn from_row(row: &Row<'_>) -> rusqlite::Result<HealthServiceContact> {
    Ok(HealthServiceContact {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        health_provider: row.get(2)?,
        treatment_modality: row.get(3)?,
        entry_route: row.get(4)?,
        attention_reason: row.get(5)?,
        diagnosis: row.get(6)?,
        rare_disease: row.get(7)?,
        attention_started_at: row.get(8)?,
        triaged_at: row.get(9)?,
        service_group: row.get(10)?,
        care_setting: row.get(11)?,
        triage_classification: row.get(12)?,
        diagnosis_type: row.get(13)?,
    })
}

fn not_found(id: RecordId) -> RegistryError {
    RegistryError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    }
}

pub fn check_references(conn: &Connection, fields: &ValidatedContact) -> RegistryResult<()> {
    for (kind, code) in fields.references() {
        require(conn, kind, code)?;
    }
    Ok(())
}

/// Looks up a contact by id alone.
pub fn find(conn: &Connection, id: RecordId) -> RegistryResult<Option<HealthServiceContact>> {
    let sql = format!("SELECT {} FROM health_service_contact WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Looks up a contact of the given patient.
pub fn get(
    conn: &Connection,
    patient: RecordId,
    id: RecordId,
) -> RegistryResult<Option<HealthServiceContact>> {
    let sql = format!(
        "SELECT {} FROM health_service_contact WHERE id = ?1 AND patient_id = ?2",
        COLUMNS
    );
    Ok(conn.query_row(&sql, [id, patient], from_row).optional()?)
}

/// The patient's contacts, most recent attention first.
pub fn list(conn: &Connection, patient: RecordId) -> RegistryResult<Vec<HealthServiceContact>> {
    let sql = format!(
        "SELECT {} FROM health_service_contact WHERE patient_id = ?1 \
         ORDER BY attention_started_at DESC, id",
        COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([patient], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn insert_row(conn: &Connection, contact: &HealthServiceContact) -> RegistryResult<()> {
    let sql = format!(
        "INSERT INTO health_service_contact ({}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        COLUMNS
    );
    conn.execute(
        &sql,
        params![
            contact.id,
            contact.patient_id,
            contact.health_provider,
            contact.treatment_modality,
            contact.entry_route,
            contact.attention_reason,
            contact.diagnosis,
            contact.rare_disease,
            contact.attention_started_at,
            contact.triaged_at,
            contact.service_group,
            contact.care_setting,
            contact.triage_classification,
            contact.diagnosis_type,
        ],
    )
    .map_err(|e| constraint_violation(e, ENTITY, &contact.id.to_string()))?;
    Ok(())
}

fn update_row(conn: &Connection, contact: &HealthServiceContact) -> RegistryResult<()> {
    conn.execute(
        "UPDATE health_service_contact SET patient_id = ?2, health_provider = ?3, \
         treatment_modality = ?4, entry_route = ?5, attention_reason = ?6, diagnosis = ?7, \
         rare_disease = ?8, attention_started_at = ?9, triaged_at = ?10, service_group = ?11, \
         care_setting = ?12, triage_classification = ?13, diagnosis_type = ?14 WHERE id = ?1",
        params![
            contact.id,
            contact.patient_id,
            contact.health_provider,
            contact.treatment_modality,
            contact.entry_route,
            contact.attention_reason,
            contact.diagnosis,
            contact.rare_disease,
            contact.attention_started_at,
            contact.triaged_at,
            contact.service_group,
            contact.care_setting,
            contact.triage_classification,
            contact.diagnosis_type,
        ],
    )
    .map_err(|e| constraint_violation(e, ENTITY, &contact.id.to_string()))?;
    Ok(())
}

pub fn insert(conn: &Connection, contact: &HealthServiceContact, fields: &ValidatedContact) -> RegistryResult<()> {
    require_patient(conn, contact.patient_id)?;
    check_references(conn, fields)?;
    insert_row(conn, contact)
}

/// Creates or updates a contact keyed by its own id. The owning patient may change.
pub fn upsert(
    conn: &Connection,
    id: RecordId,
    patient: RecordId,
    fields: ValidatedContact,
) -> RegistryResult<Upserted> {
    require_patient(conn, patient)?;
    check_references(conn, &fields)?;
    let wanted = HealthServiceContact::from_fields(id, patient, fields);
    match find(conn, id)? {
        None => {
            insert_row(conn, &wanted)?;
            Ok(Upserted::Created)
        }
        Some(existing) if existing == wanted => Ok(Upserted::Unchanged),
        Some(_) => {
            update_row(conn, &wanted)?;
            Ok(Upserted::Updated)
        }
    }
}

/// Contact operations scoped to one patient.
#[derive(Clone, Debug)]
pub struct ContactService {
    db: Arc<Database>,
}

impl ContactService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create(
        &self,
        patient: RecordId,
        draft: &ContactDraft,
    ) -> RegistryResult<HealthServiceContact> {
        let fields = draft.validate()?;
        let contact = HealthServiceContact::from_fields(RecordId::new(), patient, fields.clone());
        self.db.write(|tx| insert(tx, &contact, &fields))?;
        tracing::info!(patient_id = %patient, contact_id = %contact.id, "contact created");
        Ok(contact)
    }

    pub fn get(&self, patient: RecordId, id: RecordId) -> RegistryResult<HealthServiceContact> {
        self.db
            .read(|conn| get(conn, patient, id))?
            .ok_or_else(|| not_found(id))
    }

    pub fn list(&self, patient: RecordId) -> RegistryResult<Vec<HealthServiceContact>> {
        self.db.read(|conn| {
            require_patient(conn, patient)?;
            list(conn, patient)
        })
    }

    pub fn update(
        &self,
        patient: RecordId,
        id: RecordId,
        draft: &ContactDraft,
    ) -> RegistryResult<HealthServiceContact> {
        let fields = draft.validate()?;
        let contact = HealthServiceContact::from_fields(id, patient, fields.clone());
        self.db.write(|tx| {
            if get(tx, patient, id)?.is_none() {
                return Err(not_found(id));
            }
            check_references(tx, &fields)?;
            update_row(tx, &contact)
        })?;
        tracing::info!(patient_id = %patient, contact_id = %id, "contact updated");
        Ok(contact)
    }

    pub fn delete(&self, patient: RecordId, id: RecordId) -> RegistryResult<()> {
        let removed = self.db.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM health_service_contact WHERE id = ?1 AND patient_id = ?2",
                [id, patient],
            )?)
        })?;
        if removed == 0 {
            return Err(not_found(id));
        }
        tracing::info!(patient_id = %patient, contact_id = %id, "contact deleted");
        Ok(())
    }
}
