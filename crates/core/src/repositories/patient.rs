//! Patient storage and the patient service.
//!
//! Every write checks catalog references and document-number uniqueness before touching
//! the `patient` table, so callers get a [`RegistryError::Reference`] or
//! [`RegistryError::Uniqueness`] naming the offending value instead of a raw constraint error.

use crate::config::CoreConfig;
use crate::db::Database;
use crate::error::{constraint_violation, RegistryError, RegistryResult};
use crate::patient::{Patient, PatientDraft, ValidatedPatient};
use crate::repositories::catalog::require;
use crate::repositories::membership::{self, MembershipChange, MembershipKind};
use crate::repositories::{like_pattern, Upserted};
use chrono::{DateTime, Utc};
use registry_types::NameText;
use registry_uuid::RecordId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::sync::Arc;

const ENTITY: &str = "patient";

const COLUMNS: &str = "id, document_number, first_name, second_name, first_surname, \
    second_surname, birth_date, biological_sex, gender_identity, residential_zone, \
    document_type, residence, occupation, ethnicity, ethnic_community, health_provider, \
    created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        document_number: row.get(1)?,
        first_name: row.get(2)?,
        second_name: row.get(3)?,
        first_surname: row.get(4)?,
        second_surname: row.get(5)?,
        birth_date: row.get(6)?,
        biological_sex: row.get(7)?,
        gender_identity: row.get(8)?,
        residential_zone: row.get(9)?,
        document_type: row.get(10)?,
        residence: row.get(11)?,
        occupation: row.get(12)?,
        ethnicity: row.get(13)?,
        ethnic_community: row.get(14)?,
        health_provider: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn name_opt(name: &Option<NameText>) -> Option<&str> {
    name.as_ref().map(NameText::as_str)
}

pub fn get(conn: &Connection, id: RecordId) -> RegistryResult<Option<Patient>> {
    let sql = format!("SELECT {} FROM patient WHERE id = ?1", COLUMNS);
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Fails with [`RegistryError::NotFound`] unless the patient exists.
pub fn require_patient(conn: &Connection, id: RecordId) -> RegistryResult<()> {
    let found = conn
        .query_row("SELECT 1 FROM patient WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    match found {
        Some(()) => Ok(()),
        None => Err(RegistryError::NotFound {
            entity: ENTITY,
            key: id.to_string(),
        }),
    }
}

/// Checks that every catalog code the patient references exists.
pub fn check_references(conn: &Connection, fields: &ValidatedPatient) -> RegistryResult<()> {
    for (kind, code) in fields.references() {
        require(conn, kind, code)?;
    }
    Ok(())
}

/// Fails with [`RegistryError::Uniqueness`] if another patient holds `document_number`.
pub fn ensure_document_free(
    conn: &Connection,
    document_number: &str,
    except: Option<RecordId>,
) -> RegistryResult<()> {
    let holder: Option<RecordId> = conn
        .query_row(
            "SELECT id FROM patient WHERE document_number = ?1",
            [document_number],
            |row| row.get(0),
        )
        .optional()?;
    match holder {
        Some(other) if Some(other) != except => Err(RegistryError::Uniqueness {
            entity: ENTITY,
            key: document_number.to_string(),
        }),
        _ => Ok(()),
    }
}

fn insert_row(
    conn: &Connection,
    id: RecordId,
    fields: &ValidatedPatient,
    now: DateTime<Utc>,
) -> RegistryResult<()> {
    let sql = format!(
        "INSERT INTO patient ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?17)",
        COLUMNS
    );
    conn.execute(
        &sql,
        params![
            id,
            fields.document_number,
            fields.first_name.as_str(),
            name_opt(&fields.second_name),
            fields.first_surname.as_str(),
            name_opt(&fields.second_surname),
            fields.birth_date,
            fields.biological_sex,
            fields.gender_identity,
            fields.residential_zone,
            fields.document_type,
            fields.residence,
            fields.occupation,
            fields.ethnicity,
            fields.ethnic_community,
            fields.health_provider,
            now,
        ],
    )
    .map_err(|e| constraint_violation(e, ENTITY, &id.to_string()))?;
    Ok(())
}

fn update_row(
    conn: &Connection,
    id: RecordId,
    fields: &ValidatedPatient,
    now: DateTime<Utc>,
) -> RegistryResult<()> {
    conn.execute(
        "UPDATE patient SET document_number = ?2, first_name = ?3, second_name = ?4, \
         first_surname = ?5, second_surname = ?6, birth_date = ?7, biological_sex = ?8, \
         gender_identity = ?9, residential_zone = ?10, document_type = ?11, residence = ?12, \
         occupation = ?13, ethnicity = ?14, ethnic_community = ?15, health_provider = ?16, \
         updated_at = ?17 WHERE id = ?1",
        params![
            id,
            fields.document_number,
            fields.first_name.as_str(),
            name_opt(&fields.second_name),
            fields.first_surname.as_str(),
            name_opt(&fields.second_surname),
            fields.birth_date,
            fields.biological_sex,
            fields.gender_identity,
            fields.residential_zone,
            fields.document_type,
            fields.residence,
            fields.occupation,
            fields.ethnicity,
            fields.ethnic_community,
            fields.health_provider,
            now,
        ],
    )
    .map_err(|e| constraint_violation(e, ENTITY, &fields.document_number))?;
    Ok(())
}

/// Inserts a new patient after reference and uniqueness checks.
pub fn insert(
    conn: &Connection,
    id: RecordId,
    fields: &ValidatedPatient,
    now: DateTime<Utc>,
) -> RegistryResult<Patient> {
    check_references(conn, fields)?;
    ensure_document_free(conn, &fields.document_number, None)?;
    insert_row(conn, id, fields, now)?;
    get(conn, id)?.ok_or(RegistryError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    })
}

/// Overwrites an existing patient. `created_at` is kept.
pub fn update(
    conn: &Connection,
    id: RecordId,
    fields: &ValidatedPatient,
    now: DateTime<Utc>,
) -> RegistryResult<Patient> {
    require_patient(conn, id)?;
    check_references(conn, fields)?;
    ensure_document_free(conn, &fields.document_number, Some(id))?;
    update_row(conn, id, fields, now)?;
    get(conn, id)?.ok_or(RegistryError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    })
}

/// Creates the patient with `id`, or updates it if the stored values differ.
pub fn upsert(
    conn: &Connection,
    id: RecordId,
    fields: &ValidatedPatient,
    now: DateTime<Utc>,
) -> RegistryResult<Upserted> {
    check_references(conn, fields)?;
    match get(conn, id)? {
        None => {
            ensure_document_free(conn, &fields.document_number, None)?;
            insert_row(conn, id, fields, now)?;
            Ok(Upserted::Created)
        }
        Some(existing) if existing.matches(fields) => Ok(Upserted::Unchanged),
        Some(_) => {
            ensure_document_free(conn, &fields.document_number, Some(id))?;
            update_row(conn, id, fields, now)?;
            Ok(Upserted::Updated)
        }
    }
}

/// Deletes the patient; junction rows, declarations and contacts go with it.
pub fn delete(conn: &Connection, id: RecordId) -> RegistryResult<()> {
    let removed = conn.execute("DELETE FROM patient WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(RegistryError::NotFound {
            entity: ENTITY,
            key: id.to_string(),
        });
    }
    Ok(())
}

const SEARCH_FILTER: &str = "fold_case(document_number) LIKE ?1 ESCAPE '\\' \
    OR fold_case(first_name) LIKE ?1 ESCAPE '\\' \
    OR fold_case(coalesce(second_name, '')) LIKE ?1 ESCAPE '\\' \
    OR fold_case(first_surname) LIKE ?1 ESCAPE '\\' \
    OR fold_case(coalesce(second_surname, '')) LIKE ?1 ESCAPE '\\'";

/// Counts patients matching `query` (blank matches all).
pub fn count(conn: &Connection, query: &str) -> RegistryResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM patient WHERE {}", SEARCH_FILTER);
    let total: i64 = conn.query_row(&sql, [like_pattern(query)], |row| row.get(0))?;
    Ok(usize::try_from(total).unwrap_or_default())
}

/// Patients matching `query`, ordered by first surname then first name.
pub fn list(
    conn: &Connection,
    query: &str,
    limit: usize,
    offset: usize,
) -> RegistryResult<Vec<Patient>> {
    let sql = format!(
        "SELECT {} FROM patient WHERE {} \
         ORDER BY first_surname COLLATE registry_name, first_name COLLATE registry_name, id LIMIT ?2 OFFSET ?3",
        COLUMNS, SEARCH_FILTER
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![like_pattern(query), limit as i64, offset as i64],
        from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// One page of a patient listing.
#[derive(Debug, Clone, Serialize)]
pub struct PatientPage {
    pub items: Vec<Patient>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

// ============================================================================
// PATIENT SERVICE
// ============================================================================

/// Patient operations, each in its own transaction.
#[derive(Clone, Debug)]
pub struct PatientService {
    db: Arc<Database>,
    cfg: Arc<CoreConfig>,
}

impl PatientService {
    pub fn new(db: Arc<Database>, cfg: Arc<CoreConfig>) -> Self {
        Self { db, cfg }
    }

    /// Creates a patient with a fresh identifier.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] listing every invalid field,
    /// - [`RegistryError::Reference`] for the first catalog code that does not exist,
    /// - [`RegistryError::Uniqueness`] if the document number is taken.
    pub fn create(&self, draft: &PatientDraft) -> RegistryResult<Patient> {
        self.create_with_id(RecordId::new(), draft)
    }

    /// Creates a patient under a caller-supplied identifier.
    pub fn create_with_id(&self, id: RecordId, draft: &PatientDraft) -> RegistryResult<Patient> {
        let fields = draft.validate_now()?;
        let patient = self.db.write(|tx| insert(tx, id, &fields, Utc::now()))?;
        tracing::info!(patient_id = %patient.id, "patient created");
        Ok(patient)
    }

    pub fn get(&self, id: RecordId) -> RegistryResult<Patient> {
        self.db.read(|conn| get(conn, id))?.ok_or(RegistryError::NotFound {
            entity: ENTITY,
            key: id.to_string(),
        })
    }

    pub fn update(&self, id: RecordId, draft: &PatientDraft) -> RegistryResult<Patient> {
        let fields = draft.validate_now()?;
        let patient = self.db.write(|tx| update(tx, id, &fields, Utc::now()))?;
        tracing::info!(patient_id = %id, "patient updated");
        Ok(patient)
    }

    pub fn delete(&self, id: RecordId) -> RegistryResult<()> {
        self.db.write(|tx| delete(tx, id))?;
        tracing::info!(patient_id = %id, "patient deleted");
        Ok(())
    }

    /// Lists patients matching `query`. `page` is 1-based; 0 is treated as 1.
    pub fn list(&self, query: &str, page: usize) -> RegistryResult<PatientPage> {
        let page = page.max(1);
        let page_size = self.cfg.page_size();
        let offset = (page - 1).saturating_mul(page_size);
        self.db.read(|conn| {
            Ok(PatientPage {
                items: list(conn, query, page_size, offset)?,
                total: count(conn, query)?,
                page,
                page_size,
            })
        })
    }

    pub fn replace_nationalities(
        &self,
        id: RecordId,
        codes: &[String],
    ) -> RegistryResult<MembershipChange> {
        self.replace(MembershipKind::Nationality, id, codes)
    }

    pub fn replace_disabilities(
        &self,
        id: RecordId,
        codes: &[String],
    ) -> RegistryResult<MembershipChange> {
        self.replace(MembershipKind::Disability, id, codes)
    }

    fn replace(
        &self,
        kind: MembershipKind,
        id: RecordId,
        codes: &[String],
    ) -> RegistryResult<MembershipChange> {
        let change = self
            .db
            .write(|tx| membership::replace_members(tx, kind, id, codes))?;
        tracing::info!(
            patient_id = %id,
            kind = kind.entity(),
            added = ?change.added,
            removed = ?change.removed,
            "patient memberships replaced"
        );
        Ok(change)
    }

    pub fn nationalities(&self, id: RecordId) -> RegistryResult<Vec<String>> {
        self.members(MembershipKind::Nationality, id)
    }

    pub fn disabilities(&self, id: RecordId) -> RegistryResult<Vec<String>> {
        self.members(MembershipKind::Disability, id)
    }

    fn members(&self, kind: MembershipKind, id: RecordId) -> RegistryResult<Vec<String>> {
        self.db.read(|conn| {
            require_patient(conn, id)?;
            membership::members(conn, kind, id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogKind;
    use crate::test_support::{config, patient_draft, seeded_db};

    fn service() -> PatientService {
        PatientService::new(seeded_db(), config())
    }

    #[test]
    fn create_then_get_round_trips() {
        let patients = service();
        let created = patients.create(&patient_draft("123456789")).unwrap();
        let fetched = patients.get(created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.full_name(), "Ana María Gómez Rojas");
        assert_eq!(fetched.residence.as_deref(), Some("11001"));
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[test]
    fn duplicate_document_number_is_rejected_and_first_patient_kept() {
        let patients = service();
        let first = patients.create(&patient_draft("123456789")).unwrap();

        let mut other = patient_draft("123456789");
        other.first_name = "Luis".into();
        let err = patients.create(&other).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Uniqueness { entity: "patient", ref key } if key == "123456789"
        ));

        assert_eq!(patients.get(first.id).unwrap().first_name, "Ana");
        assert_eq!(patients.list("", 1).unwrap().total, 1);
    }

    #[test]
    fn missing_catalog_reference_names_catalog_and_code() {
        let patients = service();
        let mut draft = patient_draft("123456789");
        draft.residence = "05001".into();
        let err = patients.create(&draft).unwrap_err();
        match err {
            RegistryError::Reference { entity, code } => {
                assert_eq!(entity, CatalogKind::Municipality.entity());
                assert_eq!(code, "05001");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_draft_reports_validation_errors() {
        let patients = service();
        let mut draft = patient_draft("12");
        draft.gender_identity = "42".into();
        match patients.create(&draft).unwrap_err() {
            RegistryError::Validation(errors) => {
                assert!(errors.contains("document_number"));
                assert!(errors.contains("gender_identity"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn create_with_existing_id_is_a_uniqueness_error() {
        let patients = service();
        let id = RecordId::new();
        patients.create_with_id(id, &patient_draft("111111")).unwrap();
        let err = patients
            .create_with_id(id, &patient_draft("222222"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Uniqueness { .. }));
    }

    #[test]
    fn update_keeps_creation_time_and_checks_document_owner() {
        let patients = service();
        let ana = patients.create(&patient_draft("111111")).unwrap();
        patients.create(&patient_draft("222222")).unwrap();

        let mut changed = patient_draft("111111");
        changed.first_name = "Ana Lucía".into();
        let updated = patients.update(ana.id, &changed).unwrap();
        assert_eq!(updated.first_name, "Ana Lucía");
        assert_eq!(updated.created_at, ana.created_at);

        let err = patients
            .update(ana.id, &patient_draft("222222"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Uniqueness { .. }));
    }

    #[test]
    fn upsert_reports_created_unchanged_updated() {
        let db = seeded_db();
        let id = RecordId::new();
        let fields = patient_draft("123456789").validate_now().unwrap();
        let now = Utc::now();

        assert_eq!(db.write(|tx| upsert(tx, id, &fields, now)).unwrap(), Upserted::Created);
        assert_eq!(db.write(|tx| upsert(tx, id, &fields, now)).unwrap(), Upserted::Unchanged);

        let mut draft = patient_draft("123456789");
        draft.ethnicity = "".into();
        let changed = draft.validate_now().unwrap();
        assert_eq!(db.write(|tx| upsert(tx, id, &changed, now)).unwrap(), Upserted::Updated);
    }

    #[test]
    fn list_searches_names_and_document_and_orders_by_surname() {
        let patients = service();
        let mut zapata = patient_draft("300");
        zapata.first_surname = "Zapata".into();
        zapata.first_name = "Carlos".into();
        patients.create(&zapata).unwrap();
        let mut alvarez = patient_draft("100");
        alvarez.first_surname = "Álvarez".into();
        patients.create(&alvarez).unwrap();
        let mut bernal = patient_draft("200");
        bernal.first_surname = "Bernal".into();
        patients.create(&bernal).unwrap();

        let all = patients.list("", 1).unwrap();
        let surnames: Vec<_> = all.items.iter().map(|p| p.first_surname.as_str()).collect();
        assert_eq!(surnames, vec!["Álvarez", "Bernal", "Zapata"]);

        let hits = patients.list("CARLOS", 1).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.items[0].document_number, "300");

        assert_eq!(patients.list("200", 1).unwrap().total, 1);
    }

    #[test]
    fn search_folds_case_of_accented_names() {
        let patients = service();
        let mut alvarez = patient_draft("100");
        alvarez.first_surname = "Álvarez".into();
        patients.create(&alvarez).unwrap();
        let mut nunez = patient_draft("200");
        nunez.first_surname = "ÑÚÑEZ".into();
        patients.create(&nunez).unwrap();

        for query in ["Álvarez", "ÁLVAREZ", "álvarez", "ÁLV"] {
            let hits = patients.list(query, 1).unwrap();
            assert_eq!(hits.total, 1, "query {query}");
            assert_eq!(hits.items[0].document_number, "100");
        }
        assert_eq!(patients.list("núñez", 1).unwrap().total, 1);
    }

    #[test]
    fn list_paginates_with_configured_page_size() {
        let db = seeded_db();
        let cfg = Arc::new(CoreConfig::new(std::path::PathBuf::from(":memory:"), 2).unwrap());
        let patients = PatientService::new(db, cfg);
        for doc in ["1001", "1002", "1003"] {
            patients.create(&patient_draft(doc)).unwrap();
        }
        let second = patients.list("", 2).unwrap();
        assert_eq!(second.total, 3);
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.page_size, 2);
    }

    #[test]
    fn deleting_patient_cascades_only_its_rows() {
        let db = seeded_db();
        let patients = PatientService::new(db.clone(), config());
        let ana = patients.create(&patient_draft("111111")).unwrap();
        let luis = patients.create(&patient_draft("222222")).unwrap();
        for id in [ana.id, luis.id] {
            patients
                .replace_nationalities(id, &["COL".to_string()])
                .unwrap();
            patients.replace_disabilities(id, &["01".to_string()]).unwrap();
        }

        patients.delete(ana.id).unwrap();

        assert!(matches!(
            patients.get(ana.id).unwrap_err(),
            RegistryError::NotFound { .. }
        ));
        let remaining: i64 = db
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM patient_country) + (SELECT COUNT(*) FROM patient_disability)",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(remaining, 2);
        assert_eq!(patients.nationalities(luis.id).unwrap(), vec!["COL"]);
        assert!(matches!(
            patients.delete(ana.id).unwrap_err(),
            RegistryError::NotFound { .. }
        ));
    }

    #[test]
    fn deleting_catalog_row_clears_patient_reference() {
        let db = seeded_db();
        let patients = PatientService::new(db.clone(), config());
        let ana = patients.create(&patient_draft("111111")).unwrap();

        db.write(|tx| {
            tx.execute("DELETE FROM ethnicity WHERE code = '06'", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(patients.get(ana.id).unwrap().ethnicity, None);
    }
}
