//! Declaration storage.
//!
//! Saves are single `INSERT .. ON CONFLICT (patient_id) DO UPDATE` statements against a
//! `UNIQUE(patient_id)` column, so a patient never ends up with two rows.

use crate::catalog::CatalogKind;
use crate::db::Database;
use crate::declarations::{
    AdvanceDirective, AdvanceDirectiveDraft, DonationOpposition, DonationOppositionDraft,
};
use crate::error::RegistryResult;
use crate::repositories::catalog::require;
use crate::repositories::patient::require_patient;
use registry_uuid::RecordId;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

pub fn get_advance_directive(
    conn: &Connection,
    patient: RecordId,
) -> RegistryResult<Option<AdvanceDirective>> {
    Ok(conn
        .query_row(
            "SELECT patient_id, has_directive, subscribed_on, health_provider \
             FROM advance_directive WHERE patient_id = ?1",
            [patient],
            |row| {
                Ok(AdvanceDirective {
                    patient_id: row.get(0)?,
                    has_directive: row.get(1)?,
                    subscribed_on: row.get(2)?,
                    health_provider: row.get(3)?,
                })
            },
        )
        .optional()?)
}

pub fn save_advance_directive(
    conn: &Connection,
    directive: &AdvanceDirective,
) -> RegistryResult<()> {
    require_patient(conn, directive.patient_id)?;
    require(conn, CatalogKind::HealthProvider, &directive.health_provider)?;
    conn.execute(
        "INSERT INTO advance_directive (patient_id, has_directive, subscribed_on, health_provider) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (patient_id) DO UPDATE SET \
             has_directive = excluded.has_directive, \
             subscribed_on = excluded.subscribed_on, \
             health_provider = excluded.health_provider",
        params![
            directive.patient_id,
            directive.has_directive,
            directive.subscribed_on,
            directive.health_provider
        ],
    )?;
    Ok(())
}

pub fn get_donation_opposition(
    conn: &Connection,
    patient: RecordId,
) -> RegistryResult<Option<DonationOpposition>> {
    Ok(conn
        .query_row(
            "SELECT patient_id, opposes, subscribed_on FROM donation_opposition WHERE patient_id = ?1",
            [patient],
            |row| {
                Ok(DonationOpposition {
                    patient_id: row.get(0)?,
                    opposes: row.get(1)?,
                    subscribed_on: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn save_donation_opposition(
    conn: &Connection,
    opposition: &DonationOpposition,
) -> RegistryResult<()> {
    require_patient(conn, opposition.patient_id)?;
    conn.execute(
        "INSERT INTO donation_opposition (patient_id, opposes, subscribed_on) VALUES (?1, ?2, ?3) \
         ON CONFLICT (patient_id) DO UPDATE SET \
             opposes = excluded.opposes, \
             subscribed_on = excluded.subscribed_on",
        params![
            opposition.patient_id,
            opposition.opposes,
            opposition.subscribed_on
        ],
    )?;
    Ok(())
}

/// Reads and saves patient declarations.
#[derive(Clone, Debug)]
pub struct DeclarationService {
    db: Arc<Database>,
}

impl DeclarationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The patient's advance directive, if one was recorded.
    pub fn advance_directive(&self, patient: RecordId) -> RegistryResult<Option<AdvanceDirective>> {
        self.db.read(|conn| {
            require_patient(conn, patient)?;
            get_advance_directive(conn, patient)
        })
    }

    /// Creates the patient's advance directive or overwrites the existing one.
    pub fn save_advance_directive(
        &self,
        patient: RecordId,
        draft: &AdvanceDirectiveDraft,
    ) -> RegistryResult<AdvanceDirective> {
        let directive = draft.validate(patient, chrono::Local::now().date_naive())?;
        self.db.write(|tx| save_advance_directive(tx, &directive))?;
        tracing::info!(patient_id = %patient, has_directive = %directive.has_directive, "advance directive saved");
        Ok(directive)
    }

    pub fn donation_opposition(
        &self,
        patient: RecordId,
    ) -> RegistryResult<Option<DonationOpposition>> {
        self.db.read(|conn| {
            require_patient(conn, patient)?;
            get_donation_opposition(conn, patient)
        })
    }

    pub fn save_donation_opposition(
        &self,
        patient: RecordId,
        draft: &DonationOppositionDraft,
    ) -> RegistryResult<DonationOpposition> {
        let opposition = draft.validate(patient, chrono::Local::now().date_naive())?;
        self.db.write(|tx| save_donation_opposition(tx, &opposition))?;
        tracing::info!(patient_id = %patient, opposes = %opposition.opposes, "donation opposition saved");
        Ok(opposition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::YesNo;
    use crate::error::RegistryError;
    use crate::repositories::patient::PatientService;
    use crate::test_support::{config, patient_draft, seeded_db};

    fn directive(has: &str) -> AdvanceDirectiveDraft {
        AdvanceDirectiveDraft {
            has_directive: has.into(),
            subscribed_on: "2023-02-10".into(),
            health_provider: "EPS001".into(),
        }
    }

    #[test]
    fn saving_twice_updates_the_single_row() {
        let db = seeded_db();
        let patient = PatientService::new(db.clone(), config())
            .create(&patient_draft("123456789"))
            .unwrap();
        let declarations = DeclarationService::new(db.clone());

        assert_eq!(declarations.advance_directive(patient.id).unwrap(), None);
        declarations
            .save_advance_directive(patient.id, &directive("SI"))
            .unwrap();
        declarations
            .save_advance_directive(patient.id, &directive("NO"))
            .unwrap();

        let stored = declarations.advance_directive(patient.id).unwrap().unwrap();
        assert_eq!(stored.has_directive, YesNo::No);
        assert_eq!(
            stored.subscribed_on,
            chrono::NaiveDate::from_ymd_opt(2023, 2, 10)
        );

        let rows: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM advance_directive", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn directive_requires_existing_provider() {
        let db = seeded_db();
        let patient = PatientService::new(db.clone(), config())
            .create(&patient_draft("123456789"))
            .unwrap();
        let declarations = DeclarationService::new(db);

        let mut draft = directive("SI");
        draft.health_provider = "ARL999".into();
        let err = declarations
            .save_advance_directive(patient.id, &draft)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reference { entity: "health provider", .. }));
    }

    #[test]
    fn donation_opposition_round_trips_and_cascades() {
        let db = seeded_db();
        let patients = PatientService::new(db.clone(), config());
        let patient = patients.create(&patient_draft("123456789")).unwrap();
        let declarations = DeclarationService::new(db.clone());

        declarations
            .save_donation_opposition(
                patient.id,
                &DonationOppositionDraft {
                    opposes: "SI".into(),
                    subscribed_on: "".into(),
                },
            )
            .unwrap();
        declarations
            .save_advance_directive(patient.id, &directive("SI"))
            .unwrap();
        assert!(declarations
            .donation_opposition(patient.id)
            .unwrap()
            .unwrap()
            .opposes
            .is_yes());

        patients.delete(patient.id).unwrap();
        let rows: i64 = db
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT (SELECT COUNT(*) FROM advance_directive) + (SELECT COUNT(*) FROM donation_opposition)",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn unknown_patient_is_not_found() {
        let declarations = DeclarationService::new(seeded_db());
        let err = declarations.advance_directive(RecordId::new()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }
}
