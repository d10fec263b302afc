//! Fixtures shared by the core unit tests.

use crate::catalog::{CatalogEntry, CatalogKind, Diagnosis, HealthProvider};
use crate::codes::YesNo;
use crate::db::Database;
use crate::patient::PatientDraft;
use crate::repositories::catalog::{upsert_diagnosis, upsert_entry, upsert_provider};
use crate::CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;

/// In-memory database with a small set of catalog rows every test can reference.
pub fn seeded_db() -> Arc<Database> {
    let db = Database::open_in_memory().unwrap();
    db.write(|tx| {
        for (kind, code, name) in [
            (CatalogKind::Country, "COL", "Colombia"),
            (CatalogKind::Country, "USA", "Estados Unidos"),
            (CatalogKind::Country, "ECU", "Ecuador"),
            (CatalogKind::Municipality, "11001", "Bogotá, D.C."),
            (CatalogKind::Occupation, "2211", "Médicos generales"),
            (CatalogKind::Ethnicity, "06", "Ninguna"),
            (CatalogKind::Disability, "01", "Física"),
            (CatalogKind::Disability, "02", "Visual"),
            (CatalogKind::DocumentType, "CC", "Cédula de ciudadanía"),
            (CatalogKind::TreatmentModality, "01", "Intramural"),
            (CatalogKind::EntryRoute, "02", "Derivado de consulta externa"),
            (CatalogKind::AttentionReason, "13", "Enfermedad general"),
            (CatalogKind::RareDisease, "0123", "Enfermedad de Tay Sachs"),
        ] {
            upsert_entry(tx, &CatalogEntry::new(kind, code, name))?;
        }
        upsert_provider(
            tx,
            &HealthProvider {
                code: "EPS001".into(),
                name: "Salud Total".into(),
                is_eps: YesNo::Yes,
                is_ips: YesNo::No,
                is_arl: YesNo::No,
                is_insurer: YesNo::No,
            },
        )?;
        upsert_diagnosis(
            tx,
            &Diagnosis {
                code: "J450".into(),
                name: "Asma predominantemente alérgica".into(),
                rare_disease: None,
            },
        )?;
        Ok(())
    })
    .unwrap();
    Arc::new(db)
}

pub fn config() -> Arc<CoreConfig> {
    Arc::new(CoreConfig::new(PathBuf::from(":memory:"), 20).unwrap())
}

/// A valid patient draft referencing only seeded catalog rows.
pub fn patient_draft(document_number: &str) -> PatientDraft {
    PatientDraft {
        document_number: document_number.into(),
        first_name: "Ana".into(),
        second_name: "María".into(),
        first_surname: "Gómez".into(),
        second_surname: "Rojas".into(),
        birth_date: "1990-05-17".into(),
        biological_sex: "02".into(),
        gender_identity: "02".into(),
        residential_zone: "01".into(),
        document_type: "CC".into(),
        residence: "11001".into(),
        occupation: "2211".into(),
        ethnicity: "06".into(),
        ethnic_community: "".into(),
        health_provider: "EPS001".into(),
    }
}
