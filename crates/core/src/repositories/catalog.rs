//! Catalog storage: create-or-update by business code, lookups and name search.
//!
//! Catalog rows are never deleted through the registry; removals happen only at the
//! database level, where the schema's `ON DELETE` actions keep references consistent.

use crate::catalog::{CatalogEntry, CatalogKind, Diagnosis, HealthProvider};
use crate::db::Database;
use crate::error::{constraint_violation, RegistryError, RegistryResult};
use crate::repositories::{like_pattern, Upserted};
use crate::validation::{validate_catalog_name, validate_code};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

/// Returns true if `code` exists in the catalog.
pub fn exists(conn: &Connection, kind: CatalogKind, code: &str) -> RegistryResult<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE code = ?1", kind.table());
    Ok(conn
        .query_row(&sql, [code], |_| Ok(()))
        .optional()?
        .is_some())
}

/// Fails with [`RegistryError::Reference`] unless `code` exists in the catalog.
pub fn require(conn: &Connection, kind: CatalogKind, code: &str) -> RegistryResult<()> {
    if exists(conn, kind, code)? {
        Ok(())
    } else {
        Err(RegistryError::Reference {
            entity: kind.entity(),
            code: code.to_string(),
        })
    }
}

pub fn get_entry(
    conn: &Connection,
    kind: CatalogKind,
    code: &str,
) -> RegistryResult<Option<CatalogEntry>> {
    let sql = format!("SELECT code, name FROM {} WHERE code = ?1", kind.table());
    Ok(conn
        .query_row(&sql, [code], |row| {
            Ok(CatalogEntry {
                kind,
                code: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()?)
}

/// Case-insensitive substring search on the name, ordered by name. A blank query lists all.
pub fn search(conn: &Connection, kind: CatalogKind, query: &str) -> RegistryResult<Vec<CatalogEntry>> {
    let sql = format!(
        "SELECT code, name FROM {} WHERE fold_case(name) LIKE ?1 ESCAPE '\\' ORDER BY name COLLATE registry_name, code",
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([like_pattern(query)], |row| {
        Ok(CatalogEntry {
            kind,
            code: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn ensure_name_free(
    conn: &Connection,
    kind: CatalogKind,
    name: &str,
    code: &str,
) -> RegistryResult<()> {
    if !kind.name_unique() {
        return Ok(());
    }
    let sql = format!(
        "SELECT code FROM {} WHERE name = ?1 AND code <> ?2",
        kind.table()
    );
    let taken: Option<String> = conn
        .query_row(&sql, params![name, code], |row| row.get(0))
        .optional()?;
    match taken {
        Some(other) => {
            tracing::debug!(catalog = kind.slug(), name, taken_by = %other, "catalog name in use");
            Err(RegistryError::Uniqueness {
                entity: kind.entity(),
                key: name.to_string(),
            })
        }
        None => Ok(()),
    }
}

/// Creates or renames a catalog row keyed by its code.
///
/// For catalogs with extra columns only the name is touched; new rows get the column defaults.
pub fn upsert_entry(conn: &Connection, entry: &CatalogEntry) -> RegistryResult<Upserted> {
    let kind = entry.kind;
    let code = validate_code(kind, &entry.code)?;
    let name = validate_catalog_name(kind, &entry.name)?;
    ensure_name_free(conn, kind, &name, &code)?;

    let current = get_entry(conn, kind, &code)?;
    let outcome = match current {
        None => {
            let sql = format!("INSERT INTO {} (code, name) VALUES (?1, ?2)", kind.table());
            conn.execute(&sql, params![code, name])
                .map_err(|e| constraint_violation(e, kind.entity(), &code))?;
            Upserted::Created
        }
        Some(existing) if existing.name == name => Upserted::Unchanged,
        Some(_) => {
            let sql = format!("UPDATE {} SET name = ?2 WHERE code = ?1", kind.table());
            conn.execute(&sql, params![code, name])
                .map_err(|e| constraint_violation(e, kind.entity(), &name))?;
            Upserted::Updated
        }
    };

    tracing::debug!(catalog = kind.slug(), code = %code, ?outcome, "catalog upsert");
    Ok(outcome)
}

pub fn get_provider(conn: &Connection, code: &str) -> RegistryResult<Option<HealthProvider>> {
    Ok(conn
        .query_row(
            "SELECT code, name, is_eps, is_ips, is_arl, is_insurer FROM health_provider WHERE code = ?1",
            [code],
            |row| {
                Ok(HealthProvider {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    is_eps: row.get(2)?,
                    is_ips: row.get(3)?,
                    is_arl: row.get(4)?,
                    is_insurer: row.get(5)?,
                })
            },
        )
        .optional()?)
}

pub fn upsert_provider(conn: &Connection, provider: &HealthProvider) -> RegistryResult<Upserted> {
    let kind = CatalogKind::HealthProvider;
    let code = validate_code(kind, &provider.code)?;
    let name = validate_catalog_name(kind, &provider.name)?;
    ensure_name_free(conn, kind, &name, &code)?;

    let wanted = HealthProvider {
        code: code.clone(),
        name,
        ..provider.clone()
    };

    let outcome = match get_provider(conn, &code)? {
        Some(existing) if existing == wanted => Upserted::Unchanged,
        Some(_) => {
            conn.execute(
                "UPDATE health_provider SET name = ?2, is_eps = ?3, is_ips = ?4, is_arl = ?5, is_insurer = ?6 WHERE code = ?1",
                params![wanted.code, wanted.name, wanted.is_eps, wanted.is_ips, wanted.is_arl, wanted.is_insurer],
            )
            .map_err(|e| constraint_violation(e, kind.entity(), &wanted.name))?;
            Upserted::Updated
        }
        None => {
            conn.execute(
                "INSERT INTO health_provider (code, name, is_eps, is_ips, is_arl, is_insurer) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![wanted.code, wanted.name, wanted.is_eps, wanted.is_ips, wanted.is_arl, wanted.is_insurer],
            )
            .map_err(|e| constraint_violation(e, kind.entity(), &code))?;
            Upserted::Created
        }
    };

    tracing::debug!(code = %code, ?outcome, "health provider upsert");
    Ok(outcome)
}

pub fn get_diagnosis(conn: &Connection, code: &str) -> RegistryResult<Option<Diagnosis>> {
    Ok(conn
        .query_row(
            "SELECT code, name, rare_disease FROM diagnosis WHERE code = ?1",
            [code],
            |row| {
                Ok(Diagnosis {
                    code: row.get(0)?,
                    name: row.get(1)?,
                    rare_disease: row.get(2)?,
                })
            },
        )
        .optional()?)
}

/// Creates or updates a diagnosis. A rare-disease reference must already exist.
pub fn upsert_diagnosis(conn: &Connection, diagnosis: &Diagnosis) -> RegistryResult<Upserted> {
    let kind = CatalogKind::Diagnosis;
    let code = validate_code(kind, &diagnosis.code)?;
    let name = validate_catalog_name(kind, &diagnosis.name)?;
    let rare_disease = match diagnosis.rare_disease.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => {
            let rare = validate_code(CatalogKind::RareDisease, raw)?;
            require(conn, CatalogKind::RareDisease, &rare)?;
            Some(rare)
        }
        _ => None,
    };
    ensure_name_free(conn, kind, &name, &code)?;

    let wanted = Diagnosis {
        code: code.clone(),
        name,
        rare_disease,
    };

    let outcome = match get_diagnosis(conn, &code)? {
        Some(existing) if existing == wanted => Upserted::Unchanged,
        Some(_) => {
            conn.execute(
                "UPDATE diagnosis SET name = ?2, rare_disease = ?3 WHERE code = ?1",
                params![wanted.code, wanted.name, wanted.rare_disease],
            )
            .map_err(|e| constraint_violation(e, kind.entity(), &wanted.name))?;
            Upserted::Updated
        }
        None => {
            conn.execute(
                "INSERT INTO diagnosis (code, name, rare_disease) VALUES (?1, ?2, ?3)",
                params![wanted.code, wanted.name, wanted.rare_disease],
            )
            .map_err(|e| constraint_violation(e, kind.entity(), &code))?;
            Upserted::Created
        }
    };

    tracing::debug!(code = %code, ?outcome, "diagnosis upsert");
    Ok(outcome)
}

/// Catalog administration and lookup.
#[derive(Clone, Debug)]
pub struct CatalogService {
    db: Arc<Database>,
}

impl CatalogService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Creates or updates a plain catalog row.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Format`] if the code does not match the catalog pattern,
    /// - [`RegistryError::Name`] if the name has disallowed characters,
    /// - [`RegistryError::Uniqueness`] if another code of the same catalog already uses the name.
    pub fn upsert(&self, entry: &CatalogEntry) -> RegistryResult<Upserted> {
        let outcome = self.db.write(|tx| upsert_entry(tx, entry))?;
        tracing::info!(catalog = entry.kind.slug(), code = %entry.code.trim(), ?outcome, "catalog entry saved");
        Ok(outcome)
    }

    pub fn upsert_provider(&self, provider: &HealthProvider) -> RegistryResult<Upserted> {
        let outcome = self.db.write(|tx| upsert_provider(tx, provider))?;
        tracing::info!(
            catalog = CatalogKind::HealthProvider.slug(),
            code = %provider.code.trim(),
            ?outcome,
            "catalog entry saved"
        );
        Ok(outcome)
    }

    pub fn upsert_diagnosis(&self, diagnosis: &Diagnosis) -> RegistryResult<Upserted> {
        let outcome = self.db.write(|tx| upsert_diagnosis(tx, diagnosis))?;
        tracing::info!(
            catalog = CatalogKind::Diagnosis.slug(),
            code = %diagnosis.code.trim(),
            ?outcome,
            "catalog entry saved"
        );
        Ok(outcome)
    }

    /// Looks up one catalog row by code.
    pub fn get(&self, kind: CatalogKind, code: &str) -> RegistryResult<CatalogEntry> {
        let code = validate_code(kind, code)?;
        self.db
            .read(|conn| get_entry(conn, kind, &code))?
            .ok_or(RegistryError::NotFound {
                entity: kind.entity(),
                key: code,
            })
    }

    pub fn get_provider(&self, code: &str) -> RegistryResult<HealthProvider> {
        let code = validate_code(CatalogKind::HealthProvider, code)?;
        self.db
            .read(|conn| get_provider(conn, &code))?
            .ok_or(RegistryError::NotFound {
                entity: CatalogKind::HealthProvider.entity(),
                key: code,
            })
    }

    pub fn get_diagnosis(&self, code: &str) -> RegistryResult<Diagnosis> {
        let code = validate_code(CatalogKind::Diagnosis, code)?;
        self.db
            .read(|conn| get_diagnosis(conn, &code))?
            .ok_or(RegistryError::NotFound {
                entity: CatalogKind::Diagnosis.entity(),
                key: code,
            })
    }

    pub fn search(&self, kind: CatalogKind, query: &str) -> RegistryResult<Vec<CatalogEntry>> {
        self.db.read(|conn| search(conn, kind, query))
    }

    pub fn exists(&self, kind: CatalogKind, code: &str) -> RegistryResult<bool> {
        self.db.read(|conn| exists(conn, kind, code.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::YesNo;
    use std::io;
    use std::sync::Mutex;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn upsert_creates_then_reports_unchanged_then_updated() {
        let catalogs = service();
        let col = CatalogEntry::new(CatalogKind::Country, "COL", "Colombia");

        assert_eq!(catalogs.upsert(&col).unwrap(), Upserted::Created);
        assert_eq!(catalogs.upsert(&col).unwrap(), Upserted::Unchanged);

        let renamed = CatalogEntry::new(CatalogKind::Country, "COL", "República de Colombia");
        assert_eq!(catalogs.upsert(&renamed).unwrap(), Upserted::Updated);
        assert_eq!(
            catalogs.get(CatalogKind::Country, "COL").unwrap().name,
            "República de Colombia"
        );
    }

    #[test]
    fn malformed_code_never_reaches_storage() {
        let catalogs = service();
        let err = catalogs
            .upsert(&CatalogEntry::new(CatalogKind::Disability, "1", "Física"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Format { .. }));
        assert!(catalogs.search(CatalogKind::Disability, "").unwrap().is_empty());
    }

    #[test]
    fn duplicate_name_under_other_code_is_rejected() {
        let catalogs = service();
        catalogs
            .upsert(&CatalogEntry::new(CatalogKind::Country, "COL", "Colombia"))
            .unwrap();
        let err = catalogs
            .upsert(&CatalogEntry::new(CatalogKind::Country, "CO1", "Colombia"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Uniqueness { entity: "country", .. }));
    }

    #[test]
    fn municipality_names_may_repeat() {
        let catalogs = service();
        catalogs
            .upsert(&CatalogEntry::new(CatalogKind::Municipality, "05001", "Medellín"))
            .unwrap();
        catalogs
            .upsert(&CatalogEntry::new(CatalogKind::Municipality, "99001", "Medellín"))
            .unwrap();
        assert_eq!(catalogs.search(CatalogKind::Municipality, "medell").unwrap().len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_and_ordered() {
        let catalogs = service();
        for (code, name) in [
            ("USA", "Estados Unidos"),
            ("COL", "Colombia"),
            ("ECU", "Ecuador"),
            ("BTN", "Bután"),
        ] {
            catalogs
                .upsert(&CatalogEntry::new(CatalogKind::Country, code, name))
                .unwrap();
        }
        let all: Vec<_> = catalogs
            .search(CatalogKind::Country, "")
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        assert_eq!(all, vec!["BTN", "COL", "ECU", "USA"]);

        let hits = catalogs.search(CatalogKind::Country, "ESTADOS").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "USA");

        let hits = catalogs.search(CatalogKind::Country, "BUTÁN").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "BTN");
    }

    #[test]
    fn get_missing_code_is_not_found() {
        let catalogs = service();
        let err = catalogs.get(CatalogKind::Country, "ZZZ").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn provider_flags_round_trip() {
        let catalogs = service();
        let provider = HealthProvider {
            code: "EPS001".into(),
            name: "Salud Total".into(),
            is_eps: YesNo::Yes,
            is_ips: YesNo::No,
            is_arl: YesNo::No,
            is_insurer: YesNo::Yes,
        };
        assert_eq!(catalogs.upsert_provider(&provider).unwrap(), Upserted::Created);
        assert_eq!(catalogs.upsert_provider(&provider).unwrap(), Upserted::Unchanged);
        assert_eq!(catalogs.get_provider("EPS001").unwrap(), provider);

        let flipped = HealthProvider {
            is_ips: YesNo::Yes,
            ..provider
        };
        assert_eq!(catalogs.upsert_provider(&flipped).unwrap(), Upserted::Updated);
        assert!(catalogs.get_provider("EPS001").unwrap().is_ips.is_yes());
    }

    #[test]
    fn diagnosis_requires_existing_rare_disease() {
        let catalogs = service();
        let diagnosis = Diagnosis {
            code: "E750".into(),
            name: "Gangliosidosis GM2".into(),
            rare_disease: Some("0123".into()),
        };
        let err = catalogs.upsert_diagnosis(&diagnosis).unwrap_err();
        assert!(matches!(err, RegistryError::Reference { entity: "rare disease", .. }));

        catalogs
            .upsert(&CatalogEntry::new(CatalogKind::RareDisease, "0123", "Enfermedad de Tay Sachs"))
            .unwrap();
        assert_eq!(catalogs.upsert_diagnosis(&diagnosis).unwrap(), Upserted::Created);
        assert_eq!(
            catalogs.get_diagnosis("E750").unwrap().rare_disease.as_deref(),
            Some("0123")
        );
    }

    #[test]
    fn every_upsert_kind_logs_the_saved_entry() {
        let catalogs = service();
        let logs = captured_logs(|| {
            catalogs
                .upsert(&CatalogEntry::new(CatalogKind::RareDisease, "0123", "Enfermedad de Tay Sachs"))
                .unwrap();
            catalogs
                .upsert_provider(&HealthProvider {
                    code: "EPS001".into(),
                    name: "Salud Total".into(),
                    is_eps: YesNo::Yes,
                    is_ips: YesNo::No,
                    is_arl: YesNo::No,
                    is_insurer: YesNo::No,
                })
                .unwrap();
            catalogs
                .upsert_diagnosis(&Diagnosis {
                    code: "E750".into(),
                    name: "Gangliosidosis GM2".into(),
                    rare_disease: Some("0123".into()),
                })
                .unwrap();
        });
        assert_eq!(logs.matches("catalog entry saved").count(), 3, "{logs}");
        assert!(logs.contains("EPS001"));
        assert!(logs.contains("E750"));
    }

    #[test]
    fn deleting_rare_disease_clears_diagnosis_reference() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let catalogs = CatalogService::new(db.clone());
        catalogs
            .upsert(&CatalogEntry::new(CatalogKind::RareDisease, "0123", "Enfermedad de Tay Sachs"))
            .unwrap();
        catalogs
            .upsert_diagnosis(&Diagnosis {
                code: "E750".into(),
                name: "Gangliosidosis GM2".into(),
                rare_disease: Some("0123".into()),
            })
            .unwrap();

        db.write(|tx| {
            tx.execute("DELETE FROM rare_disease WHERE code = '0123'", [])?;
            Ok(())
        })
        .unwrap();

        let diagnosis = catalogs.get_diagnosis("E750").unwrap();
        assert_eq!(diagnosis.rare_disease, None);
    }
}
