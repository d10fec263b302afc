//! Ordered, idempotent bulk import.
//!
//! Every input file is read and its columns checked before the first write. Rows are then
//! applied entity by entity in dependency order, whatever order the files were given in,
//! inside a single transaction. Each row is an upsert through the core repositories, so it
//! goes through the same validation as an interactive edit.

use crate::entity::ImportEntity;
use crate::error::{ImportError, ImportFailure, ImportResult};
use crate::report::{EntityStats, ImportReport};
use crate::table::{read_table, Table, TableFormat, TableRow};
use chrono::Utc;
use registry_core::repositories::{catalog, contact, membership, patient};
use registry_core::validation::parse_record_id;
use registry_core::{
    CatalogEntry, CatalogKind, ContactDraft, Database, Diagnosis, HealthProvider, MembershipKind,
    PatientDraft, RegistryError, RegistryResult, Upserted, YesNo,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The files to import, at most one per entity.
#[derive(Debug, Clone, Default)]
pub struct ImportSources {
    files: BTreeMap<ImportEntity, PathBuf>,
}

impl ImportSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: ImportEntity, path: impl Into<PathBuf>) -> Self {
        self.insert(entity, path);
        self
    }

    pub fn insert(&mut self, entity: ImportEntity, path: impl Into<PathBuf>) {
        self.files.insert(entity, path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in dependency order.
    pub fn iter(&self) -> impl Iterator<Item = (ImportEntity, &Path)> {
        self.files.iter().map(|(entity, path)| (*entity, path.as_path()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Run every check and write, then roll back.
    pub dry_run: bool,
    /// Accepted for compatibility; rows are always applied in one transaction.
    pub batch_size: Option<usize>,
}

/// Loads every source and checks its columns. Performs no writes.
pub fn load_sources(sources: &ImportSources) -> ImportResult<Vec<(ImportEntity, Table)>> {
    if sources.is_empty() {
        return Err(ImportError::NoInputFiles);
    }

    let mut tables = Vec::new();
    for (entity, path) in sources.iter() {
        if !path.exists() {
            return Err(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        TableFormat::from_path(path)?;
        let table = read_table(path)?;
        let missing = table.missing_columns(entity.required_columns());
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                entity: entity.label(),
                columns: missing,
            });
        }
        tracing::debug!(entity = entity.label(), rows = table.len(), path = %path.display(), "source loaded");
        tables.push((entity, table));
    }
    Ok(tables)
}

fn parse_flag(field: &str, raw: &str) -> RegistryResult<YesNo> {
    match raw.trim().to_uppercase().as_str() {
        "SI" | "SÍ" | "TRUE" | "1" => Ok(YesNo::Yes),
        "NO" | "FALSE" | "0" => Ok(YesNo::No),
        _ => Err(RegistryError::Format {
            field: field.to_string(),
            value: raw.trim().to_string(),
            expected: "SI or NO".into(),
        }),
    }
}

fn catalog_row(
    conn: &Connection,
    entity: ImportEntity,
    kind: CatalogKind,
    row: &TableRow,
) -> RegistryResult<Upserted> {
    let columns = entity.required_columns();
    let entry = CatalogEntry::new(kind, row.get(columns[0]), row.get(columns[1]));
    catalog::upsert_entry(conn, &entry)
}

fn provider_row(conn: &Connection, row: &TableRow) -> RegistryResult<Upserted> {
    let provider = HealthProvider {
        code: row.get("codigo_entidad_prestadora").to_string(),
        name: row.get("nombre_entidad_prestadora").to_string(),
        is_eps: parse_flag("es_eps", row.get("es_eps"))?,
        is_ips: parse_flag("es_ips", row.get("es_ips"))?,
        is_arl: parse_flag("es_arl", row.get("es_arl"))?,
        is_insurer: parse_flag("es_aseguradora", row.get("es_aseguradora"))?,
    };
    catalog::upsert_provider(conn, &provider)
}

fn diagnosis_row(conn: &Connection, row: &TableRow) -> RegistryResult<Upserted> {
    let rare = row.get("codigo_enfermedad_huerfana");
    let diagnosis = Diagnosis {
        code: row.get("codigo_diagnostico").to_string(),
        name: row.get("nombre_diagnostico").to_string(),
        rare_disease: (!rare.is_empty()).then(|| rare.to_string()),
    };
    catalog::upsert_diagnosis(conn, &diagnosis)
}

fn patient_row(conn: &Connection, row: &TableRow) -> RegistryResult<Upserted> {
    let id = parse_record_id("paciente_UUID", row.get("paciente_UUID"))?;
    let draft = PatientDraft {
        document_number: row.get("numero_documento").to_string(),
        first_name: row.get("primer_nombre").to_string(),
        second_name: row.get("segundo_nombre").to_string(),
        first_surname: row.get("primer_apellido").to_string(),
        second_surname: row.get("segundo_apellido").to_string(),
        birth_date: row.get("fecha_nacimiento").to_string(),
        biological_sex: row.get("sexo_biologico").to_string(),
        gender_identity: row.get("identidad_genero").to_string(),
        residential_zone: row.get("zona_territorial_residencia").to_string(),
        document_type: row.get("tipo_documento").to_string(),
        residence: row.get("residencia").to_string(),
        occupation: row.get("ocupacion").to_string(),
        ethnicity: row.get("etnia").to_string(),
        ethnic_community: row.get("comunidad_Etnica").to_string(),
        health_provider: row.get("entidad_prestadora_salud").to_string(),
    };
    let fields = draft.validate_now()?;
    let mut outcome = patient::upsert(conn, id, &fields, Utc::now())?;

    let nationalities = row
        .get("nacionalidad")
        .split(|c: char| c == ';' || c == ',')
        .map(str::trim)
        .filter(|code| !code.is_empty());
    for code in nationalities {
        let added = membership::add_member(conn, MembershipKind::Nationality, id, code)?;
        if added == Upserted::Created && outcome == Upserted::Unchanged {
            outcome = Upserted::Updated;
        }
    }
    Ok(outcome)
}

fn membership_row(
    conn: &Connection,
    kind: MembershipKind,
    code_column: &str,
    row: &TableRow,
) -> RegistryResult<Upserted> {
    let id = parse_record_id("paciente_UUID", row.get("paciente_UUID"))?;
    membership::add_member(conn, kind, id, row.get(code_column))
}

fn contact_row(conn: &Connection, row: &TableRow) -> RegistryResult<Upserted> {
    let id = parse_record_id("contacto_UUID", row.get("contacto_UUID"))?;
    let patient_id = parse_record_id("paciente_UUID", row.get("paciente_UUID"))?;
    let draft = ContactDraft {
        health_provider: row.get("entidad_prestadora_salud").to_string(),
        treatment_modality: row.get("modalidad").to_string(),
        entry_route: row.get("via_ingreso").to_string(),
        attention_reason: row.get("motivo_atencion").to_string(),
        diagnosis: row.get("diagnostico").to_string(),
        rare_disease: row.get("enfermedad_huerfana").to_string(),
        attention_started_at: row.get("fecha_inicio_atencion").to_string(),
        triaged_at: row.get("fecha_triage").to_string(),
        service_group: row.get("grupo_servicio").to_string(),
        care_setting: row.get("entorno_atencion").to_string(),
        triage_classification: row.get("clasificacion_triage").to_string(),
        diagnosis_type: row.get("tipo_diagnostico").to_string(),
    };
    let fields = draft.validate()?;
    contact::upsert(conn, id, patient_id, fields)
}

fn apply_row(conn: &Connection, entity: ImportEntity, row: &TableRow) -> RegistryResult<Upserted> {
    if let Some(kind) = entity.plain_catalog() {
        return catalog_row(conn, entity, kind, row);
    }
    match entity {
        ImportEntity::HealthProvider => provider_row(conn, row),
        ImportEntity::Diagnosis => diagnosis_row(conn, row),
        ImportEntity::Patient => patient_row(conn, row),
        ImportEntity::PatientCountry => {
            membership_row(conn, MembershipKind::Nationality, "codigo_pais", row)
        }
        ImportEntity::PatientDisability => {
            membership_row(conn, MembershipKind::Disability, "id_discapacidad", row)
        }
        ImportEntity::Contact => contact_row(conn, row),
        other => Err(RegistryError::InvalidInput(format!(
            "no row handler for {}",
            other.label()
        ))),
    }
}

fn apply_all(
    conn: &Connection,
    tables: &[(ImportEntity, Table)],
    report: &mut ImportReport,
) -> ImportResult<()> {
    for (entity, table) in tables {
        let mut stats = EntityStats::new(entity.label());
        for (index, row) in table.rows().iter().enumerate() {
            let outcome =
                apply_row(conn, *entity, row).map_err(|source| ImportError::RowFailed {
                    entity: entity.label(),
                    row: index + 1,
                    source,
                })?;
            tracing::debug!(entity = entity.label(), row = index + 1, ?outcome, "row applied");
            stats.record(outcome);
        }
        tracing::info!(
            entity = entity.label(),
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            "entity imported"
        );
        report.entities.push(stats);
    }
    Ok(())
}

/// Runs imports against one database.
#[derive(Clone, Debug)]
pub struct Importer {
    db: Arc<Database>,
}

impl Importer {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Imports `sources`.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportFailure`] holding the error and the statistics of the entities
    /// completed before it. On failure nothing is persisted.
    pub fn run(
        &self,
        sources: &ImportSources,
        options: ImportOptions,
    ) -> Result<ImportReport, ImportFailure> {
        let tables = load_sources(sources)?;
        if let Some(batch_size) = options.batch_size {
            tracing::debug!(batch_size, "batch size ignored; rows share one transaction");
        }

        let mut report = ImportReport {
            dry_run: options.dry_run,
            entities: Vec::new(),
        };
        let outcome = if options.dry_run {
            self.db
                .rehearse_as(|tx| apply_all(tx, &tables, &mut report))
        } else {
            self.db.write_as(|tx| apply_all(tx, &tables, &mut report))
        };

        match outcome {
            Ok(()) => {
                if options.dry_run {
                    tracing::warn!(rows = report.total_rows(), "dry run complete; changes rolled back");
                } else {
                    tracing::info!(
                        rows = report.total_rows(),
                        created = report.total_created(),
                        "import committed"
                    );
                }
                Ok(report)
            }
            Err(error) => {
                tracing::warn!(%error, "import aborted; changes rolled back");
                Err(ImportFailure { report, error })
            }
        }
    }
}
