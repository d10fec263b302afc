use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use registry_core::config::{database_path_from_env_value, page_size_from_env_value};
use registry_core::validation::parse_record_id;
use registry_core::{
    CatalogKind, CatalogService, Coded, ContactService, CoreConfig, Database,
    DeclarationService, PatientService,
};
use registry_import::{ImportEntity, ImportOptions, ImportSources, Importer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clinica")]
#[command(about = "Clinic patient registry CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "CLINICA_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema (idempotent)
    InitDb,
    /// Bulk import catalog and patient files (.csv, .xlsx, .xls or .json)
    Import(ImportArgs),
    /// List patients, optionally filtered by document number or name
    Patients {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one patient with everything recorded for them
    Show {
        /// Patient id (UUID, hyphens optional)
        patient_id: String,
    },
    /// Search a catalog by name
    Catalog {
        /// Catalog slug, e.g. `country` or `ethnic-community`
        kind: String,
        #[arg(long, short)]
        query: Option<String>,
    },
}

/// One optional file per entity; they are applied in dependency order whatever order they
/// are given in.
#[derive(Args, Default)]
struct ImportArgs {
    #[arg(long)]
    pais: Option<PathBuf>,
    #[arg(long)]
    municipio: Option<PathBuf>,
    #[arg(long)]
    ocupacion: Option<PathBuf>,
    #[arg(long)]
    etnia: Option<PathBuf>,
    #[arg(long)]
    comunidad: Option<PathBuf>,
    #[arg(long)]
    discapacidad: Option<PathBuf>,
    #[arg(long = "tipo-doc")]
    tipo_doc: Option<PathBuf>,
    #[arg(long = "entidad-prestadora")]
    entidad_prestadora: Option<PathBuf>,
    #[arg(long = "modalidad-tec")]
    modalidad_tec: Option<PathBuf>,
    #[arg(long = "via-ingreso")]
    via_ingreso: Option<PathBuf>,
    #[arg(long = "motivo-atencion")]
    motivo_atencion: Option<PathBuf>,
    #[arg(long = "enf-huerfana")]
    enf_huerfana: Option<PathBuf>,
    #[arg(long)]
    diagnostico: Option<PathBuf>,
    #[arg(long)]
    paciente: Option<PathBuf>,
    #[arg(long = "paciente-pais")]
    paciente_pais: Option<PathBuf>,
    #[arg(long = "paciente-discapacidad")]
    paciente_discapacidad: Option<PathBuf>,
    #[arg(long)]
    contacto: Option<PathBuf>,

    /// Validate and apply everything, then roll back
    #[arg(long)]
    dry_run: bool,
    /// Accepted for compatibility; the whole import is one transaction
    #[arg(long)]
    batch: Option<usize>,
}

impl ImportArgs {
    fn sources(&self) -> ImportSources {
        let files = [
            (ImportEntity::Country, &self.pais),
            (ImportEntity::Municipality, &self.municipio),
            (ImportEntity::Occupation, &self.ocupacion),
            (ImportEntity::Ethnicity, &self.etnia),
            (ImportEntity::EthnicCommunity, &self.comunidad),
            (ImportEntity::Disability, &self.discapacidad),
            (ImportEntity::DocumentType, &self.tipo_doc),
            (ImportEntity::HealthProvider, &self.entidad_prestadora),
            (ImportEntity::TreatmentModality, &self.modalidad_tec),
            (ImportEntity::EntryRoute, &self.via_ingreso),
            (ImportEntity::AttentionReason, &self.motivo_atencion),
            (ImportEntity::RareDisease, &self.enf_huerfana),
            (ImportEntity::Diagnosis, &self.diagnostico),
            (ImportEntity::Patient, &self.paciente),
            (ImportEntity::PatientCountry, &self.paciente_pais),
            (ImportEntity::PatientDisability, &self.paciente_discapacidad),
            (ImportEntity::Contact, &self.contacto),
        ];
        let mut sources = ImportSources::new();
        for (entity, path) in files {
            if let Some(path) = path {
                sources.insert(entity, path.clone());
            }
        }
        sources
    }

    fn options(&self) -> ImportOptions {
        ImportOptions {
            dry_run: self.dry_run,
            batch_size: self.batch,
        }
    }
}

fn open(cfg: &CoreConfig) -> anyhow::Result<Arc<Database>> {
    let db = Database::open(cfg.database_path())
        .with_context(|| format!("opening {}", cfg.database_path().display()))?;
    Ok(Arc::new(db))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("registry_import=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let database = cli
        .database
        .unwrap_or_else(|| database_path_from_env_value(None));
    let page_size = page_size_from_env_value(std::env::var("CLINICA_PAGE_SIZE").ok())?;
    let cfg = Arc::new(CoreConfig::new(database, page_size)?);

    match cli.command {
        Some(Commands::InitDb) => {
            open(&cfg)?;
            println!("Database ready at {}", cfg.database_path().display());
        }
        Some(Commands::Import(args)) => {
            let importer = Importer::new(open(&cfg)?);
            match importer.run(&args.sources(), args.options()) {
                Ok(report) => print!("{report}"),
                Err(failure) => {
                    if !failure.report.entities.is_empty() {
                        eprintln!("Completed before the failure (rolled back):");
                        eprint!("{}", failure.report);
                    }
                    return Err(failure.into());
                }
            }
        }
        Some(Commands::Patients { query, page }) => {
            let service = PatientService::new(open(&cfg)?, cfg.clone());
            let result = service.list(query.as_deref().unwrap_or(""), page)?;
            if result.items.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &result.items {
                    println!(
                        "{}  {:<20} {}  born {}",
                        patient.id,
                        patient.document_number,
                        patient.full_name(),
                        patient.birth_date
                    );
                }
                println!(
                    "page {} of {} patients ({} per page)",
                    result.page, result.total, result.page_size
                );
            }
        }
        Some(Commands::Show { patient_id }) => {
            let id = parse_record_id("patient id", &patient_id)?;
            let db = open(&cfg)?;
            let patients = PatientService::new(db.clone(), cfg.clone());
            let declarations = DeclarationService::new(db.clone());
            let contacts = ContactService::new(db);

            let patient = patients.get(id)?;
            println!("ID: {}", patient.id);
            println!("Name: {}", patient.full_name());
            println!(
                "Document: {} {}",
                patient.document_type.as_deref().unwrap_or("-"),
                patient.document_number
            );
            println!("Born: {}", patient.birth_date);
            println!(
                "Sex / gender / zone: {} / {} / {}",
                patient.biological_sex.label(),
                patient.gender_identity.label(),
                patient.residential_zone.label()
            );
            println!("Nationalities: {}", patients.nationalities(id)?.join(", "));
            println!("Disabilities: {}", patients.disabilities(id)?.join(", "));
            if let Some(d) = declarations.advance_directive(id)? {
                println!("Advance directive: {} ({})", d.has_directive, d.health_provider);
            }
            if let Some(d) = declarations.donation_opposition(id)? {
                println!("Donation opposition: {}", d.opposes);
            }
            for c in contacts.list(id)? {
                println!(
                    "Contact {}  {}  {}  diagnosis {}",
                    c.id,
                    c.attention_started_at,
                    c.health_provider,
                    c.diagnosis
                );
            }
        }
        Some(Commands::Catalog { kind, query }) => {
            let kind: CatalogKind = kind.parse().map_err(anyhow::Error::msg)?;
            let service = CatalogService::new(open(&cfg)?);
            for entry in service.search(kind, query.as_deref().unwrap_or(""))? {
                println!("{:<8} {}", entry.code, entry.name);
            }
        }
        None => {
            println!("Use 'clinica --help' for commands");
        }
    }

    Ok(())
}
