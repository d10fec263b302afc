//! # Registry Core
//!
//! Core business logic for the clinic patient registry.
//!
//! This crate contains the data model and its consistency rules:
//! - Reference catalogs keyed by pattern-checked business codes
//! - Patients, their nationalities and disabilities
//! - Advance-directive and donation-opposition declarations
//! - Health-service contacts
//! - SQLite storage with enforced foreign keys
//!
//! **No API concerns**: HTTP servers, authentication and the import command line belong in
//! `api-rest`, `api-shared`, `registry-import` and `registry-cli`.

pub mod catalog;
pub mod codes;
pub mod config;
pub mod constants;
pub mod contact;
pub mod db;
pub mod declarations;
pub mod error;
pub mod patient;
pub mod repositories;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{CatalogEntry, CatalogKind, Diagnosis, HealthProvider};
pub use codes::{
    BiologicalSex, CareSetting, Coded, DiagnosisType, GenderIdentity, ResidentialZone,
    ServiceGroup, TriageClassification, YesNo,
};
pub use config::CoreConfig;
pub use contact::{ContactDraft, HealthServiceContact, ValidatedContact};
pub use db::Database;
pub use declarations::{
    AdvanceDirective, AdvanceDirectiveDraft, DonationOpposition, DonationOppositionDraft,
};
pub use error::{FieldError, RegistryError, RegistryResult, ValidationErrors};
pub use patient::{Patient, PatientDraft, ValidatedPatient};
pub use repositories::catalog::CatalogService;
pub use repositories::contact::ContactService;
pub use repositories::declarations::DeclarationService;
pub use repositories::membership::{MembershipChange, MembershipKind};
pub use repositories::patient::{PatientPage, PatientService};
pub use repositories::Upserted;

pub use registry_types::{NameText, TextError};
pub use registry_uuid::RecordId;
