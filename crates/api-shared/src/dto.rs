//! JSON request and response bodies.
//!
//! Requests carry raw strings and convert into the core drafts, which do all validation.
//! Responses flatten core records into strings so the OpenAPI schema stays transport-only.

use registry_core::{
    AdvanceDirective, AdvanceDirectiveDraft, CatalogEntry, CatalogKind, Coded, ContactDraft,
    Diagnosis, DonationOpposition, DonationOppositionDraft, HealthProvider, HealthServiceContact,
    MembershipChange, Patient, PatientDraft, PatientPage, RegistryError, RegistryResult, Upserted,
    YesNo,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// PATIENTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PatientReq {
    pub document_number: String,
    pub first_name: String,
    pub second_name: String,
    pub first_surname: String,
    pub second_surname: String,
    /// `YYYY-MM-DD`
    pub birth_date: String,
    pub biological_sex: String,
    pub gender_identity: String,
    pub residential_zone: String,
    pub document_type: String,
    pub residence: String,
    pub occupation: String,
    pub ethnicity: String,
    pub ethnic_community: String,
    pub health_provider: String,
}

impl From<PatientReq> for PatientDraft {
    fn from(req: PatientReq) -> Self {
        PatientDraft {
            document_number: req.document_number,
            first_name: req.first_name,
            second_name: req.second_name,
            first_surname: req.first_surname,
            second_surname: req.second_surname,
            birth_date: req.birth_date,
            biological_sex: req.biological_sex,
            gender_identity: req.gender_identity,
            residential_zone: req.residential_zone,
            document_type: req.document_type,
            residence: req.residence,
            occupation: req.occupation,
            ethnicity: req.ethnicity,
            ethnic_community: req.ethnic_community,
            health_provider: req.health_provider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: String,
    pub full_name: String,
    pub document_number: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub birth_date: String,
    pub biological_sex: String,
    pub gender_identity: String,
    pub residential_zone: String,
    pub document_type: Option<String>,
    pub residence: Option<String>,
    pub occupation: Option<String>,
    pub ethnicity: Option<String>,
    pub ethnic_community: Option<String>,
    pub health_provider: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        PatientRes {
            id: p.id.to_string(),
            full_name: p.full_name(),
            birth_date: p.birth_date.format("%Y-%m-%d").to_string(),
            biological_sex: p.biological_sex.code().to_string(),
            gender_identity: p.gender_identity.code().to_string(),
            residential_zone: p.residential_zone.code().to_string(),
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
            document_number: p.document_number,
            first_name: p.first_name,
            second_name: p.second_name,
            first_surname: p.first_surname,
            second_surname: p.second_surname,
            document_type: p.document_type,
            residence: p.residence,
            occupation: p.occupation,
            ethnicity: p.ethnicity,
            ethnic_community: p.ethnic_community,
            health_provider: p.health_provider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl From<PatientPage> for ListPatientsRes {
    fn from(page: PatientPage) -> Self {
        ListPatientsRes {
            patients: page.items.into_iter().map(PatientRes::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

/// Full replacement set of catalog codes for a patient relationship.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CodesReq {
    pub codes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembershipRes {
    pub codes: Vec<String>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipRes {
    pub fn new(codes: Vec<String>, change: MembershipChange) -> Self {
        MembershipRes {
            codes,
            added: change.added,
            removed: change.removed,
        }
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct AdvanceDirectiveReq {
    /// `SI` or `NO`
    pub has_directive: String,
    pub subscribed_on: String,
    pub health_provider: String,
}

impl From<AdvanceDirectiveReq> for AdvanceDirectiveDraft {
    fn from(req: AdvanceDirectiveReq) -> Self {
        AdvanceDirectiveDraft {
            has_directive: req.has_directive,
            subscribed_on: req.subscribed_on,
            health_provider: req.health_provider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdvanceDirectiveRes {
    pub patient_id: String,
    pub has_directive: String,
    pub subscribed_on: Option<String>,
    pub health_provider: String,
}

impl From<AdvanceDirective> for AdvanceDirectiveRes {
    fn from(d: AdvanceDirective) -> Self {
        AdvanceDirectiveRes {
            patient_id: d.patient_id.to_string(),
            has_directive: d.has_directive.code().to_string(),
            subscribed_on: d.subscribed_on.map(|date| date.format("%Y-%m-%d").to_string()),
            health_provider: d.health_provider,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DonationOppositionReq {
    /// `SI` or `NO`
    pub opposes: String,
    pub subscribed_on: String,
}

impl From<DonationOppositionReq> for DonationOppositionDraft {
    fn from(req: DonationOppositionReq) -> Self {
        DonationOppositionDraft {
            opposes: req.opposes,
            subscribed_on: req.subscribed_on,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DonationOppositionRes {
    pub patient_id: String,
    pub opposes: String,
    pub subscribed_on: Option<String>,
}

impl From<DonationOpposition> for DonationOppositionRes {
    fn from(d: DonationOpposition) -> Self {
        DonationOppositionRes {
            patient_id: d.patient_id.to_string(),
            opposes: d.opposes.code().to_string(),
            subscribed_on: d.subscribed_on.map(|date| date.format("%Y-%m-%d").to_string()),
        }
    }
}

// ============================================================================
// CONTACTS
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ContactReq {
    pub health_provider: String,
    pub treatment_modality: String,
    pub entry_route: String,
    pub attention_reason: String,
    pub diagnosis: String,
    pub rare_disease: String,
    /// `YYYY-MM-DD HH:MM[:SS]`
    pub attention_started_at: String,
    pub triaged_at: String,
    pub service_group: String,
    pub care_setting: String,
    pub triage_classification: String,
    pub diagnosis_type: String,
}

impl From<ContactReq> for ContactDraft {
    fn from(req: ContactReq) -> Self {
        ContactDraft {
            health_provider: req.health_provider,
            treatment_modality: req.treatment_modality,
            entry_route: req.entry_route,
            attention_reason: req.attention_reason,
            diagnosis: req.diagnosis,
            rare_disease: req.rare_disease,
            attention_started_at: req.attention_started_at,
            triaged_at: req.triaged_at,
            service_group: req.service_group,
            care_setting: req.care_setting,
            triage_classification: req.triage_classification,
            diagnosis_type: req.diagnosis_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactRes {
    pub id: String,
    pub patient_id: String,
    pub health_provider: String,
    pub treatment_modality: String,
    pub entry_route: String,
    pub attention_reason: String,
    pub diagnosis: String,
    pub rare_disease: Option<String>,
    pub attention_started_at: String,
    pub triaged_at: String,
    pub service_group: String,
    pub care_setting: String,
    pub triage_classification: String,
    pub diagnosis_type: String,
}

impl From<HealthServiceContact> for ContactRes {
    fn from(c: HealthServiceContact) -> Self {
        ContactRes {
            id: c.id.to_string(),
            patient_id: c.patient_id.to_string(),
            attention_started_at: c.attention_started_at.format(TIMESTAMP_FORMAT).to_string(),
            triaged_at: c.triaged_at.format(TIMESTAMP_FORMAT).to_string(),
            service_group: c.service_group.code().to_string(),
            care_setting: c.care_setting.code().to_string(),
            triage_classification: c.triage_classification.code().to_string(),
            diagnosis_type: c.diagnosis_type.code().to_string(),
            health_provider: c.health_provider,
            treatment_modality: c.treatment_modality,
            entry_route: c.entry_route,
            attention_reason: c.attention_reason,
            diagnosis: c.diagnosis,
            rare_disease: c.rare_disease,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListContactsRes {
    pub contacts: Vec<ContactRes>,
}

// ============================================================================
// CATALOGS
// ============================================================================

/// One catalog row. Provider flags and the rare-disease link only appear for the catalogs
/// that have them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntryRes {
    pub kind: String,
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_eps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ips: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_arl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_insurer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rare_disease: Option<String>,
}

impl From<CatalogEntry> for CatalogEntryRes {
    fn from(entry: CatalogEntry) -> Self {
        CatalogEntryRes {
            kind: entry.kind.slug().to_string(),
            code: entry.code,
            name: entry.name,
            is_eps: None,
            is_ips: None,
            is_arl: None,
            is_insurer: None,
            rare_disease: None,
        }
    }
}

impl From<HealthProvider> for CatalogEntryRes {
    fn from(p: HealthProvider) -> Self {
        CatalogEntryRes {
            kind: CatalogKind::HealthProvider.slug().to_string(),
            is_eps: Some(p.is_eps.code().to_string()),
            is_ips: Some(p.is_ips.code().to_string()),
            is_arl: Some(p.is_arl.code().to_string()),
            is_insurer: Some(p.is_insurer.code().to_string()),
            rare_disease: None,
            code: p.code,
            name: p.name,
        }
    }
}

impl From<Diagnosis> for CatalogEntryRes {
    fn from(d: Diagnosis) -> Self {
        CatalogEntryRes {
            kind: CatalogKind::Diagnosis.slug().to_string(),
            code: d.code,
            name: d.name,
            is_eps: None,
            is_ips: None,
            is_arl: None,
            is_insurer: None,
            rare_disease: d.rare_disease,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListCatalogRes {
    pub entries: Vec<CatalogEntryRes>,
}

/// Body of a catalog upsert. The code comes from the path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CatalogUpsertReq {
    pub name: String,
    pub is_eps: Option<String>,
    pub is_ips: Option<String>,
    pub is_arl: Option<String>,
    pub is_insurer: Option<String>,
    pub rare_disease: Option<String>,
}

fn flag(field: &str, raw: Option<&str>) -> RegistryResult<YesNo> {
    let raw = raw.unwrap_or("NO");
    YesNo::parse_code(&raw.to_uppercase()).map_err(|_| RegistryError::Format {
        field: field.to_string(),
        value: raw.to_string(),
        expected: "SI or NO".into(),
    })
}

impl CatalogUpsertReq {
    pub fn into_entry(self, kind: CatalogKind, code: &str) -> CatalogEntry {
        CatalogEntry::new(kind, code, self.name)
    }

    /// Builds a provider; absent flags default to `NO`.
    pub fn into_provider(self, code: &str) -> RegistryResult<HealthProvider> {
        Ok(HealthProvider {
            code: code.to_string(),
            is_eps: flag("is_eps", self.is_eps.as_deref())?,
            is_ips: flag("is_ips", self.is_ips.as_deref())?,
            is_arl: flag("is_arl", self.is_arl.as_deref())?,
            is_insurer: flag("is_insurer", self.is_insurer.as_deref())?,
            name: self.name,
        })
    }

    pub fn into_diagnosis(self, code: &str) -> Diagnosis {
        Diagnosis {
            code: code.to_string(),
            name: self.name,
            rare_disease: self.rare_disease.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogUpsertRes {
    /// `created`, `updated` or `unchanged`
    pub outcome: String,
    pub entry: CatalogEntryRes,
}

pub fn outcome_label(outcome: Upserted) -> &'static str {
    match outcome {
        Upserted::Created => "created",
        Upserted::Updated => "updated",
        Upserted::Unchanged => "unchanged",
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldErrorRes {
    pub field: String,
    pub message: String,
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    pub fields: Vec<FieldErrorRes>,
}

impl ErrorRes {
    pub fn message(error: impl Into<String>) -> Self {
        ErrorRes {
            error: error.into(),
            fields: Vec::new(),
        }
    }
}

impl From<&RegistryError> for ErrorRes {
    fn from(err: &RegistryError) -> Self {
        let fields = match err {
            RegistryError::Validation(errors) => errors
                .iter()
                .map(|e| FieldErrorRes {
                    field: e.field.clone(),
                    message: e.message.clone(),
                })
                .collect(),
            RegistryError::Format { field, .. } | RegistryError::Name { field, .. } => {
                vec![FieldErrorRes {
                    field: field.clone(),
                    message: err.to_string(),
                }]
            }
            _ => Vec::new(),
        };
        ErrorRes {
            error: err.to_string(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::ValidationErrors;

    #[test]
    fn validation_errors_list_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("first_name", "name is required");
        errors.push("birth_date", "birth date cannot be in the future");
        let body = ErrorRes::from(&RegistryError::Validation(errors));

        let fields: Vec<_> = body.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["first_name", "birth_date"]);
        assert!(body.error.starts_with("validation failed"));
    }

    #[test]
    fn other_errors_have_no_fields() {
        let body = ErrorRes::from(&RegistryError::NotFound {
            entity: "patient",
            key: "abc".into(),
        });
        assert!(body.fields.is_empty());
        assert_eq!(body.error, "patient 'abc' not found");
    }

    #[test]
    fn provider_flags_default_to_no() {
        let req = CatalogUpsertReq {
            name: "Salud Total".into(),
            is_eps: Some("si".into()),
            ..Default::default()
        };
        let provider = req.into_provider("EPS001").unwrap();
        assert_eq!(provider.is_eps, YesNo::Yes);
        assert_eq!(provider.is_arl, YesNo::No);

        let bad = CatalogUpsertReq {
            is_ips: Some("maybe".into()),
            ..Default::default()
        };
        assert!(matches!(
            bad.into_provider("EPS001"),
            Err(RegistryError::Format { .. })
        ));
    }

    #[test]
    fn catalog_entries_skip_absent_extras() {
        let json = serde_json::to_value(CatalogEntryRes::from(CatalogEntry::new(
            CatalogKind::Country,
            "COL",
            "Colombia",
        )))
        .unwrap();
        assert_eq!(json["kind"], "country");
        assert!(json.get("is_eps").is_none());
    }
}
