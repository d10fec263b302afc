//! Health-service contact types.

use crate::catalog::CatalogKind;
use crate::codes::{CareSetting, Coded, DiagnosisType, ServiceGroup, TriageClassification};
use crate::error::ValidationErrors;
use crate::validation::{check_code, optional, parse_datetime};
use chrono::NaiveDateTime;
use registry_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Raw contact input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDraft {
    pub health_provider: String,
    pub treatment_modality: String,
    pub entry_route: String,
    pub attention_reason: String,
    pub diagnosis: String,
    pub rare_disease: String,
    pub attention_started_at: String,
    pub triaged_at: String,
    pub service_group: String,
    pub care_setting: String,
    pub triage_classification: String,
    pub diagnosis_type: String,
}

/// Contact fields after format validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedContact {
    pub health_provider: String,
    pub treatment_modality: String,
    pub entry_route: String,
    pub attention_reason: String,
    pub diagnosis: String,
    pub rare_disease: Option<String>,
    pub attention_started_at: NaiveDateTime,
    pub triaged_at: NaiveDateTime,
    pub service_group: ServiceGroup,
    pub care_setting: CareSetting,
    pub triage_classification: TriageClassification,
    pub diagnosis_type: DiagnosisType,
}

impl ContactDraft {
    /// Validates every field, collecting all failures.
    pub fn validate(&self) -> Result<ValidatedContact, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let health_provider = errors.check(
            "health_provider",
            check_code(CatalogKind::HealthProvider, &self.health_provider),
        );
        let treatment_modality = errors.check(
            "treatment_modality",
            check_code(CatalogKind::TreatmentModality, &self.treatment_modality),
        );
        let entry_route = errors.check(
            "entry_route",
            check_code(CatalogKind::EntryRoute, &self.entry_route),
        );
        let attention_reason = errors.check(
            "attention_reason",
            check_code(CatalogKind::AttentionReason, &self.attention_reason),
        );
        let diagnosis = errors.check(
            "diagnosis",
            check_code(CatalogKind::Diagnosis, &self.diagnosis),
        );
        let rare_disease = match optional(&self.rare_disease) {
            None => Some(None),
            Some(raw) => errors
                .check("rare_disease", check_code(CatalogKind::RareDisease, raw))
                .map(Some),
        };
        let attention_started_at =
            errors.check("attention_started_at", parse_datetime(&self.attention_started_at));
        let triaged_at = errors.check("triaged_at", parse_datetime(&self.triaged_at));
        let service_group =
            errors.check("service_group", ServiceGroup::parse_code(&self.service_group));
        let care_setting = errors.check("care_setting", CareSetting::parse_code(&self.care_setting));
        let triage_classification = errors.check(
            "triage_classification",
            TriageClassification::parse_code(&self.triage_classification),
        );
        let diagnosis_type =
            errors.check("diagnosis_type", DiagnosisType::parse_code(&self.diagnosis_type));

        match (
            health_provider,
            treatment_modality,
            entry_route,
            attention_reason,
            diagnosis,
            rare_disease,
            attention_started_at,
            triaged_at,
            service_group,
            care_setting,
            triage_classification,
            diagnosis_type,
        ) {
            (
                Some(health_provider),
                Some(treatment_modality),
                Some(entry_route),
                Some(attention_reason),
                Some(diagnosis),
                Some(rare_disease),
                Some(attention_started_at),
                Some(triaged_at),
                Some(service_group),
                Some(care_setting),
                Some(triage_classification),
                Some(diagnosis_type),
            ) if errors.is_empty() => Ok(ValidatedContact {
                health_provider,
                treatment_modality,
                entry_route,
                attention_reason,
                diagnosis,
                rare_disease,
                attention_started_at,
                triaged_at,
                service_group,
                care_setting,
                triage_classification,
                diagnosis_type,
            }),
            _ => Err(errors),
        }
    }
}

impl ValidatedContact {
    pub fn references(&self) -> Vec<(CatalogKind, &str)> {
        let mut refs = vec![
            (CatalogKind::HealthProvider, self.health_provider.as_str()),
            (CatalogKind::TreatmentModality, self.treatment_modality.as_str()),
            (CatalogKind::EntryRoute, self.entry_route.as_str()),
            (CatalogKind::AttentionReason, self.attention_reason.as_str()),
            (CatalogKind::Diagnosis, self.diagnosis.as_str()),
        ];
        if let Some(code) = &self.rare_disease {
            refs.push((CatalogKind::RareDisease, code.as_str()));
        }
        refs
    }
}

/// A stored contact between a patient and a health service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthServiceContact {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub health_provider: String,
    pub treatment_modality: String,
    pub entry_route: String,
    pub attention_reason: String,
    pub diagnosis: String,
    pub rare_disease: Option<String>,
    pub attention_started_at: NaiveDateTime,
    pub triaged_at: NaiveDateTime,
    pub service_group: ServiceGroup,
    pub care_setting: CareSetting,
    pub triage_classification: TriageClassification,
    pub diagnosis_type: DiagnosisType,
}

impl HealthServiceContact {
    pub fn from_fields(id: RecordId, patient_id: RecordId, fields: ValidatedContact) -> Self {
        Self {
            id,
            patient_id,
            health_provider: fields.health_provider,
            treatment_modality: fields.treatment_modality,
            entry_route: fields.entry_route,
            attention_reason: fields.attention_reason,
            diagnosis: fields.diagnosis,
            rare_disease: fields.rare_disease,
            attention_started_at: fields.attention_started_at,
            triaged_at: fields.triaged_at,
            service_group: fields.service_group,
            care_setting: fields.care_setting,
            triage_classification: fields.triage_classification,
            diagnosis_type: fields.diagnosis_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ContactDraft {
        ContactDraft {
            health_provider: "EPS001".into(),
            treatment_modality: "01".into(),
            entry_route: "02".into(),
            attention_reason: "13".into(),
            diagnosis: "J450".into(),
            rare_disease: "".into(),
            attention_started_at: "2024-03-01 10:15".into(),
            triaged_at: "2024-03-01T10:05:00Z".into(),
            service_group: "01".into(),
            care_setting: "05".into(),
            triage_classification: "03".into(),
            diagnosis_type: "01".into(),
        }
    }

    #[test]
    fn valid_draft_parses_both_timestamp_styles() {
        let fields = draft().validate().unwrap();
        assert_eq!(fields.attention_started_at.to_string(), "2024-03-01 10:15:00");
        assert_eq!(fields.triaged_at.to_string(), "2024-03-01 10:05:00");
        assert_eq!(fields.triage_classification, TriageClassification::Level3);
        assert_eq!(fields.references().len(), 5);
    }

    #[test]
    fn invalid_fields_are_all_reported() {
        let bad = ContactDraft {
            diagnosis: "j45".into(),
            rare_disease: "12".into(),
            triaged_at: "soon".into(),
            care_setting: "".into(),
            ..draft()
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["diagnosis", "rare_disease", "triaged_at", "care_setting"]
        );
    }
}
