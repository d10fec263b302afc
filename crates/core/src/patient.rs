//! Patient types.
//!
//! A [`PatientDraft`] carries raw input exactly as it arrives from a form, a JSON body or an
//! import row. [`PatientDraft::validate`] turns it into a [`ValidatedPatient`] or reports every
//! failing field at once. [`Patient`] is the stored record.

use crate::catalog::CatalogKind;
use crate::codes::{BiologicalSex, Coded, GenderIdentity, ResidentialZone};
use crate::error::ValidationErrors;
use crate::validation::{check_code, check_document_number, optional, parse_birth_date};
use chrono::{DateTime, NaiveDate, Utc};
use registry_types::NameText;
use registry_uuid::RecordId;
use serde::{Deserialize, Serialize};

/// Raw patient input. Every field is a string; blank means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientDraft {
    pub document_number: String,
    pub first_name: String,
    pub second_name: String,
    pub first_surname: String,
    pub second_surname: String,
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

/// Patient fields after format validation. Catalog codes match their pattern but have not
/// yet been checked against storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPatient {
    pub document_number: String,
    pub first_name: NameText,
    pub second_name: Option<NameText>,
    pub first_surname: NameText,
    pub second_surname: Option<NameText>,
    pub birth_date: NaiveDate,
    pub biological_sex: BiologicalSex,
    pub gender_identity: GenderIdentity,
    pub residential_zone: ResidentialZone,
    pub document_type: String,
    pub residence: String,
    pub occupation: String,
    pub ethnicity: Option<String>,
    pub ethnic_community: Option<String>,
    pub health_provider: Option<String>,
}

fn required_code(
    errors: &mut ValidationErrors,
    field: &str,
    kind: CatalogKind,
    raw: &str,
) -> Option<String> {
    errors.check(field, check_code(kind, raw))
}

fn optional_code(
    errors: &mut ValidationErrors,
    field: &str,
    kind: CatalogKind,
    raw: &str,
) -> Option<Option<String>> {
    match optional(raw) {
        None => Some(None),
        Some(value) => errors.check(field, check_code(kind, value)).map(Some),
    }
}

fn optional_name(errors: &mut ValidationErrors, field: &str, raw: &str) -> Option<Option<NameText>> {
    match optional(raw) {
        None => Some(None),
        Some(value) => errors.check(field, NameText::new(value)).map(Some),
    }
}

impl PatientDraft {
    /// Validates every field against `today` (birth dates may not lie in the future).
    ///
    /// # Errors
    ///
    /// Returns every failing field, in declaration order.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedPatient, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let document_number =
            errors.check("document_number", check_document_number(&self.document_number));
        let first_name = errors.check("first_name", NameText::new(&self.first_name));
        let second_name = optional_name(&mut errors, "second_name", &self.second_name);
        let first_surname = errors.check("first_surname", NameText::new(&self.first_surname));
        let second_surname = optional_name(&mut errors, "second_surname", &self.second_surname);
        let birth_date = errors.check("birth_date", parse_birth_date(&self.birth_date, today));
        let biological_sex =
            errors.check("biological_sex", BiologicalSex::parse_code(&self.biological_sex));
        let gender_identity =
            errors.check("gender_identity", GenderIdentity::parse_code(&self.gender_identity));
        let residential_zone = errors.check(
            "residential_zone",
            ResidentialZone::parse_code(&self.residential_zone),
        );
        let document_type = required_code(
            &mut errors,
            "document_type",
            CatalogKind::DocumentType,
            &self.document_type,
        );
        let residence = required_code(
            &mut errors,
            "residence",
            CatalogKind::Municipality,
            &self.residence,
        );
        let occupation = required_code(
            &mut errors,
            "occupation",
            CatalogKind::Occupation,
            &self.occupation,
        );
        let ethnicity = optional_code(&mut errors, "ethnicity", CatalogKind::Ethnicity, &self.ethnicity);
        let ethnic_community = optional_code(
            &mut errors,
            "ethnic_community",
            CatalogKind::EthnicCommunity,
            &self.ethnic_community,
        );
        let health_provider = optional_code(
            &mut errors,
            "health_provider",
            CatalogKind::HealthProvider,
            &self.health_provider,
        );

        match (
            document_number,
            first_name,
            second_name,
            first_surname,
            second_surname,
            birth_date,
            biological_sex,
            gender_identity,
            residential_zone,
            document_type,
            residence,
            occupation,
            ethnicity,
            ethnic_community,
            health_provider,
        ) {
            (
                Some(document_number),
                Some(first_name),
                Some(second_name),
                Some(first_surname),
                Some(second_surname),
                Some(birth_date),
                Some(biological_sex),
                Some(gender_identity),
                Some(residential_zone),
                Some(document_type),
                Some(residence),
                Some(occupation),
                Some(ethnicity),
                Some(ethnic_community),
                Some(health_provider),
            ) if errors.is_empty() => Ok(ValidatedPatient {
                document_number,
                first_name,
                second_name,
                first_surname,
                second_surname,
                birth_date,
                biological_sex,
                gender_identity,
                residential_zone,
                document_type,
                residence,
                occupation,
                ethnicity,
                ethnic_community,
                health_provider,
            }),
            _ => Err(errors),
        }
    }

    /// Validates against the current local date.
    pub fn validate_now(&self) -> Result<ValidatedPatient, ValidationErrors> {
        self.validate(chrono::Local::now().date_naive())
    }
}

impl ValidatedPatient {
    /// Catalog references carried by this patient, required and optional.
    pub fn references(&self) -> Vec<(CatalogKind, &str)> {
        let mut refs = vec![
            (CatalogKind::DocumentType, self.document_type.as_str()),
            (CatalogKind::Municipality, self.residence.as_str()),
            (CatalogKind::Occupation, self.occupation.as_str()),
        ];
        let optional = [
            (CatalogKind::Ethnicity, &self.ethnicity),
            (CatalogKind::EthnicCommunity, &self.ethnic_community),
            (CatalogKind::HealthProvider, &self.health_provider),
        ];
        refs.extend(
            optional
                .into_iter()
                .filter_map(|(kind, code)| code.as_deref().map(|c| (kind, c))),
        );
        refs
    }
}

/// A stored patient.
///
/// Catalog references are optional here even where input requires them: deleting a catalog
/// row clears the reference instead of removing the patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub document_number: String,
    pub first_name: String,
    pub second_name: Option<String>,
    pub first_surname: String,
    pub second_surname: Option<String>,
    pub birth_date: NaiveDate,
    pub biological_sex: BiologicalSex,
    pub gender_identity: GenderIdentity,
    pub residential_zone: ResidentialZone,
    pub document_type: Option<String>,
    pub residence: Option<String>,
    pub occupation: Option<String>,
    pub ethnicity: Option<String>,
    pub ethnic_community: Option<String>,
    pub health_provider: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    /// Name parts joined with single spaces: given names first, then surnames.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.second_name.as_deref(),
            Some(self.first_surname.as_str()),
            self.second_surname.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// True if the stored values already equal `fields` (timestamps aside).
    pub fn matches(&self, fields: &ValidatedPatient) -> bool {
        self.document_number == fields.document_number
            && self.first_name == fields.first_name.as_str()
            && self.second_name.as_deref() == fields.second_name.as_ref().map(NameText::as_str)
            && self.first_surname == fields.first_surname.as_str()
            && self.second_surname.as_deref()
                == fields.second_surname.as_ref().map(NameText::as_str)
            && self.birth_date == fields.birth_date
            && self.biological_sex == fields.biological_sex
            && self.gender_identity == fields.gender_identity
            && self.residential_zone == fields.residential_zone
            && self.document_type.as_deref() == Some(fields.document_type.as_str())
            && self.residence.as_deref() == Some(fields.residence.as_str())
            && self.occupation.as_deref() == Some(fields.occupation.as_str())
            && self.ethnicity == fields.ethnicity
            && self.ethnic_community == fields.ethnic_community
            && self.health_provider == fields.health_provider
    }
}
