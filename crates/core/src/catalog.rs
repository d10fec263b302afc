//! Reference catalog types.
//!
//! Every catalog is keyed by a fixed-width business code checked against a per-catalog
//! pattern. Most catalogs are plain `(code, name)` pairs; health providers carry role flags
//! and diagnoses may point at a rare disease.

use crate::codes::YesNo;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("valid catalog code regex")
}

static ALPHANUM_3: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z0-9]{3}$"));
static ALPHANUM_6: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z0-9]{6}$"));
static LETTERS_2: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z]{2}$"));
static DIGITS_2: Lazy<Regex> = Lazy::new(|| pattern(r"^[0-9]{2}$"));
static DIGITS_3: Lazy<Regex> = Lazy::new(|| pattern(r"^[0-9]{3}$"));
static DIGITS_4: Lazy<Regex> = Lazy::new(|| pattern(r"^[0-9]{4}$"));
static DIGITS_5: Lazy<Regex> = Lazy::new(|| pattern(r"^[0-9]{5}$"));
static ICD10: Lazy<Regex> = Lazy::new(|| pattern(r"^[A-Z][0-9]{2}[0-9X]$"));

/// The reference catalogs of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    Country,
    Municipality,
    Occupation,
    Ethnicity,
    EthnicCommunity,
    Disability,
    DocumentType,
    HealthProvider,
    TreatmentModality,
    EntryRoute,
    AttentionReason,
    RareDisease,
    Diagnosis,
}

impl CatalogKind {
    /// Every catalog, leaves first (rare diseases before diagnoses).
    pub const ALL: [CatalogKind; 13] = [
        CatalogKind::Country,
        CatalogKind::Municipality,
        CatalogKind::Occupation,
        CatalogKind::Ethnicity,
        CatalogKind::EthnicCommunity,
        CatalogKind::Disability,
        CatalogKind::DocumentType,
        CatalogKind::HealthProvider,
        CatalogKind::TreatmentModality,
        CatalogKind::EntryRoute,
        CatalogKind::AttentionReason,
        CatalogKind::RareDisease,
        CatalogKind::Diagnosis,
    ];

    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Country => "country",
            CatalogKind::Municipality => "municipality",
            CatalogKind::Occupation => "occupation",
            CatalogKind::Ethnicity => "ethnicity",
            CatalogKind::EthnicCommunity => "ethnic_community",
            CatalogKind::Disability => "disability",
            CatalogKind::DocumentType => "document_type",
            CatalogKind::HealthProvider => "health_provider",
            CatalogKind::TreatmentModality => "treatment_modality",
            CatalogKind::EntryRoute => "entry_route",
            CatalogKind::AttentionReason => "attention_reason",
            CatalogKind::RareDisease => "rare_disease",
            CatalogKind::Diagnosis => "diagnosis",
        }
    }

    /// Entity name used in error messages.
    pub fn entity(self) -> &'static str {
        match self {
            CatalogKind::Country => "country",
            CatalogKind::Municipality => "municipality",
            CatalogKind::Occupation => "occupation",
            CatalogKind::Ethnicity => "ethnicity",
            CatalogKind::EthnicCommunity => "ethnic community",
            CatalogKind::Disability => "disability",
            CatalogKind::DocumentType => "document type",
            CatalogKind::HealthProvider => "health provider",
            CatalogKind::TreatmentModality => "treatment modality",
            CatalogKind::EntryRoute => "entry route",
            CatalogKind::AttentionReason => "attention reason",
            CatalogKind::RareDisease => "rare disease",
            CatalogKind::Diagnosis => "diagnosis",
        }
    }

    /// URL/CLI slug, e.g. `ethnic-community`.
    pub fn slug(self) -> &'static str {
        match self {
            CatalogKind::Country => "country",
            CatalogKind::Municipality => "municipality",
            CatalogKind::Occupation => "occupation",
            CatalogKind::Ethnicity => "ethnicity",
            CatalogKind::EthnicCommunity => "ethnic-community",
            CatalogKind::Disability => "disability",
            CatalogKind::DocumentType => "document-type",
            CatalogKind::HealthProvider => "health-provider",
            CatalogKind::TreatmentModality => "treatment-modality",
            CatalogKind::EntryRoute => "entry-route",
            CatalogKind::AttentionReason => "attention-reason",
            CatalogKind::RareDisease => "rare-disease",
            CatalogKind::Diagnosis => "diagnosis",
        }
    }

    pub fn code_pattern(self) -> &'static Regex {
        match self {
            CatalogKind::Country => &*ALPHANUM_3,
            CatalogKind::Municipality => &*DIGITS_5,
            CatalogKind::Occupation => &*DIGITS_4,
            CatalogKind::EthnicCommunity => &*DIGITS_3,
            CatalogKind::DocumentType => &*LETTERS_2,
            CatalogKind::HealthProvider => &*ALPHANUM_6,
            CatalogKind::RareDisease => &*DIGITS_4,
            CatalogKind::Diagnosis => &*ICD10,
            CatalogKind::Ethnicity
            | CatalogKind::Disability
            | CatalogKind::TreatmentModality
            | CatalogKind::EntryRoute
            | CatalogKind::AttentionReason => &*DIGITS_2,
        }
    }

    pub fn code_description(self) -> &'static str {
        match self {
            CatalogKind::Country => "3 uppercase letters or digits",
            CatalogKind::Municipality => "5 digits",
            CatalogKind::Occupation | CatalogKind::RareDisease => "4 digits",
            CatalogKind::EthnicCommunity => "3 digits",
            CatalogKind::DocumentType => "2 uppercase letters",
            CatalogKind::HealthProvider => "6 uppercase letters or digits",
            CatalogKind::Diagnosis => "ICD-10 code: a letter, 2 digits and a digit or X",
            CatalogKind::Ethnicity
            | CatalogKind::Disability
            | CatalogKind::TreatmentModality
            | CatalogKind::EntryRoute
            | CatalogKind::AttentionReason => "2 digits",
        }
    }

    /// Municipality names repeat across departments; every other catalog name is unique.
    pub fn name_unique(self) -> bool {
        !matches!(self, CatalogKind::Municipality)
    }

    /// Catalogs whose table has columns beyond `(code, name)`.
    pub fn has_extra_columns(self) -> bool {
        matches!(self, CatalogKind::HealthProvider | CatalogKind::Diagnosis)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        CatalogKind::ALL
            .into_iter()
            .find(|k| k.slug() == wanted)
            .ok_or_else(|| format!("unknown catalog '{}'", s))
    }
}

/// A plain catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub kind: CatalogKind,
    pub code: String,
    pub name: String,
}

impl CatalogEntry {
    pub fn new(kind: CatalogKind, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A health-service provider with its role flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProvider {
    pub code: String,
    pub name: String,
    pub is_eps: YesNo,
    pub is_ips: YesNo,
    pub is_arl: YesNo,
    pub is_insurer: YesNo,
}

/// A diagnosis code, optionally linked to a rare disease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub code: String,
    pub name: String,
    pub rare_disease: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_parse_back() {
        for kind in CatalogKind::ALL {
            assert_eq!(kind.slug().parse::<CatalogKind>().unwrap(), kind);
        }
        assert_eq!(
            "ethnic_community".parse::<CatalogKind>().unwrap(),
            CatalogKind::EthnicCommunity
        );
        assert!("planet".parse::<CatalogKind>().is_err());
    }

    #[test]
    fn rare_disease_precedes_diagnosis() {
        let pos = |k| CatalogKind::ALL.iter().position(|x| *x == k).unwrap();
        assert!(pos(CatalogKind::RareDisease) < pos(CatalogKind::Diagnosis));
    }

    #[test]
    fn tables_are_distinct() {
        let mut tables: Vec<_> = CatalogKind::ALL.iter().map(|k| k.table()).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), CatalogKind::ALL.len());
    }
}
