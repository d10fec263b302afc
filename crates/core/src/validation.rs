//! Input validation utilities.
//!
//! Format rules for business codes, catalog names, document numbers and dates. Functions
//! returning `Result<_, String>` are building blocks for draft validation, where every
//! failing field is collected; the `RegistryResult` variants are for single-value writes.

use crate::catalog::CatalogKind;
use crate::constants::{
    CATALOG_NAME_MAX_LEN, CATALOG_NAME_PUNCTUATION, DATETIME_FORMATS, DATE_FORMATS,
    MIN_BIRTH_YEAR,
};
use crate::{RegistryError, RegistryResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use registry_types::is_name_letter;
use registry_uuid::RecordId;

static DOCUMENT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{3,20}$").expect("valid document number regex"));

/// Returns `None` for blank input, otherwise the trimmed value.
pub fn optional(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Checks a catalog code against the pattern of its catalog.
pub fn check_code(kind: CatalogKind, raw: &str) -> Result<String, String> {
    let code = raw.trim();
    if code.is_empty() {
        return Err("code is required".into());
    }
    if !kind.code_pattern().is_match(code) {
        return Err(format!(
            "code '{}' does not match {} ({})",
            code,
            kind.code_pattern().as_str(),
            kind.code_description()
        ));
    }
    Ok(code.to_string())
}

/// Validates a catalog code, failing with [`RegistryError::Format`].
pub fn validate_code(kind: CatalogKind, raw: &str) -> RegistryResult<String> {
    check_code(kind, raw).map_err(|_| RegistryError::Format {
        field: format!("{} code", kind.entity()),
        value: raw.trim().to_string(),
        expected: kind.code_description().to_string(),
    })
}

/// Checks a catalog name: letters (with Spanish accents), digits, spaces and a small set of
/// punctuation, at most [`CATALOG_NAME_MAX_LEN`] characters.
pub fn check_catalog_name(raw: &str) -> Result<String, String> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err("name is required".into());
    }
    if name.chars().count() > CATALOG_NAME_MAX_LEN {
        return Err(format!("name exceeds {} characters", CATALOG_NAME_MAX_LEN));
    }
    if let Some(bad) = name.chars().find(|c| {
        !(is_name_letter(*c) || c.is_ascii_digit() || *c == ' ' || CATALOG_NAME_PUNCTUATION.contains(*c))
    }) {
        return Err(format!("character '{}' is not allowed", bad));
    }
    Ok(name)
}

/// Validates a catalog name, failing with [`RegistryError::Name`].
pub fn validate_catalog_name(kind: CatalogKind, raw: &str) -> RegistryResult<String> {
    check_catalog_name(raw).map_err(|reason| RegistryError::Name {
        field: format!("{} name", kind.entity()),
        value: raw.trim().to_string(),
        reason,
    })
}

pub fn check_document_number(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("document number is required".into());
    }
    if !DOCUMENT_NUMBER.is_match(value) {
        return Err("document number must be 3 to 20 letters or digits".into());
    }
    Ok(value.to_string())
}

/// Parses a date, accepting a plain date or a date-time whose time part is discarded.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("date is required".into());
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(date);
        }
    }
    parse_datetime(value)
        .map(|dt| dt.date())
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

/// Parses a timestamp in one of [`DATETIME_FORMATS`] or RFC 3339.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("timestamp is required".into());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt);
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .map_err(|_| format!("invalid timestamp '{}', expected YYYY-MM-DD HH:MM", value))
}

/// Parses a birth date and checks it lies between [`MIN_BIRTH_YEAR`] and `today`.
pub fn parse_birth_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let date = parse_date(raw)?;
    if date > today {
        return Err("birth date cannot be in the future".into());
    }
    if date < NaiveDate::from_ymd_opt(MIN_BIRTH_YEAR, 1, 1).unwrap_or(NaiveDate::MIN) {
        return Err(format!("birth date cannot be before {}", MIN_BIRTH_YEAR));
    }
    Ok(date)
}

/// Parses a record identifier (simple or hyphenated UUID), failing with
/// [`RegistryError::Format`].
pub fn parse_record_id(field: &str, raw: &str) -> RegistryResult<RecordId> {
    RecordId::parse(raw.trim()).map_err(|_| RegistryError::Format {
        field: field.to_string(),
        value: raw.trim().to_string(),
        expected: "a UUID (32 hex characters, hyphens optional)".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_rejects_codes_outside_its_pattern() {
        let bad = [
            (CatalogKind::Country, "CO"),
            (CatalogKind::Country, "col"),
            (CatalogKind::Municipality, "1100"),
            (CatalogKind::Occupation, "12A4"),
            (CatalogKind::Ethnicity, "1"),
            (CatalogKind::EthnicCommunity, "0012"),
            (CatalogKind::Disability, "A1"),
            (CatalogKind::DocumentType, "C1"),
            (CatalogKind::HealthProvider, "EPS01"),
            (CatalogKind::TreatmentModality, "001"),
            (CatalogKind::EntryRoute, "x1"),
            (CatalogKind::AttentionReason, "1 "),
            (CatalogKind::RareDisease, "123"),
            (CatalogKind::Diagnosis, "1000"),
        ];
        for (kind, code) in bad {
            let err = validate_code(kind, code).unwrap_err();
            assert!(
                matches!(err, RegistryError::Format { .. }),
                "{:?} accepted {:?}",
                kind,
                code
            );
        }
    }

    #[test]
    fn valid_codes_are_trimmed_and_accepted() {
        assert_eq!(validate_code(CatalogKind::Country, " COL ").unwrap(), "COL");
        assert_eq!(validate_code(CatalogKind::Disability, "03").unwrap(), "03");
        assert_eq!(validate_code(CatalogKind::HealthProvider, "EPS001").unwrap(), "EPS001");
        assert_eq!(validate_code(CatalogKind::Diagnosis, "J45X").unwrap(), "J45X");
        assert_eq!(validate_code(CatalogKind::Municipality, "11001").unwrap(), "11001");
    }

    #[test]
    fn catalog_names_allow_accents_and_reject_symbols() {
        assert_eq!(
            check_catalog_name("  Bogotá,   D.C. ").unwrap(),
            "Bogotá, D.C."
        );
        assert!(check_catalog_name("Perú").is_ok());
        let err = validate_catalog_name(CatalogKind::Country, "Col$mbia").unwrap_err();
        assert!(matches!(err, RegistryError::Name { .. }));
        assert!(check_catalog_name("   ").is_err());
    }

    #[test]
    fn document_number_rules() {
        assert_eq!(check_document_number(" 123456789 ").unwrap(), "123456789");
        assert!(check_document_number("12").is_err());
        assert!(check_document_number("123-456").is_err());
    }

    #[test]
    fn dates_accept_date_and_date_time_inputs() {
        let expected = NaiveDate::from_ymd_opt(1990, 5, 17).unwrap();
        assert_eq!(parse_date("1990-05-17").unwrap(), expected);
        assert_eq!(parse_date("1990-05-17 08:30").unwrap(), expected);
        assert!(parse_date("17/05/1990").is_err());
    }

    #[test]
    fn birth_date_bounds() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(parse_birth_date("2024-01-02", today).is_err());
        assert!(parse_birth_date("1899-12-31", today).is_err());
        assert!(parse_birth_date("2000-02-29", today).is_ok());
    }

    #[test]
    fn datetimes_accept_rfc3339() {
        let dt = parse_datetime("2024-03-01T10:15:00Z").unwrap();
        assert_eq!(dt.to_string(), "2024-03-01 10:15:00");
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn record_ids_accept_simple_and_hyphenated_forms() {
        assert!(parse_record_id("id", "550e8400e29b41d4a716446655440000").is_ok());
        let id = parse_record_id("id", "550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");
        let err = parse_record_id("id", "550e8400-e29b").unwrap_err();
        assert!(matches!(err, RegistryError::Format { .. }));
    }
}
