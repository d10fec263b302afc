use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Callers may supply hyphenated or uppercase UUIDs; the stored and rendered form is always
/// canonical.
///
/// # Construction
/// - [`RecordId::new`] generates a fresh random identifier.
/// - [`RecordId::parse`] validates an externally supplied identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier given in simple (32 hex characters), hyphenated 8-4-4-4-12,
    /// braced or URN form, in either case. It always renders back in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not a UUID.
    pub fn parse(input: &str) -> UuidResult<Self> {
        Uuid::parse_str(input.trim()).map(Self).map_err(|e| {
            UuidError::InvalidInput(format!("invalid UUID '{}': {}", input.trim(), e))
        })
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes of `0-9` / `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(feature = "sql")]
impl rusqlite::types::ToSql for RecordId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.to_string()))
    }
}

#[cfg(feature = "sql")]
impl rusqlite::types::FromSql for RecordId {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let raw = value.as_str()?;
        RecordId::parse(raw).map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let s = id.to_string();
        assert_eq!(s.len(), 32);
        assert!(RecordId::is_canonical(&s));
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_parse_normalises_hyphenated_and_uppercase() {
        for input in [
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400-E29B-41D4-A716-446655440000",
            "550E8400E29B41D4A716446655440000",
            " 550e8400e29b41d4a716446655440000 ",
        ] {
            let id = RecordId::parse(input).unwrap();
            assert_eq!(id.to_string(), "550e8400e29b41d4a716446655440000");
        }
    }

    #[test]
    fn test_parse_rejects_bad_length_and_characters() {
        assert!(RecordId::parse("550e8400").is_err());
        assert!(RecordId::parse("550e8400e29b41d4a716446655440000ff").is_err());
        assert!(RecordId::parse("zz0e8400e29b41d4a716446655440000").is_err());
        match RecordId::parse("550e8400-e29b") {
            Err(UuidError::InvalidInput(msg)) => assert!(msg.contains("550e8400-e29b")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_from_str_matches_parse() {
        let id: RecordId = "550e8400e29b41d4a716446655440000".parse().unwrap();
        assert_eq!(id, RecordId::parse("550e8400e29b41d4a716446655440000").unwrap());
        assert!("not-an-id".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"ABC\"").is_err());
    }
}
