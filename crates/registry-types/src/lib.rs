//! Validated text types shared across the registry crates.

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text is shorter than the allowed minimum
    #[error("Text must be at least {min} characters long")]
    TooShort { min: usize },
    /// The input text is longer than the allowed maximum
    #[error("Text must be at most {max} characters long")]
    TooLong { max: usize },
    /// The input text contains a character outside the allowed class
    #[error("Character '{0}' is not allowed")]
    DisallowedCharacter(char),
}

/// Returns true for letters accepted in names: ASCII letters, the Spanish accented
/// vowels, `ñ` and `ü` in both cases.
pub fn is_name_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || "áéíóúÁÉÍÓÚñÑüÜ".contains(ch)
}

/// A person name part (first name, surname).
///
/// Trimmed, between [`NameText::MIN_LEN`] and [`NameText::MAX_LEN`] characters, made of
/// name letters, ASCII digits and single inner spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameText(String);

impl NameText {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 100;

    /// Validates and wraps a person name.
    ///
    /// Runs of inner whitespace are collapsed to a single space before the length check.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let collapsed = input.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(TextError::Empty);
        }

        if let Some(bad) = collapsed
            .chars()
            .find(|c| !(is_name_letter(*c) || c.is_ascii_digit() || *c == ' '))
        {
            return Err(TextError::DisallowedCharacter(bad));
        }

        let len = collapsed.chars().count();
        if len < Self::MIN_LEN {
            return Err(TextError::TooShort { min: Self::MIN_LEN });
        }
        if len > Self::MAX_LEN {
            return Err(TextError::TooLong { max: Self::MAX_LEN });
        }

        Ok(Self(collapsed))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NameText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NameText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NameText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NameText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NameText::new(&s).map_err(serde::de::Error::custom)
    }
}
