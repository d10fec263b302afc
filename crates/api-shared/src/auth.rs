//! API key checking shared by every transport.

/// Name of the request header carrying the key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("API key missing")]
    Missing,
    #[error("invalid API key")]
    Invalid,
    #[error("API_KEY not configured")]
    NotConfigured,
}

/// Validates the provided API key against the key configured at startup.
///
/// An empty configured key rejects every request rather than accepting every request.
pub fn validate_api_key(provided: Option<&str>, expected: &str) -> Result<(), AuthError> {
    if expected.is_empty() {
        return Err(AuthError::NotConfigured);
    }
    match provided {
        None => Err(AuthError::Missing),
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(AuthError::Invalid),
    }
}
