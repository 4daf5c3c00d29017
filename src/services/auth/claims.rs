//! Typed claim decoding.
//!
//! A claim is only usable if it is present, a JSON string, and non-empty.
//! Anything else is an error, never a silent default.

use serde_json::Value;

use super::token::Claims;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error("claim '{0}' is missing")]
    Missing(String),
    #[error("claim '{0}' is not a string")]
    NotAString(String),
    #[error("claim '{0}' is empty")]
    Empty(String),
}

pub fn string_claim(claims: &Claims, name: &str) -> Result<String, ClaimError> {
    match claims.get(name) {
        None | Some(Value::Null) => Err(ClaimError::Missing(name.to_string())),
        Some(Value::String(s)) if s.is_empty() => Err(ClaimError::Empty(name.to_string())),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ClaimError::NotAString(name.to_string())),
    }
}
