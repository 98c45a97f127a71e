//! User model and request body parsing

use serde::Serialize;
use serde_json::Value;

use super::error::ApiError;

/// Name given to users created without a usable `name`
pub const DEFAULT_USER_NAME: &str = "Unknown";

/// Synthetic user record, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
}

impl User {
    /// User synthesized for `GET /user/{id}`
    pub fn synthesized(id: i64) -> Self {
        Self {
            id,
            name: format!("User {id}"),
        }
    }
}

/// Parse the `{id}` path segment as a base-10 integer.
///
/// Empty, non-numeric, out-of-range and multi-segment values are rejected.
pub fn parse_user_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| ApiError::InvalidUserId)
}

/// Extract the user name from a `POST /users` body.
///
/// The body must be JSON and must not be `null`. Only objects carry a
/// name; falsy names fall back to [`DEFAULT_USER_NAME`], and a truthy
/// name that is not a string is rejected.
pub fn parse_create_user(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidBody)?;

    let name = match &value {
        Value::Null => return Err(ApiError::InvalidBody),
        Value::Object(fields) => fields.get("name"),
        _ => None,
    };

    match name {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(v) if is_truthy(v) => Err(ApiError::InvalidBody),
        _ => Ok(DEFAULT_USER_NAME.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
