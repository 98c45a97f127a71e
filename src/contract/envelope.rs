//! Response envelope types
//!
//! Every body the server writes is one of two shapes: the success
//! envelope (`message`, `timestamp`, optional `data`) or the error
//! envelope (`error`).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use super::user::User;

/// Success envelope
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    pub message: &'static str,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Payload::is_none")]
    pub data: Payload,
}

impl ResponseEnvelope {
    /// Envelope without a `data` field
    pub const fn message(message: &'static str, timestamp: DateTime<Utc>) -> Self {
        Self {
            message,
            timestamp,
            data: Payload::None,
        }
    }

    /// Envelope carrying a user record
    pub const fn with_user(message: &'static str, timestamp: DateTime<Utc>, user: User) -> Self {
        Self {
            message,
            timestamp,
            data: Payload::User(user),
        }
    }
}

/// Contents of the envelope's `data` field.
///
/// `None` means the field is left out of the JSON entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    None,
    User(User),
}

impl Payload {
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Error envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: &'static str,
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}
