//! Error taxonomy for the HTTP contract

use hyper::StatusCode;
use thiserror::Error;

use super::envelope::ErrorEnvelope;

/// Errors a request can end in
///
/// Each variant maps to one status code and one fixed message. The
/// cause carried by `Internal` is for the error log only and never
/// reaches the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid user ID")]
    InvalidUserId,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidUserId | Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body
    pub const fn envelope(&self) -> ErrorEnvelope {
        let error = match self {
            Self::InvalidUserId => "Invalid user ID",
            Self::InvalidBody => "Invalid request body",
            Self::NotFound => "Not Found",
            Self::Internal(_) => "Internal Server Error",
        };
        ErrorEnvelope { error }
    }
}
