//! The four contract handlers
//!
//! Handlers are plain functions of a [`HandlerInput`]; they know nothing
//! about sockets, hyper or body streaming.

use chrono::{DateTime, Utc};
use hyper::StatusCode;

use super::envelope::ResponseEnvelope;
use super::error::ApiError;
use super::user::{parse_create_user, parse_user_id, User};

/// Modulus applied to the creation time to derive a new user's id
pub const CREATED_ID_MODULUS: i64 = 10_000;

/// Everything a handler may look at
#[derive(Debug)]
pub struct HandlerInput<'a> {
    /// Instant the response is built at
    pub now: DateTime<Utc>,
    /// Path parameter captured by the route pattern, if any
    pub param: Option<&'a str>,
    /// Collected request body, for routes that read one
    pub body: Option<&'a [u8]>,
}

/// Successful handler result
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub envelope: ResponseEnvelope,
}

impl Reply {
    const fn ok(envelope: ResponseEnvelope) -> Self {
        Self {
            status: StatusCode::OK,
            envelope,
        }
    }
}

pub type HandlerResult = Result<Reply, ApiError>;

/// Handler function bound to a route
pub type HandlerFn = fn(&HandlerInput<'_>) -> HandlerResult;

/// `GET /`
pub fn root(input: &HandlerInput<'_>) -> HandlerResult {
    Ok(Reply::ok(ResponseEnvelope::message("Hello, World!", input.now)))
}

/// `GET /health`
pub fn health(input: &HandlerInput<'_>) -> HandlerResult {
    Ok(Reply::ok(ResponseEnvelope::message("OK", input.now)))
}

/// `GET /user/{id}`
pub fn get_user(input: &HandlerInput<'_>) -> HandlerResult {
    let id = parse_user_id(input.param.unwrap_or_default())?;
    Ok(Reply::ok(ResponseEnvelope::with_user(
        "User retrieved successfully",
        input.now,
        User::synthesized(id),
    )))
}

/// `POST /users`
///
/// The id is not unique and nothing is stored: two users created in
/// the same millisecond, or 10 seconds apart, share an id.
pub fn create_user(input: &HandlerInput<'_>) -> HandlerResult {
    let body = input.body.ok_or(ApiError::InvalidBody)?;
    let name = parse_create_user(body)?;
    let user = User {
        id: created_user_id(input.now),
        name,
    };
    Ok(Reply {
        status: StatusCode::CREATED,
        envelope: ResponseEnvelope::with_user("User created successfully", input.now, user),
    })
}

/// Unix time in milliseconds, reduced modulo [`CREATED_ID_MODULUS`]
pub fn created_user_id(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().rem_euclid(CREATED_ID_MODULUS)
}
