//! Request dispatch module
//!
//! Entry point for HTTP request processing: preflight handling, route
//! resolution, body collection, the handler fault boundary and access
//! logging.

use std::any::Any;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};

use crate::config::AppState;
use crate::contract::{ApiError, HandlerInput, HandlerResult};
use crate::http;
use crate::http::response::to_json;
use crate::logger::{self, AccessLogEntry};
use crate::routing::{self, Route, CONTRACT_ROUTES};

/// Limits applied while collecting a request body
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    /// Largest accepted body, in bytes
    pub max_size: usize,
    /// Time allowed to receive the whole body
    pub read_timeout: Duration,
}

impl BodyLimits {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            max_size: usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX),
            read_timeout: Duration::from_secs(state.config.performance.read_timeout),
        }
    }
}

/// Route name recorded for requests that matched no route
const UNMATCHED: &str = "-";

/// Route name recorded for CORS preflight requests
const PREFLIGHT: &str = "preflight";

/// Main entry point for HTTP request handling
///
/// Generic over the body type so the same path serves hyper's
/// `Incoming` bodies and in-memory bodies alike.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let limits = BodyLimits::from_state(&state);
    let (route, response) = dispatch(&parts, body, &CONTRACT_ROUTES, limits, Utc::now).await;

    if state.access_log {
        let entry = access_entry(&parts, remote_addr, route, &response, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Resolve and run the handler for a request.
///
/// Returns the name of the route that handled it along with the
/// response. Never fails: every error ends as an error envelope.
/// `clock` is read once the body has been received, just before the
/// handler runs.
pub async fn dispatch<B>(
    parts: &Parts,
    body: B,
    routes: &[Route],
    limits: BodyLimits,
    clock: fn() -> DateTime<Utc>,
) -> (&'static str, Response<Full<Bytes>>)
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if parts.method == Method::OPTIONS {
        return (PREFLIGHT, http::build_options_response());
    }

    let Some(matched) = routing::match_route(&parts.method, parts.uri.path(), routes) else {
        return (UNMATCHED, http::build_error_response(&ApiError::NotFound));
    };
    let route = matched.route;

    let body = if route.reads_body {
        match collect_body(body, limits).await {
            Ok(bytes) => Some(bytes),
            Err(err) => return (route.name, respond(route.name, Err(err))),
        }
    } else {
        None
    };

    let input = HandlerInput {
        now: clock(),
        param: matched.param,
        body: body.as_deref(),
    };
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (route.handler)(&input)))
        .unwrap_or_else(|payload| Err(ApiError::Internal(panic_message(payload.as_ref()))));

    (route.name, respond(route.name, outcome))
}

/// Read the whole body, failing on stream errors, on timeout or when it
/// exceeds the size limit
async fn collect_body<B>(body: B, limits: BodyLimits) -> Result<Bytes, ApiError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let collect = Limited::new(body, limits.max_size).collect();
    match tokio::time::timeout(limits.read_timeout, collect).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(e)) => {
            logger::log_debug(&format!("Failed to read request body: {e}"));
            Err(ApiError::InvalidBody)
        }
        Err(_) => {
            logger::log_debug(&format!(
                "Request body not received within {}s",
                limits.read_timeout.as_secs()
            ));
            Err(ApiError::InvalidBody)
        }
    }
}

/// Serialize a handler outcome into a response
fn respond(route: &str, outcome: HandlerResult) -> Response<Full<Bytes>> {
    let rendered = outcome.and_then(|reply| to_json(&reply.envelope).map(|body| (reply.status, body)));
    match rendered {
        Ok((status, body)) => http::build_json_response(status, body),
        Err(err) => {
            if let ApiError::Internal(cause) = &err {
                logger::log_handler_fault(route, cause);
            }
            http::build_error_response(&err)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic with non-string payload".to_string()
    }
}

fn access_entry(
    parts: &Parts,
    remote_addr: SocketAddr,
    route: &'static str,
    response: &Response<Full<Bytes>>,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.route = route;
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .body()
        .size_hint()
        .exact()
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
