//! HTTP response building module
//!
//! Turns contract results into hyper responses. Every response gets the
//! JSON content type and the CORS header set.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::cors::{self, apply_cors};
use crate::contract::ApiError;
use crate::logger;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Last-resort body when even the error envelope can't be produced
const INTERNAL_ERROR_BODY: &str = r#"{"error":"Internal Server Error"}"#;

/// Build a JSON response with the given status and pre-serialized body
pub fn build_json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    apply_cors(Response::builder().status(status))
        .header("Content-Type", JSON_CONTENT_TYPE)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            fallback_response(status)
        })
}

/// Build the preflight response: empty body, 200
pub fn build_options_response() -> Response<Full<Bytes>> {
    build_json_response(StatusCode::OK, Bytes::new())
}

/// Build the response for a failed request
///
/// The `Internal` cause is never written to the body.
pub fn build_error_response(err: &ApiError) -> Response<Full<Bytes>> {
    let body = to_json(&err.envelope()).unwrap_or_else(|_| Bytes::from(INTERNAL_ERROR_BODY));
    build_json_response(err.status(), body)
}

/// Serialize a value as compact JSON
pub fn to_json<T: Serialize>(value: &T) -> Result<Bytes, ApiError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize response: {e}")))
}

fn fallback_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(INTERNAL_ERROR_BODY)));
    *response.status_mut() = if status.is_server_error() {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(cors::ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(cors::ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(cors::ALLOW_HEADERS),
    );
    response
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn assert_contract_headers(response: &Response<Full<Bytes>>) {
        let headers = response.headers();
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(
            headers["Access-Control-Allow-Methods"],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers["Access-Control-Allow-Headers"],
            "Content-Type, Authorization"
        );
    }

    async fn body_string(response: Response<Full<Bytes>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_fallback_response_keeps_contract_headers() {
        let response = fallback_response(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_contract_headers(&response);
        assert_eq!(body_string(response).await, INTERNAL_ERROR_BODY);
    }

    #[tokio::test]
    async fn test_options_response() {
        let response = build_options_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_contract_headers(&response);
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_error_responses_carry_headers() {
        for (err, status, body) in [
            (ApiError::InvalidUserId, 400, r#"{"error":"Invalid user ID"}"#),
            (ApiError::InvalidBody, 400, r#"{"error":"Invalid request body"}"#),
            (ApiError::NotFound, 404, r#"{"error":"Not Found"}"#),
            (
                ApiError::Internal("secret detail".to_string()),
                500,
                r#"{"error":"Internal Server Error"}"#,
            ),
        ] {
            let response = build_error_response(&err);
            assert_eq!(response.status().as_u16(), status);
            assert_contract_headers(&response);
            assert_eq!(body_string(response).await, body);
        }
    }
}
