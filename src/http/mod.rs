//! HTTP protocol layer module
//!
//! Response construction and the CORS header set, decoupled from the
//! contract handlers that produce the envelopes.

pub mod cors;
pub mod response;

pub use response::{build_error_response, build_json_response, build_options_response};
