//! HTTP contract module
//!
//! The routes, envelopes and error semantics every server variant must
//! reproduce. Independent of the HTTP runtime serving them.

pub mod envelope;
pub mod error;
pub mod handlers;
pub mod user;

pub use error::ApiError;
pub use handlers::{HandlerInput, HandlerResult};
