//! Request handler module
//!
//! Adapts hyper requests to the runtime-agnostic contract handlers.

pub mod dispatch;

// Re-export main entry point
pub use dispatch::handle_request;
