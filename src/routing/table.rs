//! Route table
//!
//! The fixed set of (method, path pattern) → handler bindings.

use hyper::Method;

use crate::contract::handlers::{self, HandlerFn};

/// Path pattern of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// Path must equal the string
    Exact(&'static str),
    /// Path must start with the prefix; the remainder is captured as the parameter
    Param(&'static str),
}

/// A single route binding
pub struct Route {
    /// Route name for logging
    pub name: &'static str,
    pub method: Method,
    pub pattern: PathPattern,
    pub handler: HandlerFn,
    /// Whether the request body is collected before the handler runs
    pub reads_body: bool,
}

/// Routes of the benchmark contract, matched in order
pub static CONTRACT_ROUTES: [Route; 4] = [
    Route {
        name: "root",
        method: Method::GET,
        pattern: PathPattern::Exact("/"),
        handler: handlers::root,
        reads_body: false,
    },
    Route {
        name: "health",
        method: Method::GET,
        pattern: PathPattern::Exact("/health"),
        handler: handlers::health,
        reads_body: false,
    },
    Route {
        name: "get_user",
        method: Method::GET,
        pattern: PathPattern::Param("/user/"),
        handler: handlers::get_user,
        reads_body: false,
    },
    Route {
        name: "create_user",
        method: Method::POST,
        pattern: PathPattern::Exact("/users"),
        handler: handlers::create_user,
        reads_body: true,
    },
];
