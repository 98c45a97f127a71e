//! Routing module
//!
//! Provides the contract's route table and matching:
//! - Exact path routes
//! - Prefix routes capturing a single path parameter
//! - Method matching (a path under another method is not a match)

pub mod matcher;
pub mod table;

pub use matcher::match_route;
pub use table::{Route, CONTRACT_ROUTES};
