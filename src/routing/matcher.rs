//! Route matching module
//!
//! Implements method and path matching against the route table.

use hyper::Method;

use super::table::{PathPattern, Route};

/// A matched route together with its captured path parameter
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    pub param: Option<&'p str>,
}

/// Find the first route matching both method and path
pub fn match_route<'r, 'p>(
    method: &Method,
    path: &'p str,
    routes: &'r [Route],
) -> Option<RouteMatch<'r, 'p>> {
    routes.iter().find_map(|route| {
        if route.method != *method {
            return None;
        }
        match_path(route.pattern, path).map(|param| RouteMatch { route, param })
    })
}

/// Check a path against a pattern.
///
/// Returns `None` when the path does not match, otherwise the captured
/// parameter (always `None` for exact patterns).
pub fn match_path(pattern: PathPattern, path: &str) -> Option<Option<&str>> {
    match pattern {
        PathPattern::Exact(exact) => (path == exact).then_some(None),
        PathPattern::Param(prefix) => path.strip_prefix(prefix).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::table::CONTRACT_ROUTES;

    #[test]
    fn test_match_path_exact() {
        let pattern = PathPattern::Exact("/health");
        assert_eq!(match_path(pattern, "/health"), Some(None));
        assert_eq!(match_path(pattern, "/health/"), None);
        assert_eq!(match_path(pattern, "/healthz"), None);
    }

    #[test]
    fn test_match_path_param() {
        let pattern = PathPattern::Param("/user/");
        assert_eq!(match_path(pattern, "/user/42"), Some(Some("42")));
        assert_eq!(match_path(pattern, "/user/"), Some(Some("")));
        assert_eq!(match_path(pattern, "/user/4/2"), Some(Some("4/2")));
        assert_eq!(match_path(pattern, "/user"), None);
        assert_eq!(match_path(pattern, "/users"), None);
    }

    #[test]
    fn test_match_route_contract_table() {
        let found = match_route(&Method::GET, "/", &CONTRACT_ROUTES).unwrap();
        assert_eq!(found.route.name, "root");

        let found = match_route(&Method::GET, "/user/9", &CONTRACT_ROUTES).unwrap();
        assert_eq!(found.route.name, "get_user");
        assert_eq!(found.param, Some("9"));

        let found = match_route(&Method::POST, "/users", &CONTRACT_ROUTES).unwrap();
        assert_eq!(found.route.name, "create_user");
        assert!(found.route.reads_body);
    }

    #[test]
    fn test_match_route_method_mismatch() {
        assert!(match_route(&Method::POST, "/", &CONTRACT_ROUTES).is_none());
        assert!(match_route(&Method::GET, "/users", &CONTRACT_ROUTES).is_none());
        assert!(match_route(&Method::DELETE, "/user/1", &CONTRACT_ROUTES).is_none());
        assert!(match_route(&Method::HEAD, "/health", &CONTRACT_ROUTES).is_none());
    }

    #[test]
    fn test_match_route_unknown_path() {
        assert!(match_route(&Method::GET, "/nope", &CONTRACT_ROUTES).is_none());
        assert!(match_route(&Method::GET, "", &CONTRACT_ROUTES).is_none());
    }
}
