//! # Screen Permissions
//!
//! Executives are granted access to billing screens by route. The routes are
//! stored as a single comma-joined string per executive:
//!
//! ```text
//!   ["/billing", " /returns", "", "/billing"]  ──join──►  "/billing,/returns"
//!   "/billing, /returns,,"                     ──split─►  ["/billing", "/returns"]
//! ```

/// Joins screen routes into the stored form.
///
/// Entries are trimmed; empty entries and repeats are dropped while the first
/// occurrence keeps its position.
pub fn join_routes<S: AsRef<str>>(routes: &[S]) -> String {
    let mut seen: Vec<&str> = Vec::with_capacity(routes.len());
    for route in routes {
        let route = route.as_ref().trim();
        if !route.is_empty() && !seen.contains(&route) {
            seen.push(route);
        }
    }
    seen.join(",")
}

/// Splits the stored form back into routes. `None` yields no routes.
pub fn split_routes(stored: Option<&str>) -> Vec<String> {
    let Some(stored) = stored else {
        return Vec::new();
    };
    let mut routes: Vec<String> = Vec::new();
    for route in stored.split(',').map(str::trim) {
        if !route.is_empty() && !routes.iter().any(|r| r == route) {
            routes.push(route.to_string());
        }
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_trims_and_dedups() {
        let joined = join_routes(&["/billing", " /returns", "", "/billing"]);
        assert_eq!(joined, "/billing,/returns");
    }

    #[test]
    fn test_join_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(join_routes(&empty), "");
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split_routes(Some("/billing, /returns,,")),
            vec!["/billing".to_string(), "/returns".to_string()]
        );
        assert!(split_routes(None).is_empty());
        assert!(split_routes(Some("")).is_empty());
    }

    #[test]
    fn test_split_then_join_is_stable() {
        let stored = "/billing,/rental,/monthly";
        assert_eq!(join_routes(&split_routes(Some(stored))), stored);
    }
}
