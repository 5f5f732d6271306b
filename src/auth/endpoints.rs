//! Classification of endpoints that are reachable without an access token.

/// Paths that never receive a bearer token and never trigger a refresh.
pub const PUBLIC_ENDPOINTS: &[&str] = &[
    "/sessions",
    "/auth/login",
    "/auth/signup",
    "/auth/register",
    "/auth/refresh",
    "/auth/forgot-password",
    "/auth/reset-password",
];

/// Path of the token refresh endpoint.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Whether `path` is one of [`PUBLIC_ENDPOINTS`].
///
/// Only the exact path, optionally with a trailing slash or query string,
/// matches. `/sessions/current` is not public even though `/sessions` is.
pub fn is_public_endpoint(path: &str) -> bool {
    let clean = clean_path(path);
    PUBLIC_ENDPOINTS.iter().any(|endpoint| clean == *endpoint)
}

/// Whether `path` targets the refresh endpoint itself.
pub fn is_refresh_endpoint(path: &str) -> bool {
    clean_path(path) == REFRESH_ENDPOINT
}

fn clean_path(path: &str) -> &str {
    let without_query = path.split(['?', '#']).next().unwrap_or(path);
    without_query.strip_suffix('/').unwrap_or(without_query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_public_paths_match() {
        for path in PUBLIC_ENDPOINTS {
            assert!(is_public_endpoint(path), "{path} should be public");
        }
    }

    #[test]
    fn trailing_slash_and_query_still_match() {
        assert!(is_public_endpoint("/sessions/"));
        assert!(is_public_endpoint("/auth/login?redirect=home"));
        assert!(is_public_endpoint("/auth/refresh/?v=2"));
    }

    #[test]
    fn sibling_paths_sharing_a_prefix_are_protected() {
        assert!(!is_public_endpoint("/sessions/current"));
        assert!(!is_public_endpoint("/sessions/current/"));
        assert!(!is_public_endpoint("/sessionsx"));
        assert!(!is_public_endpoint("/auth/refresh/extra"));
        assert!(!is_public_endpoint("/auth/login-history"));
    }

    #[test]
    fn unrelated_and_empty_paths_are_protected() {
        assert!(!is_public_endpoint("/shipments"));
        assert!(!is_public_endpoint(""));
        assert!(!is_public_endpoint("/"));
    }

    #[test]
    fn refresh_detection_is_exact() {
        assert!(is_refresh_endpoint("/auth/refresh"));
        assert!(is_refresh_endpoint("/auth/refresh/"));
        assert!(!is_refresh_endpoint("/auth/refresh-status"));
        assert!(!is_refresh_endpoint("/auth/login"));
    }
}
