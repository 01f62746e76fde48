//! Maps transport-layer failures from the GitHub REST client onto the
//! shared [`DexError`] taxonomy.

use dex_core::error::DexError;

/// Classifies a GitHub REST response by status code, per spec §4.6:
/// 401 is an auth failure, 403 with rate-limit headers is a rate limit,
/// any other non-2xx or a transport failure is a generic transport error.
pub fn map_status(status: reqwest::StatusCode, reset_at: Option<String>, body: &str) -> DexError {
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return DexError::GitHubAuth(format!("GitHub returned 401: {body}"));
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        if let Some(reset_at) = reset_at {
            return DexError::GitHubRateLimit { reset_at };
        }
        return DexError::GitHubTransport(format!("GitHub returned 403: {body}"));
    }
    DexError::GitHubTransport(format!("GitHub returned {status}: {body}"))
}

/// Maps a network-level failure (DNS, TLS, timeout, connection reset) that
/// never reached a response.
pub fn map_transport(err: reqwest::Error) -> DexError {
    DexError::GitHubTransport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth_error() {
        let err = map_status(reqwest::StatusCode::UNAUTHORIZED, None, "bad credentials");
        assert!(matches!(err, DexError::GitHubAuth(_)));
    }

    #[test]
    fn forbidden_with_reset_header_maps_to_rate_limit() {
        let err = map_status(
            reqwest::StatusCode::FORBIDDEN,
            Some("1700000000".to_string()),
            "rate limited",
        );
        match err {
            DexError::GitHubRateLimit { reset_at } => assert_eq!(reset_at, "1700000000"),
            other => panic!("expected GitHubRateLimit, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_without_reset_header_maps_to_transport() {
        let err = map_status(reqwest::StatusCode::FORBIDDEN, None, "blocked");
        assert!(matches!(err, DexError::GitHubTransport(_)));
    }

    #[test]
    fn server_error_maps_to_transport() {
        let err = map_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, None, "oops");
        assert!(matches!(err, DexError::GitHubTransport(_)));
    }
}
