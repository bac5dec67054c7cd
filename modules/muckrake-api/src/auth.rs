//! Identity extraction.
//!
//! The auth collaborator's whole contract is "bearer token → user id": the
//! token is looked up in the users collection and everything downstream only
//! sees the resolved id. Admin endpoints use HTTP Basic against configured
//! credentials instead.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::warn;

use muckrake_store::records;

use crate::AppState;

/// Authenticated player. Extract this in handlers that require identity.
pub struct ApiUser {
    pub user_id: String,
}

impl FromRequestParts<Arc<AppState>> for ApiUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or("");

        if token.is_empty() {
            return Err(unauthorized("missing bearer token"));
        }

        match records::user_id_for_token(state.store.as_ref(), token).await {
            Ok(Some(user_id)) => Ok(ApiUser { user_id }),
            Ok(None) => Err(unauthorized("invalid token")),
            Err(e) => {
                warn!(error = %e, "token lookup failed");
                Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
            }
        }
    }
}

fn unauthorized(reason: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": reason })),
    )
        .into_response()
}

/// HTTP Basic check for the admin endpoints (ingest trigger, run history).
pub fn check_admin_auth(headers: &axum::http::HeaderMap, username: &str, password: &str) -> bool {
    use base64::Engine;

    let Some(auth) = headers.get(header::AUTHORIZATION) else {
        return false;
    };
    let Ok(auth_str) = auth.to_str() else {
        return false;
    };
    let Some(encoded) = auth_str.strip_prefix("Basic ") else {
        return false;
    };

    let decoded_bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(b) => b,
        Err(_) => return false,
    };
    let decoded = match String::from_utf8(decoded_bytes) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let expected = format!("{username}:{password}");
    constant_time_eq(decoded.as_bytes(), expected.as_bytes())
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn basic_header(user: &str, pass: &str) -> axum::http::HeaderMap {
        let mut headers = axum::http::HeaderMap::new();
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
        headers.insert(
            header::AUTHORIZATION,
            format!("Basic {encoded}").parse().unwrap(),
        );
        headers
    }

    #[test]
    fn accepts_matching_credentials() {
        let headers = basic_header("admin", "hunter2");
        assert!(check_admin_auth(&headers, "admin", "hunter2"));
    }

    #[test]
    fn rejects_wrong_password_and_missing_header() {
        let headers = basic_header("admin", "wrong");
        assert!(!check_admin_auth(&headers, "admin", "hunter2"));
        assert!(!check_admin_auth(
            &axum::http::HeaderMap::new(),
            "admin",
            "hunter2"
        ));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
