//! Admin API guard.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::BasicAuthConfig;
use crate::http::response;
use crate::http::server::AppState;

/// Reject requests while admin is disabled (404) or without valid Basic
/// credentials (401). Both checks read the snapshot served right now.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let snapshot = state.store.load();
    let admin = &snapshot.config.admin;

    if !admin.enabled {
        return response::error(StatusCode::NOT_FOUND, "not found");
    }

    if !check_basic_auth(request.headers(), &admin.basic_auth) {
        tracing::warn!(path = %request.uri().path(), "Admin authentication failed");
        let mut res = response::error(StatusCode::UNAUTHORIZED, "unauthorized");
        res.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Basic realm="admin""#),
        );
        return res;
    }

    drop(snapshot);
    next.run(request).await
}

/// Verify `Authorization: Basic` against plaintext or salted SHA-256
/// credentials in constant time.
pub fn check_basic_auth(headers: &HeaderMap, config: &BasicAuthConfig) -> bool {
    let Some((username, password)) = basic_credentials(headers) else {
        return false;
    };
    if !bool::from(username.as_bytes().ct_eq(config.username.as_bytes())) {
        return false;
    }

    if !config.password_sha256.is_blank() {
        let Ok(salt) = STANDARD.decode(config.salt.expose().trim()) else {
            return false;
        };
        let Ok(want) = hex::decode(config.password_sha256.expose().trim()) else {
            return false;
        };
        let mut hasher = Sha256::new();
        hasher.update(&salt);
        hasher.update(password.as_bytes());
        return hasher.finalize().as_slice().ct_eq(&want).into();
    }

    password.as_bytes().ct_eq(config.password.expose().as_bytes()).into()
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
