//! Admin API: introspection, reload, previews and guarded edits.
//!
//! Mounted under `admin.path_prefix`; every route goes through
//! [`auth::admin_auth_middleware`].

pub mod auth;
pub mod edit;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/reload", post(post_reload))
        .route("/api/v1/config", get(get_config).put(put_config))
        .route("/api/v1/templates", get(get_templates))
        .route(
            "/api/v1/templates/{name}",
            get(get_template).put(put_template).delete(delete_template),
        )
        .route("/api/v1/template-validate", post(validate_template))
        .route("/api/v1/render", post(render))
        .route("/api/v1/send", post(send))
        .layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
