use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::admin::edit::{self, EditError};
use crate::alert::WebhookMessage;
use crate::config::{valid_template_name, Config};
use crate::http::response;
use crate::http::server::AppState;
use crate::reload::ReloadStatus;
use crate::routing::DEFAULT_GROUP;
use crate::runtime::{send_to_group, DispatchError};
use crate::template;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub config_path: String,
    pub loaded_at: DateTime<Utc>,
    pub reload: ReloadStatus,
    pub templates: Vec<String>,
    pub groups: Vec<String>,
}

/// Which credentials are configured, without revealing them.
#[derive(Serialize)]
pub struct SensitiveInfo {
    pub auth_token_set: bool,
    pub admin_password_set: bool,
    pub admin_password_sha256_set: bool,
    pub admin_salt_set: bool,
    pub targets: BTreeMap<String, TargetSensitiveInfo>,
}

#[derive(Serialize)]
pub struct TargetSensitiveInfo {
    pub webhook_set: bool,
    pub secret_set: bool,
}

#[derive(Serialize)]
pub struct ConfigView<'a> {
    pub config: &'a Config,
    pub sensitive: SensitiveInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ValidateRequest {
    pub template_text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RenderRequest {
    pub group: String,
    pub template: String,
    pub template_text: String,
    pub payload: WebhookMessage,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub group: String,
    pub payload: WebhookMessage,
    pub raw_text: String,
}

#[derive(Serialize)]
pub struct Rendered {
    pub content: String,
}

#[derive(Serialize)]
pub struct TemplateList {
    pub templates: Vec<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Response {
    let snapshot = state.store.load();
    response::data(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        config_path: snapshot.config_path.display().to_string(),
        loaded_at: snapshot.loaded_at,
        reload: state.reload.status(),
        templates: snapshot.renderer.template_names(),
        groups: snapshot.group_names(),
    })
}

pub async fn post_reload(State(state): State<AppState>) -> Response {
    match state.reload.reload_async(true).await {
        Ok(_) => response::ok("ok"),
        Err(e) => response::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn get_config(State(state): State<AppState>) -> Response {
    let snapshot = state.store.load();
    let config = &snapshot.config;
    let auth = &config.admin.basic_auth;
    let sensitive = SensitiveInfo {
        auth_token_set: !config.auth.token.is_blank(),
        admin_password_set: !auth.password.is_blank(),
        admin_password_sha256_set: !auth.password_sha256.is_blank(),
        admin_salt_set: !auth.salt.is_blank(),
        targets: config
            .messaging
            .targets
            .iter()
            .map(|t| {
                (
                    t.name.trim().to_string(),
                    TargetSensitiveInfo {
                        webhook_set: !t.webhook.is_blank(),
                        secret_set: !t.secret.is_blank(),
                    },
                )
            })
            .collect(),
    };
    response::data(ConfigView { config, sensitive })
}

/// Replace the config file with the TOML body. The new document must
/// validate and compile before anything is written.
pub async fn put_config(State(state): State<AppState>, body: Bytes) -> Response {
    let Ok(text) = String::from_utf8(body.to_vec()) else {
        return EditError::Encoding.into_response(StatusCode::BAD_REQUEST);
    };
    let _guard = state.edits.lock().await;
    match edit::replace_config(&state.reload, text).await {
        Ok(()) => response::ok("ok"),
        Err(e) => e.into_response(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

pub async fn get_templates(State(state): State<AppState>) -> Response {
    response::data(TemplateList {
        templates: state.store.load().renderer.template_names(),
    })
}

pub async fn get_template(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    if !valid_template_name(&name) {
        return response::error(StatusCode::BAD_REQUEST, "invalid template name");
    }
    let snapshot = state.store.load();
    match snapshot.renderer.source(&name) {
        Some(text) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text.to_string(),
        )
            .into_response(),
        None => response::error(StatusCode::NOT_FOUND, "template not found"),
    }
}

pub async fn put_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Response {
    let Ok(text) = String::from_utf8(body.to_vec()) else {
        return EditError::Encoding.into_response(StatusCode::BAD_REQUEST);
    };
    let _guard = state.edits.lock().await;
    match edit::put_template(&state.reload, &name, text).await {
        Ok(()) => response::ok("ok"),
        Err(e) => e.into_response(StatusCode::BAD_REQUEST),
    }
}

pub async fn delete_template(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let _guard = state.edits.lock().await;
    match edit::delete_template(&state.reload, &name).await {
        Ok(()) => response::ok("ok"),
        Err(e) => e.into_response(StatusCode::BAD_REQUEST),
    }
}

pub async fn validate_template(body: Bytes) -> Response {
    let req: ValidateRequest = match decode(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };
    match template::validate_text(&req.template_text) {
        Ok(()) => response::ok("ok"),
        Err(e) => response::error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn render(State(state): State<AppState>, body: Bytes) -> Response {
    let req: RenderRequest = match decode(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let snapshot = state.store.load();

    let rendered = if !req.template_text.trim().is_empty() {
        template::render_text(&req.template_text, &req.payload)
    } else if !req.group.trim().is_empty() {
        let Some(group) = snapshot.groups.get(req.group.trim()) else {
            return response::error(StatusCode::BAD_REQUEST, "unknown group");
        };
        snapshot.renderer.render(&group.template, &req.payload)
    } else {
        snapshot.renderer.render(&req.template, &req.payload)
    };

    match rendered {
        Ok(content) => response::data(Rendered { content }),
        Err(e) => response::error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn send(State(state): State<AppState>, body: Bytes) -> Response {
    let req: SendRequest = match decode(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let group = match req.group.trim() {
        "" => DEFAULT_GROUP,
        g => g,
    };
    let snapshot = state.store.load();

    match send_to_group(&snapshot, group, &req.payload, Some(&req.raw_text)).await {
        Ok(delivered) => {
            tracing::info!(group, delivered, "Admin test message sent");
            response::ok("ok")
        }
        Err(e @ DispatchError::UnknownGroup(_)) => response::error(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => response::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| response::error(StatusCode::BAD_REQUEST, e.to_string()))
}
