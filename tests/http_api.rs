//! End-to-end tests of the HTTP surface against mock robot endpoints.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tower::ServiceExt;

mod common;

const OK_BODY: &str = r#"{"errcode":0,"errmsg":"ok"}"#;

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn alert_request(token: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::post("/alert").header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn admin_request(method: &str, path: &str, body: Option<Value>) -> Request<Body> {
    let credentials = STANDARD.encode("admin:pw");
    Request::builder()
        .method(method)
        .uri(format!("/admin/api/v1{path}"))
        .header(header::AUTHORIZATION, format!("Basic {credentials}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map_or_else(Body::empty, |v| Body::from(v.to_string())))
        .unwrap()
}

fn admin_text_request(method: &str, path: &str, body: &str) -> Request<Body> {
    let credentials = STANDARD.encode("admin:pw");
    Request::builder()
        .method(method)
        .uri(format!("/admin/api/v1{path}"))
        .header(header::AUTHORIZATION, format!("Basic {credentials}"))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (_services, app) = common::build_app(&path);

    let (status, body) = call(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);

    let (status, body) = call(&app, Request::get("/readyz").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "ready");
}

#[tokio::test]
async fn test_alert_token_and_delivery() {
    let (addr, inbox) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/robot/send?access_token=t");
    let path = common::write_config(dir.path(), &common::relay_config(&webhook, "s3cret", ""));
    let (_services, app) = common::build_app(&path);
    let payload = common::firing_payload().to_string();

    let (status, _) = call(&app, alert_request(None, payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, alert_request(Some("wrong"), payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(inbox.lock().is_empty());

    let (status, body) = call(&app, alert_request(Some("s3cret"), payload)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let captured = inbox.lock().clone();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].target.starts_with("/robot/send?access_token=t"));
    let sent: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(sent["msgtype"], "markdown");
    assert_eq!(sent["markdown"]["title"], "cpu too high");
    assert!(sent["markdown"]["text"].as_str().unwrap().contains("Alert Firing (1)"));
}

#[tokio::test]
async fn test_x_token_header_accepted() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "s3cret", ""));
    let (_services, app) = common::build_app(&path);

    let request = Request::post("/alert")
        .header("x-token", "s3cret")
        .body(Body::from(common::firing_payload().to_string()))
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_alert_rejections() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (_services, app) = common::build_app(&path);

    let request = Request::post("/alert")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, body) = call(&app, alert_request(None, "{not json".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid json");

    let request = Request::get("/alert").body(Body::empty()).unwrap();
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_endpoint_error_is_send_failure() {
    let (addr, inbox) = common::start_mock_endpoint(200, r#"{"errcode":310000,"errmsg":"sign not match"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (_services, app) = common::build_app(&path);

    let (status, body) = call(&app, alert_request(None, common::firing_payload().to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "send failed");
    assert_eq!(inbox.lock().len(), 1);
}

#[tokio::test]
async fn test_route_mention_and_signing() {
    let (addr, inbox) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let extra = format!(
        r#"
[[messaging.targets]]
name = "pager"
webhook = "http://{addr}/pager"
secret = "SEC123"
msg_type = "text"

[[messaging.groups]]
name = "critical"
targets = ["pager"]

[messaging.groups.mention]
at_user_ids = ["@lead"]

[[messaging.groups.mention_rules]]
name = "page-everyone"
when = {{ status = ["FIRING"] }}
mention = {{ at_all = true }}

[[messaging.routes]]
name = "critical"
when = {{ labels = {{ severity = ["critical"] }} }}
groups = ["critical"]
"#
    );
    let config = common::relay_config(&format!("http://{addr}/send"), "", &extra);
    let path = common::write_config(dir.path(), &config);
    let (_services, app) = common::build_app(&path);

    let (status, body) = call(&app, alert_request(None, common::firing_payload().to_string())).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let captured = inbox.lock().clone();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].target.starts_with("/pager?timestamp="));
    assert!(captured[0].target.contains("&sign="));

    let sent: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(sent["msgtype"], "text");
    assert!(sent["text"]["content"].as_str().unwrap().ends_with("\n@all"));
    assert_eq!(sent["at"]["isAtAll"], true);
    assert!(sent["at"].get("atUserIds").is_none());
}

#[tokio::test]
async fn test_reload_endpoint_success_then_failure() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/send");
    let path = common::write_config(dir.path(), &common::relay_config(&webhook, "a", ""));
    let (services, app) = common::build_app(&path);

    common::rewrite(&path, &common::relay_config(&webhook, "b", ""), 10);
    let (status, body) = call(&app, Request::post("/-/reload").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(services.store.load().config.auth.token.expose(), "b");

    common::rewrite(&path, "[[messaging.targets]]\nname = \"ops\"\nwebhook = \"ftp://x\"\n", 20);
    let (status, body) = call(&app, Request::post("/-/reload").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("http or https"), "{message}");

    assert_eq!(services.store.load().config.auth.token.expose(), "b");
    assert_eq!(services.reload.status().last_error, message);
}

#[tokio::test]
async fn test_admin_guard() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/send");
    let path = common::write_config(dir.path(), &common::relay_config(&webhook, "", ""));
    let (services, app) = common::build_app(&path);

    let anonymous = Request::get("/admin/api/v1/status").body(Body::empty()).unwrap();
    let res = app.clone().oneshot(anonymous).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));

    let (status, body) = call(&app, admin_request("GET", "/status", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["groups"], serde_json::json!(["default"]));
    assert_eq!(body["data"]["templates"], serde_json::json!(["default"]));

    // Disabling admin takes effect on the next reload without a restart.
    let disabled = common::relay_config(&webhook, "", "").replace("enabled = true", "enabled = false");
    common::rewrite(&path, &disabled, 10);
    services.reload.reload(true).unwrap();
    let (status, _) = call(&app, admin_request("GET", "/status", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_config_is_redacted() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "tok", ""));
    let (_services, app) = common::build_app(&path);

    let (status, body) = call(&app, admin_request("GET", "/config", None)).await;
    assert_eq!(status, StatusCode::OK);
    let config = &body["data"]["config"];
    assert_eq!(config["auth"]["token"], "<secret>");
    assert_eq!(config["admin"]["basic_auth"]["password"], "<secret>");
    assert_eq!(config["messaging"]["targets"][0]["webhook"], "<secret>");
    assert_eq!(body["data"]["sensitive"]["auth_token_set"], true);
    assert_eq!(body["data"]["sensitive"]["targets"]["ops"]["secret_set"], false);
    assert!(!body.to_string().contains(&addr.to_string()));
}

#[tokio::test]
async fn test_admin_templates_and_render() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("templates")).unwrap();
    std::fs::write(dir.path().join("templates/short.tmpl"), "{{ payload.status }}:{{ firing_count }}").unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (_services, app) = common::build_app(&path);

    let (_, body) = call(&app, admin_request("GET", "/templates", None)).await;
    assert_eq!(body["data"]["templates"], serde_json::json!(["default", "short"]));

    let res = app.clone().oneshot(admin_request("GET", "/templates/short", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&text[..], b"{{ payload.status }}:{{ firing_count }}");

    let (status, _) = call(&app, admin_request("GET", "/templates/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let render = serde_json::json!({ "template": "short", "payload": common::firing_payload() });
    let (status, body) = call(&app, admin_request("POST", "/render", Some(render))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "firing:1");

    let preview = serde_json::json!({ "template_text": "{{ payload.receiver }}", "payload": common::firing_payload() });
    let (_, body) = call(&app, admin_request("POST", "/render", Some(preview))).await;
    assert_eq!(body["data"]["content"], "default");

    let unknown = serde_json::json!({ "group": "ghost", "payload": {} });
    let (status, body) = call(&app, admin_request("POST", "/render", Some(unknown))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "unknown group");

    let invalid = serde_json::json!({ "template_text": "{% if %}" });
    let (status, _) = call(&app, admin_request("POST", "/template-validate", Some(invalid))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_send_raw_text() {
    let (addr, inbox) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (_services, app) = common::build_app(&path);

    let send = serde_json::json!({ "raw_text": "hello from admin", "payload": {} });
    let (status, body) = call(&app, admin_request("POST", "/send", Some(send))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let captured = inbox.lock().clone();
    let sent: Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(sent["markdown"]["text"], "hello from admin");
    assert_eq!(sent["markdown"]["title"], "Alertmanager");

    let send = serde_json::json!({ "group": "ghost", "raw_text": "x" });
    let (status, _) = call(&app, admin_request("POST", "/send", Some(send))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_config_edit_rejected_before_write() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/send");
    let original = common::relay_config(&webhook, "a", "");
    let path = common::write_config(dir.path(), &original);
    let (services, app) = common::build_app(&path);
    let served = services.store.load();

    // Parses and validates, but the group's template does not exist.
    let edit = common::relay_config(&webhook, "b", "template = \"ghost\"");
    let (status, body) = call(&app, admin_text_request("PUT", "/config", &edit)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("ghost"), "{body}");

    let (status, _) = call(&app, admin_text_request("PUT", "/config", "[server\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    assert!(std::sync::Arc::ptr_eq(&served, &services.store.load()));
}

#[tokio::test]
async fn test_admin_config_edit_applied() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/send");
    let path = common::write_config(dir.path(), &common::relay_config(&webhook, "a", ""));
    let (services, app) = common::build_app(&path);

    let edit = common::relay_config(&webhook, "b", "");
    let (status, body) = call(&app, admin_text_request("PUT", "/config", &edit)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    assert_eq!(std::fs::read_to_string(&path).unwrap(), edit);
    assert_eq!(services.store.load().config.auth.token.expose(), "b");
    assert!(services.reload.status().last_success.is_some());
}

#[tokio::test]
async fn test_admin_template_edits_roll_back_on_failed_reload() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let webhook = format!("http://{addr}/send");
    let path = common::write_config(dir.path(), &common::relay_config(&webhook, "", ""));
    let (services, app) = common::build_app(&path);
    let short = dir.path().join("templates").join("short.tmpl");

    let (status, body) = call(&app, admin_text_request("PUT", "/templates/short", "{{ payload.status }}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(short.exists());
    assert!(services.store.load().renderer.has_template("short"));

    let (status, _) = call(&app, admin_text_request("PUT", "/templates/broken", "{% if %}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!dir.path().join("templates").join("broken.tmpl").exists());

    let (status, _) = call(&app, admin_text_request("PUT", "/templates/..hidden", "x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Bind the default group to the new template, then try to delete it.
    let edit = common::relay_config(&webhook, "", "template = \"short\"");
    let (status, body) = call(&app, admin_text_request("PUT", "/config", &edit)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(&app, admin_request("DELETE", "/templates/short", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("short"), "{body}");
    assert_eq!(std::fs::read_to_string(&short).unwrap(), "{{ payload.status }}");
    assert!(services.store.load().renderer.has_template("short"));
    assert!(services.reload.status().last_error.is_empty());

    let (status, _) = call(&app, admin_request("DELETE", "/templates/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_template_named_validate() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_config(dir.path(), &common::relay_config(&format!("http://{addr}/send"), "", ""));
    let (services, app) = common::build_app(&path);

    let (status, _) = call(&app, admin_text_request("PUT", "/templates/validate", "v")).await;
    assert_eq!(status, StatusCode::OK);

    let res = app.clone().oneshot(admin_request("GET", "/templates/validate", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&text[..], b"v");

    let (status, _) = call(&app, admin_request("DELETE", "/templates/validate", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!services.store.load().renderer.has_template("validate"));
}

#[tokio::test]
async fn test_admin_template_edit_needs_template_dir() {
    let (addr, _) = common::start_mock_endpoint(200, OK_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let config = common::relay_config(&format!("http://{addr}/send"), "", "").replace("[template]\ndir = \"templates\"\n", "");
    let path = common::write_config(dir.path(), &config);
    let (_services, app) = common::build_app(&path);

    let (status, body) = call(&app, admin_text_request("PUT", "/templates/short", "x")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "template.dir is not configured");
}
