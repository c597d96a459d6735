//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use alert_relay::http::{AppState, HttpServer};
use alert_relay::lifecycle::{self, Services};

/// A request captured by a mock endpoint.
#[derive(Debug, Clone)]
pub struct Captured {
    /// Request target, including the query string.
    pub target: String,
    pub body: String,
}

/// Requests received by a mock endpoint, in arrival order.
pub type Inbox = Arc<Mutex<Vec<Captured>>>;

/// Start a mock robot endpoint on an ephemeral port that answers every
/// request with `status` and `body`.
pub async fn start_mock_endpoint(status: u16, body: &'static str) -> (SocketAddr, Inbox) {
    start_programmable_endpoint(move || async move { (status, body.to_string()) }).await
}

/// Start a mock robot endpoint whose answer comes from `f`.
pub async fn start_programmable_endpoint<F, Fut>(f: F) -> (SocketAddr, Inbox)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let inbox: Inbox = Arc::default();
    let f = Arc::new(f);

    let captured = Arc::clone(&inbox);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = Arc::clone(&f);
                    let captured = Arc::clone(&captured);
                    tokio::spawn(async move {
                        if let Some(request) = read_request(socket).await {
                            let (mut socket, req) = request;
                            captured.lock().push(req);
                            let (status, body) = f().await;
                            let status_text = match status {
                                200 => "200 OK",
                                400 => "400 Bad Request",
                                500 => "500 Internal Server Error",
                                503 => "503 Service Unavailable",
                                _ => "200 OK",
                            };
                            let response = format!(
                                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                status_text,
                                body.len(),
                                body
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, inbox)
}

async fn read_request(mut socket: TcpStream) -> Option<(TcpStream, Captured)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Some((socket, Captured { target, body }))
}

/// Config text for a relay with one target pointing at `webhook`.
pub fn relay_config(webhook: &str, token: &str, extra: &str) -> String {
    format!(
        r#"
[auth]
token = "{token}"

[admin]
enabled = true

[admin.basic_auth]
username = "admin"
password = "pw"

[template]
dir = "templates"

[[messaging.targets]]
name = "ops"
webhook = "{webhook}"

[[messaging.groups]]
name = "default"
targets = ["ops"]
{extra}
"#
    )
}

/// Write `text` as `config.toml` under `dir`.
pub fn write_config(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, text).unwrap();
    path
}

/// Rewrite a file with its mtime pushed forward so polling notices it.
pub fn rewrite(path: &Path, text: &str, step_secs: u64) {
    std::fs::write(path, text).unwrap();
    std::fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(std::time::SystemTime::now() + std::time::Duration::from_secs(step_secs))
        .unwrap();
}

/// Build the services and the fully layered router for `config_path`.
pub fn build_app(config_path: &Path) -> (Services, axum::Router) {
    let services = lifecycle::initialize(config_path).unwrap();
    let state = AppState::new(Arc::clone(&services.store), Arc::clone(&services.reload));
    let router = HttpServer::new(state).router();
    (services, router)
}

/// A minimal firing Alertmanager payload.
pub fn firing_payload() -> serde_json::Value {
    serde_json::json!({
        "version": "4",
        "status": "firing",
        "receiver": "default",
        "commonLabels": { "alertname": "HighCPU", "severity": "critical" },
        "commonAnnotations": { "summary": "cpu too high" },
        "alerts": [{
            "status": "firing",
            "labels": { "alertname": "HighCPU", "severity": "critical" },
            "annotations": { "summary": "cpu too high" },
            "startsAt": "2024-01-01T00:00:00Z"
        }]
    })
}
