#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Admin account the spawned server creates at startup
pub const ADMIN_EMAIL: &str = "bootstrap-admin@example.com";
pub const ADMIN_PASSWORD: &str = "bootstrap-admin-password";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    upload_dir: TempDir,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let upload_dir = tempfile::tempdir().context("failed to create upload dir")?;

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_visa-intake-api"));
        cmd.arg("--port")
            .arg(port.to_string())
            .arg("--upload-dir")
            .arg(upload_dir.path())
            // Fail fast when no database is running
            .env("DATABASE_CONNECTION_TIMEOUT", "3")
            .env("ADMIN_EMAIL", ADMIN_EMAIL)
            .env("ADMIN_PASSWORD", ADMIN_PASSWORD)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL from .env (loaded by the server)
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            upload_dir,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/", self.base_url)).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Stored files whose name ends with `suffix`
    pub fn stored_files_ending_with(&self, suffix: &str) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|path| {
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n.ends_with(suffix))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(20)).await?;
    Ok(server)
}

/// True when the server we spawn can reach Postgres. Tests that need rows
/// return early otherwise.
pub async fn database_available(server: &TestServer) -> bool {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set, skipping database-backed test");
        return false;
    }
    match reqwest::get(server.url("/health")).await {
        Ok(resp) => resp.status() == StatusCode::OK,
        Err(_) => false,
    }
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

/// Register a fresh customer and return its bearer token
pub async fn register(server: &TestServer, email: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/api/v1/register"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register returned {}", res.status());

    let body: Value = res.json().await?;
    body["data"]["access_token"]
        .as_str()
        .map(str::to_string)
        .context("register response has no access_token")
}

/// Log in and return the bearer token
pub async fn login(server: &TestServer, email: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .post(server.url("/api/v1/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login returned {}", res.status());

    let body: Value = res.json().await?;
    body["data"]["access_token"]
        .as_str()
        .map(str::to_string)
        .context("login response has no access_token")
}

pub async fn admin_token(server: &TestServer) -> Result<String> {
    login(server, ADMIN_EMAIL, ADMIN_PASSWORD).await
}
