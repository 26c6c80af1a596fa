#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{redirect, Client, StatusCode};
use serde_json::Value;

pub const DEMO_PASSWORD: &str = "password123";
pub const STUDENT: &str = "student@skyshift.com";
pub const INSTRUCTOR: &str = "instructor@skyshift.com";
pub const ADMIN: &str = "admin@skyshift.com";

/// Server binary on its own port with a fresh in-memory store and the demo
/// accounts. The process is killed when the handle drops.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_skyshift-api"))
            .env("APP_ENV", "development")
            .env("SKYSHIFT_STORE", "memory")
            .env("SKYSHIFT_SEED_ON_START", "true")
            .env("SKYSHIFT_HOST", "127.0.0.1")
            .env("SKYSHIFT_PORT", port.to_string())
            .env("AUTH_SECRET", "integration-test-secret")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self { port, base_url, child };
        server.wait_ready(Duration::from_secs(20)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(self.url("/health")).send().await {
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

    /// Client that keeps cookies and reports redirects instead of following them
    pub fn browser(&self) -> Result<Client> {
        Ok(Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()?)
    }

    /// Run the credentials flow; the returned response is the final redirect
    pub async fn sign_in(&self, client: &Client, email: &str, password: &str) -> Result<reqwest::Response> {
        let csrf: Value = client.get(self.url("/api/auth/csrf")).send().await?.json().await?;
        let token = csrf["csrfToken"].as_str().context("csrf token missing")?.to_string();

        let response = client
            .post(self.url("/api/auth/callback/credentials"))
            .form(&[
                ("csrfToken", token.as_str()),
                ("email", email),
                ("password", password),
                ("callbackUrl", "/dashboard"),
            ])
            .send()
            .await?;
        Ok(response)
    }

    /// Signed-in browser for one of the demo accounts
    pub async fn signed_in(&self, email: &str) -> Result<Client> {
        let client = self.browser()?;
        let response = self.sign_in(&client, email, DEMO_PASSWORD).await?;
        anyhow::ensure!(
            location(&response) == "/dashboard",
            "sign-in for {} redirected to {:?}",
            email,
            location(&response)
        );
        Ok(client)
    }

    pub async fn query(&self, client: &Client, path: &str, input: Option<&Value>) -> Result<(StatusCode, Value)> {
        let mut request = client.get(self.url(&format!("/api/trpc/{}", path)));
        if let Some(input) = input {
            request = request.query(&[("input", input.to_string())]);
        }
        let response = request.send().await?;
        Ok((response.status(), response.json().await?))
    }

    pub async fn mutation(&self, client: &Client, path: &str, input: &Value) -> Result<(StatusCode, Value)> {
        let response = client
            .post(self.url(&format!("/api/trpc/{}", path)))
            .json(input)
            .send()
            .await?;
        Ok((response.status(), response.json().await?))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
