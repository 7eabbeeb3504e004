#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use fieldline_api::auth::TokenCodec;
use fieldline_api::database::seed::{self, DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD, DEMO_SUBDOMAIN};
use fieldline_api::database::MemoryStore;
use fieldline_api::state::AppState;

pub const SECRET: &str = "ZmllbGRsaW5lLXRlc3Qtc2lnbmluZy1rZXktMDEyMzQ1Njc4OWFiY2RlZg==";

/// Lowest bcrypt work factor; keeps seeding and logins fast
pub const TEST_BCRYPT_COST: u32 = 4;

pub const OTHER_SUBDOMAIN: &str = "globex";
pub const OTHER_ADMIN_EMAIL: &str = "admin@globex.com";
pub const OTHER_ADMIN_PASSWORD: &str = "globex123";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: MemoryStore,
}

impl TestServer {
    /// In-process server on a free port with two seeded organizations
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_ttl(3_600_000).await
    }

    pub async fn spawn_with_ttl(ttl_ms: u64) -> Result<Self> {
        let store = MemoryStore::new();
        seed::seed_demo(&store, &store, TEST_BCRYPT_COST).await?;
        seed::seed_tenant_admin(
            &store,
            &store,
            "Globex",
            OTHER_SUBDOMAIN,
            OTHER_ADMIN_EMAIL,
            OTHER_ADMIN_PASSWORD,
            TEST_BCRYPT_COST,
        )
        .await?;

        let tokens = TokenCodec::new(SECRET, ttl_ms)?;
        let state = AppState::new(tokens, Arc::new(store.clone()), Arc::new(store.clone()), TEST_BCRYPT_COST);

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, fieldline_api::app(state)).await;
        });

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            store,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str, subdomain: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password, "subdomain": subdomain }))
            .send()
            .await?)
    }

    /// Login that must succeed; returns the response body
    pub async fn login_ok(&self, email: &str, password: &str, subdomain: &str) -> Result<Value> {
        let res = self.login(email, password, subdomain).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed with {}", res.status());
        Ok(res.json().await?)
    }

    pub async fn acme_admin_token(&self) -> Result<String> {
        let body = self.login_ok(DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD, DEMO_SUBDOMAIN).await?;
        token_of(&body)
    }

    pub async fn globex_admin_token(&self) -> Result<String> {
        let body = self.login_ok(OTHER_ADMIN_EMAIL, OTHER_ADMIN_PASSWORD, OTHER_SUBDOMAIN).await?;
        token_of(&body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn create_user(&self, token: &str, body: Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url("/users"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?)
    }
}

pub fn token_of(body: &Value) -> Result<String> {
    body["accessToken"]
        .as_str()
        .map(str::to_string)
        .context("login response has no accessToken")
}
