#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use devcamper_api::app;
use devcamper_api::auth;
use devcamper_api::config::AppConfig;
use devcamper_api::database::models::NewUser;
use devcamper_api::database::UserStore;
use devcamper_api::state::AppState;
use devcamper_api::testing::{MemoryStore, RecordingMailer, StaticGeocoder};
use devcamper_api::types::Role;

pub const PASSWORD: &str = "123456";
pub const BOSTON: &str = "233 Bay State Rd Boston MA 02215";
pub const LOWELL: &str = "220 Pawtucket St Lowell MA 01854";
pub const KINGSTON: &str = "45 Upper College Rd Kingston RI 02881";
/// South End, Boston
pub const BOSTON_ZIP: &str = "02118";

/// A server bound to its own port with its own in-memory store
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub upload_dir: PathBuf,
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(configure: impl FnOnce(&mut AppConfig)) -> Result<TestApp> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();

    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let upload_dir = std::env::temp_dir().join(format!("devcamper-uploads-{}", port));

    let mut config = AppConfig::development();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.server.public_base_url = format!("http://127.0.0.1:{}", port);
    config.security.bcrypt_cost = 4;
    config.api.enable_rate_limiting = false;
    config.upload.path = upload_dir.clone();
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let geocoder = StaticGeocoder::new()
        .with(BOSTON, 42.350846, -71.104028)
        .with(LOWELL, 42.643951, -71.324137)
        .with(KINGSTON, 41.485, -71.530)
        .with(BOSTON_ZIP, 42.3360, -71.0709);

    let state = AppState::new(config, store.clone(), Arc::new(geocoder), mailer.clone());
    let router = app::router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum_serve(listener, router).await;
    });

    Ok(TestApp {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        store,
        mailer,
        upload_dir,
    })
}

async fn axum_serve(listener: tokio::net::TcpListener, router: axum::Router) -> std::io::Result<()> {
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Register through the API and return the bearer token
    pub async fn register(&self, name: &str, email: &str, role: &str) -> Result<String> {
        let res = self
            .client
            .post(self.api("/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": PASSWORD, "role": role }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "register {} failed: {}", email, res.status());
        token_of(res).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.api("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?)
    }

    /// Admins cannot self-register; they are created in the store directly
    pub async fn admin(&self) -> Result<String> {
        let email = "admin@devcamper.io";
        self.store
            .create_user(NewUser {
                name: "Admin Account".to_string(),
                email: email.to_string(),
                role: Role::Admin,
                password_hash: auth::hash_password(PASSWORD.to_string(), 4).await?,
            })
            .await?;
        token_of(self.login(email, PASSWORD).await?).await
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str, address: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.api("/bootcamps"))
            .bearer_auth(token)
            .json(&bootcamp_body(name, address))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create bootcamp failed: {}", res.status());
        Ok(res.json::<Value>().await?["data"].clone())
    }

    pub async fn add_course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: u32) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.api(&format!("/bootcamps/{}/courses", bootcamp_id)))
            .bearer_auth(token)
            .json(&json!({
                "title": title,
                "description": "Hands-on projects from day one",
                "weeks": "8",
                "tuition": tuition,
                "minimumSkill": "beginner"
            }))
            .send()
            .await?)
    }

    pub async fn add_review(&self, token: &str, bootcamp_id: &str, rating: u32) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.api(&format!("/bootcamps/{}/reviews", bootcamp_id)))
            .bearer_auth(token)
            .json(&json!({ "title": "Learned a ton", "text": "Great instructors", "rating": rating }))
            .send()
            .await?)
    }

    pub async fn get_json(&self, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.api(path)).send().await?;
        let status = res.status();
        Ok((status, res.json::<Value>().await?))
    }
}

pub fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": "Full stack web development",
        "website": "https://example.com",
        "email": "info@example.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
        "housing": true,
        "jobAssistance": true
    })
}

pub async fn token_of(res: reqwest::Response) -> Result<String> {
    let body = res.json::<Value>().await?;
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("response carried no token")
}
