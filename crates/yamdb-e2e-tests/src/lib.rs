use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow};
use rand::Rng as _;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::info;
use yamdb_auth::{code::ConfirmationCode, mail::MemoryMailer};
use yamdb_dal::user::{NewUser, UserRepository};
use yamdb_server::{
    config::{Parser as _, ServerConfig},
    run::{build_state_with_mailer, run_graceful_with_state},
};
use yamdb_types::Role;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix(format!("{}_", test_name))?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?.to_string();
    let args = &[
        "yamdb-e2e-tests",
        "--data-dir",
        &data_dir,
        "--port",
        &port,
        "--mail-body",
        "{confirmation_code}",
        "--default-page-size",
        "10",
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Server running in the background of a test, stopped on drop
pub struct TestServer {
    pub base_url: Url,
    pub client: reqwest::Client,
    mailer: MemoryMailer,
    users: UserRepository,
    shutdown: Option<oneshot::Sender<()>>,
    _config_guard: ConfigGuard,
}

impl TestServer {
    pub async fn start(test_name: &str) -> Result<Self> {
        let (args, config_guard) = test_config(test_name)?;
        let base_url = Url::parse(&format!("http://127.0.0.1:{}/", args.port))?;
        let mailer = MemoryMailer::new();
        let state = build_state_with_mailer(&args, Arc::new(mailer.clone())).await?;
        let users = UserRepository::new(state.pool().clone());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = rx.await;
            };
            if let Err(e) = run_graceful_with_state(args, state, shutdown).await {
                tracing::error!("Test server failed: {e}");
            }
        });

        let server = TestServer {
            base_url,
            client: reqwest::Client::new(),
            mailer,
            users,
            shutdown: Some(tx),
            _config_guard: config_guard,
        };
        server.wait_ready().await?;
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<()> {
        let url = self.base_url.join("health")?;
        for _ in 0..50 {
            if let Ok(response) = self.client.get(url.clone()).send().await {
                if response.status().is_success() {
                    info!("Test server ready at {}", self.base_url);
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Err(anyhow!("Server did not start"))
    }

    /// URL of an API resource, path relative to `/api/v1/`
    pub fn api(&self, path: &str) -> Url {
        self.base_url
            .join("api/v1/")
            .and_then(|base| base.join(path))
            .expect("valid API path")
    }

    /// Last confirmation code mailed to the address
    pub fn confirmation_code(&self, email: &str) -> Option<String> {
        self.mailer
            .sent()
            .into_iter()
            .rev()
            .find(|m| m.to.iter().any(|to| to == email))
            .map(|m| m.body.trim().to_string())
    }

    /// Registers an active user with the role directly in the database and
    /// returns an access token obtained through the API
    pub async fn create_user(&self, username: &str, role: Role) -> Result<String> {
        let code = ConfirmationCode::generate();
        let email = format!("{username}@example.com");
        self.users
            .register(
                NewUser::new(username, email).with_role(role),
                code.as_ref(),
                |_| async { Ok::<_, std::io::Error>(()) },
            )
            .await?;
        self.obtain_token(username, code.as_ref()).await
    }

    pub async fn obtain_token(&self, username: &str, code: &str) -> Result<String> {
        let response = self
            .client
            .post(self.api("auth/token"))
            .json(&json!({"username": username, "confirmation_code": code}))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(anyhow!(
                "Token request failed with {}: {}",
                response.status(),
                response.text().await?
            ));
        }
        let body: Value = response.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("No token in response"))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub mod rest {
    use super::*;

    pub async fn create_category(
        server: &TestServer,
        token: &str,
        name: &str,
        slug: &str,
    ) -> Result<Value> {
        create(server, token, "categories", json!({"name": name, "slug": slug})).await
    }

    pub async fn create_genre(
        server: &TestServer,
        token: &str,
        name: &str,
        slug: &str,
    ) -> Result<Value> {
        create(server, token, "genres", json!({"name": name, "slug": slug})).await
    }

    pub async fn create_title(server: &TestServer, token: &str, payload: Value) -> Result<Value> {
        create(server, token, "titles", payload).await
    }

    pub async fn create(
        server: &TestServer,
        token: &str,
        path: &str,
        payload: Value,
    ) -> Result<Value> {
        let response = server
            .client
            .post(server.api(path))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            return Err(anyhow!(
                "Create {path} failed with {}: {}",
                response.status(),
                response.text().await?
            ));
        }
        Ok(response.json().await?)
    }
}
