//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use reqwest::redirect::Policy;
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use twitodon_oauth::TwitterConfig;
use twitodon_server::{AppState, Server, ServerConfig};
use twitodon_store::SqliteStore;

pub const COOKIE_SECRET: &str = "integration-tests-cookie-secret-0123456789";

/// A server running in the background against mocked providers.
pub struct TestServer {
    pub addr: SocketAddr,
    /// Cookie-keeping client that does not follow redirects.
    pub client: Client,
    /// Stands in for `api.twitter.com`.
    pub twitter: MockServer,
    /// Stands in for a Mastodon server.
    pub mastodon: MockServer,
    _handle: JoinHandle<()>,
    /// Holds the SQLite database.
    pub temp_dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let twitter = MockServer::start().await;
        let mastodon = MockServer::start().await;

        let addr = find_available_port().await?;

        let store = Arc::new(SqliteStore::open(&temp_dir.path().join("twitodon.db"))?);
        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);
        let twitter_config = TwitterConfig::new("test-client").with_endpoints(
            format!("{}/i/oauth2/authorize", twitter.uri()),
            twitter.uri(),
        );

        let state = AppState::new(config, store, twitter_config, COOKIE_SECRET.as_bytes())?;
        let server = Server::from_state(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()?;
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            twitter,
            mastodon,
            _handle: handle,
            temp_dir,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.get(format!("{}{}", self.base_url(), path))
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(format!("{}{}", self.base_url(), path))
    }

    /// Mount the Twitter token, identity and following endpoints.
    pub async fn mock_twitter(&self) {
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "bearer",
                "access_token": "t-token",
                "expires_in": 7200
            })))
            .mount(&self.twitter)
            .await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header("authorization", "Bearer t-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "123", "username": "jack", "name": "Jack"}
            })))
            .mount(&self.twitter)
            .await;
        Mock::given(method("GET"))
            .and(path("/2/users/123/following"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "7", "username": "alice"}],
                "meta": {"result_count": 1}
            })))
            .mount(&self.twitter)
            .await;
    }

    /// Mount the Mastodon registration, token and identity endpoints.
    pub async fn mock_mastodon(&self) {
        Mock::given(method("POST"))
            .and(path("/api/v1/apps"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "client_id": "app-id",
                "client_secret": "app-secret"
            })))
            .mount(&self.mastodon)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "m-token",
                "token_type": "Bearer"
            })))
            .mount(&self.mastodon)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/accounts/verify_credentials"))
            .and(header("authorization", "Bearer m-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "9",
                "username": "alice",
                "acct": "alice"
            })))
            .mount(&self.mastodon)
            .await;
    }

    /// Run the Twitter login to completion; returns the callback response status.
    pub async fn login_twitter(&self) -> Result<reqwest::StatusCode> {
        let body: serde_json::Value = self.get("/twitterLoginUrl").send().await?.json().await?;
        let login_url = url::Url::parse(
            body["twitterLoginUrl"]
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("no twitterLoginUrl"))?,
        )?;
        let state = login_url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| anyhow::anyhow!("no state"))?;

        let response = self
            .get(&format!("/twitterAuth?code=abc&state={}", state))
            .send()
            .await?;
        Ok(response.status())
    }

    /// Run the Mastodon login to completion; returns the callback response status.
    pub async fn login_mastodon(&self) -> Result<reqwest::StatusCode> {
        let response = self
            .get("/mastodonLoginUrl")
            .query(&[("mastodonHost", self.mastodon.uri())])
            .send()
            .await?;
        anyhow::ensure!(response.status().is_success(), "login url failed");

        let response = self.get("/mastodonAuth?code=abc").send().await?;
        Ok(response.status())
    }
}

/// Number of requests `server` received for `request_path`.
pub async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
