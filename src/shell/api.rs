//! HTTP client for the gateway, used by the client shell.
//!
//! Network-level failures collapse into a single generic connectivity
//! error — the shell shows a banner, never a stack trace. Missing
//! provider key and empty code are caught here before any network call.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Generous: an optimize round trip includes the provider call.
const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Client-side failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend itself could not be reached.
    #[error("Cannot reach the PyTurbo backend. Is it running?")]
    ServerUnavailable,
    /// Rejected locally, before any network call.
    #[error("{0}")]
    Precheck(String),
    /// A structured error from the backend's `detail` envelope.
    #[error("{detail}")]
    Api { status: u16, detail: String },
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: String,
}

/// Successful login reply.
#[derive(Debug, Deserialize)]
pub struct LoginReply {
    pub username: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct OptimizeReply {
    result: String,
}

/// Health reply from the gateway.
#[derive(Debug, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub engine: String,
}

/// Typed client over the gateway's HTTP surface.
pub struct ShellClient {
    base_url: String,
    http: reqwest::Client,
}

impl ShellClient {
    /// Create a client against the gateway base URL
    /// (e.g. `http://127.0.0.1:8000`).
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// POST /signup. Success carries no data; the user still logs in.
    pub async fn signup(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(format!("{}/signup", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(api_error(resp).await)
        }
    }

    /// POST /login.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginReply, ClientError> {
        let resp = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status().is_success() {
            resp.json().await.map_err(transport_error)
        } else {
            Err(api_error(resp).await)
        }
    }

    /// POST /optimize. The provider key is sent per request only.
    pub async fn optimize(
        &self,
        api_key: &str,
        model: &str,
        code: &str,
    ) -> Result<String, ClientError> {
        if api_key.trim().is_empty() {
            return Err(ClientError::Precheck(
                "Enter your provider API key first".into(),
            ));
        }
        if code.trim().is_empty() {
            return Err(ClientError::Precheck(
                "Paste some Python code to optimize".into(),
            ));
        }

        let resp = self
            .http
            .post(format!("{}/optimize", self.base_url))
            .bearer_auth(api_key.trim())
            .json(&serde_json::json!({ "code": code, "model": model }))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status().is_success() {
            let reply: OptimizeReply = resp.json().await.map_err(transport_error)?;
            Ok(reply.result)
        } else {
            Err(api_error(resp).await)
        }
    }

    /// GET /health.
    pub async fn health(&self) -> Result<HealthReply, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        if resp.status().is_success() {
            resp.json().await.map_err(transport_error)
        } else {
            Err(api_error(resp).await)
        }
    }
}

fn transport_error(_: reqwest::Error) -> ClientError {
    ClientError::ServerUnavailable
}

async fn api_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let detail = resp
        .json::<ErrorEnvelope>()
        .await
        .map(|e| e.detail)
        .unwrap_or_default();
    ClientError::Api { status, detail }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn signup_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({"message": "User created successfully"})),
            )
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());
        client.signup("alice", "Secret123").await.unwrap();
    }

    #[tokio::test]
    async fn signup_duplicate_surfaces_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/signup"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"detail": "User already exists"})),
            )
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());
        let err = client.signup("alice", "Secret123").await.unwrap_err();
        match err {
            ClientError::Api { status, detail } => {
                assert_eq!(status, 400);
                assert_eq!(detail, "User already exists");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_success_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"username": "alice", "status": "authenticated"}),
            ))
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());
        let reply = client.login("alice", "Secret123").await.unwrap();
        assert_eq!(reply.username, "alice");
        assert_eq!(reply.status, "authenticated");
    }

    #[tokio::test]
    async fn optimize_prechecks_block_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());

        let err = client.optimize("", "gpt-4o", "print(1)").await.unwrap_err();
        assert!(matches!(err, ClientError::Precheck(_)));

        let err = client.optimize("sk-test", "gpt-4o", "  ").await.unwrap_err();
        assert!(matches!(err, ClientError::Precheck(_)));
    }

    #[tokio::test]
    async fn optimize_sends_bearer_key_and_returns_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/optimize"))
            .and(header("Authorization", "Bearer sk-test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": "## Optimized"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());
        let result = client
            .optimize("sk-test", "gpt-4o", "print(1)")
            .await
            .unwrap();
        assert_eq!(result, "## Optimized");
    }

    #[tokio::test]
    async fn unreachable_backend_is_server_unavailable() {
        // Nothing listens on this port.
        let client = ShellClient::new("http://127.0.0.1:1");
        let err = client.login("alice", "Secret123").await.unwrap_err();
        assert!(matches!(err, ClientError::ServerUnavailable));
    }

    #[tokio::test]
    async fn health_parses_engine_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"status": "active", "engine": "PyTurbo AI v2.0.0"}),
            ))
            .mount(&server)
            .await;

        let client = ShellClient::new(&server.uri());
        let health = client.health().await.unwrap();
        assert_eq!(health.status, "active");
        assert!(health.engine.contains("PyTurbo"));
    }
}
