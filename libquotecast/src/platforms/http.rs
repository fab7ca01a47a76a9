//! JSON-over-HTTP platform client
//!
//! Talks to an upload gateway exposing two endpoints:
//!
//! - `POST {base_url}/login` with `{"username", "password"}`, answering
//!   `{"token"}`
//! - `POST {base_url}/media` with a bearer token and
//!   `{"image_base64", "caption"}`, answering `{"media_id", "code"}`
//!
//! HTTP statuses and error bodies are mapped onto structured
//! [`PlatformError`] kinds so the failure classifier can rely on them.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::contains_marker;
use crate::clock::{Clock, SystemClock};
use crate::error::PlatformError;
use crate::platforms::Platform;
use crate::types::Confirmation;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct MediaRequest<'a> {
    image_base64: String,
    caption: &'a str,
}

#[derive(Debug, Deserialize)]
struct MediaResponse {
    media_id: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
}

/// Map an HTTP failure status and its body to a platform error
///
/// The body's `message`/`error_type` fields are used when the body is JSON;
/// otherwise the raw text is kept.
pub fn map_status(status: StatusCode, body: &str, context: &str) -> PlatformError {
    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => [parsed.error_type, parsed.message]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(": "),
        Err(_) => body.trim().to_string(),
    };
    let detail = if detail.is_empty() {
        status.to_string()
    } else {
        detail
    };
    let lower = detail.to_lowercase();
    let message = format!("{} failed ({}): {}", context, status.as_u16(), detail);

    if contains_marker(&lower, "spam") {
        return PlatformError::Spam(message);
    }
    if contains_marker(&lower, "block") || contains_marker(&lower, "blocked") {
        return PlatformError::Blocked(message);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => PlatformError::RateLimit(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PlatformError::Authentication(message),
        s if s.is_server_error() => PlatformError::Server(message),
        _ => PlatformError::Other(message),
    }
}

fn map_transport(error: reqwest::Error, context: &str) -> PlatformError {
    if error.is_timeout() || error.is_connect() {
        PlatformError::Network(format!("{} failed: {}", context, error))
    } else {
        PlatformError::Other(format!("{} failed: {}", context, error))
    }
}

pub struct HttpPlatform {
    client: Client,
    base_url: String,
    username: String,
    password: SecretString,
    token: Option<SecretString>,
}

impl HttpPlatform {
    /// Create a client for the gateway at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Other` if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        username: String,
        password: SecretString,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlatformError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username,
            password,
            token: None,
        })
    }

    async fn read_failure(response: reqwest::Response, context: &str) -> PlatformError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        map_status(status, &body, context)
    }
}

#[async_trait]
impl Platform for HttpPlatform {
    async fn login(&mut self) -> Result<(), PlatformError> {
        let url = format!("{}/login", self.base_url);
        debug!("Logging in as {} via {}", self.username, url);

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: self.password.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| map_transport(e, "login"))?;

        if !response.status().is_success() {
            let error = Self::read_failure(response, "login").await;
            // Any non-abuse rejection of the login itself is a credential problem
            return Err(match error {
                PlatformError::Other(message) => PlatformError::Authentication(message),
                other => other,
            });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Authentication(format!("Invalid login response: {}", e)))?;
        self.token = Some(SecretString::from(body.token));
        Ok(())
    }

    async fn publish(&self, image: Vec<u8>, caption: &str) -> Result<Confirmation, PlatformError> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| PlatformError::Authentication("Not logged in".to_string()))?;

        let url = format!("{}/media", self.base_url);
        let payload = MediaRequest {
            image_base64: base64::engine::general_purpose::STANDARD.encode(&image),
            caption,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_transport(e, "upload"))?;

        if !response.status().is_success() {
            return Err(Self::read_failure(response, "upload").await);
        }

        let body: MediaResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Other(format!("Invalid upload response: {}", e)))?;

        Ok(Confirmation {
            media_id: body.media_id,
            code: body.code,
            published_at: SystemClock.now(),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_429_to_rate_limit() {
        let error = map_status(StatusCode::TOO_MANY_REQUESTS, "", "upload");
        assert!(matches!(error, PlatformError::RateLimit(_)));
    }

    #[test]
    fn test_map_401_to_authentication() {
        let error = map_status(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "session expired"}"#,
            "upload",
        );
        match error {
            PlatformError::Authentication(message) => {
                assert!(message.contains("401"));
                assert!(message.contains("session expired"));
            }
            other => panic!("Expected Authentication, got {:?}", other),
        }
    }

    #[test]
    fn test_map_spam_body_overrides_status() {
        let error = map_status(
            StatusCode::BAD_REQUEST,
            r#"{"error_type": "feedback_required", "message": "flagged as spam"}"#,
            "upload",
        );
        assert!(matches!(error, PlatformError::Spam(_)));
    }

    #[test]
    fn test_map_block_body() {
        let error = map_status(StatusCode::FORBIDDEN, "Action Blocked", "upload");
        assert!(matches!(error, PlatformError::Blocked(_)));
    }

    #[test]
    fn test_map_blocking_timeout_is_not_a_block() {
        let error = map_status(
            StatusCode::GATEWAY_TIMEOUT,
            "blocking read timed out",
            "upload",
        );
        assert!(matches!(error, PlatformError::Server(_)));
    }

    #[test]
    fn test_map_server_error() {
        let error = map_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", "upload");
        assert!(matches!(error, PlatformError::Server(_)));
    }

    #[test]
    fn test_map_unknown_client_error_is_other() {
        let error = map_status(
            StatusCode::BAD_REQUEST,
            r#"{"error_type": "checkpoint_required"}"#,
            "upload",
        );
        assert_eq!(
            error,
            PlatformError::Other("upload failed (400): checkpoint_required".into())
        );
    }

    #[tokio::test]
    async fn test_publish_without_login_is_authentication_error() {
        let platform = HttpPlatform::new(
            "http://127.0.0.1:9",
            "quotes".into(),
            SecretString::from("secret".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let result = platform.publish(vec![1, 2, 3], "caption").await;
        assert!(matches!(result, Err(PlatformError::Authentication(_))));
    }
}
