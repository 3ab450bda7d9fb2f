//! HTTP client for the auth service endpoints used by the login flow. One
//! client keeps a cookie store for its whole life, so session cookies set by
//! verify/exchange ride along on later calls (the "credentials included"
//! contract of the web form).

use super::{
    error::AuthError,
    types::{ExchangeCodeRequest, SendCodeRequest, SessionGrant, VerifyCodeRequest},
};
use crate::APP_USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

pub const SEND_CODE_PATH: &str = "/v1/user/auth/otp/send";
pub const VERIFY_CODE_PATH: &str = "/v1/user/auth/otp/verify";
pub const EXCHANGE_SESSION_PATH: &str = "/v1/user/auth/github/verify";

/// Default request timeout applied to every auth call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error message characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

/// The auth service as seen by the login flow.
#[allow(async_fn_in_trait)]
pub trait AuthService {
    /// Ask the service to email a one-time code.
    async fn send_code(&self, request: &SendCodeRequest) -> Result<(), AuthError>;

    /// Trade email + code for a session.
    async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<SessionGrant, AuthError>;

    /// Trade an OAuth callback code for a session.
    async fn exchange_session(
        &self,
        request: &ExchangeCodeRequest,
    ) -> Result<SessionGrant, AuthError>;
}

#[derive(Clone, Debug)]
pub struct HttpAuthClient {
    client: Client,
    base_url: String,
}

impl HttpAuthClient {
    /// # Errors
    /// Returns `AuthError::Config` if the base URL is not http(s) or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthError> {
        let base_url = base_url.trim();
        let parsed = Url::parse(base_url)
            .map_err(|err| AuthError::Config(format!("invalid base URL {base_url}: {err}")))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AuthError::Config(format!(
                "unsupported scheme {} in {base_url}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|err| AuthError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim().trim_start_matches('/'))
    }

    /// POST a JSON body and return the raw response text on HTTP 200.
    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<String, AuthError> {
        let url = self.endpoint(path);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;

        debug!("{} - {}", url, status);

        if status == StatusCode::OK {
            Ok(text)
        } else {
            Err(AuthError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            })
        }
    }
}

impl AuthService for HttpAuthClient {
    #[instrument(skip_all)]
    async fn send_code(&self, request: &SendCodeRequest) -> Result<(), AuthError> {
        self.post(SEND_CODE_PATH, request).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<SessionGrant, AuthError> {
        let body = self.post(VERIFY_CODE_PATH, request).await?;
        Ok(parse_grant(&body))
    }

    #[instrument(skip_all)]
    async fn exchange_session(
        &self,
        request: &ExchangeCodeRequest,
    ) -> Result<SessionGrant, AuthError> {
        let body = self.post(EXCHANGE_SESSION_PATH, request).await?;
        Ok(parse_grant(&body))
    }
}

fn map_request_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Network(err.to_string())
    }
}

/// A 200 without a usable JSON body still means "signed in", just without a submission.
fn parse_grant(body: &str) -> SessionGrant {
    if body.trim().is_empty() {
        return SessionGrant::default();
    }

    serde_json::from_str(body).unwrap_or_else(|err| {
        warn!("Ignoring undecodable auth response body: {err}");
        SessionGrant::default()
    })
}

/// Pull `message` out of an error body. Validation errors may carry a list of messages.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    let message = match &json["message"] {
        Value::String(message) => message.clone(),
        Value::Array(messages) => messages
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };

    let trimmed = message.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(MAX_ERROR_CHARS).collect())
    }
}
