//! Relay requests that passed the gate to the upstream origin.

use crate::APP_USER_AGENT;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, FailedToBufferBody},
        State,
    },
    http::{
        header::{
            CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
            TRANSFER_ENCODING, UPGRADE,
        },
        uri::PathAndQuery,
        HeaderMap, HeaderName, Method, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Largest request body relayed upstream.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Default time allowed for the origin to answer.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    /// # Errors
    /// Returns an error if the URL is not http(s) or the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url.trim())
            .with_context(|| format!("Invalid upstream URL: {base_url}"))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Error parsing URL: unsupported scheme {}",
                parsed.scheme()
            ));
        }

        // Redirects from the origin belong to the browser, not to us.
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .redirect(Policy::none())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    #[instrument(skip_all)]
    async fn relay(
        &self,
        method: Method,
        uri: &Uri,
        mut headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response> {
        let target = self.target(uri.path_and_query().map_or("/", PathAndQuery::as_str));

        strip_hop_by_hop(&mut headers);
        headers.remove(HOST);

        let upstream = self
            .client
            .request(method, &target)
            .headers(headers)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Upstream request failed: {target}"))?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let bytes = upstream
            .bytes()
            .await
            .context("Failed to read upstream body")?;

        debug!("{} - {}", target, status);

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

// axum fallback handler for everything the gate let through; the body limit
// comes from the `DefaultBodyLimit` layer on the router
pub async fn forward(
    State(upstream): State<Upstream>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(err))) => {
            warn!("{} {}: {err}", method, uri.path());
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
        Err(rejection) => {
            warn!("{} {}: {rejection}", method, uri.path());
            return rejection.into_response();
        }
    };

    match upstream.relay(method, &uri, headers, body).await {
        Ok(response) => response,
        Err(err) if is_timeout(&err) => {
            error!("{err:#}");
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
        Err(err) => {
            error!("{err:#}");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

fn is_timeout(err: &anyhow::Error) -> bool {
    err.downcast_ref::<reqwest::Error>()
        .is_some_and(reqwest::Error::is_timeout)
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in [
        CONNECTION,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
        HeaderName::from_static("keep-alive"),
    ] {
        headers.remove(name);
    }
}
