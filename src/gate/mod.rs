//! Access gate evaluated on every inbound request before any page renders.
//!
//! The gate is a pure decision over the request path and whether the session
//! marker cookie (`refreshToken` by default) is present. It never touches the
//! cookie's content and keeps no state between requests.
//!
//! Two policies are available:
//!
//! - [`GatePolicy::RedirectSignedIn`] (default): signed-in visitors are sent to
//!   the product app at the configured redirect URL, everyone else passes. This
//!   is the behavior the login site ships with.
//! - [`GatePolicy::RequireSession`]: a conventional auth gate. Visitors without
//!   a session are sent to the login page unless the path is public, and
//!   signed-in visitors are kept out of the login page.
//!
//! Refresh and logout paths always pass under either policy.

mod cookie;
pub mod middleware;
mod paths;

pub use cookie::{cookie_value, has_session_marker};
pub use paths::{is_always_allowed, is_included, is_public, is_under, normalize};

use axum::http::HeaderMap;
use std::{fmt, str::FromStr};

pub const DEFAULT_SESSION_COOKIE: &str = "refreshToken";
pub const DEFAULT_LOGIN_PATH: &str = "/auth";
pub const DEFAULT_HOME_PATH: &str = "/dashboard";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GatePolicy {
    #[default]
    RedirectSignedIn,
    RequireSession,
}

impl GatePolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RedirectSignedIn => "redirect-signed-in",
            Self::RequireSession => "require-session",
        }
    }
}

impl fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "redirect-signed-in" => Ok(Self::RedirectSignedIn),
            "require-session" => Ok(Self::RequireSession),
            other => Err(format!("unknown gate policy: {other}")),
        }
    }
}

/// Outcome of evaluating the gate for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Redirect(String),
}

/// What the gate looks at: nothing more than the path and the marker presence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub has_session_marker: bool,
}

#[derive(Clone, Debug)]
pub struct GateConfig {
    pub policy: GatePolicy,
    /// External destination for signed-in visitors (`RedirectSignedIn`).
    pub redirect_url: String,
    pub session_cookie: String,
    /// Login page (`RequireSession`).
    pub login_path: String,
    /// Where signed-in visitors land when they hit the login page (`RequireSession`).
    pub home_path: String,
}

impl GateConfig {
    #[must_use]
    pub fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            policy: GatePolicy::default(),
            redirect_url: redirect_url.into(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            home_path: DEFAULT_HOME_PATH.to_string(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Clone, Debug)]
pub struct AccessGate {
    config: GateConfig,
}

impl AccessGate {
    #[must_use]
    pub const fn new(config: GateConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Whether the request path falls under the gate's inclusion filter.
    #[must_use]
    pub fn applies_to(&self, path: &str) -> bool {
        is_included(path)
    }

    /// Build the request context from the raw request parts and decide.
    #[must_use]
    pub fn evaluate(&self, path: &str, headers: &HeaderMap) -> Verdict {
        self.decide(RequestContext {
            path,
            has_session_marker: has_session_marker(headers, &self.config.session_cookie),
        })
    }

    #[must_use]
    pub fn decide(&self, request: RequestContext<'_>) -> Verdict {
        if is_always_allowed(request.path) {
            return Verdict::Allow;
        }

        match self.config.policy {
            GatePolicy::RedirectSignedIn => {
                if request.has_session_marker {
                    Verdict::Redirect(self.config.redirect_url.clone())
                } else {
                    Verdict::Allow
                }
            }
            GatePolicy::RequireSession => {
                if !request.has_session_marker && !is_public(request.path) {
                    Verdict::Redirect(self.config.login_path.clone())
                } else if request.has_session_marker
                    && is_under(request.path, &self.config.login_path)
                {
                    Verdict::Redirect(self.config.home_path.clone())
                } else {
                    Verdict::Allow
                }
            }
        }
    }
}
