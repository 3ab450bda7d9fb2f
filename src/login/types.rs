//! Request and response payloads for the auth service. Codes and session
//! exchange codes travel in these structs, so their `Debug` output is redacted
//! and they must never be logged.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeRequest {
    pub email: String,
    pub otp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl fmt::Debug for VerifyCodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyCodeRequest")
            .field("email", &self.email)
            .field("otp", &"[REDACTED]")
            .field("subscription_id", &self.subscription_id)
            .field("subscription_type", &self.subscription_type)
            .field("url", &self.url)
            .finish()
    }
}

/// One-time code handed back by the OAuth callback, traded for a session.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct ExchangeCodeRequest {
    pub code: String,
}

impl fmt::Debug for ExchangeCodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeCodeRequest")
            .field("code", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitUrl {
    pub uuid: String,
}

/// Successful verify/exchange response. The session itself arrives as cookies.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    #[serde(default)]
    pub submit_url: Option<SubmitUrl>,
}

impl SessionGrant {
    /// Identifier of the audit submission created alongside the login, if any.
    #[must_use]
    pub fn submission_id(&self) -> Option<&str> {
        self.submit_url
            .as_ref()
            .map(|submit| submit.uuid.as_str())
            .filter(|uuid| !uuid.is_empty())
    }
}
