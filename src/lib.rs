//! # Scanerio (edge gate & login client)
//!
//! `scanerio` holds the two pieces that sit in front of the web-audit product:
//!
//! - [`gate`]: the access gate evaluated on every inbound request before any page
//!   renders. It reads the session cookie, never writes it, and answers with a
//!   [`gate::Verdict`] (pass through or redirect).
//! - [`login`]: the two-step login flow (email, then a 6-digit one-time code) and
//!   the HTTP client for the external auth service it talks to.
//!
//! ## Binaries
//!
//! `scanerio server` runs the gate as axum middleware in front of an upstream
//! origin, `scanerio login` drives the login flow from a terminal.
//!
//! OTP issuance, verification, rate limiting and session persistence all live in
//! the auth service; this crate only calls it.

pub mod cli;
pub mod edge;
pub mod gate;
pub mod login;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
