//! Email + one-time code login.
//!
//! Flow overview: the visitor enters an email, the auth service mails a
//! 6-digit code, the visitor types it back and the service answers with
//! session cookies. An OAuth callback can skip both steps by handing the page
//! a one-time `session` code, which is exchanged for a session on mount.

pub mod client;
pub mod context;
pub mod error;
pub mod flow;
pub mod types;

pub use client::{AuthService, HttpAuthClient};
pub use context::NavigationContext;
pub use error::AuthError;
pub use flow::{FlowOptions, LoginAttempt, LoginFlow, Notice, Outcome, Screen, Step, Surface};
pub use types::{ExchangeCodeRequest, SendCodeRequest, SessionGrant, SubmitUrl, VerifyCodeRequest};
