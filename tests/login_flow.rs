//! End-to-end tests for the login flow against a mock auth service.
//!
//! Flow Overview:
//! 1. Start a mock auth service exposing the send, verify and exchange endpoints.
//! 2. Drive a `LoginFlow` backed by the real `HttpAuthClient`.
//! 3. Record every notice and navigation through a test surface.
//! 4. Verify request payloads and the final destination.

use anyhow::Result;
use scanerio::login::{
    client::{EXCHANGE_SESSION_PATH, SEND_CODE_PATH, VERIFY_CODE_PATH},
    FlowOptions, HttpAuthClient, LoginFlow, NavigationContext, Notice, Outcome, Screen, Step,
    Surface,
};
use serde_json::json;
use std::{net::TcpListener, time::Duration};
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const REDIRECT_BASE: &str = "https://app.scanerio.com";

#[derive(Default)]
struct Recorder {
    notices: Vec<Notice>,
    screens: Vec<Screen>,
    navigations: Vec<String>,
}

impl Surface for Recorder {
    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn navigate(&mut self, destination: &str) {
        self.navigations.push(destination.to_string());
    }

    fn show(&mut self, screen: &Screen) {
        self.screens.push(screen.clone());
    }
}

fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

fn flow(server: &MockServer, query: &str) -> Result<LoginFlow<HttpAuthClient, Recorder>> {
    let client = HttpAuthClient::new(&server.uri(), Duration::from_secs(5))?;
    let options = FlowOptions {
        redirect_base: REDIRECT_BASE.to_string(),
        redirect_delay: Duration::ZERO,
    };
    Ok(LoginFlow::new(
        client,
        Recorder::default(),
        NavigationContext::from_query(query),
        options,
    ))
}

#[tokio::test]
async fn email_then_code_signs_in() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_CODE_PATH))
        .and(body_json(json!({"email": "user@test.com"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERIFY_CODE_PATH))
        .and(body_json(json!({"email": "user@test.com", "otp": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut flow = flow(&server, "")?;

    assert_eq!(flow.mount().await, Outcome::Idle);
    assert_eq!(flow.submit_email(" User@Test.com ").await, Outcome::CodeSent);
    assert_eq!(flow.attempt().step(), Step::VerifyCode);
    assert_eq!(flow.hint(), Some("We sent a 6-digit code to user@test.com."));

    let outcome = flow.submit_code("123456").await;
    assert_eq!(
        outcome,
        Outcome::SignedIn {
            destination: REDIRECT_BASE.to_string()
        }
    );
    assert_eq!(flow.surface().navigations, vec![REDIRECT_BASE.to_string()]);
    assert_eq!(
        flow.surface().notices,
        vec![
            Notice::Success("OTP sent successfully!".to_string()),
            Notice::Success("Login successful!".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn audit_request_opens_new_report() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_CODE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERIFY_CODE_PATH))
        .and(body_json(json!({
            "email": "user@test.com",
            "otp": "654321",
            "subscriptionId": "sub_1",
            "url": "https://example.com"
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"submitUrl": {"uuid": "r-42"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut flow = flow(&server, "url=https%3A%2F%2Fexample.com&subscriptionId=sub_1")?;

    assert_eq!(flow.submit_email("user@test.com").await, Outcome::CodeSent);
    let outcome = flow.submit_code("654321").await;

    let report = format!("{REDIRECT_BASE}/reports/r-42");
    assert_eq!(
        outcome,
        Outcome::SignedIn {
            destination: report.clone()
        }
    );
    assert_eq!(
        flow.surface().screens,
        vec![Screen::Redirecting("Starting Audit".to_string())]
    );
    assert_eq!(flow.surface().navigations, vec![report]);
    Ok(())
}

#[tokio::test]
async fn rejected_code_shows_service_message() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(SEND_CODE_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(VERIFY_CODE_PATH))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "  Invalid or expired OTP "})),
        )
        .mount(&server)
        .await;

    let mut flow = flow(&server, "")?;

    assert_eq!(flow.submit_email("user@test.com").await, Outcome::CodeSent);
    assert_eq!(flow.submit_code("000000").await, Outcome::Failed);
    assert_eq!(
        flow.surface().notices.last(),
        Some(&Notice::Error("Invalid or expired OTP".to_string()))
    );
    assert_eq!(flow.attempt().step(), Step::VerifyCode);
    assert!(flow.surface().navigations.is_empty());
    Ok(())
}

#[tokio::test]
async fn oauth_callback_exchanges_session() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EXCHANGE_SESSION_PATH))
        .and(body_json(json!({"code": "abc123"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"submitUrl": {"uuid": "r-7"}})),
        )
        .expect(2)
        .mount(&server)
        .await;

    // Without a requested URL the submission is ignored.
    let mut plain = flow(&server, "session=abc123")?;
    assert_eq!(
        plain.mount().await,
        Outcome::SignedIn {
            destination: REDIRECT_BASE.to_string()
        }
    );
    assert_eq!(
        plain.surface().screens,
        vec![Screen::Redirecting("Verifying Github...".to_string())]
    );

    let mut audit = flow(&server, "session=abc123&url=https%3A%2F%2Fexample.com")?;
    assert_eq!(
        audit.mount().await,
        Outcome::SignedIn {
            destination: format!("{REDIRECT_BASE}/reports/r-7")
        }
    );
    Ok(())
}

#[tokio::test]
async fn failed_exchange_returns_to_form() -> Result<()> {
    if !can_bind_localhost() {
        eprintln!("Skipping test: cannot bind localhost");
        return Ok(());
    }
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(EXCHANGE_SESSION_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut flow = flow(&server, "session=abc123")?;

    assert_eq!(flow.mount().await, Outcome::Failed);
    assert_eq!(flow.screen(), &Screen::Form);
    assert_eq!(
        flow.surface().notices,
        vec![Notice::Error("Login failed".to_string())]
    );
    Ok(())
}
