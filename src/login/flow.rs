//! Two-step login controller: collect an email, send a one-time code, verify it.
//!
//! The controller owns the form state and talks to the auth service through
//! [`AuthService`]. Everything the user should see (notices, the redirecting
//! screen, navigation) goes through a [`Surface`], so the same flow drives a
//! terminal prompt or a recording double in tests.
//!
//! Every operation takes `&mut self`, so one controller never has two requests
//! in flight.

use super::{
    client::AuthService,
    context::NavigationContext,
    error::AuthError,
    types::{ExchangeCodeRequest, SendCodeRequest, SessionGrant, VerifyCodeRequest},
};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const CODE_LENGTH: usize = 6;
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

pub const STARTING_AUDIT: &str = "Starting Audit";
pub const VERIFYING_GITHUB: &str = "Verifying Github...";

const MSG_EMAIL_REQUIRED: &str = "Please enter your email";
const MSG_EMAIL_REQUIRED_FOR_RESEND: &str = "Please enter your email before requesting a new code.";
const MSG_INVALID_CODE: &str = "Please enter a valid 6-digit OTP";
const MSG_CODE_SENT: &str = "OTP sent successfully!";
const MSG_SEND_REJECTED: &str = "Failed to send OTP";
const MSG_SEND_FAILED: &str = "An error occurred while sending OTP";
const MSG_LOGIN_OK: &str = "Login successful!";
const MSG_LOGIN_FAILED: &str = "Login failed";
const MSG_UNEXPECTED: &str = "An unexpected error occurred";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    EnterEmail,
    VerifyCode,
}

/// What the login card shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Form,
    Redirecting(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Result of one user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do (mount without callback parameters, or a callback error was shown).
    Idle,
    /// Input failed validation; no request was made.
    Rejected,
    /// The service call failed; the error was surfaced.
    Failed,
    CodeSent,
    SignedIn { destination: String },
}

/// Where the flow reports to the user.
pub trait Surface {
    fn notify(&mut self, notice: Notice);

    fn navigate(&mut self, destination: &str);

    fn show(&mut self, _screen: &Screen) {}
}

#[derive(Clone, Debug)]
pub struct FlowOptions {
    /// Base URL of the product app; the default destination after login.
    pub redirect_base: String,
    /// Pause on the redirecting screen before opening a fresh report.
    pub redirect_delay: Duration,
}

impl FlowOptions {
    #[must_use]
    pub fn new(redirect_base: impl Into<String>) -> Self {
        Self {
            redirect_base: redirect_base.into(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }

    #[must_use]
    pub fn default_destination(&self) -> String {
        self.redirect_base.clone()
    }

    #[must_use]
    pub fn report_destination(&self, submission_id: &str) -> String {
        format!(
            "{}/reports/{submission_id}",
            self.redirect_base.trim_end_matches('/')
        )
    }
}

#[derive(Debug)]
pub struct LoginAttempt {
    email: String,
    code: SecretString,
    step: Step,
}

impl Default for LoginAttempt {
    fn default() -> Self {
        Self {
            email: String::new(),
            code: SecretString::from(String::new()),
            step: Step::EnterEmail,
        }
    }
}

impl LoginAttempt {
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub const fn code(&self) -> &SecretString {
        &self.code
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }
}

pub struct LoginFlow<S, U> {
    service: S,
    surface: U,
    navigation: NavigationContext,
    options: FlowOptions,
    attempt: LoginAttempt,
    hint: Option<String>,
    loading: bool,
    screen: Screen,
}

impl<S: AuthService, U: Surface> LoginFlow<S, U> {
    pub fn new(service: S, surface: U, navigation: NavigationContext, options: FlowOptions) -> Self {
        Self {
            service,
            surface,
            navigation,
            options,
            attempt: LoginAttempt::default(),
            hint: None,
            loading: false,
            screen: Screen::Form,
        }
    }

    pub const fn attempt(&self) -> &LoginAttempt {
        &self.attempt
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub const fn screen(&self) -> &Screen {
        &self.screen
    }

    pub const fn surface(&self) -> &U {
        &self.surface
    }

    pub const fn service(&self) -> &S {
        &self.service
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.attempt.email = email.into();
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.attempt.code = SecretString::from(code.into());
    }

    /// Handle the OAuth callback parameters present when the page opens.
    pub async fn mount(&mut self) -> Outcome {
        if let Some(error) = self.navigation.error().map(str::to_string) {
            self.notify(Notice::Error(error));
            return Outcome::Idle;
        }

        let Some(code) = self.navigation.session() else {
            return Outcome::Idle;
        };
        let request = ExchangeCodeRequest {
            code: code.expose_secret().to_string(),
        };

        self.set_screen(Screen::Redirecting(VERIFYING_GITHUB.to_string()));

        match self.service.exchange_session(&request).await {
            Ok(grant) => {
                self.notify(Notice::Success(MSG_LOGIN_OK.to_string()));
                self.finish(grant).await
            }
            Err(err) => {
                warn!("Session exchange failed: {err}");
                self.set_screen(Screen::Form);
                self.notify(Notice::Error(MSG_LOGIN_FAILED.to_string()));
                Outcome::Failed
            }
        }
    }

    /// Primary form action: send the code or verify it, depending on the step.
    pub async fn submit(&mut self) -> Outcome {
        match self.attempt.step {
            Step::EnterEmail => {
                let email = self.attempt.email.clone();
                self.submit_email(&email).await
            }
            Step::VerifyCode => {
                let code = self.attempt.code.expose_secret().to_string();
                self.submit_code(&code).await
            }
        }
    }

    pub async fn submit_email(&mut self, email: &str) -> Outcome {
        let email = email.trim();
        self.attempt.email = email.to_string();

        if email.is_empty() {
            self.notify(Notice::Error(MSG_EMAIL_REQUIRED.to_string()));
            return Outcome::Rejected;
        }

        self.send_code(email.to_lowercase()).await
    }

    pub async fn resend_code(&mut self) -> Outcome {
        let email = self.attempt.email.trim().to_lowercase();

        if email.is_empty() {
            self.notify(Notice::Error(MSG_EMAIL_REQUIRED_FOR_RESEND.to_string()));
            return Outcome::Rejected;
        }

        self.send_code(email).await
    }

    pub async fn submit_code(&mut self, code: &str) -> Outcome {
        if self.attempt.step != Step::VerifyCode {
            self.notify(Notice::Error(MSG_EMAIL_REQUIRED.to_string()));
            return Outcome::Rejected;
        }

        self.set_code(code);

        if code.chars().count() != CODE_LENGTH {
            self.notify(Notice::Error(MSG_INVALID_CODE.to_string()));
            return Outcome::Rejected;
        }

        let request = VerifyCodeRequest {
            email: self.attempt.email.to_lowercase(),
            otp: code.to_lowercase(),
            subscription_id: self.navigation.subscription_id().map(str::to_string),
            subscription_type: self.navigation.subscription_type().map(str::to_string),
            url: self.navigation.url().map(str::to_string),
        };

        self.loading = true;
        let result = self.service.verify_code(&request).await;
        self.loading = false;

        match result {
            Ok(grant) => {
                self.notify(Notice::Success(MSG_LOGIN_OK.to_string()));
                self.finish(grant).await
            }
            Err(err) => {
                debug!("Code verification failed: {err}");
                self.notify(Notice::Error(verify_failure_message(&err)));
                Outcome::Failed
            }
        }
    }

    /// Back to the email step. Safe to call any number of times.
    pub fn edit_email(&mut self) {
        self.attempt.step = Step::EnterEmail;
        self.attempt.code = SecretString::from(String::new());
        self.hint = None;
    }

    async fn send_code(&mut self, email: String) -> Outcome {
        self.loading = true;
        let result = self
            .service
            .send_code(&SendCodeRequest {
                email: email.clone(),
            })
            .await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.notify(Notice::Success(MSG_CODE_SENT.to_string()));
                self.hint = Some(format!("We sent a 6-digit code to {email}."));
                self.attempt.step = Step::VerifyCode;
                Outcome::CodeSent
            }
            Err(err) => {
                debug!("Sending code failed: {err}");
                self.notify(Notice::Error(send_failure_message(&err)));
                Outcome::Failed
            }
        }
    }

    /// Route a freshly signed-in user: straight to the new report when a
    /// submission was created for the requested URL, else to the app.
    async fn finish(&mut self, grant: SessionGrant) -> Outcome {
        let requested_audit = self.navigation.url().is_some();

        let destination = match grant.submission_id().filter(|_| requested_audit) {
            Some(submission_id) => {
                let destination = self.options.report_destination(submission_id);
                self.set_screen(Screen::Redirecting(STARTING_AUDIT.to_string()));
                sleep(self.options.redirect_delay).await;
                destination
            }
            None => self.options.default_destination(),
        };

        self.surface.navigate(&destination);

        Outcome::SignedIn { destination }
    }

    fn notify(&mut self, notice: Notice) {
        self.surface.notify(notice);
    }

    fn set_screen(&mut self, screen: Screen) {
        self.surface.show(&screen);
        self.screen = screen;
    }
}

fn send_failure_message(err: &AuthError) -> String {
    if let Some(message) = err.service_message() {
        return message.to_string();
    }

    match err {
        AuthError::Status { status, .. } if *status < 400 => MSG_SEND_REJECTED,
        AuthError::Status { .. } | AuthError::Network(_) | AuthError::Timeout => MSG_SEND_FAILED,
        AuthError::Config(_) => MSG_UNEXPECTED,
    }
    .to_string()
}

fn verify_failure_message(err: &AuthError) -> String {
    if let Some(message) = err.service_message() {
        return message.to_string();
    }

    match err {
        AuthError::Status { .. } | AuthError::Network(_) | AuthError::Timeout => MSG_LOGIN_FAILED,
        AuthError::Config(_) => MSG_UNEXPECTED,
    }
    .to_string()
}
