use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid auth service configuration: {0}")]
    Config(String),
    #[error("unable to reach the auth service: {0}")]
    Network(String),
    #[error("auth request timed out")]
    Timeout,
    #[error("auth service responded with {status}")]
    Status {
        status: u16,
        /// `message` from the service's error body, when it sent one.
        message: Option<String>,
    },
}

impl AuthError {
    #[must_use]
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => Some(message),
            _ => None,
        }
    }
}
