use secrecy::SecretString;
use url::form_urlencoded;

/// Query parameters the login page reads on arrival.
///
/// Only the first occurrence of each parameter counts, and empty values are
/// treated as absent.
#[derive(Debug, Default)]
pub struct NavigationContext {
    url: Option<String>,
    subscription_id: Option<String>,
    subscription_type: Option<String>,
    error: Option<String>,
    session: Option<SecretString>,
}

impl NavigationContext {
    /// Parse a raw query string, with or without the leading `?`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut context = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "url" => {
                    context.url.get_or_insert(value);
                }
                "subscriptionId" => {
                    context.subscription_id.get_or_insert(value);
                }
                "subscriptionType" => {
                    context.subscription_type.get_or_insert(value);
                }
                "error" => {
                    context.error.get_or_insert(value);
                }
                "session" => {
                    if context.session.is_none() {
                        context.session = Some(SecretString::from(value));
                    }
                }
                _ => {}
            }
        }

        context
    }

    /// Site to audit right after login.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    #[must_use]
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    #[must_use]
    pub fn subscription_type(&self) -> Option<&str> {
        self.subscription_type.as_deref()
    }

    /// Error forwarded by an OAuth callback.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// One-time session exchange code forwarded by an OAuth callback.
    #[must_use]
    pub const fn session(&self) -> Option<&SecretString> {
        self.session.as_ref()
    }
}
