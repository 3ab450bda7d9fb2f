use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const NAME: &str = "login";

pub const ARG_API_URL: &str = "api-url";
pub const ARG_REDIRECT_URL: &str = "redirect-url";
pub const ARG_EMAIL: &str = "email";
pub const ARG_QUERY: &str = "query";
pub const ARG_REDIRECT_DELAY_MS: &str = "redirect-delay-ms";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Sign in with an emailed one-time code")
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Auth service base URL, example: https://api.scanerio.com")
                .env("SCANERIO_API_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("Product app URL opened after signing in")
                .env("SCANERIO_REDIRECT_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Work email; prompted for when missing"),
        )
        .arg(
            Arg::new(ARG_QUERY)
                .short('q')
                .long(ARG_QUERY)
                .help("Login page query string, example: 'url=https://example.com' or 'session=<code>'"),
        )
        .arg(
            Arg::new(ARG_REDIRECT_DELAY_MS)
                .long(ARG_REDIRECT_DELAY_MS)
                .help("Pause before opening a new report, in milliseconds")
                .default_value("1500")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .short('t')
                .long(ARG_TIMEOUT)
                .help("Auth request timeout in seconds")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub api_url: String,
    pub redirect_url: String,
    pub email: Option<String>,
    pub query: Option<String>,
    pub redirect_delay: Duration,
    pub timeout: Duration,
}

impl Options {
    /// # Errors
    /// Returns an error if an argument is missing or malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_API_URL}"))?;

        let redirect_url = matches
            .get_one::<String>(ARG_REDIRECT_URL)
            .cloned()
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_REDIRECT_URL}"))?;
        Url::parse(&redirect_url)
            .with_context(|| format!("Invalid redirect URL: {redirect_url}"))?;

        Ok(Self {
            api_url,
            redirect_url,
            email: matches.get_one::<String>(ARG_EMAIL).cloned(),
            query: matches.get_one::<String>(ARG_QUERY).cloned(),
            redirect_delay: Duration::from_millis(
                matches
                    .get_one::<u64>(ARG_REDIRECT_DELAY_MS)
                    .copied()
                    .unwrap_or(1500),
            ),
            timeout: Duration::from_secs(matches.get_one::<u64>(ARG_TIMEOUT).copied().unwrap_or(10)),
        })
    }
}
