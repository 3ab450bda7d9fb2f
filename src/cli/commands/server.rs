use crate::gate::{
    GateConfig, GatePolicy, DEFAULT_HOME_PATH, DEFAULT_LOGIN_PATH, DEFAULT_SESSION_COOKIE,
};
use anyhow::{anyhow, Context, Result};
use clap::{builder::PossibleValuesParser, Arg, ArgMatches, Command};
use std::time::Duration;
use url::Url;

pub const NAME: &str = "server";

pub const ARG_PORT: &str = "port";
pub const ARG_UPSTREAM_URL: &str = "upstream-url";
pub const ARG_UPSTREAM_TIMEOUT: &str = "upstream-timeout";
pub const ARG_REDIRECT_URL: &str = "redirect-url";
pub const ARG_SESSION_COOKIE: &str = "session-cookie";
pub const ARG_GATE_POLICY: &str = "gate-policy";
pub const ARG_LOGIN_PATH: &str = "login-path";
pub const ARG_HOME_PATH: &str = "home-path";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Run the access gate in front of the login site")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("SCANERIO_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_URL)
                .long(ARG_UPSTREAM_URL)
                .help("Origin serving the site, example: http://127.0.0.1:3000")
                .env("SCANERIO_UPSTREAM_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_UPSTREAM_TIMEOUT)
                .long(ARG_UPSTREAM_TIMEOUT)
                .help("Seconds to wait for the origin before answering 504")
                .env("SCANERIO_UPSTREAM_TIMEOUT")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_REDIRECT_URL)
                .long(ARG_REDIRECT_URL)
                .help("Product app URL signed-in visitors are sent to")
                .env("SCANERIO_REDIRECT_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_COOKIE)
                .long(ARG_SESSION_COOKIE)
                .help("Name of the cookie marking a session")
                .env("SCANERIO_SESSION_COOKIE")
                .default_value(DEFAULT_SESSION_COOKIE),
        )
        .arg(
            Arg::new(ARG_GATE_POLICY)
                .long(ARG_GATE_POLICY)
                .help("Gate policy")
                .long_help(
                    "Gate policy. redirect-signed-in sends visitors with a session to --redirect-url and lets everyone else through. require-session sends visitors without a session to --login-path unless the page is public.",
                )
                .env("SCANERIO_GATE_POLICY")
                .default_value(GatePolicy::RedirectSignedIn.as_str())
                .value_parser(PossibleValuesParser::new([
                    GatePolicy::RedirectSignedIn.as_str(),
                    GatePolicy::RequireSession.as_str(),
                ])),
        )
        .arg(
            Arg::new(ARG_LOGIN_PATH)
                .long(ARG_LOGIN_PATH)
                .help("Login page path (require-session)")
                .env("SCANERIO_LOGIN_PATH")
                .default_value(DEFAULT_LOGIN_PATH),
        )
        .arg(
            Arg::new(ARG_HOME_PATH)
                .long(ARG_HOME_PATH)
                .help("Landing path for signed-in visitors on the login page (require-session)")
                .env("SCANERIO_HOME_PATH")
                .default_value(DEFAULT_HOME_PATH),
        )
}

#[derive(Debug)]
pub struct Options {
    pub port: u16,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub gate: GateConfig,
}

impl Options {
    /// # Errors
    /// Returns an error if an argument is missing or malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

        let upstream_url = required(matches, ARG_UPSTREAM_URL)?;
        let upstream_timeout = Duration::from_secs(
            matches
                .get_one::<u64>(ARG_UPSTREAM_TIMEOUT)
                .copied()
                .unwrap_or(30),
        );

        let redirect_url = required(matches, ARG_REDIRECT_URL)?;
        Url::parse(&redirect_url)
            .with_context(|| format!("Invalid redirect URL: {redirect_url}"))?;

        let policy = required(matches, ARG_GATE_POLICY)?
            .parse::<GatePolicy>()
            .map_err(|e| anyhow!(e))?;

        let mut gate = GateConfig::new(redirect_url).with_policy(policy);
        gate.session_cookie = required(matches, ARG_SESSION_COOKIE)?;
        gate.login_path = absolute_path(matches, ARG_LOGIN_PATH)?;
        gate.home_path = absolute_path(matches, ARG_HOME_PATH)?;

        Ok(Self {
            port,
            upstream_url,
            upstream_timeout,
            gate,
        })
    }
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("missing required argument: --{id}"))
}

fn absolute_path(matches: &ArgMatches, id: &str) -> Result<String> {
    let path = required(matches, id)?;
    if path.starts_with('/') {
        Ok(path)
    } else {
        Err(anyhow!("--{id} must start with '/': {path}"))
    }
}
