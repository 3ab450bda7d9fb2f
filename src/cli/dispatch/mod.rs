//! Map validated CLI matches to the action the binary runs.

use crate::cli::actions::{login, server, Action};
use crate::cli::commands;
use anyhow::{anyhow, Result};

/// # Errors
/// Returns an error if the subcommand is unknown or its arguments are inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::server::NAME, sub_m)) => {
            let options = commands::server::Options::parse(sub_m)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                upstream_url: options.upstream_url,
                upstream_timeout: options.upstream_timeout,
                gate: options.gate,
            }))
        }
        Some((commands::login::NAME, sub_m)) => {
            let options = commands::login::Options::parse(sub_m)?;
            Ok(Action::Login(login::Args {
                api_url: options.api_url,
                redirect_url: options.redirect_url,
                email: options.email,
                query: options.query,
                redirect_delay: options.redirect_delay,
                timeout: options.timeout,
            }))
        }
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}
