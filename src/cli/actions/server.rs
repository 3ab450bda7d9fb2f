use crate::{
    edge::{self, handlers::Upstream},
    gate::{AccessGate, GateConfig},
};
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub gate: GateConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the upstream URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let upstream = Upstream::new(&args.upstream_url, args.upstream_timeout)?;

    debug!("upstream: {}", args.upstream_url);

    edge::new(args.port, AccessGate::new(args.gate), upstream).await
}
