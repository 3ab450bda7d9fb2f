//! Terminal front end for the login flow: notices go to stderr, the final
//! destination goes to stdout so it can be piped into a browser opener.

use crate::login::{
    AuthService, FlowOptions, HttpAuthClient, LoginFlow, NavigationContext, Notice, Outcome,
    Screen, Step, Surface,
};
use anyhow::{anyhow, Result};
use std::{io::Write, time::Duration};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tracing::info;

const RESEND_COMMAND: &str = ":resend";
const EDIT_COMMAND: &str = ":edit";

#[derive(Debug)]
pub struct Args {
    pub api_url: String,
    pub redirect_url: String,
    pub email: Option<String>,
    pub query: Option<String>,
    pub redirect_delay: Duration,
    pub timeout: Duration,
}

/// Surface writing the destination to `out` and everything else to `err`.
struct Terminal<O, E> {
    out: O,
    err: E,
}

impl<O: Write, E: Write> Surface for Terminal<O, E> {
    fn notify(&mut self, notice: Notice) {
        let _ = match notice {
            Notice::Success(message) => writeln!(self.err, "✔ {message}"),
            Notice::Error(message) => writeln!(self.err, "✖ {message}"),
        };
    }

    fn navigate(&mut self, destination: &str) {
        let _ = writeln!(self.out, "{destination}");
        let _ = self.out.flush();
    }

    fn show(&mut self, screen: &Screen) {
        if let Screen::Redirecting(message) = screen {
            let _ = writeln!(self.err, "{message}…");
        }
    }
}

/// Execute the login action.
/// # Errors
/// Returns an error if the auth client cannot be built or stdin closes before signing in.
pub async fn execute(args: Args) -> Result<()> {
    let service = HttpAuthClient::new(&args.api_url, args.timeout)?;
    let navigation = NavigationContext::from_query(args.query.as_deref().unwrap_or_default());
    let options = FlowOptions {
        redirect_base: args.redirect_url,
        redirect_delay: args.redirect_delay,
    };
    let surface = Terminal {
        out: std::io::stdout(),
        err: std::io::stderr(),
    };

    let mut flow = LoginFlow::new(service, surface, navigation, options);

    let destination = drive(
        &mut flow,
        BufReader::new(io::stdin()),
        io::stderr(),
        args.email,
    )
    .await?;

    info!("signed in, destination: {destination}");

    Ok(())
}

/// Run the flow until the visitor is signed in.
///
/// `email` answers the first email prompt; later prompts read from `input`.
/// At the code prompt `:resend` asks for a new code and `:edit` returns to the
/// email step. Prompts and hints are written to `prompts`.
async fn drive<S, U, R, W>(
    flow: &mut LoginFlow<S, U>,
    input: R,
    mut prompts: W,
    mut email: Option<String>,
) -> Result<String>
where
    S: AuthService,
    U: Surface,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if let Outcome::SignedIn { destination } = flow.mount().await {
        return Ok(destination);
    }

    let mut lines = input.lines();

    loop {
        let outcome = match flow.attempt().step() {
            Step::EnterEmail => {
                let value = match email.take() {
                    Some(value) => value,
                    None => prompt(&mut lines, &mut prompts, "Work email: ").await?,
                };
                flow.submit_email(&value).await
            }
            Step::VerifyCode => {
                let label = format!("6-digit code ({RESEND_COMMAND}, {EDIT_COMMAND}): ");
                let value = prompt(&mut lines, &mut prompts, &label).await?;
                match value.as_str() {
                    RESEND_COMMAND => flow.resend_code().await,
                    EDIT_COMMAND => {
                        flow.edit_email();
                        continue;
                    }
                    code => flow.submit_code(code).await,
                }
            }
        };

        match outcome {
            Outcome::SignedIn { destination } => return Ok(destination),
            Outcome::CodeSent => {
                if let Some(hint) = flow.hint() {
                    prompts.write_all(format!("{hint}\n").as_bytes()).await?;
                }
            }
            Outcome::Idle | Outcome::Rejected | Outcome::Failed => {}
        }
    }
}

async fn prompt<R, W>(lines: &mut Lines<R>, prompts: &mut W, label: &str) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    prompts.write_all(label.as_bytes()).await?;
    prompts.flush().await?;

    lines
        .next_line()
        .await?
        .map(|line| line.trim().to_string())
        .ok_or_else(|| anyhow!("login aborted: input closed"))
}
