pub mod auth;
pub mod claims;
pub mod documents;
pub mod fraud;

use anyhow::{Context, Result, anyhow, bail};
use std::io::{BufRead, IsTerminal};
use std::sync::Arc;
use tracing::debug;

use claims_client::routes::LOGIN_PATH;
use claims_client::{
    Access, ClaimDesk, Decision, FileTokenStore, Gateway, PortalConfig, Route, SessionStore, TokenStore,
    decide_route,
};

use crate::cli::{Command, FraudCommand};
use crate::render::Printer;

/// The process-wide view state: one gateway, one session store.
pub struct App {
    gateway: Arc<Gateway>,
    store: SessionStore,
    pub printer: Printer,
}

impl App {
    pub fn new(config: &PortalConfig, printer: Printer) -> Result<Self> {
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.token_path));
        let gateway = Arc::new(
            Gateway::new(config, tokens.clone()).context("Failed to build HTTP client")?,
        );
        let store = SessionStore::new(gateway.clone(), tokens);
        Ok(Self {
            gateway,
            store,
            printer,
        })
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Restores the session and asks the guard whether `route` may open.
    pub async fn enter(&self, route: Route) -> Result<()> {
        self.store.restore().await;
        match decide_route(&self.store.snapshot(), route) {
            Access::Allow => Ok(()),
            Access::Pending => bail!("Session is still being restored, try again"),
            Access::RedirectTo(LOGIN_PATH) => {
                bail!("Please log in first: claims-portal login <email>")
            }
            Access::RedirectTo(path) => {
                debug!(route = %route, redirect = path, "Role not permitted");
                bail!("Your role cannot open {route}; redirected to {path}")
            }
        }
    }

    pub fn desk(&self) -> Result<ClaimDesk> {
        let session = self.store.current().context("Not signed in")?;
        Ok(ClaimDesk::new(self.gateway.clone(), session))
    }
}

/// Turns a client error into the one line shown to the user.
pub trait Inline<T> {
    fn inline(self, fallback: &str) -> Result<T>;
}

impl<T> Inline<T> for claims_client::Result<T> {
    fn inline(self, fallback: &str) -> Result<T> {
        self.map_err(|e| anyhow!(e.user_message(fallback)))
    }
}

/// Prompts without echo on a terminal. Piped input is read as one line.
pub fn read_secret(prompt: &str) -> Result<String> {
    if std::io::stdin().is_terminal() {
        return rpassword::prompt_password(format!("{prompt}: "))
            .context("Failed to read password");
    }
    read_line(std::io::stdin().lock())
}

fn read_line(mut reader: impl BufRead) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn run(app: &App, command: Command) -> Result<()> {
    app.enter(command.route()).await?;

    match command {
        Command::Login { email, password } => auth::login(app, &email, password).await,
        Command::Register(args) => auth::register(app, args).await,
        Command::Logout => auth::logout(app),
        Command::Whoami => auth::whoami(app),
        command => {
            let desk = app.desk()?;
            run_desk(app, &desk, command).await
        }
    }
}

async fn run_desk(app: &App, desk: &ClaimDesk, command: Command) -> Result<()> {
    match command {
        Command::Dashboard => claims::dashboard(app, desk).await,
        Command::Claims {
            status,
            page,
            size,
            watch,
        } => claims::list(app, desk, &status, page, size, watch).await,
        Command::Show { id } => claims::show(app, desk, id).await,
        Command::Submit(args) => claims::submit(app, desk, args).await,
        Command::ClaimTypes => claims::claim_types(app, desk).await,
        Command::Approve { id, note } => {
            claims::decide(app, desk, id, Decision::Approve, &note).await
        }
        Command::Reject { id, note } => {
            claims::decide(app, desk, id, Decision::Reject, &note).await
        }
        Command::Decide { id, status, note } => {
            let decision = status.parse::<Decision>()?;
            claims::decide(app, desk, id, decision, &note).await
        }
        Command::Delete { id } => claims::delete(app, desk, id).await,
        Command::Verify { id } => claims::verify(app, desk, id).await,
        Command::Assign { id, agent_id } => claims::assign(app, desk, id, agent_id).await,
        Command::Upload { claim_id, file } => documents::upload(app, desk, claim_id, &file).await,
        Command::Documents { claim_id } => documents::list(app, desk, claim_id).await,
        Command::Fraud(FraudCommand::Analyze { claim_id }) => {
            fraud::analyze(app, desk, claim_id).await
        }
        Command::Fraud(FraudCommand::Verdict { claim_id }) => {
            fraud::verdict(app, desk, claim_id).await
        }
        Command::Fraud(FraudCommand::Health) => fraud::health(app, desk).await,
        Command::Fraud(FraudCommand::Stats) => fraud::statistics(app, desk).await,
        Command::Reports => claims::reports(app, desk).await,
        Command::Login { .. } | Command::Register(_) | Command::Logout | Command::Whoami => {
            unreachable!("session commands are handled before a desk is opened")
        }
    }
}
