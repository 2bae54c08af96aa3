mod cli;
mod commands;
mod render;

use anyhow::Result;
use clap::Parser;
use tracing::{Instrument, debug, info_span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claims_client::PortalConfig;

use crate::cli::Cli;
use crate::commands::App;
use crate::render::Printer;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("{}", error_line(&e));
        std::process::exit(1);
    }
}

/// One line with the whole context chain, outermost first.
fn error_line(e: &anyhow::Error) -> String {
    format!("error: {e:#}")
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = PortalConfig::from_env()?;
    if let Some(url) = cli.api_url.as_deref() {
        config = config.with_api_base_url(url)?;
    }
    if let Some(path) = cli.token_file {
        config.token_path = path;
    }
    debug!(api = %config.api_base_url, token_file = %config.token_path.display(), "Configuration loaded");

    let app = App::new(&config, Printer { json: cli.json })?;
    let route = cli.command.route();
    commands::run(&app, cli.command)
        .instrument(info_span!("command", route = %route))
        .await
}

/// Logs go to stderr so command output on stdout stays clean.
/// `LOG_FORMAT=json` switches to structured output; `RUST_LOG` sets the filter.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "claims_portal=warn,claims_client=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn error_line_keeps_the_cause() {
        let failed: Result<()> = Err(std::io::Error::other("invalid certificate store"))
            .context("Failed to build HTTP client");
        assert_eq!(
            error_line(&failed.unwrap_err()),
            "error: Failed to build HTTP client: invalid certificate store"
        );
    }
}
