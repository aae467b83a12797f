//! `kbctl` entry point.
//!
//! This binary is the composition root for the request layer. Responsibilities:
//!
//! 1. **Parse configuration**: load the TOML [`client::ClientConfig`] and
//!    select one environment's service addresses.
//! 2. **Wire observability**: install a `tracing-subscriber` registry with a
//!    text or JSON layer and, when an endpoint is given, an OpenTelemetry
//!    OTLP exporter. Every span and event emitted by the workspace crates
//!    flows through it.
//! 3. **Construct infrastructure**: create the [`transport::ReqwestTransport`],
//!    the credential store (file-backed or in-memory), and the terminal
//!    adapters for notification and navigation, then inject them into the
//!    [`client::ServiceRegistry`].
//! 4. **Run one command**: a call through a service client, or a local
//!    session or listing command.
//!
//! A rejected call exits with status 1 after its side effects have run.

mod args;
mod observability;
mod terminal;

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use client::{ClientConfig, Collaborators, ServiceRegistry};
use pipeline::{CredentialStore, Reply, Session};
use session::{FileCredentialStore, MemoryCredentialStore};
use tracing::{debug, info};
use transport::ReqwestTransport;

use crate::args::{Cli, Command};
use crate::terminal::{TerminalNavigator, TerminalNotifier};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = match observability::init(cli.log_format, &cli.log_level, cli.otlp_endpoint.as_deref()) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let status = match run(cli).await {
        Ok(status) => status,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    };

    drop(telemetry);
    status
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(&cli.config)?;
    let registry = build_registry(&config, &cli.env, &cli.location).await?;

    match &cli.command {
        Command::Login { token, user_id } => {
            registry
                .sign_in(Session::new(token.clone(), user_id.clone()))
                .await
                .context("failed to store session")?;
            if config.credential_file.is_none() {
                eprintln!("warning: no credential_file configured; the session ends with this process");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Logout => {
            registry.sign_out().await.context("failed to clear session")?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Services => {
            let mut out = std::io::stdout().lock();
            for endpoint in registry.services() {
                writeln!(out, "{}\t{}", endpoint.name(), endpoint.base_address())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        command => {
            let Some(call) = command.call() else {
                bail!("command performs no call");
            };
            let Some(client) = registry.get(&call.service) else {
                let known: Vec<String> = registry.services().map(|e| e.name().to_string()).collect();
                bail!(
                    "service '{}' is not configured for environment '{}' (available: {})",
                    call.service,
                    cli.env,
                    known.join(", ")
                );
            };

            match client.execute(call.method, &call.path, call.body, call.options).await {
                Ok(reply) => {
                    print_reply(reply)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    debug!(kind = %err.kind, handled = err.handled, "call rejected");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<ClientConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration '{}'", path.display()))?;
    let config: ClientConfig =
        toml::from_str(&text).with_context(|| format!("invalid configuration '{}'", path.display()))?;
    config.validate()?;
    info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

async fn build_registry(config: &ClientConfig, env: &str, location: &str) -> anyhow::Result<ServiceRegistry> {
    let credentials: Arc<dyn CredentialStore> = match &config.credential_file {
        Some(path) => Arc::new(
            FileCredentialStore::open(path)
                .await
                .with_context(|| format!("failed to open credential file '{}'", path.display()))?,
        ),
        None => Arc::new(MemoryCredentialStore::new()),
    };

    let collaborators = Collaborators {
        transport: Arc::new(ReqwestTransport::new()?),
        credentials,
        notifier: Arc::new(TerminalNotifier),
        navigator: Arc::new(TerminalNavigator::stdout(location)),
    };

    let registry = config.registry_builder(env, collaborators)?.build()?;
    Ok(registry)
}

fn print_reply(reply: Reply) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    match reply {
        Reply::Data(value) => {
            serde_json::to_writer_pretty(&mut out, &value)?;
            writeln!(out)?;
        }
        Reply::Raw(response) => out.write_all(&response.body)?,
    }
    out.flush()?;
    Ok(())
}
