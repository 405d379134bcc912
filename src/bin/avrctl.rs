//! avrctl - Control and monitor a networked receiver over telnet
//!
//! # Usage
//!
//! ```bash
//! # Print every attribute change until Ctrl+C
//! avrctl --host 192.168.1.20 watch
//!
//! # Same, as JSON lines
//! avrctl watch --json
//!
//! # One-shot actions
//! avrctl send on
//! avrctl send volume 42.5
//! avrctl send source SAT/CBL
//! avrctl send raw "PSBAS UP"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use avr_cli::{perform, Action, Config, WatchRecord, HOST_ENV, STATE_TIMEOUT};
use avr_core::names;
use avr_session::{AttributeStore, ReconnectingClient, Session, SessionConfig};

/// Control and monitor a networked A/V receiver
#[derive(Parser, Debug)]
#[command(name = "avrctl", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: <config dir>/avr/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Receiver host (overrides AVR_HOST and the config file)
    #[arg(long, short = 'H', global = true)]
    host: Option<String>,

    /// Receiver control port
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print attribute changes until interrupted
    Watch {
        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
    /// Perform a single action and exit
    Send {
        #[command(subcommand)]
        action: Action,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.debug)?;

    let mut config =
        Config::discover(args.config.as_deref()).context("Failed to load configuration")?;
    config.apply_overrides(args.host, env::var(HOST_ENV).ok(), args.port);
    let session_config = config.session_config()?;

    match args.command {
        Command::Watch { json } => watch(&config, session_config, json).await,
        Command::Send { action } => {
            let session = Arc::new(Session::new(
                session_config,
                Arc::new(AttributeStore::new()),
            ));
            perform(session, &action, STATE_TIMEOUT)
                .await
                .context("Failed to perform action")
        }
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("avrctl={level}").parse()?)
                .add_directive(format!("avr_session={level}").parse()?)
                .add_directive(format!("avr_cli={level}").parse()?),
        )
        .init();

    Ok(())
}

async fn watch(config: &Config, session_config: SessionConfig, json: bool) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %session_config.address(),
        "avrctl watching receiver"
    );

    let session = Arc::new(Session::new(
        session_config,
        Arc::new(AttributeStore::new()),
    ));
    for name in names::ALL {
        session.on_change(name, move |value| {
            emit(&WatchRecord::attribute(name, value), json);
        })?;
    }

    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let mut states = session.watch_state();
    let state_token = cancel_token.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = state_token.cancelled() => break,
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *states.borrow_and_update();
                    emit(&WatchRecord::connection(state), json);
                }
            }
        }
    });

    let client = ReconnectingClient::new(
        Arc::clone(&session),
        config.reconnect_config(),
        cancel_token.clone(),
    )
    .with_query_on_connect(config.query_on_connect);

    let result = client.run().await;
    cancel_token.cancel();

    result.context("Receiver session failed")?;
    info!("avrctl stopped");
    Ok(())
}

fn emit(record: &WatchRecord, json: bool) {
    if !json {
        println!("{}", record.to_text());
        return;
    }

    match record.to_json() {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(error = %e, "Failed to serialize watch record"),
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
