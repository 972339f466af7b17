use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio::sync::watch;
use touch_engine::{Engine, EventData, EventKind};

mod feed;
mod server;

/// Maps keyboard and mouse input onto Android touch input.
///
/// Reads host input events as JSON lines on stdin, runs them through the
/// configured widget layout and streams the resulting control messages to
/// every connected agent.
#[derive(Parser, Debug)]
#[command(name = "touchmap-server", version, about)]
struct Cli {
    /// Address to bind the control channel to.
    #[arg(long)]
    addr: Option<String>,

    /// Port to listen on.
    #[arg(long)]
    port: Option<u16>,

    /// Path to configuration file (TOML).
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = load_and_merge_config(&cli)?;

    let server = server::ControlServer::bind(cfg.bind, cfg.device_frame()).await?;

    let mut engine = Engine::new(cfg.engine_settings());
    let handle = server.handle();
    engine.on(EventKind::ControlMessage, move |event| {
        if let EventData::ControlMessage(msg) = &event.data {
            handle.send(msg)?;
        }
        Ok(())
    });

    let specs = cfg.widget_specs(engine.registry_mut());
    for spec in specs {
        engine.attach_spec(spec);
    }
    tracing::info!(
        bind = %server.local_addr(),
        widgets = engine.widget_count(),
        "Starting touchmap-server"
    );

    let result = run(&mut engine, server.peer_count()).await;

    // Lift any finger still down before the agents are disconnected.
    engine.release_all();
    server.shutdown().await;
    result
}

/// Load config from file and apply CLI overrides.
fn load_and_merge_config(cli: &Cli) -> Result<touch_config::Config> {
    let mut cfg = touch_config::load(cli.config.as_deref())?;

    if let Some(addr) = &cli.addr {
        let port = cli.port.unwrap_or(cfg.bind.port());
        cfg.bind = format!("{addr}:{port}")
            .parse()
            .context("invalid bind address")?;
    } else if let Some(port) = cli.port {
        cfg.bind.set_port(port);
    }

    Ok(cfg)
}

/// Drive the engine from stdin and its timers until a shutdown signal.
async fn run(engine: &mut Engine, mut peers: watch::Receiver<usize>) -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to register SIGTERM handler")?;
    let mut lines = feed::LineReader::new(BufReader::new(tokio::io::stdin()));
    let mut feed_open = true;
    let mut peers_open = true;

    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            line = lines.next_line(), if feed_open => {
                match line.context("failed to read host input")? {
                    Some(line) => feed::apply_bytes(engine, &line, Instant::now()),
                    None => {
                        tracing::info!("Host input closed");
                        feed_open = false;
                    }
                }
            }
            () = sleep_until(deadline), if deadline.is_some() => {
                engine.advance(Instant::now());
            }
            changed = peers.changed(), if peers_open => {
                if changed.is_ok() {
                    tracing::info!(peers = *peers.borrow(), "Connected agents changed");
                } else {
                    peers_open = false;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for SIGINT")?;
                tracing::info!("Received SIGINT, shutting down");
                return Ok(());
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
                return Ok(());
            }
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        }
        None => std::future::pending().await,
    }
}
