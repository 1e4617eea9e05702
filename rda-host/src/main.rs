//! RDA host — entry point.
//!
//! ```text
//! rda-host                   Present a code and wait for a client
//! rda-host --port 12000      Override the preferred control port
//! rda-host --config <path>   Load a custom config TOML
//! rda-host --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rda_core::{HostNegotiator, ScreenDimensions, SessionController};

mod config;
mod view;

use config::HostConfig;
use view::{FrameStatsSink, LoggingInjector};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rda-host", about = "RDA host — share a code, receive the session")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rda-host.toml")]
    config: PathBuf,

    /// Preferred control port, overriding the config.
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let config = HostConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rda-host v{}", env!("CARGO_PKG_VERSION"));

    let mut options = config.to_host_options()?;
    if let Some(port) = cli.port {
        options.start_port = port;
    }

    // Bind first so the code can be handed to the operator before
    // anyone connects.
    let negotiator = HostNegotiator::bind(options).await?;
    println!("Session code: {}", negotiator.code());
    info!(
        "waiting for a client on {}:{}",
        negotiator.advertise_ip(),
        negotiator.control_port()
    );

    let (session, ports) = negotiator.establish().await?;
    info!(
        "channels up (mouse {}, keyboard {}, screen {})",
        ports.mouse, ports.keyboard, ports.screen
    );

    let controller = SessionController::new();
    let shutdown = controller.shutdown_handle();

    // Ctrl-C ends the session.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — ending session");
        shutdown.shutdown();
    });

    let dims = ScreenDimensions::new(config.screen.width, config.screen.height);
    controller
        .run_host(session, FrameStatsSink::new(), LoggingInjector::new(dims))
        .await?;

    info!("session ended");
    Ok(())
}
