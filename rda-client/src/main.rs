//! RDA client — entry point.
//!
//! ```text
//! rda-client <CODE>             Dial a session code
//! rda-client <CODE> --config p  Load a custom config TOML
//! rda-client --gen-config       Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rda_core::{InputEvent, SessionController};

mod capture;
mod config;

use capture::PatternSource;
use config::ClientConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "rda-client", about = "RDA client — dial a session code")]
struct Cli {
    /// The rendezvous code handed over by the host operator.
    code: Option<String>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "rda-client.toml")]
    config: PathBuf,

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
        let text = toml::to_string_pretty(&ClientConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let Some(code) = cli.code else {
        eprintln!("a session code is required; run `rda-client <CODE>`");
        std::process::exit(2);
    };

    // Load config.
    let config = ClientConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("rda-client v{}", env!("CARGO_PKG_VERSION"));

    let session = rda_core::connect(&code, config.to_client_options()).await?;

    let controller = SessionController::new();
    let shutdown = controller.shutdown_handle();

    // Ctrl-C ends the session.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — ending session");
        shutdown.shutdown();
    });

    // The OS input hooks are an external collaborator; their capture
    // layer pushes events into these feeds. With no hooks attached
    // the input channels stay idle but open.
    let (mouse_feed, mouse_events) = mpsc::channel::<InputEvent>(64);
    let (keyboard_feed, keyboard_events) = mpsc::channel::<InputEvent>(64);
    let _input_feeds = (mouse_feed, keyboard_feed);

    let source = PatternSource::new(config.capture.frame_bytes, config.capture.fps);
    controller
        .run_client(session, source, mouse_events, keyboard_events)
        .await?;

    info!("session ended");
    Ok(())
}
