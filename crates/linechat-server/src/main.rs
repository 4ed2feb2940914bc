//! Linechat server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port (5555)
//! linechat-server
//!
//! # Listen on port 6000
//! linechat-server 6000
//! ```
//!
//! Operator commands are read from stdin, one per line.

use std::{io::BufRead, process::ExitCode};

use clap::Parser;
use linechat_core::port_or_default;
use linechat_server::{Server, ServerRuntimeConfig};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Linechat server
#[derive(Parser, Debug)]
#[command(name = "linechat-server")]
#[command(about = "Line-based chat server")]
#[command(version)]
struct Args {
    /// Port to listen on (unparseable values fall back to 5555)
    port: Option<String>,

    /// Host to bind to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let config =
        ServerRuntimeConfig { bind_host: args.bind, port: port_or_default(args.port.as_deref()) };
    tracing::info!("Linechat server starting on {}:{}", config.bind_host, config.port);

    let mut server = Server::new(config);
    if let Err(e) = server.start().await {
        tracing::warn!("Not listening at startup: {e}");
    }

    server.run(stdin_lines()).await?;
    Ok(ExitCode::SUCCESS)
}

/// Read stdin on a dedicated thread so a pending read never holds up exit.
fn stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(32);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                },
                Err(e) => {
                    tracing::error!("Unexpected error while reading from console: {e}");
                    break;
                },
            }
        }
    });
    rx
}
