//! Linechat client binary.
//!
//! # Usage
//!
//! ```bash
//! # Connect to localhost:5555 as alice
//! linechat-client alice
//!
//! # Connect to chat.example.org:6000 as bob
//! linechat-client bob chat.example.org 6000
//! ```
//!
//! Chat text and `#` commands are read from stdin, one per line.

use std::{io::BufRead, process::ExitCode};

use clap::Parser;
use linechat_client::{Client, ClientConfig};
use linechat_core::{ChatDisplay, StdoutDisplay, port_or_default};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Linechat client
#[derive(Parser, Debug)]
#[command(name = "linechat-client")]
#[command(about = "Line-based chat client")]
#[command(version)]
struct Args {
    /// Identity sent to the server at login
    login_id: Option<String>,

    /// Server host (defaults to localhost)
    host: Option<String>,

    /// Server port (unparseable values fall back to 5555)
    port: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let port = port_or_default(args.port.as_deref());
    let config = match ClientConfig::from_args(args.login_id, args.host, port) {
        Ok(config) => config,
        Err(e) => {
            let mut display = StdoutDisplay;
            display.display(&e.to_string());
            display.display("Terminating client...");
            return Ok(ExitCode::FAILURE);
        },
    };
    tracing::info!("Connecting to {}:{} as {}", config.host, config.port, config.login_id);

    let exit = Client::new(config).run(stdin_lines()).await?;
    Ok(exit.into())
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
