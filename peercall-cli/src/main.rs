mod terminal_view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use peercall::client::media::{IvfLibrary, MediaDevices, SyntheticCamera};
use peercall::client::relay::RelayChannel;
use peercall::client::transport::RtcTransportFactory;
use peercall::client::{CallConfig, CallHandle, Negotiator};
use peercall::relay::RelayHub;
use std::path::PathBuf;
use std::sync::Arc;
use terminal_view::TerminalView;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peercall", version, about = "Two-peer video calls over a WebSocket relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a relay that forwards every frame to all other connections.
    Relay {
        #[arg(long, env = "PEERCALL_BIND", default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// List the capture devices found in a media directory.
    Devices {
        #[arg(long, env = "PEERCALL_MEDIA_DIR", default_value = ".")]
        media_dir: PathBuf,
    },

    /// Join a call through a relay.
    Join {
        /// Relay URL, overriding the config file.
        #[arg(long, env = "PEERCALL_RELAY")]
        relay: Option<String>,

        #[arg(long, env = "PEERCALL_CONFIG")]
        config: Option<PathBuf>,

        /// Directory of VP8 .ivf recordings used as cameras.
        #[arg(long, env = "PEERCALL_MEDIA_DIR", default_value = ".")]
        media_dir: PathBuf,

        /// Use a generated blank camera instead of the media directory.
        #[arg(long)]
        synthetic: bool,

        /// Start capturing right away.
        #[arg(long)]
        capture: bool,

        /// Offer a call right away.
        #[arg(long)]
        call: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay { bind } => run_relay(&bind).await,
        Commands::Devices { media_dir } => list_devices(media_dir).await,
        Commands::Join {
            relay,
            config,
            media_dir,
            synthetic,
            capture,
            call,
        } => {
            let mut config = match config {
                Some(path) => CallConfig::load(&path)?,
                None => CallConfig::default(),
            };
            if let Some(relay) = relay {
                config.relay_url = relay;
            }

            let devices: Arc<dyn MediaDevices> = if synthetic {
                Arc::new(SyntheticCamera::default())
            } else {
                Arc::new(IvfLibrary::new(media_dir))
            };

            join(config, devices, capture, call).await
        }
    }
}

async fn run_relay(bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    println!("{}", "📡 Relay started".green().bold());
    peercall::relay::serve(listener, RelayHub::new()).await
}

async fn list_devices(media_dir: PathBuf) -> Result<()> {
    let library = IvfLibrary::new(&media_dir);
    println!(
        "{} {:?}",
        "🎥 Permission:".cyan(),
        library.permission().await
    );

    let devices = library.enumerate_devices().await?;
    if devices.is_empty() {
        println!("{}", "No .ivf recordings found".yellow());
    }
    for device in devices {
        println!("  {}  {}", device.label.bold(), device.device_id.dimmed());
    }
    Ok(())
}

async fn join(
    config: CallConfig,
    devices: Arc<dyn MediaDevices>,
    capture: bool,
    call: bool,
) -> Result<()> {
    let relay = RelayChannel::connect(&config.relay_url).await?;
    let (sender, inbound) = relay.split();

    let negotiator = Negotiator::new(
        config.clone(),
        sender,
        Arc::new(RtcTransportFactory::new(config.transport.clone())),
        devices.clone(),
        Arc::new(TerminalView),
    );
    let (handle, task) = negotiator.spawn(inbound);

    if capture {
        let device_id = pick_device(devices.as_ref()).await?;
        handle.start_capture(device_id).await;
    }
    if call {
        handle.start_call().await;
    }

    println!(
        "{}",
        "Commands: capture [device], call, adjust, quit".dimmed()
    );
    read_commands(&handle).await?;

    handle.shutdown().await;
    task.await?;
    Ok(())
}

/// Let the user choose when there is more than one device.
async fn pick_device(devices: &dyn MediaDevices) -> Result<Option<String>> {
    let found = devices.enumerate_devices().await?;
    if found.len() < 2 {
        return Ok(None);
    }

    let labels: Vec<String> = found
        .iter()
        .map(|d| {
            if d.label.is_empty() {
                d.device_id.clone()
            } else {
                d.label.clone()
            }
        })
        .collect();

    let index = tokio::task::spawn_blocking(move || {
        dialoguer::Select::new()
            .with_prompt("Capture device")
            .items(&labels)
            .default(0)
            .interact()
    })
    .await??;

    Ok(found.into_iter().nth(index).map(|d| d.device_id))
}

async fn read_commands(handle: &CallHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };

        let mut words = line.split_whitespace();
        let delivered = match words.next() {
            Some("capture") => handle.start_capture(words.next().map(str::to_owned)).await,
            Some("call") => handle.start_call().await,
            Some("adjust") => handle.adjust_resolution().await,
            Some("quit") | Some("exit") => return Ok(()),
            Some(other) => {
                println!("{} {}", "Unknown command:".yellow(), other);
                true
            }
            None => true,
        };

        if !delivered {
            println!("{}", "Call ended".yellow());
            return Ok(());
        }
    }
}
