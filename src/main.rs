use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use canvas_kit::a2ui::{
    A2uiHost, A2uiHostConfig, A2uiHostEvent, MessageType, SurfaceStore, TransportKind,
    dynamic_canvas_catalog, validate_message,
};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;

/// How often the connect loop drains the host
const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(
    name = "canvas",
    version,
    about = "Drive A2UI dynamic canvas surfaces from JSONL sessions or live agent streams"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a JSONL session to a fresh store and print the resulting surfaces.
    Replay {
        /// JSONL file, or "-" for stdin.
        #[arg(default_value = "-")]
        file: PathBuf,

        /// Batch window in milliseconds (0 = deliver immediately).
        #[arg(long, default_value_t = 0)]
        batch_ms: u64,
    },

    /// Connect to an agent endpoint and print the surfaces once it closes (or on Ctrl-C).
    Connect {
        url: String,

        /// sse, stream or ws.
        #[arg(long, default_value = "sse")]
        transport: TransportKind,

        /// Batch window in milliseconds (0 = deliver immediately).
        #[arg(long, default_value_t = 0)]
        batch_ms: u64,

        /// Bearer token for HTTP transports.
        #[arg(long, env = "CANVAS_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,
    },

    /// Validate each line of a JSONL file and report the findings.
    Validate {
        /// JSONL file, or "-" for stdin.
        #[arg(default_value = "-")]
        file: PathBuf,
    },

    /// Print the dynamic-canvas/v1 component catalog.
    Catalog,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay { file, batch_ms } => run_replay(&file, batch_ms).await,
        Command::Connect {
            url,
            transport,
            batch_ms,
            auth_token,
        } => {
            let config = A2uiHostConfig {
                url: Some(url),
                transport,
                batch_window: Duration::from_millis(batch_ms),
                auth_token,
            };
            run_connect(config).await
        }
        Command::Validate { file } => run_validate(&file).await,
        Command::Catalog => {
            println!("{}", serde_json::to_string_pretty(&dynamic_canvas_catalog())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn run_replay(file: &Path, batch_ms: u64) -> anyhow::Result<ExitCode> {
    let text = read_input(file).await?;

    let mut host = A2uiHost::new(A2uiHostConfig {
        batch_window: Duration::from_millis(batch_ms),
        ..Default::default()
    });
    host.process_jsonl(&text);
    host.destroy();

    let errors = log_events(host.poll_all());
    print_surfaces(host.store())?;

    Ok(if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn run_connect(config: A2uiHostConfig) -> anyhow::Result<ExitCode> {
    let mut host = A2uiHost::new(config);
    host.connect()?;

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    while host.is_connected() {
        tokio::select! {
            _ = ticker.tick() => {
                log_events(host.poll_all());
            }
            result = &mut ctrl_c, if !interrupted => {
                result.context("Failed to listen for Ctrl-C")?;
                log::info!("Interrupted, closing connection");
                interrupted = true;
                host.destroy();
            }
        }
    }

    log_events(host.poll_all());
    print_surfaces(host.store())?;
    Ok(ExitCode::SUCCESS)
}

async fn run_validate(file: &Path) -> anyhow::Result<ExitCode> {
    let text = read_input(file).await?;
    let mut invalid = 0usize;

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let number = index + 1;

        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                invalid += 1;
                println!("line {number}: not JSON ({e})");
                continue;
            }
        };

        let result = validate_message(&value);
        if result.valid {
            println!("line {number}: ok ({})", MessageType::of(&value));
        } else {
            invalid += 1;
            for error in result.errors {
                println!("line {number}: {error}");
            }
        }
    }

    if invalid > 0 {
        log::warn!("{invalid} invalid line(s)");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Log host events and return how many were errors
fn log_events(events: Vec<A2uiHostEvent>) -> usize {
    let mut errors = 0;
    for event in events {
        match event {
            A2uiHostEvent::Connected => log::info!("Connected"),
            A2uiHostEvent::Applied {
                message_type,
                events,
            } => log::debug!("Applied {message_type}: {events:?}"),
            A2uiHostEvent::Error(e) => {
                errors += 1;
                log::warn!("{e}");
            }
            A2uiHostEvent::Disconnected => log::info!("Disconnected"),
        }
    }
    errors
}

fn print_surfaces(store: &SurfaceStore) -> anyhow::Result<()> {
    let snapshot = json!({
        "activeSurfaceId": store.active_surface_id(),
        "surfaces": store.surfaces().collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
