//! aw - actionwire command-line driver
//!
//! `aw build` normalizes a descriptor offline; `aw run` dispatches a JSONL
//! stream of actions through a live coordinator and prints the bus.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use actionwire::cli::{Cli, Command};
use actionwire::config::Config;
use actionwire::coordinator::{join_result, spawn_coordinator};
use actionwire::events::{ActionBus, ActionFilter, spawn_action_logger};
use actionwire::transport::HttpTransport;
use actionwire::{Action, RequestDescriptor};

fn parse_level(level: &str) -> Option<tracing::Level> {
    match level.to_uppercase().as_str() {
        "TRACE" => Some(tracing::Level::TRACE),
        "DEBUG" => Some(tracing::Level::DEBUG),
        "INFO" => Some(tracing::Level::INFO),
        "WARN" | "WARNING" => Some(tracing::Level::WARN),
        "ERROR" => Some(tracing::Level::ERROR),
        _ => None,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("actionwire")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => parse_level(s).unwrap_or_else(|| {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
            tracing::Level::INFO
        }),
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("aw.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Build { descriptor } => {
            debug!("main: matched Build command");
            cmd_build(&config, &descriptor)
        }
        Command::Run {
            file,
            pretty,
            log_actions,
        } => {
            debug!(?file, pretty, ?log_actions, "main: matched Run command");
            cmd_run(config, file, pretty, log_actions).await
        }
    }
}

/// Parse a descriptor argument: JSON, or a bare URL
fn parse_descriptor(raw: &str) -> Result<RequestDescriptor> {
    match serde_json::from_str::<RequestDescriptor>(raw) {
        Ok(descriptor) => Ok(descriptor),
        Err(e) if raw.trim_start().starts_with(['{', '"']) => Err(e).context("Failed to parse descriptor JSON"),
        Err(_) => Ok(RequestDescriptor::get(raw.trim())),
    }
}

fn cmd_build(config: &Config, raw: &str) -> Result<()> {
    debug!(%raw, "cmd_build: called");
    let descriptor = parse_descriptor(raw)?;
    let request = config
        .coordinator
        .request_builder()
        .build(&descriptor.spec)
        .context("Invalid request descriptor")?;

    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

fn read_actions(file: Option<&PathBuf>) -> Result<Vec<Action>> {
    let reader: Box<dyn Read> = match file {
        Some(path) if path.as_os_str() != "-" => {
            Box::new(fs::File::open(path).context(format!("Failed to open {}", path.display()))?)
        }
        _ => Box::new(io::stdin()),
    };

    let mut actions = Vec::new();
    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line.context("Failed to read actions")?;
        if line.trim().is_empty() {
            continue;
        }
        let action: Action =
            serde_json::from_str(&line).context(format!("Invalid action on line {}", index + 1))?;
        actions.push(action);
    }

    debug!(count = actions.len(), "read_actions: loaded actions");
    Ok(actions)
}

fn summarize(action: &Action) -> String {
    if let Some(request) = &action.request {
        return format!(
            "{} {} {} {}",
            "→".cyan(),
            action.action_type.cyan().bold(),
            request.spec.method.to_uppercase(),
            request.spec.url
        );
    }
    let payload = action
        .payload
        .as_ref()
        .map(|payload| payload.to_string())
        .unwrap_or_default();
    if action.error {
        format!("{} {} {}", "✗".red(), action.action_type.red().bold(), payload)
    } else if action.meta.contains_key("request") {
        format!("{} {} {}", "✓".green(), action.action_type.green().bold(), payload)
    } else {
        format!("{} {} {}", "•".dimmed(), action.action_type, payload)
    }
}

/// Print every bus action until the bus closes
fn spawn_printer(bus: &ActionBus, pretty: bool) -> tokio::task::JoinHandle<()> {
    let mut rx = bus.tap(ActionFilter::All);
    tokio::spawn(async move {
        while let Some(action) = rx.recv().await {
            if pretty {
                println!("{}", summarize(&action));
            } else {
                match serde_json::to_string(&action) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "printer: failed to serialize action"),
                }
            }
        }
    })
}

async fn cmd_run(config: Config, file: Option<PathBuf>, pretty: bool, log_actions: Option<PathBuf>) -> Result<()> {
    debug!(?file, pretty, "cmd_run: called");
    let actions = read_actions(file.as_ref())?;

    let transport = Arc::new(HttpTransport::new(&config.http).context("Failed to create HTTP transport")?);
    let bus = ActionBus::new(config.coordinator.bus_capacity);
    let logger = log_actions.as_ref().map(|path| spawn_action_logger(&bus, path));
    let printer = spawn_printer(&bus, pretty);
    let (handle, task) = spawn_coordinator(config.coordinator, transport, bus);

    let mut dispatched = 0;
    for action in actions {
        let is_request = action.is_request();
        let action_type = action.action_type.clone();
        if !is_request && dispatched > 0 {
            // Requests ahead of a plain action launch first, so a cancellation
            // line reaches the calls listed before it
            handle
                .wait_launched(dispatched)
                .await
                .map_err(eyre::Report::new)
                .context(format!("Coordinator stopped before {}", action_type))?;
        }
        handle
            .dispatch(action)
            .map_err(eyre::Report::new)
            .context(format!("Failed to dispatch {}", action_type))?;
        if is_request {
            dispatched += 1;
        }
    }
    info!(dispatched, "cmd_run: dispatched actions, waiting to settle");

    let settled = handle.settle(dispatched).await;
    if let Ok(metrics) = &settled {
        info!(?metrics, "cmd_run: settled");
    }
    // A faulted coordinator has already stopped
    let _ = handle.shutdown().await;
    let joined = join_result(task.await);
    drop(handle);

    printer.await.context("Printer task failed")?;
    if let Some(logger) = logger {
        logger.await.context("Action logger task failed")?;
    }

    joined?;
    settled.map_err(eyre::Report::new)?;
    Ok(())
}
