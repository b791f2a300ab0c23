//! Ekos Debugger - Main entry point
//!
//! Runs KStars or the INDI server under gdb, mirrors their output, and saves
//! the captured logs when the session ends.

mod config;
mod state;
mod supervisor;

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use ekos_debugger_core::{save_logs, Stream};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::state::AppState;
use crate::supervisor::{SessionEvent, SessionOutcome, Supervisor};

#[derive(Parser, Debug)]
#[command(name = "ekos-debugger")]
#[command(about = "Run KStars and INDI drivers under gdb and collect their logs")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "ekos-debugger.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List driver groups and devices from the descriptor directory
    Drivers {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// List equipment profiles
    Profiles,
    /// Show the INDI server command line for a profile
    Args {
        /// Profile name
        #[arg(short, long)]
        profile: String,
        /// Primary device label (defaults to the profile's first device)
        #[arg(short, long)]
        driver: Option<String>,
        /// Print the driver list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run KStars under the debugger
    Kstars {
        /// Directory to save logs to (overrides the configuration)
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Do not save logs when the session ends
        #[arg(long)]
        no_save: bool,
    },
    /// Run the INDI server under the debugger
    Indi {
        /// Profile name
        #[arg(short, long)]
        profile: String,
        /// Primary device label (defaults to the profile's first device)
        #[arg(short, long)]
        driver: Option<String>,
        /// Directory to save logs to (overrides the configuration)
        #[arg(long)]
        save_dir: Option<PathBuf>,
        /// Do not save logs when the session ends
        #[arg(long)]
        no_save: bool,
    },
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Ekos Debugger v{}", env!("CARGO_PKG_VERSION"));

    if let Command::InitConfig { force } = args.command {
        if args.config.exists() && !force {
            bail!("{} already exists, use --force to overwrite", args.config.display());
        }
        config::save_default_config(&args.config)?;
        println!("Wrote {}", args.config.display());
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    info!(
        drivers = %config.drivers.path.display(),
        profiles = %config.profiles.path.display(),
        "Configuration loaded"
    );
    let state = AppState::load(config);

    match args.command {
        Command::Drivers { json } => print_drivers(&state, json)?,
        Command::Profiles => print_profiles(&state),
        Command::Args {
            profile,
            driver,
            json,
        } => {
            let selection = state.select(&profile, driver.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state.launch_args(&selection))?);
            } else {
                println!("{}", state.indi_invocation(&selection));
            }
        }
        Command::Kstars { save_dir, no_save } => {
            let save_dir = (!no_save)
                .then(|| save_dir.unwrap_or_else(|| state.config.kstars.save_path.clone()));
            let supervisor = Supervisor::new(
                "KStars",
                state.kstars_invocation(),
                state.config.kstars.restart,
            );
            run_session(supervisor, "kstars", save_dir.as_deref()).await?;
        }
        Command::Indi {
            profile,
            driver,
            save_dir,
            no_save,
        } => {
            let selection = state.select(&profile, driver.as_deref())?;
            state.ensure_local(&selection)?;
            let invocation = state.indi_invocation(&selection);
            if state.launch_args(&selection).is_empty() {
                warn!(profile = %profile, "No drivers resolved, the server will start without drivers");
            }
            let save_dir = (!no_save)
                .then(|| save_dir.unwrap_or_else(|| state.config.indi.save_path.clone()));
            let supervisor = Supervisor::new("INDI", invocation, state.config.indi.restart);
            run_session(supervisor, "indi", save_dir.as_deref()).await?;
        }
        Command::InitConfig { .. } => unreachable!("handled before loading configuration"),
    }

    Ok(())
}

fn print_drivers(state: &AppState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&state.catalog)?);
    } else {
        for group in state.catalog.groups() {
            println!("{}", group.name);
            for device in &group.devices {
                if device.is_resolved() {
                    println!("  - {} ({})", device.label, device.command);
                } else {
                    println!("  - {} (no driver)", device.label);
                }
            }
        }
        println!(
            "{} groups, {} devices",
            state.catalog.groups().len(),
            state.catalog.device_count()
        );
    }

    for diagnostic in &state.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    Ok(())
}

fn print_profiles(state: &AppState) {
    if state.profiles.is_empty() {
        println!("No profiles in {}", state.config.profiles.path.display());
        return;
    }
    for profile in &state.profiles.profile {
        let host = profile.host.as_deref().unwrap_or("localhost");
        println!("{} ({}:{})", profile.name, host, profile.port);
        for (role, label) in &profile.drivers {
            let command = state.catalog.find_command(label).unwrap_or("unresolved");
            println!("  {}: {} [{}]", role, label, command);
        }
    }
}

/// Supervise a session until it ends or Ctrl-C, then save its logs
async fn run_session(supervisor: Supervisor, prefix: &str, save_dir: Option<&Path>) -> Result<()> {
    let name = supervisor.name().to_string();
    let printer = tokio::spawn(print_events(name.clone(), supervisor.subscribe()));

    let outcome = {
        let run = supervisor.run();
        tokio::pin!(run);

        let finished = tokio::select! {
            outcome = &mut run => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };
        match finished {
            Some(outcome) => outcome,
            None => {
                info!("Interrupted, stopping {}", name);
                supervisor.stop();
                run.await
            }
        }
    };

    // Dropping the supervisor closes the event channel; the printer then
    // finishes the queued output, the crash backtrace included
    let logs = supervisor.logs().await;
    drop(supervisor);
    if let Err(e) = printer.await {
        debug!(error = %e, "Output printer ended abnormally");
    }

    // Logs are worth keeping even if the session failed
    if let Some(dir) = save_dir {
        match save_logs(dir, prefix, &logs, &Local::now()) {
            Ok(saved) => {
                println!("Saved {}", saved.debug.display());
                println!("Saved {}", saved.app.display());
            }
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to save logs"),
        }
    }

    match outcome? {
        SessionOutcome::Exited(code) => info!(?code, "{} exited", name),
        SessionOutcome::Crashed(signal) => warn!(?signal, "{} crashed", name),
        SessionOutcome::Stopped => info!("{} stopped", name),
    }
    Ok(())
}

/// Mirror session output to the terminal
async fn print_events(name: String, mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Output { stream, line }) => match stream {
                Stream::Debug => println!("[{} debug] {}", name, line),
                Stream::App => println!("[{} app] {}", name, line),
            },
            Ok(SessionEvent::Started { pid }) => match pid {
                Some(pid) => println!("[{}] started (pid {})", name, pid),
                None => println!("[{}] started", name),
            },
            Ok(SessionEvent::Crashed { signal }) => match signal {
                Some(signal) => println!("[{}] crashed (signal {})", name, signal),
                None => println!("[{}] crashed", name),
            },
            Ok(SessionEvent::Exited { code }) => match code {
                Some(code) => println!("[{}] exited normally (code {})", name, code),
                None => println!("[{}] exited normally", name),
            },
            Ok(SessionEvent::Restarting) => println!("[{}] restarting after crash", name),
            Ok(SessionEvent::Stopped) => println!("[{}] stopped", name),
            Ok(SessionEvent::SpawnFailed(error)) => println!("[{}] failed to start: {}", name, error),
            Err(RecvError::Lagged(missed)) => {
                println!("[{}] ... {} events not shown, see the saved logs", name, missed)
            }
            Err(RecvError::Closed) => break,
        }
    }
}
