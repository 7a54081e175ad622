use crate::utils::{init_logging, WorkerRecord};
use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use droidpilot::capabilities::CapabilityReporter;
use droidpilot::daemon::bridge::{EngineConfig, MessageResponse};
use droidpilot::daemon::{
    on_boot_completed, BootFlagStore, JsonFlagStore, LoopbackEngine, ProcessHost, Supervisor,
    SupervisorConfig,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod utils;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "DroidPilot agent worker - keeps the on-device agent engine alive"
)]
struct Args {
    /// Data directory for the engine and the autostart flag
    #[arg(long, global = true, env = "DROIDPILOT_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Host the engine listens on
    #[arg(long, global = true, env = "DROIDPILOT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port the engine listens on
    #[arg(long, global = true, env = "DROIDPILOT_PORT", default_value_t = 3000)]
    port: u16,

    /// Engine config file, or inline config
    #[arg(long, global = true, env = "DROIDPILOT_CONFIG", default_value = "")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the worker and keep it running until interrupted
    #[command(alias = "start")]
    Run,
    /// Boot trigger: start the worker only if autostart is enabled
    Boot,
    /// Enable or disable starting the worker on boot
    Autostart {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    /// Print the device capability bundle as JSON
    Status,
    /// Send one message to the engine's default agent and print the reply
    Send { message: String },
    /// Print the engine version
    Version,
}

impl Args {
    fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            engine: EngineConfig {
                config_path: self.config.clone(),
                data_dir: self.data_dir.display().to_string(),
                host: self.host.clone(),
                port: self.port,
            },
            ..SupervisorConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    let host = Arc::new(ProcessHost::new());
    let supervisor = Arc::new(Supervisor::new(
        args.supervisor_config(),
        host.clone(),
        Arc::new(LoopbackEngine::new()),
    ));
    let flags = JsonFlagStore::in_dir(&args.data_dir);

    match &args.command {
        Command::Run => {
            supervisor.start()?;
            serve(&args, &supervisor, &host).await?;
        }
        Command::Boot => {
            if on_boot_completed(&supervisor, &flags)? {
                serve(&args, &supervisor, &host).await?;
            }
        }
        Command::Autostart { enabled } => {
            flags
                .store(*enabled)
                .with_context(|| format!("Failed to write {}", flags.path().display()))?;
            println!("autostart {}", if *enabled { "enabled" } else { "disabled" });
        }
        Command::Status => {
            let worker = WorkerRecord::load_alive(&args.data_dir);
            let bundle = CapabilityReporter::new().collect(worker.is_some());
            let autostart = flags.load().unwrap_or_else(|e| {
                warn!("Could not read autostart flag: {}", e);
                false
            });
            let report = json!({
                "capabilities": bundle,
                "worker": worker,
                "autostart": autostart,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Send { message } => {
            let reply = send_once(&supervisor, message)?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Version => {
            println!("{}", supervisor.version()?);
        }
    }

    Ok(())
}

/// Starts the worker for a single message. A failed stop is only logged so
/// that a reply already received is not lost.
fn send_once(supervisor: &Supervisor, message: &str) -> Result<MessageResponse> {
    supervisor.start()?;
    let reply = supervisor.send_message(message);
    if let Err(e) = supervisor.stop() {
        warn!("Worker did not stop cleanly: {}", e);
    }
    Ok(reply?)
}

/// Keeps a started worker alive until Ctrl+C or until the supervisor ends it.
async fn serve(args: &Args, supervisor: &Arc<Supervisor>, host: &ProcessHost) -> Result<()> {
    WorkerRecord::current(&args.host, args.port).write(&args.data_dir)?;
    let keeper = supervisor.spawn_lease_keeper();
    let mut shutdown = host.shutdown_signal();

    info!("Worker running on {}:{}, press Ctrl+C to stop", args.host, args.port);
    info!("Engine status: {}", supervisor.bridge().status_json());
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, stopping worker");
        }
        _ = shutdown.wait_for(|stopped| *stopped) => {
            info!("Worker terminated by supervisor");
        }
    }

    keeper.abort();
    if let Err(e) = supervisor.stop() {
        warn!("Worker did not stop cleanly: {}", e);
    }
    WorkerRecord::remove(&args.data_dir);
    Ok(())
}
