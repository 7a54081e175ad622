use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

pub fn init_logging() -> Result<()> {
    let log_level = env::var("LOG_LEVEL")
        .map(|level| match level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    Ok(())
}

/// Marker left in the data directory by a running worker so that other
/// invocations can report on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub host: String,
    pub port: u16,
}

impl WorkerRecord {
    pub const FILE_NAME: &'static str = "worker.json";

    pub fn current(host: &str, port: u16) -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
            host: host.to_string(),
            port,
        }
    }

    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(Self::FILE_NAME)
    }

    pub fn write(&self, data_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        std::fs::write(Self::path(data_dir), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn remove(data_dir: &Path) {
        if let Err(e) = std::fs::remove_file(Self::path(data_dir)) {
            debug!("No worker record to remove: {}", e);
        }
    }

    /// The record of a worker that is still alive, if any. Records left
    /// behind by a killed worker are ignored.
    pub fn load_alive(data_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(Self::path(data_dir)).ok()?;
        let record: Self = serde_json::from_str(&content).ok()?;
        is_alive(record.pid).then_some(record)
    }
}

fn is_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}
