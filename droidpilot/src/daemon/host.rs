//! Process-level hooks the supervisor needs from the hosting OS

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum HostError {
    #[error("host I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported on this host: {0}")]
    Unsupported(String),
}

/// Operations the supervisor asks of the platform.
pub trait PlatformHost: Send + Sync {
    /// Move the worker into a reclamation-resistant priority class
    fn promote(&self) -> Result<(), HostError>;
    fn demote(&self) -> Result<(), HostError>;
    /// Hold the CPU awake for at most `ceiling`
    fn acquire_wake_lock(&self, tag: &str, ceiling: Duration) -> Result<(), HostError>;
    fn release_wake_lock(&self, tag: &str) -> Result<(), HostError>;
    /// End the worker's active period; the process exits after this
    fn terminate_worker(&self);
}

const OOM_SCORE_ADJ: &str = "/proc/self/oom_score_adj";
const PROMOTED_OOM_ADJ: i32 = 0;
const DEMOTED_OOM_ADJ: i32 = 700;
const PROMOTED_NICE: i32 = -4;

/// Host for Linux and Android processes.
///
/// Priority goes through `oom_score_adj` and the nice value, wake locks through
/// the kernel's `/sys/power/wake_lock` interface. Both need privileges the
/// worker may not have; failures are reported and the supervisor carries on.
pub struct ProcessHost {
    power_dir: PathBuf,
    shutdown_tx: watch::Sender<bool>,
}

impl ProcessHost {
    pub fn new() -> Self {
        Self::with_power_dir("/sys/power")
    }

    pub fn with_power_dir(power_dir: impl Into<PathBuf>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            power_dir: power_dir.into(),
            shutdown_tx,
        }
    }

    /// Resolves to `true` once the supervisor terminates the worker
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    fn write_power(&self, file: &str, value: &str) -> Result<(), HostError> {
        let path = self.power_dir.join(file);
        if !path.exists() {
            return Err(HostError::Unsupported(format!("{} missing", path.display())));
        }
        std::fs::write(&path, value)?;
        Ok(())
    }
}

impl Default for ProcessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformHost for ProcessHost {
    fn promote(&self) -> Result<(), HostError> {
        set_nice(PROMOTED_NICE)?;
        std::fs::write(OOM_SCORE_ADJ, PROMOTED_OOM_ADJ.to_string())?;
        info!("Worker promoted (nice {}, oom_adj {})", PROMOTED_NICE, PROMOTED_OOM_ADJ);
        Ok(())
    }

    fn demote(&self) -> Result<(), HostError> {
        std::fs::write(OOM_SCORE_ADJ, DEMOTED_OOM_ADJ.to_string())?;
        set_nice(0)?;
        info!("Worker demoted");
        Ok(())
    }

    fn acquire_wake_lock(&self, tag: &str, ceiling: Duration) -> Result<(), HostError> {
        // The kernel drops the lock by itself once the timeout passes.
        self.write_power("wake_lock", &format!("{tag} {}", ceiling.as_nanos()))?;
        debug!("Wake lock '{}' held for {:?}", tag, ceiling);
        Ok(())
    }

    fn release_wake_lock(&self, tag: &str) -> Result<(), HostError> {
        self.write_power("wake_unlock", tag)?;
        debug!("Wake lock '{}' released", tag);
        Ok(())
    }

    fn terminate_worker(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(unix)]
fn set_nice(value: i32) -> Result<(), HostError> {
    // SAFETY: setpriority only reads its integer arguments.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, value) };
    if rc == 0 {
        Ok(())
    } else {
        Err(HostError::Io(std::io::Error::last_os_error()))
    }
}

#[cfg(not(unix))]
fn set_nice(_value: i32) -> Result<(), HostError> {
    Err(HostError::Unsupported("process priority".to_string()))
}
