//! Lifecycle of the background worker
//!
//! The supervisor owns the worker's state machine
//! (`Stopped -> Starting -> Running -> Stopping -> Stopped`), its wake lease
//! and the bridge to the native engine. The OS may kill the process at any
//! point without the supervisor noticing; it only regains control when the
//! platform relaunches it and calls [`Supervisor::on_relaunched`].

pub mod boot;
pub mod bridge;
pub mod host;
pub mod lease;
pub mod loopback;

use crate::readiness::millis;
use bridge::{BridgeError, DaemonStatus, EngineBridge, EngineConfig, MessageResponse};
use host::PlatformHost;
use lease::{LeaseStatus, WakeLease};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use boot::{on_boot_completed, BootFlagStore, JsonFlagStore};
pub use bridge::NativeEngine;
pub use host::ProcessHost;
pub use loopback::LoopbackEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DaemonState::Stopped => "stopped",
            DaemonState::Starting => "starting",
            DaemonState::Running => "running",
            DaemonState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Commands the platform redelivers when it relaunches a killed worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorCommand {
    Start,
    Stop,
}

/// How the hosting platform is asked to treat a killed worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Relaunch and hand back the last command the worker received
    RedeliverLastCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    #[serde(with = "millis")]
    pub wake_lease_ceiling: Duration,
    /// How long before expiry the lease keeper renews
    #[serde(with = "millis")]
    pub renew_margin: Duration,
    pub wake_lock_tag: String,
    pub engine: EngineConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            wake_lease_ceiling: Duration::from_secs(10 * 60),
            renew_margin: Duration::from_secs(60),
            wake_lock_tag: "droidpilot:worker".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl SupervisorConfig {
    pub fn renew_interval(&self) -> Duration {
        self.wake_lease_ceiling
            .saturating_sub(self.renew_margin)
            .max(Duration::from_secs(1))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("engine call failed: {0}")]
    Engine(#[from] BridgeError),

    #[error("worker is {0}")]
    Busy(DaemonState),

    #[error("worker is not running")]
    NotRunning,
}

/// Point-in-time liveness report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    pub state: DaemonState,
    pub lease: Option<LeaseStatus>,
    /// A running worker whose lease ran out without renewal
    pub lease_expired: bool,
}

struct Inner {
    state: DaemonState,
    lease: Option<WakeLease>,
    last_command: Option<SupervisorCommand>,
}

pub struct Supervisor {
    inner: Mutex<Inner>,
    host: Arc<dyn PlatformHost>,
    bridge: EngineBridge,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        host: Arc<dyn PlatformHost>,
        engine: Arc<dyn NativeEngine>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: DaemonState::Stopped,
                lease: None,
                last_command: None,
            }),
            host,
            bridge: EngineBridge::new(engine),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> DaemonState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == DaemonState::Running
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy::RedeliverLastCommand
    }

    /// Last explicit command, for the platform to redeliver after a kill
    pub fn last_command(&self) -> Option<SupervisorCommand> {
        self.lock().last_command
    }

    /// Starts the worker. Does nothing when it is already running or starting.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<(), SupervisorError> {
        {
            let mut inner = self.lock();
            match inner.state {
                DaemonState::Running | DaemonState::Starting => {
                    debug!("Start ignored, worker is {}", inner.state);
                    return Ok(());
                }
                DaemonState::Stopping => return Err(SupervisorError::Busy(inner.state)),
                DaemonState::Stopped => {
                    inner.state = DaemonState::Starting;
                    inner.last_command = Some(SupervisorCommand::Start);
                }
            }
        }
        self.launch()
    }

    /// Runs the start sequence; the caller has already moved to `Starting`.
    fn launch(&self) -> Result<(), SupervisorError> {
        info!("Starting worker");
        if let Err(e) = self.host.promote() {
            warn!("Could not raise worker priority: {}", e);
        }
        let lease = self.acquire_lease();

        match self.bridge.start(&self.config.engine) {
            Ok(()) => {
                let mut inner = self.lock();
                inner.state = DaemonState::Running;
                inner.lease = Some(lease);
                info!("Worker running");
                Ok(())
            }
            Err(e) => {
                warn!("Engine start failed: {}", e);
                self.release_lease(lease);
                if let Err(e) = self.host.demote() {
                    warn!("Could not lower worker priority: {}", e);
                }
                self.lock().state = DaemonState::Stopped;
                Err(e.into())
            }
        }
    }

    /// Stops the engine, releases the lease, demotes the process and ends
    /// the worker. Does nothing when already stopped.
    #[instrument(skip(self))]
    pub fn stop(&self) -> Result<(), SupervisorError> {
        let lease = {
            let mut inner = self.lock();
            match inner.state {
                DaemonState::Stopped | DaemonState::Stopping => {
                    debug!("Stop ignored, worker is {}", inner.state);
                    return Ok(());
                }
                DaemonState::Starting => return Err(SupervisorError::Busy(inner.state)),
                DaemonState::Running => {
                    inner.state = DaemonState::Stopping;
                    inner.last_command = Some(SupervisorCommand::Stop);
                    inner.lease.take()
                }
            }
        };

        info!("Stopping worker");
        let stopped = self.bridge.stop();
        if let Err(e) = &stopped {
            warn!("Engine stop failed: {}", e);
        }
        if let Some(lease) = lease {
            self.release_lease(lease);
        }
        if let Err(e) = self.host.demote() {
            warn!("Could not lower worker priority: {}", e);
        }
        self.lock().state = DaemonState::Stopped;
        self.host.terminate_worker();
        info!("Worker stopped");
        stopped.map_err(Into::into)
    }

    /// The OS removed the worker's task from its recents list. A running
    /// worker re-asserts its priority and re-arms its wake lease; the engine
    /// is already running and is left alone. Any other state is ignored.
    /// Returns whether the worker was healed.
    #[instrument(skip(self))]
    pub fn on_task_removed(&self) -> Result<bool, SupervisorError> {
        let stale = {
            let mut inner = self.lock();
            if inner.state != DaemonState::Running {
                debug!("Task removed while {}, nothing to heal", inner.state);
                return Ok(false);
            }
            inner.lease.take()
        };
        info!("Task removed while running, re-promoting worker");
        if let Some(lease) = stale {
            self.release_lease(lease);
        }
        if let Err(e) = self.host.promote() {
            warn!("Could not raise worker priority: {}", e);
        }
        let lease = self.acquire_lease();

        let mut inner = self.lock();
        if inner.state == DaemonState::Running {
            inner.lease = Some(lease);
            Ok(true)
        } else {
            // Stopped while healing
            drop(inner);
            self.release_lease(lease);
            Ok(false)
        }
    }

    /// The platform relaunched a killed worker with its last command.
    pub fn on_relaunched(
        &self,
        last_command: Option<SupervisorCommand>,
    ) -> Result<bool, SupervisorError> {
        match last_command {
            Some(SupervisorCommand::Start) => {
                info!("Relaunched with start command");
                self.start().map(|()| true)
            }
            _ => {
                debug!("Relaunched without start command, staying stopped");
                Ok(false)
            }
        }
    }

    /// Extends the lease by another ceiling. Only the running worker renews.
    pub fn renew_lease(&self) -> Result<(), SupervisorError> {
        {
            let mut inner = self.lock();
            if inner.state != DaemonState::Running {
                return Err(SupervisorError::NotRunning);
            }
            match inner.lease.as_mut() {
                Some(lease) => lease.renew(),
                None => return Err(SupervisorError::NotRunning),
            }
        }
        if let Err(e) = self
            .host
            .acquire_wake_lock(&self.config.wake_lock_tag, self.config.wake_lease_ceiling)
        {
            warn!("Could not re-arm wake lock: {}", e);
        }
        debug!("Wake lease renewed");
        Ok(())
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness_at(Instant::now())
    }

    pub fn liveness_at(&self, now: Instant) -> Liveness {
        let inner = self.lock();
        Liveness {
            state: inner.state,
            lease: inner.lease.as_ref().map(|l| l.status_at(now)),
            lease_expired: inner
                .lease
                .as_ref()
                .map(|l| l.is_expired_at(now))
                .unwrap_or(false),
        }
    }

    /// Renews the lease ahead of its ceiling until the worker stops.
    /// Renewal misses while the worker is starting are skipped, not fatal.
    pub fn spawn_lease_keeper(self: &Arc<Self>) -> JoinHandle<()> {
        let supervisor = Arc::clone(self);
        let interval = self.config.renew_interval();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = supervisor.renew_lease() {
                    match supervisor.state() {
                        DaemonState::Stopped | DaemonState::Stopping => {
                            debug!("Lease keeper exiting");
                            break;
                        }
                        state => debug!("Lease not renewed while {}: {}", state, e),
                    }
                }
            }
        })
    }

    pub fn status(&self) -> Result<DaemonStatus, SupervisorError> {
        Ok(self.bridge.status()?)
    }

    pub fn send_message(&self, message: &str) -> Result<MessageResponse, SupervisorError> {
        Ok(self.bridge.send_message(message)?)
    }

    pub fn version(&self) -> Result<String, SupervisorError> {
        Ok(self.bridge.version()?)
    }

    pub fn bridge(&self) -> &EngineBridge {
        &self.bridge
    }

    fn acquire_lease(&self) -> WakeLease {
        if let Err(e) = self
            .host
            .acquire_wake_lock(&self.config.wake_lock_tag, self.config.wake_lease_ceiling)
        {
            warn!("Could not take wake lock: {}", e);
        }
        WakeLease::acquire(self.config.wake_lease_ceiling)
    }

    fn release_lease(&self, lease: WakeLease) {
        if let Err(e) = self.host.release_wake_lock(&self.config.wake_lock_tag) {
            warn!("Could not release wake lock: {}", e);
        }
        debug!("Wake lease released after {} renewals", lease.renewals());
    }
}
