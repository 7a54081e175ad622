//! In-process engine used when no native library is linked

use super::bridge::{DaemonStatus, EngineConfig, MessageResponse, NativeEngine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use sysinfo::{ProcessesToUpdate, System};
use tracing::info;

/// Minimal engine that tracks its own lifecycle and echoes messages back.
#[derive(Debug, Default)]
pub struct LoopbackEngine {
    started: Mutex<Option<Instant>>,
    total_requests: AtomicU64,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn uptime_secs(&self) -> Option<u64> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|at| at.elapsed().as_secs())
    }
}

impl NativeEngine for LoopbackEngine {
    fn start(&self, config: &EngineConfig) -> Result<(), String> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        if started.is_some() {
            return Err("Daemon already running".into());
        }
        info!(
            "Loopback engine started: {}:{} (data: {})",
            config.host, config.port, config.data_dir
        );
        *started = Some(Instant::now());
        Ok(())
    }

    fn stop(&self) -> Result<(), String> {
        match self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(_) => {
                info!("Loopback engine stopped");
                Ok(())
            }
            None => Err("engine not running".into()),
        }
    }

    fn status(&self) -> String {
        let uptime = self.uptime_secs();
        let status = DaemonStatus {
            running: uptime.is_some(),
            uptime_secs: uptime.unwrap_or(0),
            agent_count: usize::from(uptime.is_some()),
            active_sessions: 0,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            memory_bytes: if uptime.is_some() { resident_memory() } else { 0 },
            version: self.version(),
            error: None,
        };
        serde_json::to_string(&status).unwrap_or_else(|_| "{}".into())
    }

    fn send_message(&self, message: &str) -> String {
        let response = if self.uptime_secs().is_some() {
            self.total_requests.fetch_add(1, Ordering::Relaxed);
            MessageResponse {
                success: true,
                response: format!("Echo: {message}"),
                agent: "default".into(),
                tokens_used: 0,
            }
        } else {
            MessageResponse {
                success: false,
                response: "Daemon not running".into(),
                agent: String::new(),
                tokens_used: 0,
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|_| "{}".into())
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }
}

/// Resident set size of this process, or 0 where it cannot be read.
fn resident_memory() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(|p| p.memory()).unwrap_or(0)
}
