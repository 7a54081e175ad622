//! Fault-isolated calls into the native agent engine
//!
//! The engine is reached through exactly five calls. A panic raised on the
//! other side of any of them is caught here and reported as an error value;
//! it never unwinds into the supervisor.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Configuration handed to the engine's start call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the engine's own config file, or inline config
    pub config_path: String,
    /// Data directory for databases and logs
    pub data_dir: String,
    /// HTTP listen host
    pub host: String,
    pub port: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            config_path: String::new(),
            data_dir: ".".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Status payload reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub agent_count: usize,
    pub active_sessions: usize,
    pub total_requests: u64,
    pub memory_bytes: u64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reply to a message sent to the engine's default agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub success: bool,
    pub response: String,
    pub agent: String,
    pub tokens_used: u32,
}

/// The five calls the native engine exposes.
///
/// `status` and `send_message` return JSON documents shaped like
/// [`DaemonStatus`] and [`MessageResponse`].
pub trait NativeEngine: Send + Sync {
    fn start(&self, config: &EngineConfig) -> Result<(), String>;
    fn stop(&self) -> Result<(), String>;
    fn status(&self) -> String;
    fn send_message(&self, message: &str) -> String;
    fn version(&self) -> String;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The engine panicked inside the call
    #[error("native fault in {call}: {message}")]
    Fault { call: &'static str, message: String },

    /// The engine returned an error
    #[error("{call} rejected: {message}")]
    Rejected { call: &'static str, message: String },

    #[error("malformed {call} payload: {message}")]
    Malformed { call: &'static str, message: String },
}

/// Wraps a [`NativeEngine`] so that every call is fault-isolated.
#[derive(Clone)]
pub struct EngineBridge {
    engine: Arc<dyn NativeEngine>,
}

impl EngineBridge {
    pub fn new(engine: Arc<dyn NativeEngine>) -> Self {
        Self { engine }
    }

    pub fn start(&self, config: &EngineConfig) -> Result<(), BridgeError> {
        guarded("start", || self.engine.start(config))?
            .map_err(|message| BridgeError::Rejected { call: "start", message })
    }

    pub fn stop(&self) -> Result<(), BridgeError> {
        guarded("stop", || self.engine.stop())?
            .map_err(|message| BridgeError::Rejected { call: "stop", message })
    }

    pub fn status(&self) -> Result<DaemonStatus, BridgeError> {
        let raw = guarded("status", || self.engine.status())?;
        serde_json::from_str(&raw).map_err(|e| BridgeError::Malformed {
            call: "status",
            message: e.to_string(),
        })
    }

    pub fn send_message(&self, message: &str) -> Result<MessageResponse, BridgeError> {
        let raw = guarded("send_message", || self.engine.send_message(message))?;
        serde_json::from_str(&raw).map_err(|e| BridgeError::Malformed {
            call: "send_message",
            message: e.to_string(),
        })
    }

    pub fn version(&self) -> Result<String, BridgeError> {
        guarded("version", || self.engine.version())
    }

    /// Status as the JSON document handed to status displays. Faults are
    /// folded into the document instead of being returned.
    pub fn status_json(&self) -> String {
        let status = self.status().unwrap_or_else(|e| DaemonStatus {
            error: Some(e.to_string()),
            ..DaemonStatus::default()
        });
        serde_json::to_string(&status)
            .unwrap_or_else(|_| r#"{"running":false,"error":"serialization"}"#.into())
    }
}

fn guarded<T>(call: &'static str, f: impl FnOnce() -> T) -> Result<T, BridgeError> {
    debug!("Native call: {}", call);
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        error!("Native engine panicked in {}: {}", call, message);
        BridgeError::Fault { call, message }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
