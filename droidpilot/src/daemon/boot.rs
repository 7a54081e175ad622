//! Starting the worker once per device boot

use super::{Supervisor, SupervisorError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum FlagStoreError {
    #[error("failed to access flag file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse flag file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persisted "start on boot" flag
pub trait BootFlagStore: Send + Sync {
    fn load(&self) -> Result<bool, FlagStoreError>;
    fn store(&self, enabled: bool) -> Result<(), FlagStoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct FlagDocument {
    autostart: bool,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Keeps the flag in `autostart.json` under the data directory.
#[derive(Debug, Clone)]
pub struct JsonFlagStore {
    path: PathBuf,
}

impl JsonFlagStore {
    pub const FILE_NAME: &'static str = "autostart.json";

    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BootFlagStore for JsonFlagStore {
    /// A missing file means the flag was never set
    fn load(&self) -> Result<bool, FlagStoreError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let document: FlagDocument = serde_json::from_str(&content)?;
        Ok(document.autostart)
    }

    fn store(&self, enabled: bool) -> Result<(), FlagStoreError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let document = FlagDocument {
            autostart: enabled,
            updated_at: Some(Utc::now()),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        info!("Autostart {} ({})", if enabled { "enabled" } else { "disabled" }, self.path.display());
        Ok(())
    }
}

/// Boot trigger. Starts the supervisor when the persisted flag is set and
/// reports whether it did.
pub fn on_boot_completed(
    supervisor: &Supervisor,
    store: &dyn BootFlagStore,
) -> Result<bool, SupervisorError> {
    let enabled = match store.load() {
        Ok(enabled) => enabled,
        Err(e) => {
            warn!("Could not read autostart flag, not starting: {}", e);
            return Ok(false);
        }
    };
    if !enabled {
        info!("Autostart disabled, staying stopped");
        return Ok(false);
    }
    info!("Autostart enabled, starting worker after boot");
    supervisor.start()?;
    Ok(true)
}
