//! Host device status bundle for status displays and remote diagnostics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, Networks, System};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub os_version: String,
    pub host_name: String,
    pub cpu_cores: usize,
    pub total_memory_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryInfo {
    /// Charge in percent, `None` on hosts without a battery
    pub level: Option<u8>,
    pub is_charging: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Wifi,
    Cellular,
    Ethernet,
    #[default]
    Offline,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    #[serde(rename = "type")]
    pub kind: NetworkType,
    /// Interfaces with at least one non-loopback address
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityBundle {
    pub device: DeviceInfo,
    pub battery: BatteryInfo,
    pub storage: StorageInfo,
    pub network: NetworkInfo,
    pub location_available: bool,
    pub daemon_running: bool,
    pub collected_at: DateTime<Utc>,
}

impl CapabilityBundle {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Collects a [`CapabilityBundle`] from the running host.
pub struct CapabilityReporter {
    power_supply_dir: PathBuf,
    location_available: bool,
}

impl Default for CapabilityReporter {
    fn default() -> Self {
        Self {
            power_supply_dir: PathBuf::from("/sys/class/power_supply"),
            location_available: false,
        }
    }
}

impl CapabilityReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_power_supply_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.power_supply_dir = dir.into();
        self
    }

    /// Whether a location provider is enabled, as reported by the platform
    pub fn with_location(mut self, available: bool) -> Self {
        self.location_available = available;
        self
    }

    pub fn collect(&self, daemon_running: bool) -> CapabilityBundle {
        let bundle = CapabilityBundle {
            device: device_info(),
            battery: battery_info(&self.power_supply_dir),
            storage: storage_info(),
            network: network_info(),
            location_available: self.location_available,
            daemon_running,
            collected_at: Utc::now(),
        };
        debug!(
            network = ?bundle.network.kind,
            battery = ?bundle.battery.level,
            "Collected capability bundle"
        );
        bundle
    }
}

fn device_info() -> DeviceInfo {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu_all();
    DeviceInfo {
        model: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        os_version: System::long_os_version().unwrap_or_default(),
        host_name: System::host_name().unwrap_or_default(),
        cpu_cores: sys.cpus().len(),
        total_memory_bytes: sys.total_memory(),
    }
}

fn storage_info() -> StorageInfo {
    let disks = Disks::new_with_refreshed_list();
    let (total, free) = disks.list().iter().fold((0u64, 0u64), |(total, free), disk| {
        (total + disk.total_space(), free + disk.available_space())
    });
    StorageInfo {
        total_bytes: total,
        free_bytes: free,
        used_percent: used_percent(total, free),
    }
}

fn used_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(free) as f64;
    (used / total as f64 * 1000.0).round() / 10.0
}

fn network_info() -> NetworkInfo {
    let networks = Networks::new_with_refreshed_list();
    let interfaces: Vec<String> = networks
        .list()
        .iter()
        .filter(|(_, data)| {
            data.ip_networks()
                .iter()
                .any(|net| !net.addr.is_loopback())
        })
        .map(|(name, _)| name.to_string())
        .collect();
    NetworkInfo {
        kind: classify_network(&interfaces),
        interfaces,
    }
}

/// Picks the connection type from active interface names. Wi-Fi wins over
/// cellular, which wins over wired.
pub fn classify_network<S: AsRef<str>>(interfaces: &[S]) -> NetworkType {
    if any_prefixed(interfaces, &["wlan", "wlp", "wifi"]) {
        NetworkType::Wifi
    } else if any_prefixed(interfaces, &["rmnet", "ccmni", "wwan", "pdp"]) {
        NetworkType::Cellular
    } else if any_prefixed(interfaces, &["eth", "enp", "eno", "ens"]) {
        NetworkType::Ethernet
    } else {
        NetworkType::Offline
    }
}

fn any_prefixed<S: AsRef<str>>(interfaces: &[S], prefixes: &[&str]) -> bool {
    interfaces
        .iter()
        .any(|name| prefixes.iter().any(|p| name.as_ref().starts_with(p)))
}

/// Reads the first battery-type supply under `dir`.
pub fn battery_info(dir: &Path) -> BatteryInfo {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return BatteryInfo::default();
    };
    for entry in entries.flatten() {
        let supply = entry.path();
        let kind = read_trimmed(&supply.join("type"));
        if kind.as_deref() != Some("Battery") {
            continue;
        }
        let level = read_trimmed(&supply.join("capacity"))
            .and_then(|c| c.parse::<u8>().ok())
            .map(|c| c.min(100));
        let is_charging = matches!(
            read_trimmed(&supply.join("status")).as_deref(),
            Some("Charging") | Some("Full")
        );
        return BatteryInfo { level, is_charging };
    }
    BatteryInfo::default()
}

fn read_trimmed(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}
