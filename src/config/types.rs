use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::device::constants::{DEFAULT_KEEP_ALIVE_INTERVAL, DEFAULT_LED_COLOR, DEFAULT_NAME_PREFIX, DEFAULT_SCAN_TIMEOUT};
use crate::device::scanner::WandFilter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub prefix: Option<String>,
    pub mac: Option<String>,
    pub timeout_ms: u64,
}

impl ScanConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// A configured MAC address takes the place of the default prefix.
    pub fn filter(&self) -> WandFilter {
        match &self.mac {
            Some(mac) => WandFilter::mac(mac.clone()),
            None => WandFilter { prefix: self.prefix.clone(), mac: None },
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            prefix: Some(DEFAULT_NAME_PREFIX.to_string()),
            mac: None,
            timeout_ms: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedConfig {
    pub color: String,
    pub on: bool,
}

impl Default for LedConfig {
    fn default() -> Self {
        LedConfig {
            color: DEFAULT_LED_COLOR.to_string(),
            on: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub scan: ScanConfig,
    pub led: LedConfig,
    pub keep_alive_interval_ms: u64,
}

impl Config {
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan: ScanConfig::default(),
            led: LedConfig::default(),
            keep_alive_interval_ms: DEFAULT_KEEP_ALIVE_INTERVAL,
        }
    }
}
