use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::snmp::{SnmpV3Config, SnmpVersion};

/// Abstraction over where configuration is sourced from (file, environment,
/// server-pushed policy). Mirrors the way the SNMP layer hides the transport
/// behind `SnmpClient` so tests can supply a fixed config without touching disk.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<AgentConfig, crate::Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_scan_ranges")]
    pub scan_ranges: Vec<String>,
    #[serde(default = "default_max_addrs")]
    pub max_addrs: usize,
    #[serde(default = "default_snmp_version")]
    pub snmp_version: SnmpVersion,
    #[serde(default = "default_community")]
    pub snmp_community: String,
    #[serde(default = "default_snmp_timeout_secs")]
    pub snmp_timeout_secs: u64,
    #[serde(default = "default_snmp_retries")]
    pub snmp_retries: u32,
    #[serde(default)]
    pub snmp_v3: Option<SnmpV3Config>,
    #[serde(default = "default_discovery_sources")]
    pub discovery_sources: Vec<String>,
    #[serde(default = "default_liveness_concurrency")]
    pub liveness_concurrency: usize,
    #[serde(default = "default_detection_concurrency")]
    pub detection_concurrency: usize,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_deep_scan_interval_secs")]
    pub deep_scan_interval_secs: u64,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub agent_token: Option<String>,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    /// Milliseconds, not seconds, so a test harness can drive a sub-second
    /// reconnect loop without waiting out a real backoff window.
    #[serde(default = "default_ws_reconnect_delay_ms")]
    pub ws_reconnect_delay_ms: u64,
    #[serde(default = "default_ws_max_reconnect_delay_ms")]
    pub ws_max_reconnect_delay_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            scan_ranges: default_scan_ranges(),
            max_addrs: default_max_addrs(),
            snmp_version: default_snmp_version(),
            snmp_community: default_community(),
            snmp_timeout_secs: default_snmp_timeout_secs(),
            snmp_retries: default_snmp_retries(),
            snmp_v3: None,
            discovery_sources: default_discovery_sources(),
            liveness_concurrency: default_liveness_concurrency(),
            detection_concurrency: default_detection_concurrency(),
            poll_interval_secs: default_poll_interval_secs(),
            deep_scan_interval_secs: default_deep_scan_interval_secs(),
            server_url: None,
            agent_token: None,
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            log_capacity: default_log_capacity(),
            ws_reconnect_delay_ms: default_ws_reconnect_delay_ms(),
            ws_max_reconnect_delay_ms: default_ws_max_reconnect_delay_ms(),
        }
    }
}

impl AgentConfig {
    pub fn snmp_timeout(&self) -> Duration {
        Duration::from_secs(self.snmp_timeout_secs.max(30))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deep_scan_interval(&self) -> Duration {
        Duration::from_secs(self.deep_scan_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn ws_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.ws_reconnect_delay_ms)
    }

    pub fn ws_max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.ws_max_reconnect_delay_ms)
    }
}

fn default_scan_ranges() -> Vec<String> {
    Vec::new()
}

fn default_max_addrs() -> usize {
    65_536
}

fn default_snmp_version() -> SnmpVersion {
    SnmpVersion::V2c
}

fn default_community() -> String {
    "public".to_string()
}

fn default_snmp_timeout_secs() -> u64 {
    30
}

fn default_snmp_retries() -> u32 {
    3
}

fn default_discovery_sources() -> Vec<String> {
    vec![
        "mdns".to_string(),
        "ssdp".to_string(),
        "wsd".to_string(),
        "arp".to_string(),
    ]
}

fn default_liveness_concurrency() -> usize {
    64
}

fn default_detection_concurrency() -> usize {
    16
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_deep_scan_interval_secs() -> u64 {
    3600
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_log_capacity() -> usize {
    2000
}

fn default_ws_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_ws_max_reconnect_delay_ms() -> u64 {
    300_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_floor_values() {
        let config = AgentConfig::default();
        assert_eq!(config.snmp_timeout(), Duration::from_secs(30));
        assert_eq!(config.snmp_retries, 3);
        assert_eq!(config.snmp_community, "public");
    }

    #[test]
    fn snmp_timeout_never_rounds_below_thirty_seconds() {
        let mut config = AgentConfig::default();
        config.snmp_timeout_secs = 5;
        assert_eq!(config.snmp_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn ws_reconnect_delays_default_to_five_seconds_and_five_minutes() {
        let config = AgentConfig::default();
        assert_eq!(config.ws_reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.ws_max_reconnect_delay(), Duration::from_secs(300));
    }

    #[test]
    fn ws_reconnect_delay_is_configurable_down_to_sub_second_precision() {
        let mut config = AgentConfig::default();
        config.ws_reconnect_delay_ms = 500;
        assert_eq!(config.ws_reconnect_delay(), Duration::from_millis(500));
    }
}
