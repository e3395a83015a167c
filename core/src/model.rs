use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type EpochSeconds = u64;

pub const DEFAULT_SNMP_PORT: u16 = 161;

/// Ports probed during Liveness; `DEFAULT_PRINTER_PORTS` for the compact sweep,
/// `FULL_PRINTER_PORTS` when a full scan is requested.
pub const DEFAULT_PRINTER_PORTS: [u16; 3] = [80, 443, 9100];
pub const FULL_PRINTER_PORTS: [u16; 5] = [80, 443, 9100, 515, 631];

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrinterId(pub String);

impl PrinterId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn for_ip(ip: std::net::Ipv4Addr) -> Self {
        Self(format!("snmp-{ip}"))
    }
}

impl fmt::Display for PrinterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpAddress {
    pub host: String,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
}

impl SnmpAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SNMP_PORT,
        }
    }
}

impl fmt::Display for SnmpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

fn default_snmp_port() -> u16 {
    DEFAULT_SNMP_PORT
}

/// The exact OID that yielded a given derived field, recorded so the Metrics
/// Collector can re-query it directly instead of re-walking the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedOids {
    pub page_count: Option<String>,
    pub mono_pages: Option<String>,
    pub color_pages: Option<String>,
    pub cyan_pages: Option<String>,
    pub magenta_pages: Option<String>,
    pub yellow_pages: Option<String>,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub toner_oid_prefix: Option<String>,
    /// Normalized key of the supply row a deep scan treated as primary, so
    /// the Metrics Collector's later targeted poll (which only re-fetches
    /// level/max, not description) keys it the same way every time.
    pub primary_supply_key: Option<String>,
    #[serde(default)]
    pub vendor: HashMap<String, String>,
}

impl LearnedOids {
    pub fn is_empty(&self) -> bool {
        self.page_count.is_none()
            && self.mono_pages.is_none()
            && self.color_pages.is_none()
            && self.cyan_pages.is_none()
            && self.magenta_pages.is_none()
            && self.yellow_pages.is_none()
            && self.serial.is_none()
            && self.model.is_none()
            && self.toner_oid_prefix.is_none()
            && self.primary_supply_key.is_none()
            && self.vendor.is_empty()
    }

    /// Every learned OID string, deduplicated, for a targeted metrics GET.
    pub fn all_oids(&self) -> Vec<String> {
        let mut oids = Vec::new();
        for field in [
            &self.page_count,
            &self.mono_pages,
            &self.color_pages,
            &self.cyan_pages,
            &self.magenta_pages,
            &self.yellow_pages,
        ] {
            if let Some(oid) = field {
                if !oids.contains(oid) {
                    oids.push(oid.clone());
                }
            }
        }
        for oid in self.vendor.values() {
            if !oids.contains(oid) {
                oids.push(oid.clone());
            }
        }
        oids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperTray {
    pub index: u32,
    pub media: Option<String>,
    pub current: Option<i64>,
    pub max: Option<i64>,
    pub percent: Option<u8>,
    pub status: Option<String>,
}

/// Where a meter value came from, per the open question in the base spec:
/// an OID-derived counter and a label-sniffed status string can collide and
/// the "larger wins" merge rule may be wrong for a device reporting zero
/// where it should report unknown. We keep the provenance instead of
/// silently discarding it so the server can deduplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeterProvenance {
    Oid,
    LabelSniffed,
    VendorDispatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeterValue {
    pub value: u64,
    pub provenance: MeterProvenance,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterRecord {
    // Identity
    pub id: PrinterId,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub serial: Option<String>,
    pub hostname: Option<String>,

    // Descriptive
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub admin_contact: Option<String>,
    pub asset_id: Option<String>,
    pub firmware: Option<String>,
    pub sys_object_id: Option<String>,

    // Counters
    pub page_count: Option<u64>,
    pub mono_impressions: Option<u64>,
    pub cyan_impressions: Option<u64>,
    pub magenta_impressions: Option<u64>,
    pub yellow_impressions: Option<u64>,
    #[serde(default)]
    pub meters: HashMap<String, MeterValue>,

    // Supplies
    #[serde(default)]
    pub toner_levels: HashMap<String, i64>,
    #[serde(default)]
    pub consumables: Vec<String>,
    pub cyan_toner_level: Option<i64>,
    pub magenta_toner_level: Option<i64>,
    pub yellow_toner_level: Option<i64>,
    pub black_toner_level: Option<i64>,
    #[serde(default)]
    pub toner_alerts: Vec<String>,

    // Status
    #[serde(default)]
    pub status_messages: Vec<String>,
    #[serde(default)]
    pub paper_tray_status: HashMap<u32, String>,
    #[serde(default)]
    pub paper_trays: Vec<PaperTray>,

    // Network
    pub subnet_mask: Option<String>,
    pub gateway: Option<String>,
    #[serde(default)]
    pub dns_servers: Vec<String>,
    pub dhcp_server: Option<String>,
    #[serde(default)]
    pub open_ports: Vec<u16>,
    pub web_ui_url: Option<String>,

    // Evidence
    #[serde(default)]
    pub detection_reasons: Vec<String>,
    #[serde(default)]
    pub discovery_methods: Vec<String>,
    pub last_seen: Option<EpochSeconds>,

    // Capabilities
    pub is_color: bool,
    pub is_mono: bool,
    pub is_copier: bool,
    pub is_scanner: bool,
    pub is_fax: bool,
    pub is_laser: bool,
    pub is_inkjet: bool,
    pub has_duplex: bool,
    pub device_type: Option<String>,
    pub form_factor: Option<String>,

    #[serde(default)]
    pub learned_oids: LearnedOids,
}

impl PrinterRecord {
    pub fn new(id: PrinterId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Invariant (f): open ports are set-like — duplicates removed, order stable.
    pub fn add_open_port(&mut self, port: u16) {
        if !self.open_ports.contains(&port) {
            self.open_ports.push(port);
        }
    }

    /// Invariant (f): discovery methods are set-like — duplicates removed, order stable.
    pub fn add_discovery_method(&mut self, method: impl Into<String>) {
        let method = method.into();
        if !self.discovery_methods.contains(&method) {
            self.discovery_methods.push(method);
        }
    }

    pub fn add_detection_reason(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !self.detection_reasons.contains(&reason) {
            self.detection_reasons.push(reason);
        }
    }

    /// Invariant (b): LastSeen is monotonic under merge — a merge never
    /// decreases it.
    pub fn touch_last_seen(&mut self, timestamp: EpochSeconds) {
        self.last_seen =
            Some(self.last_seen.map_or(timestamp, |existing| existing.max(timestamp)));
    }

    /// Invariant (d): IsColor and IsMono are mutually exclusive once classified.
    pub fn set_color_classification(&mut self, is_color: bool) {
        self.is_color = is_color;
        self.is_mono = !is_color;
    }
}

/// Optional hints a discovery source or the ARP table can attach to a scan
/// job so downstream stages skip redundant probing.
#[derive(Debug, Clone, Default)]
pub struct ScanMeta {
    pub known_mac: Option<String>,
    pub open_ports_observed: Vec<u16>,
    pub discovery_method_hints: Vec<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ScanJob {
    pub ip: std::net::Ipv4Addr,
    pub source: String,
    pub meta: Option<ScanMeta>,
}

impl ScanJob {
    pub fn new(ip: std::net::Ipv4Addr, source: impl Into<String>) -> Self {
        Self {
            ip,
            source: source.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: ScanMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LivenessResult {
    pub job: ScanJob,
    pub alive: bool,
    pub open_ports: Vec<u16>,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub job: ScanJob,
    pub is_printer: bool,
    pub open_ports: Vec<u16>,
    /// Set when the Saved-Device Checker already had a record for this IP
    /// and SNMP was skipped entirely.
    pub cached_record: Option<PrinterRecord>,
    pub sys_object_id: Option<String>,
    pub sys_descr: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub job: ScanJob,
    pub record: PrinterRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub serial: Option<String>,
    pub page_count: Option<u64>,
    pub color_pages: Option<u64>,
    pub mono_pages: Option<u64>,
    pub scan_count: Option<u64>,
    pub copy_pages: Option<u64>,
    pub fax_pages: Option<u64>,
    pub jam_events: Option<u64>,
    #[serde(default)]
    pub toner_levels: HashMap<String, i64>,
    pub timestamp: EpochSeconds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ports_are_set_like_and_order_stable() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.add_open_port(9100);
        record.add_open_port(80);
        record.add_open_port(9100);
        assert_eq!(record.open_ports, vec![9100, 80]);
    }

    #[test]
    fn last_seen_is_monotonic_under_touch() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.touch_last_seen(100);
        record.touch_last_seen(50);
        assert_eq!(record.last_seen, Some(100));
        record.touch_last_seen(200);
        assert_eq!(record.last_seen, Some(200));
    }

    #[test]
    fn color_mono_are_mutually_exclusive() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.set_color_classification(true);
        assert!(record.is_color && !record.is_mono);
        record.set_color_classification(false);
        assert!(!record.is_color && record.is_mono);
    }
}
