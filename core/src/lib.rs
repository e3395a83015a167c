pub mod capability;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod netinfo;
pub mod parser;
pub mod range;
pub mod snmp;
pub mod store;
pub mod targets;
pub mod vendor;
pub mod webui;

pub use config::{AgentConfig, ConfigSource};
pub use error::{Error, StorageAction};
pub use merge::{merge_records, touch_or_insert};
pub use netinfo::{default_discovery_cidr, primary_interface_ip};
pub use parser::{apply_derived_fields, ParseDebug};
pub use store::DeviceStore;
pub use vendor::{counter_profile_for, expected_counter_mode, VendorCounterProfile};
pub use webui::{candidate_urls, probe_web_ui};
pub use model::{
    DetectionResult, EpochSeconds, LearnedOids, LivenessResult, MeterProvenance, MeterValue,
    MetricsSnapshot, PaperTray, PrinterId, PrinterRecord, QueryResult, ScanJob, ScanMeta,
    SnmpAddress, DEFAULT_PRINTER_PORTS, DEFAULT_SNMP_PORT, FULL_PRINTER_PORTS,
};
pub use range::{parse_ranges, LineError, RangeExpansion};
pub use snmp::{
    MockSnmpClient, Oid, OidParseError, SnmpClient, SnmpConfig, SnmpFuture, SnmpRequest,
    SnmpResponse, SnmpV2cClient, SnmpV3AuthProtocol, SnmpV3Config, SnmpV3PrivProtocol,
    SnmpV3SecurityLevel, SnmpValue, SnmpVarBind, SnmpVersion, SnmpWalkRequest,
};
