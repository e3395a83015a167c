use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SNMP authentication failed for {address}")]
    SnmpAuth {
        address: String,
        details: Option<String>,
    },
    #[error("SNMP timeout for {address}")]
    SnmpTimeout { address: String, timeout_ms: u64 },
    #[error("SNMP failure for {address}")]
    SnmpFailure { address: String, details: String },
    #[error("Unsupported SNMP version: {version}")]
    SnmpUnsupportedVersion { version: String },
    #[error("Range expansion exceeded the address cap")]
    RangeTooLarge { requested: usize, max: usize },
    #[error("Discovery source {source_name} requires elevated privileges")]
    DiscoveryPermissionDenied { source_name: String, details: String },
    #[error("Discovery source {source_name} failed")]
    DiscoveryTransient { source_name: String, details: String },
    #[error("Failed to prepare proxy request {request_id}")]
    ProxyPreparation {
        request_id: String,
        details: String,
    },
    #[error("WebSocket connection error")]
    WebSocketConnect { details: String },
    #[error("WebSocket protocol error")]
    WebSocketProtocol { details: String },
    #[error("Storage {action} error")]
    StorageIo {
        action: StorageAction,
        path: Option<String>,
        #[source]
        source: std::io::Error,
    },
    #[error("Diagnostics {action} error")]
    Diagnostics {
        action: StorageAction,
        path: Option<String>,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageAction {
    Load,
    Save,
}

impl fmt::Display for StorageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageAction::Load => f.write_str("load"),
            StorageAction::Save => f.write_str("save"),
        }
    }
}

impl Error {
    pub fn user_summary(&self) -> String {
        match self {
            Error::SnmpAuth { address, .. } => {
                format!("SNMP authentication failed for {address}.")
            }
            Error::SnmpTimeout { address, .. } => {
                format!("SNMP request timed out for {address}.")
            }
            Error::SnmpFailure { address, .. } => format!("SNMP error for {address}."),
            Error::SnmpUnsupportedVersion { version } => {
                format!("Unsupported SNMP version: {version}.")
            }
            Error::RangeTooLarge { requested, max } => {
                format!("Range expansion of {requested} addresses exceeds the cap of {max}.")
            }
            Error::DiscoveryPermissionDenied { source_name, .. } => {
                format!("Discovery source {source_name} requires elevation and was disabled.")
            }
            Error::DiscoveryTransient { source_name, .. } => {
                format!("Discovery source {source_name} hit a transient error.")
            }
            Error::ProxyPreparation { request_id, .. } => {
                format!("Failed to prepare proxy request {request_id}.")
            }
            Error::WebSocketConnect { .. } => "Failed to connect to the control channel.".into(),
            Error::WebSocketProtocol { .. } => "Control channel protocol error.".into(),
            Error::StorageIo { action, .. } => format!("Failed to {action} configuration file."),
            Error::Diagnostics { action, .. } => format!("Failed to {action} diagnostics."),
        }
    }

    pub fn technical_detail(&self) -> String {
        match self {
            Error::SnmpAuth { address, details } => {
                let extra = details
                    .as_ref()
                    .map(|text| format!(" ({text})"))
                    .unwrap_or_default();
                format!("SNMP auth failed for {address}{extra}.")
            }
            Error::SnmpTimeout {
                address,
                timeout_ms,
            } => format!("SNMP timeout after {timeout_ms}ms for {address}."),
            Error::SnmpFailure { address, details } => {
                format!("SNMP failure for {address}: {details}")
            }
            Error::SnmpUnsupportedVersion { version } => {
                format!("SNMP version string could not be resolved: {version}")
            }
            Error::RangeTooLarge { requested, max } => {
                format!("Requested {requested} addresses, cap is {max}.")
            }
            Error::DiscoveryPermissionDenied { source_name, details } => {
                format!("{source_name} requires elevation: {details}")
            }
            Error::DiscoveryTransient { source_name, details } => {
                format!("{source_name} transient error: {details}")
            }
            Error::ProxyPreparation {
                request_id,
                details,
            } => format!("proxy_request {request_id} could not be prepared: {details}"),
            Error::WebSocketConnect { details } => format!("WebSocket connect failed: {details}"),
            Error::WebSocketProtocol { details } => {
                format!("WebSocket protocol error: {details}")
            }
            Error::StorageIo {
                action,
                path,
                source,
            } => {
                let path = path
                    .as_ref()
                    .map(|value| format!(" path={value}."))
                    .unwrap_or_default();
                format!("Storage {action} error.{path} {source}")
            }
            Error::Diagnostics {
                action,
                path,
                source,
            } => {
                let path = path
                    .as_ref()
                    .map(|value| format!(" path={value}."))
                    .unwrap_or_default();
                format!("Diagnostics {action} error.{path} {source}")
            }
        }
    }
}
