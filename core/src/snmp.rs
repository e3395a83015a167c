use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use tokio::task;
use tracing::{debug, trace, warn};

use crate::targets;
use crate::{Error, SnmpAddress};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Oid(pub Vec<u32>);

impl Oid {
    pub fn from_slice(slice: &[u32]) -> Self {
        Self(slice.to_vec())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn is_under(&self, root: &Oid) -> bool {
        self.0.len() >= root.0.len() && self.0[..root.0.len()] == root.0[..]
    }
}

impl From<Vec<u32>> for Oid {
    fn from(value: Vec<u32>) -> Self {
        Self(value)
    }
}

impl From<&[u32]> for Oid {
    fn from(value: &[u32]) -> Self {
        Self::from_slice(value)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            first = false;
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidParseError {
    pub component: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID component: {}", self.component)
    }
}

impl std::error::Error for OidParseError {}

impl FromStr for Oid {
    type Err = OidParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for part in value.split('.') {
            if part.is_empty() {
                continue;
            }
            let parsed = part.parse::<u32>().map_err(|_| OidParseError {
                component: part.to_string(),
            })?;
            parts.push(parsed);
        }

        if parts.is_empty() {
            return Err(OidParseError {
                component: value.to_string(),
            });
        }

        Ok(Oid(parts))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Null,
    Integer(i64),
    Unsigned32(u32),
    Counter32(u32),
    Counter64(u64),
    Timeticks(u32),
    OctetString(Vec<u8>),
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Opaque(Vec<u8>),
    Other(String),
}

impl SnmpValue {
    /// Coerces a varbind into an unsigned counter. Some printer firmware (most
    /// visibly a handful of Kyocera/Ricoh models) encodes a marker life count
    /// as an `OctetString` holding decimal or `0x`-prefixed hex text instead
    /// of a native `Counter32`, so textual values are parsed as a fallback
    /// rather than treated as non-numeric.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Unsigned32(value) => Some(u64::from(*value)),
            SnmpValue::Counter32(value) => Some(u64::from(*value)),
            SnmpValue::Counter64(value) => Some(*value),
            SnmpValue::Integer(value) => (*value >= 0).then_some(*value as u64),
            SnmpValue::OctetString(bytes) => parse_counter_text(&String::from_utf8_lossy(bytes)),
            SnmpValue::Other(text) => parse_counter_text(text),
            _ => None,
        }
    }

    pub fn as_text_lossy(&self) -> Option<String> {
        match self {
            SnmpValue::OctetString(bytes) | SnmpValue::Opaque(bytes) => {
                Some(String::from_utf8_lossy(bytes).to_string())
            }
            _ => None,
        }
    }
}

/// Accepts a plain decimal string or a `0x`/`0X`-prefixed hex string; rejects
/// anything else rather than guessing, since most OctetString counters are
/// genuinely non-numeric labels, not encoded numbers.
fn parse_counter_text(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed.parse::<u64>().ok();
    }
    None
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpValue::Null => f.write_str("null"),
            SnmpValue::Integer(value) => write!(f, "{value}"),
            SnmpValue::Unsigned32(value) => write!(f, "{value}"),
            SnmpValue::Counter32(value) => write!(f, "{value}"),
            SnmpValue::Counter64(value) => write!(f, "{value}"),
            SnmpValue::Timeticks(value) => write!(f, "{value} ticks"),
            SnmpValue::OctetString(bytes) | SnmpValue::Opaque(bytes) => {
                f.write_str(&String::from_utf8_lossy(bytes))
            }
            SnmpValue::ObjectIdentifier(oid) => write!(f, "{oid}"),
            SnmpValue::IpAddress(bytes) => {
                write!(f, "{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
            }
            SnmpValue::Other(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpVersion {
    V1,
    V2c,
    V3,
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpVersion::V1 => f.write_str("v1"),
            SnmpVersion::V2c => f.write_str("v2c"),
            SnmpVersion::V3 => f.write_str("v3"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpV3SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpV3AuthProtocol {
    Md5,
    Sha1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnmpV3PrivProtocol {
    Des,
    Aes128,
}

/// USM credentials for v3. The underlying `snmp2` session type only speaks
/// v1/v2c on the wire, so a v3 request is rejected up front with
/// `SnmpUnsupportedVersion` rather than silently downgrading the protocol
/// version or attempting a session the library can't actually authenticate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpV3Config {
    pub username: Option<String>,
    pub context_name: Option<String>,
    pub security_level: Option<SnmpV3SecurityLevel>,
    pub auth_protocol: Option<SnmpV3AuthProtocol>,
    pub auth_passphrase: Option<String>,
    pub priv_protocol: Option<SnmpV3PrivProtocol>,
    pub priv_passphrase: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SnmpConfig {
    pub version: SnmpVersion,
    pub community: String,
    pub timeout: Duration,
    pub retries: u32,
    pub v3: SnmpV3Config,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            version: SnmpVersion::V2c,
            community: "public".to_string(),
            timeout: Duration::from_secs(30),
            retries: 3,
            v3: SnmpV3Config::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnmpRequest {
    pub address: SnmpAddress,
    pub community: Option<String>,
    pub oids: Vec<Oid>,
}

impl SnmpRequest {
    pub fn new(address: SnmpAddress, oids: Vec<Oid>) -> Self {
        Self {
            address,
            community: None,
            oids,
        }
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SnmpWalkRequest {
    pub address: SnmpAddress,
    pub community: Option<String>,
    pub root_oid: Oid,
    pub max_results: usize,
}

impl SnmpWalkRequest {
    pub fn new(address: SnmpAddress, root_oid: Oid) -> Self {
        Self {
            address,
            community: None,
            root_oid,
            max_results: 64,
        }
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = Some(community.into());
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SnmpResponse {
    pub address: SnmpAddress,
    pub varbinds: Vec<SnmpVarBind>,
}

#[derive(Debug, Clone)]
pub struct SnmpVarBind {
    pub oid: Oid,
    pub value: SnmpValue,
}

pub type SnmpFuture<'a> = Pin<Box<dyn Future<Output = Result<SnmpResponse, Error>> + Send + 'a>>;

/// The seam every scan stage talks to instead of a concrete session type, so
/// tests can hand a `MockSnmpClient` a canned reply queue without opening a
/// socket. `Get` answers a fixed OID list in one round trip; `Walk` advances
/// a single `GETNEXT` cursor until the result strays outside its root.
pub trait SnmpClient: Send + Sync {
    fn get<'a>(&'a self, request: SnmpRequest) -> SnmpFuture<'a>;
    fn walk<'a>(&'a self, request: SnmpWalkRequest) -> SnmpFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct SnmpV2cClient {
    config: SnmpConfig,
}

impl SnmpV2cClient {
    pub fn new(config: SnmpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnmpConfig {
        &self.config
    }

    pub async fn get(&self, request: SnmpRequest) -> Result<SnmpResponse, Error> {
        let SnmpRequest {
            address,
            community,
            oids,
        } = request;

        let config = self.config.clone();
        let community = community.unwrap_or_else(|| config.community.clone());
        let label = address.to_string();
        let oid_labels: Vec<String> = oids.iter().map(|oid| oid.to_string()).collect();

        debug!(
            target: targets::SNMP,
            address = %label,
            oids = ?oid_labels,
            timeout_ms = config.timeout.as_millis(),
            retries = config.retries,
            "dispatching SNMP GET"
        );

        let outcome = task::spawn_blocking(move || session_get(address, community, oids, config)).await;

        log_outcome(&label, "GET", outcome)
    }

    pub async fn walk(&self, request: SnmpWalkRequest) -> Result<SnmpResponse, Error> {
        let SnmpWalkRequest {
            address,
            community,
            root_oid,
            max_results,
        } = request;

        let config = self.config.clone();
        let community = community.unwrap_or_else(|| config.community.clone());
        let label = address.to_string();

        debug!(
            target: targets::SNMP,
            address = %label,
            root = %root_oid,
            max_results,
            timeout_ms = config.timeout.as_millis(),
            retries = config.retries,
            "dispatching SNMP WALK"
        );

        let outcome =
            task::spawn_blocking(move || session_walk(address, community, root_oid, max_results, config)).await;

        log_outcome(&label, "WALK", outcome)
    }
}

/// Shared tail of `get`/`walk`: unwraps the `spawn_blocking` join result,
/// traces every returned varbind at `trace` level, and warns once on any
/// failure path (session error or a panicked/aborted blocking task).
fn log_outcome(
    label: &str,
    op: &str,
    outcome: Result<Result<SnmpResponse, Error>, task::JoinError>,
) -> Result<SnmpResponse, Error> {
    match outcome {
        Ok(Ok(response)) => {
            debug!(target: targets::SNMP, address = %label, op, count = response.varbinds.len(), "SNMP request ok");
            for varbind in &response.varbinds {
                trace!(target: targets::SNMP, address = %label, oid = %varbind.oid, value = %varbind.value, "SNMP value");
            }
            Ok(response)
        }
        Ok(Err(error)) => {
            warn!(target: targets::SNMP, address = %label, op, error = %error, "SNMP request failed");
            Err(error)
        }
        Err(join_error) => {
            let details = format!("SNMP {op} worker task did not complete: {join_error}");
            warn!(target: targets::SNMP, address = %label, "{details}");
            Err(Error::SnmpFailure {
                address: label.to_string(),
                details,
            })
        }
    }
}

impl SnmpClient for SnmpV2cClient {
    fn get<'a>(&'a self, request: SnmpRequest) -> SnmpFuture<'a> {
        Box::pin(async move { SnmpV2cClient::get(self, request).await })
    }

    fn walk<'a>(&'a self, request: SnmpWalkRequest) -> SnmpFuture<'a> {
        Box::pin(async move { SnmpV2cClient::walk(self, request).await })
    }
}

/// FIFO stand-in for a real session: every test that needs an `SnmpClient`
/// pushes the exact `get`/`walk` replies it expects to be consumed, in call
/// order, onto one shared queue (both methods draw from it — there is no
/// separate queue per call kind).
#[derive(Debug, Clone)]
pub struct MockSnmpClient {
    config: SnmpConfig,
    queue: Arc<Mutex<VecDeque<Result<SnmpResponse, Error>>>>,
}

impl MockSnmpClient {
    pub fn new() -> Self {
        Self::with_config(SnmpConfig::default())
    }

    pub fn with_config(config: SnmpConfig) -> Self {
        Self {
            config,
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn config(&self) -> &SnmpConfig {
        &self.config
    }

    pub fn push_response(&self, response: SnmpResponse) {
        self.push_result(Ok(response));
    }

    pub fn push_error(&self, error: Error) {
        self.push_result(Err(error));
    }

    fn push_result(&self, result: Result<SnmpResponse, Error>) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(result);
        }
    }

    fn next_result(&self, address: &SnmpAddress) -> Result<SnmpResponse, Error> {
        self.queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(Error::SnmpFailure {
                    address: address.to_string(),
                    details: "mock SNMP client has no queued response left".to_string(),
                })
            })
    }
}

impl SnmpClient for MockSnmpClient {
    fn get<'a>(&'a self, request: SnmpRequest) -> SnmpFuture<'a> {
        Box::pin(async move { self.next_result(&request.address) })
    }

    fn walk<'a>(&'a self, request: SnmpWalkRequest) -> SnmpFuture<'a> {
        Box::pin(async move { self.next_result(&request.address) })
    }
}

fn session_get(
    address: SnmpAddress,
    community: String,
    oids: Vec<Oid>,
    config: SnmpConfig,
) -> Result<SnmpResponse, Error> {
    reject_v3(&config)?;

    let timeout_ms = duration_ms(config.timeout);
    let mut session = open_session(&address, &community, &config, timeout_ms)?;
    let label = address.to_string();

    let mut varbinds = Vec::new();
    for oid in oids {
        let varbind_group = fetch_with_retries(&mut session, &oid, &address, &label, timeout_ms, config.retries)?;
        varbinds.extend(varbind_group);
    }

    Ok(SnmpResponse { address, varbinds })
}

fn fetch_with_retries(
    session: &mut snmp::SyncSession,
    oid: &Oid,
    address: &SnmpAddress,
    label: &str,
    timeout_ms: u64,
    retries: u32,
) -> Result<Vec<SnmpVarBind>, Error> {
    let mut attempt = 0;
    loop {
        match session.get(oid.as_slice()) {
            Ok(response) => {
                return Ok(response
                    .varbinds
                    .map(|(varbind_oid, varbind_val)| SnmpVarBind {
                        oid: resolve_oid(label, varbind_oid),
                        value: resolve_value(label, varbind_val),
                    })
                    .collect());
            }
            Err(error) => {
                if attempt < retries {
                    attempt += 1;
                    trace!(target: targets::SNMP, address = %label, oid = %oid, attempt, "retrying SNMP GET");
                    continue;
                }
                return Err(map_session_error(address, timeout_ms, error));
            }
        }
    }
}

fn session_walk(
    address: SnmpAddress,
    community: String,
    root_oid: Oid,
    max_results: usize,
    config: SnmpConfig,
) -> Result<SnmpResponse, Error> {
    reject_v3(&config)?;

    let timeout_ms = duration_ms(config.timeout);
    let mut session = open_session(&address, &community, &config, timeout_ms)?;
    let label = address.to_string();

    let mut collected = Vec::new();
    let mut cursor = root_oid.clone();

    for _ in 0..max_results {
        let response = session
            .getnext(cursor.as_slice())
            .map_err(|error| map_session_error(&address, timeout_ms, error))?;

        let mut advanced = false;
        for (varbind_oid, varbind_val) in response.varbinds {
            let mapped = resolve_oid(&label, varbind_oid);
            let walk_exhausted = mapped.0.is_empty() || !mapped.is_under(&root_oid) || mapped == cursor;
            if walk_exhausted {
                return Ok(SnmpResponse {
                    address,
                    varbinds: collected,
                });
            }

            collected.push(SnmpVarBind {
                oid: mapped.clone(),
                value: resolve_value(&label, varbind_val),
            });
            cursor = mapped;
            advanced = true;
        }

        if !advanced {
            break;
        }
    }

    Ok(SnmpResponse {
        address,
        varbinds: collected,
    })
}

fn reject_v3(config: &SnmpConfig) -> Result<(), Error> {
    if config.version == SnmpVersion::V3 {
        return Err(Error::SnmpUnsupportedVersion {
            version: config.version.to_string(),
        });
    }
    Ok(())
}

fn open_session(
    address: &SnmpAddress,
    community: &str,
    config: &SnmpConfig,
    timeout_ms: u64,
) -> Result<snmp::SyncSession, Error> {
    snmp::SyncSession::new(
        (address.host.as_str(), address.port),
        community.as_bytes(),
        Some(config.timeout),
        0,
    )
    .map_err(|error| map_connect_error(address, timeout_ms, error))
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

fn map_connect_error(address: &SnmpAddress, timeout_ms: u64, error: io::Error) -> Error {
    if error.kind() == io::ErrorKind::TimedOut {
        Error::SnmpTimeout {
            address: address.to_string(),
            timeout_ms,
        }
    } else {
        Error::SnmpFailure {
            address: address.to_string(),
            details: error.to_string(),
        }
    }
}

fn map_session_error(address: &SnmpAddress, timeout_ms: u64, error: snmp::SnmpError) -> Error {
    match error {
        snmp::SnmpError::CommunityMismatch => Error::SnmpAuth {
            address: address.to_string(),
            details: Some(format!("{error:?}")),
        },
        snmp::SnmpError::ReceiveError => Error::SnmpTimeout {
            address: address.to_string(),
            timeout_ms,
        },
        other => Error::SnmpFailure {
            address: address.to_string(),
            details: format!("{other:?}"),
        },
    }
}

fn resolve_value(address: &str, value: snmp::Value<'_>) -> SnmpValue {
    match value {
        snmp::Value::Null => SnmpValue::Null,
        snmp::Value::Integer(value) => SnmpValue::Integer(value),
        snmp::Value::OctetString(value) => SnmpValue::OctetString(value.to_vec()),
        snmp::Value::ObjectIdentifier(value) => match resolve_oid_checked(address, value) {
            Some(oid) => SnmpValue::ObjectIdentifier(oid),
            None => SnmpValue::Other("ObjectIdentifier(<unparseable>)".to_string()),
        },
        snmp::Value::IpAddress(value) => SnmpValue::IpAddress(value),
        snmp::Value::Counter32(value) => SnmpValue::Counter32(value),
        snmp::Value::Unsigned32(value) => SnmpValue::Unsigned32(value),
        snmp::Value::Timeticks(value) => SnmpValue::Timeticks(value),
        snmp::Value::Counter64(value) => SnmpValue::Counter64(value),
        snmp::Value::Opaque(value) => SnmpValue::Opaque(value.to_vec()),
        other => SnmpValue::Other(format!("{other:?}")),
    }
}

fn resolve_oid(address: &str, oid: snmp::ObjectIdentifier<'_>) -> Oid {
    resolve_oid_checked(address, oid).unwrap_or_else(|| Oid(Vec::new()))
}

fn resolve_oid_checked(address: &str, oid: snmp::ObjectIdentifier<'_>) -> Option<Oid> {
    let mut buf: snmp::ObjIdBuf = [0u32; 128];
    match oid.read_name(&mut buf) {
        Ok(name) => Some(Oid(name.to_vec())),
        Err(error) => {
            warn!(target: targets::SNMP, address = %address, error = ?error, "could not decode an OID in the response");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<T>(future: impl std::future::Future<Output = T>) -> T {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("build current-thread runtime")
            .block_on(future)
    }

    #[test]
    fn oid_round_trips_through_display_and_from_str() {
        let oid: Oid = "1.3.6.1.2.1.1.1.0".parse().expect("parse oid");
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.1.0");
        assert_eq!(oid.as_slice(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn counter_value_accepts_decimal_and_hex_octet_strings() {
        let decimal = SnmpValue::OctetString(b"45991".to_vec());
        assert_eq!(decimal.as_u64(), Some(45991));

        let hex = SnmpValue::OctetString(b"0xb3e7".to_vec());
        assert_eq!(hex.as_u64(), Some(45991));

        let label = SnmpValue::OctetString(b"TK-3402S".to_vec());
        assert_eq!(label.as_u64(), None);
    }

    #[test]
    fn mock_client_drains_its_queue_in_push_order() {
        let mock = MockSnmpClient::new();
        let address = SnmpAddress::with_default_port("192.168.1.10");
        let oid: Oid = "1.3.6.1.2.1.1.3.0".parse().expect("oid");

        mock.push_response(SnmpResponse {
            address: address.clone(),
            varbinds: vec![SnmpVarBind {
                oid: oid.clone(),
                value: SnmpValue::Counter32(123),
            }],
        });

        let request = SnmpRequest::new(address, vec![oid]);
        let response = run(mock.get(request)).expect("mock response");
        assert_eq!(response.varbinds.len(), 1);
        assert_eq!(response.varbinds[0].value.as_u64(), Some(123));
    }

    #[test]
    fn default_config_matches_the_documented_floor_values() {
        let config = SnmpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 3);
        assert_eq!(config.version, SnmpVersion::V2c);
    }

    #[test]
    fn v3_is_rejected_before_a_session_is_opened() {
        let config = SnmpConfig {
            version: SnmpVersion::V3,
            ..SnmpConfig::default()
        };
        let address = SnmpAddress::with_default_port("192.168.1.10");
        let oid: Oid = "1.3.6.1.2.1.1.3.0".parse().expect("oid");
        let error = session_get(address, config.community.clone(), vec![oid], config)
            .expect_err("v3 is not implemented");
        assert!(matches!(error, Error::SnmpUnsupportedVersion { .. }));
    }

    #[test]
    fn mock_client_reports_a_descriptive_error_once_its_queue_is_empty() {
        let mock = MockSnmpClient::new();
        let address = SnmpAddress::with_default_port("192.168.1.10");
        let oid: Oid = "1.3.6.1.2.1.1.3.0".parse().expect("oid");
        let request = SnmpRequest::new(address.clone(), vec![oid]);

        let error = run(mock.get(request)).expect_err("expected error");
        match error {
            Error::SnmpFailure {
                address: error_address,
                ..
            } => assert_eq!(error_address, address.to_string()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
