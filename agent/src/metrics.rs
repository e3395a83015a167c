use std::collections::HashMap;

use tracing::{debug, warn};

use printfleet_core::model::{
    EpochSeconds, MetricsSnapshot, PrinterRecord, SnmpAddress,
};
use printfleet_core::snmp::{Oid, SnmpClient, SnmpConfig, SnmpRequest, SnmpValue};
use printfleet_core::targets;
use printfleet_core::vendor;

const SERIAL_OID: &str = "1.3.6.1.2.1.43.5.1.1.17.1";
const SYS_DESCR_OID: &str = "1.3.6.1.2.1.1.1.0";
const HR_DEVICE_DESCR_OID: &str = "1.3.6.1.2.1.25.3.2.1.3.1";
const PRT_MARKER_LIFECOUNT_OID: &str = "1.3.6.1.2.1.43.10.2.1.4.1.1";
const PRT_MARKER_SUPPLIES_LEVEL_OID: &str = "1.3.6.1.2.1.43.11.1.1.9.1";
const PRT_MARKER_SUPPLIES_MAX_OID: &str = "1.3.6.1.2.1.43.11.1.1.8.1";
const HR_PRINTER_STATUS_OID: &str = "1.3.6.1.2.1.25.3.5.1.1.1";

/// Standard OIDs always appended to a targeted poll, regardless of which
/// OIDs were learned during deep scan. Small and cheap enough to always ask.
const STANDARD_OIDS: [&str; 3] = [SERIAL_OID, SYS_DESCR_OID, HR_DEVICE_DESCR_OID];

/// Fallback set used when a device has no learned OIDs yet (first poll
/// after discovery, or a deep scan that came up empty), augmented by
/// whatever private counter root the vendor table knows for this device.
fn fallback_oids(record: &PrinterRecord) -> Vec<String> {
    let mut oids = vec![
        PRT_MARKER_LIFECOUNT_OID.to_string(),
        PRT_MARKER_SUPPLIES_LEVEL_OID.to_string(),
        PRT_MARKER_SUPPLIES_MAX_OID.to_string(),
        HR_PRINTER_STATUS_OID.to_string(),
    ];
    if let Some(quirks) = vendor::quirks::lookup_quirks(record.manufacturer.as_deref().unwrap_or_default()) {
        if let Some(root) = quirks.private_counter_root {
            oids.push(root.to_string());
        }
    }
    oids
}

/// Performs one targeted poll of a known device: learned OIDs when present,
/// otherwise the hard-coded `QueryMetrics` set augmented by vendor dispatch.
/// Never blocks the collector loop on a slow device — bounded by `timeout`
/// in `config`, same as every other SNMP stage in this pipeline.
pub async fn collect(
    record: &PrinterRecord,
    client: &dyn SnmpClient,
    config: &SnmpConfig,
    now: EpochSeconds,
) -> Option<MetricsSnapshot> {
    let ip = record.ip.clone()?;
    let address = SnmpAddress::with_default_port(ip.clone());

    let mut requested: Vec<String> = STANDARD_OIDS.iter().map(|s| s.to_string()).collect();
    let learned = record.learned_oids.all_oids();
    if learned.is_empty() {
        requested.extend(fallback_oids(record));
    } else {
        requested.extend(learned);
    }
    requested.dedup();

    let oids: Vec<Oid> = requested.iter().filter_map(|raw| raw.parse().ok()).collect();
    let request = SnmpRequest::new(address, oids).with_community(config.community.clone());

    let response = match tokio::time::timeout(config.timeout, client.get(request)).await {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            warn!(target: targets::METRICS, ip = %ip, error = %error, "metrics poll failed");
            return None;
        }
        Err(_) => {
            debug!(target: targets::METRICS, ip = %ip, "metrics poll timed out");
            return None;
        }
    };

    let mut serial = None;
    let mut page_count = None;
    let mut toner_levels: HashMap<String, i64> = HashMap::new();
    let mut supplies_max: Option<i64> = None;

    for varbind in &response.varbinds {
        let oid = varbind.oid.to_string();
        match oid.as_str() {
            SERIAL_OID => serial = varbind.value.as_text_lossy(),
            PRT_MARKER_LIFECOUNT_OID => page_count = varbind.value.as_u64(),
            PRT_MARKER_SUPPLIES_LEVEL_OID => {
                if let Some(level) = as_signed(&varbind.value) {
                    let key = record
                        .learned_oids
                        .primary_supply_key
                        .clone()
                        .unwrap_or_else(|| "toner".to_string());
                    toner_levels.insert(key, level);
                }
            }
            PRT_MARKER_SUPPLIES_MAX_OID => supplies_max = as_signed(&varbind.value),
            _ if oid == record.learned_oids.mono_pages.as_deref().unwrap_or_default() => {
                page_count = page_count.or_else(|| varbind.value.as_u64());
            }
            _ => {}
        }
    }
    let _ = supplies_max;

    Some(MetricsSnapshot {
        serial: serial.or_else(|| record.serial.clone()),
        page_count,
        color_pages: None,
        mono_pages: None,
        scan_count: None,
        copy_pages: None,
        fax_pages: None,
        jam_events: None,
        toner_levels,
        timestamp: now,
    })
}

fn as_signed(value: &SnmpValue) -> Option<i64> {
    match value {
        SnmpValue::Integer(v) => Some(*v),
        other => other.as_u64().map(|v| v as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printfleet_core::model::PrinterId;
    use printfleet_core::snmp::{MockSnmpClient, SnmpResponse, SnmpVarBind};

    #[tokio::test]
    async fn falls_back_to_hard_coded_oids_when_nothing_learned() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.ip = Some("10.0.0.9".to_string());

        let client = MockSnmpClient::new();
        let address = SnmpAddress::with_default_port("10.0.0.9".to_string());
        let oid: Oid = PRT_MARKER_LIFECOUNT_OID.parse().unwrap();
        client.push_response(SnmpResponse {
            address,
            varbinds: vec![SnmpVarBind {
                oid,
                value: SnmpValue::Counter32(4200),
            }],
        });

        let config = SnmpConfig::default();
        let snapshot = collect(&record, &client, &config, 1_000).await.unwrap();
        assert_eq!(snapshot.page_count, Some(4200));
    }

    #[tokio::test]
    async fn toner_level_is_keyed_by_the_learned_supply_name_not_a_fixed_label() {
        let mut record = PrinterRecord::new(PrinterId::new("printer-1"));
        record.ip = Some("10.0.0.9".to_string());
        record.learned_oids.primary_supply_key = Some("black toner".to_string());

        let client = MockSnmpClient::new();
        let address = SnmpAddress::with_default_port("10.0.0.9".to_string());
        let oid: Oid = PRT_MARKER_SUPPLIES_LEVEL_OID.parse().unwrap();
        client.push_response(SnmpResponse {
            address,
            varbinds: vec![SnmpVarBind {
                oid,
                value: SnmpValue::Integer(55),
            }],
        });

        let config = SnmpConfig::default();
        let snapshot = collect(&record, &client, &config, 1_000).await.unwrap();
        assert_eq!(snapshot.toner_levels.get("black toner"), Some(&55));
        assert!(!snapshot.toner_levels.contains_key("primary"));
    }

    #[tokio::test]
    async fn missing_ip_skips_the_poll() {
        let record = PrinterRecord::new(PrinterId::new("printer-1"));
        let client = MockSnmpClient::new();
        let config = SnmpConfig::default();
        assert!(collect(&record, &client, &config, 1_000).await.is_none());
    }
}
