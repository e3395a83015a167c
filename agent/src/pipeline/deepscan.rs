use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use printfleet_core::model::{DetectionResult, PaperTray, PrinterRecord, QueryResult};
use printfleet_core::parser::{apply_derived_fields, parse_device_id, CounterOidSet, DeviceId, FieldSources, SupplyRow};
use printfleet_core::snmp::{Oid, SnmpClient, SnmpConfig, SnmpRequest, SnmpValue, SnmpWalkRequest};
use printfleet_core::targets;
use printfleet_core::vendor;

const PRT_GENERAL_SERIAL_OID: &str = "1.3.6.1.2.1.43.5.1.1.17.1";
const PRT_GENERAL_ASSET_OID: &str = "1.3.6.1.2.1.43.8.2.1.10.1.1";
const PRT_MARKER_LIFECOUNT_OID: &str = "1.3.6.1.2.1.43.10.2.1.4.1.1";
const PRT_MARKER_SUPPLIES_DESCR_OID: &str = "1.3.6.1.2.1.43.11.1.1.6.1";
const PRT_MARKER_SUPPLIES_LEVEL_OID: &str = "1.3.6.1.2.1.43.11.1.1.9.1";
const PRT_MARKER_SUPPLIES_MAX_OID: &str = "1.3.6.1.2.1.43.11.1.1.8.1";
const DEVICE_ID_OID: &str = "1.3.6.1.4.1.11.2.3.9.1.1.7.0";
const IP_AD_ENT_NET_MASK_OID: &str = "1.3.6.1.2.1.4.20.1.3";
const IP_ROUTE_NEXT_HOP_DEFAULT_OID: &str = "1.3.6.1.2.1.4.21.1.7.0.0.0.0";
const PRT_INPUT_MAX_CAPACITY_OID: &str = "1.3.6.1.2.1.43.8.2.1.9";
const PRT_INPUT_CURRENT_LEVEL_OID: &str = "1.3.6.1.2.1.43.8.2.1.10";
const PRT_INPUT_MEDIA_NAME_OID: &str = "1.3.6.1.2.1.43.8.2.1.13";

/// Performs the full Printer-MIB walk for a confirmed device and folds the
/// answer through the parser stack to produce a complete `PrinterRecord`.
/// Runs far less often than Liveness/Detection since it is the expensive
/// SNMP call this whole staged pipeline exists to gate.
pub async fn deep_scan(
    result: DetectionResult,
    client: &dyn SnmpClient,
    config: &SnmpConfig,
) -> Option<QueryResult> {
    if let Some(record) = result.cached_record {
        return Some(QueryResult {
            job: result.job,
            record,
        });
    }

    if !result.is_printer {
        return None;
    }

    let ip = result.job.ip.to_string();
    let address = printfleet_core::model::SnmpAddress::with_default_port(ip.clone());

    let oids: Vec<Oid> = [
        PRT_GENERAL_SERIAL_OID,
        PRT_GENERAL_ASSET_OID,
        PRT_MARKER_LIFECOUNT_OID,
        PRT_MARKER_SUPPLIES_DESCR_OID,
        PRT_MARKER_SUPPLIES_LEVEL_OID,
        PRT_MARKER_SUPPLIES_MAX_OID,
        DEVICE_ID_OID,
    ]
    .iter()
    .filter_map(|raw| raw.parse().ok())
    .collect();

    let request = SnmpRequest::new(address, oids).with_community(config.community.clone());
    let response = match client.get(request).await {
        Ok(response) => response,
        Err(error) => {
            warn!(target: targets::PIPELINE, ip = %ip, error = %error, "deep scan snmp request failed");
            return None;
        }
    };

    let mut serial = None;
    let mut asset = None;
    let mut counter_oids = CounterOidSet::default();
    let mut supply_descr = None;
    let mut supply_level = None;
    let mut supply_max = None;
    let mut device_id_raw = None;

    for varbind in &response.varbinds {
        match varbind.oid.to_string().as_str() {
            PRT_GENERAL_SERIAL_OID => serial = varbind.value.as_text_lossy(),
            PRT_GENERAL_ASSET_OID => asset = varbind.value.as_text_lossy(),
            PRT_MARKER_LIFECOUNT_OID => {
                counter_oids.total = Some((varbind.oid.clone(), varbind.value.clone()));
            }
            PRT_MARKER_SUPPLIES_DESCR_OID => supply_descr = varbind.value.as_text_lossy(),
            PRT_MARKER_SUPPLIES_LEVEL_OID => supply_level = Some(varbind.value.clone()),
            PRT_MARKER_SUPPLIES_MAX_OID => supply_max = Some(varbind.value.clone()),
            DEVICE_ID_OID => device_id_raw = varbind.value.as_text_lossy(),
            _ => {}
        }
    }

    let device_id: Option<DeviceId> = device_id_raw.as_deref().map(parse_device_id);

    let sources = FieldSources {
        sys_descr: result.sys_descr.as_deref(),
        sys_object_id: result.sys_object_id.as_deref(),
        prt_general_serial: serial.as_deref(),
        prt_general_asset: asset.as_deref(),
        device_id: device_id.as_ref(),
    };

    let supply_rows: Vec<SupplyRow> = match (supply_descr, supply_level, supply_max) {
        (Some(descr), Some(level), max) => vec![printfleet_core::parser::supplies::supply_row_from_varbind(
            descr,
            &level,
            &max.unwrap_or(SnmpValue::Null),
        )],
        _ => Vec::new(),
    };

    let id = crate::pipeline::detection::printer_id_for(&result);
    let mut record = PrinterRecord::new(id);
    record.ip = Some(ip.clone());
    record.description = result.sys_descr.clone();
    record.sys_object_id = result.sys_object_id.clone();
    record.add_discovery_method(result.job.source.clone());
    for port in &result.open_ports {
        record.add_open_port(*port);
    }

    let network = fetch_network_info(&ip, client, config).await;
    let debug = apply_derived_fields(&mut record, &sources, &counter_oids, &supply_rows, network.as_ref());
    for note in &debug.notes {
        debug!(target: targets::PARSER, ip = %ip, note, "parse decision");
    }
    printfleet_core::capability::classify(&mut record);
    record_learned_oids(&mut record, &counter_oids);

    fetch_vendor_metrics(&mut record, &ip, client, config).await;

    let paper_trays = fetch_paper_trays(&ip, client, config).await;
    for tray in &paper_trays {
        if let Some(status) = &tray.status {
            record.paper_tray_status.insert(tray.index, status.clone());
        }
    }
    record.paper_trays = paper_trays;

    record.web_ui_url = printfleet_core::probe_web_ui(&ip, &record.open_ports, config.timeout).await;

    Some(QueryResult {
        job: result.job,
        record,
    })
}

/// Walks the interface netmask table for this device's own address and
/// reads the default route's next hop, folding both through the same
/// dotted-quad validation `parse_network_info` applies to every other
/// network attribute. DNS/DHCP aren't exposed by a standard MIB column, so
/// those stay empty until a vendor-specific OID is known to hold them.
async fn fetch_network_info(
    ip: &str,
    client: &dyn SnmpClient,
    config: &SnmpConfig,
) -> Option<printfleet_core::parser::NetworkInfo> {
    let address = printfleet_core::model::SnmpAddress::with_default_port(ip.to_string());

    let mask_root: Oid = IP_AD_ENT_NET_MASK_OID.parse().ok()?;
    let walk = SnmpWalkRequest::new(address.clone(), mask_root).with_community(config.community.clone());
    let mut subnet_mask = None;
    if let Ok(response) = client.walk(walk).await {
        for varbind in &response.varbinds {
            if varbind.oid.to_string().ends_with(&format!(".{ip}")) {
                subnet_mask = varbind.value.as_text_lossy();
                break;
            }
        }
    }

    let gateway_oid: Oid = IP_ROUTE_NEXT_HOP_DEFAULT_OID.parse().ok()?;
    let gateway_request = SnmpRequest::new(address, vec![gateway_oid]).with_community(config.community.clone());
    let gateway = match client.get(gateway_request).await {
        Ok(response) => response.varbinds.first().and_then(|vb| vb.value.as_text_lossy()),
        Err(_) => None,
    };

    let mut debug = printfleet_core::parser::ParseDebug::new();
    Some(printfleet_core::parser::parse_network_info(
        subnet_mask.as_deref(),
        gateway.as_deref(),
        &[],
        None,
        &mut debug,
    ))
}

/// Walks a vendor's private MIB branch, if the quirk table knows one for
/// this manufacturer, and merges whatever fax/copy/scan/per-color counters
/// it finds into the record. A no-op for vendors without a known branch.
async fn fetch_vendor_metrics(record: &mut PrinterRecord, ip: &str, client: &dyn SnmpClient, config: &SnmpConfig) {
    let Some(manufacturer) = record.manufacturer.clone() else {
        return;
    };
    let Some(quirks) = vendor::lookup_quirks(&manufacturer) else {
        return;
    };
    let Some(root) = quirks.private_counter_root else {
        return;
    };
    let Ok(root_oid) = root.parse::<Oid>() else {
        return;
    };

    let address = printfleet_core::model::SnmpAddress::with_default_port(ip.to_string());
    let walk = SnmpWalkRequest::new(address, root_oid.clone()).with_community(config.community.clone());
    let response = match client.walk(walk).await {
        Ok(response) => response,
        Err(error) => {
            warn!(target: targets::PIPELINE, ip = %ip, error = %error, "vendor counter walk failed");
            return;
        }
    };

    let metrics = vendor::parse_vendor_metrics(Some(&manufacturer), &root_oid, &response.varbinds);
    vendor::merge_into(record, &metrics);
}

/// Walks the three Printer-MIB input-tray columns and joins them by tray
/// index, since each column is its own table walked independently.
async fn fetch_paper_trays(ip: &str, client: &dyn SnmpClient, config: &SnmpConfig) -> Vec<PaperTray> {
    let address = printfleet_core::model::SnmpAddress::with_default_port(ip.to_string());
    let mut trays: HashMap<u32, PaperTray> = HashMap::new();

    if let Ok(root) = PRT_INPUT_MAX_CAPACITY_OID.parse::<Oid>() {
        let walk = SnmpWalkRequest::new(address.clone(), root).with_community(config.community.clone());
        if let Ok(response) = client.walk(walk).await {
            for varbind in &response.varbinds {
                if let Some(index) = varbind.oid.as_slice().last().copied() {
                    trays.entry(index).or_insert_with(|| blank_tray(index)).max =
                        varbind.value.as_u64().map(|v| v as i64);
                }
            }
        }
    }

    if let Ok(root) = PRT_INPUT_CURRENT_LEVEL_OID.parse::<Oid>() {
        let walk = SnmpWalkRequest::new(address.clone(), root).with_community(config.community.clone());
        if let Ok(response) = client.walk(walk).await {
            for varbind in &response.varbinds {
                if let Some(index) = varbind.oid.as_slice().last().copied() {
                    trays.entry(index).or_insert_with(|| blank_tray(index)).current =
                        varbind.value.as_u64().map(|v| v as i64);
                }
            }
        }
    }

    if let Ok(root) = PRT_INPUT_MEDIA_NAME_OID.parse::<Oid>() {
        let walk = SnmpWalkRequest::new(address, root).with_community(config.community.clone());
        if let Ok(response) = client.walk(walk).await {
            for varbind in &response.varbinds {
                if let Some(index) = varbind.oid.as_slice().last().copied() {
                    trays.entry(index).or_insert_with(|| blank_tray(index)).media = varbind.value.as_text_lossy();
                }
            }
        }
    }

    let mut trays: Vec<PaperTray> = trays.into_values().collect();
    trays.sort_by_key(|tray| tray.index);
    for tray in &mut trays {
        if let (Some(current), Some(max)) = (tray.current, tray.max) {
            if max > 0 {
                let percent = ((current.max(0) * 100) / max).clamp(0, 100) as u8;
                tray.percent = Some(percent);
                tray.status = Some(if percent <= 10 { "low".to_string() } else { "ok".to_string() });
            }
        }
    }
    trays
}

fn blank_tray(index: u32) -> PaperTray {
    PaperTray {
        index,
        ..PaperTray::default()
    }
}

/// Remembers which OIDs actually answered, so the Metrics Collector can
/// re-query them directly on the next poll instead of repeating this walk.
fn record_learned_oids(record: &mut PrinterRecord, counter_oids: &CounterOidSet) {
    if let Some((oid, _)) = &counter_oids.total {
        record.learned_oids.page_count = Some(oid.to_string());
    } else if let Some((oid, _)) = &counter_oids.bw {
        record.learned_oids.mono_pages = Some(oid.to_string());
        if let Some((color_oid, _)) = &counter_oids.color {
            record.learned_oids.color_pages = Some(color_oid.to_string());
        }
    }
    if record.serial.is_some() {
        record.learned_oids.serial = Some(PRT_GENERAL_SERIAL_OID.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use printfleet_core::model::{PrinterId, ScanJob};
    use printfleet_core::snmp::{MockSnmpClient, SnmpResponse, SnmpVarBind};
    use printfleet_core::SnmpAddress;
    use std::net::Ipv4Addr;

    fn printer_detected(ip: Ipv4Addr) -> DetectionResult {
        DetectionResult {
            job: ScanJob::new(ip, "test"),
            is_printer: true,
            open_ports: vec![161],
            cached_record: None,
            sys_object_id: Some("1.3.6.1.4.1.367.1.1".to_string()),
            sys_descr: Some("RICOH IM C3000".to_string()),
        }
    }

    #[tokio::test]
    async fn non_printer_detection_is_skipped() {
        let client = MockSnmpClient::new();
        let config = SnmpConfig::default();
        let result = DetectionResult {
            job: ScanJob::new(Ipv4Addr::new(127, 0, 0, 1), "test"),
            is_printer: false,
            open_ports: vec![],
            cached_record: None,
            sys_object_id: None,
            sys_descr: None,
        };
        assert!(deep_scan(result, &client, &config).await.is_none());
    }

    #[tokio::test]
    async fn cached_record_short_circuits_the_snmp_walk() {
        let client = MockSnmpClient::new();
        let config = SnmpConfig::default();
        let ip = Ipv4Addr::new(127, 0, 0, 1);
        let mut cached = PrinterRecord::new(PrinterId::for_ip(ip));
        cached.ip = Some(ip.to_string());
        let mut result = printer_detected(ip);
        result.cached_record = Some(cached);

        let outcome = deep_scan(result, &client, &config).await.unwrap();
        assert_eq!(outcome.record.ip.as_deref(), Some("127.0.0.1"));
    }

    #[tokio::test]
    async fn full_scan_resolves_serial_counters_and_vendor() {
        let ip = Ipv4Addr::new(127, 0, 0, 1);
        let address = SnmpAddress::with_default_port(ip.to_string());
        let client = MockSnmpClient::new();

        let serial_oid: Oid = PRT_GENERAL_SERIAL_OID.parse().unwrap();
        let lifecount_oid: Oid = PRT_MARKER_LIFECOUNT_OID.parse().unwrap();
        client.push_response(SnmpResponse {
            address: address.clone(),
            varbinds: vec![
                SnmpVarBind {
                    oid: serial_oid,
                    value: SnmpValue::OctetString(b"X7KP001234".to_vec()),
                },
                SnmpVarBind {
                    oid: lifecount_oid,
                    value: SnmpValue::Counter32(4200),
                },
            ],
        });
        // netmask walk and default-route get both come up empty on this host.
        client.push_response(SnmpResponse { address: address.clone(), varbinds: vec![] });
        client.push_response(SnmpResponse { address, varbinds: vec![] });

        let mut config = SnmpConfig::default();
        config.timeout = Duration::from_millis(200);

        let outcome = deep_scan(printer_detected(ip), &client, &config).await.unwrap();
        assert_eq!(outcome.record.manufacturer.as_deref(), Some("Ricoh"));
        assert_eq!(outcome.record.page_count, Some(4200));
        assert_eq!(outcome.record.serial.as_deref(), Some("X7KP001234"));
        assert_eq!(
            outcome.record.learned_oids.page_count.as_deref(),
            Some(PRT_MARKER_LIFECOUNT_OID)
        );
    }
}
