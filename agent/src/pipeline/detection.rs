use tracing::{debug, warn};

use printfleet_core::model::{DetectionResult, LivenessResult, PrinterId, SnmpAddress};
use printfleet_core::snmp::{Oid, SnmpClient, SnmpConfig, SnmpRequest};
use printfleet_core::targets;

use crate::saved::SavedDeviceChecker;

const SYS_DESCR_OID: &str = "1.3.6.1.2.1.1.1.0";
const SYS_OBJECT_ID_OID: &str = "1.3.6.1.2.1.1.2.0";
const PRT_GENERAL_PRINTER_NAME_OID: &str = "1.3.6.1.2.1.43.5.1.1.16.1";

const FALLBACK_KEYWORDS: [&str; 6] = ["printer", "laserjet", "officejet", "mfp", "deskjet", "inkjet"];

/// Confirms a live host is actually a printer before it reaches the
/// (expensive) deep-scan stage. A host already present in the device store
/// skips the SNMP round trip entirely and is short-circuited into
/// `cached_record`, per the Saved-Device Checker's purpose of avoiding
/// redundant probing of known-good devices between poll cycles.
pub async fn detect(
    result: LivenessResult,
    client: &dyn SnmpClient,
    config: &SnmpConfig,
    saved: &SavedDeviceChecker<'_>,
) -> DetectionResult {
    let ip = result.job.ip.to_string();

    match saved.check(&ip, now_epoch_seconds()) {
        Ok(Some(record)) => {
            debug!(target: targets::PIPELINE, ip = %ip, "saved-device checker hit, skipping SNMP");
            return DetectionResult {
                job: result.job,
                is_printer: true,
                open_ports: result.open_ports,
                cached_record: Some(record),
                sys_object_id: None,
                sys_descr: None,
            };
        }
        Ok(None) => {}
        Err(error) => warn!(target: targets::STORAGE, error = %error, "saved-device lookup failed"),
    }

    if !result.open_ports.contains(&161) && !result.alive {
        return DetectionResult {
            job: result.job,
            is_printer: false,
            open_ports: result.open_ports,
            cached_record: None,
            sys_object_id: None,
            sys_descr: None,
        };
    }

    let address = SnmpAddress::with_default_port(ip.clone());
    let oids: Vec<Oid> = [SYS_DESCR_OID, SYS_OBJECT_ID_OID, PRT_GENERAL_PRINTER_NAME_OID]
        .iter()
        .filter_map(|raw| raw.parse().ok())
        .collect();

    let request = SnmpRequest::new(address, oids).with_community(config.community.clone());
    let response = tokio::time::timeout(config.timeout, client.get(request)).await;

    let (sys_descr, sys_object_id, printer_name) = match response {
        Ok(Ok(response)) => {
            let mut sys_descr = None;
            let mut sys_object_id = None;
            let mut printer_name = None;
            for varbind in response.varbinds {
                match varbind.oid.to_string().as_str() {
                    SYS_DESCR_OID => sys_descr = varbind.value.as_text_lossy(),
                    SYS_OBJECT_ID_OID => sys_object_id = Some(varbind.value.to_string()),
                    PRT_GENERAL_PRINTER_NAME_OID => printer_name = varbind.value.as_text_lossy(),
                    _ => {}
                }
            }
            (sys_descr, sys_object_id, printer_name)
        }
        Ok(Err(error)) => {
            debug!(target: targets::PIPELINE, ip = %ip, error = %error, "detection snmp probe failed");
            (None, None, None)
        }
        Err(_) => {
            debug!(target: targets::PIPELINE, ip = %ip, "detection snmp probe timed out");
            (None, None, None)
        }
    };

    let is_printer = sys_object_id.is_some()
        || printer_name.is_some()
        || sys_descr
            .as_deref()
            .map(is_printer_keyword_match)
            .unwrap_or(false);

    DetectionResult {
        job: result.job,
        is_printer,
        open_ports: result.open_ports,
        cached_record: None,
        sys_object_id,
        sys_descr,
    }
}

fn is_printer_keyword_match(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    FALLBACK_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

pub fn printer_id_for(result: &DetectionResult) -> PrinterId {
    PrinterId::for_ip(result.job.ip)
}

fn now_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use printfleet_core::model::ScanJob;
    use printfleet_core::snmp::{MockSnmpClient, SnmpResponse, SnmpValue, SnmpVarBind};
    use printfleet_core::store::memory::InMemoryDeviceStore;
    use printfleet_core::DeviceStore;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[tokio::test]
    async fn saved_device_short_circuits_snmp() {
        let store = InMemoryDeviceStore::new();
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let mut record = printfleet_core::PrinterRecord::new(PrinterId::for_ip(ip));
        record.ip = Some(ip.to_string());
        record.touch_last_seen(now_epoch_seconds());
        store.upsert(record).unwrap();

        let job = ScanJob::new(ip, "test");
        let liveness = LivenessResult {
            job,
            alive: true,
            open_ports: vec![161],
        };
        let client = MockSnmpClient::new();
        let config = SnmpConfig::default();
        let saved = SavedDeviceChecker::new(&store, Duration::from_secs(3600));

        let result = detect(liveness, &client, &config, &saved).await;
        assert!(result.is_printer);
        assert!(result.cached_record.is_some());
    }

    #[tokio::test]
    async fn sys_object_id_present_marks_as_printer() {
        let store = InMemoryDeviceStore::new();
        let ip = Ipv4Addr::new(10, 0, 0, 6);
        let job = ScanJob::new(ip, "test");
        let liveness = LivenessResult {
            job,
            alive: true,
            open_ports: vec![161],
        };
        let client = MockSnmpClient::new();
        let address = SnmpAddress::with_default_port(ip.to_string());
        let oid: Oid = SYS_OBJECT_ID_OID.parse().unwrap();
        client.push_response(SnmpResponse {
            address,
            varbinds: vec![SnmpVarBind {
                oid,
                value: SnmpValue::ObjectIdentifier("1.3.6.1.4.1.367".parse().unwrap()),
            }],
        });
        let config = SnmpConfig::default();
        let saved = SavedDeviceChecker::new(&store, Duration::from_secs(3600));

        let result = detect(liveness, &client, &config, &saved).await;
        assert!(result.is_printer);
    }

    #[tokio::test]
    async fn snmp_failure_falls_back_to_not_a_printer() {
        let store = InMemoryDeviceStore::new();
        let ip = Ipv4Addr::new(10, 0, 0, 7);
        let job = ScanJob::new(ip, "test");
        let liveness = LivenessResult {
            job,
            alive: true,
            open_ports: vec![161],
        };
        let client = MockSnmpClient::new();
        client.push_error(printfleet_core::Error::SnmpFailure {
            address: ip.to_string(),
            details: "no response".to_string(),
        });
        let config = SnmpConfig::default();
        let saved = SavedDeviceChecker::new(&store, Duration::from_secs(3600));

        let result = detect(liveness, &client, &config, &saved).await;
        assert!(!result.is_printer);
        assert_eq!(printer_id_for(&result).0, PrinterId::for_ip(ip).0);
    }
}
