use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use printfleet_core::model::{PrinterId, QueryResult, ScanJob};
use printfleet_core::snmp::{SnmpClient, SnmpConfig};
use printfleet_core::targets;
use printfleet_core::{touch_or_insert, DeviceStore};

use crate::saved::SavedDeviceChecker;

use super::{deepscan, detection, liveness};

pub struct PipelineConfig {
    pub liveness_ports: Vec<u16>,
    pub liveness_concurrency: usize,
    pub detection_concurrency: usize,
    pub saved_device_max_age: Duration,
}

/// Drives a batch of `ScanJob`s through Liveness -> Detection -> Deep Scan,
/// merging any confirmed record into the store and forwarding it downstream
/// (to the WebSocket layer, in the full agent). The three stages run as
/// sequential batch passes rather than a fully pipelined worker mesh: at
/// agent scale (tens to low hundreds of hosts per sweep) the cost is
/// negligible next to the SNMP round trips themselves.
pub async fn run_batch(
    jobs: Vec<ScanJob>,
    client: Arc<dyn SnmpClient>,
    snmp_config: SnmpConfig,
    store: Arc<dyn DeviceStore>,
    pipeline_config: PipelineConfig,
    result_tx: mpsc::Sender<QueryResult>,
) {
    let liveness_results =
        liveness::sweep_liveness(jobs, &pipeline_config.liveness_ports, pipeline_config.liveness_concurrency)
            .await;

    let alive: Vec<_> = liveness_results.into_iter().filter(|r| r.alive).collect();
    info!(target: targets::PIPELINE, alive = alive.len(), "liveness sweep complete");

    let saved = SavedDeviceChecker::new(store.as_ref(), pipeline_config.saved_device_max_age);
    let mut detection_results = Vec::with_capacity(alive.len());
    for chunk in alive.chunks(pipeline_config.detection_concurrency) {
        for result in chunk {
            let detected = detection::detect(result.clone(), client.as_ref(), &snmp_config, &saved).await;
            detection_results.push(detected);
        }
    }

    let printers: Vec<_> = detection_results.into_iter().filter(|r| r.is_printer).collect();
    info!(target: targets::PIPELINE, printers = printers.len(), "detection stage complete");

    for detection_result in printers {
        if let Some(query_result) = deepscan::deep_scan(detection_result, client.as_ref(), &snmp_config).await {
            let id = PrinterId::for_ip(query_result.job.ip);
            let existing = store.get(&id).ok().flatten();
            let now = current_epoch_seconds();
            let merged = touch_or_insert(existing, query_result.record.clone(), now);

            if let Err(error) = store.upsert(merged.clone()) {
                tracing::warn!(target: targets::STORAGE, error = %error, "failed to persist record");
                continue;
            }

            let forwarded = QueryResult {
                job: query_result.job,
                record: merged,
            };
            if result_tx.send(forwarded).await.is_err() {
                break;
            }
        }
    }
}

fn current_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
