mod config;
mod discovery;
mod logging;
mod metrics;
mod pipeline;
mod saved;
mod ws;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use printfleet_core::model::{QueryResult, ScanJob};
use printfleet_core::snmp::{SnmpClient, SnmpConfig, SnmpV2cClient};
use printfleet_core::store::memory::InMemoryDeviceStore;
use printfleet_core::{parse_ranges, targets, AgentConfig, ConfigSource, DeviceStore};

use crate::config::FileConfigSource;
use crate::logging::{apply_log_level, init_logging, LogLevel};
use crate::pipeline::{run_batch, PipelineConfig};
use crate::ws::messages::{AgentMessage, ServerMessage};
use crate::ws::ControlChannel;

#[tokio::main]
async fn main() {
    let source = FileConfigSource::from_env();
    let config = match source.load() {
        Ok(config) => config,
        Err(error) => {
            eprintln!(
                "failed to load agent config, using defaults: {} ({})",
                error.user_summary(),
                error.technical_detail()
            );
            AgentConfig::default()
        }
    };

    let (log_store, reload_handle) = init_logging(LogLevel::Info, config.log_capacity);

    info!(target: targets::DISCOVERY, "discovery subsystem ready");
    info!(target: targets::SNMP, "snmp subsystem ready");
    info!(target: targets::POLLING, "polling subsystem ready");
    info!(target: targets::STORAGE, "storage subsystem ready");
    info!(target: targets::WS, "control channel subsystem ready");

    let store: Arc<dyn DeviceStore> = Arc::new(InMemoryDeviceStore::new());
    let snmp_config = build_snmp_config(&config);
    let client: Arc<dyn SnmpClient> = Arc::new(SnmpV2cClient::new(snmp_config.clone()));

    let (job_tx, job_rx) = mpsc::channel::<ScanJob>(512);
    let (result_tx, mut result_rx) = mpsc::channel::<QueryResult>(512);
    let (outbound_tx, outbound_rx) = mpsc::channel::<AgentMessage>(256);
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<ServerMessage>(256);

    spawn_discovery(config.discovery_sources.clone(), job_tx.clone());
    spawn_range_scanner(config.clone(), job_tx.clone());
    spawn_batch_runner(config.clone(), client.clone(), snmp_config.clone(), store.clone(), job_rx, result_tx);
    spawn_metrics_collector(config.clone(), client.clone(), snmp_config.clone(), store.clone(), outbound_tx.clone());

    if let (Some(server_url), Some(agent_token)) = (config.server_url.clone(), config.agent_token.clone()) {
        let agent_id = agent_identity();
        let channel = ControlChannel::new(
            server_url,
            agent_token,
            agent_id,
            config.heartbeat_interval(),
            config.ws_reconnect_delay(),
            config.ws_max_reconnect_delay(),
            store.clone(),
        );
        tokio::spawn(async move {
            channel.run(outbound_rx, inbound_tx).await;
        });
    } else {
        info!(target: targets::WS, "no server_url/agent_token configured, control channel disabled");
        drop(outbound_rx);
        drop(inbound_tx);
    }

    let forward_outbound = outbound_tx.clone();
    tokio::spawn(async move {
        while let Some(result) = result_rx.recv().await {
            let message = AgentMessage::DeviceUpdate {
                record: result.record,
            };
            if forward_outbound.send(message).await.is_err() {
                break;
            }
        }
    });

    let proxy_outbound = outbound_tx.clone();
    let log_store_for_inbound = log_store.clone();
    tokio::spawn(async move {
        while let Some(message) = inbound_rx.recv().await {
            match message {
                ServerMessage::HelloAck { agent_id } => {
                    info!(target: targets::WS, agent_id, "server acknowledged hello");
                }
                ServerMessage::ProxyRequest {
                    request_id,
                    method,
                    url,
                    headers,
                    body_base64,
                } => {
                    let response = ws::proxy::execute_proxy_request(request_id, method, url, headers, body_base64).await;
                    if proxy_outbound.send(response).await.is_err() {
                        break;
                    }
                }
                ServerMessage::ConfigUpdate { scan_ranges, log_level } => {
                    info!(target: targets::WS, count = scan_ranges.len(), "received config update (scan ranges not yet applied live)");
                    if let Some(requested) = log_level.as_deref().and_then(LogLevel::parse) {
                        match apply_log_level(&reload_handle, requested) {
                            Ok(()) => info!(target: targets::WS, level = requested.as_str(), "log level updated from server"),
                            Err(error) => warn!(target: targets::WS, error = %error, "failed to apply server-pushed log level"),
                        }
                    }
                }
                ServerMessage::RequestLogSnapshot => {
                    let lines = log_store_for_inbound
                        .snapshot()
                        .into_iter()
                        .map(|entry| entry.format_line())
                        .collect();
                    if proxy_outbound.send(AgentMessage::LogSnapshot { lines }).await.is_err() {
                        break;
                    }
                }
                ServerMessage::Pong => {}
                ServerMessage::Error { message } => {
                    warn!(target: targets::WS, message, "server reported an error");
                }
            }
        }
    });

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(target: targets::POLLING, "shutdown signal received"),
        Err(error) => warn!(target: targets::POLLING, error = %error, "failed to install ctrl-c handler"),
    }
}

fn build_snmp_config(config: &AgentConfig) -> SnmpConfig {
    SnmpConfig {
        version: config.snmp_version,
        community: config.snmp_community.clone(),
        timeout: config.snmp_timeout(),
        retries: config.snmp_retries,
        v3: config.snmp_v3.clone().unwrap_or_default(),
    }
}

fn agent_identity() -> String {
    std::env::var("PRINTFLEET_AGENT_ID").unwrap_or_else(|_| {
        printfleet_core::primary_interface_ip()
            .map(|ip| format!("agent-{ip}"))
            .unwrap_or_else(|| "agent-unknown".to_string())
    })
}

fn spawn_discovery(sources: Vec<String>, job_tx: mpsc::Sender<ScanJob>) {
    tokio::spawn(async move {
        discovery::run_discovery(&sources, job_tx).await;
    });
}

/// Periodically expands `scan_ranges` and feeds every address into the
/// pipeline as a `ScanJob`, independent of the passive discovery mesh. This
/// is what lets an operator point the agent at a subnet with no mDNS/SSDP
/// traffic at all. With no ranges configured, falls back to the local
/// interface's own subnet rather than scanning nothing.
fn spawn_range_scanner(config: AgentConfig, job_tx: mpsc::Sender<ScanJob>) {
    let ranges = if config.scan_ranges.is_empty() {
        match printfleet_core::default_discovery_cidr() {
            Some(cidr) => {
                info!(target: targets::POLLING, cidr, "no scan_ranges configured, defaulting to local subnet");
                vec![cidr]
            }
            None => {
                warn!(target: targets::POLLING, "no scan_ranges configured and no usable local interface found");
                return;
            }
        }
    } else {
        config.scan_ranges.clone()
    };

    tokio::spawn(async move {
        let text = ranges.join("\n");
        let mut interval = tokio::time::interval(config.poll_interval());
        loop {
            interval.tick().await;
            match parse_ranges(&text, config.max_addrs) {
                Ok(expansion) => {
                    info!(target: targets::POLLING, count = expansion.count(), "range scan sweep starting");
                    for ip in expansion.ips {
                        if job_tx.send(ScanJob::new(ip, "range-scan")).await.is_err() {
                            return;
                        }
                    }
                }
                Err(error) => warn!(target: targets::POLLING, error = %error, "range scan configuration invalid"),
            }
        }
    });
}

fn spawn_batch_runner(
    config: AgentConfig,
    client: Arc<dyn SnmpClient>,
    snmp_config: SnmpConfig,
    store: Arc<dyn DeviceStore>,
    mut job_rx: mpsc::Receiver<ScanJob>,
    result_tx: mpsc::Sender<QueryResult>,
) {
    tokio::spawn(async move {
        let mut batch = Vec::new();
        loop {
            let received = tokio::time::timeout(Duration::from_secs(5), job_rx.recv()).await;
            match received {
                Ok(Some(job)) => {
                    batch.push(job);
                    while batch.len() < 256 {
                        match job_rx.try_recv() {
                            Ok(job) => batch.push(job),
                            Err(_) => break,
                        }
                    }
                }
                Ok(None) => break,
                Err(_) => {}
            }

            if batch.is_empty() {
                continue;
            }

            let jobs = std::mem::take(&mut batch);
            let pipeline_config = PipelineConfig {
                liveness_ports: printfleet_core::model::DEFAULT_PRINTER_PORTS.to_vec(),
                liveness_concurrency: config.liveness_concurrency,
                detection_concurrency: config.detection_concurrency,
                saved_device_max_age: config.deep_scan_interval(),
            };
            run_batch(jobs, client.clone(), snmp_config.clone(), store.clone(), pipeline_config, result_tx.clone()).await;
        }
    });
}

/// Runs the Metrics Collector on `poll_interval`: a lightweight targeted
/// poll of every device already in the store, independent of the much more
/// expensive DeepScan pass that only runs again after `deep_scan_interval`
/// (enforced upstream by the Saved-Device Checker).
fn spawn_metrics_collector(
    config: AgentConfig,
    client: Arc<dyn SnmpClient>,
    snmp_config: SnmpConfig,
    store: Arc<dyn DeviceStore>,
    outbound_tx: mpsc::Sender<AgentMessage>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.poll_interval());
        loop {
            interval.tick().await;
            let records = match store.all() {
                Ok(records) => records,
                Err(error) => {
                    warn!(target: targets::METRICS, error = %error, "failed to list devices for metrics poll");
                    continue;
                }
            };

            for mut record in records {
                let now = current_epoch_seconds();
                let Some(snapshot) = metrics::collect(&record, client.as_ref(), &snmp_config, now).await else {
                    continue;
                };

                if let Some(page_count) = snapshot.page_count {
                    record.page_count = Some(page_count);
                }
                for (key, value) in snapshot.toner_levels {
                    record.toner_levels.insert(key, value);
                }
                record.touch_last_seen(now);

                if let Err(error) = store.upsert(record.clone()) {
                    warn!(target: targets::STORAGE, error = %error, "failed to persist metrics snapshot");
                    continue;
                }

                let message = AgentMessage::DeviceUpdate { record };
                if outbound_tx.send(message).await.is_err() {
                    return;
                }
            }
        }
    });
}

fn current_epoch_seconds() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
