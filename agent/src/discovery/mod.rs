pub mod arp;
pub mod llmnr;
pub mod mdns;
pub mod ssdp;
pub mod traps;
pub mod wsd;

use std::net::Ipv4Addr;

use tokio::sync::mpsc;
use tracing::{info, warn};

use printfleet_core::model::{ScanJob, ScanMeta};
use printfleet_core::targets;

/// Fans discovery sources in, deduplicating by IP before a `ScanJob` reaches
/// the Liveness stage. A printer answering both mDNS and SSDP should enter
/// the pipeline once, with both methods recorded for evidence.
pub struct DiscoveryMux {
    seen: std::collections::HashSet<Ipv4Addr>,
}

impl DiscoveryMux {
    pub fn new() -> Self {
        Self {
            seen: std::collections::HashSet::new(),
        }
    }

    pub fn accept(&mut self, ip: Ipv4Addr, source: &str) -> Option<ScanJob> {
        let first_sighting = self.seen.insert(ip);
        if !first_sighting {
            return None;
        }
        let meta = ScanMeta {
            discovery_method_hints: vec![source.to_string()],
            ..Default::default()
        };
        Some(ScanJob::new(ip, source).with_meta(meta))
    }
}

impl Default for DiscoveryMux {
    fn default() -> Self {
        Self::new()
    }
}

/// Launches every configured discovery source and forwards unique hits as
/// `ScanJob`s on `job_tx`. Sources that require privileges the process
/// doesn't have (SNMP traps) log and continue rather than aborting startup.
pub async fn run_discovery(sources: &[String], job_tx: mpsc::Sender<ScanJob>) {
    let (ip_tx, mut ip_rx) = mpsc::channel::<(Ipv4Addr, &'static str)>(256);

    if sources.iter().any(|s| s == "ssdp") {
        let (tx, mut rx) = mpsc::channel(64);
        let discovery = ssdp::SsdpDiscovery::new();
        discovery.start(tx).await;
        let ip_tx = ip_tx.clone();
        tokio::spawn(async move {
            while let Some((ip, _info)) = rx.recv().await {
                if ip_tx.send((ip, "ssdp")).await.is_err() {
                    break;
                }
            }
        });
    }

    if sources.iter().any(|s| s == "wsd") {
        let (tx, mut rx) = mpsc::channel(64);
        let discovery = wsd::WsDiscovery::new();
        discovery.start(tx).await;
        let ip_tx = ip_tx.clone();
        tokio::spawn(async move {
            while let Some(ip) = rx.recv().await {
                if ip_tx.send((ip, "wsd")).await.is_err() {
                    break;
                }
            }
        });
    }

    if sources.iter().any(|s| s == "llmnr") {
        let (tx, mut rx) = mpsc::channel(64);
        let discovery = llmnr::LlmnrDiscovery::new();
        discovery.start(tx).await;
        let ip_tx = ip_tx.clone();
        tokio::spawn(async move {
            while let Some(ip) = rx.recv().await {
                if ip_tx.send((ip, "llmnr")).await.is_err() {
                    break;
                }
            }
        });
    }

    if sources.iter().any(|s| s == "mdns") {
        let (tx, mut rx) = mpsc::channel(64);
        if let Err(error) = mdns::browse(tx).await {
            mdns::log_browse_failure(&error);
        }
        let ip_tx = ip_tx.clone();
        tokio::spawn(async move {
            while let Some(ip) = rx.recv().await {
                if ip_tx.send((ip, "mdns")).await.is_err() {
                    break;
                }
            }
        });
    }

    if sources.iter().any(|s| s == "snmp-trap") {
        let (tx, mut rx) = mpsc::channel(64);
        let listener = traps::TrapListener::new();
        match listener.start(tx).await {
            Ok(()) => {
                let ip_tx = ip_tx.clone();
                tokio::spawn(async move {
                    while let Some(ip) = rx.recv().await {
                        if ip_tx.send((ip, "snmp-trap")).await.is_err() {
                            break;
                        }
                    }
                });
            }
            Err(error) => warn!(target: targets::DISCOVERY, error = %error, "snmp trap listener disabled"),
        }
    }

    if sources.iter().any(|s| s == "arp") {
        match arp::read_arp_table() {
            Ok(entries) => {
                for entry in entries {
                    if !entry.complete {
                        continue;
                    }
                    let _ = ip_tx.send((entry.ip, "arp")).await;
                }
            }
            Err(error) => arp::log_unreadable(&error),
        }
    }

    drop(ip_tx);

    let mut mux = DiscoveryMux::new();
    while let Some((ip, source)) = ip_rx.recv().await {
        if let Some(job) = mux.accept(ip, source) {
            info!(target: targets::DISCOVERY, ip = %ip, source, "discovered candidate");
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
    }
}
