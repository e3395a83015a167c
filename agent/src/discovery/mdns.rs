use std::net::Ipv4Addr;
use std::str::FromStr;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::mpsc;
use tracing::warn;

use printfleet_core::targets;
use printfleet_core::Error;

const SERVICE_TYPES: [&str; 3] = ["_ipp._tcp.local.", "_ipps._tcp.local.", "_printer._tcp.local."];

/// Browses mDNS/DNS-SD for IPP/IPPS/LPR service advertisements. Each
/// resolved service's first IPv4 address is forwarded; the service type
/// itself is enough evidence to treat the host as a printer candidate
/// without waiting for SNMP confirmation.
pub async fn browse(tx: mpsc::Sender<Ipv4Addr>) -> Result<(), Error> {
    let daemon = ServiceDaemon::new().map_err(|error| Error::DiscoveryTransient {
        source_name: "mdns".to_string(),
        details: error.to_string(),
    })?;

    for service_type in SERVICE_TYPES {
        let receiver = daemon
            .browse(service_type)
            .map_err(|error| Error::DiscoveryTransient {
                source_name: "mdns".to_string(),
                details: error.to_string(),
            })?;
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                if let ServiceEvent::ServiceResolved(info) = event {
                    for addr in info.get_addresses() {
                        if let Ok(ip) = Ipv4Addr::from_str(&addr.to_string()) {
                            if tx.send(ip).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    Ok(())
}

pub fn log_browse_failure(error: &Error) {
    warn!(target: targets::DISCOVERY, error = %error, "mdns browse failed");
}
