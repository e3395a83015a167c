use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use printfleet_core::targets;

const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default)]
pub struct SsdpInfo {
    pub nt: Option<String>,
    pub usn: Option<String>,
    pub location: Option<String>,
    pub server: Option<String>,
}

impl SsdpInfo {
    pub fn is_printer_like(&self) -> bool {
        let haystack = [&self.nt, &self.usn, &self.server]
            .into_iter()
            .flatten()
            .map(|s| s.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        haystack.contains("printer") || haystack.contains("print")
    }
}

/// Listens for SSDP NOTIFY/M-SEARCH-response traffic on the standard
/// multicast group. Grounded on the join-multicast-then-blocking-recv-loop
/// shape used for discovering LAN devices over SSDP, generalized from a
/// single-vendor match to a generic printer-keyword filter.
pub struct SsdpDiscovery {
    running: Arc<AtomicBool>,
}

impl SsdpDiscovery {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn start(&self, tx: mpsc::Sender<(std::net::Ipv4Addr, SsdpInfo)>) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let socket = match task::spawn_blocking(create_multicast_socket).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(error)) => {
                warn!(target: targets::DISCOVERY, error = %error, "ssdp socket setup failed");
                return;
            }
            Err(error) => {
                warn!(target: targets::DISCOVERY, error = %error, "ssdp socket task join error");
                return;
            }
        };

        task::spawn_blocking(move || recv_loop(socket, running, tx));
    }
}

impl Default for SsdpDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn create_multicast_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SSDP_PORT).into())?;
    socket.join_multicast_v4(&SSDP_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

fn recv_loop(
    socket: Socket,
    running: Arc<AtomicBool>,
    tx: mpsc::Sender<(Ipv4Addr, SsdpInfo)>,
) {
    let mut buf = [std::mem::MaybeUninit::new(0u8); 4096];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((len, addr)) => {
                let bytes: Vec<u8> = buf[..len].iter().map(|b| unsafe { b.assume_init() }).collect();
                let Ok(text) = String::from_utf8(bytes) else {
                    continue;
                };
                let Some(std::net::SocketAddr::V4(addr)) = addr.as_socket() else {
                    continue;
                };
                let info = parse_ssdp_packet(&text);
                if info.is_printer_like() && tx.blocking_send((*addr.ip(), info)).is_err() {
                    break;
                }
            }
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut => {}
            Err(error) => {
                debug!(target: targets::DISCOVERY, error = %error, "ssdp recv error");
            }
        }
    }
}

fn parse_ssdp_packet(text: &str) -> SsdpInfo {
    let mut info = SsdpInfo::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "NT" => info.nt = Some(value),
            "USN" => info.usn = Some(value),
            "LOCATION" => info.location = Some(value),
            "SERVER" => info.server = Some(value),
            _ => {}
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notify_packet() {
        let packet = "NOTIFY * HTTP/1.1\r\nHOST: 239.255.255.250:1900\r\nNT: urn:schemas-upnp-org:device:Printer:1\r\nUSN: uuid:1234::urn:schemas-upnp-org:device:Printer:1\r\nLOCATION: http://10.0.0.5:80/desc.xml\r\nSERVER: Linux/1.0 UPnP/1.0 Printer/1.0\r\n\r\n";
        let info = parse_ssdp_packet(packet);
        assert_eq!(info.location.as_deref(), Some("http://10.0.0.5:80/desc.xml"));
        assert!(info.is_printer_like());
    }

    #[test]
    fn non_printer_packet_is_filtered_out() {
        let packet = "NOTIFY * HTTP/1.1\r\nNT: urn:schemas-upnp-org:device:MediaServer:1\r\nSERVER: Linux UPnP/1.0 DLNA\r\n\r\n";
        let info = parse_ssdp_packet(packet);
        assert!(!info.is_printer_like());
    }
}
