use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use printfleet_core::targets;

const WSD_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const WSD_PORT: u16 = 3702;
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// WS-Discovery Hello/ProbeMatch messages carry a `wsdp:Types` element; we
/// only care whether it mentions a print service, not full SOAP parsing.
pub fn is_print_service(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("printdeviceype") || lower.contains("printservicetype") || lower.contains("printer")
}

pub struct WsDiscovery {
    running: Arc<AtomicBool>,
}

impl WsDiscovery {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn start(&self, tx: mpsc::Sender<Ipv4Addr>) {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let socket = match task::spawn_blocking(create_multicast_socket).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(error)) => {
                warn!(target: targets::DISCOVERY, error = %error, "wsd socket setup failed");
                return;
            }
            Err(error) => {
                warn!(target: targets::DISCOVERY, error = %error, "wsd socket task join error");
                return;
            }
        };

        task::spawn_blocking(move || recv_loop(socket, running, tx));
    }
}

impl Default for WsDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn create_multicast_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, WSD_PORT).into())?;
    socket.join_multicast_v4(&WSD_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

fn recv_loop(socket: Socket, running: Arc<AtomicBool>, tx: mpsc::Sender<Ipv4Addr>) {
    let mut buf = [std::mem::MaybeUninit::new(0u8); 8192];
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
                if is_print_service(&text) && tx.blocking_send(*addr.ip()).is_err() {
                    break;
                }
            }
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut => {}
            Err(error) => {
                debug!(target: targets::DISCOVERY, error = %error, "wsd recv error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_print_service_type() {
        assert!(is_print_service(
            "<d:Types>wprt:PrintDeviceType</d:Types>"
        ));
        assert!(!is_print_service("<d:Types>devprof:Computer</d:Types>"));
    }
}
