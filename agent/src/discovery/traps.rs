use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use printfleet_core::targets;
use printfleet_core::Error;

const TRAP_PORT: u16 = 162;
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// SNMP trap/inform receiver. Binding port 162 requires elevated privileges
/// on most hosts; a bind failure is reported as `DiscoveryPermissionDenied`
/// so the mux can disable this source instead of treating it as a transient
/// network error worth retrying.
pub struct TrapListener {
    running: Arc<AtomicBool>,
}

impl TrapListener {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub async fn start(&self, tx: mpsc::Sender<Ipv4Addr>) -> Result<(), Error> {
        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let socket = task::spawn_blocking(create_socket)
            .await
            .map_err(|error| Error::DiscoveryTransient {
                source_name: "snmp-trap".to_string(),
                details: format!("socket task join error: {error}"),
            })?
            .map_err(|error| Error::DiscoveryPermissionDenied {
                source_name: "snmp-trap".to_string(),
                details: error.to_string(),
            })?;

        task::spawn_blocking(move || recv_loop(socket, running, tx));
        Ok(())
    }
}

impl Default for TrapListener {
    fn default() -> Self {
        Self::new()
    }
}

fn create_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, TRAP_PORT).into())?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

fn recv_loop(socket: Socket, running: Arc<AtomicBool>, tx: mpsc::Sender<Ipv4Addr>) {
    let mut buf = [std::mem::MaybeUninit::new(0u8); 4096];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((_len, addr)) => {
                let Some(std::net::SocketAddr::V4(addr)) = addr.as_socket() else {
                    continue;
                };
                if tx.blocking_send(*addr.ip()).is_err() {
                    break;
                }
            }
            Err(error)
                if error.kind() == std::io::ErrorKind::WouldBlock
                    || error.kind() == std::io::ErrorKind::TimedOut => {}
            Err(error) => {
                debug!(target: targets::DISCOVERY, error = %error, "trap recv error");
            }
        }
    }
}
