use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use printfleet_core::targets;

const LLMNR_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 252);
const LLMNR_PORT: u16 = 5355;
const RECV_TIMEOUT: Duration = Duration::from_millis(500);

/// LLMNR is a last-resort source: it only confirms a host is present and
/// answering to its own name, it says nothing about the service it runs.
/// We record the responder's address and let Liveness/Detection decide.
pub struct LlmnrDiscovery {
    running: Arc<AtomicBool>,
}

impl LlmnrDiscovery {
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
                warn!(target: targets::DISCOVERY, error = %error, "llmnr socket setup failed");
                return;
            }
            Err(error) => {
                warn!(target: targets::DISCOVERY, error = %error, "llmnr socket task join error");
                return;
            }
        };

        task::spawn_blocking(move || recv_loop(socket, running, tx));
    }
}

impl Default for LlmnrDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

fn create_multicast_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, LLMNR_PORT).into())?;
    socket.join_multicast_v4(&LLMNR_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)?;
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

fn recv_loop(socket: Socket, running: Arc<AtomicBool>, tx: mpsc::Sender<Ipv4Addr>) {
    let mut buf = [std::mem::MaybeUninit::new(0u8); 2048];
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
                debug!(target: targets::DISCOVERY, error = %error, "llmnr recv error");
            }
        }
    }
}
