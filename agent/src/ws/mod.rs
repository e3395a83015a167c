pub mod messages;
pub mod proxy;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use printfleet_core::targets;
use printfleet_core::{DeviceStore, Error};

use messages::{AgentMessage, ServerMessage};

/// Server sends a ping every `PING_INTERVAL`; a connection that hears
/// nothing back (no frame of any kind) within `READ_DEADLINE` is assumed
/// dead and torn down so `run`'s reconnect loop can pick up a fresh one.
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PING_WRITE_DEADLINE: Duration = Duration::from_secs(10);
const READ_DEADLINE: Duration = Duration::from_secs(60);

/// Owns the persistent authenticated control channel to the server: connect,
/// send Hello, heartbeat on an interval, service proxy requests, and
/// reconnect with exponential backoff on any drop. Runs for the lifetime of
/// the agent process.
pub struct ControlChannel {
    url: String,
    token: String,
    agent_id: String,
    heartbeat_interval: Duration,
    reconnect_delay: Duration,
    max_reconnect_delay: Duration,
    store: Arc<dyn DeviceStore>,
}

impl ControlChannel {
    pub fn new(
        url: String,
        token: String,
        agent_id: String,
        heartbeat_interval: Duration,
        reconnect_delay: Duration,
        max_reconnect_delay: Duration,
        store: Arc<dyn DeviceStore>,
    ) -> Self {
        Self {
            url,
            token,
            agent_id,
            heartbeat_interval,
            reconnect_delay,
            max_reconnect_delay,
            store,
        }
    }

    pub async fn run(
        &self,
        mut outbound_rx: mpsc::Receiver<AgentMessage>,
        inbound_tx: mpsc::Sender<ServerMessage>,
    ) {
        let mut backoff = self.reconnect_delay;

        loop {
            match self.connect_and_serve(&mut outbound_rx, &inbound_tx).await {
                Ok(()) => {
                    info!(target: targets::WS, "control channel closed cleanly");
                    backoff = self.reconnect_delay;
                }
                Err(error) => {
                    warn!(target: targets::WS, error = %error, backoff_ms = backoff.as_millis(), "control channel error, reconnecting");
                }
            }

            sleep(backoff).await;
            backoff = (backoff * 2).min(self.max_reconnect_delay);
        }
    }

    fn request_url(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}token={}", self.url, separator, self.token)
    }

    async fn connect_and_serve(
        &self,
        outbound_rx: &mut mpsc::Receiver<AgentMessage>,
        inbound_tx: &mpsc::Sender<ServerMessage>,
    ) -> Result<(), Error> {
        let request = self
            .request_url()
            .into_client_request()
            .map_err(|error| Error::WebSocketConnect {
                details: error.to_string(),
            })?;

        let (stream, _response) =
            tokio_tungstenite::connect_async(request)
                .await
                .map_err(|error| Error::WebSocketConnect {
                    details: error.to_string(),
                })?;

        let (mut sink, mut source) = stream.split();

        let hello = AgentMessage::Hello {
            agent_id: self.agent_id.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        send_json(&mut sink, &hello).await?;

        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        let mut ping = tokio::time::interval(PING_INTERVAL);
        let mut read_deadline = Box::pin(sleep(READ_DEADLINE));

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let message = self.heartbeat_message();
                    send_json(&mut sink, &message).await?;
                }
                _ = ping.tick() => {
                    tokio::time::timeout(PING_WRITE_DEADLINE, sink.send(Message::Ping(Vec::new())))
                        .await
                        .map_err(|_| Error::WebSocketProtocol { details: "ping write deadline exceeded".to_string() })?
                        .map_err(|error| Error::WebSocketProtocol { details: error.to_string() })?;
                }
                () = &mut read_deadline => {
                    return Err(Error::WebSocketProtocol { details: "no frame received within the read deadline".to_string() });
                }
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(message) => send_json(&mut sink, &message).await?,
                        None => return Ok(()),
                    }
                }
                incoming = source.next() => {
                    read_deadline.as_mut().reset(tokio::time::Instant::now() + READ_DEADLINE);
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ServerMessage>(&text) {
                                Ok(ServerMessage::Pong) => {}
                                Ok(message) => {
                                    if inbound_tx.send(message).await.is_err() {
                                        return Ok(());
                                    }
                                }
                                Err(error) => warn!(target: targets::WS, error = %error, "unparseable server message"),
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(_))) | None => return Ok(()),
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            return Err(Error::WebSocketProtocol { details: error.to_string() });
                        }
                    }
                }
            }
        }
    }

    fn heartbeat_message(&self) -> AgentMessage {
        let device_count = self.store.all().map(|records| records.len()).unwrap_or(0);
        AgentMessage::Heartbeat {
            timestamp: now_epoch_seconds(),
            device_count,
            status: "ok".to_string(),
        }
    }
}

async fn send_json<S>(sink: &mut S, message: &AgentMessage) -> Result<(), Error>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(message).map_err(|error| Error::WebSocketProtocol {
        details: error.to_string(),
    })?;
    sink.send(Message::Text(text))
        .await
        .map_err(|error| Error::WebSocketProtocol {
            details: error.to_string(),
        })
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
    use printfleet_core::store::memory::InMemoryDeviceStore;

    fn channel(reconnect_delay: Duration, max_reconnect_delay: Duration) -> ControlChannel {
        ControlChannel::new(
            "ws://example.invalid/api/v1/agents/ws".to_string(),
            "secret-token".to_string(),
            "agent-1".to_string(),
            Duration::from_secs(30),
            reconnect_delay,
            max_reconnect_delay,
            Arc::new(InMemoryDeviceStore::new()),
        )
    }

    #[test]
    fn backoff_doubles_until_the_cap() {
        let max = Duration::from_secs(60);
        let mut backoff = Duration::from_secs(1);
        for _ in 0..10 {
            backoff = (backoff * 2).min(max);
        }
        assert_eq!(backoff, max);
    }

    #[test]
    fn reconnect_delay_is_configurable_down_to_sub_second_precision() {
        let channel = channel(Duration::from_millis(500), Duration::from_secs(300));
        assert_eq!(channel.reconnect_delay, Duration::from_millis(500));
    }

    #[test]
    fn agent_token_is_carried_as_a_query_parameter_not_a_header() {
        let channel = channel(Duration::from_secs(5), Duration::from_secs(300));
        let url = channel.request_url();
        assert_eq!(url, "ws://example.invalid/api/v1/agents/ws?token=secret-token");
    }

    #[test]
    fn token_query_parameter_is_appended_after_an_existing_query_string() {
        let mut channel = channel(Duration::from_secs(5), Duration::from_secs(300));
        channel.url = "ws://example.invalid/api/v1/agents/ws?debug=1".to_string();
        assert_eq!(
            channel.request_url(),
            "ws://example.invalid/api/v1/agents/ws?debug=1&token=secret-token"
        );
    }

    #[test]
    fn heartbeat_reports_the_stores_device_count() {
        let store = Arc::new(InMemoryDeviceStore::new());
        store
            .upsert(printfleet_core::model::PrinterRecord::new(
                printfleet_core::model::PrinterId::new("printer-1"),
            ))
            .unwrap();
        let channel = ControlChannel::new(
            "ws://example.invalid/api/v1/agents/ws".to_string(),
            "secret-token".to_string(),
            "agent-1".to_string(),
            Duration::from_secs(30),
            Duration::from_secs(5),
            Duration::from_secs(300),
            store,
        );
        match channel.heartbeat_message() {
            AgentMessage::Heartbeat { device_count, status, .. } => {
                assert_eq!(device_count, 1);
                assert_eq!(status, "ok");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
