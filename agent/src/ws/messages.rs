use serde::{Deserialize, Serialize};

use printfleet_core::model::PrinterRecord;

/// Wire schema for the agent <-> server control channel. Tagged by `type`
/// so the server and agent can add new variants without breaking the other
/// side's deserializer on an unrecognized message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    Hello {
        agent_id: String,
        version: String,
    },
    Heartbeat {
        timestamp: u64,
        device_count: usize,
        status: String,
    },
    DeviceUpdate {
        record: PrinterRecord,
    },
    ProxyResponse {
        request_id: String,
        status: u16,
        headers: Vec<(String, String)>,
        body_base64: String,
    },
    LogSnapshot {
        lines: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    HelloAck {
        agent_id: String,
    },
    ProxyRequest {
        request_id: String,
        method: String,
        url: String,
        headers: Vec<(String, String)>,
        body_base64: Option<String>,
    },
    ConfigUpdate {
        scan_ranges: Vec<String>,
        #[serde(default)]
        log_level: Option<String>,
    },
    RequestLogSnapshot,
    Pong,
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_message_round_trips_through_json() {
        let message = AgentMessage::Heartbeat {
            timestamp: 100,
            device_count: 7,
            status: "ok".to_string(),
        };
        let json = serde_json::to_string(&message).unwrap();
        let decoded: AgentMessage = serde_json::from_str(&json).unwrap();
        match decoded {
            AgentMessage::Heartbeat { timestamp, device_count, status } => {
                assert_eq!(timestamp, 100);
                assert_eq!(device_count, 7);
                assert_eq!(status, "ok");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn server_message_tag_is_snake_case() {
        let json = r#"{"type":"request_log_snapshot"}"#;
        let decoded: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(decoded, ServerMessage::RequestLogSnapshot));
    }

    #[test]
    fn server_can_send_a_bare_pong_or_an_error_frame() {
        let pong: ServerMessage = serde_json::from_str(r#"{"type":"pong"}"#).unwrap();
        assert!(matches!(pong, ServerMessage::Pong));

        let error: ServerMessage =
            serde_json::from_str(r#"{"type":"error","message":"unauthorized"}"#).unwrap();
        match error {
            ServerMessage::Error { message } => assert_eq!(message, "unauthorized"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
