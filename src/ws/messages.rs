//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Server-originated message with a fresh id.
    #[must_use]
    pub fn server(msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self::reply(uuid::Uuid::new_v4().to_string(), msg_type, payload)
    }

    /// Message answering the client request `id`.
    #[must_use]
    pub fn reply(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Error message with a numeric code.
    #[must_use]
    pub fn error(id: String, code: u16, message: &str) -> Self {
        Self::reply(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands that a client can send in a `command` envelope's payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to events for specific generations or projects.
    Subscribe {
        /// Request IDs to subscribe to. Use `["*"]` for all generations.
        #[serde(default)]
        request_ids: Vec<String>,
        /// Projects whose current and future generations are followed.
        #[serde(default)]
        project_ids: Vec<String>,
    },
    /// Unsubscribe from generations or projects.
    Unsubscribe {
        /// Request IDs to unsubscribe from.
        #[serde(default)]
        request_ids: Vec<String>,
        /// Projects to stop following.
        #[serde(default)]
        project_ids: Vec<String>,
    },
    /// Snapshot of one generation, or of all when `request_id` is absent.
    GetStatus {
        /// Generation to report on.
        #[serde(default)]
        request_id: Option<String>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_payload() {
        let Ok(cmd) = serde_json::from_value::<WsCommand>(serde_json::json!({
            "command": "subscribe",
            "request_ids": ["*"]
        })) else {
            panic!("subscribe should parse");
        };
        assert_eq!(
            cmd,
            WsCommand::Subscribe {
                request_ids: vec!["*".to_string()],
                project_ids: vec![],
            }
        );

        let Ok(cmd) = serde_json::from_value::<WsCommand>(serde_json::json!({
            "command": "unsubscribe",
            "project_ids": ["p-1"]
        })) else {
            panic!("unsubscribe should parse");
        };
        assert_eq!(
            cmd,
            WsCommand::Unsubscribe {
                request_ids: vec![],
                project_ids: vec!["p-1".to_string()],
            }
        );

        let Ok(cmd) = serde_json::from_value::<WsCommand>(serde_json::json!({
            "command": "get_status"
        })) else {
            panic!("get_status should parse");
        };
        assert_eq!(cmd, WsCommand::GetStatus { request_id: None });

        assert!(
            serde_json::from_value::<WsCommand>(serde_json::json!({"command": "swap"})).is_err()
        );
    }

    #[test]
    fn envelope_uses_type_key() {
        let msg = WsMessage::error("c-1".to_string(), 404, "unknown command");
        let Ok(json) = serde_json::to_value(&msg) else {
            panic!("serialize failed");
        };
        assert_eq!(json["type"], "error");
        assert_eq!(json["id"], "c-1");
        assert_eq!(json["payload"]["code"], 404);
    }
}
