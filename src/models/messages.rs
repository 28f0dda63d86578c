use serde::{Deserialize, Serialize};

/// Message sent from the browser to the play socket.
///
/// `message_type` selects the action ("start", "move", "resign",
/// "rematch"); the remaining fields are filled in as the action needs them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClientMessage {
    pub message_type: String,
    pub player_name: Option<String>,
    pub color: Option<String>,
    pub mode: Option<String>,
    pub move_from: Option<String>,
    pub move_to: Option<String>,
    pub promotion: Option<String>,
}

/// A committed move as shown to the client, with the flags that drive
/// sound and highlight cues.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LastMove {
    pub from: String,
    pub to: String,
    pub coord: String,
    pub capture: bool,
    pub check: bool,
}

/// Message sent from the play socket to the browser. One struct for every
/// event type; unused fields stay `None` and are skipped on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ServerMessage {
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_move: Option<LastMove>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub san_moves: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_white: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_black: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_fields_are_omitted_on_the_wire() {
        let message = ServerMessage {
            message_type: "clock".to_string(),
            white_ms: Some(598_000),
            black_ms: Some(600_000),
            ..ServerMessage::default()
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message_type": "clock",
                "white_ms": 598_000,
                "black_ms": 600_000,
            })
        );
    }

    #[test]
    fn client_start_message_parses() {
        let text = r#"{"message_type":"start","player_name":"ada","color":"black","mode":"bullet"}"#;
        let message: ClientMessage = serde_json::from_str(text).unwrap();
        assert_eq!(message.message_type, "start");
        assert_eq!(message.player_name.as_deref(), Some("ada"));
        assert_eq!(message.color.as_deref(), Some("black"));
        assert_eq!(message.mode.as_deref(), Some("bullet"));
        assert!(message.move_from.is_none());
    }
}
