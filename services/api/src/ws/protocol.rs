//! Defines the WebSocket message protocol between the browser client and the API server.
//!
//! Binary frames carry raw PCM audio in both directions and are not modeled
//! here; these enums cover the JSON text frames only.

use serde::{Deserialize, Serialize};

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A typed text message from the visitor.
    UserMessage {
        #[serde(default)]
        id: Option<String>,
        text: String,
    },
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// One incremental chunk of assistant text, keyed by item and content index.
    TextDelta { id: String, delta: String },
    /// The final transcription of a stretch of visitor speech.
    Transcription { id: String, text: String },
    /// A control signal; the payload depends on `action`.
    Control {
        action: ControlAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        greeting: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Connected,
    SpeechStarted,
    TextDone,
}

impl ServerMessage {
    pub fn connected(greeting: String) -> Self {
        Self::Control {
            action: ControlAction::Connected,
            greeting: Some(greeting),
            id: None,
        }
    }

    pub fn speech_started() -> Self {
        Self::Control {
            action: ControlAction::SpeechStarted,
            greeting: None,
            id: None,
        }
    }

    pub fn text_done(id: String) -> Self {
        Self::Control {
            action: ControlAction::TextDone,
            greeting: None,
            id: Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_deserializes() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"id":"m1","type":"user_message","text":"hello"}"#).unwrap();
        let ClientMessage::UserMessage { id, text } = msg;
        assert_eq!(id.as_deref(), Some("m1"));
        assert_eq!(text, "hello");
    }

    #[test]
    fn user_message_id_is_optional() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"user_message","text":"hello"}"#).unwrap();
        let ClientMessage::UserMessage { id, .. } = msg;
        assert!(id.is_none());
    }

    #[test]
    fn unknown_client_message_type_is_an_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"mystery","text":"hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn connected_control_serializes_with_greeting() {
        let json =
            serde_json::to_string(&ServerMessage::connected("Welcome!".to_string())).unwrap();
        assert_eq!(
            json,
            r#"{"type":"control","action":"connected","greeting":"Welcome!"}"#
        );
    }

    #[test]
    fn speech_started_control_has_no_extras() {
        let json = serde_json::to_string(&ServerMessage::speech_started()).unwrap();
        assert_eq!(json, r#"{"type":"control","action":"speech_started"}"#);
    }

    #[test]
    fn text_done_control_carries_the_composite_id() {
        let json = serde_json::to_string(&ServerMessage::text_done("item_1-0".to_string())).unwrap();
        assert_eq!(
            json,
            r#"{"type":"control","action":"text_done","id":"item_1-0"}"#
        );
    }

    #[test]
    fn text_delta_serializes() {
        let json = serde_json::to_string(&ServerMessage::TextDelta {
            id: "item_1-0".to_string(),
            delta: "Hel".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"text_delta","id":"item_1-0","delta":"Hel"}"#);
    }

    #[test]
    fn transcription_serializes() {
        let json = serde_json::to_string(&ServerMessage::Transcription {
            id: "item_9".to_string(),
            text: "tell me more".to_string(),
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"transcription","id":"item_9","text":"tell me more"}"#
        );
    }
}
