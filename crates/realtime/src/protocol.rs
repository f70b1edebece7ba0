//! Serde wire types for the realtime conversation protocol.
//!
//! Only the subset of the protocol this relay exchanges is modeled; unknown
//! server event types deserialize to [`ServerEvent::Unknown`] and are skipped
//! by the demultiplexer.

use serde::{Deserialize, Serialize};

/// Events sent from this client to the realtime API.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend { audio: String },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: Item },
    #[serde(rename = "response.create")]
    ResponseCreate {},
}

/// The `session` payload of a `session.update` event.
#[derive(Serialize, Debug, Clone, Default)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
}

#[derive(Serialize, Debug, Clone)]
pub struct TranscriptionConfig {
    pub model: String,
}

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    ServerVad,
}

/// Role of a conversation item on the wire.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

/// The `item` payload of a `conversation.item.create` event.
#[derive(Serialize, Debug, Clone)]
pub struct Item {
    #[serde(rename = "type")]
    pub kind: String,
    pub role: WireRole,
    pub content: Vec<ItemContent>,
}

impl Item {
    /// A plain text message item.
    pub fn message(role: WireRole, text: String) -> Self {
        Self {
            kind: "message".to_string(),
            role,
            content: vec![ItemContent {
                kind: "input_text".to_string(),
                text,
            }],
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ItemContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Events received from the realtime API.
#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "response.created")]
    ResponseCreated { response: ResponseMeta },
    #[serde(rename = "response.output_item.added")]
    ResponseOutputItemAdded { item: ItemMeta },
    #[serde(rename = "response.content_part.added")]
    ResponseContentPartAdded {
        item_id: String,
        content_index: usize,
        part: PartMeta,
    },
    #[serde(rename = "response.text.delta")]
    ResponseTextDelta {
        item_id: String,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.text.done")]
    ResponseTextDone {
        item_id: String,
        content_index: usize,
    },
    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta {
        item_id: String,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.audio.done")]
    ResponseAudioDone {
        item_id: String,
        content_index: usize,
    },
    #[serde(rename = "response.audio_transcript.delta")]
    ResponseAudioTranscriptDelta {
        item_id: String,
        content_index: usize,
        delta: String,
    },
    #[serde(rename = "response.audio_transcript.done")]
    ResponseAudioTranscriptDone {
        item_id: String,
        content_index: usize,
    },
    #[serde(rename = "response.content_part.done")]
    ResponseContentPartDone {
        item_id: String,
        content_index: usize,
    },
    #[serde(rename = "response.output_item.done")]
    ResponseOutputItemDone { item: ItemMeta },
    #[serde(rename = "response.done")]
    ResponseDone {},
    #[serde(rename = "input_audio_buffer.speech_started")]
    InputAudioBufferSpeechStarted { item_id: String },
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    InputAudioBufferSpeechStopped {},
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    InputAudioTranscriptionCompleted { item_id: String, transcript: String },
    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    InputAudioTranscriptionFailed { item_id: String },
    #[serde(rename = "error")]
    Error { error: ErrorDetail },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug)]
pub struct ResponseMeta {
    pub id: String,
}

#[derive(Deserialize, Debug)]
pub struct ItemMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Deserialize, Debug)]
pub struct PartMeta {
    #[serde(rename = "type")]
    pub kind: PartKind,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    Text,
    Audio,
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
pub struct ErrorDetail {
    pub message: String,
}
