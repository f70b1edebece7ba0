//! The conversation-client capability interface and its typed event model.
//!
//! Everything downstream of this crate depends only on these types, never on
//! the wire protocol, so a session can be driven by a fake client in tests.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

/// The lazy stream of top-level events produced by a connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ConversationEvent>> + Send>>;
/// The items of a single response, in arrival order.
pub type ItemStream = Pin<Box<dyn Stream<Item = ResponseItem> + Send>>;
/// The content parts of a single message item.
pub type ContentStream = Pin<Box<dyn Stream<Item = ContentPart> + Send>>;
/// Incremental text deltas for one content part.
pub type TextChunks = Pin<Box<dyn Stream<Item = String> + Send>>;
/// Raw PCM audio chunks for one content part.
pub type AudioChunks = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Session parameters sent upstream once, right after connecting.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub modalities: Vec<String>,
    pub voice: String,
    pub input_audio_format: String,
    pub transcription_model: String,
    /// Enable server-side voice-activity turn detection.
    pub server_vad: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            modalities: vec!["text".to_string(), "audio".to_string()],
            voice: "alloy".to_string(),
            input_audio_format: "pcm16".to_string(),
            transcription_model: "whisper-1".to_string(),
            server_vad: true,
        }
    }
}

/// Role of a conversation item created by this side of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRole {
    System,
    User,
    Assistant,
}

/// A text item appended to the upstream conversation.
#[derive(Debug, Clone)]
pub struct ConversationItem {
    pub role: ItemRole,
    pub text: String,
}

impl ConversationItem {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ItemRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ItemRole::User,
            text: text.into(),
        }
    }
}

/// A top-level event from the upstream connection.
pub enum ConversationEvent {
    /// The model started producing a response.
    Response(ResponseEvent),
    /// The server detected speech in the input audio buffer.
    InputAudio(InputAudioItem),
}

/// One model response; its items arrive lazily on `items`.
pub struct ResponseEvent {
    pub id: String,
    pub items: ItemStream,
}

/// One output item of a response.
pub enum ResponseItem {
    Message(MessageItem),
    /// An item type this relay does not handle (function calls and the like).
    Other { id: String },
}

/// A message item; its content parts arrive lazily on `content`.
pub struct MessageItem {
    pub id: String,
    pub content: ContentStream,
}

/// One content part of a message item.
pub enum ContentPart {
    Text(TextContent),
    Audio(AudioContent),
}

/// Streaming text content.
pub struct TextContent {
    pub content_index: usize,
    pub chunks: TextChunks,
}

/// Streaming audio content with its side-channel transcript.
pub struct AudioContent {
    pub content_index: usize,
    pub audio: AudioChunks,
    pub transcript: TextChunks,
}

/// A detected stretch of user speech, resolvable to its final transcription.
pub struct InputAudioItem {
    pub id: String,
    pub(crate) completion: oneshot::Receiver<Option<String>>,
}

impl InputAudioItem {
    /// Construct an item whose completion is driven by the given receiver.
    ///
    /// The wire client wires this to the transcription events of the
    /// protocol; tests can complete it by hand.
    pub fn new(id: String, completion: oneshot::Receiver<Option<String>>) -> Self {
        Self { id, completion }
    }

    /// Waits for the upstream transcription of this speech segment.
    ///
    /// Resolves to `None` when transcription failed or the connection went
    /// away before a transcript was produced.
    pub async fn wait_for_completion(self) -> Result<Option<String>> {
        Ok(self.completion.await.unwrap_or(None))
    }
}

/// Abstract capability interface over a realtime conversation connection.
///
/// `events` has single-consumer semantics: the first call takes the event
/// stream, later calls yield an already-terminated stream. The stream ends
/// when the connection closes; `close` is the only cancellation mechanism.
#[async_trait]
pub trait ConversationClient: Send + Sync {
    /// Sends the session configuration upstream.
    async fn configure(&self, options: SessionOptions) -> Result<()>;

    /// Appends a text item to the upstream conversation.
    async fn send_item(&self, item: ConversationItem) -> Result<()>;

    /// Appends raw audio bytes to the upstream input audio buffer.
    async fn send_audio(&self, audio: Bytes) -> Result<()>;

    /// Asks the model to generate a response from the conversation so far.
    async fn generate_response(&self) -> Result<()>;

    /// Takes the stream of upstream events for this connection.
    fn events(&self) -> EventStream;

    /// Closes the upstream connection, terminating the event stream.
    async fn close(&self) -> Result<()>;
}

/// Factory for per-session conversation clients.
///
/// The service holds one connector chosen by configuration; each WebSocket
/// session asks it for a fresh upstream connection.
#[async_trait]
pub trait ClientConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ConversationClient>>;
}
