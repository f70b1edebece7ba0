//! Client for realtime voice/text conversation APIs.
//!
//! The crate exposes two layers:
//!
//! - `types`: the capability interface the rest of the system programs
//!   against: the [`ConversationClient`] trait plus a typed event model in
//!   which responses, items and content parts arrive as lazy streams.
//! - `protocol`: the serde wire types of the realtime conversation protocol
//!   (`session.update`, `response.*`, `input_audio_buffer.*`, ...).
//! - `client`: [`RealtimeClient`], a `tokio-tungstenite` implementation that
//!   demultiplexes the flat wire events into the nested event model. It can
//!   connect to either the OpenAI realtime endpoint or an Azure OpenAI
//!   deployment.

pub mod client;
pub mod protocol;
pub mod types;

pub use client::RealtimeClient;
pub use types::{
    AudioChunks, AudioContent, ClientConnector, ContentPart, ContentStream, ConversationClient,
    ConversationEvent, ConversationItem, EventStream, InputAudioItem, ItemRole, ItemStream,
    MessageItem, ResponseEvent, ResponseItem, SessionOptions, TextChunks, TextContent,
};
