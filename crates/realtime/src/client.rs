//! `tokio-tungstenite` implementation of [`ConversationClient`].
//!
//! The connection is split into a writer task fed by an outbound channel and
//! a reader task that parses wire events and routes them into the nested
//! stream model of [`crate::types`]. Routing state is keyed by item id and
//! content index, mirroring how the protocol addresses deltas.

use crate::protocol::{
    self, ClientEvent, Item, PartKind, SessionConfig, TranscriptionConfig, TurnDetection, WireRole,
};
use crate::types::{
    AudioContent, ContentPart, ConversationClient, ConversationEvent, ConversationItem,
    EventStream, InputAudioItem, ItemRole, MessageItem, ResponseEvent, ResponseItem,
    SessionOptions, TextContent,
};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, handshake::client::Request, protocol::Message as WsMessage},
};
use tracing::{debug, info, warn};

const AZURE_API_VERSION: &str = "2024-10-01-preview";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

enum Outbound {
    Event(ClientEvent),
    Close,
}

/// A live connection to a realtime conversation endpoint.
pub struct RealtimeClient {
    outbound: mpsc::UnboundedSender<Outbound>,
    events: Mutex<Option<mpsc::Receiver<Result<ConversationEvent>>>>,
}

impl RealtimeClient {
    /// Connects to the OpenAI realtime endpoint.
    pub async fn connect_openai(api_key: &str, model: &str) -> Result<Self> {
        let url = format!("wss://api.openai.com/v1/realtime?model={model}");
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert("Authorization", format!("Bearer {api_key}").parse()?);
        request
            .headers_mut()
            .insert("OpenAI-Beta", "realtime=v1".parse()?);
        Self::connect(request).await
    }

    /// Connects to an Azure OpenAI realtime deployment.
    pub async fn connect_azure(api_key: &str, endpoint: &str, deployment: &str) -> Result<Self> {
        let host = endpoint
            .trim_end_matches('/')
            .trim_start_matches("https://")
            .trim_start_matches("wss://");
        let url = format!(
            "wss://{host}/openai/realtime?api-version={AZURE_API_VERSION}&deployment={deployment}"
        );
        let mut request = url.into_client_request()?;
        request.headers_mut().insert("api-key", api_key.parse()?);
        Self::connect(request).await
    }

    async fn connect(request: Request) -> Result<Self> {
        let (ws_stream, _) = connect_async(request)
            .await
            .context("Failed to connect to the realtime endpoint")?;
        info!("Connected to the realtime API");

        let (ws_tx, ws_rx) = ws_stream.split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel(64);

        tokio::spawn(write_loop(ws_tx, outbound_rx));
        tokio::spawn(read_loop(ws_rx, events_tx));

        Ok(Self {
            outbound: outbound_tx,
            events: Mutex::new(Some(events_rx)),
        })
    }

    fn send_event(&self, event: ClientEvent) -> Result<()> {
        self.outbound
            .send(Outbound::Event(event))
            .map_err(|_| anyhow!("Realtime connection is closed"))
    }
}

#[async_trait]
impl ConversationClient for RealtimeClient {
    async fn configure(&self, options: SessionOptions) -> Result<()> {
        let session = SessionConfig {
            modalities: Some(options.modalities),
            voice: Some(options.voice),
            input_audio_format: Some(options.input_audio_format),
            input_audio_transcription: Some(TranscriptionConfig {
                model: options.transcription_model,
            }),
            turn_detection: options.server_vad.then_some(TurnDetection::ServerVad),
        };
        self.send_event(ClientEvent::SessionUpdate { session })
    }

    async fn send_item(&self, item: ConversationItem) -> Result<()> {
        let role = match item.role {
            ItemRole::System => WireRole::System,
            ItemRole::User => WireRole::User,
            ItemRole::Assistant => WireRole::Assistant,
        };
        self.send_event(ClientEvent::ConversationItemCreate {
            item: Item::message(role, item.text),
        })
    }

    async fn send_audio(&self, audio: Bytes) -> Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&audio);
        self.send_event(ClientEvent::InputAudioBufferAppend { audio: encoded })
    }

    async fn generate_response(&self) -> Result<()> {
        self.send_event(ClientEvent::ResponseCreate {})
    }

    fn events(&self) -> EventStream {
        let receiver = self.events.lock().ok().and_then(|mut slot| slot.take());
        match receiver {
            Some(rx) => Box::pin(ReceiverStream::new(rx)),
            None => {
                warn!("events() called more than once for this connection");
                Box::pin(futures::stream::empty())
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.outbound
            .send(Outbound::Close)
            .map_err(|_| anyhow!("Realtime connection already closed"))
    }
}

/// Serializes outbound events onto the socket until closed.
async fn write_loop(mut ws_tx: WsSink, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Event(event) => {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize a client event");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(WsMessage::Text(text.into())).await {
                    warn!(error = %e, "Failed to write to the realtime socket");
                    break;
                }
            }
            Outbound::Close => {
                let _ = ws_tx.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
}

/// Parses inbound wire events and feeds the router until the socket ends.
///
/// Dropping the router and the event sender is what terminates the nested
/// streams on the consumer side.
async fn read_loop(mut ws_rx: WsSource, events_tx: mpsc::Sender<Result<ConversationEvent>>) {
    let mut router = EventRouter::new(events_tx.clone());
    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<protocol::ServerEvent>(&text)
            {
                Ok(event) => router.route(event).await,
                Err(e) => warn!(error = %e, "Unparseable realtime event"),
            },
            Ok(WsMessage::Close(_)) => {
                debug!("Realtime socket closed by the server");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                let _ = events_tx
                    .send(Err(anyhow::Error::new(e).context("Realtime transport error")))
                    .await;
                break;
            }
        }
    }
}

enum PartChannels {
    Text {
        chunks: mpsc::Sender<String>,
    },
    Audio {
        audio: Option<mpsc::Sender<Bytes>>,
        transcript: Option<mpsc::Sender<String>>,
    },
}

/// Routes flat wire events into the nested per-response stream model.
struct EventRouter {
    events_tx: mpsc::Sender<Result<ConversationEvent>>,
    items_tx: Option<mpsc::Sender<ResponseItem>>,
    content_txs: HashMap<String, mpsc::Sender<ContentPart>>,
    parts: HashMap<(String, usize), PartChannels>,
    transcriptions: HashMap<String, oneshot::Sender<Option<String>>>,
}

impl EventRouter {
    fn new(events_tx: mpsc::Sender<Result<ConversationEvent>>) -> Self {
        Self {
            events_tx,
            items_tx: None,
            content_txs: HashMap::new(),
            parts: HashMap::new(),
            transcriptions: HashMap::new(),
        }
    }

    async fn route(&mut self, event: protocol::ServerEvent) {
        use protocol::ServerEvent::*;
        match event {
            ResponseCreated { response } => {
                let (items_tx, items_rx) = mpsc::channel(32);
                self.items_tx = Some(items_tx);
                let event = ConversationEvent::Response(ResponseEvent {
                    id: response.id,
                    items: Box::pin(ReceiverStream::new(items_rx)),
                });
                let _ = self.events_tx.send(Ok(event)).await;
            }
            ResponseOutputItemAdded { item } => {
                let Some(items_tx) = &self.items_tx else {
                    debug!(item_id = %item.id, "Output item outside of a response");
                    return;
                };
                if item.kind == "message" {
                    let (content_tx, content_rx) = mpsc::channel(32);
                    self.content_txs.insert(item.id.clone(), content_tx);
                    let _ = items_tx
                        .send(ResponseItem::Message(MessageItem {
                            id: item.id,
                            content: Box::pin(ReceiverStream::new(content_rx)),
                        }))
                        .await;
                } else {
                    let _ = items_tx.send(ResponseItem::Other { id: item.id }).await;
                }
            }
            ResponseContentPartAdded {
                item_id,
                content_index,
                part,
            } => {
                let Some(content_tx) = self.content_txs.get(&item_id) else {
                    debug!(%item_id, "Content part for an unknown item");
                    return;
                };
                match part.kind {
                    PartKind::Text => {
                        let (chunks_tx, chunks_rx) = mpsc::channel(256);
                        self.parts
                            .insert((item_id, content_index), PartChannels::Text { chunks: chunks_tx });
                        let _ = content_tx
                            .send(ContentPart::Text(TextContent {
                                content_index,
                                chunks: Box::pin(ReceiverStream::new(chunks_rx)),
                            }))
                            .await;
                    }
                    PartKind::Audio => {
                        let (audio_tx, audio_rx) = mpsc::channel(256);
                        let (transcript_tx, transcript_rx) = mpsc::channel(256);
                        self.parts.insert(
                            (item_id, content_index),
                            PartChannels::Audio {
                                audio: Some(audio_tx),
                                transcript: Some(transcript_tx),
                            },
                        );
                        let _ = content_tx
                            .send(ContentPart::Audio(AudioContent {
                                content_index,
                                audio: Box::pin(ReceiverStream::new(audio_rx)),
                                transcript: Box::pin(ReceiverStream::new(transcript_rx)),
                            }))
                            .await;
                    }
                    PartKind::Other => debug!("Skipping an unsupported content part"),
                }
            }
            ResponseTextDelta {
                item_id,
                content_index,
                delta,
            } => {
                if let Some(PartChannels::Text { chunks }) =
                    self.parts.get(&(item_id, content_index))
                {
                    let _ = chunks.send(delta).await;
                }
            }
            ResponseTextDone {
                item_id,
                content_index,
            } => {
                self.parts.remove(&(item_id, content_index));
            }
            ResponseAudioDelta {
                item_id,
                content_index,
                delta,
            } => {
                let decoded = match base64::engine::general_purpose::STANDARD.decode(&delta) {
                    Ok(bytes) => Bytes::from(bytes),
                    Err(e) => {
                        warn!(error = %e, "Undecodable audio delta");
                        return;
                    }
                };
                if let Some(PartChannels::Audio {
                    audio: Some(audio), ..
                }) = self.parts.get(&(item_id, content_index))
                {
                    let _ = audio.send(decoded).await;
                }
            }
            ResponseAudioDone {
                item_id,
                content_index,
            } => {
                if let Some(PartChannels::Audio { audio, .. }) =
                    self.parts.get_mut(&(item_id, content_index))
                {
                    audio.take();
                }
            }
            ResponseAudioTranscriptDelta {
                item_id,
                content_index,
                delta,
            } => {
                if let Some(PartChannels::Audio {
                    transcript: Some(transcript),
                    ..
                }) = self.parts.get(&(item_id, content_index))
                {
                    let _ = transcript.send(delta).await;
                }
            }
            ResponseAudioTranscriptDone {
                item_id,
                content_index,
            } => {
                if let Some(PartChannels::Audio { transcript, .. }) =
                    self.parts.get_mut(&(item_id, content_index))
                {
                    transcript.take();
                }
            }
            ResponseContentPartDone {
                item_id,
                content_index,
            } => {
                self.parts.remove(&(item_id, content_index));
            }
            ResponseOutputItemDone { item } => {
                self.content_txs.remove(&item.id);
            }
            ResponseDone {} => {
                self.items_tx = None;
            }
            InputAudioBufferSpeechStarted { item_id } => {
                let (completion_tx, completion_rx) = oneshot::channel();
                self.transcriptions.insert(item_id.clone(), completion_tx);
                let event = ConversationEvent::InputAudio(InputAudioItem::new(
                    item_id,
                    completion_rx,
                ));
                let _ = self.events_tx.send(Ok(event)).await;
            }
            InputAudioBufferSpeechStopped {} => {}
            InputAudioTranscriptionCompleted { item_id, transcript } => {
                if let Some(completion) = self.transcriptions.remove(&item_id) {
                    let _ = completion.send(Some(transcript));
                }
            }
            InputAudioTranscriptionFailed { item_id } => {
                if let Some(completion) = self.transcriptions.remove(&item_id) {
                    let _ = completion.send(None);
                }
            }
            Error { error } => {
                warn!(message = %error.message, "Upstream error event");
            }
            Unknown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn server_event(json: &str) -> protocol::ServerEvent {
        serde_json::from_str(json).expect("valid server event")
    }

    async fn routed(events: &[&str]) -> mpsc::Receiver<Result<ConversationEvent>> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let mut router = EventRouter::new(events_tx);
        for event in events {
            router.route(server_event(event)).await;
        }
        events_rx
    }

    #[tokio::test]
    async fn text_response_streams_through_nested_channels() {
        let mut events = routed(&[
            r#"{"type":"response.created","response":{"id":"resp_1"}}"#,
            r#"{"type":"response.output_item.added","item":{"id":"item_1","type":"message"}}"#,
            r#"{"type":"response.content_part.added","item_id":"item_1","content_index":0,"part":{"type":"text"}}"#,
            r#"{"type":"response.text.delta","item_id":"item_1","content_index":0,"delta":"Hel"}"#,
            r#"{"type":"response.text.delta","item_id":"item_1","content_index":0,"delta":"lo"}"#,
            r#"{"type":"response.text.done","item_id":"item_1","content_index":0}"#,
            r#"{"type":"response.output_item.done","item":{"id":"item_1","type":"message"}}"#,
            r#"{"type":"response.done"}"#,
        ])
        .await;

        let ConversationEvent::Response(response) = events.recv().await.unwrap().unwrap() else {
            panic!("expected a response event");
        };
        assert_eq!(response.id, "resp_1");

        let mut items = response.items;
        let ResponseItem::Message(message) = items.next().await.unwrap() else {
            panic!("expected a message item");
        };
        assert_eq!(message.id, "item_1");
        assert!(items.next().await.is_none());

        let mut content = message.content;
        let ContentPart::Text(text) = content.next().await.unwrap() else {
            panic!("expected text content");
        };
        assert_eq!(text.content_index, 0);
        let collected: Vec<String> = text.chunks.collect().await;
        assert_eq!(collected.join(""), "Hello");
        assert!(content.next().await.is_none());
    }

    #[tokio::test]
    async fn audio_part_splits_audio_and_transcript() {
        let audio_b64 = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
        let delta = format!(
            r#"{{"type":"response.audio.delta","item_id":"item_1","content_index":1,"delta":"{audio_b64}"}}"#
        );
        let mut events = routed(&[
            r#"{"type":"response.created","response":{"id":"resp_1"}}"#,
            r#"{"type":"response.output_item.added","item":{"id":"item_1","type":"message"}}"#,
            r#"{"type":"response.content_part.added","item_id":"item_1","content_index":1,"part":{"type":"audio"}}"#,
            &delta,
            r#"{"type":"response.audio_transcript.delta","item_id":"item_1","content_index":1,"delta":"spoken"}"#,
            r#"{"type":"response.audio.done","item_id":"item_1","content_index":1}"#,
            r#"{"type":"response.audio_transcript.done","item_id":"item_1","content_index":1}"#,
            r#"{"type":"response.content_part.done","item_id":"item_1","content_index":1}"#,
            r#"{"type":"response.done"}"#,
        ])
        .await;

        let ConversationEvent::Response(response) = events.recv().await.unwrap().unwrap() else {
            panic!("expected a response event");
        };
        let mut items = response.items;
        let ResponseItem::Message(message) = items.next().await.unwrap() else {
            panic!("expected a message item");
        };
        let mut content = message.content;
        let ContentPart::Audio(audio) = content.next().await.unwrap() else {
            panic!("expected audio content");
        };

        let chunks: Vec<Bytes> = audio.audio.collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(&[1, 2, 3, 4])]);
        let transcript: Vec<String> = audio.transcript.collect().await;
        assert_eq!(transcript, vec!["spoken".to_string()]);
    }

    #[tokio::test]
    async fn speech_started_resolves_to_completed_transcript() {
        let mut events = routed(&[
            r#"{"type":"input_audio_buffer.speech_started","item_id":"item_9","audio_start_ms":120}"#,
            r#"{"type":"conversation.item.input_audio_transcription.completed","item_id":"item_9","transcript":"tell me more"}"#,
        ])
        .await;

        let ConversationEvent::InputAudio(item) = events.recv().await.unwrap().unwrap() else {
            panic!("expected an input audio event");
        };
        assert_eq!(item.id, "item_9");
        let transcript = item.wait_for_completion().await.unwrap();
        assert_eq!(transcript.as_deref(), Some("tell me more"));
    }

    #[tokio::test]
    async fn failed_transcription_resolves_to_none() {
        let mut events = routed(&[
            r#"{"type":"input_audio_buffer.speech_started","item_id":"item_9"}"#,
            r#"{"type":"conversation.item.input_audio_transcription.failed","item_id":"item_9"}"#,
        ])
        .await;

        let ConversationEvent::InputAudio(item) = events.recv().await.unwrap().unwrap() else {
            panic!("expected an input audio event");
        };
        assert_eq!(item.wait_for_completion().await.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_router_resolves_pending_transcription_to_none() {
        let mut events = routed(&[
            r#"{"type":"input_audio_buffer.speech_started","item_id":"item_9"}"#,
        ])
        .await;

        let ConversationEvent::InputAudio(item) = events.recv().await.unwrap().unwrap() else {
            panic!("expected an input audio event");
        };
        // The router (and its pending oneshot senders) is gone by now.
        assert_eq!(item.wait_for_completion().await.unwrap(), None);
    }

    #[tokio::test]
    async fn non_message_items_surface_as_other() {
        let mut events = routed(&[
            r#"{"type":"response.created","response":{"id":"resp_1"}}"#,
            r#"{"type":"response.output_item.added","item":{"id":"call_1","type":"function_call"}}"#,
            r#"{"type":"response.done"}"#,
        ])
        .await;

        let ConversationEvent::Response(response) = events.recv().await.unwrap().unwrap() else {
            panic!("expected a response event");
        };
        let mut items = response.items;
        assert!(matches!(
            items.next().await,
            Some(ResponseItem::Other { id }) if id == "call_1"
        ));
    }
}
