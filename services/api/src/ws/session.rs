//! Manages the WebSocket relay between a gallery visitor and the realtime API.
//!
//! Each connection owns one upstream conversation client. Two tasks run per
//! session: the reactive loop over socket frames (audio and typed messages
//! going upstream) and the proactive loop over upstream events (responses and
//! transcriptions coming back down). Both only write to the outbound socket
//! sink, which serializes their output naturally.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{
    config::{Backend, Config},
    enrichment,
    state::AppState,
};
use anyhow::{Context, Result};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use lapidarium_realtime::{
    AudioContent, ClientConnector, ContentPart, ConversationClient, ConversationEvent,
    ConversationItem, InputAudioItem, MessageItem, RealtimeClient, ResponseEvent, ResponseItem,
    SessionOptions, TextContent,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{Instrument, debug, error, info, instrument, warn};
use uuid::Uuid;

type SharedSink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Connects to whichever realtime backend the configuration selects.
pub struct BackendConnector {
    config: Arc<Config>,
}

impl BackendConnector {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ClientConnector for BackendConnector {
    async fn connect(&self) -> Result<Arc<dyn ConversationClient>> {
        let client = match self.config.backend {
            Backend::OpenAI => {
                let api_key = self
                    .config
                    .openai_api_key
                    .as_ref()
                    .context("OpenAI API key not configured")?;
                RealtimeClient::connect_openai(api_key, &self.config.openai_realtime_model).await?
            }
            Backend::Azure => {
                let api_key = self
                    .config
                    .azure_api_key
                    .as_ref()
                    .context("Azure OpenAI API key not configured")?;
                let endpoint = self
                    .config
                    .azure_endpoint
                    .as_ref()
                    .context("Azure OpenAI endpoint not configured")?;
                let deployment = self
                    .config
                    .azure_deployment
                    .as_ref()
                    .context("Azure OpenAI deployment not configured")?;
                RealtimeClient::connect_azure(api_key, endpoint, deployment).await?
            }
        };
        Ok(Arc::new(client))
    }
}

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
#[instrument(name = "realtime_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string());
    info!("New realtime session");

    let client = match state.connector.connect().await {
        Ok(client) => client,
        Err(e) => {
            error!(error = ?e, "Failed to connect to the realtime backend");
            return;
        }
    };

    if let Err(e) = run_session(socket, &state, client).await {
        error!(error = ?e, "Session terminated with error");
    }
    info!("Realtime session finished");
}

/// Runs one session from configuration to teardown.
async fn run_session(
    socket: WebSocket,
    state: &AppState,
    client: Arc<dyn ConversationClient>,
) -> Result<()> {
    client
        .configure(SessionOptions {
            modalities: vec!["text".to_string(), "audio".to_string()],
            voice: state.config.voice.clone(),
            input_audio_format: "pcm16".to_string(),
            transcription_model: state.config.transcription_model.clone(),
            server_vad: true,
        })
        .await
        .context("Failed to configure the realtime session")?;

    let (socket_tx, socket_rx) = socket.split();
    let socket_tx: SharedSink = Arc::new(Mutex::new(socket_tx));

    send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::connected(state.prompts.greeting.clone()),
    )
    .await
    .context("Failed to send the greeting")?;

    for instruction in state.prompts.instructions() {
        client
            .send_item(ConversationItem::system(instruction))
            .await
            .context("Failed to seed the conversation instructions")?;
    }

    let event_task = tokio::spawn(
        {
            let client = client.clone();
            let socket_tx = socket_tx.clone();
            async move {
                if let Err(e) = run_event_loop(client, socket_tx).await {
                    error!(error = ?e, "Upstream event consumption ended");
                }
            }
        }
        .in_current_span(),
    );

    run_reactive_loop(socket_rx, state, client.as_ref()).await;

    info!("Client disconnected. Closing the upstream connection");
    if let Err(e) = client.close().await {
        warn!(error = ?e, "Failed to close the upstream connection");
        event_task.abort();
    } else {
        // A successful close terminates the upstream event stream, which in
        // turn ends the event task.
        let _ = event_task.await;
    }
    Ok(())
}

/// Forwards client socket frames upstream until the socket closes.
///
/// Per-frame failures are logged and absorbed so one bad message never takes
/// the session down.
async fn run_reactive_loop(
    mut socket_rx: SplitStream<WebSocket>,
    state: &AppState,
    client: &dyn ConversationClient,
) {
    while let Some(frame) = socket_rx.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Err(e) = handle_text_frame(state, client, &text).await {
                    warn!(error = ?e, "Failed to process a client message");
                }
            }
            Ok(Message::Binary(audio)) => {
                if let Err(e) = client.send_audio(audio).await {
                    warn!(error = ?e, "Failed to forward audio upstream");
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Client sent a close frame");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                warn!(error = ?e, "Error receiving from the client socket");
                break;
            }
        }
    }
}

/// Decodes a text frame and, for user messages, forwards it upstream with any
/// enrichment context injected first.
async fn handle_text_frame(
    state: &AppState,
    client: &dyn ConversationClient,
    text: &str,
) -> Result<()> {
    let message: ClientMessage = serde_json::from_str(text).context("Malformed client message")?;
    match message {
        ClientMessage::UserMessage { id, text } => {
            debug!(message_id = ?id, "User message received");
            if let Some(context) = enrichment::enrich(&state.dataset, &text) {
                client.send_item(ConversationItem::system(context)).await?;
            }
            client.send_item(ConversationItem::user(text)).await?;
            client.generate_response().await?;
        }
    }
    Ok(())
}

/// Consumes the upstream event stream until it ends.
///
/// Per-event handling failures are logged and absorbed; an error on the
/// stream itself is rethrown and ends consumption for this session.
async fn run_event_loop(client: Arc<dyn ConversationClient>, socket_tx: SharedSink) -> Result<()> {
    let mut events = client.events();
    while let Some(event) = events.next().await {
        match event {
            Ok(ConversationEvent::Response(response)) => {
                if let Err(e) = handle_response(response, &socket_tx).await {
                    warn!(error = ?e, "Failed to relay a response");
                }
            }
            Ok(ConversationEvent::InputAudio(item)) => {
                if let Err(e) = handle_input_audio(item, &socket_tx).await {
                    warn!(error = ?e, "Failed to relay an input audio item");
                }
            }
            Err(e) => {
                error!(error = ?e, "Upstream event stream failed");
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Relays one response: every message item, content part by content part.
async fn handle_response(response: ResponseEvent, socket_tx: &SharedSink) -> Result<()> {
    debug!(response_id = %response.id, "Relaying a response");
    let mut items = response.items;
    while let Some(item) = items.next().await {
        match item {
            ResponseItem::Message(message) => handle_message_item(message, socket_tx).await?,
            ResponseItem::Other { id } => debug!(item_id = %id, "Skipping a non-message item"),
        }
    }
    Ok(())
}

async fn handle_message_item(message: MessageItem, socket_tx: &SharedSink) -> Result<()> {
    let item_id = message.id;
    let mut content = message.content;
    while let Some(part) = content.next().await {
        match part {
            ContentPart::Text(text) => handle_text_content(&item_id, text, socket_tx).await?,
            ContentPart::Audio(audio) => handle_audio_content(&item_id, audio, socket_tx).await?,
        }
    }
    Ok(())
}

/// Streams text deltas down to the client, then signals completion.
async fn handle_text_content(
    item_id: &str,
    text: TextContent,
    socket_tx: &SharedSink,
) -> Result<()> {
    let id = format!("{}-{}", item_id, text.content_index);
    let mut chunks = text.chunks;
    while let Some(delta) = chunks.next().await {
        send_msg(
            &mut *socket_tx.lock().await,
            ServerMessage::TextDelta {
                id: id.clone(),
                delta,
            },
        )
        .await?;
    }
    send_msg(&mut *socket_tx.lock().await, ServerMessage::text_done(id)).await?;
    Ok(())
}

/// Forwards audio chunks as binary frames and transcript chunks as text
/// deltas, concurrently; both must finish before the part is done.
async fn handle_audio_content(
    item_id: &str,
    audio: AudioContent,
    socket_tx: &SharedSink,
) -> Result<()> {
    let id = format!("{}-{}", item_id, audio.content_index);

    let forward_audio = async {
        let mut chunks = audio.audio;
        while let Some(chunk) = chunks.next().await {
            socket_tx.lock().await.send(Message::Binary(chunk)).await?;
        }
        Ok::<(), anyhow::Error>(())
    };
    let forward_transcript = async {
        let mut chunks = audio.transcript;
        while let Some(delta) = chunks.next().await {
            send_msg(
                &mut *socket_tx.lock().await,
                ServerMessage::TextDelta {
                    id: id.clone(),
                    delta,
                },
            )
            .await?;
        }
        Ok::<(), anyhow::Error>(())
    };
    tokio::try_join!(forward_audio, forward_transcript)?;

    send_msg(&mut *socket_tx.lock().await, ServerMessage::text_done(id)).await?;
    Ok(())
}

/// Announces detected speech immediately, then relays the final
/// transcription once the upstream produces it (empty if it never does).
async fn handle_input_audio(item: InputAudioItem, socket_tx: &SharedSink) -> Result<()> {
    send_msg(&mut *socket_tx.lock().await, ServerMessage::speech_started()).await?;
    let id = item.id.clone();
    let text = item.wait_for_completion().await?.unwrap_or_default();
    send_msg(
        &mut *socket_tx.lock().await,
        ServerMessage::Transcription { id, text },
    )
    .await?;
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
