use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use uuid::Uuid;

use crate::commands::{current_track, lookup_lyrics, LyricsRequest};
use crate::lyrics::LyricsLookup;
use crate::playback::{ExtensionPlayback, PlaybackSession, PlaybackSource, TrackUpdate};
use crate::sync::SyncEvent;

/// Wire envelope shared by requests, replies and broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub message_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub timestamp: u64,
}

impl Envelope {
    pub fn new(message_type: &str, data: serde_json::Value) -> Self {
        Self {
            message_type: message_type.to_string(),
            data,
            timestamp: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenUpdate {
    access_token: String,
}

/// What request handling needs; cloned into every connection task.
#[derive(Clone)]
pub struct ServerContext {
    pub lookup: Arc<dyn LyricsLookup>,
    pub playback: Arc<dyn PlaybackSource>,
    pub session: Arc<PlaybackSession>,
    pub extension: Arc<ExtensionPlayback>,
}

type ClientConnections = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Message>>>>;

pub struct WebSocketServer {
    port: u16,
    pub clients: ClientConnections,
    context: ServerContext,
}

impl WebSocketServer {
    pub fn new(port: u16, context: ServerContext) -> Self {
        Self {
            port,
            clients: Arc::new(Mutex::new(HashMap::new())),
            context,
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let addr = format!("127.0.0.1:{}", self.port);

        match TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!("WebSocket server listening on: {}", addr);
                self.serve(listener).await;
                Ok(())
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                error!("Another instance may be running or the port is taken");
                Err(e.into())
            }
        }
    }

    /// Accepts connections on an already bound listener until it fails.
    pub async fn serve(&self, listener: TcpListener) {
        while let Ok((stream, addr)) = listener.accept().await {
            let clients = Arc::clone(&self.clients);
            let context = self.context.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, clients, context).await {
                    error!("Error handling connection from {}: {}", addr, e);
                }
            });
        }
    }

    pub async fn broadcast(&self, message: Envelope) -> Result<(), String> {
        let mut clients = self.clients.lock().await;
        let message_text = serde_json::to_string(&message).map_err(|e| e.to_string())?;
        let ws_message = Message::Text(message_text);

        if clients.is_empty() {
            debug!("No WebSocket clients connected - {} not sent", message.message_type);
            return Ok(());
        }

        let mut disconnected_clients = Vec::new();
        for (client_id, sender) in clients.iter() {
            if sender.send(ws_message.clone()).is_err() {
                disconnected_clients.push(client_id.clone());
            }
        }

        for client_id in disconnected_clients {
            clients.remove(&client_id);
            warn!("Removed disconnected client: {}", client_id);
        }

        debug!(
            "Broadcast {} to {} clients",
            message.message_type,
            clients.len()
        );
        Ok(())
    }

    pub async fn broadcast_sync_event(&self, event: SyncEvent) -> Result<(), String> {
        self.broadcast(sync_event_envelope(&event)?).await
    }
}

fn sync_event_envelope(event: &SyncEvent) -> Result<Envelope, String> {
    let envelope = match event {
        SyncEvent::TrackChanged(track) => Envelope::new(
            "TRACK_CHANGED",
            serde_json::to_value(track).map_err(|e| e.to_string())?,
        ),
        SyncEvent::LyricsLoaded(loaded) => Envelope::new(
            "LYRICS_LOADED",
            serde_json::json!({
                "trackId": loaded.track_id,
                "parsed": loaded.transcript.as_ref(),
            }),
        ),
        SyncEvent::LyricsMissing { track_id } => {
            Envelope::new("LYRICS_MISSING", serde_json::json!({ "trackId": track_id }))
        }
        SyncEvent::LineActivated { track_id, line } => Envelope::new(
            "LINE_ACTIVE",
            serde_json::json!({
                "trackId": track_id,
                "index": line.index,
                "offsetMs": line.offset_ms,
                "text": line.text,
            }),
        ),
    };
    Ok(envelope)
}

fn reply(sender: &mpsc::UnboundedSender<Message>, envelope: Envelope) {
    match serde_json::to_string(&envelope) {
        Ok(text) => {
            let _ = sender.send(Message::Text(text));
        }
        Err(e) => error!("Failed to serialize {}: {}", envelope.message_type, e),
    }
}

fn request_id(data: &serde_json::Value) -> serde_json::Value {
    data.get("requestId")
        .cloned()
        .unwrap_or(serde_json::Value::Null)
}

async fn handle_connection(
    raw_stream: TcpStream,
    addr: SocketAddr,
    clients: ClientConnections,
    context: ServerContext,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = accept_async(raw_stream).await?;
    let client_id = Uuid::new_v4().to_string();

    info!("New WebSocket connection: {} with ID: {}", addr, client_id);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let welcome = Envelope::new(
        "connected",
        serde_json::json!({
            "client_id": client_id,
            "status": "ready"
        }),
    );
    ws_sender
        .send(Message::Text(serde_json::to_string(&welcome)?))
        .await?;

    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let mut clients_guard = clients.lock().await;
        clients_guard.insert(client_id.clone(), tx.clone());
        info!(
            "Client {} added to connections. Total clients: {}",
            client_id,
            clients_guard.len()
        );
    }

    let client_id_for_sender = client_id.clone();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                error!(
                    "Failed to send message to client {}: {}",
                    client_id_for_sender, e
                );
                break;
            }
        }
        debug!(
            "Message forwarding task ended for client {}",
            client_id_for_sender
        );
    });

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Connection to client {} failed: {}", client_id, e);
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) => dispatch(envelope, &context, &tx).await,
                Err(_) => warn!("Failed to parse message: {}", text),
            },
            Message::Binary(_) => {
                debug!("Received binary message (not supported)");
            }
            Message::Close(_) => {
                info!("Client {} disconnected", client_id);
                break;
            }
            _ => {}
        }
    }

    {
        let mut clients_guard = clients.lock().await;
        clients_guard.remove(&client_id);
        info!(
            "Client {} disconnected and removed. Total clients: {}",
            client_id,
            clients_guard.len()
        );
    }

    Ok(())
}

/// Slow requests run on their own task so one lookup never holds up the
/// rest of the connection.
async fn dispatch(
    envelope: Envelope,
    context: &ServerContext,
    tx: &mpsc::UnboundedSender<Message>,
) {
    match envelope.message_type.as_str() {
        "LYRICS_REQUEST" => match serde_json::from_value::<LyricsRequest>(envelope.data.clone()) {
            Ok(request) => {
                let lookup = Arc::clone(&context.lookup);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = lookup_lyrics(lookup.as_ref(), request).await;
                    match serde_json::to_value(&response) {
                        Ok(data) => reply(&tx, Envelope::new("LYRICS_RESPONSE", data)),
                        Err(e) => error!("Failed to serialize lyrics response: {}", e),
                    }
                });
            }
            Err(e) => {
                warn!("Malformed LYRICS_REQUEST: {}", e);
                reply(
                    tx,
                    Envelope::new(
                        "LYRICS_RESPONSE",
                        serde_json::json!({
                            "requestId": request_id(&envelope.data),
                            "status": 400,
                            "error": "trackName and artistName are required",
                        }),
                    ),
                );
            }
        },
        "CURRENT_TRACK_REQUEST" => {
            let playback = Arc::clone(&context.playback);
            let tx = tx.clone();
            let id = request_id(&envelope.data);
            tokio::spawn(async move {
                let track = current_track(playback.as_ref()).await;
                reply(
                    &tx,
                    Envelope::new(
                        "CURRENT_TRACK",
                        serde_json::json!({ "requestId": id, "track": track }),
                    ),
                );
            });
        }
        "SET_ACCESS_TOKEN" => match serde_json::from_value::<TokenUpdate>(envelope.data) {
            Ok(update) => {
                context.session.replace_token(update.access_token).await;
                info!("Playback access token replaced");
            }
            Err(e) => warn!("Malformed SET_ACCESS_TOKEN: {}", e),
        },
        "TRACK_DETECTED" | "TRACK_PAUSED" | "TRACK_STOPPED" | "TRACK_PROGRESS" => {
            match serde_json::from_value::<TrackUpdate>(envelope.data.clone()) {
                Ok(update) => context.extension.apply(&envelope.message_type, update).await,
                Err(_) => error!("Failed to parse TrackUpdate from: {}", envelope.data),
            }
        }
        "ping" => reply(tx, Envelope::new("pong", serde_json::json!({}))),
        other => debug!("Unknown message type: {}", other),
    }
}
