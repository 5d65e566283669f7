use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod commands;
pub mod config;
pub mod error;
pub mod lrc;
pub mod lyrics;
pub mod playback;
pub mod providers;
pub mod romanization;
pub mod sync;
pub mod types;
pub mod websocket;

use config::{AppConfig, PlaybackSourceKind};
use lyrics::{LyricResolver, LyricsLookup, LyricsService};
use playback::{ExtensionPlayback, PlaybackSession, PlaybackSource, SpotifyPlayer};
use providers::{build_http_client, LrcLibClient, NeteaseClient};
use romanization::Romanizer;
use sync::{SyncEngine, SyncEvent};
use websocket::{ServerContext, WebSocketServer};

pub async fn run() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting lyric sync service...");

    let config = AppConfig::from_env();
    let http = build_http_client(config.http_timeout)?;

    let romanizer = Arc::new(Romanizer::new());
    let analyzer = Arc::clone(romanizer.japanese());
    tokio::spawn(async move {
        analyzer.initialize().await;
    });

    let resolver = LyricResolver::new(
        Arc::new(LrcLibClient::new(http.clone(), &config.lrclib_base_url)),
        Arc::new(NeteaseClient::new(http.clone(), &config.netease_base_url)),
    );
    let lookup: Arc<dyn LyricsLookup> = Arc::new(LyricsService::new(resolver, romanizer));

    let session = Arc::new(PlaybackSession::new(config.spotify_access_token.clone()));
    let extension = Arc::new(ExtensionPlayback::new());
    let playback: Arc<dyn PlaybackSource> = match config.playback_source {
        PlaybackSourceKind::Spotify => {
            if config.spotify_access_token.is_none() {
                warn!("No SPOTIFY_ACCESS_TOKEN set; waiting for SET_ACCESS_TOKEN");
            }
            Arc::new(SpotifyPlayer::new(
                http.clone(),
                &config.spotify_api_base_url,
                Arc::clone(&session),
            ))
        }
        PlaybackSourceKind::Extension => extension.clone(),
    };
    info!("Playback source: {:?}", config.playback_source);

    let server = Arc::new(WebSocketServer::new(
        config.ws_port,
        ServerContext {
            lookup: Arc::clone(&lookup),
            playback: Arc::clone(&playback),
            session,
            extension,
        },
    ));

    let cancel = CancellationToken::new();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SyncEvent>();
    let (poll_handle, frame_handle) =
        SyncEngine::new(playback, lookup, config.sync.clone()).spawn(events_tx, cancel.clone());

    let broadcaster = Arc::clone(&server);
    let broadcast_handle = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if let Err(e) = broadcaster.broadcast_sync_event(event).await {
                error!("Failed to broadcast sync event: {}", e);
            }
        }
    });

    let outcome = tokio::select! {
        result = server.start() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    cancel.cancel();
    let _ = poll_handle.await;
    let _ = frame_handle.await;
    // In-flight lookups may still hold a sender; nothing left to tell anyway.
    broadcast_handle.abort();

    info!("Lyric sync service stopped");
    outcome
}
