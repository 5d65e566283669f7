use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::sync::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackSourceKind {
    Spotify,
    Extension,
}

impl FromStr for PlaybackSourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "spotify" => Ok(PlaybackSourceKind::Spotify),
            "extension" | "browser" => Ok(PlaybackSourceKind::Extension),
            other => Err(format!("unknown playback source '{}'", other)),
        }
    }
}

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ws_port: u16,
    pub lrclib_base_url: String,
    pub netease_base_url: String,
    pub spotify_api_base_url: String,
    pub spotify_access_token: Option<String>,
    pub playback_source: PlaybackSourceKind,
    pub http_timeout: Option<Duration>,
    pub sync: SyncConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ws_port: 8765,
            lrclib_base_url: "https://lrclib.net".to_string(),
            netease_base_url: "https://music.163.com".to_string(),
            spotify_api_base_url: "https://api.spotify.com".to_string(),
            spotify_access_token: None,
            playback_source: PlaybackSourceKind::Spotify,
            http_timeout: None,
            sync: SyncConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let millis = |key: &str, default: Duration| {
            parsed::<u64>(key, text(key))
                .filter(|value| *value > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let playback_source = match text("PLAYBACK_SOURCE") {
            Some(raw) => raw.parse::<PlaybackSourceKind>().unwrap_or_else(|e| {
                warn!("Ignoring PLAYBACK_SOURCE: {}, using spotify", e);
                PlaybackSourceKind::Spotify
            }),
            None => defaults.playback_source,
        };

        Self {
            ws_port: parsed("LYRIC_SYNC_WS_PORT", text("LYRIC_SYNC_WS_PORT"))
                .unwrap_or(defaults.ws_port),
            lrclib_base_url: text("LRCLIB_BASE_URL").unwrap_or(defaults.lrclib_base_url),
            netease_base_url: text("NETEASE_BASE_URL").unwrap_or(defaults.netease_base_url),
            spotify_api_base_url: text("SPOTIFY_API_BASE_URL")
                .unwrap_or(defaults.spotify_api_base_url),
            spotify_access_token: text("SPOTIFY_ACCESS_TOKEN"),
            playback_source,
            http_timeout: parsed::<u64>("HTTP_TIMEOUT_SECS", text("HTTP_TIMEOUT_SECS"))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            sync: SyncConfig {
                poll_interval: millis("POLL_INTERVAL_MS", defaults.sync.poll_interval),
                frame_interval: millis("FRAME_INTERVAL_MS", defaults.sync.frame_interval),
                drift_tolerance: millis("DRIFT_TOLERANCE_MS", defaults.sync.drift_tolerance),
            },
        }
    }
}

fn parsed<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring malformed {}='{}'", key, raw);
            None
        }
    }
}
