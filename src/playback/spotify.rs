use futures_util::future::BoxFuture;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use super::{PlaybackSession, PlaybackSource};
use crate::error::ProviderError;
use crate::providers::trim_base_url;
use crate::types::CurrentTrack;

/// Spotify Web API "currently playing" endpoint.
pub struct SpotifyPlayer {
    client: Client,
    base_url: String,
    session: Arc<PlaybackSession>,
}

impl SpotifyPlayer {
    pub fn new(client: Client, base_url: &str, session: Arc<PlaybackSession>) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
            session,
        }
    }

    pub async fn fetch_current(&self) -> Result<Option<CurrentTrack>, ProviderError> {
        let token = self
            .session
            .access_token()
            .await
            .ok_or(ProviderError::Unauthorized)?;

        let url = format!("{}/v1/me/player/currently-playing", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        // Nothing is playing.
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let json: Value = serde_json::from_str(&body)?;
        Ok(normalize(&json))
    }
}

impl PlaybackSource for SpotifyPlayer {
    fn current(&self) -> BoxFuture<'_, Option<CurrentTrack>> {
        Box::pin(async move {
            match self.fetch_current().await {
                Ok(track) => track,
                Err(ProviderError::Unauthorized) => {
                    debug!("No Spotify session yet");
                    None
                }
                Err(e) => {
                    warn!("Failed to fetch current playback: {}", e);
                    None
                }
            }
        })
    }
}

fn normalize(json: &Value) -> Option<CurrentTrack> {
    let item = json.get("item").filter(|item| !item.is_null())?;

    Some(CurrentTrack {
        id: item.get("id")?.as_str()?.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        artist: item
            .pointer("/artists/0/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        album_art_url: item
            .pointer("/album/images/0/url")
            .and_then(Value::as_str)
            .map(str::to_string),
        progress_ms: json.get("progress_ms").and_then(Value::as_u64).unwrap_or(0),
        is_playing: json.get("is_playing").and_then(Value::as_bool).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn playing_body() -> Value {
        json!({
            "progress_ms": 48213,
            "is_playing": true,
            "item": {
                "id": "4uLU6hMCjMI75M1A2tKUQC",
                "name": "Never Gonna Give You Up",
                "artists": [{ "name": "Rick Astley" }, { "name": "Someone Else" }],
                "album": { "images": [{ "url": "https://i.scdn.co/image/large" }] }
            }
        })
    }

    #[test]
    fn normalizes_currently_playing_payload() {
        let track = normalize(&playing_body()).unwrap();
        assert_eq!(track.id, "4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(track.artist, "Rick Astley");
        assert_eq!(track.album_art_url.as_deref(), Some("https://i.scdn.co/image/large"));
        assert_eq!(track.progress_ms, 48213);
        assert!(track.is_playing);
    }

    #[test]
    fn missing_item_is_no_track() {
        assert_eq!(normalize(&json!({ "is_playing": false, "item": null })), None);
        assert_eq!(normalize(&json!({})), None);
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(playing_body()))
            .expect(1)
            .mount(&server)
            .await;

        let session = Arc::new(PlaybackSession::new(Some("secret".to_string())));
        let player = SpotifyPlayer::new(Client::new(), &server.uri(), session);

        let track = player.current().await.unwrap();
        assert_eq!(track.name, "Never Gonna Give You Up");
    }

    #[tokio::test]
    async fn no_content_means_nothing_playing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let session = Arc::new(PlaybackSession::new(Some("secret".to_string())));
        let player = SpotifyPlayer::new(Client::new(), &server.uri(), session);

        assert_eq!(player.fetch_current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_token_skips_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(playing_body()))
            .expect(0)
            .mount(&server)
            .await;

        let player = SpotifyPlayer::new(
            Client::new(),
            &server.uri(),
            Arc::new(PlaybackSession::default()),
        );

        assert!(matches!(
            player.fetch_current().await,
            Err(ProviderError::Unauthorized)
        ));
        assert_eq!(player.current().await, None);
    }

    #[tokio::test]
    async fn provider_errors_collapse_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = Arc::new(PlaybackSession::new(Some("expired".to_string())));
        let player = SpotifyPlayer::new(Client::new(), &server.uri(), session);

        assert_eq!(player.current().await, None);
    }
}
