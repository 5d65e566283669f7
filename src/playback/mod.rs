//! Sources of "what is playing right now".

use futures_util::future::BoxFuture;
use tokio::sync::RwLock;

use crate::types::CurrentTrack;

mod extension;
mod spotify;

pub use extension::{ExtensionPlayback, TrackUpdate};
pub use spotify::SpotifyPlayer;

/// Every failure (no session, provider error, nothing playing) collapses
/// to `None`.
pub trait PlaybackSource: Send + Sync {
    fn current(&self) -> BoxFuture<'_, Option<CurrentTrack>>;
}

/// Authorization context for the playback provider.
///
/// Obtaining and refreshing the token belongs to the auth flow, which hands
/// new tokens over through [`PlaybackSession::replace_token`].
#[derive(Debug, Default)]
pub struct PlaybackSession {
    access_token: RwLock<Option<String>>,
}

impl PlaybackSession {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            access_token: RwLock::new(access_token.filter(|token| !token.trim().is_empty())),
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub async fn replace_token(&self, token: String) {
        let mut guard = self.access_token.write().await;
        *guard = Some(token).filter(|token| !token.trim().is_empty());
    }

    pub async fn clear_token(&self) {
        *self.access_token.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_token_lifecycle() {
        let session = PlaybackSession::new(Some("  ".to_string()));
        assert_eq!(session.access_token().await, None);

        session.replace_token("abc".to_string()).await;
        assert_eq!(session.access_token().await.as_deref(), Some("abc"));

        session.clear_token().await;
        assert_eq!(session.access_token().await, None);
    }
}
