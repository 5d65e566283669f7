//! Outbound lyric providers.

use futures_util::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;

use crate::error::ProviderError;

mod lrclib;
mod netease;

pub use lrclib::LrcLibClient;
pub use netease::NeteaseClient;

pub const USER_AGENT: &str = concat!("LyricSync/", env!("CARGO_PKG_VERSION"));

/// Shared client for every outbound hop. Without a timeout the transport
/// defaults apply.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client, ProviderError> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Provider that answers a (track, artist) search with a synced transcript.
pub trait SyncedLyricsSearch: Send + Sync {
    fn search_synced<'a>(
        &'a self,
        track_name: &'a str,
        artist_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ProviderError>>;
}

/// Two-step provider: free-text search for a song id, then lyrics by id.
pub trait SongCatalog: Send + Sync {
    fn search_song_id<'a>(&'a self, query: &'a str)
        -> BoxFuture<'a, Result<Option<u64>, ProviderError>>;

    fn fetch_lyric(&self, song_id: u64) -> BoxFuture<'_, Result<Option<String>, ProviderError>>;
}

pub(crate) fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}
