use futures_util::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::{non_blank, trim_base_url, SyncedLyricsSearch};
use crate::error::ProviderError;

/// LRCLIB search API, the primary source.
#[derive(Clone)]
pub struct LrcLibClient {
    client: Client,
    base_url: String,
}

impl LrcLibClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
        }
    }

    async fn search(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<String>, ProviderError> {
        let mut url = format!(
            "{}/api/search?track_name={}",
            self.base_url,
            urlencoding::encode(track_name)
        );

        // Only add artist name if it's not empty
        if !artist_name.trim().is_empty() {
            url.push_str(&format!(
                "&artist_name={}",
                urlencoding::encode(artist_name)
            ));
        }

        debug!("Request URL: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        let results: Vec<Value> = serde_json::from_str(&body)?;
        debug!("Found {} search results", results.len());

        Ok(first_synced(&results))
    }
}

impl SyncedLyricsSearch for LrcLibClient {
    fn search_synced<'a>(
        &'a self,
        track_name: &'a str,
        artist_name: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, ProviderError>> {
        Box::pin(self.search(track_name, artist_name))
    }
}

fn first_synced(results: &[Value]) -> Option<String> {
    results
        .iter()
        .find_map(|item| non_blank(item.get("syncedLyrics").and_then(Value::as_str)))
}
