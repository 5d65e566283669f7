use futures_util::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::{non_blank, trim_base_url, SongCatalog};
use crate::error::ProviderError;

/// NetEase Cloud Music public web API, the fallback source.
#[derive(Clone)]
pub struct NeteaseClient {
    client: Client,
    base_url: String,
}

impl NeteaseClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: trim_base_url(base_url),
        }
    }

    async fn get_json(&self, url: &str) -> Result<Value, ProviderError> {
        debug!("Request URL: {}", url);

        let response = self
            .client
            .get(url)
            .header("Referer", "https://music.163.com/")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn search(&self, query: &str) -> Result<Option<u64>, ProviderError> {
        let url = format!(
            "{}/api/search/get/web?s={}&type=1&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );
        let json = self.get_json(&url).await?;
        Ok(first_song_id(&json))
    }

    async fn lyric(&self, song_id: u64) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/api/song/lyric?id={}&lv=1", self.base_url, song_id);
        let json = self.get_json(&url).await?;
        Ok(non_blank(json.pointer("/lrc/lyric").and_then(Value::as_str)))
    }
}

impl SongCatalog for NeteaseClient {
    fn search_song_id<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Option<u64>, ProviderError>> {
        Box::pin(self.search(query))
    }

    fn fetch_lyric(&self, song_id: u64) -> BoxFuture<'_, Result<Option<String>, ProviderError>> {
        Box::pin(self.lyric(song_id))
    }
}

fn first_song_id(json: &Value) -> Option<u64> {
    json.pointer("/result/songs/0/id").and_then(Value::as_u64)
}
