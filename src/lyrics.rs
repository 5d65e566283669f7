use futures_util::future::BoxFuture;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::error::LookupError;
use crate::lrc::parse_lrc;
use crate::providers::{SongCatalog, SyncedLyricsSearch};
use crate::romanization::Romanizer;
use crate::types::TimedTranscript;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricSource {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { raw: String, source: LyricSource },
    NotFound,
}

/// Tries the primary provider, then the secondary search + fetch pair.
///
/// Hops run strictly one after another and each is attempted once. A failed
/// hop is logged and counts as "no result"; the secondary provider is never
/// contacted when the primary one already produced a transcript.
pub struct LyricResolver {
    primary: Arc<dyn SyncedLyricsSearch>,
    secondary: Arc<dyn SongCatalog>,
}

impl LyricResolver {
    pub fn new(primary: Arc<dyn SyncedLyricsSearch>, secondary: Arc<dyn SongCatalog>) -> Self {
        Self { primary, secondary }
    }

    pub async fn resolve(&self, track_name: &str, artist_name: &str) -> Resolution {
        info!("Resolving lyrics for: {} by {}", track_name, artist_name);

        match self.primary.search_synced(track_name, artist_name).await {
            Ok(Some(raw)) if is_usable(&raw) => {
                info!("Primary provider returned synced lyrics");
                return Resolution::Found {
                    raw,
                    source: LyricSource::Primary,
                };
            }
            Ok(_) => debug!("Primary provider had no synced lyrics"),
            Err(e) => warn!("Primary provider failed: {}", e),
        }

        let query = format!("{} {}", track_name, artist_name);
        let song_id = match self.secondary.search_song_id(&query).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("Secondary search found nothing for '{}'", query);
                return Resolution::NotFound;
            }
            Err(e) => {
                warn!("Secondary search failed: {}", e);
                return Resolution::NotFound;
            }
        };

        match self.secondary.fetch_lyric(song_id).await {
            Ok(Some(raw)) if is_usable(&raw) => {
                info!("Secondary provider returned lyrics for song {}", song_id);
                Resolution::Found {
                    raw,
                    source: LyricSource::Secondary,
                }
            }
            Ok(_) => {
                debug!("Secondary provider had no lyrics for song {}", song_id);
                Resolution::NotFound
            }
            Err(e) => {
                warn!("Secondary lyric fetch failed for song {}: {}", song_id, e);
                Resolution::NotFound
            }
        }
    }
}

fn is_usable(raw: &str) -> bool {
    !raw.trim().is_empty()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// May hold zero lines when the transcript had nothing parseable.
    Found(TimedTranscript),
    NotFound,
}

/// Inbound lyric lookup: resolve a raw transcript, then parse and romanize it.
pub trait LyricsLookup: Send + Sync {
    fn lookup<'a>(
        &'a self,
        track_name: &'a str,
        artist_name: &'a str,
    ) -> BoxFuture<'a, Result<LookupOutcome, LookupError>>;
}

pub struct LyricsService {
    resolver: LyricResolver,
    romanizer: Arc<Romanizer>,
}

impl LyricsService {
    pub fn new(resolver: LyricResolver, romanizer: Arc<Romanizer>) -> Self {
        Self {
            resolver,
            romanizer,
        }
    }

    async fn fetch_lyrics(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<LookupOutcome, LookupError> {
        let (raw, source) = match self.resolver.resolve(track_name, artist_name).await {
            Resolution::Found { raw, source } => (raw, source),
            Resolution::NotFound => {
                warn!("No lyrics found for '{}' by '{}'", track_name, artist_name);
                return Ok(LookupOutcome::NotFound);
            }
        };

        // Dictionary lookups are CPU-bound; keep them off the async workers.
        let romanizer = Arc::clone(&self.romanizer);
        let transcript = tokio::task::spawn_blocking(move || parse_lrc(&raw, &romanizer))
            .await
            .map_err(|e| LookupError::Internal(format!("parse task failed: {}", e)))?;

        info!(
            "Parsed {} lines from {:?} provider for '{}'",
            transcript.len(),
            source,
            track_name
        );
        Ok(LookupOutcome::Found(transcript))
    }
}

impl LyricsLookup for LyricsService {
    fn lookup<'a>(
        &'a self,
        track_name: &'a str,
        artist_name: &'a str,
    ) -> BoxFuture<'a, Result<LookupOutcome, LookupError>> {
        Box::pin(self.fetch_lyrics(track_name, artist_name))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ProviderError, RomanizeError};
    use crate::romanization::{JapaneseAnalyzer, Transliterator};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct FakePrimary {
        pub response: Option<String>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl SyncedLyricsSearch for FakePrimary {
        fn search_synced<'a>(
            &'a self,
            _track_name: &'a str,
            _artist_name: &'a str,
        ) -> BoxFuture<'a, Result<Option<String>, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(ProviderError::Status(500))
            } else {
                Ok(self.response.clone())
            };
            Box::pin(async move { result })
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeCatalog {
        pub song_id: Option<u64>,
        pub lyric: Option<String>,
        pub fail_search: bool,
        pub queries: Mutex<Vec<String>>,
        pub fetches: AtomicUsize,
    }

    impl FakeCatalog {
        fn searches(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    impl SongCatalog for FakeCatalog {
        fn search_song_id<'a>(
            &'a self,
            query: &'a str,
        ) -> BoxFuture<'a, Result<Option<u64>, ProviderError>> {
            self.queries.lock().unwrap().push(query.to_string());
            let result = if self.fail_search {
                Err(ProviderError::Status(502))
            } else {
                Ok(self.song_id)
            };
            Box::pin(async move { result })
        }

        fn fetch_lyric(&self, _song_id: u64) -> BoxFuture<'_, Result<Option<String>, ProviderError>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let result = Ok(self.lyric.clone());
            Box::pin(async move { result })
        }
    }

    fn resolver(primary: &Arc<FakePrimary>, secondary: &Arc<FakeCatalog>) -> LyricResolver {
        LyricResolver::new(primary.clone(), secondary.clone())
    }

    #[tokio::test]
    async fn primary_hit_skips_secondary() {
        let primary = Arc::new(FakePrimary {
            response: Some("[00:01.00]hi".to_string()),
            ..Default::default()
        });
        let secondary = Arc::new(FakeCatalog::default());

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;

        assert_eq!(
            resolution,
            Resolution::Found {
                raw: "[00:01.00]hi".to_string(),
                source: LyricSource::Primary
            }
        );
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.searches(), 0);
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_secondary_with_combined_query() {
        let primary = Arc::new(FakePrimary::default());
        let secondary = Arc::new(FakeCatalog {
            song_id: Some(42),
            lyric: Some("[00:02.00]fallback".to_string()),
            ..Default::default()
        });

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;

        assert_eq!(
            resolution,
            Resolution::Found {
                raw: "[00:02.00]fallback".to_string(),
                source: LyricSource::Secondary
            }
        );
        assert_eq!(*secondary.queries.lock().unwrap(), vec!["Song Artist".to_string()]);
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_primary_still_reaches_secondary() {
        let primary = Arc::new(FakePrimary {
            fail: true,
            ..Default::default()
        });
        let secondary = Arc::new(FakeCatalog {
            song_id: Some(7),
            lyric: Some("[00:02.00]fallback".to_string()),
            ..Default::default()
        });

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;
        assert!(matches!(
            resolution,
            Resolution::Found {
                source: LyricSource::Secondary,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn blank_primary_transcript_is_no_result() {
        let primary = Arc::new(FakePrimary {
            response: Some("  \n".to_string()),
            ..Default::default()
        });
        let secondary = Arc::new(FakeCatalog::default());

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(secondary.searches(), 1);
    }

    #[tokio::test]
    async fn nothing_anywhere_is_not_found() {
        let primary = Arc::new(FakePrimary::default());
        let secondary = Arc::new(FakeCatalog::default());

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;

        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.searches(), 1);
        // No id, so no fetch hop.
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_secondary_search_is_not_found() {
        let primary = Arc::new(FakePrimary::default());
        let secondary = Arc::new(FakeCatalog {
            fail_search: true,
            ..Default::default()
        });

        let resolution = resolver(&primary, &secondary).resolve("Song", "Artist").await;
        assert_eq!(resolution, Resolution::NotFound);
        assert_eq!(secondary.fetches.load(Ordering::SeqCst), 0);
    }

    struct Upper;

    impl Transliterator for Upper {
        fn transliterate(&self, text: &str) -> Result<String, RomanizeError> {
            Ok(text.to_uppercase())
        }
    }

    pub(crate) fn test_romanizer() -> Arc<Romanizer> {
        Arc::new(Romanizer::with_engines(
            Arc::new(JapaneseAnalyzer::new(Arc::new(Upper))),
            Box::new(Upper),
            Box::new(Upper),
        ))
    }

    #[tokio::test]
    async fn lookup_parses_the_resolved_transcript() {
        let primary = Arc::new(FakePrimary {
            response: Some("[00:05.00]second\n[00:01.50]first\n[ar:meta]".to_string()),
            ..Default::default()
        });
        let service = LyricsService::new(
            resolver(&primary, &Arc::new(FakeCatalog::default())),
            test_romanizer(),
        );

        let outcome = service.lookup("Song", "Artist").await.unwrap();
        let LookupOutcome::Found(transcript) = outcome else {
            panic!("expected lyrics");
        };
        let offsets: Vec<u64> = transcript.lines().iter().map(|l| l.offset_ms).collect();
        assert_eq!(offsets, vec![1500, 5000]);
    }

    #[tokio::test]
    async fn lookup_reports_not_found() {
        let service = LyricsService::new(
            resolver(&Arc::new(FakePrimary::default()), &Arc::new(FakeCatalog::default())),
            test_romanizer(),
        );

        let outcome = service.lookup("Song", "Artist").await.unwrap();
        assert_eq!(outcome, LookupOutcome::NotFound);
    }

    #[tokio::test]
    async fn unparseable_transcript_is_found_but_empty() {
        let primary = Arc::new(FakePrimary {
            response: Some("just some plain text".to_string()),
            ..Default::default()
        });
        let service = LyricsService::new(
            resolver(&primary, &Arc::new(FakeCatalog::default())),
            test_romanizer(),
        );

        let outcome = service.lookup("Song", "Artist").await.unwrap();
        assert_eq!(outcome, LookupOutcome::Found(TimedTranscript::default()));
    }
}
