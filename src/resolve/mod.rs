//! Reconciliation of parsed filenames against the external title database.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

use crate::cache::LookupCache;
use crate::media::{EpisodeCountHint, ParsedMediaInfo};
use crate::source::{ExternalTitleRecord, TitleSource};

/// Chinese season numerals understood in localized titles
static CHINESE_NUMERALS: &[(char, u32)] = &[
    ('一', 1),
    ('二', 2),
    ('三', 3),
    ('四', 4),
    ('五', 5),
    ('六', 6),
    ('七', 7),
    ('八', 8),
    ('九', 9),
    ('十', 10),
];

static SEASON_MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第([一二三四五六七八九十])季").expect("season marker pattern is valid")
});

static SEASON_MARKER_STRIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*第[一二三四五六七八九十]季").expect("season marker pattern is valid")
});

pub fn numeral_value(numeral: char) -> Option<u32> {
    CHINESE_NUMERALS
        .iter()
        .find(|(c, _)| *c == numeral)
        .map(|(_, value)| *value)
}

/// Season number carried by a `第<numeral>季` marker in `title`
pub fn season_from_title(title: &str) -> Option<u32> {
    let caps = SEASON_MARKER_PATTERN.captures(title)?;
    caps[1].chars().next().and_then(numeral_value)
}

/// Remove every `第<numeral>季` marker from `title`
pub fn strip_season_markers(title: &str) -> String {
    SEASON_MARKER_STRIP_PATTERN
        .replace_all(title, "")
        .trim()
        .to_string()
}

/// Query sent to the title source for `info`
pub fn build_query(info: &ParsedMediaInfo) -> String {
    if info.season.is_empty() || info.has_default_season() {
        info.title.clone()
    } else {
        format!("{} Season {}", info.title, info.season)
    }
}

/// Merge an external record into the locally parsed info
pub fn apply_record(info: &mut ParsedMediaInfo, record: &ExternalTitleRecord) {
    info!(
        "Matched '{}' to Bangumi subject {} ({}, {})",
        info.title,
        record.subject_id,
        record.original_title,
        record.air_year.as_deref().unwrap_or("unknown year")
    );

    if info.has_default_season() {
        if let Some(season) = season_from_title(&record.localized_title) {
            info!("Season corrected from title database: Season {}", season);
            info.season = season.to_string();
        }
    }

    let title = strip_season_markers(&record.localized_title);
    if !title.is_empty() {
        info.title = title;
    }

    info.total_episodes_hint = Some(EpisodeCountHint::from_count(record.total_episodes));
}

/// Reconciles parsed filenames with a title source through a shared lookup cache
pub struct Resolver {
    source: Arc<dyn TitleSource>,
    cache: Arc<LookupCache>,
}

impl Resolver {
    pub fn new(source: Arc<dyn TitleSource>, cache: Arc<LookupCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Correct season and title of `info` using the title source
    ///
    /// Lookup failures leave `info` untouched.
    pub async fn resolve(&self, mut info: ParsedMediaInfo) -> ParsedMediaInfo {
        if !info.has_known_title() {
            debug!("Skipping lookup for file without a usable title");
            return info;
        }

        let query = build_query(&info);
        let record = self
            .cache
            .get_or_fetch(&query, || async {
                match self.source.search_and_fetch(&query).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Lookup for '{}' failed: {}", query, e);
                        None
                    }
                }
            })
            .await;

        match record {
            Some(record) => apply_record(&mut info, &record),
            None => debug!("No title record for '{}', keeping parsed metadata", query),
        }

        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct FakeSource {
        records: HashMap<String, ExternalTitleRecord>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_record(query: &str, localized_title: &str, total: Option<u32>) -> Self {
            let mut records = HashMap::new();
            records.insert(
                query.to_string(),
                ExternalTitleRecord {
                    subject_id: 1,
                    localized_title: localized_title.to_string(),
                    original_title: "Original".to_string(),
                    total_episodes: total,
                    air_year: None,
                },
            );
            Self {
                records,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TitleSource for FakeSource {
        async fn search_and_fetch(
            &self,
            query: &str,
        ) -> Result<Option<ExternalTitleRecord>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            if self.fail {
                return Err(SourceError::NotFound(query.to_string()));
            }
            Ok(self.records.get(query).cloned())
        }
    }

    fn info(title: &str, season: &str) -> ParsedMediaInfo {
        ParsedMediaInfo {
            title: title.to_string(),
            season: season.to_string(),
            episode: Some("05".to_string()),
            ..ParsedMediaInfo::default()
        }
    }

    fn resolver(source: Arc<FakeSource>) -> Resolver {
        Resolver::new(source, Arc::new(LookupCache::new()))
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(&info("Show", "1")), "Show");
        assert_eq!(build_query(&info("Show", "3")), "Show Season 3");
    }

    #[test]
    fn test_numeral_table() {
        assert_eq!(numeral_value('一'), Some(1));
        assert_eq!(numeral_value('十'), Some(10));
        assert_eq!(numeral_value('零'), None);
        assert_eq!(season_from_title("某番 第四季"), Some(4));
        assert_eq!(season_from_title("某番 第十一季"), None);
        assert_eq!(season_from_title("某番"), None);
    }

    #[test]
    fn test_strip_season_markers() {
        assert_eq!(strip_season_markers("某番 第二季"), "某番");
        assert_eq!(strip_season_markers("某番第三季 特别篇"), "某番 特别篇");
        assert_eq!(strip_season_markers("某番"), "某番");
    }

    #[tokio::test]
    async fn test_season_correction_and_title_normalization() {
        let source = Arc::new(FakeSource::with_record("Some Show", "某番 第二季", Some(12)));
        let resolver = resolver(source.clone());

        let resolved = resolver.resolve(info("Some Show", "1")).await;

        assert_eq!(resolved.season, "2");
        assert_eq!(resolved.title, "某番");
        assert_eq!(resolved.episode.as_deref(), Some("05"));
        assert_eq!(resolved.total_episodes_hint, Some(EpisodeCountHint::Known(12)));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_explicit_season_is_not_corrected() {
        let source = Arc::new(FakeSource::with_record(
            "Some Show Season 3",
            "某番 第二季",
            None,
        ));
        let resolved = resolver(source).resolve(info("Some Show", "3")).await;

        assert_eq!(resolved.season, "3");
        assert_eq!(resolved.title, "某番");
        assert_eq!(resolved.total_episodes_hint, Some(EpisodeCountHint::Unknown));
    }

    #[tokio::test]
    async fn test_not_found_is_cached_and_leaves_info_unchanged() {
        let source = Arc::new(FakeSource::default());
        let resolver = resolver(source.clone());
        let input = info("Unknown Show", "1");

        let first = resolver.resolve(input.clone()).await;
        let second = resolver.resolve(input.clone()).await;

        assert_eq!(first, input);
        assert_eq!(second, input);
        assert_eq!(source.calls(), 1);
        assert_eq!(resolver.cache().cached("Unknown Show"), Some(None));
    }

    #[tokio::test]
    async fn test_source_errors_degrade_to_no_record() {
        let source = Arc::new(FakeSource {
            fail: true,
            ..FakeSource::default()
        });
        let resolver = resolver(source.clone());
        let input = info("Broken", "2");

        assert_eq!(resolver.resolve(input.clone()).await, input);
        assert_eq!(resolver.resolve(input.clone()).await, input);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_title_is_never_looked_up() {
        let source = Arc::new(FakeSource::default());
        let resolver = resolver(source.clone());

        let input = ParsedMediaInfo::default();
        assert_eq!(resolver.resolve(input.clone()).await, input);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_lookup() {
        let source = Arc::new(FakeSource::with_record("Show", "番剧", Some(24)));
        let resolver = resolver(source.clone());

        let resolved = futures::future::join_all(
            (0..6).map(|_| resolver.resolve(info("Show", "1"))),
        )
        .await;

        assert!(resolved.iter().all(|info| info.title == "番剧"));
        assert_eq!(source.calls(), 1);
    }
}
