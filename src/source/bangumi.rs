//! Bangumi (bgm.tv) API client
//!
//! Lookup is a three-step affair: search by keyword, fetch the first hit's
//! subject details, and count main episodes when the subject itself does not
//! report a total.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ExternalTitleRecord, SourceError, TitleSource};

pub const DEFAULT_BASE_URL: &str = "https://api.bgm.tv";
const USER_AGENT: &str = concat!("bgmlink/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Subject type for anime in the search API
const SUBJECT_TYPE_ANIME: &str = "2";

/// Episode type for main (non-special) episodes
const EPISODE_TYPE_MAIN: u32 = 0;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    list: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    name_cn: String,
}

#[derive(Debug, Deserialize)]
struct Subject {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    name_cn: String,
    date: Option<String>,
    #[serde(default)]
    eps: u32,
    #[serde(default)]
    total_episodes: u32,
}

#[derive(Debug, Deserialize)]
struct EpisodePage {
    #[serde(default)]
    data: Vec<EpisodeEntry>,
}

#[derive(Debug, Deserialize)]
struct EpisodeEntry {
    #[serde(rename = "type", default)]
    episode_type: u32,
}

impl Subject {
    fn reported_episodes(&self) -> Option<u32> {
        [self.total_episodes, self.eps].into_iter().find(|&n| n > 0)
    }

    fn into_record(self, total_episodes: Option<u32>) -> ExternalTitleRecord {
        let localized_title = if self.name_cn.trim().is_empty() {
            self.name.clone()
        } else {
            self.name_cn
        };

        ExternalTitleRecord {
            subject_id: self.id,
            localized_title,
            original_title: self.name,
            total_episodes,
            air_year: self
                .date
                .as_deref()
                .filter(|date| date.len() >= 4)
                .map(|date| date.chars().take(4).collect()),
        }
    }
}

/// HTTP client for the Bangumi API
pub struct BangumiClient {
    client: Client,
    base_url: String,
    request_delay: Duration,
}

impl BangumiClient {
    pub fn new(base_url: impl Into<String>, request_delay: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self::with_client(client, base_url, request_delay))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, request_delay: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            request_delay,
        }
    }

    /// Build an endpoint url, percent-encoding every path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url`, sleeping first to stay polite to the API
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        tokio::time::sleep(self.request_delay).await;

        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("API error response: {}", body);
            return Err(SourceError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn search_subject(&self, term: &str) -> Result<Option<SearchHit>, SourceError> {
        info!("Searching Bangumi for '{}'", term);

        let mut url = self.endpoint(&["search", "subject", term])?;
        url.query_pairs_mut()
            .append_pair("type", SUBJECT_TYPE_ANIME)
            .append_pair("responseGroup", "small");

        let response: SearchResponse = match self.get_json(url).await {
            Ok(response) => response,
            Err(SourceError::NotFound(_)) => {
                warn!("No Bangumi results for '{}'", term);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let hit = response.list.into_iter().next();
        match &hit {
            Some(hit) => info!(
                "Found '{}' (id {})",
                if hit.name_cn.is_empty() { &hit.name } else { &hit.name_cn },
                hit.id
            ),
            None => warn!("No Bangumi results for '{}'", term),
        }
        Ok(hit)
    }

    async fn subject(&self, id: u64) -> Result<Subject, SourceError> {
        debug!("Fetching subject details for id {}", id);
        let url = self.endpoint(&["v0", "subjects", &id.to_string()])?;
        self.get_json(url).await
    }

    async fn main_episode_count(&self, id: u64) -> Result<u32, SourceError> {
        debug!("Fetching episode list for id {}", id);
        let mut url = self.endpoint(&["v0", "episodes"])?;
        url.query_pairs_mut()
            .append_pair("subject_id", &id.to_string());

        let page: EpisodePage = self.get_json(url).await?;
        let count = page
            .data
            .iter()
            .filter(|ep| ep.episode_type == EPISODE_TYPE_MAIN)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl TitleSource for BangumiClient {
    async fn search_and_fetch(
        &self,
        query: &str,
    ) -> Result<Option<ExternalTitleRecord>, SourceError> {
        let Some(hit) = self.search_subject(query).await? else {
            return Ok(None);
        };

        let subject = self.subject(hit.id).await?;
        let total_episodes = match subject.reported_episodes() {
            Some(n) => Some(n),
            None => match self.main_episode_count(subject.id).await {
                Ok(0) => None,
                Ok(n) => Some(n),
                Err(e) => {
                    warn!("Failed to count episodes for id {}: {}", subject.id, e);
                    None
                }
            },
        };

        Ok(Some(subject.into_record(total_episodes)))
    }
}
