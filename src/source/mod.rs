//! External title database access.

pub mod bangumi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use bangumi::BangumiClient;

/// Authoritative show metadata returned by a title source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTitleRecord {
    pub subject_id: u64,
    /// Localized (Chinese) title, falling back to the original title
    pub localized_title: String,
    pub original_title: String,
    pub total_episodes: Option<u32>,
    pub air_year: Option<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("API request failed with status {status} at {url}")]
    Api { status: u16, url: String },
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid API url: {0}")]
    InvalidUrl(String),
}

/// A free-text searchable title database
#[async_trait]
pub trait TitleSource: Send + Sync {
    /// Return the best-matching record for `query`, or `Ok(None)` when nothing matches
    async fn search_and_fetch(&self, query: &str)
        -> Result<Option<ExternalTitleRecord>, SourceError>;
}

/// Source used when running without network access; never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl TitleSource for OfflineSource {
    async fn search_and_fetch(
        &self,
        _query: &str,
    ) -> Result<Option<ExternalTitleRecord>, SourceError> {
        Ok(None)
    }
}
