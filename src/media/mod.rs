use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when nothing usable is left in a filename
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Season assumed when a filename carries none
pub const DEFAULT_SEASON: &str = "1";

/// Episode metadata extracted from one release filename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedMediaInfo {
    pub group: Option<String>,
    pub title: String,
    pub season: String,
    pub episode: Option<String>,
    pub resolution: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub subtitle: Option<String>,
    /// Source tags joined with ", "
    pub remarks: Option<String>,
    /// Episode count reported by the title database, set only after a successful lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_episodes_hint: Option<EpisodeCountHint>,
}

impl Default for ParsedMediaInfo {
    fn default() -> Self {
        Self {
            group: None,
            title: UNKNOWN_TITLE.to_string(),
            season: DEFAULT_SEASON.to_string(),
            episode: None,
            resolution: None,
            video_codec: None,
            audio_codec: None,
            subtitle: None,
            remarks: None,
            total_episodes_hint: None,
        }
    }
}

impl ParsedMediaInfo {
    pub fn has_known_title(&self) -> bool {
        self.title != UNKNOWN_TITLE
    }

    pub fn has_default_season(&self) -> bool {
        self.season == DEFAULT_SEASON
    }
}

/// Total episode count attached by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeCountHint {
    Known(u32),
    Unknown,
}

impl EpisodeCountHint {
    pub fn from_count(count: Option<u32>) -> Self {
        match count {
            Some(n) if n > 0 => EpisodeCountHint::Known(n),
            _ => EpisodeCountHint::Unknown,
        }
    }
}

impl fmt::Display for EpisodeCountHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeCountHint::Known(n) => write!(f, "{}", n),
            EpisodeCountHint::Unknown => f.write_str("??"),
        }
    }
}
