use std::env;
use std::path::PathBuf;

use crate::source::bangumi::DEFAULT_BASE_URL;

const DEFAULT_FORMATS: &str = "mkv,mp4,avi,webm,mov,m4v,ts";
const DEFAULT_TEMPLATE: &str = "{title} S{season}E{episode}.{ext}";

/// Configuration for pattern loading, lookups and linking
#[derive(Debug, Clone)]
pub struct Config {
    pub patterns_file: Option<PathBuf>,
    pub media_extensions: Vec<String>,
    pub filename_template: String,
    pub api_base_url: String,
    pub request_delay_ms: u64,
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            patterns_file: env::var("BGMLINK_PATTERNS").ok().map(PathBuf::from),
            media_extensions: env::var("BGMLINK_FORMATS")
                .map(|formats| parse_extensions(&formats))
                .unwrap_or(defaults.media_extensions),
            filename_template: env::var("BGMLINK_TEMPLATE")
                .unwrap_or(defaults.filename_template),
            api_base_url: env::var("BGMLINK_API_BASE").unwrap_or(defaults.api_base_url),
            request_delay_ms: env::var("BGMLINK_REQUEST_DELAY_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_delay_ms),
            concurrency: env::var("BGMLINK_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.concurrency),
        }
    }

    /// Whether `extension` (without the dot) is a configured media format
    pub fn is_media_extension(&self, extension: &str) -> bool {
        let extension = extension.to_lowercase();
        self.media_extensions.iter().any(|ext| *ext == extension)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patterns_file: None,
            media_extensions: parse_extensions(DEFAULT_FORMATS),
            filename_template: DEFAULT_TEMPLATE.to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_delay_ms: 500,
            concurrency: 1,
        }
    }
}

/// Split a comma-separated extension list, normalising case and leading dots
fn parse_extensions(formats: &str) -> Vec<String> {
    formats
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}
