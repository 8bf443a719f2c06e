use anyhow::{anyhow, Context, Result};
use futures::stream::{self, StreamExt};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cache::LookupCache;
use crate::config::Config;
use crate::decompose::decompose;
use crate::media::ParsedMediaInfo;
use crate::patterns::PatternSet;
use crate::resolve::Resolver;
use crate::source::{BangumiClient, OfflineSource, TitleSource};

/// A media file together with its parsed (and possibly resolved) metadata
#[derive(Debug, Clone, Serialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub info: ParsedMediaInfo,
}

impl MediaFile {
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Recursively find media files under `root`, sorted by path
pub fn collect_media_files(root: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(anyhow!("Media directory does not exist: {:?}", root));
    }

    if !root.is_dir() {
        return Err(anyhow!("Path is not a directory: {:?}", root));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| config.is_media_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    Ok(files)
}

/// Shared decompose-then-resolve processing used by the scan and link commands
pub struct Pipeline {
    patterns: PatternSet,
    resolver: Resolver,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(patterns: PatternSet, resolver: Resolver, concurrency: usize) -> Self {
        Self {
            patterns,
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    /// Build the pipeline described by `config`
    pub fn from_config(config: &Config, offline: bool) -> Result<Self> {
        let patterns = PatternSet::load(config.patterns_file.as_deref())?;

        let source: Arc<dyn TitleSource> = if offline {
            info!("Running offline, title lookups are disabled");
            Arc::new(OfflineSource)
        } else {
            Arc::new(
                BangumiClient::new(
                    config.api_base_url.clone(),
                    Duration::from_millis(config.request_delay_ms),
                )
                .context("Failed to create Bangumi client")?,
            )
        };

        let resolver = Resolver::new(source, Arc::new(LookupCache::new()));
        Ok(Self::new(patterns, resolver, config.concurrency))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Decompose every file name in parallel, preserving input order
    pub fn decompose_all(&self, root: &Path, paths: &[PathBuf]) -> Vec<MediaFile> {
        paths
            .par_iter()
            .map(|path| {
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_default();
                let relative_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();

                MediaFile {
                    path: path.clone(),
                    relative_path,
                    info: decompose(&stem, &self.patterns),
                }
            })
            .collect()
    }

    /// Resolve every file against the title source, preserving input order
    pub async fn resolve_all(&self, files: Vec<MediaFile>) -> Vec<MediaFile> {
        stream::iter(files)
            .map(|mut file| async move {
                info!("Processing: {:?}", file.relative_path);
                file.info = self.resolver.resolve(file.info).await;
                debug!("Resolved {:?} as {:?}", file.relative_path, file.info);
                file
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Find, decompose and resolve all media files under `root`
    pub async fn run(&self, root: &Path, config: &Config) -> Result<Vec<MediaFile>> {
        let paths = collect_media_files(root, config)?;
        info!("Found {} media files in {:?}", paths.len(), root);

        let files = self.decompose_all(root, &paths);
        Ok(self.resolve_all(files).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn offline_pipeline() -> Pipeline {
        Pipeline::from_config(&Config::default(), true).unwrap()
    }

    #[test]
    fn test_collect_media_files_filters_extensions() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.mkv"), "").unwrap();
        fs::write(root.join("nested/a.MP4"), "").unwrap();
        fs::write(root.join("a.ass"), "").unwrap();

        let files = collect_media_files(root, &Config::default()).unwrap();
        assert_eq!(files, vec![root.join("b.mkv"), root.join("nested/a.MP4")]);
    }

    #[test]
    fn test_collect_media_files_nonexistent_directory() {
        let result = collect_media_files(Path::new("/nonexistent/path"), &Config::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_offline_run_keeps_parsed_metadata() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("[ANi] Frieren - 07 [1080p].mkv"), "").unwrap();
        fs::write(root.join("Show.S02E03.mp4"), "").unwrap();

        let files = offline_pipeline()
            .run(root, &Config::default())
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].relative_path, PathBuf::from("Show.S02E03.mp4"));
        assert_eq!(files[0].info.season, "2");
        assert_eq!(files[0].info.episode.as_deref(), Some("03"));
        assert_eq!(files[0].extension(), "mp4");

        assert_eq!(files[1].info.title, "Frieren");
        assert_eq!(files[1].info.group.as_deref(), Some("ANi"));
        assert_eq!(files[1].info.episode.as_deref(), Some("07"));
        assert_eq!(files[1].info.resolution.as_deref(), Some("1080p"));
        assert_eq!(files[1].info.total_episodes_hint, None);
    }
}
