use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::Config;

use super::pipeline::{MediaFile, Pipeline};

/// Result of scanning a media directory
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_path: PathBuf,
    pub scanned_files: usize,
    pub lookups: usize,
    pub files: Vec<MediaFile>,
    pub scan_time: Duration,
}

/// Command to parse and resolve every media file in a directory
pub struct ScanCommand {
    media_root: PathBuf,
    config: Config,
    offline: bool,
}

impl ScanCommand {
    pub fn new(media_root: PathBuf, config: Config, offline: bool) -> Self {
        Self {
            media_root,
            config,
            offline,
        }
    }

    pub async fn execute(&self) -> Result<ScanReport> {
        let start_time = Instant::now();
        info!("🔎 Scanning directory: {:?}", self.media_root);

        let pipeline = Pipeline::from_config(&self.config, self.offline)?;
        let files = pipeline.run(&self.media_root, &self.config).await?;

        let report = ScanReport {
            scan_path: self.media_root.clone(),
            scanned_files: files.len(),
            lookups: pipeline.resolver().cache().fetch_count(),
            files,
            scan_time: start_time.elapsed(),
        };

        info!(
            "✅ Scan complete. Parsed {} files with {} title lookups in {:.2}s",
            report.scanned_files,
            report.lookups,
            report.scan_time.as_secs_f64()
        );

        Ok(report)
    }

    /// Print the scan report to stdout
    pub fn print_report(&self, report: &ScanReport) {
        println!("\n📊 Scan Report");
        println!("═══════════════");
        println!("📂 Scanned directory: {}", report.scan_path.display());
        println!("📁 Media files: {}", report.scanned_files);
        println!("🌐 Title lookups: {}", report.lookups);

        for file in &report.files {
            let info = &file.info;
            println!("\n🎬 {}", file.relative_path.display());
            println!(
                "   {} - Season {} Episode {}",
                info.title,
                info.season,
                info.episode.as_deref().unwrap_or("??")
            );

            let tags: Vec<&str> = [
                &info.group,
                &info.resolution,
                &info.video_codec,
                &info.audio_codec,
                &info.subtitle,
                &info.remarks,
            ]
            .into_iter()
            .filter_map(|tag| tag.as_deref())
            .collect();
            if !tags.is_empty() {
                println!("   Tags: {}", tags.join(" | "));
            }

            if let Some(hint) = info.total_episodes_hint {
                println!("   Episodes in database: {}", hint);
            }
        }
    }

    /// Print the scan report as JSON to stdout
    pub fn print_json(&self, report: &ScanReport) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(report)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scan_cmd = ScanCommand::new(temp_dir.path().to_path_buf(), Config::default(), true);

        let report = scan_cmd.execute().await.unwrap();
        assert_eq!(report.scanned_files, 0);
        assert_eq!(report.lookups, 0);
    }

    #[tokio::test]
    async fn test_scan_nonexistent_directory() {
        let scan_cmd = ScanCommand::new(PathBuf::from("/nonexistent/path"), Config::default(), true);

        let result = scan_cmd.execute().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scan_reports_parsed_files() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("[Show Season 2][1080p] - 04.mkv"),
            "",
        )
        .unwrap();

        let scan_cmd = ScanCommand::new(temp_dir.path().to_path_buf(), Config::default(), true);
        let report = scan_cmd.execute().await.unwrap();

        assert_eq!(report.scanned_files, 1);
        let info = &report.files[0].info;
        assert_eq!(info.title, "Show");
        assert_eq!(info.season, "2");
        assert_eq!(info.episode.as_deref(), Some("04"));
        assert!(scan_cmd.print_json(&report).is_ok());
    }

    #[tokio::test]
    async fn test_scan_with_missing_pattern_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            patterns_file: Some(temp_dir.path().join("missing.json")),
            ..Config::default()
        };

        let scan_cmd = ScanCommand::new(temp_dir.path().to_path_buf(), config, true);
        assert!(scan_cmd.execute().await.is_err());
    }
}
