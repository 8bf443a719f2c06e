use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tracing::{error, info, warn};

use crate::config::Config;

use super::naming::link_destination;
use super::pipeline::{MediaFile, Pipeline};

/// Outcome of linking a single file
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    Linked(PathBuf),
    Planned(PathBuf),
    AlreadyExists(PathBuf),
    Failed(String),
}

/// Summary of a link run
#[derive(Debug, Clone, Default)]
pub struct LinkReport {
    pub linked: usize,
    pub planned: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl LinkReport {
    fn record(&mut self, outcome: &LinkOutcome) {
        match outcome {
            LinkOutcome::Linked(_) => self.linked += 1,
            LinkOutcome::Planned(_) => self.planned += 1,
            LinkOutcome::AlreadyExists(_) => self.skipped += 1,
            LinkOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Command to hard-link resolved media files into a clean library layout
pub struct LinkCommand {
    media_root: PathBuf,
    dest_root: PathBuf,
    config: Config,
    offline: bool,
    dry_run: bool,
}

impl LinkCommand {
    pub fn new(
        media_root: PathBuf,
        dest_root: PathBuf,
        config: Config,
        offline: bool,
        dry_run: bool,
    ) -> Self {
        Self {
            media_root,
            dest_root,
            config,
            offline,
            dry_run,
        }
    }

    pub async fn execute(&self) -> Result<LinkReport> {
        if self.dest_root.exists() && !self.dest_root.is_dir() {
            return Err(anyhow!(
                "Destination is not a directory: {:?}",
                self.dest_root
            ));
        }

        info!(
            "🔗 Linking media from {:?} into {:?}{}",
            self.media_root,
            self.dest_root,
            if self.dry_run { " (dry run)" } else { "" }
        );

        let pipeline = Pipeline::from_config(&self.config, self.offline)?;
        let files = pipeline.run(&self.media_root, &self.config).await?;

        let mut report = LinkReport::default();
        let mut claimed = HashSet::new();
        for file in &files {
            let outcome = self.link_file(file, &mut claimed).await;
            report.record(&outcome);
        }

        info!(
            "✅ Link complete. {} linked, {} planned, {} already present, {} failed.",
            report.linked, report.planned, report.skipped, report.failed
        );

        Ok(report)
    }

    /// Link one file; failures are logged and reported, never propagated
    ///
    /// `claimed` holds the destinations taken earlier in the same run, so a
    /// dry run reports collisions the same way a real run does.
    pub async fn link_file(
        &self,
        file: &MediaFile,
        claimed: &mut HashSet<PathBuf>,
    ) -> LinkOutcome {
        let destination = match link_destination(
            &self.dest_root,
            &self.config.filename_template,
            &file.info,
            &file.extension(),
        ) {
            Ok(destination) => destination,
            Err(e) => {
                error!("  > Template error for {:?}: {}", file.relative_path, e);
                return LinkOutcome::Failed(e.to_string());
            }
        };

        if destination.exists() || !claimed.insert(destination.clone()) {
            warn!("  > File already exists, skipping: {:?}", destination);
            return LinkOutcome::AlreadyExists(destination);
        }

        if self.dry_run {
            info!("  > Would link {:?} -> {:?}", file.relative_path, destination);
            return LinkOutcome::Planned(destination);
        }

        match hard_link(&file.path, &destination).await {
            Ok(()) => {
                info!("  > Linked {:?}", destination);
                LinkOutcome::Linked(destination)
            }
            Err(e) => {
                error!("  > Failed to link {:?}: {}", file.relative_path, e);
                LinkOutcome::Failed(e.to_string())
            }
        }
    }
}

async fn hard_link(source: &Path, destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent() {
        async_fs::create_dir_all(parent).await?;
    }
    async_fs::hard_link(source, destination).await?;
    Ok(())
}
