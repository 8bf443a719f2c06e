use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::debug;

use crate::config::Config;
use crate::decompose::decompose;
use crate::media::ParsedMediaInfo;
use crate::patterns::PatternSet;

/// Command to decompose filenames given on the command line
pub struct ParseCommand {
    names: Vec<String>,
    config: Config,
}

impl ParseCommand {
    pub fn new(names: Vec<String>, config: Config) -> Self {
        Self { names, config }
    }

    /// Strip a media extension if the argument carries one
    fn stem<'a>(&self, name: &'a str) -> &'a str {
        let path = Path::new(name);
        let has_media_extension = path
            .extension()
            .map(|ext| self.config.is_media_extension(&ext.to_string_lossy()))
            .unwrap_or(false);

        if has_media_extension {
            path.file_stem().and_then(|stem| stem.to_str()).unwrap_or(name)
        } else {
            name
        }
    }

    pub fn execute(&self) -> Result<Vec<ParsedMediaInfo>> {
        if self.names.is_empty() {
            return Err(anyhow!("No filenames given"));
        }

        let patterns = PatternSet::load(self.config.patterns_file.as_deref())?;

        Ok(self
            .names
            .iter()
            .map(|name| {
                let stem = self.stem(name);
                debug!("Parsing stem '{}'", stem);
                decompose(stem, &patterns)
            })
            .collect())
    }

    /// Print one JSON object per parsed name to stdout
    pub fn print_json(&self, parsed: &[ParsedMediaInfo]) -> Result<()> {
        for info in parsed {
            println!("{}", serde_json::to_string(info)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_strips_media_extensions_only() {
        let cmd = ParseCommand::new(vec![], Config::default());
        assert_eq!(cmd.stem("Show - 01.mkv"), "Show - 01");
        assert_eq!(cmd.stem("Show - 01.5"), "Show - 01.5");
        assert_eq!(cmd.stem("Show - 01"), "Show - 01");
    }

    #[test]
    fn test_parse_without_names_fails() {
        let cmd = ParseCommand::new(vec![], Config::default());
        assert!(cmd.execute().is_err());
    }

    #[test]
    fn test_parse_uses_pattern_file() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = temp_dir.path().join("patterns.json");
        fs::write(&patterns, r#"{"resolution": "(\\d{3,4})p"}"#).unwrap();

        let config = Config {
            patterns_file: Some(patterns),
            ..Config::default()
        };
        let cmd = ParseCommand::new(vec!["[720p] Show.mkv".to_string()], config);
        let parsed = cmd.execute().unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].resolution.as_deref(), Some("720"));
        assert_eq!(parsed[0].title, "Show");
        assert!(cmd.print_json(&parsed).is_ok());
    }
}
