use anyhow::{anyhow, Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Names of the rules a pattern file may define
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleName {
    SeasonEpisode,
    Episode,
    Resolution,
    Source,
    VideoCodec,
    AudioCodec,
    Subtitle,
    Group,
}

impl RuleName {
    pub const ALL: [RuleName; 8] = [
        RuleName::SeasonEpisode,
        RuleName::Episode,
        RuleName::Resolution,
        RuleName::Source,
        RuleName::VideoCodec,
        RuleName::AudioCodec,
        RuleName::Subtitle,
        RuleName::Group,
    ];

    /// Categories tried against bracketed segments, in claim order
    pub const TECHNICAL: [RuleName; 6] = [
        RuleName::Resolution,
        RuleName::Source,
        RuleName::VideoCodec,
        RuleName::AudioCodec,
        RuleName::Subtitle,
        RuleName::Group,
    ];

    /// Key used for this rule in pattern files
    pub fn key(self) -> &'static str {
        match self {
            RuleName::SeasonEpisode => "season_episode",
            RuleName::Episode => "episode",
            RuleName::Resolution => "resolution",
            RuleName::Source => "source",
            RuleName::VideoCodec => "video_codec",
            RuleName::AudioCodec => "audio_codec",
            RuleName::Subtitle => "subtitle",
            RuleName::Group => "group",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|rule| rule.key() == key)
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Built-in rules used when no pattern file is configured
const DEFAULT_RULES: &[(RuleName, &str)] = &[
    (RuleName::SeasonEpisode, r"\bS(\d{1,2})\s*E(\d{1,3})\b"),
    (
        RuleName::Episode,
        r"(?:\s-\s*|\[|\bEP?\s*|第)(\d{1,3})(?:v\d+)?(?:[话話集\]]|\s|$)",
    ),
    (
        RuleName::Resolution,
        r"\b(\d{3,4}p|4k|\d{3,4}x\d{3,4})\b",
    ),
    (
        RuleName::Source,
        r"\b(WEB-?DL|WEB-?Rip|BDRip|BD|Blu-?Ray|HDTV|DVDRip|Baha|B-Global|ABEMA|CR)\b",
    ),
    (RuleName::VideoCodec, r"\b(x26[45]|h\.?26[45]|HEVC|AVC|AV1)\b"),
    (RuleName::AudioCodec, r"\b(AAC|FLAC|E-?AC-?3|AC3|DTS|Opus)\b"),
    (
        RuleName::Subtitle,
        r"(简繁日|简繁|简日|繁日|简体|繁体|简中|繁中|内封|内嵌|\bCHS\b|\bCHT\b|\bBIG5\b|\bGB\b)",
    ),
    (
        RuleName::Group,
        r"^(.*(?:字幕组|字幕組|字幕社|压制组|Raws|Studio|Subs|Fansub|SubsPlease|LoliHouse|SweetSub|Sakurato|kissaten|\bANi\b).*)$",
    ),
];

/// Named, precompiled filename rules
///
/// A rule that is missing, empty or fails to compile never matches.
#[derive(Debug, Clone)]
pub struct PatternSet {
    rules: HashMap<RuleName, Regex>,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::from_pairs(
            DEFAULT_RULES
                .iter()
                .map(|(rule, pattern)| (rule.key(), *pattern)),
        )
    }
}

impl PatternSet {
    /// A pattern set where no rule matches anything
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Build from `rule key -> pattern` pairs, skipping unknown keys
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut rules = HashMap::new();

        for (key, pattern) in pairs {
            let Some(rule) = RuleName::from_key(key) else {
                debug!("Ignoring unknown pattern rule '{}'", key);
                continue;
            };

            if let Some(regex) = Self::compile_rule(rule, pattern) {
                rules.insert(rule, regex);
            }
        }

        Self { rules }
    }

    /// Parse a JSON object of `rule key -> pattern string`
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Pattern file is not valid JSON")?;
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Pattern file must contain a JSON object"))?;

        let pairs: Vec<(&str, &str)> = object
            .iter()
            .filter_map(|(key, value)| match value.as_str() {
                Some(pattern) => Some((key.as_str(), pattern)),
                None => {
                    warn!("Pattern rule '{}' is not a string, ignoring it", key);
                    None
                }
            })
            .collect();

        Ok(Self::from_pairs(pairs))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pattern file {:?}", path))?;
        let set = Self::from_json_str(&content)
            .with_context(|| format!("Failed to load pattern file {:?}", path))?;
        debug!("Loaded {} pattern rules from {:?}", set.rules.len(), path);
        Ok(set)
    }

    /// Load from a file when one is given, otherwise use the built-in rules
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    fn compile_rule(rule: RuleName, pattern: &str) -> Option<Regex> {
        if pattern.trim().is_empty() {
            warn!("Pattern rule '{}' is empty and will never match", rule);
            return None;
        }

        match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(
                    "Failed to compile pattern rule '{}' ('{}'): {}",
                    rule, pattern, e
                );
                None
            }
        }
    }

    pub fn rule(&self, rule: RuleName) -> Option<&Regex> {
        self.rules.get(&rule)
    }

    pub fn has_rule(&self, rule: RuleName) -> bool {
        self.rules.contains_key(&rule)
    }

    /// Search `text` with a rule, returning the matched span and extracted value
    ///
    /// The value is the first capture group when it took part in the match,
    /// otherwise the whole match.
    pub fn find(&self, rule: RuleName, text: &str) -> Option<RuleMatch> {
        let caps = self.rule(rule)?.captures(text)?;
        let whole = caps.get(0)?;
        let value = caps.get(1).unwrap_or(whole).as_str().trim().to_string();

        Some(RuleMatch {
            matched: whole.as_str().to_string(),
            value,
        })
    }
}

/// A single rule hit
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Full text consumed by the match
    pub matched: String,
    /// Extracted value
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_has_every_rule() {
        let set = PatternSet::default();
        for rule in RuleName::ALL {
            assert!(set.has_rule(rule), "missing default rule {}", rule);
        }
    }

    #[test]
    fn test_find_prefers_first_group() {
        let set = PatternSet::from_pairs([("resolution", r"res(\d+)")]);
        let hit = set.find(RuleName::Resolution, "res1080 extra").unwrap();
        assert_eq!(hit.matched, "res1080");
        assert_eq!(hit.value, "1080");
    }

    #[test]
    fn test_find_falls_back_to_whole_match() {
        let set = PatternSet::from_pairs([("video_codec", r"x26[45]")]);
        let hit = set.find(RuleName::VideoCodec, "HEVC X265").unwrap();
        assert_eq!(hit.value, "X265");
    }

    #[test]
    fn test_invalid_and_missing_rules_never_match() {
        let set = PatternSet::from_pairs([("resolution", r"(\d+"), ("source", "")]);
        assert!(!set.has_rule(RuleName::Resolution));
        assert!(!set.has_rule(RuleName::Source));
        assert!(set.find(RuleName::Resolution, "1080p").is_none());
        assert!(set.find(RuleName::Group, "anything").is_none());
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{"resolution": "\\d{3,4}p", "unknown_rule": "x", "group": 5}"#;
        let set = PatternSet::from_json_str(json).unwrap();
        assert!(set.has_rule(RuleName::Resolution));
        assert!(!set.has_rule(RuleName::Group));
        assert_eq!(
            set.find(RuleName::Resolution, "[720P]").unwrap().value,
            "720P"
        );
    }

    #[test]
    fn test_from_json_str_rejects_non_object() {
        assert!(PatternSet::from_json_str("[1, 2]").is_err());
        assert!(PatternSet::from_json_str("not json").is_err());
    }

    #[test]
    fn test_rule_keys_round_trip() {
        for rule in RuleName::ALL {
            assert_eq!(RuleName::from_key(rule.key()), Some(rule));
        }
        assert_eq!(RuleName::from_key("title"), None);
    }
}
