//! Filename decomposition.
//!
//! A filename stem is taken apart by an ordered cascade of stages. Every stage
//! removes the text it claims from a working copy of the stem, so later stages
//! never see it again:
//!
//! 1. `[<title> Season <n>]` bracket
//! 2. bracketed technical tags (resolution, source, codecs, subtitle, group)
//! 3. season/episode numbers in the remaining text
//! 4. title from whatever is left
//! 5. defaults

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::media::{ParsedMediaInfo, DEFAULT_SEASON, UNKNOWN_TITLE};
use crate::patterns::{PatternSet, RuleName};

static TITLE_SEASON_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\[【]([^\[\]【】]*?)\s*season\s*(\d+)\s*[\]】]")
        .expect("title/season pattern is valid")
});

static BRACKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\[【](.*?)[\]】]").expect("bracket pattern is valid"));

static SEPARATOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s._\-]+").expect("separator pattern is valid"));

/// Fields collected while the cascade runs
#[derive(Debug, Default)]
struct Draft {
    group: Option<String>,
    title: Option<String>,
    season: Option<String>,
    episode: Option<String>,
    resolution: Option<String>,
    video_codec: Option<String>,
    audio_codec: Option<String>,
    subtitle: Option<String>,
    remarks: Vec<String>,
}

impl Draft {
    fn slot(&mut self, rule: RuleName) -> Option<&mut Option<String>> {
        match rule {
            RuleName::Resolution => Some(&mut self.resolution),
            RuleName::VideoCodec => Some(&mut self.video_codec),
            RuleName::AudioCodec => Some(&mut self.audio_codec),
            RuleName::Subtitle => Some(&mut self.subtitle),
            RuleName::Group => Some(&mut self.group),
            RuleName::Source | RuleName::SeasonEpisode | RuleName::Episode => None,
        }
    }

    /// Record a technical tag. Sources accumulate, everything else is set once.
    fn claim(&mut self, rule: RuleName, value: String) {
        if rule == RuleName::Source {
            self.remarks.push(value);
            return;
        }

        if let Some(slot) = self.slot(rule) {
            if slot.is_none() {
                *slot = Some(value);
            }
        }
    }

    fn finish(self) -> ParsedMediaInfo {
        let remarks = if self.remarks.is_empty() {
            None
        } else {
            Some(self.remarks.join(", "))
        };

        ParsedMediaInfo {
            group: self.group,
            title: self.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            season: self.season.unwrap_or_else(|| DEFAULT_SEASON.to_string()),
            episode: self.episode,
            resolution: self.resolution,
            video_codec: self.video_codec,
            audio_codec: self.audio_codec,
            subtitle: self.subtitle,
            remarks,
            total_episodes_hint: None,
        }
    }
}

/// Decompose a filename stem (no extension) into episode metadata
///
/// Never fails: unmatched stages leave their fields unset and the defaults
/// fill in the rest.
pub fn decompose(stem: &str, patterns: &PatternSet) -> ParsedMediaInfo {
    let mut draft = Draft::default();
    let mut work = stem.to_string();

    claim_title_season(&mut draft, &mut work);
    claim_bracket_tags(&mut draft, &mut work, patterns);
    claim_season_episode(&mut draft, &mut work, patterns);
    fallback_title(&mut draft, &work);

    let info = draft.finish();
    debug!("Decomposed '{}' into {:?}", stem, info);
    info
}

fn remove_first(work: &mut String, claimed: &str) {
    if !claimed.is_empty() {
        *work = work.replacen(claimed, "", 1);
    }
}

/// Render an episode number as at least two digits
pub fn pad_episode(raw: &str) -> Option<String> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let significant = digits.trim_start_matches('0');
    let number = if significant.is_empty() { "0" } else { significant };
    Some(format!("{:0>2}", number))
}

/// Seasons are positive; anything else leaves the default in place
fn positive_season(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n.to_string())
}

fn claim_title_season(draft: &mut Draft, work: &mut String) {
    let Some((whole, title, season)) = TITLE_SEASON_PATTERN.captures(work.as_str()).map(|caps| {
        (
            caps[0].to_string(),
            caps[1].trim().to_string(),
            positive_season(&caps[2]),
        )
    }) else {
        return;
    };

    if !title.is_empty() {
        draft.title = Some(title);
    }
    draft.season = season;
    remove_first(work, &whole);
}

fn claim_bracket_tags(draft: &mut Draft, work: &mut String, patterns: &PatternSet) {
    let segments: Vec<(String, String)> = BRACKET_PATTERN
        .captures_iter(work.as_str())
        .map(|caps| (caps[0].to_string(), caps[1].to_string()))
        .collect();

    for (bracket, content) in segments {
        let claimed = RuleName::TECHNICAL
            .iter()
            .find_map(|&rule| patterns.find(rule, &content).map(|hit| (rule, hit.value)));

        if let Some((rule, value)) = claimed {
            debug!("Bracket '{}' claimed as {}", bracket, rule);
            draft.claim(rule, value);
            remove_first(work, &bracket);
        }
    }
}

fn claim_season_episode(draft: &mut Draft, work: &mut String, patterns: &PatternSet) {
    if draft.season.is_some() && draft.episode.is_some() {
        return;
    }

    if let Some(rule) = patterns.rule(RuleName::SeasonEpisode) {
        let numbers = rule.captures(work.as_str()).and_then(|caps| {
            let season = positive_season(caps.get(1)?.as_str());
            let episode = pad_episode(caps.get(2)?.as_str())?;
            Some((caps[0].to_string(), season, episode))
        });

        if let Some((whole, season, episode)) = numbers {
            if draft.season.is_none() {
                draft.season = season;
            }
            draft.episode = Some(episode);
            remove_first(work, &whole);
            return;
        }
    }

    if let Some(hit) = patterns.find(RuleName::Episode, work.as_str()) {
        if let Some(episode) = pad_episode(&hit.value) {
            draft.episode = Some(episode);
            remove_first(work, &hit.matched);
        }
    }
}

fn fallback_title(draft: &mut Draft, work: &str) {
    if draft.title.is_some() {
        return;
    }

    let without_brackets = BRACKET_PATTERN.replace_all(work, "");
    let title = SEPARATOR_PATTERN
        .replace_all(&without_brackets, " ")
        .trim()
        .to_string();

    if !title.is_empty() {
        draft.title = Some(title);
    }
}
