use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

use crate::media::ParsedMediaInfo;

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w*)\}").expect("placeholder pattern is valid"));

static ILLEGAL_CHARS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("illegal chars pattern is valid"));

static MULTIPLE_SPACES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("spaces pattern is valid"));

/// Placeholders a filename template may use
pub const PLACEHOLDERS: &[&str] = &[
    "title",
    "season",
    "episode",
    "resolution",
    "group",
    "source",
    "ext",
    "bangumi_eps",
];

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("Unknown placeholder '{{{0}}}' in filename template")]
    UnknownPlaceholder(String),
    #[error("Filename template rendered to an empty name")]
    EmptyName,
    #[error("'{0}' is not a usable path component")]
    UnsafeComponent(String),
}

/// Replace characters that are illegal in filenames and collapse repeated spaces
pub fn clean_filename(name: &str) -> String {
    let cleaned = ILLEGAL_CHARS_PATTERN.replace_all(name, "_");
    MULTIPLE_SPACES_PATTERN
        .replace_all(&cleaned, " ")
        .trim()
        .to_string()
}

fn template_values(info: &ParsedMediaInfo, extension: &str) -> HashMap<&'static str, String> {
    let or_empty = |value: &Option<String>| value.clone().unwrap_or_default();

    HashMap::from([
        ("title", info.title.clone()),
        ("season", info.season.clone()),
        (
            "episode",
            info.episode.clone().unwrap_or_else(|| "00".to_string()),
        ),
        ("resolution", or_empty(&info.resolution)),
        ("group", or_empty(&info.group)),
        ("source", or_empty(&info.remarks)),
        ("ext", extension.trim_start_matches('.').to_string()),
        (
            "bangumi_eps",
            info.total_episodes_hint
                .map(|hint| hint.to_string())
                .unwrap_or_default(),
        ),
    ])
}

/// Fill `{placeholder}`s in `template` from `info`
pub fn render_template(
    template: &str,
    info: &ParsedMediaInfo,
    extension: &str,
) -> Result<String, TemplateError> {
    let values = template_values(info, extension);
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER_PATTERN.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = values
            .get(name.as_str())
            .ok_or_else(|| TemplateError::UnknownPlaceholder(name.as_str().to_string()))?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }
    rendered.push_str(&template[last..]);

    Ok(rendered)
}

/// Clean `name` and make sure it stays a single component below its parent
fn path_component(name: &str) -> Result<String, TemplateError> {
    let cleaned = clean_filename(name);
    match cleaned.as_str() {
        "" | "." | ".." => Err(TemplateError::UnsafeComponent(cleaned)),
        _ => Ok(cleaned),
    }
}

/// Where the link for a media file goes: `<dest>/<Title>/Season <n>/<rendered name>`
pub fn link_destination(
    dest_root: &Path,
    template: &str,
    info: &ParsedMediaInfo,
    extension: &str,
) -> Result<PathBuf, TemplateError> {
    let rendered = render_template(template, info, extension)?;
    if clean_filename(&rendered).is_empty() {
        return Err(TemplateError::EmptyName);
    }
    let file_name = path_component(&rendered)?;

    Ok(dest_root
        .join(path_component(&info.title)?)
        .join(path_component(&format!("Season {}", info.season))?)
        .join(file_name))
}
