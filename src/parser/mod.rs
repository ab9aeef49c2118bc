//! Task-list parsing: turns input text into harvest tasks.
//!
//! Accepts two line shapes, freely mixed:
//!
//! - `Name,URL[,Type]` rows (a leading `Name,...` header row is skipped)
//! - bare URLs, which get a display name derived from the URL path
//!
//! Blank lines and `#` comments are ignored. Lines that fit neither shape
//! are collected as skipped rather than failing the whole input.

use url::Url;

use crate::harvest::{ContentType, HarvestTask};

/// Outcome of parsing a task list.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Tasks parsed, in input order.
    pub tasks: Vec<HarvestTask>,
    /// Lines that could not be interpreted.
    pub skipped: Vec<String>,
}

impl ParseResult {
    /// Number of parsed tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Parses a task list from raw text.
#[must_use]
pub fn parse_task_list(input: &str) -> ParseResult {
    let mut result = ParseResult::default();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_header_row(line) {
            continue;
        }
        match parse_line(line) {
            Some(task) => result.tasks.push(task),
            None => result.skipped.push(line.to_string()),
        }
    }

    result
}

fn is_header_row(line: &str) -> bool {
    line.to_ascii_lowercase().starts_with("name,")
        && !line.split(',').nth(1).is_some_and(is_http_url)
}

fn parse_line(line: &str) -> Option<HarvestTask> {
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();

    if parts.len() >= 2 && is_http_url(parts[1]) {
        let declared = parts.get(2).copied().and_then(parse_declared_type);
        return Some(HarvestTask::new(parts[0], parts[1], declared));
    }

    if is_http_url(line) {
        return Some(HarvestTask::new(name_from_url(line), line, None));
    }

    None
}

fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

/// Maps a `Type` column value to a declared content type.
///
/// An empty column means "infer from the URL"; an unrecognized value is
/// carried through as UNKNOWN so the engine rejects it explicitly instead
/// of guessing.
fn parse_declared_type(value: &str) -> Option<ContentType> {
    let lowered = value.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }
    Some(if lowered.starts_with("html") {
        ContentType::Html
    } else if lowered.starts_with("pdf") {
        ContentType::Pdf
    } else {
        ContentType::Unknown
    })
}

/// Derives a display name from a bare URL's last path segment.
/// Extension stripping is case-insensitive, matching type inference.
fn name_from_url(url: &str) -> String {
    let segment = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(ToString::to_string))
        })
        .filter(|segment| !segment.is_empty());

    let Some(segment) = segment else {
        return url.to_string();
    };

    let lowered = segment.to_ascii_lowercase();
    let stem = [".pdf", ".html", ".htm"]
        .iter()
        .find(|ext| lowered.ends_with(*ext))
        .map_or(segment.as_str(), |ext| {
            &segment[..segment.len() - ext.len()]
        });
    stem.replace(['_', '-'], " ")
}
