//! Bulk import parsing.
//!
//! Turns pasted text into normalized rows. Three input shapes are accepted:
//!
//! - CSV with columns `Name, Links, Assignee, Attachment, Detail, Last modification`
//!   (header optional, auto-detected)
//! - pipe-delimited lines `Day|Title|Program|Description|Trainer|AttachmentName|AttachmentURL`
//! - a plain list of URLs, one per line
//!
//! Parsing never fails as a whole. Lines that cannot be used come back as
//! [`Parsed::Skip`] so callers can count them; everything else maps 1:1 to
//! an upsert.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use tracing::{trace, warn};

use crate::models::Attachment;

/// First-cell values (case-insensitive) that mark a header row.
pub const HEADER_TOKENS: &[&str] = &["name", "title", "day", "url", "link", "links"];

static ATTACHMENT_CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(.*?)\s*\(\s*(https?://[^\s()]+)\s*\)\s*$").expect("attachment regex")
});

static DAY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,4})\s+[-–]\s+(\S.*)$").expect("day prefix regex"));

static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("integer regex"));

static HTTP_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s,;"'<>()]+"#).expect("url regex"));

// =============================================================================
// LOW-LEVEL PARSERS
// =============================================================================

/// Parse CSV text into rows of fields.
///
/// Quoted fields may contain commas, doubled quotes and newlines. Ragged rows
/// are kept as-is. Malformed records are logged and dropped; whatever parsed
/// before and after them is returned. Empty lines produce no row.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    parse_csv_lines(text)
        .into_iter()
        .filter(|(_, row)| !row.is_empty())
        .map(|(_, row)| row)
        .collect()
}

/// Like [`parse_csv`], with the 1-based line each record starts on.
///
/// Empty lines outside quoted fields come back as rows with no fields so
/// callers can count them.
pub fn parse_csv_lines(text: &str) -> Vec<(usize, Vec<String>)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    let mut spans: Vec<(usize, usize)> = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| line_at(text, p.byte() as usize))
                    .unwrap_or(rows.len() + 1);
                let fields: Vec<String> = record.iter().map(str::to_string).collect();
                let last = line + fields.iter().map(|f| f.matches('\n').count()).sum::<usize>();
                spans.push((line, last));
                rows.push((line, fields));
            }
            Err(e) => {
                warn!(
                    subsystem = "import",
                    component = "csv",
                    error = %e,
                    "Skipping malformed CSV record"
                );
            }
        }
    }

    // The reader skips empty lines without reporting them.
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.is_empty() && !spans.iter().any(|&(first, last)| first <= line && line <= last) {
            rows.push((line, Vec::new()));
        }
    }
    rows.sort_by_key(|(line, _)| *line);
    rows
}

/// Line a record starts on, given the reader position it was read from.
///
/// The position sits before any empty lines the reader skipped.
fn line_at(text: &str, byte: usize) -> usize {
    let bytes = text.as_bytes();
    let mut start = byte.min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\n' | b'\r') {
        start += 1;
    }
    1 + bytes[..start].iter().filter(|&&b| b == b'\n').count()
}

/// Extract `{name, url}` from a cell formatted as `"Label (https://...)"`.
///
/// An empty label falls back to a name derived from the URL.
pub fn parse_attachment_cell(cell: &str) -> Option<Attachment> {
    let caps = ATTACHMENT_CELL.captures(cell.trim())?;
    let url = caps.get(2)?.as_str().to_string();
    let name = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| url_label(&url));
    Some(Attachment { name, url })
}

/// Split a `"<digits> - Title"` or `"<digits> – Title"` prefix off a title.
///
/// Returns `(None, title)` with the input untouched when there is no prefix.
pub fn extract_day_prefix(title: &str) -> (Option<i32>, String) {
    if let Some(caps) = DAY_PREFIX.captures(title) {
        if let Ok(day) = caps[1].parse::<i32>() {
            return (Some(day), caps[2].trim().to_string());
        }
    }
    (None, title.to_string())
}

/// Day column of the pipe format: the first integer in the cell, or `None`
/// for blank/"extra" cells.
pub fn parse_day_cell(cell: &str) -> Option<i32> {
    FIRST_INTEGER
        .find(cell)
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

/// Split a pipe-delimited line, trimming every field.
pub fn split_pipe_line(line: &str) -> Vec<String> {
    line.split('|').map(|f| f.trim().to_string()).collect()
}

/// Every http(s) URL appearing in `text`, in order, without duplicates.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in HTTP_URL.find_iter(text) {
        let url = m.as_str().trim_end_matches(['.', ',']).to_string();
        if is_http_url(&url) && !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// True for absolute http/https URLs with a host.
pub fn is_http_url(candidate: &str) -> bool {
    Url::parse(candidate.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Short display name for a URL: its last path segment, else its host.
pub fn url_label(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    parsed
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Human title derived from a URL, used when a page title is unavailable.
pub fn title_from_url(url: &str) -> String {
    let label = url_label(url);
    let stem = match label.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() <= 5 && !label.contains('/') => stem,
        _ => label.as_str(),
    };
    let title = stem.replace(['-', '_', '+'], " ");
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.is_empty() {
        url.to_string()
    } else {
        title
    }
}

/// Attachments in a `Links` cell: labelled `"Name (url)"` entries or bare
/// URLs, separated by newlines, semicolons or commas.
pub fn parse_link_cell(cell: &str) -> Vec<Attachment> {
    let mut attachments: Vec<Attachment> = Vec::new();
    for piece in cell.split(['\n', ';']) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        let found = match parse_attachment_cell(piece) {
            Some(attachment) => vec![attachment],
            None => extract_urls(piece)
                .into_iter()
                .map(|url| Attachment::new(url_label(&url), url))
                .collect(),
        };
        for attachment in found {
            if !attachments.iter().any(|a| a.url == attachment.url) {
                attachments.push(attachment);
            }
        }
    }
    attachments
}

// =============================================================================
// ROW NORMALIZATION
// =============================================================================

/// Why a line did not become a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Blank,
    Header,
    MissingTitleAndLink,
    NotAUrl,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed<T> {
    Row(T),
    Skip { line: usize, reason: SkipReason },
}

impl<T> Parsed<T> {
    pub fn is_row(&self) -> bool {
        matches!(self, Parsed::Row(_))
    }
}

/// Normalized learning-task row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskRow {
    pub line: usize,
    pub day: Option<i32>,
    pub title: String,
    pub program_md: String,
    pub note_md: String,
    pub trainer: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Normalized tagged-record row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordRow {
    pub line: usize,
    pub title: String,
    /// Empty when neither `Links` nor `Attachment` held a URL.
    pub path: String,
    pub assignee: Option<String>,
    pub description: String,
}

/// Normalized URL-list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRow {
    pub line: usize,
    pub url: String,
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn is_header(first_cell: &str) -> bool {
    let first = first_cell.trim().to_lowercase();
    HEADER_TOKENS.contains(&first.as_str())
}

/// Learning tasks from CSV (`Name, Links, Assignee, Attachment, Detail, ...`).
///
/// `Name` may carry a `"<day> - "` prefix; `Links` and `Attachment` both
/// contribute attachments.
pub fn csv_task_rows(text: &str) -> Vec<Parsed<TaskRow>> {
    parse_csv_lines(text)
        .into_iter()
        .map(|(line, row)| {
            if is_blank(&row) {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Blank,
                };
            }
            if is_header(cell(&row, 0)) {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Header,
                };
            }

            let (day, title) = extract_day_prefix(cell(&row, 0));
            let mut attachments = parse_link_cell(cell(&row, 1));
            for attachment in parse_link_cell(cell(&row, 3)) {
                if !attachments.iter().any(|a| a.url == attachment.url) {
                    attachments.push(attachment);
                }
            }

            let title = title.trim().to_string();
            if title.is_empty() && attachments.is_empty() {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::MissingTitleAndLink,
                };
            }
            let title = if title.is_empty() {
                attachments[0].name.clone()
            } else {
                title
            };

            trace!(subsystem = "import", component = "csv_tasks", line, "Parsed task row");
            Parsed::Row(TaskRow {
                line,
                day,
                title,
                program_md: String::new(),
                note_md: cell(&row, 4).to_string(),
                trainer: non_empty(cell(&row, 2)),
                attachments,
            })
        })
        .collect()
}

/// Learning tasks from pipe-delimited lines
/// (`Day|Title|Program|Description|Trainer|AttachmentName|AttachmentURL`).
pub fn pipe_task_rows(text: &str) -> Vec<Parsed<TaskRow>> {
    text.lines()
        .enumerate()
        .map(|(idx, raw)| {
            let line = idx + 1;
            if raw.trim().is_empty() {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Blank,
                };
            }
            let fields = split_pipe_line(raw);
            if is_header(cell(&fields, 0)) {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Header,
                };
            }

            let (prefixed_day, title) = extract_day_prefix(cell(&fields, 1));
            let day = parse_day_cell(cell(&fields, 0)).or(prefixed_day);

            let mut attachments = Vec::new();
            let url = cell(&fields, 6);
            if is_http_url(url) {
                let name = non_empty(cell(&fields, 5)).unwrap_or_else(|| url_label(url));
                attachments.push(Attachment::new(name, url));
            }

            let title = title.trim().to_string();
            if title.is_empty() && attachments.is_empty() {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::MissingTitleAndLink,
                };
            }
            let title = if title.is_empty() {
                attachments[0].name.clone()
            } else {
                title
            };

            Parsed::Row(TaskRow {
                line,
                day,
                title,
                program_md: cell(&fields, 2).to_string(),
                note_md: cell(&fields, 3).to_string(),
                trainer: non_empty(cell(&fields, 4)),
                attachments,
            })
        })
        .collect()
}

/// Tagged records from CSV (`Name, Links, Assignee, Attachment, Detail, ...`).
///
/// The first URL in `Links` wins over the `Attachment` cell.
pub fn csv_record_rows(text: &str) -> Vec<Parsed<RecordRow>> {
    parse_csv_lines(text)
        .into_iter()
        .map(|(line, row)| {
            if is_blank(&row) {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Blank,
                };
            }
            if is_header(cell(&row, 0)) {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::Header,
                };
            }

            let path = parse_link_cell(cell(&row, 1))
                .into_iter()
                .chain(parse_link_cell(cell(&row, 3)))
                .map(|a| a.url)
                .next()
                .unwrap_or_default();

            let title = cell(&row, 0).to_string();
            if title.is_empty() && path.is_empty() {
                return Parsed::Skip {
                    line,
                    reason: SkipReason::MissingTitleAndLink,
                };
            }
            let title = if title.is_empty() {
                title_from_url(&path)
            } else {
                title
            };

            Parsed::Row(RecordRow {
                line,
                title,
                path,
                assignee: non_empty(cell(&row, 2)),
                description: cell(&row, 4).to_string(),
            })
        })
        .collect()
}

/// One URL per line. Lines starting with `#` are treated as comments.
pub fn url_rows(text: &str) -> Vec<Parsed<UrlRow>> {
    text.lines()
        .enumerate()
        .map(|(idx, raw)| {
            let line = idx + 1;
            let candidate = raw.trim();
            if candidate.is_empty() {
                Parsed::Skip {
                    line,
                    reason: SkipReason::Blank,
                }
            } else if candidate.starts_with('#') {
                Parsed::Skip {
                    line,
                    reason: SkipReason::Header,
                }
            } else if is_http_url(candidate) {
                Parsed::Row(UrlRow {
                    line,
                    url: candidate.to_string(),
                })
            } else {
                Parsed::Skip {
                    line,
                    reason: SkipReason::NotAUrl,
                }
            }
        })
        .collect()
}
