//! Title, summary, and tag derivation from raw file content.

use std::collections::BTreeSet;

use crate::config::ExtractionSection;
use crate::types::FileKind;

const ELLIPSIS: &str = "...";
const SCRIPT_SUMMARY_LINES: usize = 3;

/// Content keywords (matched case-insensitively) and the tag each implies.
const KEYWORD_TAGS: &[(&[&str], &str)] = &[
    (&["kubectl", "kubeadm"], "kubernetes"),
    (&["docker", "containerd"], "containers"),
    (&["prometheus", "grafana"], "monitoring"),
    (&["flannel", "cni"], "networking"),
    (&["jellyfin"], "jellyfin"),
    (&["deploy", "install"], "deployment"),
    (&["fix", "troubleshoot"], "troubleshooting"),
];

/// Well-known directory names that imply extra tags.
const PATH_ALIAS_TAGS: &[(&str, &[&str])] = &[
    ("docs", &["documentation"]),
    ("ansible", &["ansible", "automation"]),
    ("manifests", &["kubernetes", "manifests"]),
    ("jellyfin", &["jellyfin", "media"]),
    ("network", &["networking"]),
    ("cni", &["networking"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub summary: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentSummarizer {
    summary_max_chars: usize,
    title_scan_lines: usize,
}

impl Default for ContentSummarizer {
    fn default() -> Self {
        Self::new(&ExtractionSection::default())
    }
}

impl ContentSummarizer {
    pub fn new(config: &ExtractionSection) -> Self {
        Self {
            summary_max_chars: config.summary_max_chars,
            title_scan_lines: config.title_scan_lines,
        }
    }

    pub fn summarize(&self, path: &str, kind: FileKind, content: &str) -> Summary {
        let title = self
            .extract_title(kind, content)
            .unwrap_or_else(|| file_stem(path).to_string());
        let summary = extract_summary(kind, content).map_or_else(
            || kind.fallback_summary().to_string(),
            |s| truncate_summary(&s, self.summary_max_chars),
        );
        Summary {
            title,
            summary,
            tags: extract_tags(path, kind, content),
        }
    }

    fn extract_title(&self, kind: FileKind, content: &str) -> Option<String> {
        let mut candidates = non_empty_lines(content).take(self.title_scan_lines);
        let title = match kind {
            FileKind::Doc => candidates.find_map(markdown_heading),
            FileKind::Script => candidates.find_map(|line| {
                if line.starts_with("#!") {
                    return None;
                }
                comment_text(line).filter(|text| !text.is_empty())
            }),
            _ => None,
        };
        title.map(str::to_string)
    }
}

fn extract_summary(kind: FileKind, content: &str) -> Option<String> {
    let text = match kind {
        FileKind::Doc => doc_summary(content),
        FileKind::Script => script_summary(content),
        FileKind::Todo => leading_lines(content, 3),
        FileKind::Config | FileKind::Template => leading_lines(content, 2),
    };
    text.filter(|s| !s.is_empty())
}

/// First prose line after a heading, skipping fenced code.
fn doc_summary(content: &str) -> Option<String> {
    let mut seen_heading = false;
    let mut in_fence = false;
    let mut opening: Vec<&str> = Vec::new();
    for line in content.lines().map(str::trim) {
        if line.starts_with("```") || line.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || line.is_empty() {
            continue;
        }
        if markdown_heading(line).is_some() {
            seen_heading = true;
            continue;
        }
        if seen_heading {
            return Some(line.to_string());
        }
        if opening.len() < 2 {
            opening.push(line);
        }
    }

    // No prose after a heading: fall back to the prose before it, if any.
    (!opening.is_empty()).then(|| opening.join(" "))
}

/// Contiguous leading comment block, shebang excluded.
fn script_summary(content: &str) -> Option<String> {
    let mut lines = content.lines().map(str::trim).peekable();
    if lines.peek().is_some_and(|line| line.starts_with("#!")) {
        lines.next();
    }
    let comments: Vec<&str> = lines
        .skip_while(|line| line.is_empty())
        .map_while(comment_text)
        .filter(|text| !text.is_empty())
        .take(SCRIPT_SUMMARY_LINES)
        .collect();
    (!comments.is_empty()).then(|| comments.join(" "))
}

fn leading_lines(content: &str, count: usize) -> Option<String> {
    let lines: Vec<&str> = non_empty_lines(content).take(count).collect();
    (!lines.is_empty()).then(|| lines.join(" "))
}

fn extract_tags(path: &str, kind: FileKind, content: &str) -> Vec<String> {
    let mut tags = BTreeSet::new();

    for segment in directory_segments(path) {
        let segment = segment.to_lowercase();
        if let Some((_, aliases)) = PATH_ALIAS_TAGS.iter().find(|(dir, _)| *dir == segment) {
            tags.extend(aliases.iter().map(|alias| (*alias).to_string()));
        }
        tags.insert(segment);
    }

    let lower = content.to_lowercase();
    for (keywords, tag) in KEYWORD_TAGS {
        if keywords.iter().any(|keyword| lower.contains(keyword)) {
            tags.insert((*tag).to_string());
        }
    }

    tags.insert(kind.as_str().to_string());
    tags.into_iter().collect()
}

/// Directory names of a relative path, skipping `.`/`..` and dotted names.
fn directory_segments(path: &str) -> impl Iterator<Item = &str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    segments
        .into_iter()
        .filter(|segment| !segment.is_empty() && !segment.contains('.'))
}

/// Truncate to `max_chars` characters, appending an ellipsis when cut.
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{ELLIPSIS}", text[..cut].trim_end()),
    }
}

fn non_empty_lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Heading text of a markdown ATX heading (`#` to `######` plus whitespace).
fn markdown_heading(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

/// Text of a `#` comment line, or `None` when the line is not a comment.
fn comment_text(line: &str) -> Option<&str> {
    line.starts_with('#')
        .then(|| line.trim_start_matches('#').trim())
}

fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
