//! Heuristic reference detection.
//!
//! Each pattern class lives behind its own matcher so false positives can be
//! tuned independently. Matchers return the span of the matched target text;
//! a lower-priority class never re-emits a span or target that a higher one
//! already claimed on the same line.

use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::ExtractionSection;
use crate::types::{RawReference, Relation};

fn re_script_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:\./)?((?:[\w-]+/)*[\w-]+(?:\.[\w-]+)*\.sh)\b").expect("valid regex")
    })
}

fn re_markdown_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[[^\]]*\]\(\s*([^)\s#]+\.md)(?:#[^)\s]*)?\s*\)").expect("valid regex")
    })
}

fn re_yaml_file() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[\w-]+/)*[\w-]+(?:\.[\w-]+)*\.ya?ml\b").expect("valid regex")
    })
}

fn re_bare_mention() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[\w-]+/)*[\w-]+(?:\.[\w-]+)*\.(?:sh|md|ya?ml|json)\b")
            .expect("valid regex")
    })
}

/// A matcher hit: where the target text sits in the line, and the target path.
///
/// A hit without a target still claims its span (e.g. a link that climbs
/// above the repository root) but produces no reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Hit {
    span: Range<usize>,
    target: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    context_max_chars: usize,
}

impl Default for ReferenceScanner {
    fn default() -> Self {
        Self::new(&ExtractionSection::default())
    }
}

impl ReferenceScanner {
    pub fn new(config: &ExtractionSection) -> Self {
        Self {
            context_max_chars: config.context_max_chars,
        }
    }

    /// Scan `content` line by line for mentions of other files.
    ///
    /// `self_path` is the repository-relative path of the scanned file; it
    /// anchors relative markdown links and filters self-references.
    pub fn scan(&self, content: &str, self_path: &str) -> Vec<RawReference> {
        let self_name = self_path.rsplit('/').next().unwrap_or(self_path);
        let self_dir = self_path.rsplit_once('/').map_or("", |(dir, _)| dir);

        let mut refs = Vec::new();
        for line in content.lines() {
            let mut claimed: Vec<Range<usize>> = Vec::new();
            let mut emitted: HashSet<String> = HashSet::new();

            let classes: [(Relation, Vec<Hit>); 4] = [
                (Relation::Calls, match_script_calls(line)),
                (Relation::References, match_markdown_links(line, self_dir)),
                (Relation::References, match_yaml_files(line)),
                (Relation::Mentions, match_bare_mentions(line)),
            ];

            for (relation, hits) in classes {
                let mut class_spans = Vec::new();
                for hit in hits {
                    if claimed.iter().any(|span| overlaps(span, &hit.span)) {
                        continue;
                    }
                    class_spans.push(hit.span);
                    let Some(target) = hit.target else { continue };
                    if target == self_name || target == self_path || !emitted.insert(target.clone())
                    {
                        continue;
                    }
                    refs.push(RawReference {
                        target_path: target,
                        relation,
                        context: self.context(line),
                    });
                }
                claimed.extend(class_spans);
            }
        }
        refs
    }

    fn context(&self, line: &str) -> String {
        let line = line.trim();
        if self.context_max_chars == 0 {
            return line.to_string();
        }
        line.chars().take(self.context_max_chars).collect()
    }
}

/// `./name.sh`, `name.sh`, or `path/to/name.sh`; a leading `./` is dropped.
fn match_script_calls(line: &str) -> Vec<Hit> {
    re_script_call()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| Hit {
            span: m.range(),
            target: Some(m.as_str().to_string()),
        })
        .collect()
}

/// `[text](target.md)`, with relative targets resolved against `base_dir`.
fn match_markdown_links(line: &str, base_dir: &str) -> Vec<Hit> {
    re_markdown_link()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .filter(|m| !m.as_str().contains("://") && !m.as_str().starts_with("mailto:"))
        .map(|m| Hit {
            span: m.range(),
            target: resolve_link(base_dir, m.as_str()),
        })
        .collect()
}

/// Bare `name.yaml` / `name.yml` not embedded in a URL.
fn match_yaml_files(line: &str) -> Vec<Hit> {
    bare_hits(re_yaml_file(), line)
}

/// Any remaining filename with a recognized extension.
fn match_bare_mentions(line: &str) -> Vec<Hit> {
    bare_hits(re_bare_mention(), line)
}

fn bare_hits(re: &Regex, line: &str) -> Vec<Hit> {
    re.find_iter(line)
        .filter(|m| !inside_url(line, m.start()))
        .map(|m| Hit {
            span: m.range(),
            target: Some(m.as_str().to_string()),
        })
        .collect()
}

/// True when the whitespace-delimited token around `start` is a URL.
fn inside_url(line: &str, start: usize) -> bool {
    let token_start = line[..start]
        .rfind(char::is_whitespace)
        .map_or(0, |i| i + 1);
    line[token_start..start].contains("://")
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Join a link target onto the linking file's directory and normalize it.
///
/// Absolute targets (`/docs/x.md`) are taken as repository-root relative.
/// Returns `None` when the link climbs above the repository root.
fn resolve_link(base_dir: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let joined: Vec<&str> = if let Some(rooted) = target.strip_prefix('/') {
        rooted.split('/').collect()
    } else {
        base_dir.split('/').chain(target.split('/')).collect()
    };
    for segment in joined {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    (!segments.is_empty()).then(|| segments.join("/"))
}
