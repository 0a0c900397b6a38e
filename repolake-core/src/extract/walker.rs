use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::{Instant, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::RepolakeConfig;
use crate::error::{ExtractError, Result};
use crate::progress::ProgressReporter;
use crate::types::{ExtractWarning, FileKind, Node, NodeId, RawReference, SkipReason};

use super::classify::classify;
use super::references::ReferenceScanner;
use super::summarize::ContentSummarizer;

/// Directory and file names never descended into or indexed.
const EXCLUDED_NAMES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    ".next",
    "out",
    "coverage",
    "__pycache__",
];

const EXCLUDED_GLOBS: &[&str] = &["*.pyc", "*.log", "*.tmp", "*.bak"];

/// Everything collected in one pass over the tree, before resolution.
#[derive(Debug, Default)]
pub struct WalkOutput {
    pub nodes: Vec<Node>,
    /// Unresolved reference candidates keyed by the source node.
    pub raw_references: BTreeMap<NodeId, Vec<RawReference>>,
    pub warnings: Vec<ExtractWarning>,
}

impl WalkOutput {
    pub fn raw_reference_count(&self) -> usize {
        self.raw_references.values().map(Vec::len).sum()
    }
}

/// Depth-first file tree walker producing nodes and raw references.
#[derive(Debug)]
pub struct DirectoryWalker {
    root: PathBuf,
    follow_links: bool,
    max_file_bytes: u64,
    exclude: Vec<glob::Pattern>,
    output_path: String,
    summarizer: ContentSummarizer,
    scanner: ReferenceScanner,
}

impl DirectoryWalker {
    pub fn new(root: &Path, config: &RepolakeConfig) -> Self {
        let extraction = &config.extraction;
        let exclude = EXCLUDED_GLOBS
            .iter()
            .copied()
            .chain(extraction.exclude_patterns.iter().map(String::as_str))
            .filter_map(|pattern| match glob::Pattern::new(pattern) {
                Ok(p) => Some(p),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            root: root.to_path_buf(),
            follow_links: extraction.follow_links,
            max_file_bytes: extraction.max_file_bytes,
            exclude,
            output_path: config.output_relative_path(),
            summarizer: ContentSummarizer::new(extraction),
            scanner: ReferenceScanner::new(extraction),
        }
    }

    /// Walk the tree once. A root that is missing, not a directory or cannot be
    /// listed is fatal. Everything below the root only produces warnings.
    #[instrument(skip_all, name = "walk", fields(root = %self.root.display()))]
    pub fn walk(&self, reporter: &dyn ProgressReporter) -> Result<WalkOutput> {
        let start = Instant::now();
        self.check_root()?;

        let mut output = WalkOutput::default();
        let mut visited: HashSet<String> = HashSet::new();

        reporter.start("Scanning files", None);
        let entries = WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_excluded(entry.file_name()));

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err.depth() == 0 {
                        reporter.finish();
                        return Err(ExtractError::Io {
                            path: self.root.clone(),
                            source: std::io::Error::from(err),
                        }
                        .into());
                    }
                    let path = err
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    let reason = if err.loop_ancestor().is_some() {
                        SkipReason::Loop
                    } else if path.is_dir() {
                        SkipReason::Directory(err.to_string())
                    } else {
                        SkipReason::Io(std::io::Error::from(err))
                    };
                    record_warning(&mut output, path, reason);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                if entry.path_is_symlink() {
                    debug!(path = %entry.path().display(), "Symlink not followed");
                }
                continue;
            }
            reporter.advance(1);

            let relative = relative_path(entry.path().strip_prefix(&self.root).unwrap_or(entry.path()));
            if !visited.insert(relative.clone()) {
                debug!(path = %relative, "Already processed, skipping");
                continue;
            }
            if relative == self.output_path {
                debug!(path = %relative, "Skipping previous output document");
                continue;
            }
            let Some(kind) = classify(&relative) else {
                debug!(path = %relative, "Unclassified, skipping");
                continue;
            };

            match self.process_file(entry.path(), &relative, kind) {
                Ok((node, refs)) => {
                    debug!(path = %relative, kind = %kind, refs = refs.len(), "Indexed file");
                    output.raw_references.insert(node.id.clone(), refs);
                    output.nodes.push(node);
                }
                Err(reason) => record_warning(&mut output, entry.path().to_path_buf(), reason),
            }
        }
        if !output.warnings.is_empty() {
            reporter.message(&format!("Skipped entries: {}", output.warnings.len()));
        }
        reporter.finish();

        info!(
            nodes = output.nodes.len(),
            raw_references = output.raw_reference_count(),
            warnings = output.warnings.len(),
            duration = ?start.elapsed(),
            "Walk complete"
        );
        Ok(output)
    }

    fn check_root(&self) -> Result<()> {
        let io_error = |source| ExtractError::Io {
            path: self.root.clone(),
            source,
        };
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {
                std::fs::read_dir(&self.root).map_err(io_error)?;
                Ok(())
            }
            Ok(_) => Err(ExtractError::NotADirectory(self.root.clone()).into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ExtractError::RootNotFound(self.root.clone()).into())
            }
            Err(source) => Err(io_error(source).into()),
        }
    }

    fn is_excluded(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        name.starts_with('.')
            || EXCLUDED_NAMES.contains(&name.as_ref())
            || self.exclude.iter().any(|pattern| pattern.matches(&name))
    }

    fn process_file(
        &self,
        path: &Path,
        relative: &str,
        kind: FileKind,
    ) -> std::result::Result<(Node, Vec<RawReference>), SkipReason> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > self.max_file_bytes {
            return Err(SkipReason::Oversized {
                size: metadata.len(),
                limit: self.max_file_bytes,
            });
        }

        let bytes = std::fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|_| SkipReason::Binary)?;
        if content.contains('\0') {
            return Err(SkipReason::Binary);
        }
        if content.trim().is_empty() {
            return Err(SkipReason::Empty);
        }

        let summary = self.summarizer.summarize(relative, kind, &content);
        let last_modified: DateTime<Utc> = metadata
            .modified()
            .unwrap_or(UNIX_EPOCH)
            .into();

        let node = Node {
            id: NodeId::from_path(relative),
            path: relative.to_string(),
            kind,
            title: summary.title,
            summary: summary.summary,
            size_bytes: metadata.len(),
            tags: summary.tags,
            last_modified,
            lines: content.lines().count(),
        };
        let refs = self.scanner.scan(&content, relative);
        Ok((node, refs))
    }
}

fn record_warning(output: &mut WalkOutput, path: PathBuf, reason: SkipReason) {
    if matches!(reason, SkipReason::Empty) {
        debug!(path = %path.display(), "Skipping empty file");
    } else {
        warn!(path = %path.display(), reason = %reason, "Skipping");
    }
    output.warnings.push(ExtractWarning { path, reason });
}

/// Repository-relative path with `/` separators and no leading `./`.
fn relative_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopReporter;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn walk(root: &Path) -> WalkOutput {
        DirectoryWalker::new(root, &RepolakeConfig::default())
            .walk(&NoopReporter)
            .unwrap()
    }

    fn paths(output: &WalkOutput) -> Vec<&str> {
        output.nodes.iter().map(|n| n.path.as_str()).collect()
    }

    #[test]
    fn indexes_classified_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "deploy.sh", "#!/bin/bash\n# Deploy\n./scripts/setup.sh\n");
        write(tmp.path(), "scripts/setup.sh", "echo setup\n");
        write(tmp.path(), "src/main.rs", "fn main() {}\n");

        let output = walk(tmp.path());
        assert_eq!(paths(&output), vec!["deploy.sh", "scripts/setup.sh"]);

        let deploy = &output.nodes[0];
        assert_eq!(deploy.id, NodeId::from_path("deploy.sh"));
        assert_eq!(deploy.kind, FileKind::Script);
        assert_eq!(deploy.lines, 3);
        assert_eq!(deploy.title, "Deploy");

        let refs = &output.raw_references[&deploy.id];
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target_path, "scripts/setup.sh");
    }

    #[test]
    fn excluded_directories_and_patterns_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "README.md", "# Root\n\nHello.\n");
        for dir in ["node_modules", "dist", "build", ".next", "out", "coverage", ".hidden"] {
            write(tmp.path(), &format!("{dir}/notes.md"), "# Skip\n\nme\n");
        }
        write(tmp.path(), "docs/build/nested.md", "# Nested\n\nskip\n");
        write(tmp.path(), "docs/debug.log", "log line\n");
        write(tmp.path(), "docs/old.md.bak", "# Old\n");

        let output = walk(tmp.path());
        assert_eq!(paths(&output), vec!["README.md"]);
    }

    #[test]
    fn empty_lock_and_binary_files_produce_no_nodes() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "empty.md", "   \n\n");
        write(tmp.path(), "package-lock.json", "{\"lockfileVersion\": 3}");
        std::fs::write(tmp.path().join("blob.md"), [0xff, 0xfe, 0x00, 0x01]).unwrap();
        write(tmp.path(), "ok.md", "# Ok\n\nFine.\n");

        let output = walk(tmp.path());
        assert_eq!(paths(&output), vec!["ok.md"]);
        assert!(output
            .warnings
            .iter()
            .any(|w| matches!(w.reason, SkipReason::Empty)));
        assert!(output
            .warnings
            .iter()
            .any(|w| matches!(w.reason, SkipReason::Binary)));
    }

    #[test]
    fn oversized_files_are_skipped_with_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "big.md", &"x".repeat(64));
        let mut config = RepolakeConfig::default();
        config.extraction.max_file_bytes = 16;

        let output = DirectoryWalker::new(tmp.path(), &config)
            .walk(&NoopReporter)
            .unwrap();
        assert!(output.nodes.is_empty());
        assert!(matches!(
            output.warnings[0].reason,
            SkipReason::Oversized { size: 64, limit: 16 }
        ));
    }

    #[test]
    fn previous_output_document_is_not_indexed() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "public/data/repo_index.json", "{\"nodes\": []}");
        write(tmp.path(), "public/data/other.json", "{\"a\": 1}");

        let output = walk(tmp.path());
        assert_eq!(paths(&output), vec!["public/data/other.json"]);
    }

    #[test]
    fn custom_exclude_patterns_apply_per_segment() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "vendor/lib.md", "# Vendor\n\nx\n");
        write(tmp.path(), "keep.md", "# Keep\n\nx\n");
        let mut config = RepolakeConfig::default();
        config.extraction.exclude_patterns = vec!["vendor".into()];

        let output = DirectoryWalker::new(tmp.path(), &config)
            .walk(&NoopReporter)
            .unwrap();
        assert_eq!(paths(&output), vec!["keep.md"]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = DirectoryWalker::new(&missing, &RepolakeConfig::default())
            .walk(&NoopReporter)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::RepolakeError::Extract(ExtractError::RootNotFound(_))
        ));
    }

    #[test]
    fn file_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.md", "# A\n");
        let err = DirectoryWalker::new(&tmp.path().join("a.md"), &RepolakeConfig::default())
            .walk(&NoopReporter)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::RepolakeError::Extract(ExtractError::NotADirectory(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_terminate_without_duplicates() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/guide.md", "# Guide\n\nText.\n");
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("docs/loop")).unwrap();
        let mut config = RepolakeConfig::default();
        config.extraction.follow_links = true;

        let output = DirectoryWalker::new(tmp.path(), &config)
            .walk(&NoopReporter)
            .unwrap();
        assert_eq!(paths(&output), vec!["docs/guide.md"]);
        assert!(output
            .warnings
            .iter()
            .any(|w| matches!(w.reason, SkipReason::Loop)));
    }

    /// Restricts `dir` to `mode`. Returns false when the directory is still
    /// listable afterwards (running as root), restoring the mode first.
    #[cfg(unix)]
    fn restrict(dir: &Path, mode: u32) -> bool {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode)).unwrap();
        if std::fs::read_dir(dir).is_ok() {
            restore(dir);
            return false;
        }
        true
    }

    #[cfg(unix)]
    fn restore(dir: &Path) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_root_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        write(&root, "a.md", "# A\n\nText.\n");
        if !restrict(&root, 0o333) {
            return;
        }

        let result = DirectoryWalker::new(&root, &RepolakeConfig::default()).walk(&NoopReporter);
        restore(&root);
        assert!(matches!(
            result,
            Err(crate::error::RepolakeError::Extract(ExtractError::Io { .. }))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unlistable_subdirectory_is_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "README.md", "# Root\n\nHello.\n");
        write(tmp.path(), "locked/secret.md", "# Secret\n\nHidden.\n");
        write(tmp.path(), "zeta/notes.md", "# Notes\n\nVisible.\n");
        let locked = tmp.path().join("locked");
        if !restrict(&locked, 0o000) {
            return;
        }

        let output = walk(tmp.path());
        restore(&locked);
        assert_eq!(paths(&output), vec!["README.md", "zeta/notes.md"]);
        assert!(output
            .warnings
            .iter()
            .any(|w| w.path == locked && matches!(w.reason, SkipReason::Directory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_indexed_by_default() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/real.md", "# Real\n\nShared runbook.\n");
        std::os::unix::fs::symlink(
            tmp.path().join("docs/real.md"),
            tmp.path().join("docs/link.md"),
        )
        .unwrap();

        let output = walk(tmp.path());
        assert_eq!(paths(&output), vec!["docs/link.md", "docs/real.md"]);
        assert_eq!(output.nodes[0].title, "Real");
    }

    #[derive(Default)]
    struct RecordingReporter {
        messages: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingReporter {
        fn start(&self, _task: &str, _total: Option<u64>) {}
        fn advance(&self, _amount: u64) {}
        fn finish(&self) {}
        fn message(&self, msg: &str) {
            self.messages.lock().unwrap().push(msg.to_string());
        }
    }

    #[test]
    fn skipped_entries_are_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "ok.md", "# Ok\n\nFine.\n");
        write(tmp.path(), "empty.md", "\n");
        let reporter = RecordingReporter::default();

        DirectoryWalker::new(tmp.path(), &RepolakeConfig::default())
            .walk(&reporter)
            .unwrap();
        assert_eq!(*reporter.messages.lock().unwrap(), vec!["Skipped entries: 1"]);

        let clean = tempfile::tempdir().unwrap();
        write(clean.path(), "ok.md", "# Ok\n\nFine.\n");
        let reporter = RecordingReporter::default();
        DirectoryWalker::new(clean.path(), &RepolakeConfig::default())
            .walk(&reporter)
            .unwrap();
        assert!(reporter.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        assert_eq!(relative_path(Path::new("./a/b/c.md")), "a/b/c.md");
        assert_eq!(relative_path(Path::new("c.md")), "c.md");
    }
}
