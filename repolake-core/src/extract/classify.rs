//! Path-based file classification.
//!
//! Classification never opens the file: the kind is a pure function of the
//! path string. Rules are checked in a fixed order and the first match wins.

use crate::types::FileKind;

/// Lock files carry config extensions but are never indexed.
const LOCK_FILES: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "pnpm-lock.yaml",
    "composer.lock",
];

const DOC_EXTENSIONS: &[&str] = &["md", "txt", "rst"];
const CONFIG_EXTENSIONS: &[&str] = &["json", "conf", "config", "cfg", "toml", "ini"];

/// Classify a repository-relative path, or `None` when it should be skipped.
pub fn classify(path: &str) -> Option<FileKind> {
    let basename = basename(path);
    let lower_name = basename.to_ascii_lowercase();
    let ext = extension(&lower_name);

    if matches!(ext, Some("sh" | "bash")) {
        return Some(FileKind::Script);
    }
    if lower_name.starts_with("todo") || ext == Some("todo") {
        return Some(FileKind::Todo);
    }
    if ext.is_some_and(|e| DOC_EXTENSIONS.contains(&e)) || is_readme(&lower_name) {
        return Some(FileKind::Doc);
    }
    if matches!(ext, Some("yaml" | "yml")) {
        return (!is_lock_file(&lower_name)).then_some(FileKind::Config);
    }
    if ext.is_some_and(|e| CONFIG_EXTENSIONS.contains(&e)) {
        return (!is_lock_file(&lower_name)).then_some(FileKind::Config);
    }
    let lower_path = path.to_ascii_lowercase();
    if lower_path.contains(".j2") || lower_path.contains("template") {
        return Some(FileKind::Template);
    }
    None
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty()).then_some(ext)
}

fn is_readme(lower_name: &str) -> bool {
    lower_name == "readme" || lower_name.strip_prefix("readme.").is_some()
}

fn is_lock_file(lower_name: &str) -> bool {
    LOCK_FILES.contains(&lower_name)
}
