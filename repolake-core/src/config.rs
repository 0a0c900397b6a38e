use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Name of the optional config file looked up in the scanned root.
pub const CONFIG_FILE_NAME: &str = "repolake.toml";

/// Top-level repolake configuration, matching `repolake.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepolakeConfig {
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// Files larger than this are skipped with a warning.
    pub max_file_bytes: u64,
    pub summary_max_chars: usize,
    pub context_max_chars: usize,
    /// Non-empty lines searched for a title.
    pub title_scan_lines: usize,
    /// Extra glob patterns, matched against every path segment.
    pub exclude_patterns: Vec<String>,
    /// Follow symlinked files and directories. Loops are detected.
    pub follow_links: bool,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            summary_max_chars: 200,
            context_max_chars: 100,
            title_scan_lines: 20,
            exclude_patterns: Vec::new(),
            follow_links: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    /// Output document location, relative to the scanned root.
    pub path: PathBuf,
    pub pretty: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("public/data/repo_index.json"),
            pretty: true,
        }
    }
}

impl RepolakeConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Use `<root>/repolake.toml` when present, defaults otherwise.
    pub fn load_or_default(root: &Path) -> Result<Self, ConfigError> {
        let candidate = root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(
                "extraction.max_file_bytes must be greater than 0".into(),
            ));
        }
        if self.extraction.summary_max_chars == 0 {
            return Err(ConfigError::Invalid(
                "extraction.summary_max_chars must be greater than 0".into(),
            ));
        }
        if self.output.path.as_os_str().is_empty() || self.output.path.is_absolute() {
            return Err(ConfigError::Invalid(format!(
                "output.path must be a relative file path, got {:?}",
                self.output.path
            )));
        }
        if self
            .output
            .path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ConfigError::Invalid(format!(
                "output.path must stay inside the scanned root, got {:?}",
                self.output.path
            )));
        }
        for pattern in &self.extraction.exclude_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("bad exclude pattern {pattern:?}: {e}"))
            })?;
        }
        Ok(())
    }

    /// Output path with `/` separators, as it appears relative to the root.
    pub fn output_relative_path(&self) -> String {
        self.output
            .path
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
