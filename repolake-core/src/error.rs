use std::path::PathBuf;

/// Top-level repolake error type.
///
/// Only structural failures surface here. Per-file and per-directory problems
/// are collected as [`crate::types::ExtractWarning`] values and never abort a
/// run. Each variant wraps a domain-specific enum so callers can match on the
/// error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum RepolakeError {
    /// Error while walking the file tree.
    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error writing the graph document.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Error answering a query against a saved document.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Fatal errors during extraction.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The root path does not exist.
    #[error("Root path not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The root path exists but is not a directory.
    #[error("Root path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The root directory itself could not be inspected.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors in configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the given path.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file could not be read or parsed.
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

/// Errors while writing the graph document to disk.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// The output directory could not be created.
    #[error("Cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized or parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing or persisting the output file failed.
    #[error("Cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A saved document could not be read back.
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from queries over a loaded graph document.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    /// No node has the given id or path.
    #[error("Node not found: {0}")]
    NodeNotFound(String),
}

/// Convenience alias for `Result<T, RepolakeError>`.
pub type Result<T> = std::result::Result<T, RepolakeError>;
