use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ── Node identity ──────────────────────────────────────────────────

/// Number of digest bytes kept in a node id (rendered as 8 hex characters).
const NODE_ID_BYTES: usize = 4;

/// Stable node identifier derived from a repository-relative path.
///
/// The id depends only on the path string, never on file content, so the
/// same layout always yields the same ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn from_path(relative_path: &str) -> Self {
        let digest = Sha256::digest(relative_path.as_bytes());
        let mut id = String::with_capacity(NODE_ID_BYTES * 2);
        for byte in &digest[..NODE_ID_BYTES] {
            let _ = write!(id, "{byte:02x}");
        }
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── File kinds ─────────────────────────────────────────────────────

/// Coarse category assigned to a file by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Shell script (`.sh`, `.bash`).
    Script,
    /// Prose documentation (markdown, text, reStructuredText, READMEs).
    Doc,
    /// Configuration or manifest (YAML, JSON, TOML, INI, ...).
    Config,
    /// TODO list.
    Todo,
    /// Template (`.j2` or anything named like a template).
    Template,
}

impl FileKind {
    pub const ALL: [Self; 5] = [
        Self::Script,
        Self::Doc,
        Self::Config,
        Self::Todo,
        Self::Template,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Doc => "doc",
            Self::Config => "config",
            Self::Todo => "todo",
            Self::Template => "template",
        }
    }

    /// Summary used when a file has no qualifying text of its own.
    pub fn fallback_summary(&self) -> &'static str {
        match self {
            Self::Script => "Shell script",
            Self::Doc => "Documentation file",
            Self::Config => "Configuration file",
            Self::Todo => "Project TODO items and tasks",
            Self::Template => "Template file",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("Unknown file type: {s}. Use: script, doc, config, todo, template")
            })
    }
}

// ── Relations ──────────────────────────────────────────────────────

/// Kind of a directed relationship, in decreasing order of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// A script invocation (`./setup.sh`).
    Calls,
    /// A markdown link or a YAML filename.
    References,
    /// Any other bare filename mention.
    Mentions,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::References => "references",
            Self::Mentions => "mentions",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Graph records ──────────────────────────────────────────────────

/// One classified, summarized repository file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Repository-relative path with `/` separators.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub title: String,
    pub summary: String,
    pub size_bytes: u64,
    /// Lower-case, duplicate-free.
    pub tags: Vec<String>,
    #[serde(with = "iso_millis")]
    pub last_modified: DateTime<Utc>,
    pub lines: usize,
}

/// A resolved directed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub relation: Relation,
    /// Source line that produced the match. Display only.
    pub context: String,
}

/// A textual mention of another file, not yet resolved against the node index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub target_path: String,
    pub relation: Relation,
    pub context: String,
}

// ── Graph document ─────────────────────────────────────────────────

/// The serialized output consumed by the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub metadata: GraphMetadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    #[serde(with = "iso_millis")]
    pub extracted_at: DateTime<Utc>,
    pub repo_path: String,
    pub total_files: usize,
    pub edge_count: usize,
    pub version: String,
    pub stats: GraphStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub by_type: BTreeMap<FileKind, usize>,
    pub total_size: u64,
    pub average_size: u64,
}

// ── Extraction diagnostics ─────────────────────────────────────────

/// Why a file or directory was left out of the graph.
#[derive(thiserror::Error, Debug)]
pub enum SkipReason {
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is {size} bytes, over the {limit} byte ceiling")]
    Oversized { size: u64, limit: u64 },

    #[error("content is not UTF-8 text")]
    Binary,

    #[error("file is empty")]
    Empty,

    #[error("directory could not be listed: {0}")]
    Directory(String),

    #[error("filesystem loop detected")]
    Loop,
}

/// A recoverable per-file or per-directory problem recorded during a walk.
#[derive(Debug)]
pub struct ExtractWarning {
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl std::fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

// ── Serde helpers ──────────────────────────────────────────────────

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_eight_hex_chars() {
        let id = NodeId::from_path("scripts/setup.sh");
        assert_eq!(id.as_str().len(), 8);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn node_id_depends_only_on_path() {
        assert_eq!(
            NodeId::from_path("docs/guide.md"),
            NodeId::from_path("docs/guide.md")
        );
        assert_ne!(
            NodeId::from_path("docs/guide.md"),
            NodeId::from_path("docs/guide2.md")
        );
    }

    #[test]
    fn file_kind_parses_case_insensitively() {
        assert_eq!("Script".parse::<FileKind>(), Ok(FileKind::Script));
        assert_eq!("todo".parse::<FileKind>(), Ok(FileKind::Todo));
        assert!("binary".parse::<FileKind>().is_err());
    }

    #[test]
    fn node_serializes_with_frontend_field_names() {
        let node = Node {
            id: NodeId::from_path("README.md"),
            path: "README.md".into(),
            kind: FileKind::Doc,
            title: "Readme".into(),
            summary: "Intro".into(),
            size_bytes: 12,
            tags: vec!["doc".into()],
            last_modified: DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            lines: 2,
        };

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "doc");
        assert_eq!(json["sizeBytes"], 12);
        assert_eq!(json["lastModified"], "2025-01-15T10:00:00.000Z");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn stats_keys_serialize_as_type_names() {
        let mut stats = GraphStats::default();
        stats.by_type.insert(FileKind::Script, 3);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["byType"]["script"], 3);
        assert_eq!(json["averageSize"], 0);
    }

    #[test]
    fn edge_snapshot() {
        let edge = Edge {
            from: NodeId::from_path("deploy.sh"),
            to: NodeId::from_path("scripts/setup.sh"),
            relation: Relation::Calls,
            context: "./scripts/setup.sh".into(),
        };
        insta::assert_json_snapshot!(edge, @r#"
        {
          "from": "30883d1d",
          "to": "ce435f38",
          "relation": "calls",
          "context": "./scripts/setup.sh"
        }
        "#);
    }
}
