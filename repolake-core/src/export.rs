//! Graph document assembly and persistence.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use chrono::Utc;
use tracing::info;

use crate::error::{OutputError, Result};
use crate::types::{Edge, GraphDocument, GraphMetadata, GraphStats, Node};

/// Aggregate nodes and edges into the document consumed by the renderer.
///
/// Pure aggregation: inputs are cloned, never modified.
pub fn export(nodes: &[Node], edges: &[Edge], root: &Path) -> GraphDocument {
    GraphDocument {
        metadata: GraphMetadata {
            extracted_at: Utc::now(),
            repo_path: root.display().to_string(),
            total_files: nodes.len(),
            edge_count: edges.len(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            stats: compute_stats(nodes),
        },
        nodes: nodes.to_vec(),
        edges: edges.to_vec(),
    }
}

pub fn compute_stats(nodes: &[Node]) -> GraphStats {
    let mut by_type = BTreeMap::new();
    let mut total_size = 0u64;
    for node in nodes {
        *by_type.entry(node.kind).or_insert(0) += 1;
        total_size += node.size_bytes;
    }
    let average_size = match u64::try_from(nodes.len()) {
        Ok(count) if count > 0 => (total_size + count / 2) / count,
        _ => 0,
    };
    GraphStats {
        by_type,
        total_size,
        average_size,
    }
}

/// Write the document atomically: serialize into a temp file next to the
/// destination, then rename over it. A failure leaves no partial output.
pub fn write_document(document: &GraphDocument, path: &Path, pretty: bool) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let json = if pretty {
        serde_json::to_vec_pretty(document)
    } else {
        serde_json::to_vec(document)
    }
    .map_err(OutputError::Serialization)?;

    let write_err = |source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&json).map_err(write_err)?;
    tmp.write_all(b"\n").map_err(write_err)?;
    set_document_mode(tmp.as_file(), path).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!(path = %path.display(), bytes = json.len(), "Wrote graph document");
    Ok(())
}

/// Temp files are created owner-only. Keep the mode of a document being
/// replaced, otherwise use 0644 like any other generated file.
#[cfg(unix)]
fn set_document_mode(file: &std::fs::File, target: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(target).map_or(0o644, |meta| meta.permissions().mode() & 0o777);
    file.set_permissions(std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_document_mode(_file: &std::fs::File, _target: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Read a previously written document.
pub fn load_document(path: &Path) -> Result<GraphDocument> {
    let raw = std::fs::read_to_string(path).map_err(|source| OutputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = serde_json::from_str(&raw).map_err(OutputError::Serialization)?;
    Ok(document)
}
