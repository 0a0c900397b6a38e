// Query helpers over a saved graph document: search, filtering, node connections.
//
// Used by the CLI `query` command.

use serde::Serialize;

use crate::error::QueryError;
use crate::types::{Edge, FileKind, GraphDocument, Node, NodeId};

/// Node filter: case-insensitive search term plus an optional type.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub search: Option<String>,
    pub kind: Option<FileKind>,
}

impl NodeFilter {
    pub fn matches(&self, node: &Node) -> bool {
        let kind_ok = self.kind.is_none_or(|kind| node.kind == kind);
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                node.title.to_lowercase().contains(&term)
                    || node.summary.to_lowercase().contains(&term)
                    || node.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
            }
        };
        kind_ok && search_ok
    }
}

pub fn filter_nodes<'a>(document: &'a GraphDocument, filter: &NodeFilter) -> Vec<&'a Node> {
    document.nodes.iter().filter(|n| filter.matches(n)).collect()
}

/// Find a node by id, or by exact repository-relative path.
pub fn find_node<'a>(document: &'a GraphDocument, key: &str) -> Result<&'a Node, QueryError> {
    document
        .nodes
        .iter()
        .find(|n| n.id.as_str() == key)
        .or_else(|| document.nodes.iter().find(|n| n.path == key))
        .ok_or_else(|| QueryError::NodeNotFound(key.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// An edge touching a node, paired with the node at the other end.
#[derive(Debug, Clone, Serialize)]
pub struct Connection<'a> {
    pub direction: Direction,
    pub edge: &'a Edge,
    pub other: &'a Node,
}

/// All edges into and out of `id`, in document order.
pub fn connections<'a>(document: &'a GraphDocument, id: &NodeId) -> Vec<Connection<'a>> {
    let lookup = |other: &NodeId| document.nodes.iter().find(|n| &n.id == other);
    document
        .edges
        .iter()
        .filter_map(|edge| {
            let (direction, other) = if &edge.from == id {
                (Direction::Outgoing, &edge.to)
            } else if &edge.to == id {
                (Direction::Incoming, &edge.from)
            } else {
                return None;
            };
            lookup(other).map(|other| Connection {
                direction,
                edge,
                other,
            })
        })
        .collect()
}
