use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info};

use crate::types::{Edge, Node, NodeId, RawReference, Relation};

/// Resolves raw reference candidates against the complete node index.
///
/// Lookup order for a target string:
/// 1. exact basename,
/// 2. exact repository-relative path,
/// 3. first indexed path (in sorted order) containing the target.
///
/// Step 3 is deliberately loose: `a.sh` will match `scripts/banana.sh` when
/// nothing closer exists.
#[derive(Debug)]
pub struct EdgeResolver {
    order: Vec<NodeId>,
    by_path: BTreeMap<String, NodeId>,
    by_name: HashMap<String, (String, NodeId)>,
}

impl EdgeResolver {
    pub fn new(nodes: &[Node]) -> Self {
        let mut by_path = BTreeMap::new();
        let mut by_name: HashMap<String, (String, NodeId)> = HashMap::new();

        for node in nodes {
            by_path.insert(node.path.clone(), node.id.clone());

            let name = node.path.rsplit('/').next().unwrap_or(&node.path);
            // Shared basenames bind to the shortest path, then the smallest.
            let replace = by_name.get(name).is_none_or(|(existing, _)| {
                (node.path.len(), &node.path) < (existing.len(), existing)
            });
            if replace {
                by_name.insert(name.to_string(), (node.path.clone(), node.id.clone()));
            }
        }

        Self {
            order: nodes.iter().map(|n| n.id.clone()).collect(),
            by_path,
            by_name,
        }
    }

    pub fn resolve_target(&self, target: &str) -> Option<&NodeId> {
        if let Some((_, id)) = self.by_name.get(target) {
            return Some(id);
        }
        if let Some(id) = self.by_path.get(target) {
            return Some(id);
        }
        self.by_path
            .iter()
            .find(|(path, _)| path.contains(target))
            .map(|(_, id)| id)
    }

    /// Turn raw references into validated edges.
    ///
    /// Sources are visited in node order. Self-edges, unknown sources, and
    /// unresolvable targets are dropped; repeated `(from, to, relation)`
    /// triples keep only the first context.
    pub fn resolve(&self, raw_references: &BTreeMap<NodeId, Vec<RawReference>>) -> Vec<Edge> {
        let mut edges = Vec::new();
        let mut seen: HashSet<(NodeId, NodeId, Relation)> = HashSet::new();
        let mut unresolved = 0usize;

        for from in &self.order {
            let Some(refs) = raw_references.get(from) else {
                continue;
            };
            for raw in refs {
                let Some(to) = self.resolve_target(&raw.target_path) else {
                    unresolved += 1;
                    debug!(from = %from, target = %raw.target_path, "Unresolved reference");
                    continue;
                };
                if to == from {
                    continue;
                }
                if !seen.insert((from.clone(), to.clone(), raw.relation)) {
                    continue;
                }
                edges.push(Edge {
                    from: from.clone(),
                    to: to.clone(),
                    relation: raw.relation,
                    context: raw.context.clone(),
                });
            }
        }

        info!(edges = edges.len(), unresolved, "Resolved references");
        edges
    }
}

/// Resolve all raw references collected during a walk.
pub fn resolve(nodes: &[Node], raw_references: &BTreeMap<NodeId, Vec<RawReference>>) -> Vec<Edge> {
    EdgeResolver::new(nodes).resolve(raw_references)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileKind;
    use chrono::Utc;

    fn node(path: &str) -> Node {
        Node {
            id: NodeId::from_path(path),
            path: path.to_string(),
            kind: FileKind::Script,
            title: path.to_string(),
            summary: String::new(),
            size_bytes: 1,
            tags: vec![],
            last_modified: Utc::now(),
            lines: 1,
        }
    }

    fn raw(target: &str, relation: Relation) -> RawReference {
        RawReference {
            target_path: target.to_string(),
            relation,
            context: format!("line mentioning {target}"),
        }
    }

    fn refs_from(
        source: &str,
        targets: &[(&str, Relation)],
    ) -> BTreeMap<NodeId, Vec<RawReference>> {
        let mut map = BTreeMap::new();
        map.insert(
            NodeId::from_path(source),
            targets.iter().map(|(t, r)| raw(t, *r)).collect(),
        );
        map
    }

    #[test]
    fn resolves_by_full_path() {
        let nodes = vec![node("deploy.sh"), node("scripts/setup.sh")];
        let edges = resolve(
            &nodes,
            &refs_from("deploy.sh", &[("scripts/setup.sh", Relation::Calls)]),
        );
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from, NodeId::from_path("deploy.sh"));
        assert_eq!(edges[0].to, NodeId::from_path("scripts/setup.sh"));
        assert_eq!(edges[0].relation, Relation::Calls);
    }

    #[test]
    fn basename_match_comes_first() {
        let nodes = vec![node("README.md"), node("docs/setup.md")];
        let edges = resolve(
            &nodes,
            &refs_from("README.md", &[("setup.md", Relation::Mentions)]),
        );
        assert_eq!(edges[0].to, NodeId::from_path("docs/setup.md"));
    }

    #[test]
    fn shared_basename_binds_to_shortest_path() {
        let nodes = vec![node("b/a.sh"), node("a.sh"), node("c.md")];
        let edges = resolve(&nodes, &refs_from("c.md", &[("a.sh", Relation::Mentions)]));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, NodeId::from_path("a.sh"));
    }

    #[test]
    fn substring_fallback_is_loose() {
        // Known-loose heuristic: `a.sh` is contained in `scripts/banana.sh`.
        let nodes = vec![node("run.md"), node("scripts/banana.sh")];
        let edges = resolve(&nodes, &refs_from("run.md", &[("a.sh", Relation::Calls)]));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].to, NodeId::from_path("scripts/banana.sh"));
    }

    #[test]
    fn unresolved_and_self_references_are_dropped() {
        let nodes = vec![node("deploy.sh"), node("other.sh")];
        let edges = resolve(
            &nodes,
            &refs_from(
                "deploy.sh",
                &[
                    ("missing.sh", Relation::Calls),
                    ("deploy.sh", Relation::Calls),
                ],
            ),
        );
        assert!(edges.is_empty());
    }

    #[test]
    fn unknown_sources_are_ignored() {
        let nodes = vec![node("a.sh")];
        let edges = resolve(&nodes, &refs_from("ghost.sh", &[("a.sh", Relation::Calls)]));
        assert!(edges.is_empty());
    }

    #[test]
    fn duplicate_triples_keep_first_context() {
        let nodes = vec![node("deploy.sh"), node("setup.sh")];
        let mut raw_refs = refs_from(
            "deploy.sh",
            &[
                ("setup.sh", Relation::Calls),
                ("setup.sh", Relation::Calls),
                ("setup.sh", Relation::Mentions),
            ],
        );
        raw_refs.get_mut(&NodeId::from_path("deploy.sh")).unwrap()[1].context = "second".into();

        let edges = resolve(&nodes, &raw_refs);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].context, "line mentioning setup.sh");
        assert_eq!(edges[1].relation, Relation::Mentions);
    }
}
