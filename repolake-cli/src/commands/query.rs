use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use repolake_core::export::load_document;
use repolake_core::query::{self, Connection, Direction, NodeFilter};
use repolake_core::types::{FileKind, GraphDocument, Node};

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Graph document written by an extraction run
    pub document: PathBuf,

    /// Case-insensitive term matched against title, summary and tags
    #[arg(long)]
    pub search: Option<String>,

    /// Only list nodes of this type: script, doc, config, todo, template
    #[arg(long = "type", value_name = "KIND")]
    pub kind: Option<FileKind>,

    /// Show one node (by id or path) and its connections
    #[arg(long, value_name = "ID|PATH")]
    pub node: Option<String>,

    /// Output format: text, json
    #[arg(long, default_value = "text")]
    pub format: String,
}

pub fn run(args: &QueryArgs) -> anyhow::Result<()> {
    let document = load_document(&args.document)
        .with_context(|| format!("Cannot read graph document: {}", args.document.display()))?;

    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => anyhow::bail!("Unknown format: {other} (expected text or json)"),
    };

    let rendered = if let Some(key) = &args.node {
        let node = query::find_node(&document, key)
            .map_err(repolake_core::error::RepolakeError::from)?;
        let connections = query::connections(&document, &node.id);
        if json {
            serde_json::to_string_pretty(&serde_json::json!({
                "node": node,
                "connections": connections,
            }))?
        } else {
            render_node(node, &connections)
        }
    } else {
        let filter = NodeFilter {
            search: args.search.clone(),
            kind: args.kind,
        };
        let nodes = query::filter_nodes(&document, &filter);
        if json {
            serde_json::to_string_pretty(&nodes)?
        } else {
            render_listing(&document, &nodes)
        }
    };

    println!("{}", rendered.trim_end());
    Ok(())
}

fn render_listing(document: &GraphDocument, nodes: &[&Node]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} of {} nodes match", nodes.len(), document.nodes.len());
    for node in nodes {
        let _ = writeln!(
            out,
            "  {}  {:<8} {}  {}",
            node.id,
            node.kind.as_str(),
            node.path,
            node.title
        );
    }
    out
}

fn render_node(node: &Node, connections: &[Connection<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {}", node.kind.as_str(), node.title);
    let _ = writeln!(out, "  Id:      {}", node.id);
    let _ = writeln!(out, "  Path:    {}", node.path);
    let _ = writeln!(out, "  Summary: {}", node.summary);
    let _ = writeln!(out, "  Tags:    {}", node.tags.join(", "));
    let _ = writeln!(
        out,
        "  Lines:   {}  Size: {}",
        node.lines,
        super::extract::format_bytes(node.size_bytes)
    );

    for (direction, heading) in [
        (Direction::Outgoing, "Outgoing"),
        (Direction::Incoming, "Incoming"),
    ] {
        let matching: Vec<_> = connections
            .iter()
            .filter(|c| c.direction == direction)
            .collect();
        let _ = writeln!(out);
        let _ = writeln!(out, "{heading} ({}):", matching.len());
        if matching.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for conn in matching {
            let _ = writeln!(
                out,
                "  {:<10} {}  \"{}\"",
                conn.edge.relation.as_str(),
                conn.other.path,
                conn.edge.context
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use repolake_core::export::export;
    use repolake_core::types::{Edge, NodeId, Relation};
    use std::path::Path;

    fn sample() -> GraphDocument {
        let node = |path: &str, kind: FileKind, title: &str| Node {
            id: NodeId::from_path(path),
            path: path.to_string(),
            kind,
            title: title.to_string(),
            summary: format!("{title} summary"),
            size_bytes: 2048,
            tags: vec![kind.as_str().to_string()],
            last_modified: Utc.timestamp_opt(0, 0).unwrap(),
            lines: 12,
        };
        let nodes = vec![
            node("deploy.sh", FileKind::Script, "Deploy"),
            node("scripts/setup.sh", FileKind::Script, "Setup"),
        ];
        let edges = vec![Edge {
            from: nodes[0].id.clone(),
            to: nodes[1].id.clone(),
            relation: Relation::Calls,
            context: "./scripts/setup.sh".into(),
        }];
        export(&nodes, &edges, Path::new("/repo"))
    }

    #[test]
    fn node_view_splits_directions() {
        let doc = sample();
        let setup = query::find_node(&doc, "scripts/setup.sh").unwrap();
        let conns = query::connections(&doc, &setup.id);
        let text = render_node(setup, &conns);

        assert!(text.starts_with("script: Setup\n"));
        assert!(text.contains("Outgoing (0):\n  (none)"));
        assert!(text.contains("Incoming (1):\n  calls      deploy.sh  \"./scripts/setup.sh\""));
        assert!(text.contains("Size: 2.0 KB"));
    }

    #[test]
    fn listing_reports_match_count() {
        let doc = sample();
        let filter = NodeFilter {
            search: Some("deploy".into()),
            kind: None,
        };
        let nodes = query::filter_nodes(&doc, &filter);
        let text = render_listing(&doc, &nodes);
        assert!(text.starts_with("1 of 2 nodes match\n"));
        assert!(text.contains("deploy.sh  Deploy"));
    }
}
