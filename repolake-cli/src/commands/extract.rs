use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::debug;

use repolake_core::config::RepolakeConfig;
use repolake_core::pipeline::{ExtractionResult, RepolakePipeline};
use repolake_core::progress::{IndicatifReporter, ProgressReporter};

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Repository root to scan (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output document path, relative to the root
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Config file (default: <root>/repolake.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write compact JSON instead of pretty-printed
    #[arg(long)]
    pub compact: bool,
}

pub fn run(args: ExtractArgs, quiet: bool) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => RepolakeConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display()))?,
        None => RepolakeConfig::load_or_default(&args.path)
            .with_context(|| format!("Cannot load config from {}", args.path.display()))?,
    };
    if let Some(output) = args.output {
        config.output.path = output;
    }
    if args.compact {
        config.output.pretty = false;
    }
    config.validate().context("Invalid config")?;
    debug!(
        root = %args.path.display(),
        output = %config.output.path.display(),
        pretty = config.output.pretty,
        "Resolved config"
    );

    let reporter = if quiet {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new()
    };

    let pipeline = RepolakePipeline::new(&args.path);
    let (result, output_path) = pipeline
        .run_and_write(&config, &reporter)
        .with_context(|| format!("Extraction failed for {}", args.path.display()))?;
    reporter.finish();

    if !quiet {
        print!("{}", render_summary(&result, &output_path));
    }
    Ok(())
}

/// Human-readable report printed after a successful run.
pub fn render_summary(result: &ExtractionResult, output_path: &Path) -> String {
    let doc = &result.document;
    let stats = &doc.metadata.stats;
    let mut out = String::new();

    let _ = writeln!(out, "Repository graph for {}", doc.metadata.repo_path);
    let _ = writeln!(out);

    let _ = writeln!(out, "  Nodes: {} total", doc.nodes.len());
    let mut kinds: Vec<_> = stats
        .by_type
        .iter()
        .map(|(kind, count)| (kind.as_str(), *count))
        .collect();
    kinds.sort_by(|a, b| b.1.cmp(&a.1));
    for (kind, count) in &kinds {
        let _ = writeln!(out, "    {kind:<20} {count:>6}");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "  Edges: {} total", doc.edges.len());
    let mut by_relation: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &doc.edges {
        *by_relation.entry(edge.relation.as_str()).or_insert(0) += 1;
    }
    let mut relations: Vec<_> = by_relation.into_iter().collect();
    relations.sort_by(|a, b| b.1.cmp(&a.1));
    for (relation, count) in &relations {
        let _ = writeln!(out, "    {relation:<20} {count:>6}");
    }
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  Size:     {} (avg {})",
        format_bytes(stats.total_size),
        format_bytes(stats.average_size)
    );
    let _ = writeln!(out, "  Warnings: {}", result.warnings.len());
    let _ = writeln!(out, "  Output:   {}", output_path.display());
    out
}

#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    }
}
