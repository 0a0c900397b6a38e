// Pipeline orchestrator: Walk → Resolve → Export.
//
// Per-file problems never abort a run; they come back as warnings next to
// the finished document.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{info, instrument};

use crate::config::RepolakeConfig;
use crate::error::Result;
use crate::export::{export, write_document};
use crate::extract::{DirectoryWalker, ExtractStats, resolve};
use crate::progress::ProgressReporter;
use crate::types::{ExtractWarning, GraphDocument};

/// Result of one extraction run.
#[derive(Debug)]
pub struct ExtractionResult {
    pub document: GraphDocument,
    pub warnings: Vec<ExtractWarning>,
    pub stats: ExtractStats,
}

/// Orchestrates a full extraction over one repository root.
#[derive(Debug)]
pub struct RepolakePipeline {
    root: PathBuf,
}

impl RepolakePipeline {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the document for this root lands under `config`.
    pub fn output_path(&self, config: &RepolakeConfig) -> PathBuf {
        self.root.join(&config.output.path)
    }

    /// Walk the tree, resolve references, and assemble the document.
    ///
    /// Nothing is written to disk; see [`Self::run_and_write`].
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn run(
        &self,
        config: &RepolakeConfig,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExtractionResult> {
        let start = Instant::now();

        let walk = DirectoryWalker::new(&self.root, config).walk(reporter)?;
        let raw_references = walk.raw_reference_count();
        let edges = resolve(&walk.nodes, &walk.raw_references);
        let document = export(&walk.nodes, &edges, &self.root);

        let stats = ExtractStats {
            nodes_created: document.nodes.len() as u64,
            raw_references: raw_references as u64,
            edges_created: document.edges.len() as u64,
            warnings: walk.warnings.len() as u64,
            duration: start.elapsed(),
        };
        info!(
            nodes = stats.nodes_created,
            edges = stats.edges_created,
            warnings = stats.warnings,
            elapsed = ?stats.duration,
            "Extraction complete"
        );

        Ok(ExtractionResult {
            document,
            warnings: walk.warnings,
            stats,
        })
    }

    /// Run, then persist the document to [`Self::output_path`].
    pub fn run_and_write(
        &self,
        config: &RepolakeConfig,
        reporter: &dyn ProgressReporter,
    ) -> Result<(ExtractionResult, PathBuf)> {
        let result = self.run(config, reporter)?;
        let path = self.output_path(config);
        write_document(&result.document, &path, config.output.pretty)?;
        Ok((result, path))
    }
}
