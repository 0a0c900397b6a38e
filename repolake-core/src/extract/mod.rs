pub mod classify;
pub mod references;
pub mod resolve;
pub mod summarize;
pub mod walker;

use std::time::Duration;

pub use classify::classify;
pub use resolve::{EdgeResolver, resolve};
pub use walker::{DirectoryWalker, WalkOutput};

/// Counters for one extraction run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractStats {
    pub nodes_created: u64,
    pub raw_references: u64,
    pub edges_created: u64,
    pub warnings: u64,
    pub duration: Duration,
}
