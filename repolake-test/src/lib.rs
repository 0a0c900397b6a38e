// Integration test utilities and fixture trees for repolake.

use std::path::Path;

use repolake_core::config::RepolakeConfig;
use repolake_core::pipeline::{ExtractionResult, RepolakePipeline};
use repolake_core::progress::NoopReporter;
use repolake_core::types::{GraphDocument, Node};

/// A test fixture rooted in a temporary directory.
#[derive(Debug)]
pub struct TestTree {
    pub dir: tempfile::TempDir,
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTree {
    /// An empty tree.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a file, creating parent directories as needed.
    #[must_use]
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.write(rel, content.as_bytes());
        self
    }

    /// Add a file with raw (possibly non-UTF-8) bytes.
    #[must_use]
    pub fn bytes(self, rel: &str, content: &[u8]) -> Self {
        self.write(rel, content);
        self
    }

    fn write(&self, rel: &str, content: &[u8]) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// A deploy script calling a setup script by relative path.
    pub fn deploy_and_setup() -> Self {
        Self::new()
            .file(
                "deploy.sh",
                "#!/bin/bash\n# Deploy the home cluster\nset -e\n./scripts/setup.sh\n",
            )
            .file(
                "scripts/setup.sh",
                "#!/bin/bash\n# Install base packages\napt-get install -y curl\n",
            )
    }

    /// A small home-lab infrastructure repository touching every file kind,
    /// plus the noise the walker must ignore.
    pub fn homelab() -> Self {
        Self::deploy_and_setup()
            .file(
                "README.md",
                "# Homelab\n\nInfrastructure for the home cluster.\n\n\
                 See [the guide](docs/guide.md) and run `deploy.sh`.\n",
            )
            .file(
                "docs/guide.md",
                "# Guide\n\nThis explains the process.\n\n\
                 Apply manifests/app.yaml after running scripts/setup.sh.\n",
            )
            .file(
                "docs/monitoring.md",
                "# Monitoring\n\nPrometheus and Grafana dashboards.\n",
            )
            .file(
                "manifests/app.yaml",
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: jellyfin\n",
            )
            .file(
                "ansible/site.yml",
                "- hosts: all\n  tasks:\n    - include_tasks: tasks/base.yml\n",
            )
            .file("ansible/tasks/base.yml", "- name: base\n  apt: name=curl\n")
            .file(
                "TODO.md",
                "# TODO\n\n- [ ] Move monitoring.md alerts into manifests\n",
            )
            .file(
                "templates/nginx.conf.j2",
                "server {\n  listen {{ port }};\n}\n",
            )
            .file("config/settings.toml", "[server]\nport = 8080\n")
            .file("package-lock.json", "{\n  \"lockfileVersion\": 3\n}\n")
            .file("empty.md", "   \n\n")
            .file("node_modules/pkg/README.md", "# Vendored\n\nIgnore me.\n")
            .file(".git/HEAD", "ref: refs/heads/main\n")
            .file("build/output.md", "# Built\n\nGenerated.\n")
            .file("dist/bundle.json", "{}\n")
            .file(".next/cache.json", "{}\n")
            .file("src/main.rs", "fn main() {}\n")
            .bytes("assets/logo.txt", &[0x89, 0x50, 0x4e, 0x47, 0x00, 0xff])
    }

    /// Two scripts sharing a basename and a doc that mentions the bare name.
    pub fn shared_basename() -> Self {
        Self::new()
            .file("a.sh", "#!/bin/bash\necho top\n")
            .file("b/a.sh", "#!/bin/bash\necho nested\n")
            .file("c.md", "# Notes\n\nRun a.sh before anything else.\n")
    }
}

/// Run the full pipeline with default config and return the result.
pub fn run_pipeline(root: &Path) -> repolake_core::error::Result<ExtractionResult> {
    let config = RepolakeConfig::default();
    RepolakePipeline::new(root).run(&config, &NoopReporter)
}

/// Run the full pipeline, write the document, and read it back from disk.
pub fn run_pipeline_and_load(root: &Path) -> GraphDocument {
    let config = RepolakeConfig::default();
    let (_, path) = RepolakePipeline::new(root)
        .run_and_write(&config, &NoopReporter)
        .unwrap();
    repolake_core::export::load_document(&path).unwrap()
}

/// Look up a node by repository-relative path.
pub fn node<'a>(document: &'a GraphDocument, path: &str) -> &'a Node {
    document
        .nodes
        .iter()
        .find(|n| n.path == path)
        .unwrap_or_else(|| panic!("no node for {path}"))
}
