//! Artifact mapping rules and the bundle manifest
//!
//! Rules are declarative source→destination mappings. They arrive either
//! programmatically or through the `[deploy]`-style TOML manifest the CLI
//! keeps next to the project; both forms produce the same immutable
//! [`ArtifactRule`] values, parsed once per run.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{StagehandError, StagehandResult};

/// Post-materialization processors a rule may request for its files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Processor {
    /// Expand template expressions in eligible destination files.
    Templates,
}

/// One declarative source→destination artifact mapping.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactRule {
    /// Glob matched against the project root. Relative; may not escape.
    pub src: String,
    /// Destination below the deploy root. A trailing `/` forces directory
    /// semantics for single-file matches.
    pub dest: String,
    /// Ordered processors applied to the rule's materialized files.
    #[serde(default)]
    pub processors: Vec<Processor>,
}

impl ArtifactRule {
    /// Create a rule with no processors.
    pub fn new(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            processors: Vec::new(),
        }
    }

    /// Append a processor, builder-style.
    pub fn with_processor(mut self, processor: Processor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Whether this rule's files go through template expansion.
    pub fn wants_templates(&self) -> bool {
        self.processors.contains(&Processor::Templates)
    }
}

/// Bundle section of the project manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleManifest {
    /// Deploy root, relative to the project root.
    #[serde(default = "default_deploy_root")]
    pub deploy_root: PathBuf,
    /// Ordered artifact rules.
    #[serde(default)]
    pub artifacts: Vec<ArtifactRule>,
}

fn default_deploy_root() -> PathBuf {
    PathBuf::from("output/deploy")
}

impl BundleManifest {
    /// Parse a manifest from TOML text.
    pub fn parse(content: &str) -> StagehandResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> StagehandResult<Self> {
        let content = std::fs::read_to_string(path).map_err(StagehandError::Io)?;
        Self::parse(&content)
    }
}
