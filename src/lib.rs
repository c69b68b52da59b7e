//! Stagehand - artifact bundling and stage synchronization engine
//!
//! Stagehand turns a declarative list of source→destination artifact
//! mappings into a sandboxed local deploy root, expands template expressions
//! in eligible files, then reconciles the finished tree against a remote
//! artifact store (the "stage") by content hash, uploading and removing only
//! what changed.
//!
//! The pipeline runs strictly in order: resolve mappings, materialize the
//! deploy root, render templates, diff against a remote listing snapshot,
//! execute the diff. The first three stages are driven by [`Bundler`]; the
//! caller drives the last two through [`diff_deploy_root`] and
//! [`SyncExecutor`] with a [`StageTransport`] collaborator.

pub mod bundle;
pub mod error;
pub mod hash;
pub mod paths;
pub mod rules;
pub mod stage;
pub mod template;

// Re-exports for convenience
pub use bundle::{BundleContext, BundleMap, BundleReport, Bundler, ResolvedArtifact};
pub use error::{StagehandError, StagehandResult};
pub use rules::{ArtifactRule, BundleManifest, Processor};
pub use stage::{
    diff_deploy_root, DiffOptions, DiffResult, MemoryStage, RemoteEntry, StageTransport,
    SyncExecutor, SyncOutcome, TransportError,
};
pub use template::{SyntaxKind, TemplateReport};
