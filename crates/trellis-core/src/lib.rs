//! trellis-core: directory-tree artifact loading.
//!
//! Provides:
//! - **Walker**: concurrent per-directory traversal that loads every eligible
//!   file and hands it to a `Visitor`, with optional index short-circuiting
//! - **Resolver**: best-effort lookup of a path stem through an ordered list
//!   of candidate files
//! - **Extensions / Format**: per-file choice between the static and dynamic
//!   loading strategies, informed by the nearest `trellis.manifest`
//! - **FsLoader**: the default `ArtifactLoader` over JSON documents
//!
//! The walker and resolver are generic over `ArtifactLoader`, the single
//! capability through which artifacts are loaded.

pub mod classify;
pub mod config;
pub mod error;
pub mod format;
pub mod loader;
pub mod manifest;
pub mod resolver;
pub mod visit;
pub mod walker;

use std::path::Path;

use serde_json::Value;

pub use classify::{classify, Classified, DirEntry, EntryFilter, PathPredicate, INDEX_NAME};
pub use config::{ExtensionSetting, WalkConfig, WalkConfigBuilder, WalkSettings};
pub use error::{BoxError, ConfigError, LoadError, WalkError};
pub use format::{ExtensionRule, Extensions, Format, DEFAULT_EXTENSIONS};
pub use loader::{ArtifactLoader, FsLoader};
pub use manifest::{FormatScope, MANIFEST_FILE};
pub use resolver::{Candidate, Probe, Resolved, Resolver};
pub use visit::{visit_fn, FnVisitor, LoadResult, Visitor};
pub use walker::Walker;

/// Walk `root` with the default filesystem loader.
pub async fn walk(root: impl AsRef<Path>, config: &WalkConfig<Value>) -> Result<(), WalkError> {
    Walker::new(FsLoader::default()).walk(root, config).await
}

/// Resolve `stem` with the default filesystem loader and extensions.
///
/// For custom extensions or a fixed ambient format, build a `Resolver` and
/// use `Resolver::with_extensions` / `Resolver::with_default_format`.
pub async fn resolve(stem: impl AsRef<Path>) -> Result<Option<Resolved<Value>>, LoadError> {
    Resolver::new(FsLoader::default()).resolve(stem).await
}
