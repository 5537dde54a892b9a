//! Error Types
//!
//! One enum per concern: loading a single artifact, validating configuration,
//! and driving a whole walk.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type returned by visitors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure to load one artifact through a loading strategy.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Nothing loadable exists at exactly this path.
    #[error("artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {} is too large ({size} bytes, limit {limit})", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("syntax error in {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} failed during evaluation: {message}", path.display())]
    Evaluation { path: PathBuf, message: String },

    #[error("{} depends on missing artifact {}", path.display(), dependency.display())]
    MissingDependency { path: PathBuf, dependency: PathBuf },

    #[error("{} exceeds the import depth limit of {limit}", path.display())]
    ImportDepth { path: PathBuf, limit: usize },
}

impl LoadError {
    /// True only when this error reports that `path` itself does not exist.
    ///
    /// A missing nested dependency or any other failure returns false.
    pub fn is_not_found_for(&self, path: &Path) -> bool {
        matches!(self, LoadError::NotFound(missing) if missing == path)
    }
}

/// Invalid configuration, detected before or during a walk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("walk configuration requires a visitor")]
    MissingVisitor,

    #[error("Multiple index entries found in {}: {}.", dir.display(), names.join(", "))]
    MultipleIndexes { dir: PathBuf, names: Vec<String> },

    #[error("invalid settings file {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },
}

/// Any failure that aborts a walk.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid walk root {}: {source}", path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list directory {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("visitor failed for {}: {source}", path.display())]
    Visit {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}
