//! Artifact Loading
//!
//! `ArtifactLoader` is the single capability the walker and resolver call.
//! `FsLoader` implements it over JSON documents on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::LoadError;
use crate::format::Format;

/// Loads one artifact with the requested strategy.
///
/// Implementations must report a missing `path` as
/// `LoadError::NotFound(path)` with that exact path, and every other failure
/// (including missing nested dependencies) as some other variant.
#[async_trait]
pub trait ArtifactLoader: Send + Sync {
    type Artifact: Send + 'static;

    async fn load(&self, path: &Path, format: Format) -> Result<Self::Artifact, LoadError>;
}

/// Default maximum artifact size (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Maximum `$import` nesting.
pub const MAX_IMPORT_DEPTH: usize = 32;

const IMPORT_KEY: &str = "$import";
const THROW_KEY: &str = "$throw";

enum Directive {
    Import(String),
    Throw(String),
}

fn directive(value: &Value) -> Option<Directive> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    let (key, arg) = map.iter().next()?;
    let arg = arg.as_str()?.to_string();
    match key.as_str() {
        IMPORT_KEY => Some(Directive::Import(arg)),
        THROW_KEY => Some(Directive::Throw(arg)),
        _ => None,
    }
}

fn import_target(origin: &Path, target: &str) -> PathBuf {
    match origin.parent() {
        Some(dir) => dir.join(target),
        None => PathBuf::from(target),
    }
}

/// JSON artifacts on the local filesystem.
///
/// Static loads use blocking `std::fs` reads; dynamic loads go through
/// `tokio::fs`. Both expand `{"$import": "rel/path"}` and fail on
/// `{"$throw": "message"}`.
#[derive(Debug, Clone)]
pub struct FsLoader {
    max_file_size: u64,
}

impl FsLoader {
    pub fn new() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_file_size(mut self, limit: u64) -> Self {
        self.max_file_size = limit;
        self
    }

    fn check_metadata(&self, path: &Path, meta: std::io::Result<std::fs::Metadata>) -> Result<(), LoadError> {
        let meta = match meta {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(LoadError::NotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if !meta.is_file() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        if meta.len() > self.max_file_size {
            return Err(LoadError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    fn parse(path: &Path, content: std::io::Result<String>) -> Result<Value, LoadError> {
        let content = content.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoadError::Syntax {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` synchronously.
    pub fn load_static(&self, path: &Path) -> Result<Value, LoadError> {
        self.static_at_depth(path, 0)
    }

    /// Load `path` through the async filesystem.
    pub async fn load_dynamic(&self, path: &Path) -> Result<Value, LoadError> {
        self.dynamic_at_depth(path, 0).await
    }

    fn static_at_depth(&self, path: &Path, depth: usize) -> Result<Value, LoadError> {
        self.check_metadata(path, std::fs::metadata(path))?;
        let value = Self::parse(path, std::fs::read_to_string(path))?;
        self.expand_static(value, path, depth)
    }

    fn expand_static(&self, value: Value, origin: &Path, depth: usize) -> Result<Value, LoadError> {
        match directive(&value) {
            Some(Directive::Import(target)) => {
                let target = import_target(origin, &target);
                self.check_depth(origin, depth)?;
                self.static_at_depth(&target, depth + 1)
                    .map_err(|e| missing_dependency(origin, &target, e))
            }
            Some(Directive::Throw(message)) => Err(LoadError::Evaluation {
                path: origin.to_path_buf(),
                message,
            }),
            None => match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| self.expand_static(item, origin, depth))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Value::Object(map) => {
                    let mut expanded = Map::with_capacity(map.len());
                    for (key, item) in map {
                        expanded.insert(key, self.expand_static(item, origin, depth)?);
                    }
                    Ok(Value::Object(expanded))
                }
                other => Ok(other),
            },
        }
    }

    fn dynamic_at_depth<'a>(&'a self, path: &'a Path, depth: usize) -> BoxFuture<'a, Result<Value, LoadError>> {
        Box::pin(async move {
            self.check_metadata(path, tokio::fs::metadata(path).await)?;
            let value = Self::parse(path, tokio::fs::read_to_string(path).await)?;
            self.expand_dynamic(value, path, depth).await
        })
    }

    fn expand_dynamic<'a>(
        &'a self,
        value: Value,
        origin: &'a Path,
        depth: usize,
    ) -> BoxFuture<'a, Result<Value, LoadError>> {
        Box::pin(async move {
            match directive(&value) {
                Some(Directive::Import(target)) => {
                    let target = import_target(origin, &target);
                    self.check_depth(origin, depth)?;
                    self.dynamic_at_depth(&target, depth + 1)
                        .await
                        .map_err(|e| missing_dependency(origin, &target, e))
                }
                Some(Directive::Throw(message)) => Err(LoadError::Evaluation {
                    path: origin.to_path_buf(),
                    message,
                }),
                None => match value {
                    Value::Array(items) => {
                        let mut expanded = Vec::with_capacity(items.len());
                        for item in items {
                            expanded.push(self.expand_dynamic(item, origin, depth).await?);
                        }
                        Ok(Value::Array(expanded))
                    }
                    Value::Object(map) => {
                        let mut expanded = Map::with_capacity(map.len());
                        for (key, item) in map {
                            expanded.insert(key, self.expand_dynamic(item, origin, depth).await?);
                        }
                        Ok(Value::Object(expanded))
                    }
                    other => Ok(other),
                },
            }
        })
    }

    fn check_depth(&self, origin: &Path, depth: usize) -> Result<(), LoadError> {
        if depth >= MAX_IMPORT_DEPTH {
            return Err(LoadError::ImportDepth {
                path: origin.to_path_buf(),
                limit: MAX_IMPORT_DEPTH,
            });
        }
        Ok(())
    }
}

impl Default for FsLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// A nested import that does not exist is a dependency failure of the
/// importing artifact, never a "not found" for it.
fn missing_dependency(origin: &Path, target: &Path, err: LoadError) -> LoadError {
    if err.is_not_found_for(target) {
        LoadError::MissingDependency {
            path: origin.to_path_buf(),
            dependency: target.to_path_buf(),
        }
    } else {
        err
    }
}

#[async_trait]
impl ArtifactLoader for FsLoader {
    type Artifact = Value;

    async fn load(&self, path: &Path, format: Format) -> Result<Value, LoadError> {
        debug!("Loading {:?} ({})", path, format);
        match format {
            Format::Static => self.load_static(path),
            Format::Dynamic => self.load_dynamic(path).await,
        }
    }
}
