//! Directory Walker
//!
//! Walks a tree one directory at a time. Within a directory every eligible
//! file load and every subdirectory walk runs concurrently; the directory is
//! done when all of them (and their visits) are done. The first error aborts
//! the walk and drops whatever sibling work is still pending.

use std::path::{Path, PathBuf};

use futures::future::{try_join, try_join_all, BoxFuture};
use tracing::{debug, info};

use crate::classify::{classify, DirEntry};
use crate::config::WalkConfig;
use crate::error::{ConfigError, WalkError};
use crate::format::Format;
use crate::loader::ArtifactLoader;
use crate::manifest::FormatScope;
use crate::visit::LoadResult;

/// Walks directory trees, loading artifacts through `L`.
pub struct Walker<L> {
    loader: L,
}

impl<L: ArtifactLoader> Walker<L> {
    pub fn new(loader: L) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Walk `root`, visiting every artifact `config` selects.
    ///
    /// A relative `root` is taken from the current directory.
    pub async fn walk(&self, root: impl AsRef<Path>, config: &WalkConfig<L::Artifact>) -> Result<(), WalkError> {
        let root = root.as_ref();
        let root = std::path::absolute(root).map_err(|source| WalkError::InvalidRoot {
            path: root.to_path_buf(),
            source,
        })?;

        info!("Walking {:?}", root);
        let scope = FormatScope::new(config.default_format);
        self.walk_directory(root.clone(), config, &scope).await?;
        info!("Finished walking {:?}", root);
        Ok(())
    }

    fn walk_directory<'a>(
        &'a self,
        dir: PathBuf,
        config: &'a WalkConfig<L::Artifact>,
        scope: &'a FormatScope,
    ) -> BoxFuture<'a, Result<(), WalkError>> {
        Box::pin(async move {
            let entries = list_dir(&dir).await?;
            let classified = classify(&dir, entries, &config.filter);
            debug!(
                "{:?}: {} files, {} indexes, {} subdirectories",
                dir,
                classified.files.len(),
                classified.indexes.len(),
                classified.subdirectories.len()
            );

            if config.stop_at_indexes && !classified.indexes.is_empty() {
                if classified.indexes.len() > 1 {
                    let mut names: Vec<String> = classified.indexes.into_iter().map(|entry| entry.name).collect();
                    names.sort();
                    return Err(ConfigError::MultipleIndexes { dir, names }.into());
                }
                return self.load_entry(&dir, &classified.indexes[0], config, scope).await;
            }

            let loads = try_join_all(
                classified
                    .files
                    .iter()
                    .map(|entry| self.load_entry(&dir, entry, config, scope)),
            );

            let subdirectories: &[DirEntry] = if config.recursive {
                classified.subdirectories.as_slice()
            } else {
                &[]
            };
            let walks = try_join_all(
                subdirectories
                    .iter()
                    .map(|entry| self.walk_directory(entry.path_in(&dir), config, scope)),
            );

            try_join(loads, walks).await?;
            Ok(())
        })
    }

    /// Load one file with the strategy its extension and scope select, then
    /// hand it to the visitor.
    async fn load_entry(
        &self,
        dir: &Path,
        entry: &DirEntry,
        config: &WalkConfig<L::Artifact>,
        scope: &FormatScope,
    ) -> Result<(), WalkError> {
        let path = entry.path_in(dir);
        let extensions = &config.filter.extensions;
        let format = if extensions.needs_ambient(&path) {
            extensions.detect(&path, scope.format_for(dir).await)
        } else {
            extensions.detect(&path, Format::Static)
        };

        let value = self.loader.load(&path, format).await?;
        let result = LoadResult {
            value,
            path: path.clone(),
            name: entry.name.clone(),
            format,
        };

        config
            .visitor
            .visit(result)
            .await
            .map_err(|source| WalkError::Visit { path, source })
    }
}

/// Read the immediate entries of `dir`. Symlinks are not followed.
async fn list_dir(dir: &Path) -> Result<Vec<DirEntry>, WalkError> {
    let list_err = |source: std::io::Error| WalkError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = tokio::fs::read_dir(dir).await.map_err(list_err)?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(list_err)? {
        let file_type = entry.file_type().await.map_err(list_err)?;
        entries.push(DirEntry::new(entry.file_name(), file_type.is_dir()));
    }
    Ok(entries)
}
