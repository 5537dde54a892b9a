//! Best-effort Resolution
//!
//! Given a path stem, probe an ordered list of candidate files and return the
//! first that loads. Only "not found for this exact candidate" moves on to the
//! next candidate; every other failure ends the search.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::INDEX_NAME;
use crate::error::LoadError;
use crate::format::{ExtensionRule, Extensions, Format};
use crate::loader::ArtifactLoader;
use crate::manifest::FormatScope;

/// One `(path, strategy)` pair to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub format: Format,
}

impl Candidate {
    fn new(path: PathBuf, format: Format) -> Self {
        Self { path, format }
    }
}

/// A successfully resolved artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved<A> {
    pub value: A,
    /// Absolute path of the candidate that loaded.
    pub path: PathBuf,
    pub format: Format,
}

/// Outcome of probing one candidate.
#[derive(Debug)]
pub enum Probe<A> {
    Found(Resolved<A>),
    NotFound,
    Failed(LoadError),
}

/// Resolves path stems through `L`.
pub struct Resolver<L> {
    loader: L,
    extensions: Extensions,
    default_format: Option<Format>,
}

impl<L: ArtifactLoader> Resolver<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            extensions: Extensions::default(),
            default_format: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Skip manifest lookup and use `format` as the ambient format.
    pub fn with_default_format(mut self, format: Format) -> Self {
        self.default_format = Some(format);
        self
    }

    /// Find the first loadable candidate for `stem`.
    ///
    /// `Ok(None)` means nothing exists at any candidate. A candidate that
    /// exists but fails to load is returned as the error.
    pub async fn resolve(&self, stem: impl AsRef<Path>) -> Result<Option<Resolved<L::Artifact>>, LoadError> {
        let stem = stem.as_ref();
        let stem = std::path::absolute(stem).map_err(|source| LoadError::Io {
            path: stem.to_path_buf(),
            source,
        })?;

        let scope = FormatScope::new(self.default_format);
        let ambient = scope.format_for(stem.parent().unwrap_or(&stem)).await;
        let index_ambient = if is_dir(&stem).await {
            scope.format_for(&stem).await
        } else {
            ambient
        };

        info!("Resolving {:?} (ambient {}, index ambient {})", stem, ambient, index_ambient);
        for candidate in self.candidates(&stem, ambient, index_ambient) {
            match self.probe(&candidate).await {
                Probe::Found(resolved) => {
                    info!("Resolved {:?} to {:?} ({})", stem, resolved.path, resolved.format);
                    return Ok(Some(resolved));
                }
                Probe::NotFound => continue,
                Probe::Failed(err) => return Err(err),
            }
        }

        info!("Nothing found for {:?}", stem);
        Ok(None)
    }

    /// Try one candidate.
    pub async fn probe(&self, candidate: &Candidate) -> Probe<L::Artifact> {
        debug!("Probing {:?} ({})", candidate.path, candidate.format);
        match self.loader.load(&candidate.path, candidate.format).await {
            Ok(value) => Probe::Found(Resolved {
                value,
                path: candidate.path.clone(),
                format: candidate.format,
            }),
            Err(err) if err.is_not_found_for(&candidate.path) => Probe::NotFound,
            Err(err) => Probe::Failed(err),
        }
    }

    /// Ordered candidates for `stem`.
    ///
    /// `ambient` governs `stem` and its siblings; `index_ambient` governs the
    /// `index` files inside `stem`.
    pub fn candidates(&self, stem: &Path, ambient: Format, index_ambient: Format) -> Vec<Candidate> {
        let rule = self.extensions.rule_for(stem);
        match rule {
            Some(ExtensionRule::Static) => return vec![Candidate::new(stem.to_path_buf(), Format::Static)],
            Some(ExtensionRule::Dynamic) => return vec![Candidate::new(stem.to_path_buf(), Format::Dynamic)],
            Some(ExtensionRule::Ambiguous) | None => {}
        }

        let ambiguous: Vec<&str> = self.extensions.with_rule(ExtensionRule::Ambiguous).collect();
        let dynamic_only: Vec<&str> = self.extensions.with_rule(ExtensionRule::Dynamic).collect();
        let static_capable = |ambient: Format| -> Vec<&str> {
            self.extensions
                .iter()
                .filter(|(_, rule)| match rule {
                    ExtensionRule::Static => true,
                    ExtensionRule::Ambiguous => ambient == Format::Static,
                    ExtensionRule::Dynamic => false,
                })
                .map(|(ext, _)| ext)
                .collect()
        };
        let index = stem.join(INDEX_NAME);

        let exact_format = match rule {
            Some(ExtensionRule::Ambiguous) => ambient,
            _ => Format::Static,
        };
        let mut candidates = vec![Candidate::new(stem.to_path_buf(), exact_format)];

        for ext in static_capable(ambient) {
            candidates.push(Candidate::new(with_extension(stem, ext), Format::Static));
        }
        for ext in static_capable(index_ambient) {
            candidates.push(Candidate::new(with_extension(&index, ext), Format::Static));
        }

        for ext in &dynamic_only {
            candidates.push(Candidate::new(with_extension(stem, ext), Format::Dynamic));
        }
        if ambient == Format::Dynamic {
            for ext in &ambiguous {
                candidates.push(Candidate::new(with_extension(stem, ext), Format::Dynamic));
            }
        }

        for ext in &dynamic_only {
            candidates.push(Candidate::new(with_extension(&index, ext), Format::Dynamic));
        }
        if index_ambient == Format::Dynamic {
            for ext in &ambiguous {
                candidates.push(Candidate::new(with_extension(&index, ext), Format::Dynamic));
            }
        }

        candidates
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|meta| meta.is_dir()).unwrap_or(false)
}

/// `path` with `.ext` appended, keeping any extension already present.
fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = OsString::from(path.as_os_str());
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsLoader;

    fn paths(candidates: &[Candidate]) -> Vec<(String, Format)> {
        candidates
            .iter()
            .map(|c| (c.path.display().to_string(), c.format))
            .collect()
    }

    #[test]
    fn test_candidates_for_bare_stem_static_ambient() {
        let resolver = Resolver::new(FsLoader::new());
        let candidates = resolver.candidates(Path::new("/r/thing"), Format::Static, Format::Static);
        assert_eq!(
            paths(&candidates),
            vec![
                ("/r/thing".to_string(), Format::Static),
                ("/r/thing.art".to_string(), Format::Static),
                ("/r/thing.json".to_string(), Format::Static),
                ("/r/thing/index.art".to_string(), Format::Static),
                ("/r/thing/index.json".to_string(), Format::Static),
                ("/r/thing.mart".to_string(), Format::Dynamic),
                ("/r/thing/index.mart".to_string(), Format::Dynamic),
            ]
        );
    }

    #[test]
    fn test_candidates_for_bare_stem_dynamic_ambient() {
        let resolver = Resolver::new(FsLoader::new());
        let candidates = resolver.candidates(Path::new("/r/thing"), Format::Dynamic, Format::Dynamic);
        assert_eq!(
            paths(&candidates),
            vec![
                ("/r/thing".to_string(), Format::Static),
                ("/r/thing.json".to_string(), Format::Static),
                ("/r/thing/index.json".to_string(), Format::Static),
                ("/r/thing.mart".to_string(), Format::Dynamic),
                ("/r/thing.art".to_string(), Format::Dynamic),
                ("/r/thing/index.mart".to_string(), Format::Dynamic),
                ("/r/thing/index.art".to_string(), Format::Dynamic),
            ]
        );
    }

    #[test]
    fn test_unambiguous_extension_is_a_single_candidate() {
        let resolver = Resolver::new(FsLoader::new());
        for ambient in [Format::Static, Format::Dynamic] {
            assert_eq!(
                resolver.candidates(Path::new("/r/a.mart"), ambient, ambient),
                vec![Candidate::new(PathBuf::from("/r/a.mart"), Format::Dynamic)]
            );
            assert_eq!(
                resolver.candidates(Path::new("/r/a.json"), ambient, ambient),
                vec![Candidate::new(PathBuf::from("/r/a.json"), Format::Static)]
            );
        }
    }

    #[test]
    fn test_ambiguous_extension_exact_candidate_follows_ambient() {
        let resolver = Resolver::new(FsLoader::new());
        let candidates = resolver.candidates(Path::new("/r/a.art"), Format::Dynamic, Format::Dynamic);
        assert_eq!(candidates[0], Candidate::new(PathBuf::from("/r/a.art"), Format::Dynamic));
        assert_eq!(candidates[1].path, PathBuf::from("/r/a.art.json"));
    }

    #[test]
    fn test_index_candidates_follow_their_own_ambient() {
        let resolver = Resolver::new(FsLoader::new());
        let candidates = resolver.candidates(Path::new("/r/pkg"), Format::Static, Format::Dynamic);
        assert_eq!(
            paths(&candidates),
            vec![
                ("/r/pkg".to_string(), Format::Static),
                ("/r/pkg.art".to_string(), Format::Static),
                ("/r/pkg.json".to_string(), Format::Static),
                ("/r/pkg/index.json".to_string(), Format::Static),
                ("/r/pkg.mart".to_string(), Format::Dynamic),
                ("/r/pkg/index.mart".to_string(), Format::Dynamic),
                ("/r/pkg/index.art".to_string(), Format::Dynamic),
            ]
        );
    }

    #[test]
    fn test_with_extension_appends() {
        assert_eq!(with_extension(Path::new("/r/a.b"), "mart"), PathBuf::from("/r/a.b.mart"));
    }
}
