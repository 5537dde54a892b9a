//! Manifest Lookup
//!
//! Finds the ambient format of a directory by searching upward for the nearest
//! `trellis.manifest` that declares one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::format::Format;

/// File name of the per-directory manifest.
pub const MANIFEST_FILE: &str = "trellis.manifest";

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    #[serde(default)]
    format: Option<String>,
}

/// What a single directory's manifest says about the ambient format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Declaration {
    /// No manifest in this directory.
    Absent,
    /// A manifest without a `format` key. The search continues upward.
    Undeclared,
    Declared(Format),
    /// Unreadable or malformed. Treated as `Static`.
    Malformed,
}

/// Read the manifest in `dir`, if any.
pub async fn read_declaration(dir: &Path) -> Declaration {
    let path = dir.join(MANIFEST_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Declaration::Absent,
        Err(e) => {
            warn!("Failed to read manifest {:?}: {}", path, e);
            return Declaration::Malformed;
        }
    };

    let doc: ManifestDoc = match serde_json::from_str(&content) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Malformed manifest {:?}: {}", path, e);
            return Declaration::Malformed;
        }
    };

    match doc.format.as_deref() {
        None => Declaration::Undeclared,
        Some(raw) => match raw.parse::<Format>() {
            Ok(format) => Declaration::Declared(format),
            Err(e) => {
                warn!("Manifest {:?}: {}", path, e);
                Declaration::Malformed
            }
        },
    }
}

/// Ambient format cache for one walk or resolve call.
///
/// Each directory is written at most once; concurrent lookups that race on
/// the same directory compute the same answer and keep the first.
pub struct FormatScope {
    fixed: Option<Format>,
    cache: RwLock<HashMap<PathBuf, Format>>,
}

impl FormatScope {
    /// Create a scope. `fixed` overrides every manifest lookup.
    pub fn new(fixed: Option<Format>) -> Self {
        Self {
            fixed,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Ambient format governing files directly inside `dir`.
    pub async fn format_for(&self, dir: &Path) -> Format {
        if let Some(format) = self.fixed {
            return format;
        }

        let mut pending = Vec::new();
        let mut current = Some(dir);

        let format = loop {
            let Some(candidate) = current else {
                break Format::Static;
            };

            if let Some(cached) = self.cache.read().await.get(candidate).copied() {
                break cached;
            }

            pending.push(candidate.to_path_buf());
            match read_declaration(candidate).await {
                Declaration::Declared(format) => break format,
                Declaration::Malformed => break Format::Static,
                Declaration::Absent | Declaration::Undeclared => current = candidate.parent(),
            }
        };

        if !pending.is_empty() {
            debug!("Ambient format for {:?}: {}", dir, format);
            let mut cache = self.cache.write().await;
            for visited in pending {
                cache.entry(visited).or_insert(format);
            }
        }

        format
    }

    #[cfg(test)]
    async fn cached(&self, dir: &Path) -> Option<Format> {
        self.cache.read().await.get(dir).copied()
    }
}
