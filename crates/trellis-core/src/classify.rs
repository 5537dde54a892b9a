//! Entry classification for a single directory listing.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::format::{base_name, extension_of, Extensions};

/// Predicate over `(full path, entry name)`.
pub type PathPredicate = Arc<dyn Fn(&Path, &str) -> bool + Send + Sync>;

/// Base name that marks an index entry.
pub const INDEX_NAME: &str = "index";

/// One entry of a directory listing.
///
/// `name` is the display form used for classification and reporting;
/// `file_name` is the name as the filesystem returned it and is what paths
/// are built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub file_name: OsString,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn new(file_name: OsString, is_dir: bool) -> Self {
        Self {
            name: file_name.to_string_lossy().into_owned(),
            file_name,
            is_dir,
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(OsString::from(name.into()), false)
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::new(OsString::from(name.into()), true)
    }

    pub fn path_in(&self, dir: &Path) -> std::path::PathBuf {
        dir.join(&self.file_name)
    }
}

/// Decides which files are eligible for loading.
///
/// A file is eligible when its extension is recognised, `include` accepts it
/// and `exclude` does not. Directories are never filtered.
#[derive(Clone)]
pub struct EntryFilter {
    pub extensions: Extensions,
    pub include: PathPredicate,
    pub exclude: PathPredicate,
}

impl EntryFilter {
    pub fn new(extensions: Extensions) -> Self {
        Self {
            extensions,
            include: Arc::new(|_: &Path, _: &str| true),
            exclude: Arc::new(|_: &Path, _: &str| false),
        }
    }

    pub fn is_eligible(&self, dir: &Path, name: &str) -> bool {
        self.accepts(&dir.join(name), name)
    }

    fn accepts(&self, path: &Path, name: &str) -> bool {
        let recognised = extension_of(Path::new(name))
            .map(|ext| self.extensions.contains(ext))
            .unwrap_or(false);

        recognised && (self.include)(path, name) && !(self.exclude)(path, name)
    }
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self::new(Extensions::default())
    }
}

impl fmt::Debug for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFilter")
            .field("extensions", &self.extensions)
            .field("include", &"...")
            .field("exclude", &"...")
            .finish()
    }
}

/// A directory listing split into what the walker acts on.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classified {
    pub subdirectories: Vec<DirEntry>,
    /// Every eligible file, index files included.
    pub files: Vec<DirEntry>,
    /// Eligible files whose base name is `index`.
    pub indexes: Vec<DirEntry>,
}

pub fn classify(dir: &Path, entries: Vec<DirEntry>, filter: &EntryFilter) -> Classified {
    let mut classified = Classified::default();

    for entry in entries {
        if entry.is_dir {
            classified.subdirectories.push(entry);
        } else if filter.accepts(&entry.path_in(dir), &entry.name) {
            if base_name(&entry.name) == INDEX_NAME {
                classified.indexes.push(entry.clone());
            }
            classified.files.push(entry);
        }
    }

    classified
}
