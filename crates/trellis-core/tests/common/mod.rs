//! Fixture trees and a recording visitor shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use trellis_core::{BoxError, Format, LoadResult, Visitor};

/// Write `content` at `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// A tree exercising every default extension, a custom `cart` extension,
/// non-artifact files, nested directories and one index directory (`x/z`).
pub fn kitchen_sink() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("kitchen-sink");

    write(&root, "a.art", r#"{"a": "art"}"#);
    write(&root, "b.mart", r#"{"b": "mart"}"#);
    write(&root, "c.json", r#"{"c": "json"}"#);
    write(&root, "d.txt", "not an artifact");
    write(&root, "e.cart", r#"{"e": "cart"}"#);
    write(&root, "x/f.art", r#"{"f": "art"}"#);
    write(&root, "x/g.mart", r#"{"g": "mart"}"#);
    write(&root, "x/y/h.json", r#"{"h": "json"}"#);
    write(&root, "x/y/u/k.cart", r#"{"k": "cart"}"#);
    write(&root, "x/y/u/l.art", r#"{"l": "art"}"#);
    write(&root, "x/z/i.art", r#"{"i": "art"}"#);
    write(&root, "x/z/index.mart", r#"{"index": "mart"}"#);
    write(&root, "x/z/j.mart", r#"{"j": "mart"}"#);
    write(&root, "x/z/v/m.art", r#"{"m": "art"}"#);

    (tmp, root)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// Path relative to the recorder's root, `/`-separated.
    pub rel: String,
    pub name: String,
    pub value: Value,
    pub format: Format,
}

/// Records every visit. Clones share the same log.
#[derive(Clone)]
pub struct Recorder {
    root: PathBuf,
    visits: Arc<Mutex<Vec<Visit>>>,
}

impl Recorder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            visits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Visits sorted by relative path.
    pub fn sorted(&self) -> Vec<Visit> {
        let mut visits = self.visits.lock().unwrap().clone();
        visits.sort_by(|a, b| a.rel.cmp(&b.rel));
        visits
    }

    pub fn rels(&self) -> Vec<String> {
        self.sorted().into_iter().map(|v| v.rel).collect()
    }

    pub fn pairs(&self) -> Vec<(String, Value)> {
        self.sorted().into_iter().map(|v| (v.rel, v.value)).collect()
    }

    pub fn format_of(&self, rel: &str) -> Option<Format> {
        self.sorted().into_iter().find(|v| v.rel == rel).map(|v| v.format)
    }
}

#[async_trait]
impl Visitor<Value> for Recorder {
    async fn visit(&self, entry: LoadResult<Value>) -> Result<(), BoxError> {
        let rel = entry
            .path
            .strip_prefix(&self.root)
            .unwrap_or(&entry.path)
            .to_string_lossy()
            .replace('\\', "/");
        self.visits.lock().unwrap().push(Visit {
            rel,
            name: entry.name,
            value: entry.value,
            format: entry.format,
        });
        Ok(())
    }
}

/// `(rel, value)` pairs from a compact `rel => json` list.
pub fn expected(items: &[(&str, Value)]) -> Vec<(String, Value)> {
    let mut items: Vec<(String, Value)> = items
        .iter()
        .map(|(rel, value)| (rel.to_string(), value.clone()))
        .collect();
    items.sort_by(|a, b| a.0.cmp(&b.0));
    items
}
