//! Format Detection
//!
//! Maps file extensions to loading strategies. Extensions are configuration
//! values; nothing is registered globally.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Loading strategy for one artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Immediate, synchronous-style loading.
    #[default]
    Static,
    /// Suspending loading that may await nested loads.
    Dynamic,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Static => f.write_str("static"),
            Format::Dynamic => f.write_str("dynamic"),
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Format::Static),
            "dynamic" => Ok(Format::Dynamic),
            other => Err(format!("unknown format '{}' (expected static or dynamic)", other)),
        }
    }
}

/// How an extension selects its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionRule {
    Static,
    Dynamic,
    /// Valid under either strategy; the ambient format decides.
    Ambiguous,
}

impl FromStr for ExtensionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(ExtensionRule::Static),
            "dynamic" => Ok(ExtensionRule::Dynamic),
            "ambiguous" => Ok(ExtensionRule::Ambiguous),
            other => Err(format!(
                "unknown extension rule '{}' (expected static, dynamic or ambiguous)",
                other
            )),
        }
    }
}

/// Extensions recognised when none are configured.
pub const DEFAULT_EXTENSIONS: &[(&str, ExtensionRule)] = &[
    ("art", ExtensionRule::Ambiguous),
    ("mart", ExtensionRule::Dynamic),
    ("json", ExtensionRule::Static),
];

/// Ordered extension → rule table.
///
/// Order matters to the resolver, which probes extensions in table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extensions {
    rules: Vec<(String, ExtensionRule)>,
}

impl Extensions {
    /// An empty table. Nothing is eligible until extensions are added.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add an extension, or replace the rule of one already present.
    pub fn with(mut self, extension: impl Into<String>, rule: ExtensionRule) -> Self {
        self.insert(extension, rule);
        self
    }

    pub fn insert(&mut self, extension: impl Into<String>, rule: ExtensionRule) {
        let extension = extension.into();
        let extension = extension.strip_prefix('.').unwrap_or(&extension).to_string();
        match self.rules.iter_mut().find(|(ext, _)| *ext == extension) {
            Some(existing) => existing.1 = rule,
            None => self.rules.push((extension, rule)),
        }
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.rule(extension).is_some()
    }

    pub fn rule(&self, extension: &str) -> Option<ExtensionRule> {
        self.rules
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, rule)| *rule)
    }

    /// Rule for the extension of `path`, if it has a recognised one.
    pub fn rule_for(&self, path: &Path) -> Option<ExtensionRule> {
        extension_of(path).and_then(|ext| self.rule(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ExtensionRule)> {
        self.rules.iter().map(|(ext, rule)| (ext.as_str(), *rule))
    }

    /// Extensions carrying exactly `rule`, in table order.
    pub fn with_rule(&self, rule: ExtensionRule) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |(_, r)| *r == rule)
            .map(|(ext, _)| ext)
    }

    /// Whether the strategy of `path` depends on the ambient format.
    pub fn needs_ambient(&self, path: &Path) -> bool {
        !matches!(
            self.rule_for(path),
            Some(ExtensionRule::Static) | Some(ExtensionRule::Dynamic)
        )
    }

    /// Choose the strategy for `path`.
    ///
    /// Static and dynamic extensions ignore `ambient`. Ambiguous and
    /// unrecognised extensions follow it.
    pub fn detect(&self, path: &Path, ambient: Format) -> Format {
        match self.rule_for(path) {
            Some(ExtensionRule::Static) => Format::Static,
            Some(ExtensionRule::Dynamic) => Format::Dynamic,
            Some(ExtensionRule::Ambiguous) | None => ambient,
        }
    }
}

impl Default for Extensions {
    fn default() -> Self {
        DEFAULT_EXTENSIONS
            .iter()
            .fold(Self::empty(), |table, (ext, rule)| table.with(*ext, *rule))
    }
}

/// Extension of `path` without the leading dot.
///
/// Dotfiles such as `.art` have no extension.
pub fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

/// File name of `path` with its final extension removed.
pub fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}
