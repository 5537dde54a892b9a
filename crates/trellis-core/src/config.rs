//! Walk Configuration
//!
//! `WalkConfig` is immutable once built and lives for one walk call.
//! `WalkSettings` is its serialisable subset, read from a JSON settings file.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classify::{EntryFilter, PathPredicate};
use crate::error::{BoxError, ConfigError};
use crate::format::{ExtensionRule, Extensions, Format};
use crate::visit::{visit_fn, LoadResult, Visitor};

/// Everything one walk needs.
pub struct WalkConfig<A: Send + 'static> {
    pub(crate) filter: EntryFilter,
    pub(crate) recursive: bool,
    pub(crate) stop_at_indexes: bool,
    pub(crate) default_format: Option<Format>,
    pub(crate) visitor: Arc<dyn Visitor<A>>,
}

impl<A: Send + 'static> WalkConfig<A> {
    pub fn builder() -> WalkConfigBuilder<A> {
        WalkConfigBuilder::new()
    }

    pub fn extensions(&self) -> &Extensions {
        &self.filter.extensions
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    pub fn stop_at_indexes(&self) -> bool {
        self.stop_at_indexes
    }

    /// Explicit ambient format, if manifest lookup is overridden.
    pub fn default_format(&self) -> Option<Format> {
        self.default_format
    }
}

impl<A: Send + 'static> fmt::Debug for WalkConfig<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkConfig")
            .field("filter", &self.filter)
            .field("recursive", &self.recursive)
            .field("stop_at_indexes", &self.stop_at_indexes)
            .field("default_format", &self.default_format)
            .field("visitor", &"...")
            .finish()
    }
}

/// Builder for `WalkConfig`. A visitor is mandatory.
pub struct WalkConfigBuilder<A: Send + 'static> {
    filter: EntryFilter,
    recursive: bool,
    stop_at_indexes: bool,
    default_format: Option<Format>,
    visitor: Option<Arc<dyn Visitor<A>>>,
}

impl<A: Send + 'static> WalkConfigBuilder<A> {
    pub fn new() -> Self {
        Self {
            filter: EntryFilter::default(),
            recursive: true,
            stop_at_indexes: true,
            default_format: None,
            visitor: None,
        }
    }

    pub fn extensions(mut self, extensions: Extensions) -> Self {
        self.filter.extensions = extensions;
        self
    }

    /// Recognise one more extension.
    pub fn extension(mut self, extension: impl Into<String>, rule: ExtensionRule) -> Self {
        self.filter.extensions.insert(extension, rule);
        self
    }

    pub fn include<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Path, &str) -> bool + Send + Sync + 'static,
    {
        self.filter.include = Arc::new(predicate);
        self
    }

    pub fn exclude<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&Path, &str) -> bool + Send + Sync + 'static,
    {
        self.filter.exclude = Arc::new(predicate);
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn stop_at_indexes(mut self, stop: bool) -> Self {
        self.stop_at_indexes = stop;
        self
    }

    /// Skip manifest lookup and use `format` everywhere.
    pub fn default_format(mut self, format: Format) -> Self {
        self.default_format = Some(format);
        self
    }

    pub fn visitor(mut self, visitor: impl Visitor<A> + 'static) -> Self {
        self.visitor = Some(Arc::new(visitor));
        self
    }

    pub fn visit<F, Fut>(self, f: F) -> Self
    where
        F: Fn(LoadResult<A>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.visitor(visit_fn(f))
    }

    /// Apply a settings file. Unset fields keep their current values.
    pub fn settings(mut self, settings: &WalkSettings) -> Self {
        if let Some(entries) = &settings.extensions {
            let mut extensions = Extensions::empty();
            for entry in entries {
                extensions.insert(entry.extension.clone(), entry.rule);
            }
            self.filter.extensions = extensions;
        }
        if let Some(recursive) = settings.recursive {
            self.recursive = recursive;
        }
        if let Some(stop) = settings.stop_at_indexes {
            self.stop_at_indexes = stop;
        }
        if settings.default_format.is_some() {
            self.default_format = settings.default_format;
        }
        if !settings.include.is_empty() {
            let patterns = settings.include.clone();
            self = self.include(move |path, _| contains_any(path, &patterns));
        }
        if !settings.exclude.is_empty() {
            let patterns = settings.exclude.clone();
            self = self.exclude(move |path, _| contains_any(path, &patterns));
        }
        self
    }

    pub fn build(self) -> Result<WalkConfig<A>, ConfigError> {
        let visitor = self.visitor.ok_or(ConfigError::MissingVisitor)?;
        Ok(WalkConfig {
            filter: self.filter,
            recursive: self.recursive,
            stop_at_indexes: self.stop_at_indexes,
            default_format: self.default_format,
            visitor,
        })
    }
}

impl<A: Send + 'static> Default for WalkConfigBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_any(path: &Path, patterns: &[String]) -> bool {
    let path = path.to_string_lossy();
    patterns.iter().any(|pattern| path.contains(pattern.as_str()))
}

/// Extension entry of a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSetting {
    pub extension: String,
    pub rule: ExtensionRule,
}

/// Serialisable walk options.
///
/// `include` / `exclude` hold path substrings: a file is included when any
/// include substring occurs in its full path and excluded when any exclude
/// substring does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkSettings {
    pub extensions: Option<Vec<ExtensionSetting>>,
    pub recursive: Option<bool>,
    pub stop_at_indexes: Option<bool>,
    pub default_format: Option<Format>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl WalkSettings {
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(path, &content)
    }

    /// Extension table these settings describe, or the defaults.
    pub fn extension_table(&self) -> Extensions {
        match &self.extensions {
            Some(entries) => entries.iter().fold(Extensions::empty(), |table, entry| {
                table.with(entry.extension.clone(), entry.rule)
            }),
            None => Extensions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_missing_visitor_is_rejected() {
        let err = WalkConfig::<Value>::builder().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVisitor));
    }

    #[test]
    fn test_builder_defaults() {
        let config = WalkConfig::<Value>::builder()
            .visit(|_| async { Ok(()) })
            .build()
            .unwrap();
        assert!(config.recursive());
        assert!(config.stop_at_indexes());
        assert_eq!(config.default_format(), None);
        assert_eq!(config.extensions(), &Extensions::default());
        assert!(config.filter.is_eligible(Path::new("/t"), "a.art"));
    }

    #[test]
    fn test_settings_file() {
        let raw = r#"{
            "extensions": [
                {"extension": "art", "rule": "ambiguous"},
                {"extension": "cart", "rule": "static"}
            ],
            "recursive": false,
            "default_format": "dynamic",
            "exclude": ["/vendor/"]
        }"#;
        let settings = WalkSettings::from_json(Path::new("trellis.json"), raw).unwrap();
        assert_eq!(settings.stop_at_indexes, None);

        let config = WalkConfig::<Value>::builder()
            .settings(&settings)
            .visit(|_| async { Ok(()) })
            .build()
            .unwrap();

        assert!(!config.recursive());
        assert!(config.stop_at_indexes());
        assert_eq!(config.default_format(), Some(Format::Dynamic));
        assert_eq!(config.extensions().rule("cart"), Some(ExtensionRule::Static));
        assert_eq!(config.extensions().rule("json"), None);
        assert!(config.filter.is_eligible(Path::new("/t"), "a.cart"));
        assert!(!config.filter.is_eligible(Path::new("/t/vendor"), "a.cart"));
    }

    #[test]
    fn test_later_settings_override_earlier_ones() {
        let file = WalkSettings {
            recursive: Some(false),
            exclude: vec!["/vendor/".into()],
            ..WalkSettings::default()
        };
        let flags = WalkSettings {
            stop_at_indexes: Some(false),
            exclude: vec!["/build/".into()],
            ..WalkSettings::default()
        };

        let config = WalkConfig::<Value>::builder()
            .settings(&file)
            .settings(&flags)
            .visit(|_| async { Ok(()) })
            .build()
            .unwrap();

        assert!(!config.recursive());
        assert!(!config.stop_at_indexes());
        assert!(config.filter.is_eligible(Path::new("/t/vendor"), "a.json"));
        assert!(!config.filter.is_eligible(Path::new("/t/build"), "a.json"));
    }

    #[test]
    fn test_settings_reject_unknown_fields() {
        let err = WalkSettings::from_json(Path::new("x.json"), r#"{"recursve": true}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Settings { .. }));
    }
}
