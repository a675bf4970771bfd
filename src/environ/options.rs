// ABOUTME: Option builder composing default values and caller overrides into an environment store
// ABOUTME: Handles YAML environment files, key=value overrides, deep merging, and reference resolution

use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

use super::error::{EnvironError, Result};
use super::store::EnvStore;
use crate::template;

/// Builds the environment store for one task invocation.
///
/// Layers are merged lowest precedence first: defaults, then environment
/// files in the order given, then individual overrides. Mappings merge
/// recursively; any other value replaces what was there.
#[derive(Debug, Clone)]
pub struct EnvironBuilder {
    base: Value,
    overrides: Vec<(String, Value)>,
    resolve_references: bool,
}

impl EnvironBuilder {
    pub fn new() -> Self {
        Self {
            base: Value::Object(Map::new()),
            overrides: Vec::new(),
            resolve_references: true,
        }
    }

    /// Merge a layer of values over everything added so far
    pub fn layer(mut self, value: Value) -> Self {
        deep_merge(&mut self.base, value);
        self
    }

    /// Merge the default values; an alias of [`EnvironBuilder::layer`] for readability
    pub fn defaults(self, value: Value) -> Self {
        self.layer(value)
    }

    /// Merge a YAML document
    pub fn yaml(self, content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        match value {
            Value::Object(_) => Ok(self.layer(value)),
            Value::Null => Ok(self),
            other => Err(EnvironError::NotAMapping {
                found: super::store::type_name(&other),
            }),
        }
    }

    /// Merge a YAML environment file
    pub fn file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading environment file: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        self.yaml(&content)
    }

    /// Set one value by path; applied after every layer
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.push((path.into(), value.into()));
        self
    }

    /// Apply `key=value` overrides as typed on a command line
    pub fn assignments<S: AsRef<str>>(mut self, items: &[S]) -> Result<Self> {
        for item in items {
            let (path, value) = parse_assignment(item.as_ref())?;
            self.overrides.push((path, value));
        }
        Ok(self)
    }

    /// Whether string values referencing other keys (`{expdir}/work`) are expanded on build
    pub fn resolve_references(mut self, enabled: bool) -> Self {
        self.resolve_references = enabled;
        self
    }

    pub fn build(self) -> Result<EnvStore> {
        let mut store = EnvStore::from_value(self.base)?;
        for (path, value) in self.overrides {
            // Overrides of mappings merge like layers do
            let merged = match (store.find(&path), value) {
                (Some(existing @ Value::Object(_)), value @ Value::Object(_)) => {
                    let mut existing = existing.clone();
                    deep_merge(&mut existing, value);
                    existing
                }
                (_, value) => value,
            };
            store.set_path(&path, merged)?;
        }

        if self.resolve_references {
            store = template::resolve_references(&store)?;
        }

        debug!("Environment built with {} top-level keys", store.len());
        Ok(store)
    }
}

impl Default for EnvironBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively merge `overlay` into `base`
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Split `key=value`, typing the value as a YAML scalar or flow sequence
pub fn parse_assignment(item: &str) -> Result<(String, Value)> {
    let (key, raw) = item
        .split_once('=')
        .ok_or_else(|| EnvironError::InvalidOverride(item.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(EnvironError::InvalidOverride(item.to_string()));
    }

    let raw = raw.trim();
    let value = if raw.is_empty() {
        Value::String(String::new())
    } else {
        // Anything YAML cannot type stays a plain string
        serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };
    let value = match value {
        Value::Null => Value::String(raw.to_string()),
        other => other,
    };

    Ok((key.to_string(), value))
}
