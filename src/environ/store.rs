// ABOUTME: Nested configuration tree describing one run's parameters
// ABOUTME: Resolves dotted and bracketed paths and exposes typed scalar accessors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{EnvironError, Result};

/// One step of an environment path: `a.b[0][c]` is `Key(a)`, `Key(b)`, `Index(0)`, `Key(c)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// The environment store for a single task invocation.
///
/// Values are held as JSON values so that the store can be built from YAML
/// files, command line overrides, and inline defaults alike. Key order is
/// preserved. The store is owned by one task and mutated sequentially; write
/// backs (such as submitted job identifiers) go through [`EnvStore::set`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvStore {
    root: Map<String, Value>,
}

impl EnvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON value, which must be a mapping
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::new()),
            other => Err(EnvironError::NotAMapping {
                found: type_name(&other),
            }),
        }
    }

    pub fn from_map(root: Map<String, Value>) -> Self {
        Self { root }
    }

    /// Parse a store from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content)?;
        Self::from_value(value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level lookup without path parsing
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Resolve a dotted/bracketed path to its value
    pub fn lookup(&self, path: &str) -> Result<&Value> {
        let segments = parse_path(path)?;
        let mut segments = segments.iter();

        let first = match segments.next() {
            Some(PathSegment::Key(key)) => key,
            _ => {
                return Err(EnvironError::InvalidPath {
                    path: path.to_string(),
                    reason: "path must start with a key".to_string(),
                })
            }
        };

        let mut current = self.root.get(first).ok_or_else(|| missing(path))?;
        for segment in segments {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key),
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
                // `a[0]` on a mapping keyed by "0" is legitimate YAML
                (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
                _ => None,
            }
            .ok_or_else(|| missing(path))?;
        }

        Ok(current)
    }

    /// Like [`EnvStore::lookup`], but a path that does not resolve is `None`
    pub fn find(&self, path: &str) -> Option<&Value> {
        self.lookup(path).ok()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Render the value at `path` as text; only scalars and lists of scalars qualify
    pub fn get_string(&self, path: &str) -> Result<String> {
        let value = self.lookup(path)?;
        scalar_to_string(value).ok_or_else(|| EnvironError::TypeMismatch {
            path: path.to_string(),
            expected: "a scalar",
            found: type_name(value),
        })
    }

    /// Integer accessor; numeric strings (as typed on a command line) are accepted
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.lookup(path)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| EnvironError::TypeMismatch {
            path: path.to_string(),
            expected: "an integer",
            found: type_name(value),
        })
    }

    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.lookup(path)?;
        match value {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(EnvironError::TypeMismatch {
                path: path.to_string(),
                expected: "a boolean",
                found: type_name(value),
            }),
        }
    }

    /// Boolean switch that defaults to `false` when absent or not a boolean
    pub fn flag(&self, path: &str) -> bool {
        self.get_bool(path).unwrap_or(false)
    }

    /// Set a top-level key, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.root.insert(key.into(), value.into());
    }

    /// Set a value at a path, creating intermediate mappings as needed
    pub fn set_path(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = parse_path(path)?;
        let (last, parents) = match segments.split_last() {
            Some(split) => split,
            None => {
                return Err(EnvironError::InvalidPath {
                    path: path.to_string(),
                    reason: "empty path".to_string(),
                })
            }
        };

        let mut current = &mut self.root;
        for segment in parents {
            let key = segment_key(path, segment)?;
            let entry = current
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => unreachable!("entry was just made a mapping"),
            };
        }

        current.insert(segment_key(path, last)?, value.into());
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.root.shift_remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.root.keys()
    }
}

/// Parse `a.b[0][c]` into path segments
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let invalid = |reason: &str| EnvironError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut current = String::new();
    // Set after a closing bracket, where a bare key may not follow directly
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return Err(invalid("empty key"));
                }
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                }
                after_bracket = false;
                if chars.peek().is_none() {
                    return Err(invalid("trailing '.'"));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current)));
                } else if segments.is_empty() {
                    return Err(invalid("path must start with a key"));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(invalid("unclosed '['"));
                }
                let inner = inner.trim().trim_matches(|c| c == '\'' || c == '"');
                if inner.is_empty() {
                    return Err(invalid("empty index"));
                }
                segments.push(match inner.parse::<usize>() {
                    Ok(index) => PathSegment::Index(index),
                    Err(_) => PathSegment::Key(inner.to_string()),
                });
                after_bracket = true;
            }
            ']' => return Err(invalid("unexpected ']'")),
            c if c.is_whitespace() => return Err(invalid("whitespace in path")),
            c => {
                if after_bracket {
                    return Err(invalid("expected '.' or '[' after ']'"));
                }
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Key(current));
    }
    if segments.is_empty() {
        return Err(invalid("empty path"));
    }

    Ok(segments)
}

/// Text form of a scalar value, or of a list of scalars joined by commas
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::Array(_) => None,
                    other => scalar_to_string(other),
                })
                .collect();
            parts.map(|parts| parts.join(","))
        }
        Value::Null | Value::Object(_) => None,
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn missing(path: &str) -> EnvironError {
    EnvironError::MissingEnvironmentKey {
        path: path.to_string(),
    }
}

fn segment_key(path: &str, segment: &PathSegment) -> Result<String> {
    match segment {
        PathSegment::Key(key) => Ok(key.clone()),
        PathSegment::Index(_) => Err(EnvironError::InvalidPath {
            path: path.to_string(),
            reason: "cannot assign through a sequence index".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> EnvStore {
        EnvStore::from_value(json!({
            "name": "exp01",
            "npes": 32,
            "days": "10",
            "concurrent": true,
            "ocean_namelist": {
                "file": "/home/run/input.nml",
                "vars": { "coupler_nml": { "calendar": "julian" } }
            },
            "hosts": ["a", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_path_segments() {
        assert_eq!(
            parse_path("a.b[0][c]").unwrap(),
            vec![
                PathSegment::Key("a".to_string()),
                PathSegment::Key("b".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("c".to_string()),
            ]
        );
        assert_eq!(
            parse_path("ocean_namelist[file]").unwrap(),
            vec![
                PathSegment::Key("ocean_namelist".to_string()),
                PathSegment::Key("file".to_string()),
            ]
        );
        assert_eq!(
            parse_path("a[1].b").unwrap(),
            vec![
                PathSegment::Key("a".to_string()),
                PathSegment::Index(1),
                PathSegment::Key("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_path_rejects_malformed() {
        assert!(parse_path("").is_err());
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("a.").is_err());
        assert!(parse_path("a[").is_err());
        assert!(parse_path("a[]").is_err());
        assert!(parse_path("[0]").is_err());
        assert!(parse_path("a]").is_err());
        assert!(parse_path("a b").is_err());
    }

    #[test]
    fn test_lookup_nested_and_bracketed() {
        let store = sample();
        assert_eq!(
            store.lookup("ocean_namelist.file").unwrap(),
            &json!("/home/run/input.nml")
        );
        assert_eq!(
            store.lookup("ocean_namelist[file]").unwrap(),
            &json!("/home/run/input.nml")
        );
        assert_eq!(store.lookup("hosts[1]").unwrap(), &json!("b"));
    }

    #[test]
    fn test_lookup_missing_key() {
        let store = sample();
        let err = store.lookup("ocean_namelist.missing").unwrap_err();
        assert!(matches!(
            err,
            EnvironError::MissingEnvironmentKey { ref path } if path == "ocean_namelist.missing"
        ));
        assert!(store.lookup("hosts[5]").is_err());
        assert!(store.lookup("name.deeper").is_err());
        assert!(!store.contains("nope"));
    }

    #[test]
    fn test_typed_accessors() {
        let store = sample();
        assert_eq!(store.get_i64("npes").unwrap(), 32);
        assert_eq!(store.get_i64("days").unwrap(), 10);
        assert!(store.get_bool("concurrent").unwrap());
        assert!(store.flag("concurrent"));
        assert!(!store.flag("absent"));
        assert_eq!(store.get_string("npes").unwrap(), "32");
        assert_eq!(store.get_string("hosts").unwrap(), "a,b");
        assert!(matches!(
            store.get_string("ocean_namelist"),
            Err(EnvironError::TypeMismatch { .. })
        ));
        assert!(store.get_i64("name").is_err());
    }

    #[test]
    fn test_set_and_set_path() {
        let mut store = sample();
        store.set("JobID_model", "12345.sdb");
        assert_eq!(store.get_string("JobID_model").unwrap(), "12345.sdb");

        store.set_path("regrid.vars.nml.key", 3).unwrap();
        assert_eq!(store.get_i64("regrid.vars.nml.key").unwrap(), 3);

        // A scalar in the way is replaced by a mapping
        store.set_path("name.sub", "x").unwrap();
        assert_eq!(store.get_string("name.sub").unwrap(), "x");

        assert!(store.set_path("hosts[0]", "c").is_err());
    }

    #[test]
    fn test_from_value_requires_mapping() {
        assert!(EnvStore::from_value(json!([1, 2])).is_err());
        assert!(EnvStore::from_value(json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_from_yaml() {
        let store = EnvStore::from_yaml("name: run\nstart: 1999123112\n").unwrap();
        assert_eq!(store.get_string("start").unwrap(), "1999123112");
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["name", "start"]);
    }
}
