// ABOUTME: Placeholder renderer resolving `{path}` expressions against the environment store
// ABOUTME: Provides pure rendering, recursive value rendering, and store-internal reference expansion

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::{Result, TemplateError};
use crate::environ::{scalar_to_string, EnvStore, EnvironError};

/// A parsed piece of a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(String),
    Placeholder(&'a str),
}

/// Split a template into literal text and placeholder paths.
///
/// `{path}` is a placeholder; `{{` and `}}` are literal braces. A lone `}`,
/// an unclosed `{`, a nested `{` and an empty placeholder are syntax errors.
pub fn parse(template: &str) -> Result<Vec<Segment<'_>>> {
    let syntax = |position: usize, message: &str| TemplateError::SyntaxError {
        template: template.to_string(),
        position,
        message: message.to_string(),
    };

    let bytes = template.as_bytes();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                literal.push_str(&template[literal_start..=i]);
                i += 2;
                literal_start = i;
            }
            b'{' => {
                literal.push_str(&template[literal_start..i]);
                let rest = &template[i + 1..];
                let end = match rest.find(['{', '}']) {
                    Some(end) if rest.as_bytes()[end] == b'}' => end,
                    Some(_) => return Err(syntax(i, "nested '{' inside placeholder")),
                    None => return Err(syntax(i, "unclosed placeholder")),
                };
                let path = rest[..end].trim();
                if path.is_empty() {
                    return Err(syntax(i, "empty placeholder"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(path));
                i += end + 2;
                literal_start = i;
            }
            b'}' => return Err(syntax(i, "single '}' outside placeholder")),
            _ => i += 1,
        }
    }

    literal.push_str(&template[literal_start..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Paths referenced by a template, in order of appearance
pub fn placeholders(template: &str) -> Result<Vec<&str>> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(path) => Some(path),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Check if a string contains at least one well-formed placeholder
pub fn has_placeholders(text: &str) -> bool {
    placeholders(text).map(|p| !p.is_empty()).unwrap_or(false)
}

/// Render a template, asking `resolve` for the text of each placeholder path
pub fn render_with<F>(template: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut output = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => output.push_str(&text),
            Segment::Placeholder(path) => output.push_str(&resolve(path)?),
        }
    }
    Ok(output)
}

/// Render a template against the environment store
pub fn render(template: &str, store: &EnvStore) -> Result<String> {
    render_with(template, |path| {
        let value = lookup(store, path, template)?;
        scalar_text(path, value)
    })
}

/// Recursively render every string inside a structured value
pub fn render_value(value: &Value, store: &EnvStore) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(render(s, store)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| render_value(item, store))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut rendered = Map::new();
            for (key, item) in map {
                rendered.insert(key.clone(), render_value(item, store)?);
            }
            Ok(Value::Object(rendered))
        }
        // Numbers, booleans, and null values don't need template resolution
        other => Ok(other.clone()),
    }
}

/// Expand placeholders inside the store's own string values.
///
/// `workdir: "{root}/work"` becomes `"/scratch/work"` when `root` is
/// `"/scratch"`. Referenced values are expanded first, so chains of any depth
/// resolve; a chain that loops back on itself is a `CircularReference`.
pub fn resolve_references(store: &EnvStore) -> Result<EnvStore> {
    let mut resolver = ReferenceResolver {
        store,
        stack: Vec::new(),
        cache: HashMap::new(),
    };

    let mut resolved = Map::new();
    for (key, value) in store.as_map() {
        resolved.insert(key.clone(), resolver.resolve_value(value)?);
    }
    Ok(EnvStore::from_map(resolved))
}

struct ReferenceResolver<'s> {
    store: &'s EnvStore,
    stack: Vec<String>,
    cache: HashMap<String, String>,
}

impl<'s> ReferenceResolver<'s> {
    fn resolve_value(&mut self, value: &'s Value) -> Result<Value> {
        match value {
            Value::String(s) if has_braces(s) => Ok(Value::String(self.render(s)?)),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_value(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut resolved = Map::new();
                for (key, item) in map {
                    resolved.insert(key.clone(), self.resolve_value(item)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    fn render(&mut self, template: &'s str) -> Result<String> {
        render_with(template, |path| self.resolve_path(path, template))
    }

    fn resolve_path(&mut self, path: &str, template: &str) -> Result<String> {
        if let Some(text) = self.cache.get(path) {
            return Ok(text.clone());
        }

        let store = self.store;
        let text = match lookup(store, path, template)? {
            Value::String(s) if has_braces(s) => {
                if self.stack.iter().any(|p| p == path) {
                    return Err(TemplateError::CircularReference {
                        path: path.to_string(),
                    });
                }
                self.stack.push(path.to_string());
                let rendered = self.render(s);
                self.stack.pop();
                rendered?
            }
            other => scalar_text(path, other)?,
        };

        self.cache.insert(path.to_string(), text.clone());
        Ok(text)
    }
}

fn has_braces(text: &str) -> bool {
    text.contains(['{', '}'])
}

fn lookup<'s>(store: &'s EnvStore, path: &str, template: &str) -> Result<&'s Value> {
    store.lookup(path).map_err(|e| match e {
        EnvironError::MissingEnvironmentKey { path } => TemplateError::MissingEnvironmentKey {
            path,
            template: template.to_string(),
        },
        EnvironError::InvalidPath { path, reason } => TemplateError::InvalidPath { path, reason },
        other => TemplateError::InvalidPath {
            path: path.to_string(),
            reason: other.to_string(),
        },
    })
}

fn scalar_text(path: &str, value: &Value) -> Result<String> {
    scalar_to_string(value).ok_or_else(|| TemplateError::NotScalar {
        path: path.to_string(),
    })
}
