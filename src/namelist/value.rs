// ABOUTME: Typed namelist values: scalars and homogeneous scalar lists
// ABOUTME: Converts between namelist values and the JSON values held by the environment store

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Str,
}

/// A variable's value: one scalar, or a list of scalars of one kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NmlValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Scalar::Bool(_) => ScalarKind::Bool,
            Scalar::Int(_) => ScalarKind::Int,
            Scalar::Float(_) => ScalarKind::Float,
            Scalar::Str(_) => ScalarKind::Str,
        }
    }

    fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Bool(b) => Some(Scalar::Bool(*b)),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            JsonValue::String(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Scalar::Bool(b) => JsonValue::Bool(*b),
            Scalar::Int(i) => JsonValue::from(*i),
            Scalar::Float(f) => JsonValue::from(*f),
            Scalar::Str(s) => JsonValue::String(s.clone()),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Bool => "logical",
            ScalarKind::Int => "integer",
            ScalarKind::Float => "real",
            ScalarKind::Str => "character",
        };
        write!(f, "{}", name)
    }
}

impl NmlValue {
    /// Build a value from decoded items: one item is a scalar, more are a list.
    ///
    /// Integers mixed with reals are promoted to reals; any other mix of kinds
    /// is rejected.
    pub fn from_scalars(items: Vec<Scalar>) -> Result<Self, String> {
        let mut items = homogenize(items)?;
        match items.len() {
            0 => Err("empty value".to_string()),
            1 => Ok(NmlValue::Scalar(items.remove(0))),
            _ => Ok(NmlValue::List(items)),
        }
    }

    /// Build a list value, keeping single-element lists as lists
    pub fn list(items: Vec<Scalar>) -> Result<Self, String> {
        if items.is_empty() {
            return Err("empty list".to_string());
        }
        Ok(NmlValue::List(homogenize(items)?))
    }

    pub fn scalars(&self) -> &[Scalar] {
        match self {
            NmlValue::Scalar(scalar) => std::slice::from_ref(scalar),
            NmlValue::List(items) => items,
        }
    }

    pub fn kind(&self) -> Option<ScalarKind> {
        self.scalars().first().map(Scalar::kind)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NmlValue::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NmlValue::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NmlValue::Scalar(Scalar::Float(f)) => Some(*f),
            NmlValue::Scalar(Scalar::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NmlValue::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            NmlValue::Scalar(scalar) => scalar.to_json(),
            NmlValue::List(items) => JsonValue::Array(items.iter().map(Scalar::to_json).collect()),
        }
    }
}

impl TryFrom<&JsonValue> for NmlValue {
    type Error = String;

    fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Array(items) => {
                let scalars = items
                    .iter()
                    .map(|item| {
                        Scalar::from_json(item)
                            .ok_or_else(|| "lists may only hold scalars".to_string())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                NmlValue::list(scalars)
            }
            JsonValue::Object(_) => Err("mappings cannot be namelist values".to_string()),
            JsonValue::Null => Err("null cannot be a namelist value".to_string()),
            scalar => Scalar::from_json(scalar)
                .map(NmlValue::Scalar)
                .ok_or_else(|| "unsupported scalar".to_string()),
        }
    }
}

impl From<Scalar> for NmlValue {
    fn from(scalar: Scalar) -> Self {
        NmlValue::Scalar(scalar)
    }
}

impl From<bool> for NmlValue {
    fn from(value: bool) -> Self {
        NmlValue::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for NmlValue {
    fn from(value: i64) -> Self {
        NmlValue::Scalar(Scalar::Int(value))
    }
}

impl From<f64> for NmlValue {
    fn from(value: f64) -> Self {
        NmlValue::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for NmlValue {
    fn from(value: &str) -> Self {
        NmlValue::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for NmlValue {
    fn from(value: String) -> Self {
        NmlValue::Scalar(Scalar::Str(value))
    }
}

fn homogenize(items: Vec<Scalar>) -> Result<Vec<Scalar>, String> {
    let first = match items.first() {
        Some(first) => first.kind(),
        None => return Ok(items),
    };

    let mut promote = false;
    for item in &items {
        match (first, item.kind()) {
            (a, b) if a == b => {}
            (ScalarKind::Int, ScalarKind::Float) | (ScalarKind::Float, ScalarKind::Int) => {
                promote = true
            }
            (a, b) => return Err(format!("list mixes {} and {} values", a, b)),
        }
    }

    if !promote {
        return Ok(items);
    }
    Ok(items
        .into_iter()
        .map(|item| match item {
            Scalar::Int(i) => Scalar::Float(i as f64),
            other => other,
        })
        .collect())
}
