// ABOUTME: Decoded namelist document: ordered groups of ordered variable assignments
// ABOUTME: Provides lookup and edit operations that keep first-seen ordering intact

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{NamelistError, Result};
use super::value::NmlValue;

pub type Group = IndexMap<String, NmlValue>;

/// An ordered mapping from group name to the group's assignments.
///
/// Group and key order follow the source text; edits to an existing key keep
/// its position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    groups: IndexMap<String, Group>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&String, &Group)> {
        self.groups.iter()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(|k| k.as_str()).collect()
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn group(&self, group: &str) -> Option<&Group> {
        self.groups.get(group)
    }

    pub fn group_mut(&mut self, group: &str) -> Option<&mut Group> {
        self.groups.get_mut(group)
    }

    /// Get a group, appending an empty one if it does not exist yet
    pub fn add_group(&mut self, group: impl Into<String>) -> &mut Group {
        self.groups.entry(group.into()).or_default()
    }

    /// Key names of one group in document order
    pub fn keys(&self, group: &str) -> Option<Vec<&str>> {
        self.groups
            .get(group)
            .map(|g| g.keys().map(|k| k.as_str()).collect())
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&NmlValue> {
        self.groups.get(group).and_then(|g| g.get(key))
    }

    /// Assign a variable inside an existing group, returning the previous value
    pub fn set(
        &mut self,
        group: &str,
        key: impl Into<String>,
        value: impl Into<NmlValue>,
    ) -> Result<Option<NmlValue>> {
        let target = self
            .groups
            .get_mut(group)
            .ok_or_else(|| NamelistError::MissingGroup {
                group: group.to_string(),
            })?;
        Ok(target.insert(key.into(), value.into()))
    }

    /// Remove a variable, closing the gap it leaves in the key order
    pub fn remove(&mut self, group: &str, key: &str) -> Option<NmlValue> {
        self.groups
            .get_mut(group)
            .and_then(|g| g.shift_remove(key))
    }
}

impl FromStr for Document {
    type Err = NamelistError;

    fn from_str(text: &str) -> Result<Self> {
        super::decode::decode(text)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::encode::encode(self))
    }
}
