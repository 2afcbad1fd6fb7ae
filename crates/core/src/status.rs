//! Status bookkeeping: phase conditions and child resource records.
//!
//! Both lists are update-or-append by a natural key. They are held as an
//! ordered map (insertion order plus a key index) and serialized as a plain
//! JSON array.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::gvk::{GroupVersionKind, ObjectRef};

/// An entry identified by a natural key.
pub trait Keyed {
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// Insertion-ordered list with at most one entry per key.
#[derive(Clone)]
pub struct KeyedList<T: Keyed> {
    items: Vec<T>,
    index: HashMap<T::Key, usize>,
}

impl<T: Keyed> KeyedList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.index.get(key).and_then(|&i| self.items.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Keep only the entries `keep` accepts, in their existing order.
    ///
    /// Returns whether the list changed.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> bool {
        let before = self.items.len();
        self.items.retain(|item| keep(item));
        if self.items.len() == before {
            return false;
        }
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key(), i))
            .collect();
        true
    }
}

impl<T: Keyed + PartialEq> KeyedList<T> {
    /// Replace the entry with the same key in place, or append it.
    ///
    /// Returns whether the list changed.
    pub fn upsert(&mut self, item: T) -> bool {
        let key = item.key();
        match self.index.get(&key).and_then(|&i| self.items.get_mut(i)) {
            Some(existing) if *existing == item => false,
            Some(existing) => {
                *existing = item;
                true
            }
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
                true
            }
        }
    }
}

impl<T: Keyed> Default for KeyedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed + fmt::Debug> fmt::Debug for KeyedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Keyed + PartialEq> PartialEq for KeyedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Keyed + PartialEq> FromIterator<T> for KeyedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.upsert(item);
        }
        list
    }
}

impl<'a, T: Keyed> IntoIterator for &'a KeyedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Keyed + Serialize> Serialize for KeyedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Keyed + PartialEq + Deserialize<'de>> Deserialize<'de> for KeyedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}

/// Outcome recorded for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseState {
    Pending,
    Complete,
    Failed,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseCondition {
    pub phase: String,
    pub state: PhaseState,
    #[serde(default)]
    pub reason: String,
    pub last_transition_time: DateTime<Utc>,
}

impl Keyed for PhaseCondition {
    type Key = String;

    fn key(&self) -> String {
        self.phase.clone()
    }
}

/// Compound key of a generated child: group, version, kind, name, namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildKey {
    pub gvk: GroupVersionKind,
    pub name: String,
    pub namespace: String,
}

/// Last known existence and readiness of one generated child object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildResource {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ChildResource {
    pub fn new(gvk: &GroupVersionKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(self.group.clone(), self.version.clone(), self.kind.clone())
    }
}

impl Keyed for ChildResource {
    type Key = ChildKey;

    fn key(&self) -> ChildKey {
        ChildKey {
            gvk: self.gvk(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// Observed state shared by collections and components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub dependencies_satisfied: bool,
    #[serde(default)]
    pub conditions: KeyedList<PhaseCondition>,
    #[serde(default)]
    pub resources: KeyedList<ChildResource>,
}

impl WorkloadStatus {
    /// Record the state of a phase. The transition time only moves when the
    /// state itself changes.
    ///
    /// Returns whether the status changed.
    pub fn set_phase_condition(
        &mut self,
        phase: &str,
        state: PhaseState,
        reason: impl Into<String>,
    ) -> bool {
        let reason = reason.into();
        let last_transition_time = match self.conditions.get(&phase.to_string()) {
            Some(existing) if existing.state == state => existing.last_transition_time,
            _ => Utc::now(),
        };
        self.conditions.upsert(PhaseCondition {
            phase: phase.to_string(),
            state,
            reason,
            last_transition_time,
        })
    }

    #[must_use]
    pub fn phase_condition(&self, phase: &str) -> Option<&PhaseCondition> {
        self.conditions.get(&phase.to_string())
    }

    /// Returns whether the status changed.
    pub fn set_child_resource(&mut self, child: ChildResource) -> bool {
        self.resources.upsert(child)
    }

    /// Forget every child record not in `current`.
    ///
    /// Returns whether the status changed.
    pub fn prune_child_resources(&mut self, current: &[ObjectRef]) -> bool {
        self.resources.retain(|child| {
            current.iter().any(|applied| {
                applied.key.name == child.name
                    && applied.key.namespace == child.namespace
                    && applied.gvk == child.gvk()
            })
        })
    }
}
