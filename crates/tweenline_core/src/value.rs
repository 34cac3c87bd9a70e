// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value trees for structural interpolation.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A step along a [`Path`] into a [`Value`] tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

/// A path from the root of a [`Value`] tree to one of its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Path(Vec<Step>);

impl Path {
    /// The empty path, addressing the root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Append an object key.
    pub fn push_key(&mut self, key: impl Into<String>) {
        self.0.push(Step::Key(key.into()));
    }

    /// Append an array index.
    pub fn push_index(&mut self, index: usize) {
        self.0.push(Step::Index(index));
    }

    /// Remove the last step.
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// The steps of this path, root first.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// Whether this path addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for (i, step) in self.0.iter().enumerate() {
            match step {
                Step::Key(key) => {
                    if i == 0 {
                        write!(f, "{key}")?;
                    } else {
                        write!(f, ".{key}")?;
                    }
                }
                Step::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A dynamically-shaped value: the unit of interpolation.
///
/// Numeric leaves are the only blendable kind; `Bool` and `Text` leaves snap
/// to their destination at completion. Containers are walked structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A numeric leaf.
    Number(f64),
    /// A boolean leaf.
    Bool(bool),
    /// A string leaf.
    Text(String),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A keyed map of values. Insertion order is preserved.
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Build an object value from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array value.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self::Array(items.into_iter().map(Into::into).collect())
    }

    /// A short name for the kind of this value, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// The numeric payload, if this is a number leaf.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Traverse to the node addressed by `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut node = self;
        for step in path.steps() {
            node = match (node, step) {
                (Self::Object(map), Step::Key(key)) => map.get(key)?,
                (Self::Array(items), Step::Index(index)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Traverse to the node addressed by `path`, mutably.
    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Value> {
        let mut node = self;
        for step in path.steps() {
            node = match (node, step) {
                (Self::Object(map), Step::Key(key)) => map.get_mut(key)?,
                (Self::Array(items), Step::Index(index)) => items.get_mut(*index)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}
