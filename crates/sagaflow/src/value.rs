use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

/// Scalar stored at a node of the variable tree.
///
/// The engine never inspects values; they only travel as fault payloads and
/// get written into scope frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Value {
    /// No value. Reading an unbound path yields `Void`.
    #[default]
    Void,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl Value {
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Short lowercase name of the variant, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A node of the hierarchical variable environment.
///
/// Every node carries a scalar and a set of named children. Each child name
/// maps to a vector of nodes so paths like `order.items[2]` can address a
/// specific element. Child order is insertion order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueTree {
    value: Value,
    children: IndexMap<String, Vec<ValueTree>>,
}

impl ValueTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            children: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Returns the vector bound to `name`, if any.
    #[must_use]
    pub fn children(&self, name: &str) -> Option<&[Self]> {
        self.children.get(name).map(Vec::as_slice)
    }

    /// Returns the first element bound to `name`, if any.
    #[must_use]
    pub fn first_child(&self, name: &str) -> Option<&Self> {
        self.children(name).and_then(<[Self]>::first)
    }

    /// Returns the vector bound to `name`, creating an empty one if needed.
    pub fn children_mut(&mut self, name: &str) -> &mut Vec<Self> {
        self.children.entry(name.to_owned()).or_default()
    }

    #[must_use]
    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Binds `name` to `nodes`, replacing any previous binding.
    pub fn bind_children(&mut self, name: String, nodes: Vec<Self>) {
        self.children.insert(name, nodes);
    }

    /// Moves every child binding out of this node, leaving it empty.
    pub(crate) fn take_children(&mut self) -> IndexMap<String, Vec<Self>> {
        std::mem::take(&mut self.children)
    }
}
