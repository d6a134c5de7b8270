//! Variable paths addressing nodes of a [`ValueTree`].
//!
//! The textual form is a dot-separated list of names, each optionally followed
//! by a bracketed element index: `order.items[2].price`. A missing index means
//! element `0`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{fault::StructuralError, value::ValueTree};

/// One step of a variable path: a child name and an element index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    pub name: String,
    pub index: usize,
}

impl PathSegment {
    #[must_use]
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// A non-empty sequence of [`PathSegment`]s.
///
/// Serialized in its textual form so program files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariablePath(SmallVec<[PathSegment; 4]>);

impl VariablePath {
    /// Builds a path from already-validated segments.
    ///
    /// Returns `None` for an empty segment list.
    #[must_use]
    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Option<Self> {
        let segments: SmallVec<[PathSegment; 4]> = segments.into_iter().collect();
        if segments.is_empty() { None } else { Some(Self(segments)) }
    }

    /// Single-segment path addressing element `0` of `name`.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self(smallvec::smallvec![PathSegment::new(name, 0)])
    }

    /// Returns a new path with `name[index]` appended.
    #[must_use]
    pub fn join(&self, name: impl Into<String>, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::new(name, index));
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// The first segment, which selects the frame binding.
    #[must_use]
    pub fn first(&self) -> &PathSegment {
        &self.0[0]
    }

    /// Resolves the path below `tree`, returning `None` if any step is unbound.
    #[must_use]
    pub fn lookup<'t>(&self, tree: &'t ValueTree) -> Option<&'t ValueTree> {
        let mut node = tree;
        for segment in &self.0 {
            node = node.children(&segment.name)?.get(segment.index)?;
        }
        Some(node)
    }

    /// Resolves the path below `tree`, creating missing nodes along the way.
    ///
    /// An index may extend a vector by exactly one element; anything further is
    /// rejected with [`StructuralError::IndexOutOfRange`].
    pub fn lookup_or_create<'t>(&self, tree: &'t mut ValueTree) -> Result<&'t mut ValueTree, StructuralError> {
        let mut node = tree;
        for segment in &self.0 {
            let current = node;
            let nodes = current.children_mut(&segment.name);
            let len = nodes.len();
            if segment.index > len {
                return Err(StructuralError::IndexOutOfRange {
                    path: self.to_string(),
                    index: segment.index,
                    len,
                });
            }
            if segment.index == len {
                nodes.push(ValueTree::new());
            }
            node = &mut nodes[segment.index];
        }
        Ok(node)
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for VariablePath {
    type Err = StructuralError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| StructuralError::InvalidPath {
            path: path.to_owned(),
            reason,
        };
        let mut segments = SmallVec::new();
        for part in path.split('.') {
            let (name, index) = match part.find('[') {
                Some(open) => {
                    let Some(digits) = part[open + 1..].strip_suffix(']') else {
                        return Err(invalid("unterminated index"));
                    };
                    let index = digits.parse::<usize>().map_err(|_| invalid("index is not a number"))?;
                    (&part[..open], index)
                }
                None => (part, 0),
            };
            if name.is_empty() {
                return Err(invalid("empty segment name"));
            }
            if name.contains(']') {
                return Err(invalid("unbalanced brackets"));
            }
            segments.push(PathSegment::new(name, index));
        }
        Ok(Self(segments))
    }
}

impl TryFrom<String> for VariablePath {
    type Error = StructuralError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VariablePath> for String {
    fn from(path: VariablePath) -> Self {
        path.to_string()
    }
}
