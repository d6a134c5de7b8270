use crate::{
    fault::StructuralError,
    path::VariablePath,
    value::{Value, ValueTree},
};

/// Scope id of the frame every session starts with.
pub const ROOT_SCOPE_ID: &str = "main";

#[derive(Debug, Clone)]
struct Frame {
    scope_id: String,
    bindings: ValueTree,
}

/// Hierarchical variable storage, one frame per open scope.
///
/// Writes always land in the innermost frame. A read resolves the path's first
/// segment in the innermost frame that binds it, so inner scopes see the
/// bindings of their enclosing scopes.
///
/// Writing below a name bound only by an enclosing frame first copies that
/// binding into the current frame, which keeps merge a plain per-name
/// overwrite: popping with `merge = true` replaces the parent's binding with
/// the child's complete copy, popping with `merge = false` leaves the parent
/// exactly as it was.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an environment holding only the root frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![Frame {
                scope_id: ROOT_SCOPE_ID.to_owned(),
                bindings: ValueTree::new(),
            }],
        }
    }

    /// Number of frames, including the root frame.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn current_scope_id(&self) -> &str {
        &self.current().scope_id
    }

    /// Bindings of the innermost frame.
    #[must_use]
    pub fn current_bindings(&self) -> &ValueTree {
        &self.current().bindings
    }

    /// Bindings of the root frame.
    #[must_use]
    pub fn root_bindings(&self) -> &ValueTree {
        &self.frames[0].bindings
    }

    pub fn push(&mut self, scope_id: &str) {
        self.frames.push(Frame {
            scope_id: scope_id.to_owned(),
            bindings: ValueTree::new(),
        });
    }

    /// Pops the innermost frame, folding its bindings into the parent when
    /// `merge` is true and dropping them otherwise.
    pub fn pop(&mut self, merge: bool) -> Result<(), StructuralError> {
        if self.frames.len() == 1 {
            return Err(StructuralError::ScopeUnderflow);
        }
        let Some(mut frame) = self.frames.pop() else {
            return Err(StructuralError::ScopeUnderflow);
        };
        if merge {
            let parent = &mut self.current_mut().bindings;
            for (name, nodes) in frame.bindings.take_children() {
                parent.bind_children(name, nodes);
            }
        }
        Ok(())
    }

    /// Resolves `path` from the innermost frame outwards.
    #[must_use]
    pub fn lookup(&self, path: &VariablePath) -> Option<&ValueTree> {
        let name = &path.first().name;
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.bindings.has_child(name))
            .and_then(|frame| path.lookup(&frame.bindings))
    }

    /// Returns the value at `path`, or `Void` when unbound.
    #[must_use]
    pub fn value(&self, path: &VariablePath) -> Value {
        self.lookup(path).map(|node| node.value().clone()).unwrap_or_default()
    }

    /// Writes `value` at `path` in the innermost frame.
    pub fn write(&mut self, path: &VariablePath, value: Value) -> Result<(), StructuralError> {
        self.lookup_or_create(path)?.set_value(value);
        Ok(())
    }

    /// Resolves `path` in the innermost frame, creating missing nodes.
    pub fn lookup_or_create(&mut self, path: &VariablePath) -> Result<&mut ValueTree, StructuralError> {
        let name = path.first().name.clone();
        if !self.current().bindings.has_child(&name)
            && let Some(inherited) = self
                .frames
                .iter()
                .rev()
                .skip(1)
                .find_map(|frame| frame.bindings.children(&name))
        {
            let copy = inherited.to_vec();
            self.current_mut().bindings.bind_children(name, copy);
        }
        path.lookup_or_create(&mut self.current_mut().bindings)
    }

    fn current(&self) -> &Frame {
        self.frames.last().expect("environment always holds the root frame")
    }

    fn current_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("environment always holds the root frame")
    }
}
