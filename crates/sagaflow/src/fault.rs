use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{resource::ResourceError, value::Value};

/// Result type alias for operations that run inside a session.
pub type RunResult<T> = Result<T, RunError>;

/// Fault name raised when the session's output sink fails.
pub const IO_FAULT_NAME: &str = "IOException";

/// A named, payload-carrying fault raised by a process.
///
/// Faults are recoverable: the innermost scope with a matching (or default)
/// handler resolves them. A fault nobody handles surfaces to the session's
/// caller as [`SessionError::UncaughtFault`](crate::SessionError::UncaughtFault).
///
/// Forced termination is also represented as a `Fault`, held in the session's
/// pending-termination slot rather than thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    name: String,
    payload: Value,
}

impl Fault {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Creates a fault with a `Void` payload.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Value::Void)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    #[must_use]
    pub fn into_parts(self) -> (String, Value) {
        (self.name, self.payload)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_void() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.payload)
        }
    }
}

impl std::error::Error for Fault {}

/// Errors in the structure of the running program or its variable tree.
///
/// These are never matched against fault handlers: they abort the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// A variable path could not be parsed.
    InvalidPath { path: String, reason: &'static str },
    /// A write addressed a vector element more than one past the end.
    IndexOutOfRange { path: String, index: usize, len: usize },
    /// A pop was requested with only the root frame on the stack.
    ScopeUnderflow,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { path, reason } => write!(f, "invalid variable path `{path}`: {reason}"),
            Self::IndexOutOfRange { path, index, len } => {
                write!(f, "index {index} out of range for `{path}` (length {len})")
            }
            Self::ScopeUnderflow => f.write_str("cannot pop the root scope"),
        }
    }
}

impl std::error::Error for StructuralError {}

/// Control channel of a running process.
///
/// `Fault` is the only variant scopes intercept. Every other variant unwinds
/// through all open scopes untouched: no handler runs, no compensation runs and
/// no frame is popped.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// A named fault, catchable by fault handlers.
    Fault(Box<Fault>),
    /// A fatal structural error.
    Structural(StructuralError),
    /// A resource limit was exceeded.
    Resource(ResourceError),
    /// The program requested to end the session.
    Exit,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault(fault) => write!(f, "fault {fault}"),
            Self::Structural(err) => write!(f, "{err}"),
            Self::Resource(err) => write!(f, "{err}"),
            Self::Exit => f.write_str("exit requested"),
        }
    }
}

impl std::error::Error for RunError {}

impl From<Fault> for RunError {
    fn from(fault: Fault) -> Self {
        Self::Fault(Box::new(fault))
    }
}

impl From<StructuralError> for RunError {
    fn from(err: StructuralError) -> Self {
        Self::Structural(err)
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}
