use std::fmt;

use crate::{
    fault::{Fault, RunError, StructuralError},
    resource::ResourceError,
};

/// Error type for running a session, separating failures by cause.
///
/// Keeping uncaught faults apart from structural and resource failures lets
/// hosts report a program-level fault without string matching.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// A fault escaped every scope of the session.
    UncaughtFault(Fault),
    /// The program or its variable tree was malformed.
    Structural(StructuralError),
    /// A resource limit was exceeded.
    Resource(ResourceError),
    /// A program description could not be loaded.
    Program(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UncaughtFault(fault) => write!(f, "uncaught fault {fault}"),
            Self::Structural(error) => write!(f, "{error}"),
            Self::Resource(error) => write!(f, "{error}"),
            Self::Program(msg) => write!(f, "invalid program: {msg}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StructuralError> for SessionError {
    fn from(error: StructuralError) -> Self {
        Self::Structural(error)
    }
}

impl From<ResourceError> for SessionError {
    fn from(error: ResourceError) -> Self {
        Self::Resource(error)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(error: serde_json::Error) -> Self {
        Self::Program(error.to_string())
    }
}

impl From<postcard::Error> for SessionError {
    fn from(error: postcard::Error) -> Self {
        Self::Program(error.to_string())
    }
}

impl SessionError {
    /// Converts a run failure that reached the top of the session.
    ///
    /// Returns `None` for `RunError::Exit`, which ends a session without error.
    pub(crate) fn from_run_error(error: RunError) -> Option<Self> {
        match error {
            RunError::Fault(fault) => Some(Self::UncaughtFault(*fault)),
            RunError::Structural(error) => Some(Self::Structural(error)),
            RunError::Resource(error) => Some(Self::Resource(error)),
            RunError::Exit => None,
        }
    }
}
