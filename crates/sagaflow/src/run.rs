//! Public interface for running programs.

use serde::{Deserialize, Serialize};

use crate::{
    environment::Environment,
    fault::Fault,
    io::{PrintWriter, StdPrint},
    process::Process,
    resource::{LimitedTracker, ResourceLimits},
    session::SessionContext,
    session_error::SessionError,
    tracer::{NoopTracer, ScopeTracer},
};

/// A complete program: the main process plus the limits its sessions run under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub main: Process,
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl Program {
    #[must_use]
    pub fn new(main: Process) -> Self {
        Self {
            main,
            limits: ResourceLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Parses a program from its JSON description.
    ///
    /// # Errors
    /// Returns `SessionError::Program` if the JSON is malformed or describes
    /// an invalid process tree (including malformed variable paths).
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the program as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `SessionError::Program` if serialization fails.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How a session that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The main process completed.
    Completed,
    /// The main process completed with termination still pending.
    Terminated(Fault),
    /// The program requested to end the session.
    Exited,
}

/// Runs a [`Program`], one fresh session per call.
///
/// Sessions never share state: every run gets its own environment, scope
/// stack, pending-termination slot and compensations.
///
/// # Example
/// ```
/// use sagaflow::{CollectStringPrint, Expr, Process, Program, RunOutcome, Runner};
///
/// let runner = Runner::new(Program::new(Process::scope(
///     "greet",
///     Process::Print(vec![Expr::literal("hello")]),
/// )));
/// let mut print = CollectStringPrint::new();
/// assert_eq!(runner.run(&mut print).unwrap(), RunOutcome::Completed);
/// assert_eq!(print.output(), "hello\n");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runner {
    program: Program,
}

impl Runner {
    #[must_use]
    pub fn new(program: Program) -> Self {
        Self { program }
    }

    /// Creates a runner from a JSON program description.
    ///
    /// # Errors
    /// Returns `SessionError::Program` if the description cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Program::from_json(json).map(Self::new)
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Runs the program in a new session.
    ///
    /// # Errors
    /// `SessionError::UncaughtFault` when a fault escapes every scope,
    /// `Structural` or `Resource` when the session aborted.
    pub fn run(&self, print: &mut impl PrintWriter) -> Result<RunOutcome, SessionError> {
        self.run_traced(print, NoopTracer).0
    }

    /// Runs the program with no output capture, printing to stdout.
    ///
    /// # Errors
    /// Same as [`run`](Self::run).
    pub fn run_stdout(&self) -> Result<RunOutcome, SessionError> {
        self.run(&mut StdPrint)
    }

    /// Runs the program with `tracer` attached, returning the tracer afterwards.
    pub fn run_traced<Tr: ScopeTracer>(
        &self,
        print: &mut impl PrintWriter,
        tracer: Tr,
    ) -> (Result<RunOutcome, SessionError>, Tr) {
        let (result, _, tracer) = self.run_session(print, tracer);
        (result, tracer)
    }

    /// Runs the program and also returns the session's final environment.
    pub fn run_session<Tr: ScopeTracer>(
        &self,
        print: &mut impl PrintWriter,
        tracer: Tr,
    ) -> (Result<RunOutcome, SessionError>, Environment, Tr) {
        let tracker = LimitedTracker::new(self.program.limits.clone());
        let mut ctx = SessionContext::new(tracker, print, tracer);
        let result = match self.program.main.run(&mut ctx) {
            Ok(()) => Ok(match ctx.clear_kill() {
                Some(fault) => RunOutcome::Terminated(fault),
                None => RunOutcome::Completed,
            }),
            Err(err) => SessionError::from_run_error(err).map_or(Ok(RunOutcome::Exited), Err),
        };
        let (env, tracer) = ctx.into_parts();
        (result, env, tracer)
    }

    /// Serializes the runner to a binary format.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a runner from binary format produced by [`dump`](Self::dump).
    ///
    /// # Errors
    /// Returns an error if deserialization fails.
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
