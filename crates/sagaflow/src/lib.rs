#![doc = include_str!("../../../README.md")]
mod environment;
mod expressions;
mod fault;
mod io;
mod path;
mod process;
mod resource;
mod run;
mod scope;
mod session;
mod session_error;
pub mod tracer;
mod value;

pub use crate::{
    environment::{Environment, ROOT_SCOPE_ID},
    expressions::Expr,
    fault::{Fault, IO_FAULT_NAME, RunError, RunResult, StructuralError},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    path::{PathSegment, VariablePath},
    process::{HandlerInstall, HandlerTarget, Process},
    resource::{DEFAULT_MAX_SCOPE_DEPTH, LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits, ResourceTracker},
    run::{Program, RunOutcome, Runner},
    scope::ScopeDefinition,
    session::{DEFAULT_HANDLER_NAME, SessionContext},
    session_error::SessionError,
    tracer::{NoopTracer, ProfilingReport, ProfilingTracer, RecordingTracer, ScopeTracer, StderrTracer, TraceEvent, TraceKind},
    value::{Value, ValueTree},
};
