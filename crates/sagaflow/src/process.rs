//! The closed set of process variants the interpreter executes.
//!
//! Every variant runs through [`Process::run`] against a [`SessionContext`].
//! A run returns exactly one outcome: it completes (`Ok`), raises a fault
//! (`Err(RunError::Fault)`), or aborts the session with any other `RunError`.
//! Termination is not an outcome of `run`; it is observed afterwards through
//! the session's pending-termination slot.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{
    expressions::Expr,
    fault::{Fault, RunError, RunResult},
    io::PrintWriter,
    path::VariablePath,
    resource::ResourceTracker,
    scope::ScopeDefinition,
    session::SessionContext,
    tracer::ScopeTracer,
    value::Value,
};

/// What an [`Process::Install`] entry registers its process as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerTarget {
    /// Handler for one fault name in the current scope.
    Fault(String),
    /// Handler for any fault without an exact handler in the current scope.
    Default,
    /// Compensation for the current scope.
    This,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerInstall {
    pub target: HandlerTarget,
    pub handler: Process,
}

impl HandlerInstall {
    #[must_use]
    pub fn fault(name: impl Into<String>, handler: Process) -> Self {
        Self {
            target: HandlerTarget::Fault(name.into()),
            handler,
        }
    }

    #[must_use]
    pub fn default_handler(handler: Process) -> Self {
        Self {
            target: HandlerTarget::Default,
            handler,
        }
    }

    #[must_use]
    pub fn compensation(handler: Process) -> Self {
        Self {
            target: HandlerTarget::This,
            handler,
        }
    }
}

/// A node of the process tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Process {
    /// Completes immediately.
    Nil,
    /// Runs children in order. Once termination is pending, the first
    /// killable child ends the sequence.
    Sequence(Vec<Process>),
    /// Branches sharing the session, scheduled in declaration order. Once
    /// termination is pending, killable branches are skipped and the
    /// remaining non-killable ones still run.
    Parallel(Vec<Process>),
    Assign {
        path: VariablePath,
        value: Expr,
    },
    /// Writes the evaluated expressions space-separated, then a newline.
    Print(Vec<Expr>),
    Throw {
        fault: String,
        #[serde(default)]
        payload: Option<Expr>,
    },
    /// Requests forced termination of the session.
    Kill {
        fault: String,
        #[serde(default)]
        payload: Option<Expr>,
    },
    Install(Vec<HandlerInstall>),
    /// Runs the compensation a completed scope left in an open frame.
    Compensate(String),
    Scope(ScopeDefinition),
    /// Ends the session at once, bypassing every handler and compensation.
    Exit,
}

impl Process {
    /// Runs the process against `ctx`.
    ///
    /// # Errors
    /// `RunError::Fault` when the process raises a fault; any other variant
    /// aborts the session.
    pub fn run<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        &self,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        ctx.step()?;
        match self {
            Self::Nil => Ok(()),
            Self::Sequence(children) => {
                for child in children {
                    if ctx.is_killed() && child.is_killable() {
                        break;
                    }
                    child.run(ctx)?;
                }
                Ok(())
            }
            Self::Parallel(branches) => {
                for branch in branches {
                    if ctx.is_killed() && branch.is_killable() {
                        continue;
                    }
                    branch.run(ctx)?;
                }
                Ok(())
            }
            Self::Assign { path, value } => {
                let value = value.eval(ctx.env());
                ctx.env_mut().write(path, value)?;
                Ok(())
            }
            Self::Print(exprs) => {
                let rendered: Vec<String> = exprs.iter().map(|expr| expr.eval(ctx.env()).to_string()).collect();
                ctx.print_line(rendered.into_iter().map(Cow::Owned))
            }
            Self::Throw { fault, payload } => Err(RunError::Fault(Box::new(make_fault(ctx, fault, payload.as_ref())))),
            Self::Kill { fault, payload } => {
                let fault = make_fault(ctx, fault, payload.as_ref());
                ctx.kill(fault);
                Ok(())
            }
            Self::Install(installs) => {
                for install in installs {
                    let handler = install.handler.clone();
                    match &install.target {
                        HandlerTarget::Fault(name) => ctx.install_fault_handler(name, handler),
                        HandlerTarget::Default => ctx.install_default_handler(handler),
                        HandlerTarget::This => ctx.install_compensation(handler),
                    }
                }
                Ok(())
            }
            Self::Compensate(scope_id) => match ctx.take_visible_compensation(scope_id) {
                Some(compensation) => compensation.run(ctx),
                None => Ok(()),
            },
            Self::Scope(scope) => scope.execute(ctx),
            Self::Exit => Err(RunError::Exit),
        }
    }

    /// Whether issuing a kill against this process while it runs is meaningful.
    ///
    /// Compensations in progress are never killable; composites are killable
    /// only when all their children are.
    #[must_use]
    pub fn is_killable(&self) -> bool {
        match self {
            Self::Nil
            | Self::Assign { .. }
            | Self::Print(_)
            | Self::Throw { .. }
            | Self::Kill { .. }
            | Self::Install(_)
            | Self::Exit => true,
            Self::Compensate(_) => false,
            Self::Sequence(children) | Self::Parallel(children) => children.iter().all(Self::is_killable),
            Self::Scope(scope) => scope.is_killable(),
        }
    }

    /// Convenience constructor for a [`Process::Scope`] with auto-pop enabled.
    #[must_use]
    pub fn scope(id: impl Into<String>, body: Self) -> Self {
        Self::Scope(ScopeDefinition::new(id, body))
    }

    #[must_use]
    pub fn throw(fault: impl Into<String>, payload: impl Into<Value>) -> Self {
        Self::Throw {
            fault: fault.into(),
            payload: Some(Expr::Literal(payload.into())),
        }
    }

    #[must_use]
    pub fn kill(fault: impl Into<String>) -> Self {
        Self::Kill {
            fault: fault.into(),
            payload: None,
        }
    }

    #[must_use]
    pub fn assign(path: VariablePath, value: impl Into<Expr>) -> Self {
        Self::Assign {
            path,
            value: value.into(),
        }
    }

    /// A `print` of a single path's value.
    #[must_use]
    pub fn print_path(path: VariablePath) -> Self {
        Self::Print(vec![Expr::Path(path)])
    }
}

fn make_fault<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
    ctx: &SessionContext<'_, T, P, Tr>,
    name: &str,
    payload: Option<&Expr>,
) -> Fault {
    let payload = payload.map(|expr| expr.eval(ctx.env())).unwrap_or_default();
    Fault::new(name, payload)
}

