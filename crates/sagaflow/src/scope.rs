//! The scope engine.
//!
//! A scope pushes a frame, runs its body and resolves exactly one of three
//! outcomes before popping:
//!
//! - **normal**: the body returned and no termination is pending. The frame's
//!   bindings are merged into the enclosing frame.
//! - **killed**: the body returned while termination is pending. The frame's
//!   bindings are discarded. If a compensation is registered for the scope it
//!   runs with termination cleared, and termination is re-asserted afterwards
//!   so the enclosing scope observes it too.
//! - **faulted**: the body raised a fault. A matching (or default) handler of
//!   the current frame runs in place of the body; without one the fault is held
//!   and raised to the caller once the frame is popped.
//!
//! Handlers and compensations are themselves resolved through the same
//! dispatch, one recursion level deeper. Both are consumed when looked up, so
//! the recursion is bounded by the number of installed handlers.

use serde::{Deserialize, Serialize};

use crate::{
    fault::{Fault, RunError, RunResult},
    io::PrintWriter,
    process::Process,
    resource::ResourceTracker,
    session::SessionContext,
    tracer::ScopeTracer,
};

fn default_auto_pop() -> bool {
    true
}

/// An immutable scope node of the process tree.
///
/// `id` only needs to be unique among the scopes simultaneously open in one
/// session; it keys the scope's compensation and its fault slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeDefinition {
    id: String,
    body: Box<Process>,
    /// Whether the frame is popped when the scope exits. Scopes that leave
    /// their frame open hand it to whoever runs them.
    #[serde(default = "default_auto_pop")]
    auto_pop: bool,
}

impl ScopeDefinition {
    #[must_use]
    pub fn new(id: impl Into<String>, body: Process) -> Self {
        Self::with_auto_pop(id, body, true)
    }

    #[must_use]
    pub fn with_auto_pop(id: impl Into<String>, body: Process, auto_pop: bool) -> Self {
        Self {
            id: id.into(),
            body: Box::new(body),
            auto_pop,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn body(&self) -> &Process {
        &self.body
    }

    #[must_use]
    pub fn auto_pop(&self) -> bool {
        self.auto_pop
    }

    /// Delegates to the body; the engine itself never consults this.
    #[must_use]
    pub fn is_killable(&self) -> bool {
        self.body.is_killable()
    }

    /// Structural copy of this definition with a new body.
    ///
    /// Used to instantiate a scope template with a rewritten body while keeping
    /// its identity and pop behaviour.
    #[must_use]
    pub fn with_body(&self, body: Process) -> Self {
        Self {
            id: self.id.clone(),
            body: Box::new(body),
            auto_pop: self.auto_pop,
        }
    }

    /// Runs the scope to completion against `ctx`.
    ///
    /// # Errors
    /// Returns `RunError::Fault` with the body's fault when no handler of this
    /// scope resolved it and the scope was not killed. Non-fault errors are
    /// propagated immediately without popping the frame.
    pub fn execute<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        &self,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        ctx.push_scope(&self.id)?;
        let mut execution = Execution::new(self);
        execution.run_scope(&self.body, ctx)?;
        if self.auto_pop {
            ctx.pop_scope(execution.should_merge)?;
        }
        execution.resolve(ctx)
    }
}

/// Bookkeeping for one run of a scope.
struct Execution<'d> {
    scope: &'d ScopeDefinition,
    /// Cleared as soon as termination is observed; never set again.
    should_merge: bool,
    captured: Option<Fault>,
}

impl<'d> Execution<'d> {
    fn new(scope: &'d ScopeDefinition) -> Self {
        Self {
            scope,
            should_merge: true,
            captured: None,
        }
    }

    fn run_scope<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        &mut self,
        process: &Process,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        match process.run(ctx) {
            Ok(()) => self.on_return(ctx),
            Err(RunError::Fault(fault)) => self.on_fault(*fault, ctx),
            Err(err) => Err(err),
        }
    }

    fn on_return<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        &mut self,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        let Some(killer) = ctx.killer_fault() else {
            return Ok(());
        };
        let killer_name = killer.name().to_owned();
        self.should_merge = false;
        ctx.tracer_mut().on_kill_observed(&self.scope.id, &killer_name);

        let Some(compensation) = ctx.take_compensation(&self.scope.id) else {
            return Ok(());
        };
        let killer = ctx.clear_kill();
        ctx.tracer_mut().on_compensation_start(&self.scope.id);
        self.run_scope(&compensation, ctx)?;
        if let Some(killer) = killer {
            ctx.kill(killer);
        }
        ctx.tracer_mut().on_compensation_end(&self.scope.id);
        Ok(())
    }

    fn on_fault<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        &mut self,
        fault: Fault,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        let scope_id = ctx.current_scope_id().to_owned();
        match ctx.take_fault_handler(fault.name(), true) {
            Some(handler) => {
                ctx.deliver_fault(&fault)?;
                ctx.tracer_mut().on_fault_dispatch(&scope_id, fault.name());
                self.run_scope(&handler, ctx)
            }
            None => {
                ctx.tracer_mut().on_fault_captured(&scope_id, fault.name());
                self.captured = Some(fault);
                Ok(())
            }
        }
    }

    /// Raises the captured fault, unless termination took precedence.
    fn resolve<T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>(
        self,
        ctx: &mut SessionContext<'_, T, P, Tr>,
    ) -> RunResult<()> {
        match self.captured {
            Some(fault) if self.should_merge => {
                ctx.tracer_mut().on_fault_raised(&self.scope.id, fault.name());
                Err(RunError::Fault(Box::new(fault)))
            }
            _ => Ok(()),
        }
    }
}
