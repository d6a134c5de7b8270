//! Per-session execution state.
//!
//! A [`SessionContext`] is the single owner of everything one session mutates:
//! the variable environment, the stack of scope frames with their fault
//! handlers and compensations, and the pending-termination slot. Scopes
//! borrow it mutably for the duration of their run; nothing else holds it.

use std::borrow::Cow;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    environment::{Environment, ROOT_SCOPE_ID},
    fault::{Fault, RunResult},
    io::PrintWriter,
    path::VariablePath,
    process::Process,
    resource::ResourceTracker,
    tracer::ScopeTracer,
};

/// Reserved child of a scope's binding that names the fault being handled.
///
/// A default handler reads `<scope id>.default` to find out which fault it caught.
pub const DEFAULT_HANDLER_NAME: &str = "default";

/// Handlers and compensations owned by one scope frame.
#[derive(Debug, Default)]
struct HandlerTable {
    faults: IndexMap<String, Process>,
    default: Option<Process>,
    /// The frame's own compensation plus those of its completed children,
    /// keyed by scope id.
    compensations: AHashMap<String, Process>,
}

/// Execution state owned by one session.
///
/// # Type Parameters
/// * `T` - Resource tracker implementation
/// * `P` - Output sink for `print` processes
/// * `Tr` - Tracer receiving scope lifecycle events
#[derive(Debug)]
pub struct SessionContext<'a, T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer> {
    env: Environment,
    /// One table per environment frame, root frame included.
    handlers: Vec<HandlerTable>,
    pending_termination: Option<Fault>,
    tracker: T,
    print: &'a mut P,
    tracer: Tr,
}

impl<'a, T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer> SessionContext<'a, T, P, Tr> {
    /// Creates a session with only the root scope open.
    pub fn new(tracker: T, print: &'a mut P, tracer: Tr) -> Self {
        Self {
            env: Environment::new(),
            handlers: vec![HandlerTable::default()],
            pending_termination: None,
            tracker,
            print,
            tracer,
        }
    }

    // ------------------------------------------------------------------
    // scope stack
    // ------------------------------------------------------------------

    /// Pushes a new scope frame and makes it current.
    pub fn push_scope(&mut self, scope_id: &str) -> RunResult<()> {
        self.tracker.check_scope_depth(self.scope_depth())?;
        self.env.push(scope_id);
        self.handlers.push(HandlerTable::default());
        self.tracer.on_scope_push(scope_id, self.scope_depth());
        Ok(())
    }

    /// Pops the current scope frame.
    ///
    /// `merge = true` folds the frame's bindings and compensations into the
    /// enclosing frame, `merge = false` discards both. Fault handlers installed
    /// in the frame are dropped either way.
    pub fn pop_scope(&mut self, merge: bool) -> RunResult<()> {
        let scope_id = self.env.current_scope_id().to_owned();
        self.env.pop(merge)?;
        if let Some(table) = self.handlers.pop()
            && merge
        {
            self.current_handlers().compensations.extend(table.compensations);
        }
        self.tracer.on_scope_pop(&scope_id, merge, self.scope_depth());
        Ok(())
    }

    #[must_use]
    pub fn current_scope_id(&self) -> &str {
        self.env.current_scope_id()
    }

    /// Number of open scopes, excluding the root frame.
    #[must_use]
    pub fn scope_depth(&self) -> usize {
        self.env.depth() - 1
    }

    // ------------------------------------------------------------------
    // pending termination
    // ------------------------------------------------------------------

    #[must_use]
    pub fn is_killed(&self) -> bool {
        self.pending_termination.is_some()
    }

    /// Requests termination of the session, replacing any pending request.
    pub fn kill(&mut self, fault: Fault) {
        self.pending_termination = Some(fault);
    }

    /// Clears pending termination, returning the fault that requested it.
    pub fn clear_kill(&mut self) -> Option<Fault> {
        self.pending_termination.take()
    }

    #[must_use]
    pub fn killer_fault(&self) -> Option<&Fault> {
        self.pending_termination.as_ref()
    }

    // ------------------------------------------------------------------
    // handlers and compensations
    // ------------------------------------------------------------------

    /// Installs a handler for `fault_name` in the current scope, replacing any previous one.
    pub fn install_fault_handler(&mut self, fault_name: &str, handler: Process) {
        self.current_handlers().faults.insert(fault_name.to_owned(), handler);
    }

    /// Installs the current scope's default handler.
    pub fn install_default_handler(&mut self, handler: Process) {
        self.current_handlers().default = Some(handler);
    }

    /// Registers `compensation` for the current scope's id in the current frame.
    pub fn install_compensation(&mut self, compensation: Process) {
        let scope_id = self.current_scope_id().to_owned();
        self.current_handlers().compensations.insert(scope_id, compensation);
    }

    /// Removes and returns the handler for `fault_name` in the current scope.
    ///
    /// When no exact handler exists and `fallback_to_default` is set, the
    /// current scope's default handler is taken instead. Handlers are consumed
    /// so a handler that re-raises the fault it handles cannot catch it again.
    pub fn take_fault_handler(&mut self, fault_name: &str, fallback_to_default: bool) -> Option<Process> {
        let table = self.current_handlers();
        table
            .faults
            .shift_remove(fault_name)
            .or_else(|| if fallback_to_default { table.default.take() } else { None })
    }

    /// Removes and returns the compensation for `scope_id` held by the current frame.
    ///
    /// Only the current frame is searched, so a scope never picks up the
    /// compensation of an earlier, finished scope that reused its id.
    pub fn take_compensation(&mut self, scope_id: &str) -> Option<Process> {
        self.current_handlers().compensations.remove(scope_id)
    }

    /// Removes and returns the innermost compensation for `scope_id` held by
    /// any open frame.
    pub fn take_visible_compensation(&mut self, scope_id: &str) -> Option<Process> {
        self.handlers
            .iter_mut()
            .rev()
            .find_map(|table| table.compensations.remove(scope_id))
    }

    /// Whether any open frame holds a compensation for `scope_id`.
    #[must_use]
    pub fn has_compensation(&self, scope_id: &str) -> bool {
        self.handlers
            .iter()
            .any(|table| table.compensations.contains_key(scope_id))
    }

    /// Makes `fault` visible to its handler.
    ///
    /// Writes the payload to `<current scope id>.<fault name>` and the fault
    /// name to `<current scope id>.default`.
    pub fn deliver_fault(&mut self, fault: &Fault) -> RunResult<()> {
        let scope_id = self.current_scope_id().to_owned();
        self.env
            .write(&scope_slot(&scope_id, fault.name()), fault.payload().clone())?;
        self.env
            .write(&scope_slot(&scope_id, DEFAULT_HANDLER_NAME), fault.name().into())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // collaborators
    // ------------------------------------------------------------------

    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Counts one process step against the resource limits.
    pub fn step(&mut self) -> RunResult<()> {
        self.tracker.on_step()?;
        Ok(())
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    #[must_use]
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    pub fn tracer_mut(&mut self) -> &mut Tr {
        &mut self.tracer
    }

    /// Writes one line of output: the parts separated by spaces, then a newline.
    pub fn print_line<'s>(&mut self, parts: impl IntoIterator<Item = Cow<'s, str>>) -> RunResult<()> {
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                self.print.stdout_push(' ')?;
            }
            self.print.stdout_write(part)?;
        }
        self.print.stdout_push('\n')?;
        Ok(())
    }

    /// Consumes the session, returning its final environment and tracer.
    pub fn into_parts(self) -> (Environment, Tr) {
        (self.env, self.tracer)
    }

    fn current_handlers(&mut self) -> &mut HandlerTable {
        self.handlers
            .last_mut()
            .expect("session always holds the root handler table")
    }
}

/// Path of the `name` child of a scope's binding.
fn scope_slot(scope_id: &str, name: &str) -> VariablePath {
    VariablePath::root(scope_id).join(name, 0)
}
