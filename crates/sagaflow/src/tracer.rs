//! Scope-engine tracing infrastructure.
//!
//! Provides a trait-based tracing system for the scope engine with zero-cost
//! abstraction. When using [`NoopTracer`], all trace methods compile away
//! entirely via monomorphization.
//!
//! # Architecture
//!
//! The [`ScopeTracer`] trait defines hook points at every transition of the
//! scope lifecycle: frame push and pop, kill observation, compensation start
//! and end, fault dispatch, fault capture and fault re-raise. Concrete
//! implementations collect different kinds of data:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (production default) |
//! | [`StderrTracer`] | Human-readable lifecycle log to stderr |
//! | [`ProfilingTracer`] | Per-transition counters and maximum scope depth |
//! | [`RecordingTracer`] | Full event recording for post-mortem analysis and tests |
//!
//! # Usage
//!
//! The session is parameterized as `SessionContext<'a, T: ResourceTracker, P: PrintWriter, Tr: ScopeTracer>`.
//! Callers choose the tracer at construction time:
//!
//! ```
//! use sagaflow::{NoPrint, NoLimitTracker, RecordingTracer, SessionContext};
//!
//! let mut print = NoPrint;
//! let ctx = SessionContext::new(NoLimitTracker, &mut print, RecordingTracer::new());
//! assert!(ctx.tracer().events().is_empty());
//! ```

use std::collections::HashMap;

use strum::{Display, EnumDiscriminants};

/// Trace event emitted by the scope engine.
///
/// Used by [`RecordingTracer`] to capture the full lifecycle of every scope
/// in a session.
#[derive(Debug, Clone, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(TraceKind), derive(Hash, Display))]
pub enum TraceEvent {
    /// A scope frame was pushed.
    ScopePush {
        scope_id: String,
        /// Number of open scopes after the push, excluding the root frame.
        depth: usize,
    },
    /// A scope frame was popped.
    ScopePop {
        scope_id: String,
        /// Whether the frame's bindings were merged into the parent.
        merged: bool,
        /// Number of open scopes after the pop, excluding the root frame.
        depth: usize,
    },
    /// A process returned normally while termination was pending.
    KillObserved { scope_id: String, fault: String },
    /// A compensation is about to run; pending termination has been cleared.
    CompensationStart { scope_id: String },
    /// A compensation finished; pending termination has been re-asserted.
    CompensationEnd { scope_id: String },
    /// A fault was matched to a handler.
    FaultDispatch { scope_id: String, fault: String },
    /// A fault found no handler and is held until the scope exits.
    FaultCaptured { scope_id: String, fault: String },
    /// A captured fault was raised to the scope's caller.
    FaultRaised { scope_id: String, fault: String },
}

/// Trait for scope-engine tracing.
///
/// Every hook defaults to a no-op, so [`NoopTracer`] is an empty impl that
/// vanishes after monomorphization. Implementations override only the hooks
/// they need.
pub trait ScopeTracer: std::fmt::Debug {
    /// Called after a scope frame is pushed.
    ///
    /// # Arguments
    /// * `scope_id` - Id of the new current scope
    /// * `depth` - Open scopes after the push, excluding the root frame
    #[inline(always)]
    fn on_scope_push(&mut self, _scope_id: &str, _depth: usize) {}

    /// Called after a scope frame is popped.
    ///
    /// # Arguments
    /// * `scope_id` - Id of the popped scope
    /// * `merged` - Whether the frame's bindings were folded into the parent
    /// * `depth` - Open scopes after the pop, excluding the root frame
    #[inline(always)]
    fn on_scope_pop(&mut self, _scope_id: &str, _merged: bool, _depth: usize) {}

    /// Called when a scope observes pending termination after its process returned.
    #[inline(always)]
    fn on_kill_observed(&mut self, _scope_id: &str, _fault: &str) {}

    /// Called right before a compensation runs.
    #[inline(always)]
    fn on_compensation_start(&mut self, _scope_id: &str) {}

    /// Called after a compensation finished and termination was re-asserted.
    #[inline(always)]
    fn on_compensation_end(&mut self, _scope_id: &str) {}

    /// Called when a raised fault is matched to a handler.
    #[inline(always)]
    fn on_fault_dispatch(&mut self, _scope_id: &str, _fault: &str) {}

    /// Called when a raised fault finds no handler in the current scope.
    #[inline(always)]
    fn on_fault_captured(&mut self, _scope_id: &str, _fault: &str) {}

    /// Called when a captured fault leaves its scope.
    #[inline(always)]
    fn on_fault_raised(&mut self, _scope_id: &str, _fault: &str) {}
}

// ============================================================================
// NoopTracer — zero-cost production default
// ============================================================================

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl ScopeTracer for NoopTracer {}

// ============================================================================
// StderrTracer — human-readable lifecycle log
// ============================================================================

/// Tracer that prints a human-readable lifecycle log to stderr.
///
/// Output format:
/// ```text
///   >>> PUSH  order          depth=1
///   !!! FAULT NotFound -> handler in order
///   <<< POP   order          depth=0 merged
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Maximum number of lines to print. None = unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    /// Creates a new stderr tracer with no line limit.
    #[must_use]
    pub fn new() -> Self {
        Self { limit: None, count: 0 }
    }

    /// Creates a new stderr tracer that stops after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    fn line(&mut self, line: std::fmt::Arguments<'_>) {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return;
        }
        eprintln!("{line}");
        self.count += 1;
        if self.limit.is_some_and(|limit| self.count >= limit) {
            eprintln!("--- trace limit reached ({} lines) ---", self.count);
        }
    }
}

impl ScopeTracer for StderrTracer {
    fn on_scope_push(&mut self, scope_id: &str, depth: usize) {
        self.line(format_args!("  >>> PUSH  {scope_id:<14} depth={depth}"));
    }

    fn on_scope_pop(&mut self, scope_id: &str, merged: bool, depth: usize) {
        let effect = if merged { "merged" } else { "discarded" };
        self.line(format_args!("  <<< POP   {scope_id:<14} depth={depth} {effect}"));
    }

    fn on_kill_observed(&mut self, scope_id: &str, fault: &str) {
        self.line(format_args!("  xxx KILL  {fault} observed in {scope_id}"));
    }

    fn on_compensation_start(&mut self, scope_id: &str) {
        self.line(format_args!("  ~~> COMP  {scope_id}"));
    }

    fn on_compensation_end(&mut self, scope_id: &str) {
        self.line(format_args!("  <~~ COMP  {scope_id} done, termination restored"));
    }

    fn on_fault_dispatch(&mut self, scope_id: &str, fault: &str) {
        self.line(format_args!("  !!! FAULT {fault} -> handler in {scope_id}"));
    }

    fn on_fault_captured(&mut self, scope_id: &str, fault: &str) {
        self.line(format_args!("  !!! FAULT {fault} unhandled in {scope_id}"));
    }

    fn on_fault_raised(&mut self, scope_id: &str, fault: &str) {
        self.line(format_args!("  !!! FAULT {fault} leaves {scope_id}"));
    }
}

// ============================================================================
// ProfilingTracer — transition counters
// ============================================================================

/// Tracer that counts lifecycle transitions and tracks the deepest nesting.
///
/// Call [`ProfilingTracer::report`] once the session has finished.
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    counts: HashMap<TraceKind, u64>,
    max_depth: usize,
}

/// Counters collected by a [`ProfilingTracer`].
#[derive(Debug)]
pub struct ProfilingReport {
    /// Per-transition counts, sorted by frequency (highest first).
    pub counts: Vec<(TraceKind, u64)>,
    /// Maximum number of simultaneously open scopes.
    pub max_depth: usize,
}

impl ProfilingReport {
    /// Count recorded for `kind`, zero if it never happened.
    #[must_use]
    pub fn count(&self, kind: TraceKind) -> u64 {
        self.counts.iter().find(|(k, _)| *k == kind).map_or(0, |(_, n)| *n)
    }
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counters, most frequent transition first.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut counts: Vec<_> = self.counts.iter().map(|(&k, &v)| (k, v)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.to_string().cmp(&b.0.to_string())));
        ProfilingReport {
            counts,
            max_depth: self.max_depth,
        }
    }

    fn bump(&mut self, kind: TraceKind) {
        *self.counts.entry(kind).or_insert(0) += 1;
    }
}

impl ScopeTracer for ProfilingTracer {
    fn on_scope_push(&mut self, _scope_id: &str, depth: usize) {
        self.bump(TraceKind::ScopePush);
        self.max_depth = self.max_depth.max(depth);
    }

    fn on_scope_pop(&mut self, _scope_id: &str, _merged: bool, _depth: usize) {
        self.bump(TraceKind::ScopePop);
    }

    fn on_kill_observed(&mut self, _scope_id: &str, _fault: &str) {
        self.bump(TraceKind::KillObserved);
    }

    fn on_compensation_start(&mut self, _scope_id: &str) {
        self.bump(TraceKind::CompensationStart);
    }

    fn on_compensation_end(&mut self, _scope_id: &str) {
        self.bump(TraceKind::CompensationEnd);
    }

    fn on_fault_dispatch(&mut self, _scope_id: &str, _fault: &str) {
        self.bump(TraceKind::FaultDispatch);
    }

    fn on_fault_captured(&mut self, _scope_id: &str, _fault: &str) {
        self.bump(TraceKind::FaultCaptured);
    }

    fn on_fault_raised(&mut self, _scope_id: &str, _fault: &str) {
        self.bump(TraceKind::FaultRaised);
    }
}

impl std::fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Scope Profiling Report ===")?;
        writeln!(f, "Max scope depth: {}", self.max_depth)?;
        for (kind, count) in &self.counts {
            writeln!(f, "  {:<20} {count:>10}", kind.to_string())?;
        }
        Ok(())
    }
}

// ============================================================================
// RecordingTracer — full event recording
// ============================================================================

/// Tracer that records every event in chronological order.
///
/// The most expensive tracer (allocates per event); intended for tests and
/// post-mortem analysis of short sessions.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records at most `limit` events; later ones are dropped.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Number of recorded events of the given kind.
    #[must_use]
    pub fn count(&self, kind: TraceKind) -> usize {
        self.events.iter().filter(|event| TraceKind::from(*event) == kind).count()
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return;
        }
        self.events.push(event);
    }
}

impl ScopeTracer for RecordingTracer {
    fn on_scope_push(&mut self, scope_id: &str, depth: usize) {
        self.record(TraceEvent::ScopePush {
            scope_id: scope_id.to_owned(),
            depth,
        });
    }

    fn on_scope_pop(&mut self, scope_id: &str, merged: bool, depth: usize) {
        self.record(TraceEvent::ScopePop {
            scope_id: scope_id.to_owned(),
            merged,
            depth,
        });
    }

    fn on_kill_observed(&mut self, scope_id: &str, fault: &str) {
        self.record(TraceEvent::KillObserved {
            scope_id: scope_id.to_owned(),
            fault: fault.to_owned(),
        });
    }

    fn on_compensation_start(&mut self, scope_id: &str) {
        self.record(TraceEvent::CompensationStart {
            scope_id: scope_id.to_owned(),
        });
    }

    fn on_compensation_end(&mut self, scope_id: &str) {
        self.record(TraceEvent::CompensationEnd {
            scope_id: scope_id.to_owned(),
        });
    }

    fn on_fault_dispatch(&mut self, scope_id: &str, fault: &str) {
        self.record(TraceEvent::FaultDispatch {
            scope_id: scope_id.to_owned(),
            fault: fault.to_owned(),
        });
    }

    fn on_fault_captured(&mut self, scope_id: &str, fault: &str) {
        self.record(TraceEvent::FaultCaptured {
            scope_id: scope_id.to_owned(),
            fault: fault.to_owned(),
        });
    }

    fn on_fault_raised(&mut self, scope_id: &str, fault: &str) {
        self.record(TraceEvent::FaultRaised {
            scope_id: scope_id.to_owned(),
            fault: fault.to_owned(),
        });
    }
}
