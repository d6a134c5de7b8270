use std::{
    fmt,
    time::{Duration, Instant},
};

/// Recommended maximum number of nested open scopes if not otherwise specified.
pub const DEFAULT_MAX_SCOPE_DEPTH: usize = 512;

/// A session exceeded one of its configured limits.
///
/// Resource errors are fatal for the session: no fault handler sees them.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// Maximum scope nesting depth exceeded.
    ScopeDepth { limit: usize, depth: usize },
    /// Maximum number of process steps exceeded.
    Operation { limit: usize, count: usize },
    /// Wall-clock budget of the session exceeded.
    Time { limit: Duration, elapsed: Duration },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScopeDepth { limit, depth } => {
                write!(f, "scope depth limit exceeded: {depth} > {limit}")
            }
            Self::Operation { limit, count } => {
                write!(f, "operation limit exceeded: {count} > {limit}")
            }
            Self::Time { limit, elapsed } => {
                write!(f, "time limit exceeded: {elapsed:?} > {limit:?}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Trait for tracking resource usage of one session.
///
/// The session calls [`on_step`](Self::on_step) once per process run and
/// [`check_scope_depth`](Self::check_scope_depth) before every scope push.
pub trait ResourceTracker: fmt::Debug {
    /// Called before a process starts running.
    fn on_step(&mut self) -> Result<(), ResourceError>;

    /// Called before pushing a new scope frame.
    ///
    /// # Arguments
    /// * `current_depth` - Number of open scopes before the push, excluding the root frame
    fn check_scope_depth(&self, current_depth: usize) -> Result<(), ResourceError>;

    /// Returns the number of steps counted so far, if this tracker counts them.
    fn step_count(&self) -> Option<usize> {
        None
    }
}

/// A resource tracker with no limits except [`DEFAULT_MAX_SCOPE_DEPTH`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline]
    fn on_step(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline]
    fn check_scope_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        check_depth(current_depth, DEFAULT_MAX_SCOPE_DEPTH)
    }
}

fn check_depth(current_depth: usize, limit: usize) -> Result<(), ResourceError> {
    if current_depth >= limit {
        Err(ResourceError::ScopeDepth {
            limit,
            depth: current_depth + 1,
        })
    } else {
        Ok(())
    }
}

/// Limits a session runs under.
///
/// `None` disables a limit.
/// An unset `max_scope_depth` falls back to [`DEFAULT_MAX_SCOPE_DEPTH`].
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of simultaneously open scopes.
    #[serde(default)]
    pub max_scope_depth: Option<usize>,
    /// Maximum number of process steps per session.
    #[serde(default)]
    pub max_operations: Option<usize>,
    /// Maximum execution time per session.
    #[serde(default)]
    pub max_duration: Option<Duration>,
}

impl ResourceLimits {
    /// Creates limits with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of simultaneously open scopes.
    #[must_use]
    pub fn max_scope_depth(mut self, limit: usize) -> Self {
        self.max_scope_depth = Some(limit);
        self
    }

    /// Sets the maximum number of process steps.
    #[must_use]
    pub fn max_operations(mut self, limit: usize) -> Self {
        self.max_operations = Some(limit);
        self
    }

    /// Sets the wall-clock budget of a session.
    #[must_use]
    pub fn max_duration(mut self, limit: Duration) -> Self {
        self.max_duration = Some(limit);
        self
    }
}

/// Tracker enforcing a [`ResourceLimits`] configuration.
#[derive(Debug)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    /// When the session started.
    start_time: Instant,
    operation_count: usize,
}

impl LimitedTracker {
    /// Creates a new tracker with the given limits, starting the clock now.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            start_time: Instant::now(),
            operation_count: 0,
        }
    }

    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_step(&mut self) -> Result<(), ResourceError> {
        self.operation_count += 1;
        if let Some(max) = self.limits.max_operations
            && self.operation_count > max
        {
            return Err(ResourceError::Operation {
                limit: max,
                count: self.operation_count,
            });
        }

        if let Some(limit) = self.limits.max_duration {
            let elapsed = self.start_time.elapsed();
            if elapsed > limit {
                return Err(ResourceError::Time { limit, elapsed });
            }
        }
        Ok(())
    }

    fn check_scope_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        check_depth(
            current_depth,
            self.limits.max_scope_depth.unwrap_or(DEFAULT_MAX_SCOPE_DEPTH),
        )
    }

    fn step_count(&self) -> Option<usize> {
        Some(self.operation_count)
    }
}
