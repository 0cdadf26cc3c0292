//! Execution limits.
//!
//! Evaluation is recursive, so an adversarial or runaway program is bounded
//! by frame depth. Hosts pick the policy at `run_with` time: the default
//! [`NoLimitTracker`] compiles to nothing via monomorphization, while
//! [`LimitedTracker`] rejects frame pushes past a configured depth.

use std::fmt;

/// Error returned when an execution limit is exceeded.
///
/// SOL25 has no catchable exceptions, so the interpreter classifies this as
/// an internal error (exit code 99).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum frame-stack depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recursion { limit, depth } => {
                write!(f, "recursion limit exceeded: depth {depth} > {limit}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Trait consulted before every frame push.
pub trait ResourceTracker: fmt::Debug {
    /// Checks whether a frame may be pushed at the given current depth.
    fn check_recursion_depth(&self, depth: usize) -> Result<(), ResourceError>;
}

/// Tracker that never rejects anything, the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline]
    fn check_recursion_depth(&self, _depth: usize) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Tracker enforcing a maximum frame-stack depth.
#[derive(Debug, Clone, Copy)]
pub struct LimitedTracker {
    max_depth: usize,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

impl ResourceTracker for LimitedTracker {
    fn check_recursion_depth(&self, depth: usize) -> Result<(), ResourceError> {
        if depth >= self.max_depth {
            return Err(ResourceError::Recursion {
                limit: self.max_depth,
                depth,
            });
        }
        Ok(())
    }
}
