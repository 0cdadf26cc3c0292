//! Execution tracing hooks.
//!
//! The interpreter is parameterized over a [`SendTracer`]; with the default
//! [`NoopTracer`] every hook is an empty inlined call that the compiler
//! eliminates, so production runs pay nothing. [`StderrTracer`] logs every
//! message send and frame transition for debugging.

/// Trait for interpreter execution tracing.
///
/// All methods have default no-op implementations, so implementations only
/// override the hooks they care about.
pub trait SendTracer: std::fmt::Debug {
    /// Called for every message dispatch, before the precedence ladder runs.
    ///
    /// `class_name` is the receiver's dynamic class (or the class-name token
    /// itself for class messages) and `depth` the current frame-stack depth.
    #[inline]
    fn on_send(&mut self, _class_name: &str, _selector: &str, _depth: usize) {}

    /// Called after a new frame was pushed for a block or method body.
    #[inline]
    fn on_frame_push(&mut self, _depth: usize) {}

    /// Called after a frame was popped, on both success and error unwind.
    #[inline]
    fn on_frame_pop(&mut self, _depth: usize) {}
}

/// Zero-cost no-op tracer, the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl SendTracer for NoopTracer {}

/// Human-readable execution log to stderr, indented by frame depth.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SendTracer for StderrTracer {
    fn on_send(&mut self, class_name: &str, selector: &str, depth: usize) {
        eprintln!("{:indent$}{class_name} << {selector}", "", indent = depth * 2);
    }

    fn on_frame_push(&mut self, depth: usize) {
        eprintln!("{:indent$}-> frame {depth}", "", indent = depth * 2);
    }

    fn on_frame_pop(&mut self, depth: usize) {
        eprintln!("{:indent$}<- frame {depth}", "", indent = depth * 2);
    }
}
