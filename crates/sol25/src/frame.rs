//! Activation frames and the frame stack.
//!
//! A frame is created on block or method entry and discarded on exit, even
//! when an error propagates; the evaluator guarantees the matching pop on
//! every exit path. Parameters are immutable after construction, locals are
//! created on first assignment and freely re-assignable.
//!
//! Frames come in two kinds. A *transparent* frame is pushed when a block is
//! invoked through `value*`: blocks carry no environment of their own (they
//! capture only `self`), so their bodies reach the bindings of the frames
//! below them — the while-loop counter pattern depends on it. An *opaque*
//! frame is pushed for a method activation, whose locals are private: name
//! resolution never crosses it into the caller. Reads and writes therefore
//! walk the stack innermost-out through transparent frames and stop at the
//! first opaque one, which anchors the current activation.

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{
    error::{RunError, RunResult},
    value::Value,
};

#[derive(Debug)]
pub(crate) struct Frame {
    self_value: Option<Value>,
    params: IndexMap<String, Value>,
    locals: AHashMap<String, Value>,
    /// Whether name resolution may continue past this frame into the one
    /// below it. True for block invocations, false for method activations.
    transparent: bool,
}

impl Frame {
    /// Builds a frame from equally long parameter-name and argument
    /// sequences. A length mismatch is an internal error: arity was already
    /// checked by the caller.
    pub fn new(self_value: Option<Value>, names: &[String], args: &[Value], transparent: bool) -> RunResult<Self> {
        if names.len() != args.len() {
            return Err(RunError::internal(format!(
                "frame built with {} parameters but {} arguments",
                names.len(),
                args.len()
            )));
        }
        let params = names.iter().cloned().zip(args.iter().cloned()).collect();
        Ok(Self {
            self_value,
            params,
            locals: AHashMap::new(),
            transparent,
        })
    }

    pub fn self_value(&self) -> Option<&Value> {
        self.self_value.as_ref()
    }

    fn is_param(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name).or_else(|| self.locals.get(name))
    }
}

/// LIFO stack of activation frames.
#[derive(Debug, Default)]
pub(crate) struct FrameStack {
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> RunResult<Frame> {
        self.frames
            .pop()
            .ok_or_else(|| RunError::internal("pop from an empty frame stack"))
    }

    pub fn top(&self) -> RunResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| RunError::internal("no active frame"))
    }

    /// Resolves a name against the current activation: the innermost frame
    /// first, continuing outward only through transparent frames. Reading a
    /// name bound nowhere in the activation is error 32.
    pub fn read(&self, name: &str) -> RunResult<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Ok(value.clone());
            }
            if !frame.transparent {
                break;
            }
        }
        Err(RunError::UndefinedVariable(name.to_owned()))
    }

    /// Binds a name within the current activation. Writing a name that is a
    /// parameter of a reachable frame is error 34; an existing local is
    /// updated in place; a name bound nowhere reachable becomes a local of
    /// the innermost frame.
    pub fn write(&mut self, name: &str, value: Value) -> RunResult<()> {
        for frame in self.frames.iter_mut().rev() {
            if frame.is_param(name) {
                return Err(RunError::AssignToParameter(name.to_owned()));
            }
            if let Some(slot) = frame.locals.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            if !frame.transparent {
                break;
            }
        }
        let top = self
            .frames
            .last_mut()
            .ok_or_else(|| RunError::internal("no active frame"))?;
        top.locals.insert(name.to_owned(), value);
        Ok(())
    }
}
