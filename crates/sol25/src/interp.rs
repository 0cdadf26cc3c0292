//! The evaluator and the message dispatcher.
//!
//! [`Interp`] walks expression nodes and assignment sequences, and routes
//! every message send through the dispatch precedence ladder: class
//! messages, the `whileTrue:` shortcut, block invocation, user-defined
//! methods via the method resolution order, native built-ins, and finally
//! the attribute read/write fallback. Evaluation is recursive and
//! single-threaded; the only mutable state is the frame stack.
//!
//! The interpreter is parameterized over its reader, writer, resource
//! tracker and tracer the same way on every entry point, so the production
//! configuration (`NoLimitTracker` + `NoopTracer`) monomorphizes to code
//! with no tracking overhead at all.

use smallvec::SmallVec;

use crate::{
    ast::{BlockId, BlockNode, Expr, Literal, Program},
    error::{RunError, RunResult},
    frame::{Frame, FrameStack},
    io::{LineReader, PrintWriter},
    registry::{BuiltinClass, ClassRegistry},
    resource::ResourceTracker,
    tracer::SendTracer,
    value::{Payload, Singletons, Value},
};

/// What a send's receiver expression evaluated to.
///
/// A `literal class="class"` node used directly as a receiver denotes a
/// class message; everywhere else expressions produce plain values. This is
/// the single boundary where the distinction is observable.
#[derive(Debug)]
pub(crate) enum Receiver {
    Value(Value),
    Class(String),
}

pub(crate) struct Interp<'a, R, W, T, Tr>
where
    R: LineReader,
    W: PrintWriter,
    T: ResourceTracker,
    Tr: SendTracer,
{
    program: &'a Program,
    registry: &'a ClassRegistry,
    pub(crate) singletons: Singletons,
    frames: FrameStack,
    reader: &'a mut R,
    pub(crate) writer: &'a mut W,
    tracker: T,
    tracer: Tr,
}

impl<'a, R, W, T, Tr> Interp<'a, R, W, T, Tr>
where
    R: LineReader,
    W: PrintWriter,
    T: ResourceTracker,
    Tr: SendTracer,
{
    pub fn new(
        program: &'a Program,
        registry: &'a ClassRegistry,
        reader: &'a mut R,
        writer: &'a mut W,
        tracker: T,
        tracer: Tr,
    ) -> Self {
        Self {
            program,
            registry,
            singletons: Singletons::new(),
            frames: FrameStack::new(),
            reader,
            writer,
            tracker,
            tracer,
        }
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    /// Evaluates an expression node to a value.
    ///
    /// A class-name literal is not a value; it is legal only as a send
    /// receiver, which [`Interp::eval_receiver`] intercepts before this
    /// runs. Meeting one here means the parser let a malformed tree through.
    fn eval_expr(&mut self, expr: &Expr) -> RunResult<Value> {
        match expr {
            Expr::Literal(literal) => self.eval_literal(literal),
            Expr::Var(name) => self.eval_var(name),
            Expr::Block(id) => {
                let defining_self = self.frames.top()?.self_value().cloned();
                let arity = self.program.blocks.get(*id).arity();
                Ok(Value::block(*id, arity, defining_self))
            }
            Expr::Send {
                selector,
                receiver,
                args,
            } => self.eval_send(selector, receiver, args),
        }
    }

    fn eval_literal(&mut self, literal: &Literal) -> RunResult<Value> {
        match literal {
            Literal::Nil => Ok(self.singletons.nil()),
            Literal::True => Ok(self.singletons.truth()),
            Literal::False => Ok(self.singletons.falsity()),
            Literal::Integer(value) => Ok(Value::int(*value)),
            Literal::String(value) => Ok(Value::string(value.clone())),
            Literal::Class(name) => Err(RunError::internal(format!(
                "class-name token {name} used outside a receiver position"
            ))),
        }
    }

    fn eval_var(&mut self, name: &str) -> RunResult<Value> {
        match name {
            "nil" => Ok(self.singletons.nil()),
            "true" => Ok(self.singletons.truth()),
            "false" => Ok(self.singletons.falsity()),
            "self" | "super" => self
                .frames
                .top()?
                .self_value()
                .cloned()
                .ok_or_else(|| RunError::UndefinedVariable(name.to_owned())),
            _ => self.frames.read(name),
        }
    }

    fn eval_receiver(&mut self, expr: &Expr) -> RunResult<Receiver> {
        if let Expr::Literal(Literal::Class(name)) = expr {
            return Ok(Receiver::Class(name.clone()));
        }
        Ok(Receiver::Value(self.eval_expr(expr)?))
    }

    fn eval_send(&mut self, selector: &str, receiver_expr: &Expr, arg_exprs: &[Expr]) -> RunResult<Value> {
        let is_super = matches!(receiver_expr, Expr::Var(name) if name == "super");
        let receiver = self.eval_receiver(receiver_expr)?;
        let mut args: SmallVec<[Value; 2]> = SmallVec::with_capacity(arg_exprs.len());
        for expr in arg_exprs {
            args.push(self.eval_expr(expr)?);
        }
        self.dispatch(receiver, selector, &args, is_super)
    }

    /// Central message dispatch.
    pub fn dispatch(&mut self, receiver: Receiver, selector: &str, args: &[Value], is_super: bool) -> RunResult<Value> {
        match receiver {
            Receiver::Class(class_name) => {
                self.tracer.on_send(&class_name, selector, self.frames.depth());
                // `super` cannot reach a class receiver: the flag comes from
                // a `var` node, the token from a `literal` node.
                self.class_message(&class_name, selector, args)
            }
            Receiver::Value(value) => {
                self.tracer.on_send(value.class_name(), selector, self.frames.depth());
                self.send_value(value, selector, args, is_super)
            }
        }
    }

    /// Sends a message to a plain value, used by natives that evaluate
    /// their block arguments (`and:`, `timesRepeat:`, …).
    pub fn send_to(&mut self, receiver: Value, selector: &str, args: &[Value]) -> RunResult<Value> {
        self.dispatch(Receiver::Value(receiver), selector, args, false)
    }

    /// The class-message branch: the receiver is a class-name token and
    /// only `new`, `from:` and `String read` are understood.
    fn class_message(&mut self, class_name: &str, selector: &str, args: &[Value]) -> RunResult<Value> {
        let registry = self.registry;
        match selector {
            "new" if args.is_empty() => instantiate(registry, class_name),
            "from:" if args.len() == 1 => {
                if !registry.contains(class_name) {
                    return Err(RunError::internal(format!("send to unknown class {class_name}")));
                }
                let arg = &args[0];
                if !registry.related(class_name, arg.class_name())? {
                    return Err(RunError::value(format!(
                        "cannot create a {class_name} from an instance of {}",
                        arg.class_name()
                    )));
                }
                Ok(arg.copy_with_class(class_name))
            }
            "read" if class_name == "String" && args.is_empty() => {
                let line = self
                    .reader
                    .read_line()
                    .map_err(|err| RunError::internal(format!("input failed: {err}")))?;
                Ok(match line {
                    Some(line) => Value::string(line),
                    None => self.singletons.nil(),
                })
            }
            _ => Err(RunError::dnu(class_name, selector)),
        }
    }

    /// The value branch of the dispatch ladder, steps 2 through 8.
    fn send_value(&mut self, receiver: Value, selector: &str, args: &[Value], is_super: bool) -> RunResult<Value> {
        let registry = self.registry;

        // `whileTrue:` iterates at host level: it is not a method on any
        // class and must not consume stack depth proportional to iterations.
        if selector == "whileTrue:" && args.len() == 1 {
            loop {
                let cond = self.send_to(receiver.clone(), "value", &[])?;
                if !cond.is_identical(&self.singletons.truth()) {
                    break;
                }
                self.send_to(args[0].clone(), "value", &[])?;
            }
            return Ok(self.singletons.nil());
        }

        // Block invocation: colon count, declared arity and argument count
        // must all agree.
        if let Some(block) = receiver.as_block() {
            if selector.starts_with("value") {
                let colons = selector.matches(':').count();
                if block.arity != colons || args.len() != colons {
                    return Err(RunError::dnu(receiver.class_name(), selector));
                }
                let (id, defining_self) = (block.block, block.defining_self.clone());
                return self.call_block(id, defining_self, args, receiver.class_name(), true);
            }
        }

        // User-defined method via the method resolution order. Under
        // `super` the walk starts at the parent, but the frame's `self`
        // stays the original receiver.
        let start_class = if is_super {
            match registry.parent_of(receiver.class_name())? {
                Some(parent) => parent,
                None => return Err(RunError::dnu(receiver.class_name(), selector)),
            }
        } else {
            receiver.class_name()
        };
        if let Some(body) = registry.resolve_method(start_class, selector)? {
            return self.call_block(body, Some(receiver.clone()), args, receiver.class_name(), false);
        }

        // Native built-in, invoked with the original receiver so subclasses
        // of built-in types keep their identity on self-returning routines.
        if let Some(native) = crate::natives::native_for_selector(selector) {
            if let Some(result) = self.call_native(native, &receiver, args)? {
                return Ok(result);
            }
        }

        // Attribute read.
        if args.is_empty() && is_valid_identifier(selector) {
            if let Some(value) = receiver.get_attr(selector) {
                return Ok(value);
            }
        }

        // Attribute write; the singletons carry no attributes and fall
        // through to DNU instead.
        if args.len() == 1
            && let Some(name) = selector.strip_suffix(':')
            && is_valid_identifier(name)
            && !self.singletons.is_singleton(&receiver)
        {
            receiver.set_attr(name, args[0].clone());
            return Ok(receiver);
        }

        Err(RunError::dnu(receiver.class_name(), selector))
    }

    /// Executes a block body with the given `self` and arguments.
    ///
    /// Pushes a fresh frame, runs the assignment sequence, and pops the
    /// frame on every exit path; the pop happens before any error is
    /// propagated. `receiver_class` only labels the arity-mismatch error.
    ///
    /// `transparent` selects the frame kind: block invocations share the
    /// enclosing activation's bindings, method activations are opaque and
    /// keep their locals private from the caller.
    pub fn call_block(
        &mut self,
        block_id: BlockId,
        self_value: Option<Value>,
        args: &[Value],
        receiver_class: &str,
        transparent: bool,
    ) -> RunResult<Value> {
        let program = self.program;
        let node = program.blocks.get(block_id);
        if node.arity() != args.len() {
            return Err(RunError::dnu(receiver_class, value_selector(args.len())));
        }
        self.tracker
            .check_recursion_depth(self.frames.depth())
            .map_err(|err| RunError::internal(err.to_string()))?;

        let frame = Frame::new(self_value, &node.parameters, args, transparent)?;
        self.frames.push(frame);
        self.tracer.on_frame_push(self.frames.depth());

        let result = self.run_body(node);

        self.frames.pop()?;
        self.tracer.on_frame_pop(self.frames.depth());
        result
    }

    /// Runs a block's assignments in ascending order. The block's result is
    /// the last assignment's value, Nil when there are none. A completed
    /// assignment is durable even if a later one fails.
    fn run_body(&mut self, node: &BlockNode) -> RunResult<Value> {
        let mut last = self.singletons.nil();
        for assign in &node.assigns {
            let value = self.eval_expr(&assign.expr)?;
            self.frames.write(&assign.var, value.clone())?;
            last = value;
        }
        Ok(last)
    }
}

/// Implements the class message `new`: a fresh instance whose payload is
/// governed by the nearest built-in ancestor and whose dynamic class name
/// is the target class. Blocks cannot be instantiated this way.
pub(crate) fn instantiate(registry: &ClassRegistry, class_name: &str) -> RunResult<Value> {
    if !registry.contains(class_name) {
        return Err(RunError::internal(format!("send to unknown class {class_name}")));
    }
    let payload = match registry.builtin_ancestor(class_name)? {
        BuiltinClass::Block => return Err(RunError::dnu(class_name, "new")),
        BuiltinClass::Object => Payload::Plain,
        BuiltinClass::Nil => Payload::Nil,
        BuiltinClass::True => Payload::True,
        BuiltinClass::False => Payload::False,
        BuiltinClass::Integer => Payload::Int(0),
        BuiltinClass::String => Payload::Str(String::new()),
    };
    Ok(Value::instance(class_name, payload))
}

/// The selector a block invocation with `arity` arguments would use.
pub(crate) fn value_selector(arity: usize) -> String {
    if arity == 0 {
        "value".to_owned()
    } else {
        "value:".repeat(arity)
    }
}

/// Whether a selector may name an attribute: non-empty, starting with a
/// lowercase letter or underscore, continuing with ASCII letters, digits or
/// underscores, and not a keyword.
pub(crate) fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !matches!(name, "class" | "self" | "super" | "nil" | "true" | "false")
}
