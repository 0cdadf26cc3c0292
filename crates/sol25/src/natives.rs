//! Native implementations of the built-in selectors.
//!
//! Selectors map to [`Native`] routines by splitting on `:`, capitalizing
//! each part and joining (`plus:` → `Plus`, `ifTrue:ifFalse:` →
//! `IfTrueIfFalse`); the routine applies only when its arity matches the
//! selector's colon count and the receiver's built-in ancestor provides it.
//! A receiver whose ancestor does not provide the routine falls through the
//! dispatch ladder to the attribute fallback.
//!
//! Control-flow natives (`and:`, `or:`, `ifTrue:ifFalse:`, `timesRepeat:`)
//! evaluate their block arguments through full message dispatch of
//! `value`/`value:`, so user objects understanding `value` participate.

use strum::EnumString;

use crate::{
    error::{RunError, RunResult},
    interp::Interp,
    io::{LineReader, PrintWriter},
    registry::BuiltinClass,
    resource::ResourceTracker,
    tracer::SendTracer,
    value::Value,
};

/// Internal names of the native routines. The variant name is exactly the
/// capitalized-and-joined form of the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub(crate) enum Native {
    IdenticalTo,
    EqualTo,
    AsString,
    IsNumber,
    IsString,
    IsBlock,
    IsNil,
    Plus,
    Minus,
    MultiplyBy,
    DivBy,
    GreaterThan,
    AsInteger,
    TimesRepeat,
    Print,
    ConcatenateWith,
    StartsWithEndsBefore,
    Not,
    And,
    Or,
    IfTrueIfFalse,
}

impl Native {
    /// Number of arguments the routine takes, equal to the colon count of
    /// its selector.
    fn arity(self) -> usize {
        match self {
            Self::AsString
            | Self::IsNumber
            | Self::IsString
            | Self::IsBlock
            | Self::IsNil
            | Self::AsInteger
            | Self::Print
            | Self::Not => 0,
            Self::IdenticalTo
            | Self::EqualTo
            | Self::Plus
            | Self::Minus
            | Self::MultiplyBy
            | Self::DivBy
            | Self::GreaterThan
            | Self::TimesRepeat
            | Self::ConcatenateWith
            | Self::And
            | Self::Or => 1,
            Self::StartsWithEndsBefore | Self::IfTrueIfFalse => 2,
        }
    }

    /// The selector this routine implements.
    #[cfg(test)]
    fn selector(self) -> &'static str {
        match self {
            Self::IdenticalTo => "identicalTo:",
            Self::EqualTo => "equalTo:",
            Self::AsString => "asString",
            Self::IsNumber => "isNumber",
            Self::IsString => "isString",
            Self::IsBlock => "isBlock",
            Self::IsNil => "isNil",
            Self::Plus => "plus:",
            Self::Minus => "minus:",
            Self::MultiplyBy => "multiplyBy:",
            Self::DivBy => "divBy:",
            Self::GreaterThan => "greaterThan:",
            Self::AsInteger => "asInteger",
            Self::TimesRepeat => "timesRepeat:",
            Self::Print => "print",
            Self::ConcatenateWith => "concatenateWith:",
            Self::StartsWithEndsBefore => "startsWith:endsBefore:",
            Self::Not => "not",
            Self::And => "and:",
            Self::Or => "or:",
            Self::IfTrueIfFalse => "ifTrue:ifFalse:",
        }
    }
}

/// Maps a selector to its native routine: split on `:`, drop empty parts,
/// capitalize each, join, then require the arity to match the colon count
/// (`plus` without a colon is an attribute read, not arithmetic).
pub(crate) fn native_for_selector(selector: &str) -> Option<Native> {
    let colons = selector.matches(':').count();
    let mut name = String::with_capacity(selector.len());
    for part in selector.split(':').filter(|part| !part.is_empty()) {
        let mut chars = part.chars();
        let first = chars.next()?;
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    let native: Native = name.parse().ok()?;
    (native.arity() == colons).then_some(native)
}

impl<R, W, T, Tr> Interp<'_, R, W, T, Tr>
where
    R: LineReader,
    W: PrintWriter,
    T: ResourceTracker,
    Tr: SendTracer,
{
    /// Runs a native routine against the receiver.
    ///
    /// Returns `Ok(None)` when the receiver's built-in ancestor does not
    /// provide the routine, letting the dispatch ladder continue.
    pub(crate) fn call_native(&mut self, native: Native, receiver: &Value, args: &[Value]) -> RunResult<Option<Value>> {
        if args.len() != native.arity() {
            return Err(RunError::internal(format!(
                "native {native:?} invoked with {} arguments",
                args.len()
            )));
        }
        let ancestor = self.registry().builtin_ancestor(receiver.class_name())?;
        let result = match native {
            // Object-level defaults, available on every value.
            Native::IdenticalTo => Some(self.singletons.bool(receiver.is_identical(&args[0]))),
            Native::EqualTo => Some(self.singletons.bool(values_equal(ancestor, receiver, &args[0]))),
            Native::AsString => Some(as_string(ancestor, receiver)),
            Native::IsNumber => Some(self.singletons.bool(ancestor == BuiltinClass::Integer)),
            Native::IsString => Some(self.singletons.bool(ancestor == BuiltinClass::String)),
            Native::IsBlock => Some(self.singletons.bool(ancestor == BuiltinClass::Block)),
            Native::IsNil => Some(self.singletons.bool(ancestor == BuiltinClass::Nil)),

            // Integer.
            Native::Plus | Native::Minus | Native::MultiplyBy | Native::DivBy | Native::GreaterThan
                if ancestor == BuiltinClass::Integer =>
            {
                Some(self.integer_binary(native, receiver, &args[0])?)
            }
            Native::AsInteger if ancestor == BuiltinClass::Integer => Some(receiver.clone()),
            Native::TimesRepeat if ancestor == BuiltinClass::Integer => {
                Some(self.times_repeat(receiver, &args[0])?)
            }

            // String.
            Native::Print if ancestor == BuiltinClass::String => Some(self.print_string(receiver)?),
            Native::AsInteger if ancestor == BuiltinClass::String => Some(self.parse_integer(receiver)?),
            Native::ConcatenateWith if ancestor == BuiltinClass::String => {
                Some(self.concatenate(receiver, &args[0])?)
            }
            Native::StartsWithEndsBefore if ancestor == BuiltinClass::String => {
                Some(self.substring(receiver, &args[0], &args[1])?)
            }

            // True / False, all short-circuiting.
            Native::Not if is_boolean(ancestor) => {
                Some(self.singletons.bool(ancestor == BuiltinClass::False))
            }
            Native::And if is_boolean(ancestor) => Some(if ancestor == BuiltinClass::True {
                self.send_to(args[0].clone(), "value", &[])?
            } else {
                receiver.clone()
            }),
            Native::Or if is_boolean(ancestor) => Some(if ancestor == BuiltinClass::False {
                self.send_to(args[0].clone(), "value", &[])?
            } else {
                receiver.clone()
            }),
            Native::IfTrueIfFalse if is_boolean(ancestor) => {
                let branch = if ancestor == BuiltinClass::True { &args[0] } else { &args[1] };
                Some(self.send_to(branch.clone(), "value", &[])?)
            }

            _ => None,
        };
        Ok(result)
    }

    fn integer_binary(&mut self, native: Native, receiver: &Value, arg: &Value) -> RunResult<Value> {
        let lhs = payload_int(receiver)?;
        let Some(rhs) = arg.as_int() else {
            return Err(RunError::value(format!(
                "expected an Integer argument, got an instance of {}",
                arg.class_name()
            )));
        };
        Ok(match native {
            Native::Plus => Value::int(lhs.wrapping_add(rhs)),
            Native::Minus => Value::int(lhs.wrapping_sub(rhs)),
            Native::MultiplyBy => Value::int(lhs.wrapping_mul(rhs)),
            Native::DivBy => {
                if rhs == 0 {
                    return Err(RunError::value("division by zero"));
                }
                Value::int(lhs.wrapping_div(rhs))
            }
            Native::GreaterThan => self.singletons.bool(lhs > rhs),
            other => return Err(RunError::internal(format!("{other:?} is not an integer operation"))),
        })
    }

    /// `timesRepeat:` sends `value:` with a one-based index; a non-positive
    /// receiver is a no-op. Iterates at host level.
    fn times_repeat(&mut self, receiver: &Value, body: &Value) -> RunResult<Value> {
        let count = payload_int(receiver)?;
        let mut index = 1;
        while index <= count {
            self.send_to(body.clone(), "value:", &[Value::int(index)])?;
            index += 1;
        }
        Ok(receiver.clone())
    }

    fn print_string(&mut self, receiver: &Value) -> RunResult<Value> {
        let decoded = decode_escapes(payload_str(receiver)?);
        self.writer
            .write_str(&decoded)
            .map_err(|err| RunError::internal(format!("output failed: {err}")))?;
        Ok(receiver.clone())
    }

    fn parse_integer(&mut self, receiver: &Value) -> RunResult<Value> {
        let text = payload_str(receiver)?;
        Ok(match text.trim().parse::<i64>() {
            Ok(value) => Value::int(value),
            Err(_) => self.singletons.nil(),
        })
    }

    fn concatenate(&mut self, receiver: &Value, arg: &Value) -> RunResult<Value> {
        let lhs = payload_str(receiver)?;
        Ok(match arg.as_str() {
            Some(rhs) => Value::string(format!("{lhs}{rhs}")),
            None => self.singletons.nil(),
        })
    }

    /// `startsWith:endsBefore:` with one-based inclusive start and exclusive
    /// end, counted in code points. Nil on a non-Integer or non-positive
    /// argument, the empty string when start >= end; the end clamps to the
    /// available code points.
    fn substring(&mut self, receiver: &Value, start: &Value, end: &Value) -> RunResult<Value> {
        let text = payload_str(receiver)?;
        let (Some(start), Some(end)) = (start.as_int(), end.as_int()) else {
            return Ok(self.singletons.nil());
        };
        if start < 1 || end < 1 {
            return Ok(self.singletons.nil());
        }
        if start >= end {
            return Ok(Value::string(""));
        }
        let skip = usize::try_from(start - 1).unwrap_or(usize::MAX);
        let take = usize::try_from(end - start).unwrap_or(usize::MAX);
        let result: String = text.chars().skip(skip).take(take).collect();
        Ok(Value::string(result))
    }
}

fn is_boolean(ancestor: BuiltinClass) -> bool {
    matches!(ancestor, BuiltinClass::True | BuiltinClass::False)
}

/// `equalTo:` is value-based for Integer and String receivers and falls
/// back to identity everywhere else.
fn values_equal(ancestor: BuiltinClass, receiver: &Value, arg: &Value) -> bool {
    match ancestor {
        BuiltinClass::Integer => match (receiver.as_int(), arg.as_int()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        },
        BuiltinClass::String => match (receiver.as_str(), arg.as_str()) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            _ => false,
        },
        _ => receiver.is_identical(arg),
    }
}

fn as_string(ancestor: BuiltinClass, receiver: &Value) -> Value {
    match ancestor {
        BuiltinClass::Integer => match receiver.as_int() {
            Some(value) => Value::string(value.to_string()),
            None => Value::string(""),
        },
        // asString on a String is the receiver itself.
        BuiltinClass::String => receiver.clone(),
        BuiltinClass::Nil => Value::string("nil"),
        _ => Value::string(""),
    }
}

fn payload_int(receiver: &Value) -> RunResult<i64> {
    receiver.as_int().ok_or_else(|| {
        RunError::internal(format!(
            "instance of {} carries no integer payload",
            receiver.class_name()
        ))
    })
}

fn payload_str(receiver: &Value) -> RunResult<&str> {
    receiver.as_str().ok_or_else(|| {
        RunError::internal(format!(
            "instance of {} carries no string payload",
            receiver.class_name()
        ))
    })
}

/// Escape processing applied only within `print`: `\\`, `\'` and `\n`
/// decode; every other sequence is left verbatim.
pub(crate) fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
