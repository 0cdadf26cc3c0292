//! The runtime value model.
//!
//! Every SOL25 value is a [`Value`]: a shared handle (`Rc`) to an object
//! carrying a dynamic class name, a payload, and an attribute table.
//! Integers, strings and blocks are immutable and shared by reference;
//! operations on them return fresh values. Attribute tables are the one
//! mutable part and are created-on-first-write.
//!
//! The dynamic class name is usually the built-in name (`"Integer"`,
//! `"String"`, …) but may be refined to a user-defined subclass name when
//! the value was produced by `new` or `from:` on such a subclass.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::ast::BlockId;

/// A shared runtime value.
///
/// Cloning is cheap (an `Rc` bump) and preserves identity: `identicalTo:`
/// is pointer identity over the shared object.
#[derive(Debug, Clone)]
pub(crate) struct Value(Rc<ObjData>);

#[derive(Debug)]
struct ObjData {
    class_name: String,
    payload: Payload,
    attrs: RefCell<IndexMap<String, Value>>,
}

/// The internal carrier of a value.
///
/// `Plain` is the payload of instances whose only built-in ancestor is
/// `Object`. Instances of user subclasses of a built-in keep that built-in's
/// payload kind under their refined class name.
#[derive(Debug, Clone)]
pub(crate) enum Payload {
    Nil,
    True,
    False,
    Int(i64),
    Str(String),
    Block(BlockPayload),
    Plain,
}

/// A captured, unevaluated block literal.
#[derive(Debug, Clone)]
pub(crate) struct BlockPayload {
    pub block: BlockId,
    pub arity: usize,
    /// The `self` observed when the block literal was evaluated. Shared
    /// ownership keeps the captured value live for the block's lifetime;
    /// a block may legitimately outlive its defining frame.
    pub defining_self: Option<Value>,
}

impl Value {
    fn build(class_name: impl Into<String>, payload: Payload) -> Self {
        Self(Rc::new(ObjData {
            class_name: class_name.into(),
            payload,
            attrs: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn int(value: i64) -> Self {
        Self::build("Integer", Payload::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::build("String", Payload::Str(value.into()))
    }

    pub fn block(block: BlockId, arity: usize, defining_self: Option<Value>) -> Self {
        Self::build(
            "Block",
            Payload::Block(BlockPayload {
                block,
                arity,
                defining_self,
            }),
        )
    }

    /// A fresh instance with an explicit dynamic class name, used by `new`
    /// and `from:` where the target class governs the payload kind.
    pub fn instance(class_name: impl Into<String>, payload: Payload) -> Self {
        Self::build(class_name, payload)
    }

    /// A fresh instance copying this value's payload and all its attributes,
    /// with the dynamic class name set to `class_name`. Implements `from:`.
    pub fn copy_with_class(&self, class_name: &str) -> Self {
        let copy = Self::build(class_name, self.0.payload.clone());
        copy.0.attrs.borrow_mut().clone_from(&self.0.attrs.borrow());
        copy
    }

    pub fn class_name(&self) -> &str {
        &self.0.class_name
    }

    pub fn payload(&self) -> &Payload {
        &self.0.payload
    }

    /// Pointer identity over the shared object, the `identicalTo:` contract.
    pub fn is_identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.0.payload {
            Payload::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0.payload {
            Payload::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockPayload> {
        match &self.0.payload {
            Payload::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.0.attrs.borrow().get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.0.attrs.borrow_mut().insert(name.to_owned(), value);
    }
}

impl fmt::Display for Value {
    /// Debug-oriented rendering used in traces and error messages; program
    /// output goes through `asString`/`print` instead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.payload {
            Payload::Nil => f.write_str("nil"),
            Payload::True => f.write_str("true"),
            Payload::False => f.write_str("false"),
            Payload::Int(value) => write!(f, "{value}"),
            Payload::Str(value) => write!(f, "'{value}'"),
            Payload::Block(block) => write!(f, "a {} ({} args)", self.class_name(), block.arity),
            Payload::Plain => write!(f, "a {}", self.class_name()),
        }
    }
}

/// The three process-run singletons.
///
/// Constructed once at driver startup and shared by reference throughout the
/// run; identity and equality coincide for them, and they reject attribute
/// writes.
#[derive(Debug)]
pub(crate) struct Singletons {
    nil: Value,
    truth: Value,
    falsity: Value,
}

impl Singletons {
    pub fn new() -> Self {
        Self {
            nil: Value::build("Nil", Payload::Nil),
            truth: Value::build("True", Payload::True),
            falsity: Value::build("False", Payload::False),
        }
    }

    pub fn nil(&self) -> Value {
        self.nil.clone()
    }

    pub fn truth(&self) -> Value {
        self.truth.clone()
    }

    pub fn falsity(&self) -> Value {
        self.falsity.clone()
    }

    pub fn bool(&self, value: bool) -> Value {
        if value { self.truth() } else { self.falsity() }
    }

    pub fn is_singleton(&self, value: &Value) -> bool {
        value.is_identical(&self.nil) || value.is_identical(&self.truth) || value.is_identical(&self.falsity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_identity() {
        let singletons = Singletons::new();
        assert!(singletons.nil().is_identical(&singletons.nil()));
        assert!(singletons.truth().is_identical(&singletons.truth()));
        assert!(!singletons.truth().is_identical(&singletons.falsity()));
    }

    #[test]
    fn integers_are_distinct_objects() {
        let a = Value::int(5);
        let b = Value::int(5);
        assert!(!a.is_identical(&b));
        assert!(a.is_identical(&a.clone()));
    }

    #[test]
    fn attributes_created_on_first_write() {
        let obj = Value::instance("Counter", Payload::Plain);
        assert!(obj.get_attr("count").is_none());
        obj.set_attr("count", Value::int(1));
        assert_eq!(obj.get_attr("count").unwrap().as_int(), Some(1));
        obj.set_attr("count", Value::int(2));
        assert_eq!(obj.get_attr("count").unwrap().as_int(), Some(2));
    }

    #[test]
    fn copy_with_class_copies_payload_and_attrs() {
        let original = Value::int(7);
        original.set_attr("tag", Value::string("x"));
        let copy = original.copy_with_class("MyInt");
        assert_eq!(copy.class_name(), "MyInt");
        assert_eq!(copy.as_int(), Some(7));
        assert_eq!(copy.get_attr("tag").unwrap().as_str(), Some("x"));
        assert!(!copy.is_identical(&original));
        // the copy's attribute table is independent
        copy.set_attr("tag", Value::string("y"));
        assert_eq!(original.get_attr("tag").unwrap().as_str(), Some("x"));
    }
}
