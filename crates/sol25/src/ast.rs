//! Typed representation of the SOL25 abstract syntax tree.
//!
//! The front-end parser validates SOL25 source and emits the tree as an XML
//! document; [`crate::parse`] converts that document into these types. Block
//! bodies are interned in a [`BlockArena`] and addressed by [`BlockId`] so
//! that runtime block values stay small and the whole program remains a
//! plain serializable value.

use serde::{Deserialize, Serialize};

/// Identifier of a block body stored in the [`BlockArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub(crate) struct BlockId(u32);

impl BlockId {
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("block arena overflow"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every block body of a program.
///
/// Methods and block literals both point into this arena; a runtime `Block`
/// value carries only the id plus its captured `self`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct BlockArena {
    blocks: Vec<BlockNode>,
}

impl BlockArena {
    pub fn alloc(&mut self, block: BlockNode) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(block);
        id
    }

    pub fn get(&self, id: BlockId) -> &BlockNode {
        &self.blocks[id.index()]
    }
}

/// A loaded program: user class definitions plus the shared block arena.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Program {
    pub classes: Vec<ClassNode>,
    pub blocks: BlockArena,
}

/// A user-defined class extracted from a `class` element.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClassNode {
    pub name: String,
    pub parent: String,
    pub methods: Vec<MethodNode>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MethodNode {
    pub selector: String,
    pub body: BlockId,
}

/// A block body: parameters and assignments, both already sorted by their
/// `order` attributes.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BlockNode {
    pub parameters: Vec<String>,
    pub assigns: Vec<AssignNode>,
}

impl BlockNode {
    /// Declared arity, equal to the parameter count by construction.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssignNode {
    pub var: String,
    pub expr: Expr,
}

/// An expression node, the single element child of an `expr` element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Expr {
    Literal(Literal),
    /// A name reference resolved at runtime: `nil`/`true`/`false` yield the
    /// singletons, `self`/`super` the current frame's `self`, anything else
    /// a frame lookup.
    Var(String),
    /// A block literal; capturing `self` happens when the literal is
    /// evaluated, not here.
    Block(BlockId),
    Send {
        selector: String,
        receiver: Box<Expr>,
        /// Argument expressions sorted by their `order` attributes.
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum Literal {
    Nil,
    True,
    False,
    Integer(i64),
    /// Stored verbatim; escape sequences decode only inside `print`.
    String(String),
    /// A class-name token, legal only as the receiver of a send.
    Class(String),
}
