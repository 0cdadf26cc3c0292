//! The class registry: every known class definition and the inheritance
//! relations between them.
//!
//! Seeded with the seven built-in classes, then extended with user classes
//! loaded from the AST. Read-only after loading; only the loader mutates it.
//! The registry resolves selectors through the parent chain but executes
//! nothing itself.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    ast::{BlockId, Program},
    error::{RunError, RunResult},
};

/// The seven built-in classes. Their method tables are empty; their
/// semantics live in [`crate::natives`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
pub(crate) enum BuiltinClass {
    Object,
    Nil,
    True,
    False,
    Integer,
    String,
    Block,
}

impl BuiltinClass {
    const ALL: [Self; 7] = [
        Self::Object,
        Self::Nil,
        Self::True,
        Self::False,
        Self::Integer,
        Self::String,
        Self::Block,
    ];

    fn parent(self) -> Option<Self> {
        match self {
            Self::Object => None,
            _ => Some(Self::Object),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClassDef {
    pub name: String,
    /// `None` only for `Object`.
    pub parent: Option<String>,
    /// Selector to method body, insertion-ordered.
    pub methods: IndexMap<String, BlockId>,
    pub builtin: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClassRegistry {
    classes: IndexMap<String, ClassDef>,
}

impl ClassRegistry {
    /// A registry holding only the seven built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            classes: IndexMap::new(),
        };
        for builtin in BuiltinClass::ALL {
            registry.classes.insert(
                builtin.to_string(),
                ClassDef {
                    name: builtin.to_string(),
                    parent: builtin.parent().map(|p| p.to_string()),
                    methods: IndexMap::new(),
                    builtin: true,
                },
            );
        }
        registry
    }

    /// Registers every user class of the program.
    ///
    /// A duplicate class name (against a built-in or another user class) is
    /// a semantic error. Duplicate selectors within one class are an
    /// internal error: the parser is expected to reject them.
    pub fn load(&mut self, program: &Program) -> RunResult<()> {
        for class in &program.classes {
            if self.classes.contains_key(&class.name) {
                return Err(RunError::Semantic(format!("class {} is defined twice", class.name)));
            }
            let mut methods = IndexMap::new();
            for method in &class.methods {
                if methods.insert(method.selector.clone(), method.body).is_some() {
                    return Err(RunError::internal(format!(
                        "class {} defines selector '{}' twice",
                        class.name, method.selector
                    )));
                }
            }
            self.classes.insert(
                class.name.clone(),
                ClassDef {
                    name: class.name.clone(),
                    parent: Some(class.parent.clone()),
                    methods,
                    builtin: false,
                },
            );
        }
        // Every parent chain must terminate at Object; the parser enforces
        // acyclicity, so a dangling parent here is an internal error.
        for name in self.classes.keys() {
            self.builtin_ancestor(name)?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    fn get_checked(&self, name: &str) -> RunResult<&ClassDef> {
        self.classes
            .get(name)
            .ok_or_else(|| RunError::internal(format!("unknown class {name} in parent chain")))
    }

    pub fn parent_of(&self, name: &str) -> RunResult<Option<&str>> {
        Ok(self.get_checked(name)?.parent.as_deref())
    }

    /// Finds a method body by walking up the parent chain from `class_name`.
    /// The first class whose table contains the selector wins; returns
    /// `None` (rather than an error) when the chain is exhausted.
    pub fn resolve_method(&self, class_name: &str, selector: &str) -> RunResult<Option<BlockId>> {
        let mut current = Some(class_name);
        while let Some(name) = current {
            let class = self.get_checked(name)?;
            if let Some(body) = class.methods.get(selector) {
                return Ok(Some(*body));
            }
            current = class.parent.as_deref();
        }
        Ok(None)
    }

    /// The nearest built-in class on the parent chain, governing the carrier
    /// payload of `new`/`from:` and the set of native selectors available.
    pub fn builtin_ancestor(&self, class_name: &str) -> RunResult<BuiltinClass> {
        let mut current = Some(class_name);
        let mut steps = 0usize;
        while let Some(name) = current {
            let class = self.get_checked(name)?;
            if class.builtin {
                return name
                    .parse()
                    .map_err(|_| RunError::internal(format!("built-in class {name} has no native kind")));
            }
            current = class.parent.as_deref();
            steps += 1;
            if steps > self.classes.len() {
                return Err(RunError::internal(format!("parent chain of {class_name} does not terminate")));
            }
        }
        Err(RunError::internal(format!("class {class_name} has no built-in ancestor")))
    }

    /// Whether one class is the other, an ancestor of it, or a descendant of
    /// it. This is the `from:` compatibility check.
    pub fn related(&self, a: &str, b: &str) -> RunResult<bool> {
        Ok(self.is_ancestor_or_self(a, b)? || self.is_ancestor_or_self(b, a)?)
    }

    fn is_ancestor_or_self(&self, ancestor: &str, descendant: &str) -> RunResult<bool> {
        let mut current = Some(descendant);
        while let Some(name) = current {
            if name == ancestor {
                return Ok(true);
            }
            current = self.get_checked(name)?.parent.as_deref();
        }
        Ok(false)
    }
}
