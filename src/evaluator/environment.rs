//! Scope frames.
//!
//! An [`Environment`] is a shared handle to one frame: a mutable symbol-to-value map plus an
//! optional parent. Closures keep their defining frame alive by holding a handle to it, so a
//! frame outlives the call that created it for as long as anything still refers to it.

use crate::Error;
use crate::ast::Value;
use crate::symbol::Symbol;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

struct Frame {
    bindings: RefCell<HashMap<Symbol, Value>>,
    parent: Option<Environment>,
}

/// Environment for variable bindings
///
/// Cloning an `Environment` clones the handle; both handles see the same bindings.
#[derive(Clone)]
pub struct Environment {
    frame: Rc<Frame>,
}

impl Environment {
    /// Create a root frame with no bindings and no parent
    pub fn new() -> Self {
        Self::with_optional_parent(None)
    }

    /// Create an empty frame whose lookups fall back to `parent`
    pub fn with_parent(parent: &Environment) -> Self {
        Self::with_optional_parent(Some(parent.clone()))
    }

    pub fn with_optional_parent(parent: Option<Environment>) -> Self {
        Environment {
            frame: Rc::new(Frame {
                bindings: RefCell::new(HashMap::new()),
                parent,
            }),
        }
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.frame.parent.as_ref()
    }

    /// Insert or overwrite a binding in this frame only
    pub fn define(&self, symbol: Symbol, value: Value) {
        self.frame.bindings.borrow_mut().insert(symbol, value);
    }

    /// Resolve `symbol` in this frame, then in each ancestor
    pub fn lookup(&self, symbol: &Symbol) -> Result<Value, Error> {
        let mut current = Some(self);
        while let Some(env) = current {
            if let Some(value) = env.frame.bindings.borrow().get(symbol) {
                return Ok(value.clone());
            }
            current = env.parent();
        }
        Err(Error::UnboundSymbol(symbol.name().to_owned()))
    }

    /// Mutate the nearest existing binding of `symbol`.
    ///
    /// Fails with [`Error::UnboundSymbol`] when no frame in the chain binds it; a new binding
    /// is never created.
    pub fn assign(&self, symbol: &Symbol, value: Value) -> Result<(), Error> {
        let mut current = Some(self);
        while let Some(env) = current {
            if let Some(slot) = env.frame.bindings.borrow_mut().get_mut(symbol) {
                *slot = value;
                return Ok(());
            }
            current = env.parent();
        }
        Err(Error::UnboundSymbol(symbol.name().to_owned()))
    }

    /// Whether any frame in the chain binds `symbol`
    pub fn is_bound(&self, symbol: &Symbol) -> bool {
        let mut current = Some(self);
        while let Some(env) = current {
            if env.binds_locally(symbol) {
                return true;
            }
            current = env.parent();
        }
        false
    }

    /// Whether this frame itself (ignoring parents) binds `symbol`
    pub fn binds_locally(&self, symbol: &Symbol) -> bool {
        self.frame.bindings.borrow().contains_key(symbol)
    }

    /// Whether two handles refer to the same frame
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    /// Get all bindings in this environment and its parents
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with parent bindings (so they can be overridden by local bindings)
        if let Some(parent) = self.parent() {
            for (name, value) in parent.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        for (symbol, value) in self.frame.bindings.borrow().iter() {
            bindings.insert(symbol.name().to_owned(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    // Frames can reach themselves through closures, so only the shape is printed
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(env) = current {
            depth += 1;
            current = env.parent();
        }
        f.debug_struct("Environment")
            .field("bindings", &self.frame.bindings.borrow().len())
            .field("depth", &depth)
            .finish()
    }
}
