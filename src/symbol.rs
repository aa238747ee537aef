//! Symbol interning.
//!
//! Every identifier read by the parser is canonicalized through an [`Interner`], so two reads of
//! the same text yield the same [`Symbol`] and environment lookups can compare identities
//! instead of strings. Each [`crate::Interpreter`] owns its own interner; symbols are only
//! meaningful relative to the interner that produced them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner, Symbol as _};

/// An interned identifier.
///
/// Equality and hashing use the interned identity only. The name is carried alongside so that
/// values can be printed without access to the interner.
#[derive(Clone)]
pub struct Symbol {
    id: DefaultSymbol,
    name: Rc<str>,
}

impl Symbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dense index of this symbol within its interner
    pub fn index(&self) -> usize {
        self.id.to_usize()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}#{})", self.name, self.index())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Text to [`Symbol`] table. Grows monotonically; entries are never purged.
#[derive(Default)]
pub struct Interner {
    strings: StringInterner<DefaultBackend>,
    /// Shared names indexed by `DefaultSymbol::to_usize`
    names: Vec<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the symbol for `text`, creating it on first use
    pub fn intern(&mut self, text: &str) -> Symbol {
        let id = self.strings.get_or_intern(text);
        let index = id.to_usize();
        if index == self.names.len() {
            self.names.push(Rc::from(text));
        }
        Symbol {
            id,
            name: Rc::clone(&self.names[index]),
        }
    }

    /// Look up an already interned symbol without creating one
    pub fn get(&self, text: &str) -> Option<Symbol> {
        let id = self.strings.get(text)?;
        self.names.get(id.to_usize()).map(|name| Symbol {
            id,
            name: Rc::clone(name),
        })
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("symbols", &self.names.len())
            .finish()
    }
}
