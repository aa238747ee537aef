//! This module defines the core value type shared by the reader and the evaluator. The main
//! enum, [`Value`], is the universal symbolic-expression representation: atoms (numbers,
//! strings, booleans, symbols, host procedures, closures) and ordered list forms. The same
//! type is used for code and data. Conversion traits for common Rust types make it easy to build
//! Values in tests and in host procedures, and display logic prints values in re-readable form.

use crate::Error;
use crate::evaluator::Environment;
use crate::symbol::Symbol;
use std::fmt;
use std::rc::Rc;

/// Type alias for number values in interpreter
pub(crate) type NumberType = f64;

/// Signature of a host-provided procedure: already-evaluated arguments in, one value out.
pub type HostFn = dyn Fn(Vec<Value>) -> Result<Value, Error>;

/// Procedure value produced by evaluating a `lambda` form.
pub struct Closure {
    pub params: Vec<Symbol>,
    /// Body forms, evaluated in order; the last one gives the result
    pub body: Vec<Value>,
    /// Environment active where the `lambda` form was evaluated
    pub env: Environment,
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Core value type in interpreter
///
/// To build values in tests, use the helpers:
/// - `val(42)` for values, `nil()` for empty lists
/// - `val([1, 2, 3])` for homogeneous lists
/// - `Value::Symbol(interner.intern("name"))` for symbols
#[derive(Clone)]
pub enum Value {
    /// Numbers (a single floating-point type)
    Number(NumberType),
    /// Interned symbols (identifiers)
    Symbol(Symbol),
    /// String literals
    String(String),
    /// Boolean values
    Bool(bool),
    /// Ordered list forms (flat sequences, not cons pairs)
    List(Vec<Value>),
    /// Procedures provided by the host runtime
    /// Uses id string for equality comparison instead of function pointer
    HostProcedure { id: String, func: Rc<HostFn> },
    /// User-defined procedures
    Closure(Rc<Closure>),
    /// The "no value" result of `define`, `set!`, `display` and a branchless false `if`
    /// These values never equal themselves or any other value
    Unspecified,
}

impl Value {
    /// Check if a value represents the empty list
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(list) if list.is_empty())
    }

    pub fn is_unspecified(&self) -> bool {
        matches!(self, Value::Unspecified)
    }

    pub fn is_procedure(&self) -> bool {
        matches!(self, Value::HostProcedure { .. } | Value::Closure(_))
    }

    pub fn as_number(&self) -> Option<NumberType> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Symbol(_) => "symbol",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::List(_) => "list",
            Value::HostProcedure { .. } => "host-procedure",
            Value::Closure(_) => "closure",
            Value::Unspecified => "unspecified",
        }
    }

    /// Wrap this value so it formats the way `display` prints it (strings without quotes)
    pub fn display_form(&self) -> DisplayForm<'_> {
        DisplayForm(self)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({})", s.name()),
            Value::String(s) => write!(f, "String(\"{s}\")"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::List(list) => {
                write!(f, "List(")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, ")")
            }
            Value::HostProcedure { id, .. } => write!(f, "HostProcedure({id})"),
            Value::Closure(closure) => {
                let params: Vec<&str> = closure.params.iter().map(Symbol::name).collect();
                write!(f, "Closure(params={params:?}, body={:?})", closure.body)
            }
            Value::Unspecified => write!(f, "Unspecified"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

macro_rules! impl_from_number {
    ($num_type:ty) => {
        impl From<$num_type> for Value {
            fn from(n: $num_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

// Lossless conversions only
impl_from_number!(i8);
impl_from_number!(i16);
impl_from_number!(i32);
impl_from_number!(u8);
impl_from_number!(u16);
impl_from_number!(u32);
impl_from_number!(f32);
impl_from_number!(NumberType);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl TryFrom<Value> for NumberType {
    type Error = Error;

    fn try_from(value: Value) -> Result<NumberType, Error> {
        if let Value::Number(n) = value {
            Ok(n)
        } else {
            Err(Error::TypeError(format!(
                "expected number, got {}",
                value.type_name()
            )))
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<bool, Error> {
        if let Value::Bool(b) = value {
            Ok(b)
        } else {
            Err(Error::TypeError(format!(
                "expected boolean, got {}",
                value.type_name()
            )))
        }
    }
}

/// Helper function for creating Values - works great in mixed lists!
/// Accepts any type that can be converted to Value
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating empty lists
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::List(vec![])
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            // No escape processing in the reader, so none in the printer either
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Bool(b) => write!(f, "{}", if *b { "#t" } else { "#f" }),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{elem}")?;
                }
                write!(f, ")")
            }
            Value::HostProcedure { id, .. } => write!(f, "#<host-procedure:{id}>"),
            Value::Closure(closure) => write!(f, "#<closure/{}>", closure.arity()),
            Value::Unspecified => write!(f, "#<unspecified>"),
        }
    }
}

/// Formats a value the way `display` writes it: strings unquoted, everything else as written.
pub struct DisplayForm<'a>(&'a Value);

impl fmt::Display for DisplayForm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => f.write_str(s),
            Value::List(elements) => {
                write!(f, "(")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", elem.display_form())?;
                }
                write!(f, ")")
            }
            other => write!(f, "{other}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::HostProcedure { id: id1, .. }, Value::HostProcedure { id: id2, .. }) => {
                id1 == id2
            }
            // Closures are equal only to themselves
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Unspecified, _) | (_, Value::Unspecified) => false,
            _ => false, // Different variants are never equal
        }
    }
}
