//! Built-in operations registry.
//!
//! This module provides the fixed registry of operations the interpreter knows by name: the
//! special forms the evaluator dispatches on, and the host procedures installed in every root
//! environment.
//!
//! ```scheme
//! (lambda (x) (+ x 1))   ; special form: parameters and body are not evaluated
//! (if (= n 0) 1 n)       ; special form: only the taken branch is evaluated
//! (+ 1 2 3)              ; host procedure: receives already evaluated arguments
//! ```
//!
//! ## Functions vs Special Forms
//!
//! - **Functions**: Evaluate all arguments before application (e.g., `+`, `=`, `not`)
//! - **Special Forms**: Receive the whole unevaluated form and the environment (`lambda`,
//!   `define`, `if`, `set!`)
//!
//! Special forms are matched by symbol identity in the evaluator before the head of a form is
//! evaluated, so they cannot be shadowed by bindings.
//!
//! ## Arithmetic
//!
//! `+` and `*` fold over their arguments with the first argument as the seed. A step where the
//! accumulator or the next element is not a number leaves the accumulator unchanged, so
//! `(+ 1 "a" 2)` is `3` and `(+ "a" 1)` is `"a"`. `-` and `/` fold the same way.
//!
//! `display` needs the interpreter's output sink and is registered by
//! [`crate::Interpreter`] rather than listed here.

use crate::Error;
use crate::ast::{NumberType, Value};
use crate::evaluator::{Arity, Environment, Evaluator, eval_define, eval_if, eval_lambda, eval_set};

/// Special-form handler: receives the whole unevaluated form (head included), the current
/// environment and the current evaluation depth.
pub type SpecialFormFn = fn(&Evaluator, &[Value], &Environment, usize) -> Result<Value, Error>;

/// Host procedure over already evaluated arguments.
pub type BuiltinFn = fn(&[Value]) -> Result<Value, Error>;

/// Represents the implementation of a built-in expression (function or special form)
#[derive(Clone, Copy)]
pub enum OpKind {
    /// Regular function that takes evaluated arguments and returns a value
    Function(BuiltinFn),
    /// Special form that controls evaluation of its own operands
    SpecialForm(SpecialFormFn),
}

impl std::fmt::Debug for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Function(_) => write!(f, "Function(<fn>)"),
            OpKind::SpecialForm(_) => write!(f, "SpecialForm(<fn>)"),
        }
    }
}

/// Definition of a built-in operation
#[derive(Debug, Clone)]
pub struct BuiltinOp {
    /// The Scheme identifier for this operation
    pub scheme_id: &'static str,
    /// The implementation of this operation (function or special form)
    pub op_kind: OpKind,
    /// Expected number of operands (head excluded)
    pub arity: Arity,
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        // Compare operations by their scheme_id, which uniquely identifies them
        self.scheme_id == other.scheme_id
    }
}

impl BuiltinOp {
    /// Check if this operation is a special form
    pub fn is_special_form(&self) -> bool {
        matches!(self.op_kind, OpKind::SpecialForm(_))
    }
}

//
// Builtin Function Implementations
//

/// Fold with the first argument as seed; non-numeric steps keep the accumulator.
fn fold_numbers(args: &[Value], op: fn(NumberType, NumberType) -> NumberType) -> Option<Value> {
    let (first, rest) = args.split_first()?;
    Some(rest.iter().fold(first.clone(), |acc, cur| {
        match (acc.as_number(), cur.as_number()) {
            (Some(a), Some(b)) => Value::Number(op(a, b)),
            _ => acc,
        }
    }))
}

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    Ok(fold_numbers(args, |a, b| a + b).unwrap_or(Value::Number(0.0)))
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    Ok(fold_numbers(args, |a, b| a * b).unwrap_or(Value::Number(1.0)))
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Number(n)] => Ok(Value::Number(-n)),
        _ => fold_numbers(args, |a, b| a - b).ok_or_else(|| Error::arity_error(1, 0)),
    }
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    match args {
        [Value::Number(n)] => Ok(Value::Number(1.0 / n)),
        _ => fold_numbers(args, |a, b| a / b).ok_or_else(|| Error::arity_error(1, 0)),
    }
}

/// `#t` when every adjacent pair of arguments is equal
fn builtin_eq(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    match args {
        [value] => Ok(Value::Bool(matches!(value, Value::Bool(false)))),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

fn numeric_args(args: &[Value], op_name: &str) -> Result<Vec<NumberType>, Error> {
    args.iter()
        .map(|arg| {
            arg.as_number().ok_or_else(|| {
                Error::TypeError(format!(
                    "{op_name} requires numbers, got {}",
                    arg.type_name()
                ))
            })
        })
        .collect()
}

// Macro to generate chained numeric comparison functions
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let numbers = numeric_args(args, $op_str)?;
            Ok(Value::Bool(numbers.windows(2).all(|pair| pair[0] $op pair[1])))
        }
    };
}

numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_le, <=, "<=");
numeric_comparison!(builtin_ge, >=, ">=");

static BUILTIN_OPS: &[BuiltinOp] = &[
    // Special forms
    BuiltinOp {
        scheme_id: "lambda",
        op_kind: OpKind::SpecialForm(eval_lambda),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        scheme_id: "define",
        op_kind: OpKind::SpecialForm(eval_define),
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        scheme_id: "if",
        op_kind: OpKind::SpecialForm(eval_if),
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        scheme_id: "set!",
        op_kind: OpKind::SpecialForm(eval_set),
        arity: Arity::Exact(2),
    },
    // Arithmetic
    BuiltinOp {
        scheme_id: "+",
        op_kind: OpKind::Function(builtin_add),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        scheme_id: "*",
        op_kind: OpKind::Function(builtin_mul),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        scheme_id: "-",
        op_kind: OpKind::Function(builtin_sub),
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        scheme_id: "/",
        op_kind: OpKind::Function(builtin_div),
        arity: Arity::AtLeast(1),
    },
    // Comparison
    BuiltinOp {
        scheme_id: "=",
        op_kind: OpKind::Function(builtin_eq),
        arity: Arity::AtLeast(0),
    },
    BuiltinOp {
        scheme_id: "<",
        op_kind: OpKind::Function(builtin_lt),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        scheme_id: ">",
        op_kind: OpKind::Function(builtin_gt),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        scheme_id: "<=",
        op_kind: OpKind::Function(builtin_le),
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        scheme_id: ">=",
        op_kind: OpKind::Function(builtin_ge),
        arity: Arity::AtLeast(2),
    },
    // Logic
    BuiltinOp {
        scheme_id: "not",
        op_kind: OpKind::Function(builtin_not),
        arity: Arity::Exact(1),
    },
];

/// All registered operations, special forms first
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS
}

/// Find a builtin operation by its Scheme identifier
pub fn find_scheme_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_OPS.iter().find(|op| op.scheme_id == name)
}
