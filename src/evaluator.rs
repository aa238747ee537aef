//! Tree-walking evaluator.
//!
//! A list form is dispatched in this order:
//!
//! 1. head is a symbol naming a special form: the handler receives the unevaluated form
//! 2. otherwise the head is evaluated
//! 3. host procedure: operands are evaluated left to right, then the procedure is called
//! 4. closure: arity is checked, operands are evaluated in the caller's environment, and the
//!    body runs in a fresh frame whose parent is the closure's captured environment
//! 5. any other value applied to zero operands is returned as is; with operands it is an error

pub mod environment;

pub use environment::Environment;

use crate::ast::{Closure, Value};
use crate::builtinops::{OpKind, SpecialFormFn, get_builtin_ops};
use crate::symbol::{Interner, Symbol};
use crate::{Error, MAX_EVAL_DEPTH};
use log::{debug, trace};
use std::collections::HashMap;
use std::rc::Rc;

/// Number of operands an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// At least n arguments
    AtLeast(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
}

impl Arity {
    pub fn validate(&self, arg_count: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(n) if arg_count != n => Err(Error::arity_error(n, arg_count)),
            Arity::AtLeast(min) if arg_count < min => Err(Error::arity_error(min, arg_count)),
            Arity::Range(min, _) if arg_count < min => Err(Error::arity_error(min, arg_count)),
            Arity::Range(_, max) if arg_count > max => Err(Error::arity_error(max, arg_count)),
            _ => Ok(()),
        }
    }
}

/// Evaluation rules shared by every environment of one interpreter.
///
/// Special forms are keyed by interned symbol, so an `Evaluator` is only meaningful for
/// expressions read with the [`Interner`] it was built from.
pub struct Evaluator {
    special_forms: HashMap<Symbol, SpecialFormFn>,
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.special_forms.keys().map(Symbol::name).collect();
        names.sort_unstable();
        f.debug_struct("Evaluator")
            .field("special_forms", &names)
            .finish()
    }
}

impl Evaluator {
    pub fn new(interner: &mut Interner) -> Self {
        let special_forms = get_builtin_ops()
            .iter()
            .filter_map(|op| match op.op_kind {
                OpKind::SpecialForm(handler) => Some((interner.intern(op.scheme_id), handler)),
                OpKind::Function(_) => None,
            })
            .collect();
        Evaluator { special_forms }
    }

    pub fn is_special_form(&self, symbol: &Symbol) -> bool {
        self.special_forms.contains_key(symbol)
    }

    /// Evaluate an S-expression (public API)
    pub fn eval(&self, expr: &Value, env: &Environment) -> Result<Value, Error> {
        self.eval_with_depth_tracking(expr, env, 0)
    }

    /// Apply an already evaluated procedure to already evaluated arguments
    pub fn apply(&self, procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
        if let Value::Closure(closure) = procedure
            && closure.arity() != args.len()
        {
            return Err(Error::arity_error(closure.arity(), args.len()));
        }
        self.apply_with_depth(procedure, args, 0)
    }

    /// Evaluate an S-expression with depth tracking to prevent stack overflow
    pub(crate) fn eval_with_depth_tracking(
        &self,
        expr: &Value,
        env: &Environment,
        depth: usize,
    ) -> Result<Value, Error> {
        if depth >= MAX_EVAL_DEPTH {
            return Err(Error::EvalError(format!(
                "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            )));
        }
        match expr {
            Value::Number(_)
            | Value::String(_)
            | Value::Bool(_)
            | Value::HostProcedure { .. }
            | Value::Closure(_)
            | Value::Unspecified => Ok(expr.clone()),

            Value::Symbol(symbol) => env.lookup(symbol),

            Value::List(elements) => self
                .eval_list(elements, env, depth)
                .map_err(|err| add_context(err, expr)),
        }
    }

    fn eval_args(&self, args: &[Value], env: &Environment, depth: usize) -> Result<Vec<Value>, Error> {
        args.iter()
            .map(|arg| self.eval_with_depth_tracking(arg, env, depth + 1))
            .collect()
    }

    /// Evaluate forms in order and yield the last value
    fn eval_sequence(&self, body: &[Value], env: &Environment, depth: usize) -> Result<Value, Error> {
        body.iter().try_fold(Value::Unspecified, |_, form| {
            self.eval_with_depth_tracking(form, env, depth + 1)
        })
    }

    fn eval_list(&self, elements: &[Value], env: &Environment, depth: usize) -> Result<Value, Error> {
        let Some((head, operands)) = elements.split_first() else {
            return Err(Error::EvalError("cannot evaluate empty list".to_owned()));
        };

        if let Value::Symbol(name) = head
            && let Some(handler) = self.special_forms.get(name)
        {
            return handler(self, elements, env, depth);
        }

        let func = self.eval_with_depth_tracking(head, env, depth + 1)?;
        match &func {
            Value::HostProcedure { .. } => {
                let args = self.eval_args(operands, env, depth)?;
                self.apply_with_depth(&func, args, depth)
            }
            Value::Closure(closure) => {
                // Arity is checked before any operand is evaluated
                if closure.arity() != operands.len() {
                    return Err(Error::arity_error_with_expr(
                        closure.arity(),
                        operands.len(),
                        form_to_string(elements),
                    ));
                }
                let args = self.eval_args(operands, env, depth)?;
                self.apply_with_depth(&func, args, depth)
            }
            _ if operands.is_empty() => Ok(func.clone()),
            _ => Err(Error::NotApplicable(func.to_string())),
        }
    }

    fn apply_with_depth(&self, procedure: &Value, args: Vec<Value>, depth: usize) -> Result<Value, Error> {
        match procedure {
            Value::HostProcedure { id, func } => {
                trace!("calling {id} with {} argument(s)", args.len());
                func(args)
            }
            Value::Closure(closure) => self.call_closure(closure, args, depth),
            other => Err(Error::NotApplicable(other.to_string())),
        }
    }

    fn call_closure(&self, closure: &Closure, args: Vec<Value>, depth: usize) -> Result<Value, Error> {
        trace!("calling #<closure/{}>", closure.arity());
        let frame = Environment::with_parent(&closure.env);
        for (param, arg) in closure.params.iter().zip(args) {
            frame.define(param.clone(), arg);
        }
        self.eval_sequence(&closure.body, &frame, depth + 1)
    }
}

/// Helper function to add expression context to errors
fn add_context(error: Error, expr: &Value) -> Error {
    let context = format!("while evaluating: {expr}");
    match error {
        Error::EvalError(msg) => Error::EvalError(format!("{msg}\n  Context: {context}")),
        Error::TypeError(msg) => Error::TypeError(format!("{msg}\n  Context: {context}")),
        // Unbound symbols, arity and shape errors carry their own context
        other => other,
    }
}

fn form_to_string(form: &[Value]) -> String {
    Value::List(form.to_vec()).to_string()
}

/// Evaluate lambda special form: `(lambda (param ...) body ...)`
pub(crate) fn eval_lambda(
    _evaluator: &Evaluator,
    form: &[Value],
    env: &Environment,
    _depth: usize,
) -> Result<Value, Error> {
    match form {
        [_, Value::List(param_list), body @ ..] if !body.is_empty() => {
            let mut params: Vec<Symbol> = Vec::with_capacity(param_list.len());
            for param in param_list {
                match param {
                    Value::Symbol(name) => {
                        if params.contains(name) {
                            return Err(Error::InvalidParameterList(format!(
                                "duplicate parameter name: {name}"
                            )));
                        }
                        params.push(name.clone());
                    }
                    other => {
                        return Err(Error::InvalidParameterList(format!(
                            "lambda parameters must be symbols, got {other}"
                        )));
                    }
                }
            }

            // Only fixed-arity parameter lists; no rest parameters.
            Ok(Value::Closure(Rc::new(Closure {
                params,
                body: body.to_vec(),
                env: env.clone(),
            })))
        }
        [_, Value::List(_)] => Err(Error::arity_error_with_expr(2, 1, form_to_string(form))),
        [_, other, ..] => Err(Error::InvalidParameterList(format!(
            "lambda parameters must be a list, got {other}"
        ))),
        _ => Err(Error::arity_error_with_expr(
            2,
            form.len().saturating_sub(1),
            form_to_string(form),
        )),
    }
}

/// Evaluate define special form: `(define name expr)`
pub(crate) fn eval_define(
    evaluator: &Evaluator,
    form: &[Value],
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    match form {
        [_, Value::Symbol(name), expr] => {
            let value = evaluator.eval_with_depth_tracking(expr, env, depth + 1)?;
            debug!("define {name} = {value}");
            env.define(name.clone(), value);
            Ok(Value::Unspecified)
        }
        [_, target, _] => Err(Error::InvalidDefineTarget(target.to_string())),
        _ => Err(Error::arity_error_with_expr(
            2,
            form.len().saturating_sub(1),
            form_to_string(form),
        )),
    }
}

/// Evaluate set! special form: `(set! name expr)`
///
/// The target must already be bound somewhere in the chain; the check happens before the
/// value expression is evaluated.
pub(crate) fn eval_set(
    evaluator: &Evaluator,
    form: &[Value],
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    match form {
        [_, Value::Symbol(name), expr] => {
            if !env.is_bound(name) {
                return Err(Error::UnboundSymbol(name.name().to_owned()));
            }
            let value = evaluator.eval_with_depth_tracking(expr, env, depth + 1)?;
            debug!("set! {name} = {value}");
            env.assign(name, value)?;
            Ok(Value::Unspecified)
        }
        [_, target, _] => Err(Error::InvalidSetTarget(target.to_string())),
        _ => Err(Error::arity_error_with_expr(
            2,
            form.len().saturating_sub(1),
            form_to_string(form),
        )),
    }
}

/// Evaluate if special form: `(if test then)` or `(if test then else)`
///
/// Only `#t` selects the then-branch.
pub(crate) fn eval_if(
    evaluator: &Evaluator,
    form: &[Value],
    env: &Environment,
    depth: usize,
) -> Result<Value, Error> {
    let (condition_expr, then_expr, else_expr) = match form {
        [_, condition, then_branch] => (condition, then_branch, None),
        [_, condition, then_branch, else_branch] => (condition, then_branch, Some(else_branch)),
        _ => {
            return Err(Error::InvalidIfForm(form_to_string(form)));
        }
    };

    match evaluator.eval_with_depth_tracking(condition_expr, env, depth + 1)? {
        Value::Bool(true) => evaluator.eval_with_depth_tracking(then_expr, env, depth + 1),
        _ => match else_expr {
            Some(expr) => evaluator.eval_with_depth_tracking(expr, env, depth + 1),
            None => Ok(Value::Unspecified),
        },
    }
}

/// Create a root environment holding every registered host function
pub fn create_global_env(interner: &mut Interner) -> Environment {
    let env = Environment::new();
    for op in get_builtin_ops() {
        if let OpKind::Function(func) = op.op_kind {
            let arity = op.arity;
            let procedure = Value::HostProcedure {
                id: op.scheme_id.to_owned(),
                func: Rc::new(move |args: Vec<Value>| {
                    arity.validate(args.len())?;
                    func(&args)
                }),
            };
            env.define(interner.intern(op.scheme_id), procedure);
        }
    }
    env
}
