//! Interpreter sessions.
//!
//! An [`Interpreter`] owns everything one program run needs: the symbol table, the evaluator,
//! the global environment and the sink `display` writes to. Sessions share nothing, so two
//! interpreters never see each other's definitions or symbols.
//!
//! ```
//! use miniscm::Interpreter;
//! use miniscm::ast::Value;
//!
//! let mut interp = Interpreter::new();
//! interp.eval_str("(define square (lambda (x) (* x x)))").unwrap();
//! assert_eq!(interp.eval_str("(square 7)").unwrap(), Value::Number(49.0));
//! ```

use crate::Error;
use crate::ast::Value;
use crate::builtinops::BuiltinFn;
use crate::evaluator::{Arity, Environment, Evaluator, create_global_env};
use crate::scheme::{ParseConfig, parse_program, parse_scheme_with_config};
use crate::symbol::{Interner, Symbol};
use log::debug;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

/// Destination for `display` output
pub type OutputSink = Rc<RefCell<dyn Write>>;

pub struct Interpreter {
    interner: Interner,
    evaluator: Evaluator,
    global: Environment,
    output: OutputSink,
    parse_config: ParseConfig,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("symbols", &self.interner.len())
            .field("global", &self.global)
            .field("parse_config", &self.parse_config)
            .finish_non_exhaustive()
    }
}

impl Interpreter {
    /// Create a session whose `display` writes to standard output
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// Create a session whose `display` writes to `output`
    pub fn with_output(output: OutputSink) -> Self {
        let mut interner = Interner::new();
        let evaluator = Evaluator::new(&mut interner);
        let global = create_global_env(&mut interner);
        let mut interpreter = Interpreter {
            interner,
            evaluator,
            global,
            output,
            parse_config: ParseConfig::default(),
        };
        interpreter.register_display();
        interpreter
    }

    fn register_display(&mut self) {
        let output = Rc::clone(&self.output);
        self.register_host_procedure("display", Arity::AtLeast(0), move |args| {
            let line = args
                .iter()
                .map(|arg| arg.display_form().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            let mut out = output.borrow_mut();
            writeln!(out, "{line}")?;
            out.flush()?;
            Ok(Value::Unspecified)
        });
    }

    pub fn parse_config(&self) -> ParseConfig {
        self.parse_config
    }

    pub fn set_parse_config(&mut self, config: ParseConfig) {
        self.parse_config = config;
    }

    /// Intern `name` in this session's symbol table
    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn global_env(&self) -> &Environment {
        &self.global
    }

    /// A fresh empty frame whose parent is the global environment
    pub fn new_scope(&self) -> Environment {
        Environment::with_parent(&self.global)
    }

    /// Read one expression; `Ok(None)` when `text` holds none
    pub fn parse(&mut self, text: &str) -> Result<Option<Value>, Error> {
        parse_scheme_with_config(text, self.parse_config, &mut self.interner)
    }

    /// Evaluate an already parsed expression in `env`
    pub fn eval(&self, expr: &Value, env: &Environment) -> Result<Value, Error> {
        self.evaluator.eval(expr, env)
    }

    /// Parse and evaluate a single expression in `env`.
    ///
    /// Text holding no expression evaluates to [`Value::Unspecified`].
    pub fn evaluate_text(&mut self, text: &str, env: &Environment) -> Result<Value, Error> {
        match self.parse(text)? {
            Some(expr) => self.eval(&expr, env),
            None => Ok(Value::Unspecified),
        }
    }

    /// Parse and evaluate a single expression in the global environment
    pub fn eval_str(&mut self, text: &str) -> Result<Value, Error> {
        let global = self.global.clone();
        self.evaluate_text(text, &global)
    }

    /// Evaluate every top-level form of `text` in order and return the last value.
    ///
    /// The whole text is read before anything runs, so a syntax error anywhere means no form
    /// is evaluated. Evaluation stops at the first failing form.
    pub fn run_program(&mut self, text: &str) -> Result<Value, Error> {
        let forms = parse_program(text, self.parse_config, &mut self.interner)?;
        debug!("running program of {} form(s)", forms.len());
        forms.iter().try_fold(Value::Unspecified, |_, form| {
            self.evaluator.eval(form, &self.global)
        })
    }

    /// Read `path` and run it as a program
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let path = path.as_ref();
        debug!("loading {}", path.display());
        let text = std::fs::read_to_string(path)?;
        self.run_program(&text)
    }

    /// Apply a procedure value to already evaluated arguments
    pub fn apply(&self, procedure: &Value, args: Vec<Value>) -> Result<Value, Error> {
        self.evaluator.apply(procedure, args)
    }

    /// Bind `name` in the global environment
    pub fn define(&mut self, name: &str, value: Value) {
        let symbol = self.interner.intern(name);
        self.global.define(symbol, value);
    }

    /// Look `name` up in the global environment
    pub fn lookup(&self, name: &str) -> Result<Value, Error> {
        match self.interner.get(name) {
            Some(symbol) => self.global.lookup(&symbol),
            None => Err(Error::UnboundSymbol(name.to_owned())),
        }
    }

    /// Register a custom builtin function for use by Scheme code.
    ///
    /// The function receives its evaluated arguments as a slice; it is responsible for its own
    /// argument count checks.
    ///
    /// # Example
    /// ```
    /// use miniscm::{Error, Interpreter};
    /// use miniscm::ast::Value;
    ///
    /// fn count_args(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::Number(args.len() as f64))
    /// }
    ///
    /// let mut interp = Interpreter::new();
    /// interp.register_builtin_function("count-args", count_args);
    /// assert_eq!(interp.eval_str("(count-args 1 2 3)").unwrap(), Value::Number(3.0));
    /// ```
    pub fn register_builtin_function(&mut self, name: &str, func: BuiltinFn) {
        self.register_host_procedure(name, Arity::AtLeast(0), move |args| func(&args));
    }

    /// Register a host procedure with an argument count checked before each call.
    ///
    /// The closure may capture host state, which is how output sinks and similar services are
    /// exposed to Scheme code.
    pub fn register_host_procedure<F>(&mut self, name: &str, arity: Arity, func: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, Error> + 'static,
    {
        let procedure = Value::HostProcedure {
            id: name.to_owned(),
            func: Rc::new(move |args: Vec<Value>| {
                arity.validate(args.len())?;
                func(args)
            }),
        };
        self.define(name, procedure);
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;

    fn capturing() -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
        let buffer = Rc::new(RefCell::new(Vec::new()));
        let interp = Interpreter::with_output(buffer.clone());
        (interp, buffer)
    }

    fn captured(buffer: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buffer.borrow().clone()).unwrap()
    }

    #[test]
    fn test_display_writes_to_sink() {
        let (mut interp, buffer) = capturing();
        let result = interp.eval_str("(display \"hello world\" 42 #t)").unwrap();
        assert!(result.is_unspecified());
        interp.eval_str("(display)").unwrap();
        interp.eval_str("(display (+ 1 2.5))").unwrap();
        assert_eq!(captured(&buffer), "hello world 42 #t\n\n3.5\n");
    }

    #[test]
    fn test_empty_input_is_unspecified() {
        let mut interp = Interpreter::new();
        assert!(interp.eval_str("").unwrap().is_unspecified());
        assert!(interp.eval_str("   ").unwrap().is_unspecified());
    }

    #[test]
    fn test_run_program_returns_last_value() {
        let (mut interp, buffer) = capturing();
        interp.set_parse_config(ParseConfig::with_comments());
        let program = "
            ; counter
            (define n 0)
            (define tick (lambda () (set! n (+ n 1)) n))
            (tick)
            (display (tick))
            (tick)
        ";
        assert_eq!(interp.run_program(program).unwrap(), val(3));
        assert_eq!(captured(&buffer), "2\n");
        assert!(interp.run_program("").unwrap().is_unspecified());
    }

    #[test]
    fn test_run_program_stops_at_first_error() {
        let mut interp = Interpreter::new();
        let err = interp
            .run_program("(define a 1) (undefined) (define b 2)")
            .unwrap_err();
        assert_eq!(err, Error::UnboundSymbol("undefined".to_owned()));
        assert_eq!(interp.lookup("a").unwrap(), val(1));
        assert!(interp.lookup("b").is_err());

        // Nothing runs when the text does not read
        assert!(interp.run_program("(define c 3) (oops").is_err());
        assert!(interp.lookup("c").is_err());
    }

    #[test]
    fn test_register_host_procedure() {
        let mut interp = Interpreter::new();
        let calls = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&calls);
        interp.register_host_procedure("double", Arity::Exact(1), move |args| {
            *seen.borrow_mut() += 1;
            let n = f64::try_from(args[0].clone())?;
            Ok(Value::Number(n * 2.0))
        });

        assert_eq!(interp.eval_str("(double 21)").unwrap(), val(42));
        assert!(matches!(
            interp.eval_str("(double 1 2)"),
            Err(Error::ArityMismatch {
                expected: 1,
                got: 2,
                ..
            })
        ));
        assert!(matches!(
            interp.eval_str("(double \"x\")"),
            Err(Error::TypeError(_))
        ));
        // The arity failure never reached the closure
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_define_lookup_and_apply_from_host() {
        let mut interp = Interpreter::new();
        interp.define("limit", val(10));
        assert_eq!(interp.eval_str("(+ limit 1)").unwrap(), val(11));

        let inc = interp.eval_str("(lambda (x) (+ x 1))").unwrap();
        assert_eq!(interp.apply(&inc, vec![val(4)]).unwrap(), val(5));
        assert_eq!(
            interp.lookup("never-interned"),
            Err(Error::UnboundSymbol("never-interned".to_owned()))
        );
    }

    #[test]
    fn test_scopes_see_globals_but_not_each_other() {
        let mut interp = Interpreter::new();
        interp.eval_str("(define g 1)").unwrap();
        let scope_a = interp.new_scope();
        let scope_b = interp.new_scope();
        interp.evaluate_text("(define local 5)", &scope_a).unwrap();

        assert_eq!(interp.evaluate_text("(+ g local)", &scope_a).unwrap(), val(6));
        assert!(interp.evaluate_text("local", &scope_b).is_err());
        assert!(interp.eval_str("local").is_err());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = Interpreter::new();
        let mut second = Interpreter::new();
        first.eval_str("(define only-here 1)").unwrap();
        assert!(second.eval_str("only-here").is_err());
        assert_eq!(first.eval_str("only-here").unwrap(), val(1));
    }
}
