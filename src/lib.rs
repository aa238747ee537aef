//! miniscm - a minimal Scheme-style expression evaluator
//!
//! This crate provides a small expression-oriented language runtime: a reader that turns
//! parenthesized text into symbolic expressions, and an evaluator that interprets them against
//! a chain of lexical environments with closures and mutable bindings.
//!
//! ```scheme
//! (define counter ((lambda (x) (lambda () (set! x (+ x 1)) x)) 0))
//! (counter)           ; => 1
//! (counter)           ; => 2
//! (if (= 1 1) "yes")  ; conditionals
//! ```
//!
//! ## Evaluation Model
//!
//! - Symbols are interned per [`interpreter::Interpreter`], so environment lookups compare
//!   identities instead of text
//! - `define` always binds in the innermost frame; `set!` mutates the nearest existing binding
//!   and never creates a new one
//! - Closures capture the environment in which their `lambda` form was evaluated
//! - Arithmetic, comparison and output are host procedures living in the root environment;
//!   the evaluator itself only knows the special forms `lambda`, `define`, `if` and `set!`
//!
//! ## Modules
//!
//! - `symbol`: symbol interning
//! - `scheme`: S-expression parsing from text
//! - `evaluator`: core expression evaluation engine and scope frames
//! - `builtinops`: special-form and host-procedure registry
//! - `interpreter`: evaluation session tying the pieces together
//! - `repl`: interactive read-eval-print loop

use std::fmt;

/// Maximum parsing depth to prevent stack overflow attacks
/// This limits deeply nested structures in the S-expression parser
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum evaluation depth to prevent stack overflow in recursive evaluation
/// Set higher than parse depth to allow for nested function applications
pub const MAX_EVAL_DEPTH: usize = 256;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed literals)
    InvalidSyntax,
    /// A closing parenthesis without an opener, or an opener that is never closed
    UnmatchedParen,
    /// Input ended inside a string literal
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with all fields
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with context and found token extracted from input at a given offset
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let char_offset = input
            .char_indices()
            .take_while(|(i, _)| *i < error_offset)
            .count();
        let context_start = char_offset.saturating_sub(20);
        let total_chars = input.chars().count();

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < total_chars {
            display_context.push_str("[...]");
        }

        // Newlines would break single-line error reports
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    /// Symbol lookup or `set!` failed through the whole environment chain
    UnboundSymbol(String),
    InvalidDefineTarget(String),
    InvalidSetTarget(String),
    InvalidParameterList(String),
    InvalidIfForm(String),
    ArityMismatch {
        expected: usize,
        got: usize,
        expression: Option<String>, // Optional expression context
    },
    /// A non-procedure value was called with arguments
    NotApplicable(String),
    TypeError(String),
    EvalError(String),
    Io(String),
}

impl Error {
    /// Create an ArityMismatch without expression context
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityMismatch with expression context
    pub fn arity_error_with_expr(expected: usize, got: usize, expression: String) -> Self {
        Error::ArityMismatch {
            expected,
            got,
            expression: Some(expression),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundSymbol(name) => write!(f, "Unbound symbol: {name}"),
            Error::InvalidDefineTarget(form) => {
                write!(f, "InvalidDefineTarget: define requires a symbol in {form}")
            }
            Error::InvalidSetTarget(form) => {
                write!(f, "InvalidSetTarget: set! requires a symbol in {form}")
            }
            Error::InvalidParameterList(msg) => write!(f, "InvalidParameterList: {msg}"),
            Error::InvalidIfForm(form) => write!(
                f,
                "InvalidIfForm: expected (if cond then) or (if cond then else), got {form}"
            ),
            Error::ArityMismatch {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "ArityMismatch: expression {expr}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityMismatch: procedure expected {expected} arguments but got {got}"
                ),
            },
            Error::NotApplicable(what) => write!(f, "NotApplicable: cannot apply {what}"),
            Error::TypeError(msg) => write!(f, "Type error: {msg}"),
            Error::EvalError(msg) => write!(f, "EvaluationError: {msg}"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::ParseError(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod interpreter;
pub mod repl;
pub mod scheme;
pub mod symbol;

pub use interpreter::Interpreter;
