//! S-expression reader.
//!
//! Token rules:
//!
//! - `(` and `)` delimit lists; whitespace separates elements
//! - `"..."` is a string running to the next `"`; there are no escape sequences
//! - `#t` / `#f` are booleans
//! - a token starting with a digit, or with `+`, `-` or `.` followed by a digit or `.`, is a
//!   number if it parses as a float (`1`, `-2.5`, `.5`, `1e3`); anything else is a symbol
//! - with [`ParseConfig::handle_comments`], `;` starts a comment running to end of line

use nom::{
    IResult, Parser,
    bytes::complete::{take_till, take_until, take_while1},
    character::complete::{char, multispace0},
    combinator::opt,
    error::ErrorKind,
};

use crate::ast::{NumberType, Value};
use crate::symbol::Interner;
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Reader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseConfig {
    /// Treat `;` as the start of a line comment
    pub handle_comments: bool,
}

impl ParseConfig {
    pub fn with_comments() -> Self {
        ParseConfig {
            handle_comments: true,
        }
    }
}

/// Convert nom parsing errors to structured parse errors
fn convert_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    let error = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            let found = e.input.chars().next().map(String::from);
            let (kind, message) = match e.code {
                ErrorKind::TooLarge => (
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                ),
                ErrorKind::Char if e.input.starts_with(')') => (
                    ParseErrorKind::UnmatchedParen,
                    format!("Unexpected ')' at position {position}"),
                ),
                ErrorKind::Eof => (
                    ParseErrorKind::UnmatchedParen,
                    format!("Unclosed '(' at position {position}"),
                ),
                ErrorKind::TakeUntil => (
                    ParseErrorKind::Incomplete,
                    format!("Unterminated string starting at position {position}"),
                ),
                _ => {
                    let remaining: String = e.input.chars().take(10).collect();
                    (
                        ParseErrorKind::InvalidSyntax,
                        format!("Invalid syntax near '{remaining}'"),
                    )
                }
            };
            ParseError::with_context_and_found(kind, message, input, position, found)
        }
        nom::Err::Incomplete(_) => {
            ParseError::from_message(ParseErrorKind::Incomplete, "Incomplete input")
        }
    };
    Error::ParseError(error)
}

fn failure(input: &str, code: ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, code))
}

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"')
}

/// Numeric shape check; the float parse decides the rest
fn looks_numeric(token: &str) -> bool {
    let mut chars = token.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+' | '-' | '.') => matches!(chars.next(), Some(c) if c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

fn parse_number(token: &str) -> Option<NumberType> {
    if looks_numeric(token) {
        token.parse::<NumberType>().ok()
    } else {
        None
    }
}

/// Parse a string literal; the body is taken verbatim up to the closing quote
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (rest, _) = char('"').parse(input)?;
    let (rest, body) = take_until("\"")
        .parse(rest)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| failure(input, ErrorKind::TakeUntil))?;
    let (rest, _) = char('"').parse(rest)?;
    Ok((rest, Value::String(body.to_owned())))
}

/// Reader state: symbols are interned as they are read
struct Reader<'i> {
    interner: &'i mut Interner,
    config: ParseConfig,
}

impl Reader<'_> {
    /// Skip whitespace and, when enabled, `;` comments
    fn skip_trivia<'a>(&self, mut input: &'a str) -> IResult<&'a str, ()> {
        loop {
            let (rest, _) = multispace0.parse(input)?;
            if self.config.handle_comments
                && let (rest, Some(_)) = opt(char(';')).parse(rest)?
            {
                let (rest, _) = take_till(|c: char| c == '\n').parse(rest)?;
                input = rest;
                continue;
            }
            return Ok((rest, ()));
        }
    }

    fn parse_atom<'a>(&mut self, input: &'a str) -> IResult<&'a str, Value> {
        let (rest, token) = take_while1(is_token_char).parse(input)?;
        let value = match token {
            "#t" => Value::Bool(true),
            "#f" => Value::Bool(false),
            _ => match parse_number(token) {
                Some(n) => Value::Number(n),
                None => Value::Symbol(self.interner.intern(token)),
            },
        };
        Ok((rest, value))
    }

    fn parse_list<'a>(&mut self, input: &'a str, depth: usize) -> IResult<&'a str, Value> {
        let open = input;
        let (mut input, _) = char('(').parse(input)?;
        let mut elements = Vec::new();
        loop {
            let (rest, _) = self.skip_trivia(input)?;
            if let (rest, Some(_)) = opt(char(')')).parse(rest)? {
                return Ok((rest, Value::List(elements)));
            }
            if rest.is_empty() {
                // Report the opening parenthesis that was never closed
                return Err(failure(open, ErrorKind::Eof));
            }
            let (rest, element) = self.parse_sexpr(rest, depth + 1)?;
            elements.push(element);
            input = rest;
        }
    }

    /// Parse one S-expression; leading trivia must already be skipped
    fn parse_sexpr<'a>(&mut self, input: &'a str, depth: usize) -> IResult<&'a str, Value> {
        if depth >= MAX_PARSE_DEPTH {
            return Err(failure(input, ErrorKind::TooLarge));
        }
        match input.chars().next() {
            Some('(') => self.parse_list(input, depth),
            Some(')') => Err(failure(input, ErrorKind::Char)),
            Some('"') => parse_string(input),
            Some(_) => self.parse_atom(input),
            None => Err(failure(input, ErrorKind::Eof)),
        }
    }
}

/// Parse a single S-expression from input.
///
/// Returns `Ok(None)` when the input holds no expression at all (empty or whitespace).
pub fn parse_scheme(input: &str, interner: &mut Interner) -> Result<Option<Value>, Error> {
    parse_scheme_with_config(input, ParseConfig::default(), interner)
}

/// Parse a single S-expression with explicit reader options.
pub fn parse_scheme_with_config(
    input: &str,
    config: ParseConfig,
    interner: &mut Interner,
) -> Result<Option<Value>, Error> {
    let mut reader = Reader { interner, config };
    let convert = |e: nom::Err<nom::error::Error<&str>>| convert_error(input, e);

    let (rest, _) = reader.skip_trivia(input).map_err(convert)?;
    if rest.is_empty() {
        return Ok(None);
    }
    let (rest, value) = reader.parse_sexpr(rest, 0).map_err(convert)?;
    let (rest, _) = reader.skip_trivia(rest).map_err(convert)?;

    if rest.is_empty() {
        Ok(Some(value))
    } else if rest.starts_with(')') {
        Err(convert(failure(rest, ErrorKind::Char)))
    } else {
        let position = input.len() - rest.len();
        let remaining: String = rest.chars().take(10).collect();
        Err(Error::ParseError(ParseError::with_context_and_found(
            ParseErrorKind::TrailingContent,
            format!("Unexpected remaining input: '{remaining}'"),
            input,
            position,
            rest.chars().next().map(String::from),
        )))
    }
}

/// Parse every top-level S-expression in `input`, in order.
pub fn parse_program(
    input: &str,
    config: ParseConfig,
    interner: &mut Interner,
) -> Result<Vec<Value>, Error> {
    let mut reader = Reader { interner, config };
    let convert = |e: nom::Err<nom::error::Error<&str>>| convert_error(input, e);

    let mut forms = Vec::new();
    let mut rest = input;
    loop {
        let (after_trivia, _) = reader.skip_trivia(rest).map_err(convert)?;
        if after_trivia.is_empty() {
            return Ok(forms);
        }
        let (after_form, form) = reader.parse_sexpr(after_trivia, 0).map_err(convert)?;
        forms.push(form);
        rest = after_form;
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, val};
    use crate::symbol::Symbol;

    /// Test result variants for comprehensive parsing tests
    #[derive(Debug)]
    enum ParseTestResult {
        Success(Value),                      // Parsing should succeed with this value
        Empty,                               // Input holds no expression
        SpecificError(ParseErrorKind, &'static str), // Should fail with this kind and message text
    }
    use ParseTestResult::*;

    /// Helper for successful parse test cases
    fn success<T: Into<Value>>(value: T) -> ParseTestResult {
        Success(value.into())
    }

    /// Run parse tests with round-trip validation against a shared interner
    fn run_parse_tests(interner: &mut Interner, test_cases: Vec<(&str, ParseTestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Parse test #{} ('{input}')", i + 1);
            let result = parse_scheme(input, interner);

            match (result, expected) {
                (Ok(Some(actual)), Success(expected_val)) => {
                    assert_eq!(actual, *expected_val, "{test_id}: value mismatch");

                    // Test round-trip: display -> parse -> display should be identical
                    let displayed = format!("{actual}");
                    let reparsed = parse_scheme(&displayed, interner)
                        .unwrap_or_else(|e| {
                            panic!("{test_id}: round-trip parse failed for '{displayed}': {e:?}")
                        })
                        .unwrap();
                    assert_eq!(
                        displayed,
                        format!("{reparsed}"),
                        "{test_id}: round-trip display mismatch"
                    );
                }
                (Ok(None), Empty) => {}
                (Err(Error::ParseError(err)), SpecificError(kind, text)) => {
                    assert_eq!(err.kind, *kind, "{test_id}: error kind mismatch ({err:?})");
                    assert!(
                        err.message.contains(text),
                        "{test_id}: error should contain '{text}', got '{}'",
                        err.message
                    );
                }
                (result, expected) => {
                    panic!("{test_id}: expected {expected:?}, got {result:?}");
                }
            }
        }
    }

    fn sym(interner: &mut Interner, name: &str) -> Value {
        Value::Symbol(interner.intern(name))
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_parser_comprehensive() {
        let mut interner = Interner::new();
        let plus = sym(&mut interner, "+");
        let foo = sym(&mut interner, "foo");
        let x = sym(&mut interner, "x");
        let lambda = sym(&mut interner, "lambda");

        let test_cases = vec![
            // === NUMBERS ===
            ("42", success(42)),
            ("-17", success(-17)),
            ("+5", success(5)),
            ("0", success(0)),
            ("2.5", success(2.5)),
            (".5", success(0.5)),
            ("-.25", success(-0.25)),
            ("1e3", success(1000)),
            ("  42  ", success(42)),
            // === SYMBOLS (including number-like tokens that fail to parse) ===
            ("foo", Success(foo.clone())),
            ("+", Success(plus.clone())),
            ("-", Success(sym(&mut interner, "-"))),
            ("...", Success(sym(&mut interner, "..."))),
            ("-.", Success(sym(&mut interner, "-."))),
            ("1abc", Success(sym(&mut interner, "1abc"))),
            ("0x1F", Success(sym(&mut interner, "0x1F"))),
            ("set!", Success(sym(&mut interner, "set!"))),
            ("a->b", Success(sym(&mut interner, "a->b"))),
            ("x;y", Success(sym(&mut interner, "x;y"))), // ';' is a token char without comments
            // === BOOLEANS ===
            ("#t", success(true)),
            ("#f", success(false)),
            ("#true", Success(sym(&mut interner, "#true"))),
            // === STRINGS ===
            ("\"hello\"", success("hello")),
            ("\"hello world\"", success("hello world")),
            ("\"\"", success("")),
            ("\"a\\b\"", success("a\\b")), // no escape processing
            ("\"(not a list)\"", success("(not a list)")),
            // === LISTS ===
            ("()", Success(nil())),
            ("( )", Success(nil())),
            ("(+ 1 2)", Success(val([plus.clone(), val(1), val(2)]))),
            (
                "(+ (+ 1 2) 3 4)",
                Success(val([
                    plus.clone(),
                    val([plus.clone(), val(1), val(2)]),
                    val(3),
                    val(4),
                ])),
            ),
            ("(foo\"bar\")", Success(val([foo.clone(), val("bar")]))),
            ("((x))", Success(val([val([x.clone()])]))),
            (
                "(lambda (x)\n  (+ x x))",
                Success(val([
                    lambda.clone(),
                    val([x.clone()]),
                    val([plus.clone(), x.clone(), x.clone()]),
                ])),
            ),
            ("(1 \"two\" #t)", Success(val([val(1), val("two"), val(true)]))),
            // === EMPTY INPUT ===
            ("", Empty),
            ("   \n\t ", Empty),
            // === ERRORS ===
            ("(+ 1 2", SpecificError(ParseErrorKind::UnmatchedParen, "Unclosed '('")),
            ("((1)", SpecificError(ParseErrorKind::UnmatchedParen, "position 0")),
            (")", SpecificError(ParseErrorKind::UnmatchedParen, "Unexpected ')'")),
            ("(+ 1 2))", SpecificError(ParseErrorKind::UnmatchedParen, "position 7")),
            ("\"open", SpecificError(ParseErrorKind::Incomplete, "Unterminated string")),
            ("(display \"open)", SpecificError(ParseErrorKind::Incomplete, "position 9")),
            ("1 2", SpecificError(ParseErrorKind::TrailingContent, "'2'")),
            ("(a) (b)", SpecificError(ParseErrorKind::TrailingContent, "'(b)'")),
        ];

        run_parse_tests(&mut interner, test_cases);
    }

    #[test]
    fn test_symbols_are_interned_while_reading() {
        let mut interner = Interner::new();
        let parsed = parse_scheme("(foo foo bar)", &mut interner).unwrap().unwrap();
        let Value::List(items) = parsed else {
            panic!("expected list");
        };
        let symbols: Vec<&Symbol> = items.iter().filter_map(Value::as_symbol).collect();
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols[0], symbols[1]);
        assert_ne!(symbols[0], symbols[2]);
        assert_eq!(interner.get("foo").as_ref(), Some(symbols[0]));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_comments() {
        let mut interner = Interner::new();
        let config = ParseConfig::with_comments();

        let parsed = parse_scheme_with_config(
            "; leading comment\n(+ 1 ; inline\n 2) ; trailing",
            config,
            &mut interner,
        )
        .unwrap()
        .unwrap();
        let plus = Value::Symbol(interner.intern("+"));
        assert_eq!(parsed, val([plus, val(1), val(2)]));

        assert_eq!(
            parse_scheme_with_config(";; only a comment", config, &mut interner).unwrap(),
            None
        );
        // Semicolons inside strings are not comments
        assert_eq!(
            parse_scheme_with_config("\"a;b\"", config, &mut interner).unwrap(),
            Some(val("a;b"))
        );
    }

    #[test]
    fn test_parse_program() {
        let mut interner = Interner::new();
        let config = ParseConfig::with_comments();
        let forms = parse_program(
            "(define x 1) ; one\n(define y 2)\n\n(+ x y)\n",
            config,
            &mut interner,
        )
        .unwrap();
        assert_eq!(forms.len(), 3);
        assert_eq!(forms[2].to_string(), "(+ x y)");

        assert!(parse_program("", config, &mut interner).unwrap().is_empty());
        assert!(matches!(
            parse_program("(define x 1) (oops", config, &mut interner),
            Err(Error::ParseError(ParseError {
                kind: ParseErrorKind::UnmatchedParen,
                ..
            }))
        ));
        assert!(matches!(
            parse_program("1)", config, &mut interner),
            Err(Error::ParseError(ParseError {
                kind: ParseErrorKind::UnmatchedParen,
                ..
            }))
        ));
    }

    #[test]
    fn test_error_context() {
        let mut interner = Interner::new();
        let Err(Error::ParseError(err)) = parse_scheme("(+ 1 2))", &mut interner) else {
            panic!("expected parse error");
        };
        assert_eq!(err.found.as_deref(), Some(")"));
        assert_eq!(err.context.as_deref(), Some("(+ 1 2))"));
    }

    #[test]
    fn test_parser_depth_limits() {
        let mut interner = Interner::new();
        let parens_under_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH - 1),
            ")".repeat(MAX_PARSE_DEPTH - 1)
        );
        let deep_parens_at_limit = format!(
            "{}1{}",
            "(".repeat(MAX_PARSE_DEPTH),
            ")".repeat(MAX_PARSE_DEPTH)
        );

        run_parse_tests(
            &mut interner,
            vec![(
                deep_parens_at_limit.as_str(),
                SpecificError(ParseErrorKind::TooDeeplyNested, "too deeply nested"),
            )],
        );

        assert!(
            parse_scheme(&parens_under_limit, &mut interner).is_ok(),
            "Parens just under depth limit should parse successfully"
        );
    }
}
