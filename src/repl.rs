//! Interactive read-eval-print loop.

use crate::Error;
use crate::Interpreter;
use crate::ast::Value;
use crate::evaluator::Environment;
use log::warn;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::path::PathBuf;

pub const DEFAULT_PROMPT: &str = "miniscm> ";
pub const DEFAULT_HISTORY_FILE: &str = ".miniscm_history";

#[derive(Debug, Clone)]
pub struct ReplConfig {
    pub prompt: String,
    /// Where line history is loaded from and saved to; `None` keeps history in memory only
    pub history_file: Option<PathBuf>,
    pub show_banner: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            prompt: DEFAULT_PROMPT.to_owned(),
            history_file: Some(PathBuf::from(DEFAULT_HISTORY_FILE)),
            show_banner: true,
        }
    }
}

/// What a line typed at the prompt asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Help,
    Env,
    Quit,
    Unknown(&'a str),
    Eval(&'a str),
    Blank,
}

impl<'a> ReplCommand<'a> {
    pub fn classify(line: &'a str) -> Self {
        match line.trim() {
            "" => ReplCommand::Blank,
            ":help" => ReplCommand::Help,
            ":env" => ReplCommand::Env,
            ":quit" | ":exit" => ReplCommand::Quit,
            other if other.starts_with(':') => ReplCommand::Unknown(other),
            other => ReplCommand::Eval(other),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    Error::Io(err.to_string())
}

/// Run the loop until end of input or `:quit`
pub fn run_repl(interpreter: &mut Interpreter, config: &ReplConfig) -> Result<(), Error> {
    let mut rl = DefaultEditor::new().map_err(readline_error)?;
    if let Some(path) = &config.history_file {
        // A missing history file is normal on first start
        let _ = rl.load_history(path);
    }

    if config.show_banner {
        println!("miniscm: a small Scheme interpreter");
        println!("Enter S-expressions like: (+ 1 2)");
        println!("Type :help for more commands, or Ctrl+D to exit.");
        println!();
    }

    loop {
        match rl.readline(&config.prompt) {
            Ok(line) => {
                let command = ReplCommand::classify(&line);
                if command != ReplCommand::Blank {
                    let _ = rl.add_history_entry(line.trim());
                }

                match command {
                    ReplCommand::Blank => {}
                    ReplCommand::Help => print_help(),
                    ReplCommand::Env => {
                        let mut stdout = io::stdout().lock();
                        write_environment(&mut stdout, interpreter.global_env())?;
                    }
                    ReplCommand::Quit => {
                        println!("Goodbye!");
                        break;
                    }
                    ReplCommand::Unknown(other) => {
                        println!("Unknown command {other}; type :help for a list");
                    }
                    ReplCommand::Eval(source) => match interpreter.run_program(source) {
                        // Don't print Unspecified values (e.g., from define)
                        Ok(Value::Unspecified) => {}
                        Ok(result) => println!("{result}"),
                        Err(e) => println!("Error: {e}"),
                    },
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => return Err(readline_error(err)),
        }
    }

    if let Some(path) = &config.history_file
        && let Err(err) = rl.save_history(path)
    {
        warn!("could not save history to {}: {err}", path.display());
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+D     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  (define name expr)          (set! name expr)");
    println!("  (lambda (param ...) body ...)");
    println!("  (if test then [else])       only #t selects the then-branch");
    println!();
    println!("Procedures:");
    println!("  Arithmetic: +, -, *, /");
    println!("  Comparison: =, <, >, <=, >=");
    println!("  Logic: not");
    println!("  Output: display");
    println!();
    println!("Examples:");
    println!("  (define fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))");
    println!("  (fact 5)");
    println!();
}

/// Describe the bindings visible from `env`, host procedures first
pub fn write_environment(out: &mut impl Write, env: &Environment) -> Result<(), Error> {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        writeln!(out, "Environment is empty.")?;
        return Ok(());
    }

    writeln!(out, "Environment bindings ({} total):", bindings.len())?;
    writeln!(out)?;

    let mut host_procedures = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::HostProcedure { .. } => host_procedures.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !host_procedures.is_empty() {
        writeln!(out, "Host procedures ({}):", host_procedures.len())?;
        // Print in columns for readability
        for row in host_procedures.chunks(4) {
            for name in row {
                write!(out, "  {name:<15}")?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;
    }

    if !user_defined.is_empty() {
        writeln!(out, "User-defined values ({}):", user_defined.len())?;
        for (name, value) in user_defined {
            writeln!(out, "  {name} = {value}")?;
        }
    }
    Ok(())
}
