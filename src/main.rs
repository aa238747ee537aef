use miniscm::Interpreter;
use miniscm::ast::Value;
use miniscm::repl::{ReplConfig, run_repl};
use miniscm::scheme::ParseConfig;
use std::ffi::OsString;
use std::panic;
use std::path::PathBuf;
use std::process;

const HELP: &str = "\
miniscm: a small Scheme interpreter

USAGE:
  miniscm [OPTIONS] [FILE]...

Files are run in order in one session. With no file and no -e, the REPL starts.

OPTIONS:
  -e, --eval EXPR      Evaluate EXPR and print its value (repeatable)
  -i, --interactive    Start the REPL after running files and expressions
  -v, --verbose        Log definitions and assignments (same as RUST_LOG=debug)
  -h, --help           Print this help
";

#[derive(Debug)]
struct Args {
    files: Vec<PathBuf>,
    exprs: Vec<String>,
    interactive: bool,
    verbose: bool,
}

fn parse_args(raw: Vec<OsString>) -> Result<Option<Args>, pico_args::Error> {
    let mut pargs = pico_args::Arguments::from_vec(raw);
    if pargs.contains(["-h", "--help"]) {
        return Ok(None);
    }
    let interactive = pargs.contains(["-i", "--interactive"]);
    let verbose = pargs.contains(["-v", "--verbose"]);
    let exprs = pargs.values_from_str(["-e", "--eval"])?;
    let files = pargs.finish().into_iter().map(PathBuf::from).collect();
    Ok(Some(Args {
        files,
        exprs,
        interactive,
        verbose,
    }))
}

fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

/// Run files, then expressions, then the REPL; returns the process exit status
fn run(args: &Args) -> i32 {
    let mut interpreter = Interpreter::new();
    interpreter.set_parse_config(ParseConfig::with_comments());

    let mut status = 0;
    for path in &args.files {
        if let Err(e) = interpreter.load_file(path) {
            eprintln!("{}: {e}", path.display());
            status = 1;
            break;
        }
    }

    if status == 0 {
        for expr in &args.exprs {
            match interpreter.run_program(expr) {
                Ok(Value::Unspecified) => {}
                Ok(value) => println!("{value}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    status = 1;
                    break;
                }
            }
        }
    }

    let wants_repl = args.interactive || (args.files.is_empty() && args.exprs.is_empty());
    if wants_repl {
        if let Err(e) = run_repl(&mut interpreter, &ReplConfig::default()) {
            eprintln!("REPL error: {e}");
            return 1;
        }
        return 0;
    }
    status
}

fn main() {
    let args = match parse_args(std::env::args_os().skip(1).collect()) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print!("{HELP}");
            return;
        }
        Err(e) => {
            eprintln!("miniscm: {e}");
            eprint!("{HELP}");
            process::exit(2);
        }
    };

    init_logger(args.verbose);

    let result = panic::catch_unwind(|| run(&args));
    match result {
        Ok(status) => process::exit(status),
        Err(panic_info) => {
            eprintln!("The interpreter encountered an unexpected error and must exit.");

            if let Some(msg) = panic_info.downcast_ref::<&str>() {
                eprintln!("Error: {msg}");
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                eprintln!("Error: {msg}");
            } else {
                eprintln!("Error: Unknown panic occurred");
            }

            process::exit(1);
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(args(&["-v", "-e", "(+ 1 2)", "a.scm", "--eval", "x", "b.scm"]))
            .unwrap()
            .unwrap();
        assert!(parsed.verbose);
        assert!(!parsed.interactive);
        assert_eq!(parsed.exprs, vec!["(+ 1 2)".to_owned(), "x".to_owned()]);
        assert_eq!(
            parsed.files,
            vec![PathBuf::from("a.scm"), PathBuf::from("b.scm")]
        );

        assert!(parse_args(args(&["--help"])).unwrap().is_none());
        assert!(parse_args(args(&["-e"])).is_err());

        let parsed = parse_args(args(&["-i"])).unwrap().unwrap();
        assert!(parsed.interactive);
        assert!(parsed.files.is_empty());
    }
}
