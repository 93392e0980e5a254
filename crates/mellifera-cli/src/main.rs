//! The `mf` command-line driver: evaluate a script file, or start the
//! interactive REPL when no file is given.

use std::{env, path::PathBuf, process::ExitCode};

use mellifera::{Error, Interp, RunError, Str, Value, Vector, eval_file, eval_program, parse_program};
use rustyline::{Config, DefaultEditor, error::ReadlineError};

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(file) => run_file(&file, args.collect()),
        None => repl(),
    }
}

fn print_error(error: &Error) {
    match &error.location {
        Some(location) => eprintln!("[{location}] error: {error}"),
        None => eprintln!("error: {error}"),
    }
    for frame in &error.trace {
        match &frame.location {
            Some(location) => eprintln!("...within {} called from {location}", frame.callee),
            None => eprintln!("...within {}", frame.callee),
        }
    }
}

fn run_file(file: &str, rest: Vec<String>) -> ExitCode {
    let mut interp = Interp::new();
    let env = interp.child_env();

    let real_path = std::fs::canonicalize(file).unwrap_or_else(|_| PathBuf::from(file));
    interp.set_module_path(&real_path);

    let mut argv = vec![Value::string(file)];
    argv.extend(rest.into_iter().map(Value::string));
    env.declare(Str::from("argv"), Value::vector(Vector::from_values(argv)));

    match eval_file(&mut interp, file.as_ref(), &env) {
        Ok(Some(value)) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(RunError::Parse(error)) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
        Err(RunError::Eval(error)) => {
            print_error(&error);
            ExitCode::FAILURE
        }
    }
}

fn history_file() -> Option<PathBuf> {
    let home = env::var_os("MELLIFERA_HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)?;
    Some(home.join(".mellifera-history"))
}

fn repl() -> ExitCode {
    let mut interp = Interp::new();
    let env = interp.child_env();

    let config = Config::builder()
        .max_history_size(4096)
        .expect("history size is valid")
        .build();
    let Ok(mut editor) = DefaultEditor::with_config(config) else {
        eprintln!("error: failed to initialize terminal input");
        return ExitCode::FAILURE;
    };
    let history = history_file();
    if let Some(path) = &history {
        let _ = editor.load_history(path);
    }

    let mut pending = String::new();
    loop {
        let prompt = if pending.is_empty() { ">>> " } else { "... " };
        let line = match editor.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                pending.clear();
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("error: {error}");
                break;
            }
        };
        let blank = line.trim().is_empty();
        if !blank {
            let _ = editor.add_history_entry(&line);
        }
        if pending.is_empty() && blank {
            continue;
        }
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);

        match parse_program(&pending, None) {
            Err(error) => {
                // assume the user is mid-statement until a blank line says
                // otherwise
                if blank {
                    eprintln!("error: {error}");
                    pending.clear();
                }
            }
            Ok(program) => {
                if pending.trim_end().ends_with(';') || blank {
                    pending.clear();
                    match eval_program(&program, &env, &mut interp) {
                        Ok(Some(value)) => println!("{value}"),
                        Ok(None) => {}
                        Err(error) => eprintln!("error: {error}"),
                    }
                }
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
    ExitCode::SUCCESS
}
