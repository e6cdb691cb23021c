use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser as _;
use owo_colors::OwoColorize;

use fable::cli::{generate_completions, AppConfig, Args, Commands};
use fable::diagnostic::Diagnostics;
use fable::interpreter::{run_source, Interpreter};

/// Exit codes follow sysexits: 64 for unusable input, 65 for source errors.
const EXIT_USAGE: u8 = 64;
const EXIT_DATA: u8 = 65;

fn main() -> ExitCode {
    let args = Args::parse();

    if let Some(Commands::Complete { shell }) = args.command {
        generate_completions(shell);
        return ExitCode::SUCCESS;
    }

    let config = AppConfig::from_args(&args);

    match &args.script {
        Some(path) => run_file(path, &config),
        None => run_repl(&config),
    }
}

fn run_file(path: &Path, config: &AppConfig) -> ExitCode {
    if !path.is_file() {
        report_io_error(config, "Path is not recognized as a regular file.");
        return ExitCode::from(EXIT_USAGE);
    }
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            report_io_error(config, &format!("Could not read {}: {}.", path.display(), error));
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let mut diagnostics = Diagnostics::new();
    let mut interpreter = Interpreter::new();
    run_source(&source, &mut interpreter, &mut diagnostics, false);

    if !diagnostics.is_empty() {
        eprint!("{}", diagnostics.render_all(config.color_enabled));
    }
    if diagnostics.had_error() {
        return ExitCode::from(EXIT_DATA);
    }
    // A reported runtime error still exits 0: the program compiled and ran.
    ExitCode::SUCCESS
}

/// The REPL keeps one interpreter for the whole session so definitions
/// persist across entries; diagnostics are drained after each entry.
fn run_repl(config: &AppConfig) -> ExitCode {
    let mut diagnostics = Diagnostics::new();
    let mut interpreter = Interpreter::new();
    let stdin = io::stdin();

    loop {
        prompt(config, "fable> ");
        let mut entry = String::new();
        match stdin.read_line(&mut entry) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                report_io_error(config, &format!("Could not read input: {}.", error));
                break;
            }
        }

        // Keep reading while brackets opened so far are unclosed.
        while needs_more_input(&entry) {
            prompt(config, "   ... ");
            let mut continuation = String::new();
            match stdin.read_line(&mut continuation) {
                Ok(0) => break,
                Ok(_) => entry.push_str(&continuation),
                Err(error) => {
                    report_io_error(config, &format!("Could not read input: {}.", error));
                    break;
                }
            }
        }

        if entry.trim().is_empty() {
            continue;
        }

        let echoed = run_source(&entry, &mut interpreter, &mut diagnostics, true);
        if !diagnostics.is_empty() {
            eprint!("{}", diagnostics.render_all(config.color_enabled));
            diagnostics.clear();
        }
        if let Some(text) = echoed {
            println!("{}", text);
        }
    }
    ExitCode::SUCCESS
}

/// True while the entry has more `(`/`{` than closers, not counting any
/// inside string literals.
fn needs_more_input(entry: &str) -> bool {
    let mut depth: i64 = 0;
    let mut in_string = false;
    for c in entry.chars() {
        match c {
            '"' => in_string = !in_string,
            '(' | '{' if !in_string => depth += 1,
            ')' | '}' if !in_string => depth -= 1,
            _ => {}
        }
    }
    depth > 0
}

fn prompt(config: &AppConfig, text: &str) {
    if config.color_enabled {
        print!("{}", text.green());
    } else {
        print!("{}", text);
    }
    let _ = io::stdout().flush();
}

fn report_io_error(config: &AppConfig, message: &str) {
    let tag = "[ERROR]";
    if config.color_enabled {
        eprintln!("{}: {}", tag.red().bold(), message);
    } else {
        eprintln!("{}: {}", tag, message);
    }
}
