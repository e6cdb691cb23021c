mod common;

use common::{eval, SharedBuffer};

use fable::diagnostic::Diagnostics;
use fable::interpreter::{run_source, Interpreter};

#[test]
fn bare_expressions_echo_their_value() {
    assert_eq!(eval("1 + 2"), "3");
    assert_eq!(eval("true and false"), "false");
    assert_eq!(eval("nix"), "nix");
}

#[test]
fn echoed_strings_are_quoted() {
    assert_eq!(eval("\"hi\""), "\"hi\"");
    assert_eq!(eval("\"foo\" + \"bar\""), "\"foobar\"");
}

#[test]
fn echoed_lists_quote_their_strings() {
    assert_eq!(eval("[\"a\", \"b\"]"), "[\"a\", \"b\"]");
    assert_eq!(eval("1..3"), "[1, 2, 3]");
}

#[test]
fn numbers_echo_at_full_precision() {
    assert_eq!(eval("1 / 3"), "0.3333333333333333");
    assert_eq!(eval("2^0.5"), "1.4142135623730951");
}

#[test]
fn bare_calls_run_as_statements_without_an_echo() {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();
    let echoed = run_source("print(\"hi\")", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.is_empty());
    assert_eq!(echoed, None);
    assert_eq!(buffer.contents(), "hi");
}

#[test]
fn definitions_persist_across_entries() {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();

    run_source("x = 5;", &mut interpreter, &mut diagnostics, true);
    run_source("fn double(n) { return n * 2; }", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.is_empty(), "{}", diagnostics.render_all(false));

    let echoed = run_source("double(x) + 1", &mut interpreter, &mut diagnostics, true);
    assert_eq!(echoed.as_deref(), Some("11"));
}

#[test]
fn an_error_in_one_entry_does_not_poison_the_next() {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();

    run_source("x = 1;", &mut interpreter, &mut diagnostics, true);
    run_source("y = ;", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.had_error());
    // The REPL drains diagnostics between entries.
    diagnostics.clear();

    let echoed = run_source("x", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.is_empty());
    assert_eq!(echoed.as_deref(), Some("1"));
}

#[test]
fn globals_stay_reachable_after_a_runtime_error() {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();

    run_source("x = 7;", &mut interpreter, &mut diagnostics, true);
    run_source("{ y = x / 0; }", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.had_runtime_error());
    diagnostics.clear();

    // The failed block restored the environment pointer to the globals.
    let echoed = run_source("x", &mut interpreter, &mut diagnostics, true);
    assert!(diagnostics.is_empty());
    assert_eq!(echoed.as_deref(), Some("7"));
}
