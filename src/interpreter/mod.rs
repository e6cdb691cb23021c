pub mod builtins;
pub mod control_flow;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod resolver;

pub use control_flow::ControlFlow;
pub use environment::Environment;
pub use error::RuntimeError;
pub use evaluator::Interpreter;
pub use parser::{ParsedProgram, Parser};
pub use resolver::Resolver;

use crate::diagnostic::Diagnostics;
use crate::lexer::scan_tokens;

/// Runs one source unit through the full pipeline: scan, parse, resolve,
/// execute. Any compile-stage error stops before execution.
///
/// With `allow_bare_expression` set (REPL mode), a source unit consisting of
/// a single expression is evaluated and its display form returned instead of
/// being rejected for the missing `;`.
pub fn run_source(
    source: &str,
    interpreter: &mut Interpreter,
    diagnostics: &mut Diagnostics,
    allow_bare_expression: bool,
) -> Option<String> {
    let tokens = scan_tokens(source, diagnostics);
    let program = Parser::new(tokens, diagnostics).parse(allow_bare_expression);
    if diagnostics.had_error() {
        return None;
    }
    Resolver::new(diagnostics).resolve(&program.statements, program.trailing.as_ref());
    if diagnostics.had_error() {
        return None;
    }
    interpreter.interpret(&program.statements, diagnostics);
    program
        .trailing
        .and_then(|expr| interpreter.interpret_expression(&expr, diagnostics))
}
