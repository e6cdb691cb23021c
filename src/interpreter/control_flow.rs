use crate::value::Value;

/// Outcome of executing one statement. `return`, `break` and `continue` are
/// ordinary values that callers match on, not unwinding.
#[derive(Debug)]
pub enum ControlFlow {
    Normal,
    Return(Value),
    Break,
    Continue,
}
