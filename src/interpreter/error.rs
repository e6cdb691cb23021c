use std::fmt;

use crate::diagnostic::Diagnostic;
use crate::token::Token;

/// A runtime failure, anchored to the token whose evaluation caused it.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            token: token.clone(),
            message: message.into(),
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::runtime_error(self.line(), self.message.clone())
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[RUNTIME ERROR | Line {}]: {}", self.line(), self.message)
    }
}

impl std::error::Error for RuntimeError {}
