use std::fmt;

use owo_colors::OwoColorize;

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    RuntimeError,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::RuntimeError => write!(f, "RUNTIME ERROR"),
        }
    }
}

/// A single reported problem, anchored to a source line.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub message: String,
    /// Offending source text appended verbatim after the message, e.g. the
    /// character the lexer choked on. Usually empty.
    pub snippet: String,
}

impl Diagnostic {
    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            message: message.into(),
            snippet: String::new(),
        }
    }

    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            line,
            message: message.into(),
            snippet: String::new(),
        }
    }

    pub fn runtime_error(line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::RuntimeError,
            line,
            message: message.into(),
            snippet: String::new(),
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Render to the reporting format: `[ERROR | Line 3]: message`.
    pub fn render(&self, use_color: bool) -> String {
        let tag = format!("[{} | Line {}]", self.severity, self.line);
        let tag = if use_color {
            match self.severity {
                Severity::Warning => tag.yellow().bold().to_string(),
                Severity::Error | Severity::RuntimeError => tag.red().bold().to_string(),
            }
        } else {
            tag
        };
        format!("{}: {}{}", tag, self.message, self.snippet)
    }
}

/// Collects diagnostics across the lexing, parsing, resolving and running
/// phases of one source unit. The core never prints; callers render.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, line: usize, message: impl Into<String>) {
        self.report(Diagnostic::error(line, message));
    }

    pub fn warning(&mut self, line: usize, message: impl Into<String>) {
        self.report(Diagnostic::warning(line, message));
    }

    pub fn runtime_error(&mut self, line: usize, message: impl Into<String>) {
        self.report(Diagnostic::runtime_error(line, message));
    }

    /// True once any compile-stage error has been reported. Warnings and
    /// runtime errors do not count.
    pub fn had_error(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn had_runtime_error(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::RuntimeError)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Marks the current length so a speculative parse can be rolled back
    /// without leaking its diagnostics.
    pub fn checkpoint(&self) -> usize {
        self.entries.len()
    }

    pub fn rollback(&mut self, checkpoint: usize) {
        self.entries.truncate(checkpoint);
    }

    pub fn render_all(&self, use_color: bool) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            output.push_str(&entry.render(use_color));
            output.push('\n');
        }
        output
    }
}
