use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use fable::diagnostic::Diagnostics;
use fable::interpreter::{run_source, Interpreter};

/// Cloneable writer so a test can hand one end to the interpreter and keep
/// the other to read what the program printed.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct RunResult {
    pub output: String,
    pub diagnostics: Vec<String>,
}

/// Runs a program in file mode and collects program output plus rendered
/// diagnostics.
#[allow(dead_code)]
pub fn run(source: &str) -> RunResult {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();
    run_source(source, &mut interpreter, &mut diagnostics, false);
    RunResult {
        output: buffer.contents(),
        diagnostics: diagnostics
            .render_all(false)
            .lines()
            .map(str::to_string)
            .collect(),
    }
}

/// Runs a program that must produce no diagnostics and returns its output.
#[allow(dead_code)]
pub fn run_ok(source: &str) -> String {
    let result = run(source);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        result.diagnostics
    );
    result.output
}

#[allow(dead_code)]
pub fn run_diagnostics(source: &str) -> Vec<String> {
    run(source).diagnostics
}

/// Evaluates a bare expression the way the REPL does and returns its echoed
/// display string.
#[allow(dead_code)]
pub fn eval(source: &str) -> String {
    let buffer = SharedBuffer::new();
    let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    let mut diagnostics = Diagnostics::new();
    let echoed = run_source(source, &mut interpreter, &mut diagnostics, true);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {}",
        diagnostics.render_all(false)
    );
    echoed.expect("expression should produce an echoed value")
}
