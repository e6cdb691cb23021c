use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::value::{Callable, NativeFn, Value};

use super::environment::Environment;

/// Registers the host functions in the global scope.
pub fn install(globals: &Environment) {
    let natives = [
        NativeFn {
            name: "read",
            arity: 0,
            func: native_read,
        },
        NativeFn {
            name: "print",
            arity: 1,
            func: native_print,
        },
        NativeFn {
            name: "println",
            arity: 1,
            func: native_println,
        },
    ];
    for native in natives {
        globals.define(
            native.name.to_string(),
            Value::Callable(Callable::Native(Rc::new(native))),
        );
    }
}

/// Reads one line from stdin, without the trailing newline. End of input
/// yields an empty string.
fn native_read(_output: &mut dyn Write, _args: &[Value]) -> Result<Value, String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|error| format!("Could not read from standard input: {}.", error))?;
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::Str(Rc::from(line.as_str())))
}

fn native_print(output: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    write!(output, "{}", args[0].stringify(false))
        .and_then(|_| output.flush())
        .map_err(|error| format!("Could not write to program output: {}.", error))?;
    Ok(Value::Nil)
}

fn native_println(output: &mut dyn Write, args: &[Value]) -> Result<Value, String> {
    writeln!(output, "{}", args[0].stringify(false))
        .map_err(|error| format!("Could not write to program output: {}.", error))?;
    Ok(Value::Nil)
}
