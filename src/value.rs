use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::ast::Stmt;
use crate::interpreter::environment::Environment;
use crate::token::Token;

/// Numeric comparisons tolerate floating-point noise: two numbers are equal
/// when they differ by less than machine epsilon.
pub fn numbers_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < f64::EPSILON
}

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    List(Rc<RefCell<List>>),
    Callable(Callable),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(left), Value::Bool(right)) => left == right,
            (Value::Number(left), Value::Number(right)) => numbers_equal(*left, *right),
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::List(left), Value::List(right)) => *left.borrow() == *right.borrow(),
            (Value::Callable(left), Value::Callable(right)) => left == right,
            _ => false,
        }
    }
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        if let Value::Number(numeric_value) = self {
            Some(*numeric_value)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(string_ref) = self {
            Some(string_ref.as_ref())
        } else {
            None
        }
    }

    /// Truthiness: `nix` and `false` are falsy, a number is falsy when it is
    /// within epsilon of zero, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => !numbers_equal(*n, 0.0),
            _ => true,
        }
    }

    /// Display form. With `quote_strings` set, strings keep their double
    /// quotes. Elements inside a list are always quoted so the printed list
    /// reads back as written.
    pub fn stringify(&self, quote_strings: bool) -> String {
        match self {
            Value::Nil => "nix".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Str(s) => {
                if quote_strings {
                    format!("\"{}\"", s)
                } else {
                    s.to_string()
                }
            }
            Value::List(list) => {
                let elements: Vec<String> = list
                    .borrow()
                    .items
                    .iter()
                    .map(|element| element.stringify(true))
                    .collect();
                format!("[{}]", elements.join(", "))
            }
            Value::Callable(callable) => callable.info(),
        }
    }
}

/// The element category a homogeneous list is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemKind {
    Empty,
    Nil,
    Bool,
    Number,
    Str,
    List,
    Callable,
}

impl ElemKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Nil => ElemKind::Nil,
            Value::Bool(_) => ElemKind::Bool,
            Value::Number(_) => ElemKind::Number,
            Value::Str(_) => ElemKind::Str,
            Value::List(_) => ElemKind::List,
            Value::Callable(_) => ElemKind::Callable,
        }
    }
}

/// A list plus the element kind it was sealed with at construction.
/// Writes must keep every element in the same kind.
#[derive(Debug)]
pub struct List {
    pub items: Vec<Value>,
    pub kind: ElemKind,
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.items == other.items
    }
}

impl List {
    pub fn new(items: Vec<Value>) -> Result<Self, String> {
        let kind = match items.first() {
            None => ElemKind::Empty,
            Some(first) => ElemKind::of(first),
        };
        for item in &items {
            if ElemKind::of(item) != kind {
                return Err("Lists must be homogeneous, but found elements of different types.".to_string());
            }
        }
        Ok(Self { items, kind })
    }

    pub fn into_value(self) -> Value {
        Value::List(Rc::new(RefCell::new(self)))
    }
}

pub type NativeFnPtr = fn(&mut dyn Write, &[Value]) -> Result<Value, String>;

/// A host function exposed to scripts.
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFnPtr,
}

/// A user function or lambda. The captured environment is the one current at
/// the definition site, which is what makes closures work.
pub struct Function {
    pub name: Option<Rc<str>>,
    pub params: Vec<Token>,
    pub body: Rc<Vec<Stmt>>,
    pub closure: Environment,
}

#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFn>),
    Function(Rc<Function>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) => function.params.len(),
        }
    }

    pub fn info(&self) -> String {
        match self {
            Callable::Native(native) => format!("<native fn {}>", native.name),
            Callable::Function(function) => match &function.name {
                Some(name) => format!("<fn {}>", name),
                None => "<lambda>".to_string(),
            },
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(left), Callable::Native(right)) => Rc::ptr_eq(left, right),
            (Callable::Function(left), Callable::Function(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_within_epsilon() {
        assert_eq!(Value::Number(0.1 + 0.2), Value::Number(0.3));
        assert_ne!(Value::Number(1.0), Value::Number(1.1));
    }

    #[test]
    fn near_zero_numbers_are_falsy() {
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(f64::EPSILON / 2.0).is_truthy());
        assert!(Value::Number(0.5).is_truthy());
        assert!(Value::Number(-0.5).is_truthy());
    }

    #[test]
    fn heterogeneous_list_is_rejected() {
        let result = List::new(vec![Value::Number(1.0), Value::Str(Rc::from("two"))]);
        assert!(result.is_err());
    }

    #[test]
    fn nested_lists_are_homogeneous_by_variant() {
        let inner_a = List::new(vec![Value::Number(1.0)]).unwrap().into_value();
        let inner_b = List::new(vec![Value::Str(Rc::from("x"))]).unwrap().into_value();
        // Inner kinds differ but both elements are lists.
        assert!(List::new(vec![inner_a, inner_b]).is_ok());
    }

    #[test]
    fn stringify_quotes_strings_inside_lists() {
        let list = List::new(vec![Value::Str(Rc::from("a")), Value::Str(Rc::from("b"))])
            .unwrap()
            .into_value();
        assert_eq!(list.stringify(false), "[\"a\", \"b\"]");
        assert_eq!(Value::Str(Rc::from("a")).stringify(false), "a");
        assert_eq!(Value::Str(Rc::from("a")).stringify(true), "\"a\"");
    }
}
