use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::ast::{Expr, Stmt};
use crate::diagnostic::Diagnostics;
use crate::token::{Token, TokenKind};
use crate::value::{numbers_equal, Callable, ElemKind, Function, List, Value};

use super::builtins;
use super::control_flow::ControlFlow;
use super::environment::Environment;
use super::error::RuntimeError;

pub struct Interpreter {
    env: Environment,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Program output goes through `output`, which lets tests capture what
    /// `print`/`println` wrote.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Environment::global();
        builtins::install(&globals);
        Self { env: globals, output }
    }

    /// Runs a statement sequence. The first runtime error is reported and
    /// stops execution of the remaining statements.
    pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics) {
        for statement in statements {
            match self.execute_statement(statement) {
                // Stray return/break/continue are rejected by the resolver.
                Ok(_) => {}
                Err(error) => {
                    diagnostics.report(error.to_diagnostic());
                    return;
                }
            }
        }
    }

    /// Evaluates a single expression and returns its display form with
    /// strings quoted, the way the REPL echoes results.
    pub fn interpret_expression(&mut self, expr: &Expr, diagnostics: &mut Diagnostics) -> Option<String> {
        match self.evaluate(expr) {
            Ok(value) => Some(value.stringify(true)),
            Err(error) => {
                diagnostics.report(error.to_diagnostic());
                None
            }
        }
    }

    fn execute_statement(&mut self, statement: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ControlFlow::Normal)
            }
            Stmt::Block(statements) => {
                let scope = self.env.child();
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(ControlFlow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute_statement(body)? {
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        ControlFlow::Break => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::RangedFor { var, iterable, body } => {
                let iterable = self.evaluate(iterable)?;
                let Value::List(list) = iterable else {
                    return Err(RuntimeError::new(var, "Can only iterate over a list."));
                };
                // Snapshot so the body can mutate the list it iterates.
                let items = list.borrow().items.clone();
                for item in items {
                    let scope = self.env.child();
                    scope.define(var.lexeme.clone(), item);
                    match self.execute_block(std::slice::from_ref(body.as_ref()), scope)? {
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        ControlFlow::Break => break,
                        ControlFlow::Return(value) => return Ok(ControlFlow::Return(value)),
                    }
                }
                Ok(ControlFlow::Normal)
            }
            Stmt::Func { name, params, body } => {
                let function = Function {
                    name: Some(Rc::from(name.lexeme.as_str())),
                    params: params.clone(),
                    body: Rc::clone(body),
                    // Capturing the defining environment (which will hold
                    // the function's own binding) makes recursion work.
                    closure: self.env.clone(),
                };
                self.env.define(
                    name.lexeme.clone(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(ControlFlow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(ControlFlow::Return(value))
            }
            Stmt::Break(_) => Ok(ControlFlow::Break),
            Stmt::Continue(_) => Ok(ControlFlow::Continue),
        }
    }

    /// Runs statements in `scope`, restoring the previous environment even
    /// when the body fails part-way.
    fn execute_block(&mut self, statements: &[Stmt], scope: Environment) -> Result<ControlFlow, RuntimeError> {
        let previous = std::mem::replace(&mut self.env, scope);
        let result = self.execute_statements(statements);
        self.env = previous;
        result
    }

    fn execute_statements(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for statement in statements {
            match self.execute_statement(statement)? {
                ControlFlow::Normal => {}
                interrupt => return Ok(interrupt),
            }
        }
        Ok(ControlFlow::Normal)
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable { name, distance } => self.look_up_variable(name, distance),
            Expr::Assign {
                name,
                op,
                value,
                distance,
            } => {
                let value = self.evaluate(value)?;
                self.assign_variable(name, op, distance, value.clone())?;
                Ok(value)
            }
            Expr::Unary { op, right } => {
                let right = self.evaluate(right)?;
                match op.kind {
                    TokenKind::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(op, "Operand must be a number.")),
                    },
                    TokenKind::Not => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("unary operator {:?}", op.kind),
                }
            }
            Expr::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.binary_op(left, op, right)
            }
            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                match op.kind {
                    TokenKind::Or if left.is_truthy() => Ok(Value::Bool(true)),
                    TokenKind::And if !left.is_truthy() => Ok(Value::Bool(false)),
                    _ => Ok(Value::Bool(self.evaluate(right)?.is_truthy())),
                }
            }
            Expr::Call { callee, args, paren } => {
                let callee = self.evaluate(callee)?;
                let mut arguments = Vec::with_capacity(args.len());
                for arg in args {
                    arguments.push(self.evaluate(arg)?);
                }
                let Value::Callable(callable) = callee else {
                    return Err(RuntimeError::new(paren, "Provided object is not callable."));
                };
                self.call(callable, arguments, paren)
            }
            Expr::Lambda { params, body } => {
                let function = Function {
                    name: None,
                    params: params.clone(),
                    body: Rc::clone(body),
                    closure: self.env.clone(),
                };
                Ok(Value::Callable(Callable::Function(Rc::new(function))))
            }
            Expr::List { elements, bracket } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                List::new(items)
                    .map(List::into_value)
                    .map_err(|message| RuntimeError::new(bracket, message))
            }
            Expr::Index { list, index, bracket } => {
                let target = self.evaluate(list)?;
                let index = self.evaluate(index)?;
                self.index_value(target, index, bracket)
            }
            Expr::IndexAssign {
                list,
                index,
                bracket,
                value,
            } => {
                let target = self.evaluate(list)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                self.index_assign(target, index, value, bracket)
            }
            Expr::Range { first, step, end, op } => {
                let first = self.range_bound(first, op)?;
                let step = match step {
                    Some(step) => self.range_bound(step, op)?,
                    None => 1.0,
                };
                let end = self.range_bound(end, op)?;
                if numbers_equal(step, 0.0) {
                    return Err(RuntimeError::new(op, "Range step cannot be 0."));
                }
                let mut items = Vec::new();
                let mut current = first;
                if step > 0.0 {
                    while current <= end {
                        items.push(Value::Number(current));
                        current += step;
                    }
                } else {
                    while current >= end {
                        items.push(Value::Number(current));
                        current += step;
                    }
                }
                List::new(items)
                    .map(List::into_value)
                    .map_err(|message| RuntimeError::new(op, message))
            }
        }
    }

    fn look_up_variable(&self, name: &Token, distance: &Cell<Option<usize>>) -> Result<Value, RuntimeError> {
        let value = match distance.get() {
            Some(hops) => self.env.get_at(hops, &name.lexeme),
            None => self.env.get(&name.lexeme),
        };
        value.ok_or_else(|| RuntimeError::new(name, format!("Undefined variable '{}'.", name.lexeme)))
    }

    fn assign_variable(
        &mut self,
        name: &Token,
        op: &Token,
        distance: &Cell<Option<usize>>,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match op.kind {
            TokenKind::Equal => {
                match distance.get() {
                    Some(hops) => self.env.assign_at(hops, &name.lexeme, value),
                    None => self.env.assign(&name.lexeme, value),
                }
                Ok(())
            }
            TokenKind::BtEqual => {
                let updated = match distance.get() {
                    Some(hops) => self.env.strict_assign_at(hops, &name.lexeme, value),
                    None => self.env.strict_assign(&name.lexeme, value),
                };
                if updated {
                    Ok(())
                } else {
                    Err(RuntimeError::new(
                        name,
                        format!("Undefined variable '{}'.", name.lexeme),
                    ))
                }
            }
            _ => unreachable!("assignment operator {:?}", op.kind),
        }
    }

    fn call(&mut self, callable: Callable, args: Vec<Value>, paren: &Token) -> Result<Value, RuntimeError> {
        if args.len() != callable.arity() {
            return Err(RuntimeError::new(
                paren,
                format!(
                    "Expected {} arguments but got {} arguments.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }
        match callable {
            Callable::Native(native) => {
                (native.func)(self.output.as_mut(), &args).map_err(|message| RuntimeError::new(paren, message))
            }
            Callable::Function(function) => {
                let scope = function.closure.child();
                for (param, arg) in function.params.iter().zip(args) {
                    scope.define(param.lexeme.clone(), arg);
                }
                match self.execute_block(&function.body, scope)? {
                    ControlFlow::Return(value) => Ok(value),
                    _ => Ok(Value::Nil),
                }
            }
        }
    }

    fn binary_op(&mut self, left: Value, op: &Token, right: Value) -> Result<Value, RuntimeError> {
        match op.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{}{}", a, b).as_str()))),
                _ => Err(RuntimeError::new(
                    op,
                    "Both of the operands must be numbers or strings.",
                )),
            },
            TokenKind::Minus => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Number(a - b))
            }
            TokenKind::Star => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Number(a * b))
            }
            TokenKind::Slash => {
                let (a, b) = self.number_operands(left, op, right)?;
                if numbers_equal(b, 0.0) {
                    return Err(RuntimeError::new(op, "Cannot divide by 0!"));
                }
                Ok(Value::Number(a / b))
            }
            TokenKind::Caret => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Number(a.powf(b)))
            }
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::NotEqual => Ok(Value::Bool(left != right)),
            TokenKind::Greater => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Bool(!numbers_equal(a, b) && a > b))
            }
            TokenKind::GreaterEqual => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Bool(numbers_equal(a, b) || a > b))
            }
            TokenKind::Less => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Bool(!numbers_equal(a, b) && a < b))
            }
            TokenKind::LessEqual => {
                let (a, b) = self.number_operands(left, op, right)?;
                Ok(Value::Bool(numbers_equal(a, b) || a < b))
            }
            _ => unreachable!("binary operator {:?}", op.kind),
        }
    }

    fn number_operands(&self, left: Value, op: &Token, right: Value) -> Result<(f64, f64), RuntimeError> {
        match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            _ => Err(RuntimeError::new(op, "Operands must be numbers.")),
        }
    }

    fn range_bound(&mut self, expr: &Expr, op: &Token) -> Result<f64, RuntimeError> {
        match self.evaluate(expr)? {
            Value::Number(n) => Ok(n),
            _ => Err(RuntimeError::new(op, "Range bounds must be numbers.")),
        }
    }

    /// 1-based indexing; a fractional index rounds to the nearest position.
    /// Indexing with a list of numbers gathers a new list.
    fn index_value(&mut self, target: Value, index: Value, bracket: &Token) -> Result<Value, RuntimeError> {
        let Value::List(list) = target else {
            return Err(RuntimeError::new(bracket, "Only lists can be indexed."));
        };
        let list = list.borrow();
        match index {
            Value::Number(n) => {
                let offset = self.index_to_offset(n, list.items.len(), bracket)?;
                Ok(list.items[offset].clone())
            }
            Value::List(indices) => {
                let indices = indices.borrow();
                if indices.items.is_empty() {
                    return Err(RuntimeError::new(bracket, "Cannot index with an empty list."));
                }
                if indices.kind != ElemKind::Number {
                    return Err(RuntimeError::new(bracket, "List indices must be numbers."));
                }
                let mut gathered = Vec::with_capacity(indices.items.len());
                for index in &indices.items {
                    let n = index.as_number().unwrap_or_default();
                    let offset = self.index_to_offset(n, list.items.len(), bracket)?;
                    gathered.push(list.items[offset].clone());
                }
                List::new(gathered)
                    .map(List::into_value)
                    .map_err(|message| RuntimeError::new(bracket, message))
            }
            _ => Err(RuntimeError::new(
                bracket,
                "List index must be a number or a list of numbers.",
            )),
        }
    }

    fn index_assign(
        &mut self,
        target: Value,
        index: Value,
        value: Value,
        bracket: &Token,
    ) -> Result<Value, RuntimeError> {
        let Value::List(list) = target else {
            return Err(RuntimeError::new(bracket, "Only lists can be indexed."));
        };
        let Value::Number(n) = index else {
            return Err(RuntimeError::new(bracket, "List index must be a number."));
        };
        let mut list = list.borrow_mut();
        let offset = self.index_to_offset(n, list.items.len(), bracket)?;
        if ElemKind::of(&value) != list.kind {
            return Err(RuntimeError::new(
                bracket,
                "Lists must be homogeneous, but found elements of different types.",
            ));
        }
        list.items[offset] = value.clone();
        Ok(value)
    }

    fn index_to_offset(&self, index: f64, length: usize, bracket: &Token) -> Result<usize, RuntimeError> {
        let rounded = index.round();
        if rounded < 1.0 || rounded > length as f64 {
            return Err(RuntimeError::new(
                bracket,
                format!("List index {} is out of range [1, {}].", rounded, length),
            ));
        }
        Ok(rounded as usize - 1)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
