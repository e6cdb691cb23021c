use std::cell::Cell;
use std::rc::Rc;

use crate::token::Token;
use crate::value::Value;

/// Expression nodes. Operator tokens are kept on the nodes so runtime errors
/// can point at the line the operator came from.
///
/// `distance` cells start out empty and are filled in by the resolver: the
/// number of environment hops between the use site and the scope that
/// declares the name. A name left unresolved is looked up dynamically.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Grouping(Box<Expr>),
    Variable {
        name: Token,
        distance: Cell<Option<usize>>,
    },
    Assign {
        name: Token,
        op: Token,
        value: Box<Expr>,
        distance: Cell<Option<usize>>,
    },
    Unary {
        op: Token,
        right: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        paren: Token,
    },
    Lambda {
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
    List {
        elements: Vec<Expr>,
        bracket: Token,
    },
    Index {
        list: Box<Expr>,
        index: Box<Expr>,
        bracket: Token,
    },
    IndexAssign {
        list: Box<Expr>,
        index: Box<Expr>,
        bracket: Token,
        value: Box<Expr>,
    },
    Range {
        first: Box<Expr>,
        step: Option<Box<Expr>>,
        end: Box<Expr>,
        op: Token,
    },
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// `for (x in iterable) body` - the iterable must evaluate to a list.
    RangedFor {
        var: Token,
        iterable: Expr,
        body: Box<Stmt>,
    },
    /// Function bodies are shared; each call borrows the same statements.
    Func {
        name: Token,
        params: Vec<Token>,
        body: Rc<Vec<Stmt>>,
    },
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Break(Token),
    Continue(Token),
}
