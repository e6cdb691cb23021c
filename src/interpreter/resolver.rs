use indexmap::IndexMap;

use crate::ast::{Expr, Stmt};
use crate::diagnostic::Diagnostics;
use crate::token::{Token, TokenKind};

struct VarInfo {
    line: usize,
    read: bool,
}

/// Static pass between parsing and execution. Fills in the scope distance on
/// every local variable use so the interpreter can jump straight to the
/// right scope, and reports misplaced `return`/`break`/`continue`, unused
/// locals and code after `return`.
///
/// Global-scope names are deliberately left unresolved; they fall back to
/// dynamic lookup so REPL entries can see bindings made after a function was
/// defined.
pub struct Resolver<'a> {
    scopes: Vec<IndexMap<String, VarInfo>>,
    in_function: bool,
    loop_depth: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            scopes: Vec::new(),
            in_function: false,
            loop_depth: 0,
            diagnostics,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt], trailing: Option<&Expr>) {
        for statement in statements {
            self.resolve_statement(statement);
        }
        if let Some(expr) = trailing {
            self.resolve_expression(expr);
        }
    }

    fn resolve_statement(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Expression(expr) => self.resolve_expression(expr),
            Stmt::Block(statements) => {
                self.begin_scope();
                for statement in statements {
                    self.resolve_statement(statement);
                }
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expression(condition);
                self.resolve_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_statement(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expression(condition);
                self.loop_depth += 1;
                self.resolve_statement(body);
                self.loop_depth -= 1;
            }
            Stmt::RangedFor { var, iterable, body } => {
                self.resolve_expression(iterable);
                self.begin_scope();
                self.define(var);
                self.loop_depth += 1;
                self.resolve_statement(body);
                self.loop_depth -= 1;
                self.end_scope();
            }
            Stmt::Func { name, params, body } => {
                self.define(name);
                self.mark_read(&name.lexeme);
                self.resolve_function(params, body);
            }
            Stmt::Return { keyword, value } => {
                if !self.in_function {
                    self.diagnostics.error(
                        keyword.line,
                        "'return' statements can only be used in a function's body.",
                    );
                }
                if let Some(value) = value {
                    self.resolve_expression(value);
                }
            }
            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    self.diagnostics
                        .error(keyword.line, "'break' statements can only be used inside a loop.");
                }
            }
            Stmt::Continue(keyword) => {
                if self.loop_depth == 0 {
                    self.diagnostics.error(
                        keyword.line,
                        "'continue' statements can only be used inside a loop.",
                    );
                }
            }
        }
    }

    fn resolve_expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Grouping(inner) => self.resolve_expression(inner),
            Expr::Variable { name, distance } => {
                self.resolve_local(name, distance, true);
            }
            Expr::Assign {
                name,
                op,
                value,
                distance,
            } => {
                self.resolve_expression(value);
                if op.kind == TokenKind::Equal && !self.in_current_scope(&name.lexeme) {
                    // Plain `=` on a name this scope does not know yet:
                    // a definition, possibly shadowing an outer binding.
                    self.define(name);
                }
                self.resolve_local(name, distance, false);
            }
            Expr::Unary { right, .. } => self.resolve_expression(right),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expression(left);
                self.resolve_expression(right);
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expression(callee);
                for arg in args {
                    self.resolve_expression(arg);
                }
            }
            Expr::Lambda { params, body } => self.resolve_function(params, body),
            Expr::List { elements, .. } => {
                for element in elements {
                    self.resolve_expression(element);
                }
            }
            Expr::Index { list, index, .. } => {
                self.resolve_expression(index);
                self.resolve_expression(list);
            }
            Expr::IndexAssign { list, index, value, .. } => {
                self.resolve_expression(list);
                self.resolve_expression(index);
                self.resolve_expression(value);
            }
            Expr::Range { first, step, end, .. } => {
                self.resolve_expression(first);
                if let Some(step) = step {
                    self.resolve_expression(step);
                }
                self.resolve_expression(end);
            }
        }
    }

    fn resolve_function(&mut self, params: &[Token], body: &[Stmt]) {
        let was_in_function = self.in_function;
        let outer_loop_depth = self.loop_depth;
        self.in_function = true;
        // A loop outside the function does not license break/continue inside.
        self.loop_depth = 0;

        self.begin_scope();
        for param in params {
            self.define(param);
        }
        let mut return_line = None;
        for statement in body {
            if let Some(line) = return_line.take() {
                self.diagnostics
                    .warning(line, "Redundant code after 'return' statement.");
            }
            self.resolve_statement(statement);
            if let Stmt::Return { keyword, .. } = statement {
                return_line = Some(keyword.line);
            }
        }
        self.end_scope();

        self.in_function = was_in_function;
        self.loop_depth = outer_loop_depth;
    }

    /// Records how many scopes up the name lives. Names not found in any
    /// open scope stay unresolved (global or undefined until runtime).
    fn resolve_local(&mut self, name: &Token, distance: &std::cell::Cell<Option<usize>>, is_read: bool) {
        for (hops, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(info) = scope.get_mut(&name.lexeme) {
                if is_read {
                    info.read = true;
                }
                distance.set(Some(hops));
                return;
            }
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.lexeme.clone(),
                VarInfo {
                    line: name.line,
                    read: false,
                },
            );
        }
    }

    fn mark_read(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(info) = scope.get_mut(name) {
                info.read = true;
            }
        }
    }

    fn in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.contains_key(name))
            .unwrap_or(false)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for (name, info) in scope {
                if !info.read {
                    self.diagnostics
                        .warning(info.line, format!("Unused local variable '{}'.", name));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::parser::Parser;
    use crate::lexer::scan_tokens;

    fn resolve_source(source: &str) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let program = Parser::new(tokens, &mut diagnostics).parse(false);
        assert!(!diagnostics.had_error(), "{}", diagnostics.render_all(false));
        Resolver::new(&mut diagnostics).resolve(&program.statements, program.trailing.as_ref());
        diagnostics
    }

    #[test]
    fn warns_about_unused_local() {
        let diagnostics = resolve_source("{ x = 1; }");
        assert_eq!(
            diagnostics.entries()[0].render(false),
            "[WARNING | Line 1]: Unused local variable 'x'."
        );
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn read_local_is_not_flagged() {
        let diagnostics = resolve_source("{ x = 1; print(x); }");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn warns_about_code_after_return() {
        let diagnostics = resolve_source("fn f() { return 1; print(2); }");
        assert_eq!(
            diagnostics.entries()[0].render(false),
            "[WARNING | Line 1]: Redundant code after 'return' statement."
        );
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let diagnostics = resolve_source("return 1;");
        assert!(diagnostics.had_error());
        assert_eq!(
            diagnostics.entries()[0].render(false),
            "[ERROR | Line 1]: 'return' statements can only be used in a function's body."
        );
    }

    #[test]
    fn break_outside_loop_is_an_error() {
        let diagnostics = resolve_source("break;");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn break_inside_function_inside_loop_is_still_an_error() {
        let diagnostics = resolve_source("while (true) { fn f() { break; } f(); }");
        assert!(diagnostics.had_error());
    }

    #[test]
    fn continue_inside_loop_is_fine() {
        let diagnostics = resolve_source("while (false) { continue; }");
        assert!(diagnostics.is_empty());
    }
}
