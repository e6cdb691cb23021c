use std::cell::Cell;
use std::rc::Rc;

use crate::ast::{Expr, Stmt};
use crate::diagnostic::Diagnostics;
use crate::token::{LiteralKind, Token, TokenKind};
use crate::value::Value;

/// Calls may not pass more than this many arguments. Exceeding it is
/// reported but does not abort the parse.
const MAX_CALL_ARGS: usize = 127;

/// Marker for a statement that could not be parsed. The diagnostic has
/// already been reported by the time this is constructed.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
}

/// Output of one parse. In REPL mode a source unit that is exactly one
/// expression (and not a bare call) lands in `trailing` for echoing.
pub struct ParsedProgram {
    pub statements: Vec<Stmt>,
    pub trailing: Option<Expr>,
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    /// `tokens` must be terminated by an `Eof` token, which the lexer
    /// guarantees.
    pub fn new(tokens: Vec<Token>, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics,
        }
    }

    pub fn parse(mut self, allow_bare_expression: bool) -> ParsedProgram {
        if allow_bare_expression {
            if let Some(expr) = self.try_bare_expression() {
                // A bare call is a statement; anything else is echoed.
                if matches!(expr, Expr::Call { .. }) {
                    return ParsedProgram {
                        statements: vec![Stmt::Expression(expr)],
                        trailing: None,
                    };
                }
                return ParsedProgram {
                    statements: Vec::new(),
                    trailing: Some(expr),
                };
            }
        }

        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        ParsedProgram {
            statements,
            trailing: None,
        }
    }

    /// Speculatively parses the whole input as a single expression. On any
    /// failure the cursor and diagnostics are rolled back so the statement
    /// path reports cleanly.
    fn try_bare_expression(&mut self) -> Option<Expr> {
        let checkpoint = self.diagnostics.checkpoint();
        let saved = self.current;
        match self.expression() {
            Ok(expr) if self.is_at_end() => Some(expr),
            _ => {
                self.current = saved;
                self.diagnostics.rollback(checkpoint);
                None
            }
        }
    }

    /// One statement, with error recovery: a broken statement produces one
    /// diagnostic and the parser skips to the next statement boundary.
    fn declaration(&mut self) -> Option<Stmt> {
        match self.statement() {
            Ok(statement) => Some(statement),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::LBrace => {
                self.advance();
                Ok(Stmt::Block(self.block()?))
            }
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            // `fn` opens a declaration only when a name follows; otherwise
            // it is a lambda expression.
            TokenKind::Fn if self.check_next(TokenKind::Identifier) => self.function_declaration(),
            TokenKind::Return => self.return_statement(),
            TokenKind::Break => {
                let keyword = self.advance();
                self.consume(TokenKind::Semicolon, "Expected a ';' after 'break'.")?;
                Ok(Stmt::Break(keyword))
            }
            TokenKind::Continue => {
                let keyword = self.advance();
                self.consume(TokenKind::Semicolon, "Expected a ';' after 'continue'.")?;
                Ok(Stmt::Continue(keyword))
            }
            _ => self.expression_statement(),
        }
    }

    /// Statements between an already-consumed `{` and its `}`.
    fn block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenKind::RBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.consume(TokenKind::LParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.consume(TokenKind::LParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// Both `for` forms. `for (x in e)` stays a dedicated node; the C-style
    /// header desugars to a `while` inside a block right here, so later
    /// stages only ever see the two loop shapes.
    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        self.consume(TokenKind::LParen, "Expected '(' after 'for'.")?;

        if self.check(TokenKind::Identifier) && self.check_next(TokenKind::In) {
            let var = self.advance();
            self.advance();
            let iterable = self.expression()?;
            self.consume(TokenKind::RParen, "Expected ')' after loop iterable.")?;
            let body = Box::new(self.statement()?);
            return Ok(Stmt::RangedFor { var, iterable, body });
        }

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            Expr::Literal(Value::Bool(true))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expected a ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let mut desugared = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }
        Ok(desugared)
    }

    fn function_declaration(&mut self) -> Result<Stmt, ParseError> {
        self.advance();
        let name = self.consume(TokenKind::Identifier, "Expected a function name.")?;
        self.consume(TokenKind::LParen, "Expected '(' after function name.")?;
        let params = self.parameters()?;
        self.consume(TokenKind::LBrace, "Expected '{' before function body.")?;
        let body = Rc::new(self.block()?);
        Ok(Stmt::Func { name, params, body })
    }

    fn parameters(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                params.push(self.consume(TokenKind::Identifier, "Expected a parameter name.")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expected ')' after parameters.")?;
        Ok(params)
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let keyword = self.advance();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected a ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expected a ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.assignment()
    }

    /// Assignment is right-associative. Compound forms desugar to a strict
    /// assignment of a binary expression, so `x += 1` is `` x `= x + 1 ``.
    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.range()?;

        if self.matches(&[
            TokenKind::Equal,
            TokenKind::BtEqual,
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::StarEqual,
            TokenKind::SlashEqual,
        ]) {
            let op = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable { name, .. } => {
                    return Ok(self.build_assignment(name, op, value));
                }
                Expr::Index { list, index, bracket } if op.kind == TokenKind::Equal => {
                    return Ok(Expr::IndexAssign {
                        list,
                        index,
                        bracket,
                        value: Box::new(value),
                    });
                }
                _ => {
                    // Report and keep going with what we had; this is not a
                    // statement-level failure.
                    self.diagnostics.error(op.line, "Invalid assignment target.");
                    return Ok(expr);
                }
            }
        }

        Ok(expr)
    }

    fn build_assignment(&self, name: Token, op: Token, value: Expr) -> Expr {
        let (op, value) = match op.kind {
            TokenKind::Equal | TokenKind::BtEqual => (op, value),
            _ => {
                let base_kind = match op.kind {
                    TokenKind::PlusEqual => TokenKind::Plus,
                    TokenKind::MinusEqual => TokenKind::Minus,
                    TokenKind::StarEqual => TokenKind::Star,
                    TokenKind::SlashEqual => TokenKind::Slash,
                    _ => unreachable!("assignment operator already matched"),
                };
                let base_lexeme = op.lexeme.trim_end_matches('=').to_string();
                let binary = Expr::Binary {
                    left: Box::new(Expr::Variable {
                        name: name.clone(),
                        distance: Cell::new(None),
                    }),
                    op: Token::synthetic(base_kind, base_lexeme, op.line),
                    right: Box::new(value),
                };
                (Token::synthetic(TokenKind::BtEqual, "`=", op.line), binary)
            }
        };
        Expr::Assign {
            name,
            op,
            value: Box::new(value),
            distance: Cell::new(None),
        }
    }

    /// `first..end` or `first..step..end`, binding looser than `or`.
    fn range(&mut self) -> Result<Expr, ParseError> {
        let first = self.or()?;
        if !self.matches(&[TokenKind::DotDot]) {
            return Ok(first);
        }
        let op = self.previous().clone();
        let second = self.or()?;
        if self.matches(&[TokenKind::DotDot]) {
            let end = self.or()?;
            return Ok(Expr::Range {
                first: Box::new(first),
                step: Some(Box::new(second)),
                end: Box::new(end),
                op,
            });
        }
        Ok(Expr::Range {
            first: Box::new(first),
            step: None,
            end: Box::new(second),
            op,
        })
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::EqualEqual, TokenKind::NotEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.addition()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.addition()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.product()?;
        while self.matches(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.product()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.matches(&[TokenKind::Not, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }
        self.exponent()
    }

    /// `^` binds tighter than unary minus and associates to the right.
    fn exponent(&mut self) -> Result<Expr, ParseError> {
        let base = self.call()?;
        if self.matches(&[TokenKind::Caret]) {
            let op = self.previous().clone();
            let right = self.exponent()?;
            return Ok(Expr::Binary {
                left: Box::new(base),
                op,
                right: Box::new(right),
            });
        }
        Ok(base)
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(&[TokenKind::LParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::LBracket]) {
                let bracket = self.previous().clone();
                let index = self.expression()?;
                self.consume(TokenKind::RBracket, "Expected ']' after index.")?;
                expr = Expr::Index {
                    list: Box::new(expr),
                    index: Box::new(index),
                    bracket,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if args.len() >= MAX_CALL_ARGS {
                    let line = self.peek().line;
                    self.diagnostics
                        .error(line, format!("Can't have more than {} arguments.", MAX_CALL_ARGS));
                }
                args.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RParen, "Expected ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            paren,
        })
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Nix => {
                self.advance();
                Ok(Expr::Literal(Value::Nil))
            }
            TokenKind::Number => {
                let token = self.advance();
                match token.lexeme.parse::<f64>() {
                    Ok(n) => Ok(Expr::Literal(Value::Number(n))),
                    Err(_) => Err(self.error_at(&token, "Invalid number literal.")),
                }
            }
            TokenKind::String => {
                let token = self.advance();
                debug_assert_eq!(token.literal, LiteralKind::Str);
                Ok(Expr::Literal(Value::Str(Rc::from(token.lexeme.as_str()))))
            }
            TokenKind::Identifier => {
                let name = self.advance();
                Ok(Expr::Variable {
                    name,
                    distance: Cell::new(None),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RParen, "Expected ')' after expression.")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }
            TokenKind::LBracket => {
                let bracket = self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.matches(&[TokenKind::Comma]) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RBracket, "Expected ']' after list elements.")?;
                Ok(Expr::List { elements, bracket })
            }
            TokenKind::Fn => {
                self.advance();
                self.consume(TokenKind::LParen, "Expected '(' after 'fn'.")?;
                let params = self.parameters()?;
                self.consume(TokenKind::LBrace, "Expected '{' before lambda body.")?;
                let body = Rc::new(self.block()?);
                Ok(Expr::Lambda { params, body })
            }
            _ => {
                let token = self.peek().clone();
                Err(self.error_at(&token, "Expected an expression."))
            }
        }
    }

    /// Skips tokens until a likely statement boundary: just past a `;`, or
    /// right before a keyword that starts a statement, or a closing brace.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fn
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn error_at(&mut self, token: &Token, message: &str) -> ParseError {
        self.diagnostics.error(token.line, message);
        ParseError {
            message: message.to_string(),
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek().clone();
        Err(self.error_at(&token, message))
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_next(&self, kind: TokenKind) -> bool {
        self.tokens
            .get(self.current + 1)
            .map(|token| token.kind == kind)
            .unwrap_or(false)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::scan_tokens;

    fn parse_source(source: &str) -> (ParsedProgram, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let program = Parser::new(tokens, &mut diagnostics).parse(false);
        (program, diagnostics)
    }

    fn parse_repl(source: &str) -> (ParsedProgram, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan_tokens(source, &mut diagnostics);
        let program = Parser::new(tokens, &mut diagnostics).parse(true);
        (program, diagnostics)
    }

    #[test]
    fn parses_statement_sequence() {
        let (program, diagnostics) = parse_source("x = 1; y = 2;");
        assert!(!diagnostics.had_error());
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn compound_assignment_desugars_to_strict() {
        let (program, diagnostics) = parse_source("x += 1;");
        assert!(!diagnostics.had_error());
        let Stmt::Expression(Expr::Assign { op, value, .. }) = &program.statements[0] else {
            panic!("expected an assignment statement");
        };
        assert_eq!(op.kind, TokenKind::BtEqual);
        assert!(matches!(**value, Expr::Binary { .. }));
    }

    #[test]
    fn c_style_for_desugars_to_while() {
        let (program, diagnostics) = parse_source("for (i = 0; i < 3; i += 1) { print(i); }");
        assert!(!diagnostics.had_error());
        let Stmt::Block(parts) = &program.statements[0] else {
            panic!("expected the desugared block");
        };
        assert!(matches!(parts[0], Stmt::Expression(_)));
        assert!(matches!(parts[1], Stmt::While { .. }));
    }

    #[test]
    fn ranged_for_keeps_its_own_node() {
        let (program, diagnostics) = parse_source("for (x in 1..3) { print(x); }");
        assert!(!diagnostics.had_error());
        assert!(matches!(program.statements[0], Stmt::RangedFor { .. }));
    }

    #[test]
    fn exponent_is_right_associative() {
        let (program, _) = parse_source("a = 2^3^2;");
        let Stmt::Expression(Expr::Assign { value, .. }) = &program.statements[0] else {
            panic!("expected an assignment");
        };
        let Expr::Binary { right, .. } = &**value else {
            panic!("expected a binary expression");
        };
        assert!(matches!(**right, Expr::Binary { .. }));
    }

    #[test]
    fn invalid_assignment_target_is_reported_without_aborting() {
        let (program, diagnostics) = parse_source("1 + 2 = 3; x = 4;");
        assert!(diagnostics.had_error());
        assert_eq!(
            diagnostics.entries()[0].render(false),
            "[ERROR | Line 1]: Invalid assignment target."
        );
        // The second statement still parsed.
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn recovery_reports_each_broken_statement_once() {
        let (_, diagnostics) = parse_source("x = ;\ny = ;\n");
        assert_eq!(diagnostics.entries().len(), 2);
    }

    #[test]
    fn bare_expression_becomes_trailing() {
        let (program, diagnostics) = parse_repl("1 + 2");
        assert!(!diagnostics.had_error());
        assert!(program.statements.is_empty());
        assert!(program.trailing.is_some());
    }

    #[test]
    fn bare_call_is_a_statement_not_an_echo() {
        let (program, diagnostics) = parse_repl("print(\"hi\")");
        assert!(!diagnostics.had_error());
        assert!(program.trailing.is_none());
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn failed_bare_expression_leaves_no_stray_diagnostics() {
        let (program, diagnostics) = parse_repl("x = 1;");
        assert!(!diagnostics.had_error());
        assert!(program.trailing.is_none());
        assert_eq!(program.statements.len(), 1);
    }
}
