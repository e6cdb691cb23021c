use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::token::{keyword_kind, LiteralKind, Token, TokenKind};

/// Scans a whole source unit in one pass. Lexical errors are reported and
/// scanning continues with the next character, so one bad character does not
/// hide later diagnostics.
pub fn scan_tokens(source: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        start: 0,
        current: 0,
        line: 1,
        tokens: Vec::new(),
        diagnostics,
    };
    lexer.scan();
    lexer.tokens
}

struct Lexer<'a> {
    chars: Vec<char>,
    start: usize,
    current: usize,
    line: usize,
    tokens: Vec<Token>,
    diagnostics: &'a mut Diagnostics,
}

impl Lexer<'_> {
    fn scan(&mut self) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", self.line, LiteralKind::None));
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LParen),
            ')' => self.add_token(TokenKind::RParen),
            '{' => self.add_token(TokenKind::LBrace),
            '}' => self.add_token(TokenKind::RBrace),
            '[' => self.add_token(TokenKind::LBracket),
            ']' => self.add_token(TokenKind::RBracket),
            ',' => self.add_token(TokenKind::Comma),
            ';' => self.add_token(TokenKind::Semicolon),
            '^' => self.add_token(TokenKind::Caret),
            '+' => {
                let kind = if self.matches('=') { TokenKind::PlusEqual } else { TokenKind::Plus };
                self.add_token(kind);
            }
            '-' => {
                let kind = if self.matches('=') { TokenKind::MinusEqual } else { TokenKind::Minus };
                self.add_token(kind);
            }
            '*' => {
                let kind = if self.matches('=') { TokenKind::StarEqual } else { TokenKind::Star };
                self.add_token(kind);
            }
            '!' => {
                let kind = if self.matches('=') { TokenKind::NotEqual } else { TokenKind::Not };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.matches('=') { TokenKind::EqualEqual } else { TokenKind::Equal };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.matches('=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.matches('=') { TokenKind::LessEqual } else { TokenKind::Less };
                self.add_token(kind);
            }
            '`' => {
                if self.matches('=') {
                    self.add_token(TokenKind::BtEqual);
                } else {
                    self.unexpected_character(c);
                }
            }
            '.' => {
                if self.matches('.') {
                    self.add_token(TokenKind::DotDot);
                } else if self.peek().is_ascii_digit() {
                    self.number();
                } else {
                    self.add_token(TokenKind::Dot);
                }
            }
            '/' => {
                if self.matches('/') {
                    self.line_comment();
                } else if self.matches('[') {
                    self.block_comment();
                } else if self.matches('=') {
                    self.add_token(TokenKind::SlashEqual);
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            '"' => self.string(),
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            _ => {
                if c.is_ascii_digit() {
                    self.number();
                } else if c.is_alphabetic() || c == '_' {
                    self.identifier();
                } else {
                    self.unexpected_character(c);
                }
            }
        }
    }

    fn line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    /// `/[ ... ]/` block comment. Stops at the first `]/`; an unterminated
    /// comment silently swallows the rest of the source.
    fn block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == ']' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
    }

    /// Strings run to the closing quote with no escape sequences; newlines
    /// inside the literal are kept and counted.
    fn string(&mut self) {
        while !self.is_at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            self.diagnostics
                .error(self.line, "Unterminated String. Expected a \".");
            return;
        }
        self.advance();
        let text: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        self.tokens
            .push(Token::new(TokenKind::String, text, self.line, LiteralKind::Str));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        // A fractional part needs a digit after the dot, otherwise the dot
        // belongs to a following token such as `..`.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.add_literal(TokenKind::Number, LiteralKind::Num);
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let text: String = self.chars[self.start..self.current].iter().collect();
        match keyword_kind(&text) {
            Some((kind, literal)) => self.tokens.push(Token::new(kind, text, self.line, literal)),
            None => self
                .tokens
                .push(Token::new(TokenKind::Identifier, text, self.line, LiteralKind::None)),
        }
    }

    fn unexpected_character(&mut self, c: char) {
        self.diagnostics.report(
            Diagnostic::error(self.line, "Unexpected character: ").with_snippet(c.to_string()),
        );
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal(kind, LiteralKind::None);
    }

    fn add_literal(&mut self, kind: TokenKind, literal: LiteralKind) {
        let lexeme: String = self.chars[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(kind, lexeme, self.line, literal));
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            return false;
        }
        self.current += 1;
        true
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }
}
