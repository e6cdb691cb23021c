/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    DotDot,
    Semicolon,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    // Assignment operators
    Equal,
    /// `` `= `` - strict assignment, never defines a new binding
    BtEqual,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,

    // Comparison operators
    EqualEqual,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Not,

    // Literals and identifiers
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Or,
    If,
    Else,
    True,
    False,
    Nix,
    Fn,
    For,
    In,
    While,
    Return,
    Break,
    Continue,
    Class,
    This,

    Eof,
}

/// Literal subtype carried alongside the kind so the parser can build a
/// runtime value without re-inspecting the lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    None,
    Str,
    Num,
    Nix,
    True,
    False,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub literal: LiteralKind,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, literal: LiteralKind) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            literal,
        }
    }

    /// A token fabricated by the parser while desugaring. It carries the line
    /// of the construct it was derived from so diagnostics stay anchored.
    pub fn synthetic(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Self::new(kind, lexeme, line, LiteralKind::None)
    }
}

/// Maps keyword text to its token kind and literal subtype. Returns `None`
/// for plain identifiers.
pub fn keyword_kind(text: &str) -> Option<(TokenKind, LiteralKind)> {
    let kind = match text {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "true" => return Some((TokenKind::True, LiteralKind::True)),
        "false" => return Some((TokenKind::False, LiteralKind::False)),
        "nix" => return Some((TokenKind::Nix, LiteralKind::Nix)),
        "fn" => TokenKind::Fn,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "while" => TokenKind::While,
        "return" => TokenKind::Return,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "class" => TokenKind::Class,
        "this" => TokenKind::This,
        _ => return None,
    };
    Some((kind, LiteralKind::None))
}
