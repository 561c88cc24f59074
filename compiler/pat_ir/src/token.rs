//! Token types produced by the lexer.

use crate::{Name, Span};
use std::fmt;

/// A token with its span in the source.
#[derive(Clone, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.kind, self.span)
    }
}

/// Token kinds for Pat.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TokenKind {
    // === Literals ===
    /// Integer literal: 42
    Int(i64),
    /// String literal (interned, escapes processed): "hello"
    Str(Name),

    // === Identifiers ===
    /// Lowercase identifier: variables and definition names.
    LowerIdent(Name),
    /// Uppercase identifier: interface names and message tags.
    UpperIdent(Name),

    // === Keywords ===
    Interface,
    Def,
    Let,
    In,
    New,
    Spawn,
    Guard,
    Receive,
    From,
    Free,
    If,
    Then,
    Else,
    True,
    False,

    // === Type keywords ===
    UnitType,
    IntType,
    StringType,
    BoolType,

    // === Symbols ===
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semi,
    Dot,
    Arrow,
    Bang,
    Query,

    // === Operators ===
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Short human-readable description for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Int(_) => "integer literal",
            TokenKind::Str(_) => "string literal",
            TokenKind::LowerIdent(_) => "identifier",
            TokenKind::UpperIdent(_) => "capitalized identifier",
            TokenKind::Interface => "`interface`",
            TokenKind::Def => "`def`",
            TokenKind::Let => "`let`",
            TokenKind::In => "`in`",
            TokenKind::New => "`new`",
            TokenKind::Spawn => "`spawn`",
            TokenKind::Guard => "`guard`",
            TokenKind::Receive => "`receive`",
            TokenKind::From => "`from`",
            TokenKind::Free => "`free`",
            TokenKind::If => "`if`",
            TokenKind::Then => "`then`",
            TokenKind::Else => "`else`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::UnitType => "`Unit`",
            TokenKind::IntType => "`Int`",
            TokenKind::StringType => "`String`",
            TokenKind::BoolType => "`Bool`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBrace => "`{`",
            TokenKind::RBrace => "`}`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Colon => "`:`",
            TokenKind::Semi => "`;`",
            TokenKind::Dot => "`.`",
            TokenKind::Arrow => "`->`",
            TokenKind::Bang => "`!`",
            TokenKind::Query => "`?`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Eq => "`=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::LtEq => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Eof => "end of input",
        }
    }
}
