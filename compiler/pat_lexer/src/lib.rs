//! Lexer for Pat using logos with string interning.
//!
//! Whitespace and `#` line comments are skipped. Identifiers are split
//! lexically by case: lowercase names bind variables and definitions,
//! capitalized names are interfaces and message tags. The first invalid
//! token aborts lexing - the pipeline does not attempt recovery.

use logos::Logos;
use pat_diagnostic::{Diagnostic, DiagnosticKind};
use pat_ir::{Span, StringInterner, Token, TokenKind};

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
enum RawToken {
    // === Keywords ===
    #[token("interface")]
    Interface,
    #[token("def")]
    Def,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("new")]
    New,
    #[token("spawn")]
    Spawn,
    #[token("guard")]
    Guard,
    #[token("receive")]
    Receive,
    #[token("from")]
    From,
    #[token("free")]
    Free,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // === Type keywords ===
    #[token("Unit")]
    UnitType,
    #[token("Int")]
    IntType,
    #[token("String")]
    StringType,
    #[token("Bool")]
    BoolType,

    // === Symbols ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("?")]
    Query,

    // === Operators ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("!")]
    Bang,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,

    // === Literals ===
    #[regex(r"[0-9][0-9_]*", |lex| {
        lex.slice().replace('_', "").parse::<i64>().ok()
    })]
    Int(i64),

    // String literal (double-quoted)
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    // === Identifiers ===
    #[regex(r"[a-z_][a-zA-Z0-9_]*")]
    LowerIdent,
    #[regex(r"[A-Z][a-zA-Z0-9_]*")]
    UpperIdent,
}

/// Lex the whole source, interning identifiers and string contents.
///
/// Returns the token list terminated by `Eof`, or a `Parse` diagnostic at the
/// first invalid token.
pub fn lex(source: &str, interner: &StringInterner) -> Result<Vec<Token>, Diagnostic> {
    let mut tokens = Vec::new();
    let mut logos = RawToken::lexer(source);

    while let Some(result) = logos.next() {
        let span = Span::from_range(logos.span());
        let slice = logos.slice();

        match result {
            Ok(raw) => {
                let kind = convert_token(raw, slice, interner);
                tokens.push(Token::new(kind, span));
            }
            Err(()) => {
                return Err(Diagnostic::error(
                    DiagnosticKind::Parse,
                    format!("unrecognized token `{slice}`"),
                    span,
                ));
            }
        }
    }

    let eof = Span::point(source.len() as u32);
    tokens.push(Token::new(TokenKind::Eof, eof));
    Ok(tokens)
}

fn convert_token(raw: RawToken, slice: &str, interner: &StringInterner) -> TokenKind {
    match raw {
        RawToken::Int(n) => TokenKind::Int(n),
        RawToken::Str => {
            // Remove quotes and process escapes
            let content = &slice[1..slice.len() - 1];
            TokenKind::Str(interner.intern(&unescape_string(content)))
        }
        RawToken::LowerIdent => TokenKind::LowerIdent(interner.intern(slice)),
        RawToken::UpperIdent => TokenKind::UpperIdent(interner.intern(slice)),

        RawToken::Interface => TokenKind::Interface,
        RawToken::Def => TokenKind::Def,
        RawToken::Let => TokenKind::Let,
        RawToken::In => TokenKind::In,
        RawToken::New => TokenKind::New,
        RawToken::Spawn => TokenKind::Spawn,
        RawToken::Guard => TokenKind::Guard,
        RawToken::Receive => TokenKind::Receive,
        RawToken::From => TokenKind::From,
        RawToken::Free => TokenKind::Free,
        RawToken::If => TokenKind::If,
        RawToken::Then => TokenKind::Then,
        RawToken::Else => TokenKind::Else,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,

        RawToken::UnitType => TokenKind::UnitType,
        RawToken::IntType => TokenKind::IntType,
        RawToken::StringType => TokenKind::StringType,
        RawToken::BoolType => TokenKind::BoolType,

        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Semi => TokenKind::Semi,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::Query => TokenKind::Query,

        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::Eq => TokenKind::Eq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Bang => TokenKind::Bang,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Gt => TokenKind::Gt,
    }
}

/// Process string escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some(c) => {
                    // Unknown escape - keep as-is
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = StringInterner::new();
        match lex(source, &interner) {
            Ok(tokens) => tokens.into_iter().map(|t| t.kind).collect(),
            Err(diag) => panic!("lex failed: {}", diag.message),
        }
    }

    #[test]
    fn lex_let_binding() {
        let interner = StringInterner::new();
        let tokens = match lex("let x = 42 in x", &interner) {
            Ok(tokens) => tokens,
            Err(diag) => panic!("lex failed: {}", diag.message),
        };

        assert_eq!(tokens.len(), 7); // let x = 42 in x EOF
        assert!(matches!(tokens[0].kind, TokenKind::Let));
        assert!(matches!(tokens[1].kind, TokenKind::LowerIdent(_)));
        assert!(matches!(tokens[2].kind, TokenKind::Eq));
        assert!(matches!(tokens[3].kind, TokenKind::Int(42)));
        assert!(matches!(tokens[4].kind, TokenKind::In));
        assert!(matches!(tokens[6].kind, TokenKind::Eof));
    }

    #[test]
    fn lex_interface_decl() {
        let toks = kinds("interface IdServer { Get(IdClient!) }");
        assert!(matches!(toks[0], TokenKind::Interface));
        assert!(matches!(toks[1], TokenKind::UpperIdent(_)));
        assert!(matches!(toks[2], TokenKind::LBrace));
        assert!(matches!(toks[3], TokenKind::UpperIdent(_)));
        assert!(matches!(toks[4], TokenKind::LParen));
        assert!(matches!(toks[5], TokenKind::UpperIdent(_)));
        assert!(matches!(toks[6], TokenKind::Bang));
    }

    #[test]
    fn lex_string_escapes() {
        let interner = StringInterner::new();
        let tokens = match lex(r#""hello\nworld""#, &interner) {
            Ok(tokens) => tokens,
            Err(diag) => panic!("lex failed: {}", diag.message),
        };
        let TokenKind::Str(name) = tokens[0].kind else {
            panic!("expected string token, got {:?}", tokens[0].kind);
        };
        assert_eq!(interner.lookup(name), "hello\nworld");
    }

    #[test]
    fn lex_send_vs_not_equal() {
        let toks = kinds("a ! B != c");
        assert!(matches!(toks[1], TokenKind::Bang));
        assert!(matches!(toks[3], TokenKind::NotEq));
    }

    #[test]
    fn lex_capability_types() {
        let toks = kinds("self: Greeter? server: Greeter!");
        assert!(matches!(toks[2], TokenKind::UpperIdent(_)));
        assert!(matches!(toks[3], TokenKind::Query));
        assert!(matches!(toks[7], TokenKind::Bang));
    }

    #[test]
    fn lex_comments_skipped() {
        let toks = kinds("# a comment\nlet x = 1 # trailing\n");
        assert!(matches!(toks[0], TokenKind::Let));
        assert_eq!(toks.len(), 5); // let x = 1 EOF
    }

    #[test]
    fn lex_keyword_prefix_is_ident() {
        let interner = StringInterner::new();
        let tokens = match lex("freedom interfaces", &interner) {
            Ok(tokens) => tokens,
            Err(diag) => panic!("lex failed: {}", diag.message),
        };
        let TokenKind::LowerIdent(a) = tokens[0].kind else {
            panic!("expected identifier, got {:?}", tokens[0].kind);
        };
        assert_eq!(interner.lookup(a), "freedom");
        assert!(matches!(tokens[1].kind, TokenKind::LowerIdent(_)));
    }

    #[test]
    fn lex_invalid_token_fails_fast() {
        let interner = StringInterner::new();
        let Err(diag) = lex("let x = @", &interner) else {
            panic!("expected a lex error");
        };
        assert_eq!(diag.kind, DiagnosticKind::Parse);
        assert!(diag.message.contains('@'));
        assert_eq!(diag.span.start, 8);
    }

    #[test]
    fn lex_spans_are_byte_offsets() {
        let interner = StringInterner::new();
        let tokens = match lex("new [Greeter]", &interner) {
            Ok(tokens) => tokens,
            Err(diag) => panic!("lex failed: {}", diag.message),
        };
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 5));
        assert_eq!(tokens[2].span, Span::new(5, 12));
    }
}
