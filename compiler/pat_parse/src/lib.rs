//! Recursive descent parser for Pat.
//!
//! The parser consumes the lexer's token list and produces a [`Program`]
//! with all expressions allocated in a flat arena. Parse failure is a value:
//! the first violation stops the pipeline for the file (no recovery), and
//! nothing resembling an exception crosses this crate's boundary.

use pat_diagnostic::{Diagnostic, DiagnosticKind};
use pat_ir::{
    Binder, BinaryOp, DefDecl, Expr, ExprId, ExprKind, GuardBranch, GuardBranchKind,
    InterfaceDecl, MailboxPattern, MessageSig, Name, Param, PatternKind, Program, Span,
    StringInterner, Token, TokenKind, TypeExpr, TypeExprKind,
};
use smallvec::SmallVec;

/// Parse a token list into a program.
///
/// `tokens` must be terminated by `Eof`, as produced by `pat_lexer::lex`.
/// Identifiers were already interned during lexing.
pub fn parse(tokens: &[Token]) -> Result<Program, Diagnostic> {
    Parser::new(tokens).parse_program()
}

/// Lex and parse in one step.
pub fn parse_source(source: &str, interner: &StringInterner) -> Result<Program, Diagnostic> {
    let tokens = pat_lexer::lex(source, interner)?;
    parse(&tokens)
}

struct Parser<'src> {
    tokens: &'src [Token],
    program: Program,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(tokens: &'src [Token]) -> Self {
        Parser {
            tokens,
            program: Program::default(),
            pos: 0,
        }
    }

    fn parse_program(mut self) -> Result<Program, Diagnostic> {
        while !self.at_end() {
            match self.current_kind() {
                TokenKind::Interface => {
                    let decl = self.parse_interface()?;
                    self.program.interfaces.push(decl);
                }
                TokenKind::Def => {
                    let decl = self.parse_def()?;
                    self.program.defs.push(decl);
                }
                _ => {
                    return Err(self.error_expected("`interface` or `def`"));
                }
            }
        }
        tracing::debug!(
            interfaces = self.program.interfaces.len(),
            defs = self.program.defs.len(),
            "parsed program"
        );
        Ok(self.program)
    }

    // ===== Token access =====

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn prev_span(&self) -> Span {
        if self.pos == 0 {
            self.current_span()
        } else {
            self.tokens[self.pos - 1].span
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        &self.tokens[self.pos - 1]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> Result<&Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(kind.describe()))
        }
    }

    fn error_expected(&self, what: &str) -> Diagnostic {
        Diagnostic::error(
            DiagnosticKind::Parse,
            format!("expected {what}, found {}", self.current_kind().describe()),
            self.current_span(),
        )
    }

    fn expect_lower_ident(&mut self, what: &str) -> Result<(Name, Span), Diagnostic> {
        match *self.current_kind() {
            TokenKind::LowerIdent(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            _ => Err(self.error_expected(what)),
        }
    }

    fn expect_upper_ident(&mut self, what: &str) -> Result<(Name, Span), Diagnostic> {
        match *self.current_kind() {
            TokenKind::UpperIdent(name) => {
                let span = self.current_span();
                self.advance();
                Ok((name, span))
            }
            _ => Err(self.error_expected(what)),
        }
    }

    fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.program.arena.alloc(Expr::new(kind, span))
    }

    // ===== Declarations =====

    /// `interface Name { Tag(Type, ...), ... }`
    fn parse_interface(&mut self) -> Result<InterfaceDecl, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Interface)?;
        let (name, _) = self.expect_upper_ident("an interface name")?;
        self.consume(&TokenKind::LBrace)?;

        let mut messages = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                messages.push(self.parse_message_sig()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RBrace)?;

        Ok(InterfaceDecl {
            name,
            messages,
            span: start.merge(self.prev_span()),
        })
    }

    /// `Tag(Type, ...)`
    fn parse_message_sig(&mut self) -> Result<MessageSig, Diagnostic> {
        let (tag, tag_span) = self.expect_upper_ident("a message tag")?;
        self.consume(&TokenKind::LParen)?;

        let mut payloads = SmallVec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                payloads.push(self.parse_type()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen)?;

        Ok(MessageSig {
            tag,
            payloads,
            span: tag_span.merge(self.prev_span()),
        })
    }

    /// `Unit | Int | String | Bool | Name! | Name?`
    fn parse_type(&mut self) -> Result<TypeExpr, Diagnostic> {
        let start = self.current_span();
        let kind = match *self.current_kind() {
            TokenKind::UnitType => {
                self.advance();
                TypeExprKind::Unit
            }
            TokenKind::IntType => {
                self.advance();
                TypeExprKind::Int
            }
            TokenKind::StringType => {
                self.advance();
                TypeExprKind::String
            }
            TokenKind::BoolType => {
                self.advance();
                TypeExprKind::Bool
            }
            TokenKind::UpperIdent(name) => {
                self.advance();
                match self.current_kind() {
                    TokenKind::Bang => {
                        self.advance();
                        TypeExprKind::Send(name)
                    }
                    TokenKind::Query => {
                        self.advance();
                        TypeExprKind::Receive(name)
                    }
                    _ => {
                        return Err(self.error_expected("`!` or `?` after an interface name"));
                    }
                }
            }
            _ => return Err(self.error_expected("a type")),
        };
        Ok(TypeExpr {
            kind,
            span: start.merge(self.prev_span()),
        })
    }

    /// `def name(params): ReturnType { body }`
    fn parse_def(&mut self) -> Result<DefDecl, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Def)?;
        let (name, _) = self.expect_lower_ident("a definition name")?;
        self.consume(&TokenKind::LParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param_name, param_span) = self.expect_lower_ident("a parameter name")?;
                self.consume(&TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    span: param_span.merge(ty.span),
                    ty,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen)?;
        self.consume(&TokenKind::Colon)?;
        let return_type = self.parse_type()?;
        self.consume(&TokenKind::LBrace)?;
        let body = self.parse_expr()?;
        self.consume(&TokenKind::RBrace)?;

        Ok(DefDecl {
            name,
            params,
            return_type,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    // ===== Expressions =====

    /// Sequencing has the lowest precedence and associates right.
    fn parse_expr(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        let first = self.parse_send()?;
        if self.eat(&TokenKind::Semi) {
            let rest = self.parse_expr()?;
            let span = start.merge(self.prev_span());
            Ok(self.alloc(ExprKind::Seq { first, rest }, span))
        } else {
            Ok(first)
        }
    }

    /// `target ! Tag(args)`
    fn parse_send(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        let target = self.parse_cmp()?;
        if self.eat(&TokenKind::Bang) {
            let (tag, tag_span) = self.expect_upper_ident("a message tag after `!`")?;
            self.consume(&TokenKind::LParen)?;
            let args = self.parse_args()?;
            let span = start.merge(self.prev_span());
            Ok(self.alloc(
                ExprKind::Send {
                    target,
                    tag,
                    tag_span,
                    args,
                },
                span,
            ))
        } else {
            Ok(target)
        }
    }

    fn parse_cmp(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        let lhs = self.parse_add()?;
        let op = match self.current_kind() {
            TokenKind::EqEq => Some(BinaryOp::Eq),
            TokenKind::NotEq => Some(BinaryOp::Ne),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::LtEq => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::GtEq => Some(BinaryOp::Ge),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_add()?;
            let span = start.merge(self.prev_span());
            Ok(self.alloc(ExprKind::Binary { op, lhs, rhs }, span))
        } else {
            Ok(lhs)
        }
    }

    fn parse_add(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        let mut lhs = self.parse_mul()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_mul()?;
            let span = start.merge(self.prev_span());
            lhs = self.alloc(ExprKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_mul(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            let span = start.merge(self.prev_span());
            lhs = self.alloc(ExprKind::Binary { op, lhs, rhs }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<ExprId, Diagnostic> {
        if self.check(&TokenKind::Minus) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.merge(self.prev_span());
            Ok(self.alloc(ExprKind::Neg(operand), span))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        match *self.current_kind() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(self.alloc(ExprKind::Int(value), start))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.alloc(ExprKind::Str(value), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.alloc(ExprKind::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.alloc(ExprKind::Bool(false), start))
            }
            TokenKind::LParen => {
                self.advance();
                if self.eat(&TokenKind::RParen) {
                    let span = start.merge(self.prev_span());
                    Ok(self.alloc(ExprKind::Unit, span))
                } else {
                    let inner = self.parse_expr()?;
                    self.consume(&TokenKind::RParen)?;
                    Ok(inner)
                }
            }
            TokenKind::Let => self.parse_let(),
            TokenKind::New => self.parse_new(),
            TokenKind::Spawn => self.parse_spawn(),
            TokenKind::Free => self.parse_free(),
            TokenKind::Guard => self.parse_guard(),
            TokenKind::If => self.parse_if(),
            TokenKind::LowerIdent(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let args = self.parse_args()?;
                    let span = start.merge(self.prev_span());
                    Ok(self.alloc(
                        ExprKind::Call {
                            callee: name,
                            callee_span: start,
                            args,
                        },
                        span,
                    ))
                } else {
                    Ok(self.alloc(ExprKind::Var(name), start))
                }
            }
            _ => Err(self.error_expected("an expression")),
        }
    }

    /// `let name = value in body`
    fn parse_let(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Let)?;
        let (name, _) = self.expect_lower_ident("a binding name")?;
        self.consume(&TokenKind::Eq)?;
        let value = self.parse_send()?;
        self.consume(&TokenKind::In)?;
        let body = self.parse_expr()?;
        let span = start.merge(self.prev_span());
        Ok(self.alloc(ExprKind::Let { name, value, body }, span))
    }

    /// `new [Interface]`
    fn parse_new(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::New)?;
        self.consume(&TokenKind::LBracket)?;
        let (interface, _) = self.expect_upper_ident("an interface name")?;
        self.consume(&TokenKind::RBracket)?;
        let span = start.merge(self.prev_span());
        Ok(self.alloc(ExprKind::New { interface }, span))
    }

    /// `spawn { body }`
    fn parse_spawn(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Spawn)?;
        self.consume(&TokenKind::LBrace)?;
        let body = self.parse_expr()?;
        self.consume(&TokenKind::RBrace)?;
        let span = start.merge(self.prev_span());
        Ok(self.alloc(ExprKind::Spawn { body }, span))
    }

    /// `free(name)`
    fn parse_free(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Free)?;
        self.consume(&TokenKind::LParen)?;
        let (target, target_span) = self.expect_lower_ident("a mailbox variable")?;
        self.consume(&TokenKind::RParen)?;
        let span = start.merge(self.prev_span());
        Ok(self.alloc(
            ExprKind::Free {
                target,
                target_span,
            },
            span,
        ))
    }

    /// `if cond then e1 else e2`
    fn parse_if(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::If)?;
        let cond = self.parse_send()?;
        self.consume(&TokenKind::Then)?;
        let then_branch = self.parse_send()?;
        self.consume(&TokenKind::Else)?;
        let else_branch = self.parse_send()?;
        let span = start.merge(self.prev_span());
        Ok(self.alloc(
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    /// `guard subject : pattern { branches }`
    fn parse_guard(&mut self) -> Result<ExprId, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Guard)?;
        let (subject, subject_span) = self.expect_lower_ident("a mailbox variable")?;
        self.consume(&TokenKind::Colon)?;
        let pattern = self.parse_pattern()?;
        self.consume(&TokenKind::LBrace)?;

        let mut branches = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::RBrace => break,
                TokenKind::Free => branches.push(self.parse_free_branch()?),
                TokenKind::Receive => branches.push(self.parse_receive_branch()?),
                _ => {
                    return Err(self.error_expected("`receive`, `free`, or `}` in a guard block"));
                }
            }
        }
        self.consume(&TokenKind::RBrace)?;

        let span = start.merge(self.prev_span());
        Ok(self.alloc(
            ExprKind::Guard {
                subject,
                subject_span,
                pattern,
                branches,
            },
            span,
        ))
    }

    /// `free -> body`
    fn parse_free_branch(&mut self) -> Result<GuardBranch, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Free)?;
        self.consume(&TokenKind::Arrow)?;
        let body = self.parse_expr()?;
        Ok(GuardBranch {
            kind: GuardBranchKind::Free,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    /// `receive Tag(binders) from source -> body`
    fn parse_receive_branch(&mut self) -> Result<GuardBranch, Diagnostic> {
        let start = self.current_span();
        self.consume(&TokenKind::Receive)?;
        let (tag, tag_span) = self.expect_upper_ident("a message tag")?;
        self.consume(&TokenKind::LParen)?;

        let mut binders = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (name, span) = self.expect_lower_ident("a payload binder")?;
                binders.push(Binder { name, span });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen)?;
        self.consume(&TokenKind::From)?;
        let (source, source_span) = self.expect_lower_ident("the guarded mailbox variable")?;
        self.consume(&TokenKind::Arrow)?;
        let body = self.parse_expr()?;

        Ok(GuardBranch {
            kind: GuardBranchKind::Receive {
                tag,
                tag_span,
                binders,
                source,
                source_span,
            },
            body,
            span: start.merge(self.prev_span()),
        })
    }

    // ===== Mailbox patterns =====

    fn parse_pattern(&mut self) -> Result<MailboxPattern, Diagnostic> {
        let start = self.current_span();
        let mut lhs = self.parse_pattern_seq()?;
        while self.eat(&TokenKind::Plus) {
            let rhs = self.parse_pattern_seq()?;
            lhs = MailboxPattern {
                kind: PatternKind::Choice(Box::new(lhs), Box::new(rhs)),
                span: start.merge(self.prev_span()),
            };
        }
        Ok(lhs)
    }

    fn parse_pattern_seq(&mut self) -> Result<MailboxPattern, Diagnostic> {
        let start = self.current_span();
        let mut lhs = self.parse_pattern_star()?;
        while self.eat(&TokenKind::Dot) {
            let rhs = self.parse_pattern_star()?;
            lhs = MailboxPattern {
                kind: PatternKind::Seq(Box::new(lhs), Box::new(rhs)),
                span: start.merge(self.prev_span()),
            };
        }
        Ok(lhs)
    }

    fn parse_pattern_star(&mut self) -> Result<MailboxPattern, Diagnostic> {
        let start = self.current_span();
        match *self.current_kind() {
            TokenKind::Star => {
                self.advance();
                let inner = self.parse_pattern_star()?;
                Ok(MailboxPattern {
                    kind: PatternKind::Star(Box::new(inner)),
                    span: start.merge(self.prev_span()),
                })
            }
            TokenKind::Int(1) => {
                self.advance();
                Ok(MailboxPattern {
                    kind: PatternKind::Empty,
                    span: start,
                })
            }
            TokenKind::Int(_) => Err(Diagnostic::error(
                DiagnosticKind::Parse,
                "only `1` denotes the empty mailbox pattern",
                start,
            )),
            TokenKind::UpperIdent(name) => {
                self.advance();
                Ok(MailboxPattern {
                    kind: PatternKind::Tag(name),
                    span: start,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_pattern()?;
                self.consume(&TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.error_expected("a mailbox pattern")),
        }
    }

    fn parse_args(&mut self) -> Result<SmallVec<[ExprId; 2]>, Diagnostic> {
        let mut args = SmallVec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_send()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        let interner = StringInterner::new();
        match parse_source(source, &interner) {
            Ok(program) => program,
            Err(diag) => panic!("parse failed: {}", diag.message),
        }
    }

    fn parse_err(source: &str) -> Diagnostic {
        let interner = StringInterner::new();
        match parse_source(source, &interner) {
            Ok(_) => panic!("expected a parse error"),
            Err(diag) => diag,
        }
    }

    const GREETER: &str = r#"
interface Greeter { Hello(Client!) }
interface Client { Reply(String) }

def greeter(self: Greeter?): Unit {
  guard self: *Hello {
    free -> ()
    receive Hello(client) from self ->
      client ! Reply("Hello, World!");
      greeter(self)
  }
}

def client(server: Greeter!): String {
  let clientMb = new [Client] in
  server ! Hello(clientMb);
  guard clientMb: Reply {
    receive Reply(msg) from clientMb ->
      free(clientMb);
      msg
  }
}

def main(): Unit {
  let serverMb = new [Greeter] in
  spawn {greeter(serverMb)};
  print(client(serverMb))
}
"#;

    #[test]
    fn parse_greeter_program() {
        let program = parse_ok(GREETER);
        assert_eq!(program.interfaces.len(), 2);
        assert_eq!(program.defs.len(), 3);
    }

    #[test]
    fn parse_interface_signatures() {
        let program = parse_ok("interface IdServer { Get(IdClient!), Stop() }");
        let decl = &program.interfaces[0];
        assert_eq!(decl.messages.len(), 2);
        assert_eq!(decl.messages[0].payloads.len(), 1);
        assert!(decl.messages[1].payloads.is_empty());
    }

    #[test]
    fn parse_def_signature() {
        let program = parse_ok("def id_server(self: IdServer?, next: Int): Unit { () }");
        let def = &program.defs[0];
        assert_eq!(def.params.len(), 2);
        assert!(matches!(def.params[0].ty.kind, TypeExprKind::Receive(_)));
        assert!(matches!(def.params[1].ty.kind, TypeExprKind::Int));
        assert!(matches!(def.return_type.kind, TypeExprKind::Unit));
    }

    #[test]
    fn parse_guard_branches() {
        let program = parse_ok(
            "def f(mb: M?): Unit { guard mb: *Get { free -> () receive Get(c) from mb -> f(mb) } }",
        );
        let def = &program.defs[0];
        let ExprKind::Guard {
            pattern, branches, ..
        } = &program.arena.get(def.body).kind
        else {
            panic!("expected a guard expression");
        };
        assert!(matches!(pattern.kind, PatternKind::Star(_)));
        assert_eq!(branches.len(), 2);
        assert!(matches!(branches[0].kind, GuardBranchKind::Free));
        assert!(matches!(
            branches[1].kind,
            GuardBranchKind::Receive { .. }
        ));
    }

    #[test]
    fn parse_pattern_precedence() {
        // `A . B + *C` parses as `(A . B) + (*C)`.
        let interner = StringInterner::new();
        let program = match parse_source(
            "def f(mb: M?): Unit { guard mb: A . B + *C { free -> () } }",
            &interner,
        ) {
            Ok(program) => program,
            Err(diag) => panic!("parse failed: {}", diag.message),
        };
        let ExprKind::Guard { pattern, .. } = &program.arena.get(program.defs[0].body).kind
        else {
            panic!("expected a guard expression");
        };
        assert_eq!(pattern.render(&interner), "A . B + *C");
        let PatternKind::Choice(lhs, rhs) = &pattern.kind else {
            panic!("expected a choice at the top");
        };
        assert!(matches!(lhs.kind, PatternKind::Seq(..)));
        assert!(matches!(rhs.kind, PatternKind::Star(_)));
    }

    #[test]
    fn parse_send_and_sequence() {
        let program = parse_ok(
            "def f(client: Client!, self: S?): Unit { client ! Reply(\"hi\"); f(client, self) }",
        );
        let def = &program.defs[0];
        let ExprKind::Seq { first, .. } = &program.arena.get(def.body).kind else {
            panic!("expected a sequence");
        };
        assert!(matches!(
            program.arena.get(*first).kind,
            ExprKind::Send { .. }
        ));
    }

    #[test]
    fn parse_arithmetic_precedence() {
        let program = parse_ok("def f(next: Int): Int { 1 + next * 2 }");
        let def = &program.defs[0];
        let ExprKind::Binary { op, rhs, .. } = &program.arena.get(def.body).kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::Add);
        assert!(matches!(
            program.arena.get(*rhs).kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn parse_if_expression() {
        let program = parse_ok("def f(n: Int): Int { if n == 0 then 1 else n }");
        let def = &program.defs[0];
        assert!(matches!(
            program.arena.get(def.body).kind,
            ExprKind::If { .. }
        ));
    }

    #[test]
    fn parse_error_has_found_token() {
        let diag = parse_err("def 42(): Unit { () }");
        assert_eq!(diag.kind, DiagnosticKind::Parse);
        assert!(diag.message.contains("expected a definition name"));
        assert!(diag.message.contains("integer literal"));
    }

    #[test]
    fn parse_error_stops_at_first() {
        // Both defs are malformed; only the first is reported.
        let diag = parse_err("def a(: Unit { } def b(: Unit { }");
        assert_eq!(diag.span.start, 6);
    }

    #[test]
    fn parse_type_requires_polarity() {
        let diag = parse_err("def f(mb: Client): Unit { () }");
        assert!(diag.message.contains("`!` or `?`"));
    }

    #[test]
    fn parse_top_level_junk_rejected() {
        let diag = parse_err("let x = 1 in x");
        assert!(diag.message.contains("`interface` or `def`"));
    }

    #[test]
    fn parse_empty_pattern_literal() {
        let program = parse_ok("def f(mb: M?): Unit { guard mb: 1 { free -> () } }");
        let ExprKind::Guard { pattern, .. } = &program.arena.get(program.defs[0].body).kind
        else {
            panic!("expected a guard expression");
        };
        assert!(matches!(pattern.kind, PatternKind::Empty));
    }

    #[test]
    fn parse_non_one_integer_pattern_rejected() {
        let diag = parse_err("def f(mb: M?): Unit { guard mb: 2 { free -> () } }");
        assert!(diag.message.contains("only `1`"));
    }
}
