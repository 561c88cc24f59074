//! Core IR types for the Pat mailbox type checker: spans, interned names,
//! tokens, and the AST shared by the lexer, parser, and checker.

mod ast;
mod name;
mod span;
mod token;

pub use ast::{
    Binder, BinaryOp, DefDecl, Expr, ExprArena, ExprId, ExprKind, GuardBranch, GuardBranchKind,
    InterfaceDecl, MailboxPattern, MessageSig, Param, PatternKind, Program, TypeExpr, TypeExprKind,
};
pub use name::{Name, StringInterner};
pub use span::Span;
pub use token::{Token, TokenKind};
