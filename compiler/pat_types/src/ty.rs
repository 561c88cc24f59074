//! Checker-level types.

use pat_ir::{Name, StringInterner, TypeExpr, TypeExprKind};

/// Polarity of a mailbox capability.
///
/// Send capabilities are unrestricted and may be freely duplicated; receive
/// capabilities are quasi-linear with a single owner at a time.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Capability {
    Send,
    Receive,
}

/// A resolved Pat type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Unit,
    Int,
    String,
    Bool,
    /// A mailbox capability: `(interface, polarity)`.
    Mailbox { interface: Name, cap: Capability },
}

impl Type {
    /// Resolve a surface annotation. Interface references are validated
    /// against the registry before this is called.
    pub fn from_type_expr(expr: &TypeExpr) -> Type {
        match expr.kind {
            TypeExprKind::Unit => Type::Unit,
            TypeExprKind::Int => Type::Int,
            TypeExprKind::String => Type::String,
            TypeExprKind::Bool => Type::Bool,
            TypeExprKind::Send(interface) => Type::Mailbox {
                interface,
                cap: Capability::Send,
            },
            TypeExprKind::Receive(interface) => Type::Mailbox {
                interface,
                cap: Capability::Receive,
            },
        }
    }

    /// Render for diagnostics and the program type summary.
    pub fn render(&self, interner: &StringInterner) -> String {
        match self {
            Type::Unit => "Unit".to_string(),
            Type::Int => "Int".to_string(),
            Type::String => "String".to_string(),
            Type::Bool => "Bool".to_string(),
            Type::Mailbox { interface, cap } => {
                let suffix = match cap {
                    Capability::Send => '!',
                    Capability::Receive => '?',
                };
                format!("{}{}", interner.lookup(*interface), suffix)
            }
        }
    }

    /// Whether a value of type `self` can flow where `expected` is declared.
    ///
    /// A mailbox handle with the receive capability also grants the send
    /// side, so `I?` flows into `I!` positions; everything else is exact.
    pub fn flows_into(&self, expected: &Type) -> bool {
        if self == expected {
            return true;
        }
        match (self, expected) {
            (
                Type::Mailbox {
                    interface: a,
                    cap: Capability::Receive,
                },
                Type::Mailbox {
                    interface: b,
                    cap: Capability::Send,
                },
            ) => a == b,
            _ => false,
        }
    }
}
