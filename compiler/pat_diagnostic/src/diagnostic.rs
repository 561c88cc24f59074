//! Structured diagnostics.
//!
//! Internal components construct these values and never format output; the
//! driver's reporter is the sole formatting boundary.

use pat_ir::Span;
use std::fmt;

/// Severity level of a diagnostic.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Failure category.
///
/// Every rejected program maps to one of these; the checker never raises an
/// uncategorized failure for a parseable program.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum DiagnosticKind {
    /// Lexical or grammatical violation.
    Parse,
    /// Malformed protocol declarations (duplicates, unresolved payloads).
    Interface,
    /// A send or call whose tag/payload does not match any declared signature.
    MessageType,
    /// A guard missing a reachable message branch or the `free` case.
    GuardExhaustiveness,
    /// Receive-capability misuse: use-after-free, double free, leaks.
    Linearity,
    /// Mailbox content constraints that no execution can satisfy.
    ConstraintUnsatisfiable,
    /// Host-level failure surfaced by the driver (file I/O and similar).
    System,
}

impl DiagnosticKind {
    /// Category label used in rendered output.
    pub fn category(self) -> &'static str {
        match self {
            DiagnosticKind::Parse => "Parse Error",
            DiagnosticKind::Interface => "Interface Error",
            DiagnosticKind::MessageType => "Message Type Error",
            DiagnosticKind::GuardExhaustiveness => "Guard Exhaustiveness Error",
            DiagnosticKind::Linearity => "Linearity Error",
            DiagnosticKind::ConstraintUnsatisfiable => "Constraint Error",
            DiagnosticKind::System => "System Error",
        }
    }
}

/// A positioned, categorized diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Error,
            message: message.into(),
            span,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Diagnostic {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            span,
        }
    }

    /// Check if this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Collection of diagnostics with convenience methods.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::error(kind, message, span));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    /// Stable output order: by source position, then by discovery order.
    ///
    /// Sorting is stable, so diagnostics at the same span keep the order the
    /// checker found them in; repeated runs produce identical lists.
    pub fn sort_by_position(&mut self) {
        self.diagnostics.sort_by_key(|d| d.span.start);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a DiagnosticBag {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}
