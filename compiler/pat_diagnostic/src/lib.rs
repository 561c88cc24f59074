//! Diagnostic and source-mapping support for the Pat mailbox type checker.
//!
//! - Categorized diagnostics with primary spans
//! - Byte-offset to 1-based line mapping for the output contract

mod diagnostic;
mod line_index;

pub use diagnostic::{Diagnostic, DiagnosticBag, DiagnosticKind, Severity};
pub use line_index::LineIndex;
