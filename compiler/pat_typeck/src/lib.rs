//! Constraint-based type checker for Pat.
//!
//! Consumes the AST and the interface registry; produces batched,
//! categorized diagnostics plus the guard summaries used for reporting.

mod checker;
mod constraint;
mod context;

pub use checker::{check_program, CheckOutcome};
pub use constraint::ConstraintStore;
pub use context::{Binding, CapState, TypeContext};
