//! Type system for the Pat mailbox type checker.
//!
//! - Resolved types with the explicit send/receive capability split
//! - The interface registry built in a pre-pass
//! - The commutative-regular-expression algebra over mailbox contents

mod algebra;
mod registry;
mod ty;

pub use algebra::{canonicalize, pattern_tags, Canon};
pub use registry::{InterfaceInfo, InterfaceRegistry, MessageInfo};
pub use ty::{Capability, Type};

#[cfg(test)]
mod prop_tests;
