//! Program-wide mailbox constraints.
//!
//! Per-definition checking records what each guard asserts and what each
//! send delivers; the final solve pass cross-checks them. A guard pattern
//! whose mandatory message is never sent anywhere in the program can never
//! be satisfied at runtime, no matter how the actors interleave.

use pat_ir::{Name, Span, StringInterner};
use pat_diagnostic::{Diagnostic, DiagnosticKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// A `target ! Tag(...)` occurrence.
#[derive(Debug, Clone)]
pub struct SendRecord {
    pub interface: Name,
    pub tag: Name,
    pub span: Span,
}

/// A `guard x : P { ... }` assertion.
#[derive(Debug, Clone)]
pub struct GuardRecord {
    pub interface: Name,
    /// Rendered pattern, for messages.
    pub pattern: String,
    /// Tags every execution of the guard must consume.
    pub mandatory: BTreeSet<Name>,
    pub span: Span,
}

/// A send capability that its holder never used.
#[derive(Debug, Clone)]
pub struct UnusedCapRecord {
    pub interface: Name,
    pub name: Name,
    pub span: Span,
}

/// Accumulated constraints for one program.
#[derive(Debug, Default)]
pub struct ConstraintStore {
    sends: Vec<SendRecord>,
    guards: Vec<GuardRecord>,
    unused_caps: Vec<UnusedCapRecord>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&mut self, interface: Name, tag: Name, span: Span) {
        self.sends.push(SendRecord {
            interface,
            tag,
            span,
        });
    }

    pub fn record_guard(
        &mut self,
        interface: Name,
        pattern: String,
        mandatory: BTreeSet<Name>,
        span: Span,
    ) {
        self.guards.push(GuardRecord {
            interface,
            pattern,
            mandatory,
            span,
        });
    }

    pub fn record_unused_cap(&mut self, interface: Name, name: Name, span: Span) {
        self.unused_caps.push(UnusedCapRecord {
            interface,
            name,
            span,
        });
    }

    pub fn send_count(&self) -> usize {
        self.sends.len()
    }

    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }

    /// Check every guard's mandatory tags against program-wide sends.
    ///
    /// A violation is reported at the unused send capability that should
    /// have produced the message when one exists (that is where the send
    /// was dropped), otherwise at the guard itself.
    pub fn solve(&self, interner: &StringInterner) -> Vec<Diagnostic> {
        let mut sent: FxHashMap<Name, FxHashSet<Name>> = FxHashMap::default();
        for send in &self.sends {
            sent.entry(send.interface).or_default().insert(send.tag);
        }

        let mut diagnostics = Vec::new();
        let mut reported: FxHashSet<(Name, Name)> = FxHashSet::default();

        for guard in &self.guards {
            for &tag in &guard.mandatory {
                let satisfied = sent
                    .get(&guard.interface)
                    .is_some_and(|tags| tags.contains(&tag));
                if satisfied || !reported.insert((guard.interface, tag)) {
                    continue;
                }

                let unused = self
                    .unused_caps
                    .iter()
                    .find(|cap| cap.interface == guard.interface);
                let diagnostic = match unused {
                    Some(cap) => Diagnostic::error(
                        DiagnosticKind::ConstraintUnsatisfiable,
                        format!(
                            "send capability `{}` for interface `{}` is never used, \
                             but a guard requires `{}` to be sent",
                            interner.lookup(cap.name),
                            interner.lookup(guard.interface),
                            interner.lookup(tag),
                        ),
                        cap.span,
                    ),
                    None => Diagnostic::error(
                        DiagnosticKind::ConstraintUnsatisfiable,
                        format!(
                            "no send of `{}` can satisfy guard pattern `{}` on interface `{}`",
                            interner.lookup(tag),
                            guard.pattern,
                            interner.lookup(guard.interface),
                        ),
                        guard.span,
                    ),
                };
                diagnostics.push(diagnostic);
            }
        }

        tracing::debug!(
            sends = self.sends.len(),
            guards = self.guards.len(),
            violations = diagnostics.len(),
            "constraint solve finished"
        );
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satisfied_guard_is_quiet() {
        let interner = StringInterner::new();
        let client = interner.intern("IdClient");
        let id = interner.intern("Id");

        let mut store = ConstraintStore::new();
        store.record_send(client, id, Span::new(0, 5));
        store.record_guard(
            client,
            "Id".to_string(),
            BTreeSet::from([id]),
            Span::new(10, 20),
        );

        assert!(store.solve(&interner).is_empty());
    }

    #[test]
    fn missing_mandatory_send_reported_at_guard() {
        let interner = StringInterner::new();
        let client = interner.intern("IdClient");
        let id = interner.intern("Id");

        let mut store = ConstraintStore::new();
        store.record_guard(
            client,
            "Id".to_string(),
            BTreeSet::from([id]),
            Span::new(10, 20),
        );

        let diagnostics = store.solve(&interner);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ConstraintUnsatisfiable);
        assert_eq!(diagnostics[0].span, Span::new(10, 20));
        assert!(diagnostics[0].message.contains("no send of `Id`"));
    }

    #[test]
    fn missing_send_prefers_unused_capability_site() {
        let interner = StringInterner::new();
        let client = interner.intern("IdClient");
        let id = interner.intern("Id");
        let binder = interner.intern("client");

        let mut store = ConstraintStore::new();
        store.record_guard(
            client,
            "Id".to_string(),
            BTreeSet::from([id]),
            Span::new(100, 110),
        );
        store.record_unused_cap(client, binder, Span::new(40, 46));

        let diagnostics = store.solve(&interner);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].span, Span::new(40, 46));
        assert!(diagnostics[0].message.contains("`client`"));
        assert!(diagnostics[0].message.contains("requires `Id`"));
    }

    #[test]
    fn star_guards_make_nothing_mandatory() {
        let interner = StringInterner::new();
        let server = interner.intern("IdServer");

        let mut store = ConstraintStore::new();
        store.record_guard(server, "*Get".to_string(), BTreeSet::new(), Span::new(0, 4));

        assert!(store.solve(&interner).is_empty());
    }

    #[test]
    fn each_violation_reported_once() {
        let interner = StringInterner::new();
        let client = interner.intern("IdClient");
        let id = interner.intern("Id");

        let mut store = ConstraintStore::new();
        store.record_guard(
            client,
            "Id".to_string(),
            BTreeSet::from([id]),
            Span::new(10, 20),
        );
        store.record_guard(
            client,
            "Id".to_string(),
            BTreeSet::from([id]),
            Span::new(30, 40),
        );

        assert_eq!(store.solve(&interner).len(), 1);
    }
}
