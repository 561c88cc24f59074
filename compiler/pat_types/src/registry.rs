//! Interface registry: named message protocols resolved in a pre-pass.
//!
//! The registry is an explicitly constructed, immutable value passed by
//! reference into the checker. It is built once per check, before any
//! definition is examined; registry errors abort the pipeline.

use crate::{Capability, Type};
use pat_diagnostic::{Diagnostic, DiagnosticKind};
use pat_ir::{InterfaceDecl, Name, Span, StringInterner, TypeExprKind};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// One resolved message signature.
#[derive(Clone, Debug)]
pub struct MessageInfo {
    pub tag: Name,
    pub payloads: Vec<Type>,
    pub span: Span,
}

/// A resolved interface: its signature table in declaration order.
#[derive(Clone, Debug)]
pub struct InterfaceInfo {
    pub name: Name,
    pub span: Span,
    messages: FxHashMap<Name, MessageInfo>,
    order: Vec<Name>,
}

impl InterfaceInfo {
    /// Look up a message signature by tag.
    pub fn message(&self, tag: Name) -> Option<&MessageInfo> {
        self.messages.get(&tag)
    }

    /// Declared tags in declaration order.
    pub fn tags(&self) -> impl Iterator<Item = Name> + '_ {
        self.order.iter().copied()
    }

    /// Render as `interface Name { Tag(Type, ...), ... }`.
    pub fn render(&self, interner: &StringInterner) -> String {
        let sigs: Vec<String> = self
            .order
            .iter()
            .filter_map(|tag| self.messages.get(tag))
            .map(|msg| {
                let payloads: Vec<String> =
                    msg.payloads.iter().map(|t| t.render(interner)).collect();
                format!("{}({})", interner.lookup(msg.tag), payloads.join(", "))
            })
            .collect();
        if sigs.is_empty() {
            format!("interface {} {{ }}", interner.lookup(self.name))
        } else {
            format!("interface {} {{ {} }}", interner.lookup(self.name), sigs.join(", "))
        }
    }
}

/// Lookup from interface name to its signature table.
#[derive(Clone, Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: FxHashMap<Name, Arc<InterfaceInfo>>,
    order: Vec<Name>,
}

impl InterfaceRegistry {
    /// Build the registry from parsed declarations.
    ///
    /// Detects duplicate interface names, duplicate tags within one
    /// interface, and unresolved payload references - each a distinct
    /// Interface diagnostic. All violations are reported in one pass.
    pub fn build(
        decls: &[InterfaceDecl],
        interner: &StringInterner,
    ) -> (InterfaceRegistry, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();

        // All declared names resolve payload references, including names
        // that later turn out to be duplicates.
        let mut declared: FxHashSet<Name> = FxHashSet::default();
        for decl in decls {
            declared.insert(decl.name);
        }

        let mut registry = InterfaceRegistry::default();
        for decl in decls {
            if registry.interfaces.contains_key(&decl.name) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::Interface,
                    format!(
                        "interface `{}` is declared more than once",
                        interner.lookup(decl.name)
                    ),
                    decl.span,
                ));
                continue;
            }

            let mut messages = FxHashMap::default();
            let mut order = Vec::with_capacity(decl.messages.len());
            for sig in &decl.messages {
                if messages.contains_key(&sig.tag) {
                    diagnostics.push(Diagnostic::error(
                        DiagnosticKind::Interface,
                        format!(
                            "message tag `{}` is declared more than once in interface `{}`",
                            interner.lookup(sig.tag),
                            interner.lookup(decl.name)
                        ),
                        sig.span,
                    ));
                    continue;
                }

                let mut payloads = Vec::with_capacity(sig.payloads.len());
                for payload in &sig.payloads {
                    match payload.kind {
                        TypeExprKind::Unit => payloads.push(Type::Unit),
                        TypeExprKind::Int => payloads.push(Type::Int),
                        TypeExprKind::String => payloads.push(Type::String),
                        TypeExprKind::Bool => payloads.push(Type::Bool),
                        TypeExprKind::Send(name) | TypeExprKind::Receive(name) => {
                            if !declared.contains(&name) {
                                diagnostics.push(Diagnostic::error(
                                    DiagnosticKind::Interface,
                                    format!(
                                        "payload type of `{}` references unknown interface `{}`",
                                        interner.lookup(sig.tag),
                                        interner.lookup(name)
                                    ),
                                    payload.span,
                                ));
                            }
                            let cap = match payload.kind {
                                TypeExprKind::Send(_) => Capability::Send,
                                _ => Capability::Receive,
                            };
                            payloads.push(Type::Mailbox {
                                interface: name,
                                cap,
                            });
                        }
                    }
                }

                order.push(sig.tag);
                messages.insert(
                    sig.tag,
                    MessageInfo {
                        tag: sig.tag,
                        payloads,
                        span: sig.span,
                    },
                );
            }

            registry.order.push(decl.name);
            registry.interfaces.insert(
                decl.name,
                Arc::new(InterfaceInfo {
                    name: decl.name,
                    span: decl.span,
                    messages,
                    order,
                }),
            );
        }

        tracing::debug!(
            interfaces = registry.len(),
            errors = diagnostics.len(),
            "interface registry built"
        );
        (registry, diagnostics)
    }

    /// Look up an interface by name.
    pub fn get(&self, name: Name) -> Option<&InterfaceInfo> {
        self.interfaces.get(&name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.interfaces.contains_key(&name)
    }

    /// Interfaces in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &InterfaceInfo> {
        self.order
            .iter()
            .filter_map(|name| self.interfaces.get(name).map(Arc::as_ref))
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
