//! The typing context: lexically scoped bindings with quasi-linear
//! capability states.
//!
//! Mailbox bindings are modeled as the explicit union the discipline needs:
//! a shared send capability, or a unique receive capability with an evolving
//! content type. Context split (guard/if branches) clones the context;
//! merge compares what each branch consumed.

use pat_ir::{Name, Span};
use pat_types::{Canon, Capability, Type};
use rustc_hash::FxHashMap;

/// Capability state of a binding.
#[derive(Clone, Debug)]
pub enum CapState {
    /// Not a mailbox: plain value binding.
    Value,
    /// Shared send capability; freely duplicated.
    Shared,
    /// Unique receive capability.
    Unique {
        /// Current content type. `None` until a guard asserts one; a fresh
        /// or transferred mailbox is vacuously empty until then.
        content: Option<Canon>,
    },
}

/// One binding in scope.
#[derive(Clone, Debug)]
pub struct Binding {
    pub ty: Type,
    pub state: CapState,
    /// Where the binding was introduced.
    pub introduced: Span,
    /// Set when `free` consumed the whole binding.
    pub freed: Option<Span>,
    /// Set when the receive capability was transferred away.
    pub moved: Option<Span>,
    /// The binding was read at least once.
    pub read: bool,
}

impl Binding {
    pub fn value(ty: Type, introduced: Span) -> Binding {
        Binding {
            ty,
            state: CapState::Value,
            introduced,
            freed: None,
            moved: None,
            read: false,
        }
    }

    pub fn shared(interface: Name, introduced: Span) -> Binding {
        Binding {
            ty: Type::Mailbox {
                interface,
                cap: Capability::Send,
            },
            state: CapState::Shared,
            introduced,
            freed: None,
            moved: None,
            read: false,
        }
    }

    pub fn unique(interface: Name, content: Option<Canon>, introduced: Span) -> Binding {
        Binding {
            ty: Type::Mailbox {
                interface,
                cap: Capability::Receive,
            },
            state: CapState::Unique { content },
            introduced,
            freed: None,
            moved: None,
            read: false,
        }
    }

    /// The interface of a mailbox binding, if it is one.
    pub fn interface(&self) -> Option<Name> {
        match self.ty {
            Type::Mailbox { interface, .. } => Some(interface),
            _ => None,
        }
    }

    /// Whether the binding currently owns its receive capability.
    pub fn owns_receive(&self) -> bool {
        matches!(self.state, CapState::Unique { .. }) && self.freed.is_none() && self.moved.is_none()
    }

    /// Whether the receive capability has been consumed (freed or moved).
    pub fn consumed(&self) -> bool {
        self.freed.is_some() || self.moved.is_some()
    }

    /// Current content type, if the binding owns a receive capability.
    pub fn content(&self) -> Option<&Canon> {
        match &self.state {
            CapState::Unique { content } => content.as_ref(),
            _ => None,
        }
    }

    pub fn set_content(&mut self, canon: Canon) {
        if let CapState::Unique { content } = &mut self.state {
            *content = Some(canon);
        }
    }
}

/// Lexically scoped typing context.
#[derive(Clone, Debug, Default)]
pub struct TypeContext {
    scopes: Vec<FxHashMap<Name, Binding>>,
}

impl TypeContext {
    pub fn new() -> Self {
        TypeContext {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the innermost scope, returning its bindings for leak checks.
    pub fn pop_scope(&mut self) -> Vec<(Name, Binding)> {
        match self.scopes.pop() {
            Some(scope) => {
                let mut bindings: Vec<(Name, Binding)> = scope.into_iter().collect();
                // Stable order for deterministic diagnostics.
                bindings.sort_by_key(|(_, b)| (b.introduced.start, b.introduced.end));
                bindings
            }
            None => Vec::new(),
        }
    }

    pub fn insert(&mut self, name: Name, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    pub fn lookup(&self, name: Name) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    pub fn lookup_mut(&mut self, name: Name) -> Option<&mut Binding> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(&name))
    }

    /// Consumption snapshot of every mailbox binding, outermost first.
    ///
    /// Used to compare what diverging branches consumed.
    pub fn consumption(&self) -> Vec<(Name, bool)> {
        let mut result = Vec::new();
        for scope in &self.scopes {
            let mut entries: Vec<(&Name, &Binding)> = scope.iter().collect();
            entries.sort_by_key(|(name, _)| name.raw());
            for (name, binding) in entries {
                if binding.interface().is_some() {
                    result.push((*name, binding.consumed()));
                }
            }
        }
        result
    }

    /// Adopt `branch` as the continuation context, OR-ing in the read flags
    /// observed by the other branches.
    pub fn adopt(&mut self, branch: TypeContext, others: &[TypeContext]) {
        *self = branch;
        for other in others {
            for (depth, scope) in other.scopes.iter().enumerate() {
                for (name, binding) in scope {
                    if binding.read {
                        if let Some(target) =
                            self.scopes.get_mut(depth).and_then(|s| s.get_mut(name))
                        {
                            target.read = true;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pat_ir::StringInterner;

    #[test]
    fn lookup_finds_inner_shadow() {
        let interner = StringInterner::new();
        let x = interner.intern("x");

        let mut ctx = TypeContext::new();
        ctx.insert(x, Binding::value(Type::Int, Span::new(0, 1)));
        ctx.push_scope();
        ctx.insert(x, Binding::value(Type::String, Span::new(2, 3)));

        let binding = match ctx.lookup(x) {
            Some(binding) => binding,
            None => panic!("x must be bound"),
        };
        assert_eq!(binding.ty, Type::String);

        ctx.pop_scope();
        let binding = match ctx.lookup(x) {
            Some(binding) => binding,
            None => panic!("x must still be bound"),
        };
        assert_eq!(binding.ty, Type::Int);
    }

    #[test]
    fn unique_binding_lifecycle() {
        let interner = StringInterner::new();
        let mb = interner.intern("mb");
        let greeter = interner.intern("Greeter");

        let mut ctx = TypeContext::new();
        ctx.insert(mb, Binding::unique(greeter, None, Span::new(0, 2)));

        let binding = match ctx.lookup_mut(mb) {
            Some(binding) => binding,
            None => panic!("mb must be bound"),
        };
        assert!(binding.owns_receive());
        assert!(!binding.consumed());

        binding.moved = Some(Span::new(10, 12));
        assert!(!binding.owns_receive());
        assert!(binding.consumed());
    }

    #[test]
    fn consumption_snapshot_orders_by_name() {
        let interner = StringInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let iface = interner.intern("M");

        let mut ctx = TypeContext::new();
        ctx.insert(b, Binding::unique(iface, None, Span::new(5, 6)));
        ctx.insert(a, Binding::shared(iface, Span::new(0, 1)));
        ctx.insert(interner.intern("n"), Binding::value(Type::Int, Span::new(2, 3)));

        let snapshot = ctx.consumption();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].1, false);
        assert_eq!(snapshot[1].1, false);
    }

    #[test]
    fn adopt_unions_reads() {
        let interner = StringInterner::new();
        let x = interner.intern("x");
        let iface = interner.intern("M");

        let mut base = TypeContext::new();
        base.insert(x, Binding::shared(iface, Span::new(0, 1)));

        let branch_a = base.clone();
        let mut branch_b = base.clone();
        if let Some(binding) = branch_b.lookup_mut(x) {
            binding.read = true;
        }

        base.adopt(branch_a, std::slice::from_ref(&branch_b));
        let binding = match base.lookup(x) {
            Some(binding) => binding,
            None => panic!("x must be bound"),
        };
        assert!(binding.read);
    }
}
