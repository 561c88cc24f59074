//! Bidirectional type checking with quasi-linear capability tracking.
//!
//! Each definition is checked against its declared signature with a fresh
//! typing context. A mailbox receive capability is a state machine over the
//! content algebra: created by `new` or received as an `I?` value, narrowed
//! by every `guard`/`receive`, and consumed exactly once by `free`, an `I?`
//! argument or return position, or a transfer across a `spawn` boundary.
//!
//! Checking is batched per definition: the first error aborts the offending
//! definition, and the checker moves on to the next one.

use pat_diagnostic::{Diagnostic, DiagnosticBag, DiagnosticKind};
use pat_ir::{
    Binder, BinaryOp, DefDecl, ExprArena, ExprId, ExprKind, GuardBranch, GuardBranchKind,
    MailboxPattern, Name, Program, Span, StringInterner, TypeExprKind,
};
use pat_types::{canonicalize, pattern_tags, Canon, Capability, InterfaceRegistry, Type};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::constraint::ConstraintStore;
use crate::context::{Binding, CapState, TypeContext};

/// Result of checking a whole program.
#[derive(Debug)]
pub struct CheckOutcome {
    pub diagnostics: DiagnosticBag,
    /// `guard <name>: <pattern>` summaries from definitions that passed.
    pub guards: Vec<String>,
    pub defs_checked: usize,
}

#[derive(Clone, Debug)]
struct DefSig {
    params: Vec<Type>,
    ret: Type,
}

/// Check every definition of `program` against `registry`.
pub fn check_program(
    program: &Program,
    registry: &InterfaceRegistry,
    interner: &StringInterner,
) -> CheckOutcome {
    let mut checker = Checker::new(program, registry, interner);
    checker.run(program)
}

struct Checker<'a> {
    interner: &'a StringInterner,
    registry: &'a InterfaceRegistry,
    arena: &'a ExprArena,
    sigs: FxHashMap<Name, DefSig>,
    builtins: FxHashMap<Name, DefSig>,
    constraints: ConstraintStore,
    diagnostics: DiagnosticBag,
    /// Guard summaries for the definition currently being checked.
    pending_guards: Vec<String>,
    guards: Vec<String>,
}

impl<'a> Checker<'a> {
    fn new(
        program: &'a Program,
        registry: &'a InterfaceRegistry,
        interner: &'a StringInterner,
    ) -> Self {
        let mut builtins = FxHashMap::default();
        builtins.insert(
            interner.intern("print"),
            DefSig {
                params: vec![Type::String],
                ret: Type::Unit,
            },
        );
        builtins.insert(
            interner.intern("intToString"),
            DefSig {
                params: vec![Type::Int],
                ret: Type::String,
            },
        );

        Checker {
            interner,
            registry,
            arena: &program.arena,
            sigs: FxHashMap::default(),
            builtins,
            constraints: ConstraintStore::new(),
            diagnostics: DiagnosticBag::new(),
            pending_guards: Vec::new(),
            guards: Vec::new(),
        }
    }

    fn run(&mut self, program: &Program) -> CheckOutcome {
        let skip = self.collect_signatures(program);

        let mut defs_checked = 0;
        for def in &program.defs {
            if skip.contains(&def.name) {
                continue;
            }
            self.pending_guards.clear();
            match self.check_def(def) {
                Ok(()) => {
                    defs_checked += 1;
                    self.guards.append(&mut self.pending_guards);
                }
                Err(diag) => {
                    tracing::debug!(
                        def = self.interner.lookup(def.name),
                        "definition failed to check"
                    );
                    self.diagnostics.push(diag);
                }
            }
        }

        let solved = self.constraints.solve(self.interner);
        self.diagnostics.extend(solved);
        self.diagnostics.sort_by_position();

        CheckOutcome {
            diagnostics: std::mem::take(&mut self.diagnostics),
            guards: std::mem::take(&mut self.guards),
            defs_checked,
        }
    }

    /// Resolve every definition signature up front so calls (including
    /// recursive ones) can be checked in any order. Returns the names whose
    /// bodies must be skipped because their signature is malformed.
    fn collect_signatures(&mut self, program: &Program) -> FxHashSet<Name> {
        let mut skip = FxHashSet::default();

        for def in &program.defs {
            if self.sigs.contains_key(&def.name) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::Interface,
                    format!(
                        "definition `{}` is declared more than once",
                        self.interner.lookup(def.name)
                    ),
                    def.span,
                ));
                skip.insert(def.name);
                continue;
            }

            let mut ok = true;
            let mut seen_params = FxHashSet::default();
            for param in &def.params {
                if !seen_params.insert(param.name) {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticKind::MessageType,
                        format!(
                            "duplicate parameter `{}` in definition `{}`",
                            self.interner.lookup(param.name),
                            self.interner.lookup(def.name)
                        ),
                        param.span,
                    ));
                    ok = false;
                }
                if !self.type_expr_resolves(&param.ty.kind) {
                    let diag = self.unknown_interface(&param.ty.kind, param.ty.span);
                    self.diagnostics.push(diag);
                    ok = false;
                }
            }
            if !self.type_expr_resolves(&def.return_type.kind) {
                let diag = self.unknown_interface(&def.return_type.kind, def.return_type.span);
                self.diagnostics.push(diag);
                ok = false;
            }

            self.sigs.insert(
                def.name,
                DefSig {
                    params: def.params.iter().map(|p| Type::from_type_expr(&p.ty)).collect(),
                    ret: Type::from_type_expr(&def.return_type),
                },
            );
            if !ok {
                skip.insert(def.name);
            }
        }

        skip
    }

    fn type_expr_resolves(&self, kind: &TypeExprKind) -> bool {
        match kind {
            TypeExprKind::Send(name) | TypeExprKind::Receive(name) => self.registry.contains(*name),
            _ => true,
        }
    }

    fn unknown_interface(&self, kind: &TypeExprKind, span: Span) -> Diagnostic {
        let name = match kind {
            TypeExprKind::Send(name) | TypeExprKind::Receive(name) => *name,
            _ => Name::EMPTY,
        };
        Diagnostic::error(
            DiagnosticKind::Interface,
            format!("unknown interface `{}`", self.interner.lookup(name)),
            span,
        )
    }

    // ===== Definitions =====

    fn check_def(&mut self, def: &DefDecl) -> Result<(), Diagnostic> {
        let Some(sig) = self.sigs.get(&def.name).cloned() else {
            return Ok(());
        };

        let mut ctx = TypeContext::new();
        for (param, ty) in def.params.iter().zip(&sig.params) {
            let binding = match ty {
                Type::Mailbox {
                    interface,
                    cap: Capability::Receive,
                } => Binding::unique(*interface, None, param.span),
                Type::Mailbox {
                    interface,
                    cap: Capability::Send,
                } => Binding::shared(*interface, param.span),
                other => Binding::value(other.clone(), param.span),
            };
            ctx.insert(param.name, binding);
        }

        self.expr_type(def.body, &mut ctx, Some(&sig.ret))?;
        self.finish_scope(ctx.pop_scope())?;
        Ok(())
    }

    /// Leak-check bindings leaving scope; record send capabilities that were
    /// never used for the constraint solver.
    fn finish_scope(&mut self, bindings: Vec<(Name, Binding)>) -> Result<(), Diagnostic> {
        for (name, binding) in bindings {
            match binding.state {
                CapState::Unique { .. } if !binding.consumed() => {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        format!(
                            "receive capability `{}` is never consumed; free it or pass it on",
                            self.interner.lookup(name)
                        ),
                        binding.introduced,
                    ));
                }
                CapState::Shared if !binding.read => {
                    if let Some(interface) = binding.interface() {
                        self.constraints
                            .record_unused_cap(interface, name, binding.introduced);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // ===== Expressions =====

    /// Bidirectional workhorse: infers the type of `id`, checking against
    /// `expected` when one is supplied. Expectations are pushed into tail
    /// positions so a returned receive capability is consumed where it is
    /// returned.
    fn expr_type(
        &mut self,
        id: ExprId,
        ctx: &mut TypeContext,
        expected: Option<&Type>,
    ) -> Result<Type, Diagnostic> {
        let expr = self.arena.get(id);
        let span = expr.span;

        let found = match &expr.kind {
            ExprKind::Unit => Type::Unit,
            ExprKind::Int(_) => Type::Int,
            ExprKind::Str(_) => Type::String,
            ExprKind::Bool(_) => Type::Bool,

            ExprKind::Var(name) => return self.var_use(*name, span, ctx, expected),

            ExprKind::Neg(operand) => {
                self.expr_type(*operand, ctx, Some(&Type::Int))?;
                Type::Int
            }

            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, *lhs, *rhs, span, ctx)?,

            ExprKind::Seq { first, rest } => {
                let first_ty = self.expr_type(*first, ctx, None)?;
                if matches!(
                    first_ty,
                    Type::Mailbox {
                        cap: Capability::Receive,
                        ..
                    }
                ) && !matches!(self.arena.get(*first).kind, ExprKind::Var(_))
                {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        "a receive capability is discarded here; bind it or pass it on",
                        self.arena.get(*first).span,
                    ));
                }
                return self.expr_type(*rest, ctx, expected);
            }

            ExprKind::Let { name, value, body } => {
                let binding = self.bind_value(*value, ctx)?;
                ctx.push_scope();
                ctx.insert(*name, binding);
                let ty = self.expr_type(*body, ctx, expected)?;
                self.finish_scope(ctx.pop_scope())?;
                return Ok(ty);
            }

            ExprKind::New { interface } => {
                if !self.registry.contains(*interface) {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Interface,
                        format!(
                            "unknown interface `{}`",
                            self.interner.lookup(*interface)
                        ),
                        span,
                    ));
                }
                if let Some(Type::Mailbox {
                    cap: Capability::Send,
                    ..
                }) = expected
                {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        "the receive capability of this new mailbox is discarded; bind it first",
                        span,
                    ));
                }
                Type::Mailbox {
                    interface: *interface,
                    cap: Capability::Receive,
                }
            }

            ExprKind::Spawn { body } => {
                self.expr_type(*body, ctx, Some(&Type::Unit))?;
                Type::Unit
            }

            ExprKind::Free { target, .. } => {
                return self.check_free(*target, span, ctx, expected);
            }

            ExprKind::Send {
                target,
                tag,
                tag_span,
                args,
            } => {
                let target_ty = self.expr_type(*target, ctx, None)?;
                let Type::Mailbox { interface, .. } = target_ty else {
                    return Err(Diagnostic::error(
                        DiagnosticKind::MessageType,
                        format!(
                            "cannot send a message to a value of type `{}`",
                            target_ty.render(self.interner)
                        ),
                        self.arena.get(*target).span,
                    ));
                };
                let payloads = self.message_payloads(interface, *tag, *tag_span)?;
                if payloads.len() != args.len() {
                    return Err(Diagnostic::error(
                        DiagnosticKind::MessageType,
                        format!(
                            "message `{}` expects {} argument(s), found {}",
                            self.interner.lookup(*tag),
                            payloads.len(),
                            args.len()
                        ),
                        span,
                    ));
                }
                for (arg, payload) in args.iter().zip(&payloads) {
                    self.expr_type(*arg, ctx, Some(payload))?;
                }
                self.constraints.record_send(interface, *tag, span);
                Type::Unit
            }

            ExprKind::Call {
                callee,
                callee_span,
                args,
            } => {
                let sig = match self.sigs.get(callee).or_else(|| self.builtins.get(callee)) {
                    Some(sig) => sig.clone(),
                    None => {
                        return Err(Diagnostic::error(
                            DiagnosticKind::MessageType,
                            format!(
                                "cannot find definition `{}`",
                                self.interner.lookup(*callee)
                            ),
                            *callee_span,
                        ));
                    }
                };
                if sig.params.len() != args.len() {
                    return Err(Diagnostic::error(
                        DiagnosticKind::MessageType,
                        format!(
                            "`{}` expects {} argument(s), found {}",
                            self.interner.lookup(*callee),
                            sig.params.len(),
                            args.len()
                        ),
                        span,
                    ));
                }
                for (arg, param) in args.iter().zip(&sig.params) {
                    self.expr_type(*arg, ctx, Some(param))?;
                }
                sig.ret
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expr_type(*cond, ctx, Some(&Type::Bool))?;

                let base = ctx.clone();
                let mut then_ctx = base.clone();
                let then_ty = self.expr_type(*then_branch, &mut then_ctx, expected)?;
                let mut else_ctx = base;
                self.expr_type(*else_branch, &mut else_ctx, Some(&then_ty))?;

                if then_ctx.consumption() != else_ctx.consumption() {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        "`if` branches disagree on which capabilities they consume",
                        span,
                    ));
                }
                ctx.adopt(then_ctx, std::slice::from_ref(&else_ctx));
                return Ok(then_ty);
            }

            ExprKind::Guard {
                subject,
                subject_span,
                pattern,
                branches,
            } => {
                return self.check_guard(
                    *subject,
                    *subject_span,
                    pattern,
                    branches,
                    span,
                    ctx,
                    expected,
                );
            }
        };

        self.expect(found, expected, span)
    }

    fn expect(
        &self,
        found: Type,
        expected: Option<&Type>,
        span: Span,
    ) -> Result<Type, Diagnostic> {
        if let Some(expected) = expected {
            if !found.flows_into(expected) {
                return Err(Diagnostic::error(
                    DiagnosticKind::MessageType,
                    format!(
                        "type mismatch: expected `{}`, found `{}`",
                        expected.render(self.interner),
                        found.render(self.interner)
                    ),
                    span,
                ));
            }
        }
        Ok(found)
    }

    /// Variable use, with consumption when a receive capability is expected.
    fn var_use(
        &mut self,
        name: Name,
        span: Span,
        ctx: &mut TypeContext,
        expected: Option<&Type>,
    ) -> Result<Type, Diagnostic> {
        let interner = self.interner;
        let Some(binding) = ctx.lookup_mut(name) else {
            return Err(Diagnostic::error(
                DiagnosticKind::MessageType,
                format!("cannot find `{}` in this scope", interner.lookup(name)),
                span,
            ));
        };
        if binding.freed.is_some() {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!("use of `{}` after it was freed", interner.lookup(name)),
                span,
            ));
        }
        binding.read = true;
        let found = binding.ty.clone();

        if let Some(Type::Mailbox {
            cap: Capability::Receive,
            ..
        }) = expected
        {
            match binding.state {
                CapState::Unique { .. } => {
                    if binding.moved.is_some() {
                        return Err(Diagnostic::error(
                            DiagnosticKind::Linearity,
                            format!(
                                "the receive capability of `{}` was already transferred",
                                interner.lookup(name)
                            ),
                            span,
                        ));
                    }
                }
                CapState::Shared => {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        format!(
                            "`{}` is a send capability; the receive capability is required here",
                            interner.lookup(name)
                        ),
                        span,
                    ));
                }
                CapState::Value => {}
            }
            let checked = self.expect(found, expected, span)?;
            // Consumption happens only once the types line up.
            if let Some(binding) = ctx.lookup_mut(name) {
                binding.moved = Some(span);
            }
            return Ok(checked);
        }

        self.expect(found, expected, span)
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
        ctx: &mut TypeContext,
    ) -> Result<Type, Diagnostic> {
        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.expr_type(lhs, ctx, Some(&Type::Int))?;
                self.expr_type(rhs, ctx, Some(&Type::Int))?;
                Ok(Type::Int)
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.expr_type(lhs, ctx, Some(&Type::Int))?;
                self.expr_type(rhs, ctx, Some(&Type::Int))?;
                Ok(Type::Bool)
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let left = self.expr_type(lhs, ctx, None)?;
                if matches!(left, Type::Mailbox { .. }) {
                    return Err(Diagnostic::error(
                        DiagnosticKind::MessageType,
                        "mailbox capabilities cannot be compared",
                        span,
                    ));
                }
                self.expr_type(rhs, ctx, Some(&left))?;
                Ok(Type::Bool)
            }
        }
    }

    /// Create the binding for `let name = value in ...`.
    ///
    /// A variable on the right-hand side transfers its capability state to
    /// the new binding; anything else is classified by its inferred type.
    fn bind_value(&mut self, value: ExprId, ctx: &mut TypeContext) -> Result<Binding, Diagnostic> {
        let value_expr = self.arena.get(value);
        let span = value_expr.span;

        if let ExprKind::Var(source) = value_expr.kind {
            let interner = self.interner;
            let Some(binding) = ctx.lookup_mut(source) else {
                return Err(Diagnostic::error(
                    DiagnosticKind::MessageType,
                    format!("cannot find `{}` in this scope", interner.lookup(source)),
                    span,
                ));
            };
            if binding.freed.is_some() {
                return Err(Diagnostic::error(
                    DiagnosticKind::Linearity,
                    format!("use of `{}` after it was freed", interner.lookup(source)),
                    span,
                ));
            }
            binding.read = true;
            return match &binding.state {
                CapState::Unique { content } => {
                    if binding.moved.is_some() {
                        return Err(Diagnostic::error(
                            DiagnosticKind::Linearity,
                            format!(
                                "the receive capability of `{}` was already transferred",
                                interner.lookup(source)
                            ),
                            span,
                        ));
                    }
                    let content = content.clone();
                    let interface = binding.interface().unwrap_or(Name::EMPTY);
                    binding.moved = Some(span);
                    Ok(Binding::unique(interface, content, span))
                }
                CapState::Shared => {
                    let interface = binding.interface().unwrap_or(Name::EMPTY);
                    Ok(Binding::shared(interface, span))
                }
                CapState::Value => Ok(Binding::value(binding.ty.clone(), span)),
            };
        }

        let ty = self.expr_type(value, ctx, None)?;
        Ok(match ty {
            Type::Mailbox {
                interface,
                cap: Capability::Receive,
            } => Binding::unique(interface, None, span),
            Type::Mailbox {
                interface,
                cap: Capability::Send,
            } => Binding::shared(interface, span),
            other => Binding::value(other, span),
        })
    }

    /// `free(target)`: legal only on an owned receive capability whose
    /// content admits the empty mailbox. Kills the whole binding.
    fn check_free(
        &mut self,
        target: Name,
        span: Span,
        ctx: &mut TypeContext,
        expected: Option<&Type>,
    ) -> Result<Type, Diagnostic> {
        let interner = self.interner;
        let Some(binding) = ctx.lookup_mut(target) else {
            return Err(Diagnostic::error(
                DiagnosticKind::MessageType,
                format!("cannot find `{}` in this scope", interner.lookup(target)),
                span,
            ));
        };
        if binding.freed.is_some() {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!("`{}` is freed twice", interner.lookup(target)),
                span,
            ));
        }
        match &binding.state {
            CapState::Value => {
                return Err(Diagnostic::error(
                    DiagnosticKind::Linearity,
                    format!("cannot free `{}`: it is not a mailbox", interner.lookup(target)),
                    span,
                ));
            }
            CapState::Shared => {
                return Err(Diagnostic::error(
                    DiagnosticKind::Linearity,
                    format!(
                        "cannot free `{}`: only the receive capability may be freed",
                        interner.lookup(target)
                    ),
                    span,
                ));
            }
            CapState::Unique { content } => {
                if binding.moved.is_some() {
                    return Err(Diagnostic::error(
                        DiagnosticKind::Linearity,
                        format!(
                            "cannot free `{}`: its receive capability was transferred",
                            interner.lookup(target)
                        ),
                        span,
                    ));
                }
                if let Some(content) = content {
                    if !content.admits_empty() {
                        return Err(Diagnostic::error(
                            DiagnosticKind::Linearity,
                            format!(
                                "cannot free `{}`: its mailbox may still contain messages",
                                interner.lookup(target)
                            ),
                            span,
                        ));
                    }
                }
                binding.read = true;
                binding.freed = Some(span);
            }
        }
        self.expect(Type::Unit, expected, span)
    }

    fn message_payloads(
        &self,
        interface: Name,
        tag: Name,
        tag_span: Span,
    ) -> Result<Vec<Type>, Diagnostic> {
        let Some(info) = self.registry.get(interface) else {
            return Err(Diagnostic::error(
                DiagnosticKind::Interface,
                format!(
                    "unknown interface `{}`",
                    self.interner.lookup(interface)
                ),
                tag_span,
            ));
        };
        let Some(message) = info.message(tag) else {
            return Err(Diagnostic::error(
                DiagnosticKind::MessageType,
                format!(
                    "interface `{}` declares no message `{}`",
                    self.interner.lookup(interface),
                    self.interner.lookup(tag)
                ),
                tag_span,
            ));
        };
        Ok(message.payloads.clone())
    }

    // ===== Guards =====

    #[allow(clippy::too_many_arguments)]
    fn check_guard(
        &mut self,
        subject: Name,
        subject_span: Span,
        pattern: &MailboxPattern,
        branches: &[GuardBranch],
        guard_span: Span,
        ctx: &mut TypeContext,
        expected: Option<&Type>,
    ) -> Result<Type, Diagnostic> {
        let interface = self.guard_subject(subject, subject_span, ctx)?;
        let current = ctx
            .lookup(subject)
            .and_then(|binding| binding.content().cloned());

        // Every tag in the asserted pattern must belong to the interface.
        let mut tags = Vec::new();
        pattern_tags(pattern, &mut tags);
        for (tag, tag_span) in &tags {
            self.message_payloads(interface, *tag, *tag_span)?;
        }

        let canon = canonicalize(pattern);
        let rendered = pattern.render(self.interner);

        // A nested guard must stay within what the outer narrowing left.
        if let Some(current) = current {
            let tags_ok = current
                .derivable_tags()
                .is_subset(&canon.derivable_tags());
            let empty_ok = !current.admits_empty() || canon.admits_empty();
            if !tags_ok || !empty_ok {
                return Err(Diagnostic::error(
                    DiagnosticKind::ConstraintUnsatisfiable,
                    format!(
                        "guard pattern `{rendered}` does not cover the remaining content of `{}`",
                        self.interner.lookup(subject)
                    ),
                    pattern.span,
                ));
            }
        }

        self.check_exhaustiveness(subject, &canon, &rendered, branches, guard_span)?;

        self.constraints.record_guard(
            interface,
            rendered.clone(),
            canon.mandatory_tags(),
            guard_span,
        );

        // Check each branch in its own context split.
        let base = ctx.clone();
        let mut result_ty = expected.cloned();
        let mut branch_ctxs: Vec<TypeContext> = Vec::with_capacity(branches.len());

        for branch in branches {
            let mut bctx = base.clone();
            let ty = match &branch.kind {
                GuardBranchKind::Free => {
                    if let Some(binding) = bctx.lookup_mut(subject) {
                        binding.freed = Some(branch.span);
                    }
                    self.expr_type(branch.body, &mut bctx, result_ty.as_ref())?
                }
                GuardBranchKind::Receive {
                    tag,
                    tag_span,
                    binders,
                    source,
                    source_span,
                } => self.check_receive_branch(
                    subject, &canon, *tag, *tag_span, binders, *source, *source_span, branch,
                    &mut bctx, result_ty.as_ref(),
                )?,
            };
            if result_ty.is_none() {
                result_ty = Some(ty);
            }
            branch_ctxs.push(bctx);
        }

        // Branches must agree on what they consumed.
        if let Some((first, rest)) = branch_ctxs.split_first() {
            let signature = first.consumption();
            if rest.iter().any(|c| c.consumption() != signature) {
                return Err(Diagnostic::error(
                    DiagnosticKind::Linearity,
                    "guard branches disagree on which capabilities they consume",
                    guard_span,
                ));
            }
        }

        let mut iter = branch_ctxs.into_iter();
        if let Some(first) = iter.next() {
            let rest: Vec<TypeContext> = iter.collect();
            ctx.adopt(first, &rest);
        }

        self.pending_guards.push(format!(
            "guard {}: {rendered}",
            self.interner.lookup(subject)
        ));

        match result_ty {
            Some(ty) => Ok(ty),
            None => Err(Diagnostic::error(
                DiagnosticKind::GuardExhaustiveness,
                format!(
                    "guard on `{}` has no branches",
                    self.interner.lookup(subject)
                ),
                guard_span,
            )),
        }
    }

    /// The guarded variable must own its receive capability.
    fn guard_subject(
        &mut self,
        subject: Name,
        subject_span: Span,
        ctx: &mut TypeContext,
    ) -> Result<Name, Diagnostic> {
        let interner = self.interner;
        let Some(binding) = ctx.lookup_mut(subject) else {
            return Err(Diagnostic::error(
                DiagnosticKind::MessageType,
                format!("cannot find `{}` in this scope", interner.lookup(subject)),
                subject_span,
            ));
        };
        if binding.freed.is_some() {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!("use of `{}` after it was freed", interner.lookup(subject)),
                subject_span,
            ));
        }
        binding.read = true;
        let Some(interface) = binding.interface() else {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!(
                    "cannot guard `{}`: it is not a mailbox",
                    interner.lookup(subject)
                ),
                subject_span,
            ));
        };
        match binding.state {
            CapState::Shared => Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!(
                    "cannot guard `{}`: the receive capability is required",
                    interner.lookup(subject)
                ),
                subject_span,
            )),
            CapState::Unique { .. } if binding.moved.is_some() => Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!(
                    "the receive capability of `{}` was already transferred",
                    interner.lookup(subject)
                ),
                subject_span,
            )),
            _ => Ok(interface),
        }
    }

    /// Guard exhaustiveness: a branch for every tag the pattern can deliver
    /// next, a `free` branch exactly when the empty case is reachable, and
    /// no unreachable or duplicate branches.
    fn check_exhaustiveness(
        &self,
        subject: Name,
        canon: &Canon,
        rendered: &str,
        branches: &[GuardBranch],
        guard_span: Span,
    ) -> Result<(), Diagnostic> {
        let required = canon.derivable_tags();
        let needs_free = canon.admits_empty();

        let mut seen_tags = FxHashSet::default();
        let mut seen_free = false;

        for branch in branches {
            match &branch.kind {
                GuardBranchKind::Free => {
                    if seen_free {
                        return Err(Diagnostic::error(
                            DiagnosticKind::GuardExhaustiveness,
                            "duplicate `free` branch",
                            branch.span,
                        ));
                    }
                    if !needs_free {
                        return Err(Diagnostic::error(
                            DiagnosticKind::GuardExhaustiveness,
                            format!(
                                "unreachable `free` branch: pattern `{rendered}` always requires a message"
                            ),
                            branch.span,
                        ));
                    }
                    seen_free = true;
                }
                GuardBranchKind::Receive { tag, tag_span, .. } => {
                    if !seen_tags.insert(*tag) {
                        return Err(Diagnostic::error(
                            DiagnosticKind::GuardExhaustiveness,
                            format!(
                                "duplicate `receive {}` branch",
                                self.interner.lookup(*tag)
                            ),
                            *tag_span,
                        ));
                    }
                    if !required.contains(tag) {
                        return Err(Diagnostic::error(
                            DiagnosticKind::GuardExhaustiveness,
                            format!(
                                "unreachable branch: no `{}` message can arrive under pattern `{rendered}`",
                                self.interner.lookup(*tag)
                            ),
                            *tag_span,
                        ));
                    }
                }
            }
        }

        for tag in &required {
            if !seen_tags.contains(tag) {
                return Err(Diagnostic::error(
                    DiagnosticKind::GuardExhaustiveness,
                    format!(
                        "guard on `{}` is missing a branch for message `{}`",
                        self.interner.lookup(subject),
                        self.interner.lookup(*tag)
                    ),
                    guard_span,
                ));
            }
        }
        if needs_free && !seen_free {
            return Err(Diagnostic::error(
                DiagnosticKind::GuardExhaustiveness,
                format!(
                    "guard on `{}` allows the empty mailbox but has no `free` branch",
                    self.interner.lookup(subject)
                ),
                guard_span,
            ));
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn check_receive_branch(
        &mut self,
        subject: Name,
        canon: &Canon,
        tag: Name,
        tag_span: Span,
        binders: &[Binder],
        source: Name,
        source_span: Span,
        branch: &GuardBranch,
        bctx: &mut TypeContext,
        expected: Option<&Type>,
    ) -> Result<Type, Diagnostic> {
        if source != subject {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!(
                    "receive from `{}` inside a guard of `{}`",
                    self.interner.lookup(source),
                    self.interner.lookup(subject)
                ),
                source_span,
            ));
        }

        let Some(residual) = canon.derive(tag) else {
            // Filtered out by the exhaustiveness check.
            return Err(Diagnostic::error(
                DiagnosticKind::GuardExhaustiveness,
                format!(
                    "no `{}` message can arrive here",
                    self.interner.lookup(tag)
                ),
                tag_span,
            ));
        };

        let interface = bctx
            .lookup(subject)
            .and_then(Binding::interface)
            .unwrap_or(Name::EMPTY);
        let payloads = self.message_payloads(interface, tag, tag_span)?;
        if payloads.len() != binders.len() {
            return Err(Diagnostic::error(
                DiagnosticKind::MessageType,
                format!(
                    "message `{}` carries {} value(s), but {} are bound",
                    self.interner.lookup(tag),
                    payloads.len(),
                    binders.len()
                ),
                branch.span,
            ));
        }

        if let Some(binding) = bctx.lookup_mut(subject) {
            binding.set_content(residual);
        }

        bctx.push_scope();
        for (binder, payload) in binders.iter().zip(&payloads) {
            let binding = match payload {
                Type::Mailbox {
                    interface,
                    cap: Capability::Receive,
                } => Binding::unique(*interface, None, binder.span),
                Type::Mailbox {
                    interface,
                    cap: Capability::Send,
                } => Binding::shared(*interface, binder.span),
                other => Binding::value(other.clone(), binder.span),
            };
            bctx.insert(binder.name, binding);
        }

        let ty = self.expr_type(branch.body, bctx, expected)?;
        self.finish_scope(bctx.pop_scope())?;

        let consumed = bctx
            .lookup(subject)
            .map(Binding::consumed)
            .unwrap_or(true);
        if !consumed {
            return Err(Diagnostic::error(
                DiagnosticKind::Linearity,
                format!(
                    "receive capability `{}` is not consumed in this branch",
                    self.interner.lookup(subject)
                ),
                branch.span,
            ));
        }

        Ok(ty)
    }
}
