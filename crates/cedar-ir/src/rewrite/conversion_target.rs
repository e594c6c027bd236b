//! Conversion target: legality rules for one conversion stage.

use std::collections::HashSet;
use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef};
use crate::symbol::Symbol;
use crate::walk;

/// Result of a legality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Legality {
    /// The operation is acceptable output for this stage.
    Legal,
    /// The operation must be eliminated by this stage.
    Illegal,
    /// No rule covers the operation. Full conversion must still eliminate
    /// it; partial conversion passes it through.
    Unknown,
}

/// Dynamic legality check function signature.
type DynamicCheckFn = dyn Fn(&IrContext, OpRef) -> Option<Legality>;

/// Defines which ops/dialects are legal or illegal for one stage.
///
/// Resolution order: dynamic checks, specific op rules, dialect rules,
/// then `Unknown`.
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
    dynamic_checks: Vec<Box<DynamicCheckFn>>,
}

impl ConversionTarget {
    pub fn new() -> Self {
        Self {
            legal_dialects: HashSet::new(),
            illegal_dialects: HashSet::new(),
            legal_ops: HashSet::new(),
            illegal_ops: HashSet::new(),
            dynamic_checks: Vec::new(),
        }
    }

    /// Mark an entire dialect as legal.
    pub fn add_legal_dialect(&mut self, dialect: &str) {
        self.legal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    /// Mark an entire dialect as illegal.
    pub fn add_illegal_dialect(&mut self, dialect: &str) {
        self.illegal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    /// Mark a specific operation as legal.
    pub fn add_legal_op(&mut self, dialect: &str, op_name: &str) {
        self.legal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    /// Mark a specific operation as illegal.
    pub fn add_illegal_op(&mut self, dialect: &str, op_name: &str) {
        self.illegal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    /// Add a dynamic legality check.
    ///
    /// Return `Some(..)` to decide, `None` to defer to the static rules.
    pub fn add_dynamic_check(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> Option<Legality> + 'static,
    ) {
        self.dynamic_checks.push(Box::new(f));
    }

    /// Determine the legality of a specific operation.
    pub fn legality(&self, ctx: &IrContext, op: OpRef) -> Legality {
        for check in &self.dynamic_checks {
            if let Some(result) = check(ctx, op) {
                return result;
            }
        }

        let data = ctx.op(op);
        let key = (data.dialect, data.name);

        if self.legal_ops.contains(&key) {
            return Legality::Legal;
        }
        if self.illegal_ops.contains(&key) {
            return Legality::Illegal;
        }

        if self.legal_dialects.contains(&data.dialect) {
            return Legality::Legal;
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return Legality::Illegal;
        }

        Legality::Unknown
    }

    /// Convenience: is the operation legal?
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> bool {
        self.legality(ctx, op) == Legality::Legal
    }

    /// Collect all operations under `region` that are explicitly illegal.
    pub fn collect_illegal(&self, ctx: &IrContext, region: RegionRef) -> Vec<IllegalOp> {
        self.collect_if(ctx, region, |l| l == Legality::Illegal)
    }

    /// Collect all operations under `region` that are not legal
    /// (illegal or unknown) — the full-conversion failure set.
    pub fn collect_non_legal(&self, ctx: &IrContext, region: RegionRef) -> Vec<IllegalOp> {
        self.collect_if(ctx, region, |l| l != Legality::Legal)
    }

    fn collect_if(
        &self,
        ctx: &IrContext,
        region: RegionRef,
        pred: impl Fn(Legality) -> bool,
    ) -> Vec<IllegalOp> {
        let mut found = Vec::new();
        let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
            if pred(self.legality(ctx, op)) {
                let data = ctx.op(op);
                found.push(IllegalOp {
                    op,
                    dialect: data.dialect,
                    name: data.name,
                });
            }
            ControlFlow::Continue(walk::WalkAction::Advance)
        });
        found
    }
}

impl Default for ConversionTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// An operation that failed a legality check.
#[derive(Debug, Clone, Copy)]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}

impl std::fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} ({})", self.dialect, self.name, self.op)
    }
}
