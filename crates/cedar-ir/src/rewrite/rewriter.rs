//! PatternRewriter: accumulates mutations from a pattern rewrite.
//!
//! Patterns record what should happen; the driver applies the recorded
//! mutations after the pattern returns, so the use-redirection (RAUW) and
//! erasure are atomic with respect to the rest of the sweep.

use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};
use crate::rewrite::type_converter::TypeConverter;

/// Accumulated mutations from a pattern rewrite.
pub(crate) struct Mutations {
    /// Operations to insert before the current op's position.
    pub(crate) prefix_ops: Vec<OpRef>,
    /// The replacement operation (if any).
    pub(crate) replacement: Option<OpRef>,
    /// If set, the operation is erased and its results mapped to these values.
    pub(crate) erase_values: Option<Vec<ValueRef>>,
}

/// Rewriter handed to patterns.
pub struct PatternRewriter<'a> {
    type_converter: &'a TypeConverter,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
}

impl<'a> PatternRewriter<'a> {
    pub(crate) fn new(type_converter: &'a TypeConverter) -> Self {
        Self {
            type_converter,
            prefix_ops: Vec::new(),
            replacement: None,
            erase_values: None,
        }
    }

    /// The type converter of the running conversion.
    pub fn type_converter(&self) -> &TypeConverter {
        self.type_converter
    }

    // === Mutations ===

    /// Insert an operation before the current operation.
    ///
    /// The op must already be created via `ctx.create_op()` but not yet
    /// attached to a block. Multiple calls accumulate in order.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Replace the current operation with a new one.
    ///
    /// The driver will RAUW old results onto new results (1:1 by position),
    /// then erase the old op.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.replacement = Some(new_op);
    }

    /// Erase the current operation, mapping its results to the given values.
    ///
    /// The replacement values must match the original result count.
    pub fn erase_op(&mut self, replacement_values: Vec<ValueRef>) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.erase_values = Some(replacement_values);
    }

    /// Replace the current op and also insert prefix ops in one call.
    pub fn replace_with_prefix(&mut self, prefix: Vec<OpRef>, replacement: OpRef) {
        self.prefix_ops.extend(prefix);
        self.replace_op(replacement);
    }

    // === Query ===

    pub(crate) fn has_mutations(&self) -> bool {
        !self.prefix_ops.is_empty() || self.replacement.is_some() || self.erase_values.is_some()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
        }
    }
}

/// Apply recorded mutations to the IR context.
///
/// Called by the driver after a pattern returns `true`.
pub(crate) fn apply_mutations(ctx: &mut IrContext, original_op: OpRef, mutations: Mutations) {
    let parent_block = ctx.op(original_op).parent_block;

    // 1. Insert prefix ops before the original op.
    if let Some(block) = parent_block {
        for prefix_op in &mutations.prefix_ops {
            ctx.insert_op_before(block, original_op, *prefix_op);
        }
    }

    // 2. Handle replacement or erasure.
    if let Some(new_op) = mutations.replacement {
        let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
        let new_results: Vec<ValueRef> = ctx.op_results(new_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            new_results.len(),
            "replace_op: result count mismatch ({} vs {})",
            old_results.len(),
            new_results.len()
        );
        for (old_v, new_v) in old_results.iter().zip(new_results.iter()) {
            ctx.replace_all_uses(*old_v, *new_v);
        }

        // Put the new op in the old op's position.
        if let Some(block) = parent_block {
            let pos = ctx.block(block).ops.iter().position(|&o| o == original_op);
            ctx.detach_op(original_op);
            match pos {
                Some(pos) if pos < ctx.block(block).ops.len() => {
                    let before = ctx.block(block).ops[pos];
                    ctx.insert_op_before(block, before, new_op);
                }
                _ => ctx.push_op(block, new_op),
            }
        }

        ctx.remove_op(original_op);
    } else if let Some(erase_values) = mutations.erase_values {
        let old_results: Vec<ValueRef> = ctx.op_results(original_op).to_vec();
        debug_assert_eq!(
            old_results.len(),
            erase_values.len(),
            "erase_op: replacement value count mismatch ({} vs {})",
            old_results.len(),
            erase_values.len()
        );
        for (old_v, new_v) in old_results.iter().zip(erase_values.iter()) {
            ctx.replace_all_uses(*old_v, *new_v);
        }

        ctx.detach_op(original_op);
        ctx.remove_op(original_op);
    }
}
