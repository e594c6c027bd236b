//! Structural validation for the IR.
//!
//! Run by the pipeline after the final conversion stage: a failure here
//! means a rewrite pattern produced ill-formed output, which is a distinct
//! (and always fatal) condition from a conversion failing to legalize.
//!
//! Checks:
//! 1. Parent-link consistency (region nesting well-formedness).
//! 2. At most one terminator per block, as the last operation; function
//!    body blocks must end with one.
//! 3. Operand scoping: every operand resolves to a value defined inside
//!    the enclosing function, and same-block defs precede their uses.
//! 4. Terminator/successor agreement, including branch argument types
//!    against destination block arguments.
//! 5. Return arity/types against the enclosing function signature.
//! 6. Use-chain consistency between operand lists and recorded uses.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::dialect::core::Module;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, ValueDef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;
use crate::walk::{self, WalkAction};

/// Operation kinds that transfer control or return.
pub fn is_terminator(dialect: Symbol, name: Symbol) -> bool {
    let ret = Symbol::new("return");
    (name == ret
        && (dialect == Symbol::new("cedar")
            || dialect == Symbol::new("func")
            || dialect == Symbol::new("clif")))
        || (dialect == Symbol::new("cf")
            && (name == Symbol::new("br") || name == Symbol::new("cond_br")))
        || (dialect == Symbol::new("clif")
            && (name == Symbol::new("jump") || name == Symbol::new("brif")))
}

fn is_func_like(ctx: &IrContext, op: OpRef) -> bool {
    let data = ctx.op(op);
    data.name == Symbol::new("func")
        && (data.dialect == Symbol::new("cedar")
            || data.dialect == Symbol::new("func")
            || data.dialect == Symbol::new("clif"))
}

fn is_return(ctx: &IrContext, op: OpRef) -> bool {
    let data = ctx.op(op);
    data.name == Symbol::new("return")
        && (data.dialect == Symbol::new("cedar")
            || data.dialect == Symbol::new("func")
            || data.dialect == Symbol::new("clif"))
}

/// Structural verification failure: one or more invariant violations.
#[derive(Debug)]
pub struct VerificationError {
    pub diags: Vec<String>,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verification failed ({} error(s)):", self.diags.len())?;
        for diag in &self.diags {
            writeln!(f, "  - {diag}")?;
        }
        Ok(())
    }
}

impl std::error::Error for VerificationError {}

/// Verify the structural invariants of a module.
pub fn verify_module(ctx: &IrContext, module: Module) -> Result<(), VerificationError> {
    let mut diags = Vec::new();

    check_parent_links(ctx, module.op_ref(), &mut diags);
    check_functions(ctx, module, &mut diags);
    check_use_chains(ctx, module, &mut diags);

    if diags.is_empty() {
        Ok(())
    } else {
        Err(VerificationError { diags })
    }
}

// ============================================================================
// 1. Parent-link consistency
// ============================================================================

fn check_parent_links(ctx: &IrContext, op: OpRef, diags: &mut Vec<String>) {
    for &region in &ctx.op(op).regions {
        if ctx.region(region).parent_op != Some(op) {
            diags.push(format!(
                "region {region} of {} has inconsistent parent_op",
                ctx.op_full_name(op),
            ));
        }
        for &block in &ctx.region(region).blocks {
            if ctx.block(block).parent_region != Some(region) {
                diags.push(format!(
                    "block {block} in region {region} has inconsistent parent_region",
                ));
            }
            for &inner in &ctx.block(block).ops {
                if ctx.op(inner).parent_block != Some(block) {
                    diags.push(format!(
                        "operation {} ({inner}) has inconsistent parent_block",
                        ctx.op_full_name(inner),
                    ));
                }
                check_parent_links(ctx, inner, diags);
            }
        }
    }
}

// ============================================================================
// 2–5. Per-function checks
// ============================================================================

fn check_functions(ctx: &IrContext, module: Module, diags: &mut Vec<String>) {
    for op in module.ops(ctx) {
        if is_func_like(ctx, op) {
            check_function(ctx, op, diags);
        }
    }
}

fn function_name(ctx: &IrContext, op: OpRef) -> String {
    ctx.op(op)
        .attributes
        .get(&Symbol::new("sym_name"))
        .and_then(Attribute::as_symbol)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<unnamed>".to_string())
}

fn check_function(ctx: &IrContext, func_op: OpRef, diags: &mut Vec<String>) {
    let fn_name = function_name(ctx, func_op);
    let Some(&body) = ctx.op(func_op).regions.first() else {
        diags.push(format!("@{fn_name}: function has no body region"));
        return;
    };

    // Collect every value defined inside the function's region tree.
    let mut defined = HashSet::new();
    collect_defined_in_region(ctx, body, &mut defined);

    for &block in ctx.region(body).blocks.clone().iter() {
        check_block(ctx, block, body, &defined, &fn_name, diags);
    }

    check_returns(ctx, func_op, body, &fn_name, diags);
}

fn collect_defined_in_region(ctx: &IrContext, region: RegionRef, defined: &mut HashSet<ValueRef>) {
    for &block in &ctx.region(region).blocks {
        for &arg in ctx.block_args(block) {
            defined.insert(arg);
        }
        for &op in &ctx.block(block).ops {
            for &result in ctx.op_results(op) {
                defined.insert(result);
            }
            for &nested in &ctx.op(op).regions {
                collect_defined_in_region(ctx, nested, defined);
            }
        }
    }
}

fn describe_value(ctx: &IrContext, v: ValueRef) -> String {
    match ctx.value_def(v) {
        ValueDef::OpResult(op, idx) => {
            format!("result #{idx} of {}", ctx.op_full_name(op))
        }
        ValueDef::BlockArg(block, idx) => format!("argument #{idx} of {block}"),
    }
}

fn check_block(
    ctx: &IrContext,
    block: BlockRef,
    region: RegionRef,
    defined: &HashSet<ValueRef>,
    fn_name: &str,
    diags: &mut Vec<String>,
) {
    let ops = ctx.block(block).ops.clone();
    let mut seen_in_block: HashSet<ValueRef> = HashSet::new();

    for (pos, &op) in ops.iter().enumerate() {
        let is_last = pos + 1 == ops.len();
        let data = ctx.op(op);
        let terminator = is_terminator(data.dialect, data.name);

        // 2. Terminator placement.
        if terminator && !is_last {
            diags.push(format!(
                "@{fn_name}: {} in {block} is a terminator but not the last operation",
                ctx.op_full_name(op),
            ));
        }
        if is_last && !terminator {
            diags.push(format!(
                "@{fn_name}: block {block} does not end with a terminator",
            ));
        }

        // 3. Operand scoping and same-block ordering.
        for (i, &operand) in ctx.op_operands(op).iter().enumerate() {
            if !defined.contains(&operand) {
                diags.push(format!(
                    "@{fn_name}: operand #{i} of {} references {} defined outside the function",
                    ctx.op_full_name(op),
                    describe_value(ctx, operand),
                ));
                continue;
            }
            if let ValueDef::OpResult(def_op, _) = ctx.value_def(operand) {
                if ctx.op(def_op).parent_block == Some(block) && !seen_in_block.contains(&operand) {
                    diags.push(format!(
                        "@{fn_name}: operand #{i} of {} uses {} before its definition",
                        ctx.op_full_name(op),
                        describe_value(ctx, operand),
                    ));
                }
            }
        }

        // 4. Successor agreement.
        if !data.successors.is_empty() && !terminator {
            diags.push(format!(
                "@{fn_name}: non-terminator {} carries successors",
                ctx.op_full_name(op),
            ));
        }
        for &succ in &data.successors {
            if ctx.block(succ).parent_region != Some(region) {
                diags.push(format!(
                    "@{fn_name}: successor {succ} of {} is not in the same region",
                    ctx.op_full_name(op),
                ));
            }
        }
        check_branch_args(ctx, op, fn_name, diags);

        for &result in ctx.op_results(op) {
            seen_in_block.insert(result);
        }
    }

    if ops.is_empty() {
        diags.push(format!(
            "@{fn_name}: block {block} is empty (missing terminator)",
        ));
    }
}

// Branches carrying block arguments must agree with the destination.
fn check_branch_args(ctx: &IrContext, op: OpRef, fn_name: &str, diags: &mut Vec<String>) {
    let data = ctx.op(op);
    let carries_args = (data.dialect == Symbol::new("cf") && data.name == Symbol::new("br"))
        || (data.dialect == Symbol::new("clif") && data.name == Symbol::new("jump"));
    if !carries_args {
        return;
    }
    let Some(&dest) = data.successors.first() else {
        return;
    };
    let operands = ctx.op_operands(op);
    let dest_args = ctx.block_args(dest);
    if operands.len() != dest_args.len() {
        diags.push(format!(
            "@{fn_name}: {} passes {} argument(s) but {dest} expects {}",
            ctx.op_full_name(op),
            operands.len(),
            dest_args.len(),
        ));
        return;
    }
    for (i, (&arg, &param)) in operands.iter().zip(dest_args.iter()).enumerate() {
        if ctx.value_ty(arg) != ctx.value_ty(param) {
            diags.push(format!(
                "@{fn_name}: argument #{i} of {} does not match the type of {}",
                ctx.op_full_name(op),
                describe_value(ctx, param),
            ));
        }
    }
}

// 5. Return arity/types against the function signature.
fn check_returns(
    ctx: &IrContext,
    func_op: OpRef,
    body: RegionRef,
    fn_name: &str,
    diags: &mut Vec<String>,
) {
    let Some(fn_ty) = ctx
        .op(func_op)
        .attributes
        .get(&Symbol::new("type"))
        .and_then(Attribute::as_type)
    else {
        diags.push(format!("@{fn_name}: function has no type attribute"));
        return;
    };
    let ty_data = ctx.types.get(fn_ty);
    let Some(&result_ty) = ty_data.params.first() else {
        diags.push(format!("@{fn_name}: function type has no result"));
        return;
    };
    let result_data = ctx.types.get(result_ty);
    let returns_nothing =
        result_data.dialect == Symbol::new("core") && result_data.name == Symbol::new("nil");

    let mut returns = Vec::new();
    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        if is_return(ctx, op) {
            returns.push(op);
        }
        ControlFlow::Continue(WalkAction::Advance)
    });

    for ret in returns {
        let operands = ctx.op_operands(ret);
        if returns_nothing {
            if !operands.is_empty() {
                diags.push(format!(
                    "@{fn_name}: {} returns {} value(s) from a function with no result",
                    ctx.op_full_name(ret),
                    operands.len(),
                ));
            }
        } else if operands.len() != 1 {
            diags.push(format!(
                "@{fn_name}: {} returns {} value(s), expected 1",
                ctx.op_full_name(ret),
                operands.len(),
            ));
        } else if ctx.value_ty(operands[0]) != result_ty {
            diags.push(format!(
                "@{fn_name}: {} operand type does not agree with the declared result type",
                ctx.op_full_name(ret),
            ));
        }
    }
}

// ============================================================================
// 6. Use-chain consistency
// ============================================================================

fn check_use_chains(ctx: &IrContext, module: Module, diags: &mut Vec<String>) {
    let body = module.body(ctx);

    // All (value, user, index) triples from actual operand lists.
    let mut actual_uses: HashSet<(ValueRef, OpRef, u32)> = HashSet::new();
    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        for (idx, &operand) in ctx.op_operands(op).iter().enumerate() {
            actual_uses.insert((operand, op, idx as u32));
        }
        ControlFlow::Continue(WalkAction::Advance)
    });

    // Direction 1: every actual operand must have a use-chain entry.
    for &(val, op, idx) in &actual_uses {
        let found = ctx
            .uses(val)
            .iter()
            .any(|u| u.user == op && u.operand_index == idx);
        if !found {
            diags.push(format!(
                "operand #{idx} of {} uses {val} but no use-chain entry exists",
                ctx.op_full_name(op),
            ));
        }
    }

    // Direction 2: every use-chain entry on a value referenced in the module
    // must correspond to an actual operand.
    let mut values: HashSet<ValueRef> = HashSet::new();
    let _ = walk::walk_region::<()>(ctx, body, &mut |op| {
        for &v in ctx.op_results(op) {
            values.insert(v);
        }
        for &v in ctx.op_operands(op) {
            values.insert(v);
        }
        ControlFlow::Continue(WalkAction::Advance)
    });

    for &val in &values {
        for u in ctx.uses(val) {
            // The user may legitimately live outside this module's tree
            // (detached ops are arena garbage); only flag users inside it.
            let inside = ctx.op(u.user).parent_block.is_some();
            if inside && !actual_uses.contains(&(val, u.user, u.operand_index)) {
                diags.push(format!(
                    "stale use-chain entry: {val} is recorded as used by {} at #{}, \
                     but the operand list disagrees",
                    ctx.op_full_name(u.user),
                    u.operand_index,
                ));
            }
        }
    }
}
