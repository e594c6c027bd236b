//! Stage 2: `convert-cedar-to-mem`.
//!
//! Eliminates the source dialect's memory-cell forms — `cedar.alloca`,
//! `cedar.load`, `cedar.store`, `cedar.const` — in favor of `mem.*`
//! references and `arith.const`. Arithmetic and control flow are left for
//! the target stage.

use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;
use cedar_ir::dialect::{arith, cedar, mem};
use cedar_ir::ops::DialectOp;
use cedar_ir::refs::OpRef;
use cedar_ir::rewrite::{ConversionDriver, ConversionTarget, PatternRewriter, RewritePattern};

use crate::convert;
use crate::pass::{Pass, PassError};

/// `cedar.alloca` → `mem.alloca`: a scalar stack slot becomes a zero-rank
/// memory-reference allocation of the converted element type; the
/// alignment attribute is preserved.
pub struct CedarAllocaLowering;

impl RewritePattern for CedarAllocaLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(alloca) = cedar::Alloca::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let align = alloca.align(ctx);
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);
        if !mem::is_ref_ty(ctx, result_ty) {
            // The element type has no memory-reference conversion.
            return false;
        }

        let new_op = mem::alloca(ctx, loc, result_ty, align);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarAllocaLowering"
    }
}

/// `cedar.load` → `mem.load`: 1:1 positional operand mapping.
pub struct CedarLoadLowering;

impl RewritePattern for CedarLoadLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(load) = cedar::Load::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let ptr = load.ptr(ctx);
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);

        let new_op = mem::load(ctx, loc, ptr, result_ty);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarLoadLowering"
    }
}

/// `cedar.store` → `mem.store`: 1:1 positional operand mapping
/// (pointer, then value).
pub struct CedarStoreLowering;

impl RewritePattern for CedarStoreLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(store) = cedar::Store::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let ptr = store.ptr(ctx);
        let value = store.value(ctx);
        let new_op = mem::store(ctx, loc, ptr, value);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarStoreLowering"
    }
}

/// `cedar.const` → `arith.const`: the value attribute and converted type
/// pass through.
pub struct CedarConstLowering;

impl RewritePattern for CedarConstLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(c) = cedar::Const::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let value = c.value(ctx);
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);

        let new_op = arith::r#const(ctx, loc, result_ty, value);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarConstLowering"
    }
}

/// The memory stage pass.
pub struct ConvertCedarToMem;

impl Pass for ConvertCedarToMem {
    fn name(&self) -> &'static str {
        "convert-cedar-to-mem"
    }

    fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError> {
        let mut target = ConversionTarget::new();
        target.add_legal_op("core", "module");
        target.add_legal_dialect("func");
        target.add_legal_dialect("mem");
        target.add_legal_dialect("arith");
        target.add_illegal_op("cedar", "alloca");
        target.add_illegal_op("cedar", "load");
        target.add_illegal_op("cedar", "store");
        target.add_illegal_op("cedar", "const");

        let driver = ConversionDriver::new(convert::cedar_to_generic())
            .add_pattern(CedarAllocaLowering)
            .add_pattern(CedarLoadLowering)
            .add_pattern(CedarStoreLowering)
            .add_pattern(CedarConstLowering);
        driver.apply_partial(ctx, module, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structural::ConvertCedarToFunc;
    use cedar_ir::dialect::func;
    use cedar_ir::parser::parse_module;
    use cedar_ir::symbol::Symbol;
    use cedar_ir::types::Attribute;

    fn run_stages(text: &str) -> (IrContext, Module) {
        let mut ctx = IrContext::new();
        let module = parse_module(&mut ctx, text).expect("should parse");
        ConvertCedarToFunc
            .run(&mut ctx, module)
            .expect("structural stage must succeed");
        ConvertCedarToMem
            .run(&mut ctx, module)
            .expect("memory stage must succeed");
        (ctx, module)
    }

    #[test]
    fn lowers_memory_cells() {
        let (ctx, module) = run_stages(
            "core.module @m {
  cedar.func @answer() -> cedar.i32 {
    %0 = cedar.alloca {align = 4} : cedar.ptr(cedar.i32)
    %1 = cedar.const {value = 42} : cedar.i32
    cedar.store %0, %1
    %2 = cedar.load %0 : cedar.i32
    cedar.return %2
  }
}
",
        );

        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let ops = ctx.block(entry).ops.to_vec();
        assert_eq!(ops.len(), 5);

        let alloca = mem::Alloca::from_op(&ctx, ops[0]).expect("mem.alloca");
        assert_eq!(alloca.align(&ctx), 4);
        let ref_ty = ctx.value_ty(alloca.result(&ctx));
        let elem = mem::ref_elem_ty(&ctx, ref_ty).expect("result must be mem.ref");
        assert_eq!(ctx.types.get(elem).dialect, Symbol::new("core"));
        assert_eq!(ctx.types.get(elem).name, Symbol::new("i32"));

        let c = arith::Const::from_op(&ctx, ops[1]).expect("arith.const");
        assert_eq!(c.value(&ctx), Attribute::IntBits(42));

        let store = mem::Store::from_op(&ctx, ops[2]).expect("mem.store");
        assert_eq!(store.ptr(&ctx), alloca.result(&ctx));
        assert_eq!(store.value(&ctx), c.result(&ctx));

        let load = mem::Load::from_op(&ctx, ops[3]).expect("mem.load");
        assert_eq!(load.ptr(&ctx), alloca.result(&ctx));

        let ret = func::Return::from_op(&ctx, ops[4]).expect("func.return");
        assert_eq!(ret.values(&ctx), &[load.result(&ctx)]);
    }

    #[test]
    fn arithmetic_passes_through() {
        let (ctx, module) = run_stages(
            "core.module @m {
  cedar.func @sum(%arg0: cedar.i32, %arg1: cedar.i32) -> cedar.i32 {
    %0 = arith.add %arg0, %arg1 : cedar.i32
    cedar.return %0
  }
}
",
        );
        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let ops = ctx.block(entry).ops.to_vec();
        // arith.add untouched, with its operands and result intact.
        let add = arith::Add::from_op(&ctx, ops[0]).expect("arith.add survives");
        let args: Vec<_> = ctx.block_args(entry).to_vec();
        assert_eq!(ctx.op_operands(add.op_ref()), args.as_slice());
    }

    #[test]
    fn memory_stage_alone_fails_without_patterns() {
        // Removing the alloca pattern makes the stage's illegal set
        // unsatisfiable for a module that allocates.
        let mut ctx = IrContext::new();
        let module = parse_module(
            &mut ctx,
            "core.module @m {
  cedar.func @mem() {
    %0 = cedar.alloca {align = 8} : cedar.ptr(cedar.i64)
    cedar.return
  }
}
",
        )
        .expect("should parse");
        ConvertCedarToFunc.run(&mut ctx, module).unwrap();

        let mut target = ConversionTarget::new();
        target.add_legal_op("core", "module");
        target.add_legal_dialect("func");
        target.add_legal_dialect("mem");
        target.add_illegal_op("cedar", "alloca");

        let driver = ConversionDriver::new(convert::cedar_to_generic());
        let err = driver.apply_partial(&mut ctx, module, &target).unwrap_err();
        let cedar_ir::rewrite::ConversionError::ConversionFailure { remaining } = err;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].dialect, Symbol::new("cedar"));
    }
}
