//! Stage 1: `convert-cedar-to-func`.
//!
//! Eliminates the source dialect's structural forms — `cedar.func`,
//! `cedar.return`, `cedar.call` — in favor of the generic `func` dialect.
//! Functions are lowered first (the body region is transplanted into the
//! new header through a value mapper), then returns and calls in a second
//! partial conversion, because region contents are only visited once their
//! containing function has its converted signature.

use cedar_ir::clone::{ValueMapper, clone_region};
use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;
use cedar_ir::dialect::{cedar, func};
use cedar_ir::ops::DialectOp;
use cedar_ir::refs::{OpRef, TypeRef, ValueRef};
use cedar_ir::rewrite::{ConversionDriver, ConversionTarget, PatternRewriter, RewritePattern};

use crate::convert;
use crate::pass::{Pass, PassError};

/// `cedar.func` → `func.func` with a type-converted signature and a body
/// region cloned through a fresh value mapper.
pub struct CedarFuncLowering;

impl RewritePattern for CedarFuncLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(f) = cedar::Func::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let sym_name = f.sym_name(ctx);
        let fn_ty = f.ty(ctx);
        let src_body = f.body(ctx);

        let converter = rewriter.type_converter();
        let new_fn_ty = converter.convert_type_or_identity(ctx, fn_ty);

        let mut mapper = ValueMapper::new();
        let new_body = clone_region(ctx, src_body, &mut mapper, &mut |ctx, ty| {
            converter.convert_type_or_identity(ctx, ty)
        });

        let new_fn = func::func(ctx, loc, sym_name, new_fn_ty, new_body);
        rewriter.replace_op(new_fn.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarFuncLowering"
    }
}

/// `cedar.return` → `func.return`: operands pass through unchanged.
pub struct CedarReturnLowering;

impl RewritePattern for CedarReturnLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(ret) = cedar::Return::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let values: Vec<ValueRef> = ret.values(ctx).to_vec();
        let new_op = func::r#return(ctx, loc, values);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarReturnLowering"
    }
}

/// `cedar.call` → `func.call`: callee symbol and argument list are
/// preserved; result types go through the type converter.
pub struct CedarCallLowering;

impl RewritePattern for CedarCallLowering {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(call) = cedar::Call::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let callee = call.callee(ctx);
        let args: Vec<ValueRef> = call.args(ctx).to_vec();
        let result_tys: Vec<TypeRef> = ctx.op_result_types(op).to_vec();

        let converter = rewriter.type_converter();
        let result_tys: Vec<TypeRef> = result_tys
            .into_iter()
            .map(|ty| converter.convert_type_or_identity(ctx, ty))
            .collect();

        let new_op = func::call(ctx, loc, callee, args, result_tys);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CedarCallLowering"
    }
}

/// The structural stage pass.
pub struct ConvertCedarToFunc;

impl Pass for ConvertCedarToFunc {
    fn name(&self) -> &'static str {
        "convert-cedar-to-func"
    }

    fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError> {
        // Convert cedar.func to func.func.
        let mut fn_target = ConversionTarget::new();
        fn_target.add_legal_op("core", "module");
        fn_target.add_legal_op("func", "func");
        fn_target.add_illegal_op("cedar", "func");

        let fn_driver =
            ConversionDriver::new(convert::cedar_to_generic()).add_pattern(CedarFuncLowering);
        fn_driver.apply_partial(ctx, module, &fn_target)?;

        // Convert cedar.return -> func.return, cedar.call -> func.call.
        let mut ret_target = ConversionTarget::new();
        ret_target.add_legal_op("core", "module");
        ret_target.add_legal_op("func", "return");
        ret_target.add_legal_op("func", "call");
        ret_target.add_illegal_op("cedar", "return");
        ret_target.add_illegal_op("cedar", "call");

        let ret_driver = ConversionDriver::new(convert::cedar_to_generic())
            .add_pattern(CedarReturnLowering)
            .add_pattern(CedarCallLowering);
        ret_driver.apply_partial(ctx, module, &ret_target)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedar_ir::parser::parse_module;
    use cedar_ir::refs::ValueDef;
    use cedar_ir::symbol::Symbol;
    use cedar_ir::walk;
    use std::ops::ControlFlow;

    fn run_stage(text: &str) -> (IrContext, Module) {
        let mut ctx = IrContext::new();
        let module = parse_module(&mut ctx, text).expect("should parse");
        ConvertCedarToFunc
            .run(&mut ctx, module)
            .expect("stage must succeed");
        (ctx, module)
    }

    fn count_dialect_ops(ctx: &IrContext, module: Module, dialect: &'static str) -> usize {
        let mut count = 0;
        let _ = walk::walk_region::<()>(ctx, module.body(ctx), &mut |op| {
            if ctx.op(op).dialect == Symbol::new(dialect) {
                count += 1;
            }
            ControlFlow::Continue(walk::WalkAction::Advance)
        });
        count
    }

    #[test]
    fn lowers_func_return_call() {
        let (ctx, module) = run_stage(
            "core.module @m {
  cedar.func @id(%arg0: cedar.i32) -> cedar.i32 {
    cedar.return %arg0
  }
  cedar.func @caller(%arg0: cedar.i32) -> cedar.i32 {
    %0 = cedar.call %arg0 {callee = @id} : cedar.i32
    cedar.return %0
  }
}
",
        );

        assert_eq!(count_dialect_ops(&ctx, module, "cedar"), 0);

        let ops = module.ops(&ctx);
        assert_eq!(ops.len(), 2);
        let id_fn = func::Func::from_op(&ctx, ops[0]).expect("func.func");
        assert_eq!(id_fn.sym_name(&ctx), Symbol::new("id"));

        // Signature was type-converted.
        let (result, params) = func::fn_ty_parts(&ctx, id_fn.ty(&ctx)).unwrap();
        let result_data = ctx.types.get(result);
        assert_eq!(result_data.dialect, Symbol::new("core"));
        assert_eq!(result_data.name, Symbol::new("i32"));
        assert_eq!(params.len(), 1);
        assert_eq!(ctx.types.get(params[0]).dialect, Symbol::new("core"));

        // The caller's body holds func.call + func.return wired together.
        let caller = func::Func::from_op(&ctx, ops[1]).unwrap();
        let entry = ctx.region(caller.body(&ctx)).blocks[0];
        let body_ops = ctx.block(entry).ops.to_vec();
        assert_eq!(body_ops.len(), 2);
        let call = func::Call::from_op(&ctx, body_ops[0]).expect("func.call");
        assert_eq!(call.callee(&ctx), Symbol::new("id"));
        let ret = func::Return::from_op(&ctx, body_ops[1]).expect("func.return");
        assert_eq!(ret.values(&ctx), &[ctx.op_result(body_ops[0], 0)]);
    }

    #[test]
    fn return_preserves_arity_and_types() {
        let (ctx, module) = run_stage(
            "core.module @m {
  cedar.func @f(%arg0: cedar.i32) -> cedar.i32 {
    cedar.return %arg0
  }
}
",
        );
        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let ret = func::Return::from_op(&ctx, ctx.block(entry).ops[0]).unwrap();
        // One operand, and it is the (retyped) entry block argument.
        assert_eq!(ret.values(&ctx).len(), 1);
        assert_eq!(
            ctx.value_def(ret.values(&ctx)[0]),
            ValueDef::BlockArg(entry, 0)
        );
        let arg_ty = ctx.value_ty(ret.values(&ctx)[0]);
        assert_eq!(ctx.types.get(arg_ty).dialect, Symbol::new("core"));
    }

    #[test]
    fn body_clone_preserves_structure() {
        let (ctx, module) = run_stage(
            "core.module @m {
  cedar.func @two_blocks(%arg0: cedar.bool) -> cedar.i32 {
    cf.cond_br %arg0 [^bb1, ^bb2]
  ^bb1:
    %0 = cedar.const {value = 1} : cedar.i32
    cedar.return %0
  ^bb2:
    %1 = cedar.const {value = 2} : cedar.i32
    cedar.return %1
  }
}
",
        );
        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let blocks = ctx.region(f.body(&ctx)).blocks.to_vec();
        assert_eq!(blocks.len(), 3, "block count preserved");
        assert_eq!(ctx.block(blocks[0]).ops.len(), 1);
        assert_eq!(ctx.block(blocks[1]).ops.len(), 2);
        assert_eq!(ctx.block(blocks[2]).ops.len(), 2);

        // cond_br successors point at the cloned blocks of the same region.
        let cond_br = ctx.block(blocks[0]).ops[0];
        assert_eq!(ctx.op(cond_br).successors.as_slice(), &blocks[1..]);
        // The const survives untouched by this stage (only structural ops
        // convert here), with its attribute intact.
        let c = cedar::Const::from_op(&ctx, ctx.block(blocks[1]).ops[0]).unwrap();
        assert_eq!(
            c.value(&ctx),
            cedar_ir::types::Attribute::IntBits(1)
        );
    }

    #[test]
    fn memory_ops_pass_through_unchanged() {
        let (ctx, module) = run_stage(
            "core.module @m {
  cedar.func @mem() -> cedar.i32 {
    %0 = cedar.alloca {align = 4} : cedar.ptr(cedar.i32)
    %1 = cedar.load %0 : cedar.i32
    cedar.return %1
  }
}
",
        );
        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let ops = ctx.block(entry).ops.to_vec();
        // alloca and load are still cedar ops; only the return converted.
        assert!(cedar::Alloca::matches(&ctx, ops[0]));
        assert!(cedar::Load::matches(&ctx, ops[1]));
        assert!(func::Return::matches(&ctx, ops[2]));
        // The alloca kept its alignment attribute.
        let alloca = cedar::Alloca::from_op(&ctx, ops[0]).unwrap();
        assert_eq!(alloca.align(&ctx), 4);
    }
}
