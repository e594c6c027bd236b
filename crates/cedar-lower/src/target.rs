//! Stage 3: `convert-to-clif`.
//!
//! Full conversion of everything remaining — `func`, `mem`, `arith`, `cf` —
//! into the flat `clif` dialect. This stage must leave zero illegal
//! operations; any survivor is a conversion failure.

use cedar_ir::clone::{ValueMapper, clone_region};
use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;
use cedar_ir::dialect::{arith, cf, clif, core, func, mem};
use cedar_ir::ops::DialectOp;
use cedar_ir::refs::{OpRef, TypeRef, ValueRef};
use cedar_ir::rewrite::{ConversionDriver, ConversionTarget, PatternRewriter, RewritePattern};
use cedar_ir::symbol::Symbol;
use cedar_ir::types::Attribute;

use crate::convert;
use crate::pass::{Pass, PassError};

/// Byte size of a `core` scalar, for sizing stack slots.
fn type_size_bytes(ctx: &IrContext, ty: TypeRef) -> Option<u64> {
    let data = ctx.types.get(ty);
    if data.dialect != Symbol::new("core") {
        return None;
    }
    if data.name == Symbol::new("i8") {
        Some(1)
    } else if data.name == Symbol::new("i32") {
        Some(4)
    } else if data.name == Symbol::new("i64")
        || data.name == Symbol::new("f64")
        || data.name == Symbol::new("ptr")
    {
        Some(8)
    } else {
        None
    }
}

/// `func.func` → `clif.func` with a converted signature and cloned body.
pub struct FuncToClif;

impl RewritePattern for FuncToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(f) = func::Func::from_op(ctx, op) else {
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

        let new_fn = clif::func(ctx, loc, sym_name, new_fn_ty, new_body);
        rewriter.replace_op(new_fn.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "FuncToClif"
    }
}

/// `func.return` → `clif.return`.
pub struct ReturnToClif;

impl RewritePattern for ReturnToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(ret) = func::Return::from_op(ctx, op) else {
            return false;
        };
        let loc = ctx.op(op).location;
        let values: Vec<ValueRef> = ret.values(ctx).to_vec();
        let new_op = clif::r#return(ctx, loc, values);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "ReturnToClif"
    }
}

/// `func.call` → `clif.call`: the callee symbol and argument list are
/// preserved; only the call mechanism changes.
pub struct CallToClif;

impl RewritePattern for CallToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(call) = func::Call::from_op(ctx, op) else {
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

        let new_op = clif::call(ctx, loc, callee, args, result_tys);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CallToClif"
    }
}

/// `mem.alloca` → `clif.stack_alloc` with an explicit byte size.
pub struct AllocaToClif;

impl RewritePattern for AllocaToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(alloca) = mem::Alloca::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let align = alloca.align(ctx);
        let ref_ty = ctx.op_result_types(op)[0];
        let Some(elem) = mem::ref_elem_ty(ctx, ref_ty) else {
            return false;
        };
        let Some(size) = type_size_bytes(ctx, elem) else {
            return false;
        };
        let align = if align == 0 { size } else { align };

        let ptr_ty = core::ptr_ty(ctx);
        let new_op = clif::stack_alloc(ctx, loc, ptr_ty, size, align);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "AllocaToClif"
    }
}

/// `mem.load` → `clif.load`.
pub struct LoadToClif;

impl RewritePattern for LoadToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(load) = mem::Load::from_op(ctx, op) else {
            return false;
        };
        let loc = ctx.op(op).location;
        let ptr = load.ptr(ctx);
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);
        let new_op = clif::load(ctx, loc, ptr, result_ty);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "LoadToClif"
    }
}

/// `mem.store` → `clif.store`.
pub struct StoreToClif;

impl RewritePattern for StoreToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(store) = mem::Store::from_op(ctx, op) else {
            return false;
        };
        let loc = ctx.op(op).location;
        let ptr = store.ptr(ctx);
        let value = store.value(ctx);
        let new_op = clif::store(ctx, loc, ptr, value);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "StoreToClif"
    }
}

/// `arith.const` → `clif.iconst` / `clif.f64const`, by value kind.
pub struct ConstToClif;

impl RewritePattern for ConstToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(c) = arith::Const::from_op(ctx, op) else {
            return false;
        };

        let loc = ctx.op(op).location;
        let value = c.value(ctx);
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);

        let new_op = match value {
            Attribute::IntBits(_) => {
                let v = value.as_i64().expect("checked IntBits");
                clif::iconst(ctx, loc, result_ty, v).op_ref()
            }
            Attribute::FloatBits(_) => {
                let v = value.as_f64().expect("checked FloatBits");
                clif::f64const(ctx, loc, result_ty, v).op_ref()
            }
            Attribute::Bool(b) => clif::iconst(ctx, loc, result_ty, b as i64).op_ref(),
            _ => return false,
        };
        rewriter.replace_op(new_op);
        true
    }

    fn name(&self) -> &'static str {
        "ConstToClif"
    }
}

/// `arith.<src>` binary op → `clif.<dst>`: operands and result types map
/// 1:1 by position.
pub struct BinaryToClif {
    src: &'static str,
    dst: &'static str,
}

impl BinaryToClif {
    pub fn new(src: &'static str, dst: &'static str) -> Self {
        Self { src, dst }
    }
}

impl RewritePattern for BinaryToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        {
            let data = ctx.op(op);
            if data.dialect != Symbol::new("arith") || data.name != Symbol::from_dynamic(self.src) {
                return false;
            }
        }
        let operands = ctx.op_operands(op).to_vec();
        if operands.len() != 2 {
            return false;
        }
        let loc = ctx.op(op).location;
        let result_ty = ctx.op_result_types(op)[0];
        let converter = rewriter.type_converter();
        let result_ty = converter.convert_type_or_identity(ctx, result_ty);

        let data = cedar_ir::context::OperationDataBuilder::new(
            loc,
            Symbol::new("clif"),
            Symbol::from_dynamic(self.dst),
        )
        .operand(operands[0])
        .operand(operands[1])
        .result(result_ty)
        .build(ctx);
        let new_op = ctx.create_op(data);
        rewriter.replace_op(new_op);
        true
    }

    fn name(&self) -> &'static str {
        "BinaryToClif"
    }
}

/// `cf.br` → `clif.jump`.
pub struct BrToClif;

impl RewritePattern for BrToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(br) = cf::Br::from_op(ctx, op) else {
            return false;
        };
        let loc = ctx.op(op).location;
        let args: Vec<ValueRef> = br.args(ctx).to_vec();
        let dest = br.dest(ctx);
        let new_op = clif::jump(ctx, loc, args, dest);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "BrToClif"
    }
}

/// `cf.cond_br` → `clif.brif`.
pub struct CondBrToClif;

impl RewritePattern for CondBrToClif {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(cond_br) = cf::CondBr::from_op(ctx, op) else {
            return false;
        };
        let loc = ctx.op(op).location;
        let cond = cond_br.cond(ctx);
        let then_dest = cond_br.then_dest(ctx);
        let else_dest = cond_br.else_dest(ctx);
        let new_op = clif::brif(ctx, loc, cond, then_dest, else_dest);
        rewriter.replace_op(new_op.op_ref());
        true
    }

    fn name(&self) -> &'static str {
        "CondBrToClif"
    }
}

/// The target stage pass: a full conversion into the `clif` dialect.
pub struct ConvertToClif;

impl Pass for ConvertToClif {
    fn name(&self) -> &'static str {
        "convert-to-clif"
    }

    fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError> {
        let mut target = ConversionTarget::new();
        target.add_legal_dialect("clif");
        target.add_legal_op("core", "module");
        target.add_illegal_dialect("cedar");
        target.add_illegal_dialect("func");
        target.add_illegal_dialect("mem");
        target.add_illegal_dialect("arith");
        target.add_illegal_dialect("cf");

        let driver = ConversionDriver::new(convert::generic_to_clif())
            .add_pattern(FuncToClif)
            .add_pattern(ReturnToClif)
            .add_pattern(CallToClif)
            .add_pattern(AllocaToClif)
            .add_pattern(LoadToClif)
            .add_pattern(StoreToClif)
            .add_pattern(ConstToClif)
            .add_pattern(BinaryToClif::new("add", "iadd"))
            .add_pattern(BinaryToClif::new("sub", "isub"))
            .add_pattern(BinaryToClif::new("mul", "imul"))
            .add_pattern(BinaryToClif::new("cmp_eq", "icmp_eq"))
            .add_pattern(BrToClif)
            .add_pattern(CondBrToClif);
        driver.apply_full(ctx, module, &target)?;
        Ok(())
    }
}
