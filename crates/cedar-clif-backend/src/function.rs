//! Function-level code generation.
//!
//! Translates `clif.*` dialect operations within a single function body to
//! Cranelift IR instructions using `FunctionBuilder`.

use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::types as cl_types;
use cranelift_codegen::ir::{self as cl_ir, InstBuilder, StackSlotData, StackSlotKind};
use cranelift_codegen::isa::CallConv;
use cranelift_frontend::FunctionBuilder;
use cranelift_module::{FuncId, Module as _};
use cranelift_object::ObjectModule;

use cedar_ir::context::IrContext;
use cedar_ir::dialect::{clif, func};
use cedar_ir::ops::DialectOp;
use cedar_ir::refs::{BlockRef, OpRef, TypeRef, ValueRef};
use cedar_ir::symbol::Symbol;

use crate::{CompilationError, CompilationResult};

/// Translate a `core` scalar type to a Cranelift IR type.
pub(crate) fn translate_type(ctx: &IrContext, ty: TypeRef) -> CompilationResult<cl_types::Type> {
    let data = ctx.types.get(ty);
    if data.dialect == Symbol::new("core") {
        if data.name == Symbol::new("i8") {
            return Ok(cl_types::I8);
        }
        if data.name == Symbol::new("i32") {
            return Ok(cl_types::I32);
        }
        if data.name == Symbol::new("i64") {
            return Ok(cl_types::I64);
        }
        if data.name == Symbol::new("f64") {
            return Ok(cl_types::F64);
        }
        // core.ptr -> i64 (pointers are 64-bit on supported targets)
        if data.name == Symbol::new("ptr") {
            return Ok(cl_types::I64);
        }
    }
    Err(CompilationError::type_error(format!(
        "unsupported type for Cranelift: {}.{}",
        data.dialect, data.name,
    )))
}

/// Translate a `func.fn` type to a Cranelift `Signature`.
pub(crate) fn translate_signature(
    ctx: &IrContext,
    fn_ty: TypeRef,
    call_conv: CallConv,
) -> CompilationResult<cl_ir::Signature> {
    let (result, params) = func::fn_ty_parts(ctx, fn_ty).ok_or_else(|| {
        CompilationError::type_error("function type attribute must be a func.fn")
    })?;

    let mut sig = cl_ir::Signature::new(call_conv);
    for param_ty in params {
        let cl_ty = translate_type(ctx, param_ty)?;
        sig.params.push(cl_ir::AbiParam::new(cl_ty));
    }

    // Nil result type means void — no return values.
    let result_data = ctx.types.get(result);
    let is_nil =
        result_data.dialect == Symbol::new("core") && result_data.name == Symbol::new("nil");
    if !is_nil {
        let cl_ty = translate_type(ctx, result)?;
        sig.returns.push(cl_ir::AbiParam::new(cl_ty));
    }

    Ok(sig)
}

/// Translates `clif.*` operations within a single function body.
pub(crate) struct FunctionTranslator<'a, 'b> {
    ctx: &'a IrContext,
    pub(crate) builder: FunctionBuilder<'b>,
    obj: &'a mut ObjectModule,
    /// Declared functions, for resolving call targets.
    func_ids: &'a HashMap<Symbol, (FuncId, cl_ir::Signature)>,
    /// Function refs imported into the current function, by callee.
    func_refs: HashMap<Symbol, cl_ir::FuncRef>,
    /// Maps IR values to Cranelift IR values.
    values: HashMap<ValueRef, cl_ir::Value>,
    /// Maps IR blocks to Cranelift blocks.
    block_map: HashMap<BlockRef, cl_ir::Block>,
}

impl<'a, 'b> FunctionTranslator<'a, 'b> {
    pub(crate) fn new(
        ctx: &'a IrContext,
        builder: FunctionBuilder<'b>,
        obj: &'a mut ObjectModule,
        func_ids: &'a HashMap<Symbol, (FuncId, cl_ir::Signature)>,
    ) -> Self {
        Self {
            ctx,
            builder,
            obj,
            func_ids,
            func_refs: HashMap::new(),
            values: HashMap::new(),
            block_map: HashMap::new(),
        }
    }

    pub(crate) fn finalize(self) {
        self.builder.finalize();
    }

    fn lookup(&self, ir_val: ValueRef) -> CompilationResult<cl_ir::Value> {
        self.values.get(&ir_val).copied().ok_or_else(|| {
            CompilationError::codegen("IR value not found in Cranelift value mapping")
        })
    }

    fn lookup_block(&self, ir_block: BlockRef) -> CompilationResult<cl_ir::Block> {
        self.block_map.get(&ir_block).copied().ok_or_else(|| {
            CompilationError::codegen("IR block not found in Cranelift block mapping")
        })
    }

    fn func_ref(&mut self, callee: Symbol) -> CompilationResult<cl_ir::FuncRef> {
        if let Some(&fr) = self.func_refs.get(&callee) {
            return Ok(fr);
        }
        let (id, _) = self
            .func_ids
            .get(&callee)
            .ok_or_else(|| CompilationError::function_not_found(callee))?;
        let fr = self.obj.declare_func_in_func(*id, self.builder.func);
        self.func_refs.insert(callee, fr);
        Ok(fr)
    }

    /// Translate a whole function body.
    pub(crate) fn translate_function(&mut self, f: clif::Func) -> CompilationResult<()> {
        let body = f.body(self.ctx);
        let blocks: Vec<BlockRef> = self.ctx.region(body).blocks.to_vec();
        if blocks.is_empty() {
            return Err(CompilationError::codegen("function has no blocks"));
        }

        // Create all Cranelift blocks up front so branches can resolve.
        for (i, &ir_block) in blocks.iter().enumerate() {
            let cl_block = self.builder.create_block();
            if i == 0 {
                self.builder.append_block_params_for_function_params(cl_block);
            } else {
                for &arg in self.ctx.block_args(ir_block) {
                    let ty = translate_type(self.ctx, self.ctx.value_ty(arg))?;
                    self.builder.append_block_param(cl_block, ty);
                }
            }
            self.block_map.insert(ir_block, cl_block);
        }

        // Map IR block arguments onto Cranelift block parameters.
        for &ir_block in &blocks {
            let cl_block = self.lookup_block(ir_block)?;
            let params: Vec<cl_ir::Value> = self.builder.block_params(cl_block).to_vec();
            for (&arg, val) in self.ctx.block_args(ir_block).iter().zip(params) {
                self.values.insert(arg, val);
            }
        }

        for &ir_block in &blocks {
            let cl_block = self.lookup_block(ir_block)?;
            self.builder.switch_to_block(cl_block);
            for &op in self.ctx.block(ir_block).ops.clone().iter() {
                self.translate_op(op)?;
            }
        }

        self.builder.seal_all_blocks();
        Ok(())
    }

    /// Translate a single `clif.*` operation to Cranelift IR.
    fn translate_op(&mut self, op: OpRef) -> CompilationResult<()> {
        let ctx = self.ctx;

        // === Constants ===
        if let Ok(c) = clif::Iconst::from_op(ctx, op) {
            let ty = translate_type(ctx, c.result_ty(ctx))?;
            let val = self.builder.ins().iconst(ty, c.value(ctx));
            self.values.insert(c.result(ctx), val);
            return Ok(());
        }
        if let Ok(c) = clif::F64const::from_op(ctx, op) {
            let val = self.builder.ins().f64const(c.value(ctx));
            self.values.insert(c.result(ctx), val);
            return Ok(());
        }

        // === Integer arithmetic ===
        if let Ok(o) = clif::Iadd::from_op(ctx, op) {
            return self.emit_binary(o.lhs(ctx), o.rhs(ctx), o.result(ctx), |b, x, y| {
                b.ins().iadd(x, y)
            });
        }
        if let Ok(o) = clif::Isub::from_op(ctx, op) {
            return self.emit_binary(o.lhs(ctx), o.rhs(ctx), o.result(ctx), |b, x, y| {
                b.ins().isub(x, y)
            });
        }
        if let Ok(o) = clif::Imul::from_op(ctx, op) {
            return self.emit_binary(o.lhs(ctx), o.rhs(ctx), o.result(ctx), |b, x, y| {
                b.ins().imul(x, y)
            });
        }
        if let Ok(o) = clif::IcmpEq::from_op(ctx, op) {
            return self.emit_binary(o.lhs(ctx), o.rhs(ctx), o.result(ctx), |b, x, y| {
                b.ins().icmp(IntCC::Equal, x, y)
            });
        }

        // === Call ===
        if let Ok(call) = clif::Call::from_op(ctx, op) {
            let callee = call.callee(ctx);
            let func_ref = self.func_ref(callee)?;
            let args: Vec<cl_ir::Value> = call
                .args(ctx)
                .iter()
                .map(|&v| self.lookup(v))
                .collect::<CompilationResult<_>>()?;

            let inst = self.builder.ins().call(func_ref, &args);
            let results = self.builder.inst_results(inst).to_vec();
            for (&ir_result, cl_result) in call.results(ctx).iter().zip(results) {
                self.values.insert(ir_result, cl_result);
            }
            return Ok(());
        }

        // === Return ===
        if let Ok(ret) = clif::Return::from_op(ctx, op) {
            let vals: Vec<cl_ir::Value> = ret
                .values(ctx)
                .iter()
                .map(|&v| self.lookup(v))
                .collect::<CompilationResult<_>>()?;
            self.builder.ins().return_(&vals);
            return Ok(());
        }

        // === Control flow ===
        if let Ok(jump) = clif::Jump::from_op(ctx, op) {
            let cl_dest = self.lookup_block(jump.dest(ctx))?;
            let args: Vec<cl_ir::BlockArg> = jump
                .args(ctx)
                .iter()
                .map(|&v| self.lookup(v).map(cl_ir::BlockArg::from))
                .collect::<CompilationResult<_>>()?;
            let dest_param_count = self.builder.block_params(cl_dest).len();
            if args.len() != dest_param_count {
                return Err(CompilationError::codegen(format!(
                    "clif.jump: argument count ({}) does not match destination block \
                     parameter count ({})",
                    args.len(),
                    dest_param_count,
                )));
            }
            self.builder.ins().jump(cl_dest, &args);
            return Ok(());
        }
        // clif.brif carries no block args by construction.
        if let Ok(brif) = clif::Brif::from_op(ctx, op) {
            let cond = self.lookup(brif.cond(ctx))?;
            let cl_then = self.lookup_block(brif.then_dest(ctx))?;
            let cl_else = self.lookup_block(brif.else_dest(ctx))?;
            self.builder.ins().brif(cond, cl_then, &[], cl_else, &[]);
            return Ok(());
        }

        // === Memory ===
        if let Ok(slot_op) = clif::StackAlloc::from_op(ctx, op) {
            let size = slot_op.size(ctx);
            let align = slot_op.align(ctx).max(1);
            let align_shift = align.trailing_zeros() as u8;
            let slot = self.builder.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                size as u32,
                align_shift,
            ));
            let addr = self.builder.ins().stack_addr(cl_types::I64, slot, 0);
            self.values.insert(slot_op.result(ctx), addr);
            return Ok(());
        }
        if let Ok(load) = clif::Load::from_op(ctx, op) {
            let addr = self.lookup(load.addr(ctx))?;
            let ty = translate_type(ctx, load.result_ty(ctx))?;
            let val = self
                .builder
                .ins()
                .load(ty, cl_ir::MemFlags::new(), addr, 0);
            self.values.insert(load.result(ctx), val);
            return Ok(());
        }
        if let Ok(store) = clif::Store::from_op(ctx, op) {
            let addr = self.lookup(store.addr(ctx))?;
            let value = self.lookup(store.value(ctx))?;
            self.builder
                .ins()
                .store(cl_ir::MemFlags::new(), value, addr, 0);
            return Ok(());
        }

        Err(CompilationError::codegen(format!(
            "unsupported operation: {}",
            ctx.op_full_name(op),
        )))
    }

    /// Emit a binary operation (two inputs, one output).
    fn emit_binary(
        &mut self,
        lhs_ir: ValueRef,
        rhs_ir: ValueRef,
        result_ir: ValueRef,
        f: impl FnOnce(&mut FunctionBuilder<'b>, cl_ir::Value, cl_ir::Value) -> cl_ir::Value,
    ) -> CompilationResult<()> {
        let lhs = self.lookup(lhs_ir)?;
        let rhs = self.lookup(rhs_ir)?;
        let cl_val = f(&mut self.builder, lhs, rhs);
        self.values.insert(result_ir, cl_val);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedar_ir::dialect::core;

    #[test]
    fn translate_scalar_types() {
        let mut ctx = IrContext::new();
        let i8_ty = core::i8_ty(&mut ctx);
        let i32_ty = core::i32_ty(&mut ctx);
        let i64_ty = core::i64_ty(&mut ctx);
        let f64_ty = core::f64_ty(&mut ctx);
        let ptr_ty = core::ptr_ty(&mut ctx);

        assert_eq!(translate_type(&ctx, i8_ty).unwrap(), cl_types::I8);
        assert_eq!(translate_type(&ctx, i32_ty).unwrap(), cl_types::I32);
        assert_eq!(translate_type(&ctx, i64_ty).unwrap(), cl_types::I64);
        assert_eq!(translate_type(&ctx, f64_ty).unwrap(), cl_types::F64);
        assert_eq!(translate_type(&ctx, ptr_ty).unwrap(), cl_types::I64);
    }

    #[test]
    fn translate_type_rejects_unlowered_types() {
        let mut ctx = IrContext::new();
        let nil = core::nil_ty(&mut ctx);
        assert!(translate_type(&ctx, nil).is_err());

        let cedar_i32 = cedar_ir::dialect::cedar::i32_ty(&mut ctx);
        assert!(translate_type(&ctx, cedar_i32).is_err());
    }

    #[test]
    fn translate_signature_params_and_return() {
        let mut ctx = IrContext::new();
        let i32_ty = core::i32_ty(&mut ctx);
        let i64_ty = core::i64_ty(&mut ctx);
        let fn_ty = func::fn_ty(&mut ctx, i64_ty, [i32_ty, i32_ty]);

        let sig = translate_signature(&ctx, fn_ty, CallConv::SystemV).unwrap();
        assert_eq!(sig.params.len(), 2);
        assert_eq!(sig.params[0].value_type, cl_types::I32);
        assert_eq!(sig.returns.len(), 1);
        assert_eq!(sig.returns[0].value_type, cl_types::I64);
    }

    #[test]
    fn translate_signature_void_return() {
        let mut ctx = IrContext::new();
        let i64_ty = core::i64_ty(&mut ctx);
        let nil = core::nil_ty(&mut ctx);
        let fn_ty = func::fn_ty(&mut ctx, nil, [i64_ty]);

        let sig = translate_signature(&ctx, fn_ty, CallConv::SystemV).unwrap();
        assert_eq!(sig.params.len(), 1);
        assert_eq!(sig.returns.len(), 0);
    }
}
