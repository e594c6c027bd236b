//! The `mem` dialect: generic memory-reference forms.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

pub const DIALECT: &str = "mem";

/// Zero-rank memory reference to a single element of the given type.
pub fn ref_ty(ctx: &mut IrContext, elem: TypeRef) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new(DIALECT), Symbol::new("ref"))
            .param(elem)
            .build(),
    )
}

pub fn is_ref_ty(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new(DIALECT), Symbol::new("ref"))
}

/// Element type of a `mem.ref`.
pub fn ref_elem_ty(ctx: &IrContext, ty: TypeRef) -> Option<TypeRef> {
    if !is_ref_ty(ctx, ty) {
        return None;
    }
    ctx.types.get(ty).params.first().copied()
}

// ============================================================================
// mem.alloca
// ============================================================================

/// Zero-rank memory-reference allocation. Result type is `mem.ref<elem>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alloca(OpRef);
impl_dialect_op!(Alloca, "mem", "alloca");

pub fn alloca(ctx: &mut IrContext, location: Location, result_ty: TypeRef, align: u64) -> Alloca {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("alloca"))
        .attr("align", Attribute::IntBits(align))
        .result(result_ty)
        .build(ctx);
    Alloca(ctx.create_op(data))
}

impl Alloca {
    pub fn align(self, ctx: &IrContext) -> u64 {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("align"))
            .and_then(Attribute::as_u64)
            .expect("mem.alloca must carry an align attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

// ============================================================================
// mem.load / mem.store
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Load(OpRef);
impl_dialect_op!(Load, "mem", "load");

pub fn load(ctx: &mut IrContext, location: Location, ptr: ValueRef, result_ty: TypeRef) -> Load {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("load"))
        .operand(ptr)
        .result(result_ty)
        .build(ctx);
    Load(ctx.create_op(data))
}

impl Load {
    pub fn ptr(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

/// Store: operands are `(ptr, value)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Store(OpRef);
impl_dialect_op!(Store, "mem", "store");

pub fn store(ctx: &mut IrContext, location: Location, ptr: ValueRef, value: ValueRef) -> Store {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("store"))
        .operand(ptr)
        .operand(value)
        .build(ctx);
    Store(ctx.create_op(data))
}

impl Store {
    pub fn ptr(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn value(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }
}
