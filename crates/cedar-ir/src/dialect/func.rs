//! The `func` dialect: generic function, call, and return forms.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

pub const DIALECT: &str = "func";

// ============================================================================
// func.fn type
// ============================================================================

/// Function type: `params[0]` is the result type, `params[1..]` are the
/// parameter types.
pub fn fn_ty(
    ctx: &mut IrContext,
    result: TypeRef,
    params: impl IntoIterator<Item = TypeRef>,
) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new(DIALECT), Symbol::new("fn"))
            .param(result)
            .params(params)
            .build(),
    )
}

/// Check whether a type is a `func.fn`.
pub fn is_fn_ty(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types
        .is_dialect(ty, Symbol::new(DIALECT), Symbol::new("fn"))
}

/// Split a `func.fn` type into (result, params).
pub fn fn_ty_parts(ctx: &IrContext, ty: TypeRef) -> Option<(TypeRef, Vec<TypeRef>)> {
    if !is_fn_ty(ctx, ty) {
        return None;
    }
    let data = ctx.types.get(ty);
    let result = *data.params.first()?;
    Some((result, data.params[1..].to_vec()))
}

// ============================================================================
// func.func
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Func(OpRef);
impl_dialect_op!(Func, "func", "func");

pub fn func(
    ctx: &mut IrContext,
    location: Location,
    sym_name: Symbol,
    ty: TypeRef,
    body: RegionRef,
) -> Func {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("func"))
        .attr("sym_name", Attribute::Symbol(sym_name))
        .attr("type", Attribute::Type(ty))
        .region(body)
        .build(ctx);
    Func(ctx.create_op(data))
}

impl Func {
    pub fn sym_name(self, ctx: &IrContext) -> Symbol {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("sym_name"))
            .and_then(Attribute::as_symbol)
            .expect("func.func must carry a sym_name attribute")
    }

    pub fn ty(self, ctx: &IrContext) -> TypeRef {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("type"))
            .and_then(Attribute::as_type)
            .expect("func.func must carry a type attribute")
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

// ============================================================================
// func.call
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call(OpRef);
impl_dialect_op!(Call, "func", "call");

pub fn call(
    ctx: &mut IrContext,
    location: Location,
    callee: Symbol,
    args: impl IntoIterator<Item = ValueRef>,
    result_tys: impl IntoIterator<Item = TypeRef>,
) -> Call {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("call"))
        .attr("callee", Attribute::Symbol(callee))
        .operands(args)
        .results(result_tys)
        .build(ctx);
    Call(ctx.create_op(data))
}

impl Call {
    pub fn callee(self, ctx: &IrContext) -> Symbol {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("callee"))
            .and_then(Attribute::as_symbol)
            .expect("func.call must carry a callee attribute")
    }

    pub fn args(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn results(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_results(self.0)
    }
}

// ============================================================================
// func.return
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Return(OpRef);
impl_dialect_op!(Return, "func", "return");

pub fn r#return(
    ctx: &mut IrContext,
    location: Location,
    values: impl IntoIterator<Item = ValueRef>,
) -> Return {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("return"))
        .operands(values)
        .build(ctx);
    Return(ctx.create_op(data))
}

impl Return {
    pub fn values(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }
}
