//! The `cedar` source dialect: the high-level forms the frontend produces.
//!
//! Functions, calls, returns, scalar stack cells, and constants. Everything
//! here is rewritten away by the lowering pipeline.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

pub const DIALECT: &str = "cedar";

// ============================================================================
// Types
// ============================================================================

fn scalar(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new(DIALECT), Symbol::new(name)).build())
}

pub fn i32_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i32")
}

pub fn i64_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i64")
}

pub fn f64_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "f64")
}

pub fn bool_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "bool")
}

/// Pointer to a stack cell of the given element type.
pub fn ptr_ty(ctx: &mut IrContext, elem: TypeRef) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(Symbol::new(DIALECT), Symbol::new("ptr"))
            .param(elem)
            .build(),
    )
}

// ============================================================================
// cedar.func
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Func(OpRef);
impl_dialect_op!(Func, "cedar", "func");

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
            .expect("cedar.func must carry a sym_name attribute")
    }

    pub fn ty(self, ctx: &IrContext) -> TypeRef {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("type"))
            .and_then(Attribute::as_type)
            .expect("cedar.func must carry a type attribute")
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

// ============================================================================
// cedar.call
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call(OpRef);
impl_dialect_op!(Call, "cedar", "call");

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
            .expect("cedar.call must carry a callee attribute")
    }

    pub fn args(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn results(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_results(self.0)
    }
}

// ============================================================================
// cedar.return
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Return(OpRef);
impl_dialect_op!(Return, "cedar", "return");

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

// ============================================================================
// cedar.alloca
// ============================================================================

/// Scalar stack slot. The result type is `cedar.ptr<elem>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alloca(OpRef);
impl_dialect_op!(Alloca, "cedar", "alloca");

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
            .expect("cedar.alloca must carry an align attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

// ============================================================================
// cedar.load / cedar.store
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Load(OpRef);
impl_dialect_op!(Load, "cedar", "load");

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
impl_dialect_op!(Store, "cedar", "store");

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

// ============================================================================
// cedar.const
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Const(OpRef);
impl_dialect_op!(Const, "cedar", "const");

pub fn r#const(
    ctx: &mut IrContext,
    location: Location,
    result_ty: TypeRef,
    value: Attribute,
) -> Const {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("const"))
        .attr("value", value)
        .result(result_ty)
        .build(ctx);
    Const(ctx.create_op(data))
}

impl Const {
    pub fn value(self, ctx: &IrContext) -> Attribute {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("value"))
            .cloned()
            .expect("cedar.const must carry a value attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Span;
    use crate::ops::DialectOp;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.cdr".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    #[test]
    fn const_round_trip() {
        let (mut ctx, loc) = test_ctx();
        let ty = i32_ty(&mut ctx);
        let c = r#const(&mut ctx, loc, ty, Attribute::IntBits(42));

        let c2 = Const::from_op(&ctx, c.op_ref()).expect("should match cedar.const");
        assert_eq!(c.op_ref(), c2.op_ref());
        assert_eq!(c.value(&ctx), Attribute::IntBits(42));
        assert_eq!(ctx.value_ty(c.result(&ctx)), ty);
    }

    #[test]
    fn alloca_and_store_shapes() {
        let (mut ctx, loc) = test_ctx();
        let elem = i32_ty(&mut ctx);
        let ptr = ptr_ty(&mut ctx, elem);

        let a = alloca(&mut ctx, loc, ptr, 4);
        assert_eq!(a.align(&ctx), 4);
        assert_eq!(ctx.value_ty(a.result(&ctx)), ptr);

        let c = r#const(&mut ctx, loc, elem, Attribute::IntBits(1));
        let a_res = a.result(&ctx);
        let c_res = c.result(&ctx);
        let s = store(&mut ctx, loc, a_res, c_res);
        assert_eq!(s.ptr(&ctx), a.result(&ctx));
        assert_eq!(s.value(&ctx), c.result(&ctx));
    }

    #[test]
    fn from_op_wrong_kind_fails() {
        let (mut ctx, loc) = test_ctx();
        let ty = i32_ty(&mut ctx);
        let c = r#const(&mut ctx, loc, ty, Attribute::IntBits(1));
        assert!(Load::from_op(&ctx, c.op_ref()).is_err());
        assert!(Const::matches(&ctx, c.op_ref()));
        assert!(!Store::matches(&ctx, c.op_ref()));
    }
}
