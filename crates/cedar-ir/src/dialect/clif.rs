//! The `clif` dialect: the flat target IR handed to the Cranelift backend.
//!
//! Every op maps 1:1 onto a Cranelift instruction (or function structure),
//! and all value types are `core` scalars or `core.ptr`.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location};

pub const DIALECT: &str = "clif";

// ============================================================================
// clif.func
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Func(OpRef);
impl_dialect_op!(Func, "clif", "func");

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
            .expect("clif.func must carry a sym_name attribute")
    }

    pub fn ty(self, ctx: &IrContext) -> TypeRef {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("type"))
            .and_then(Attribute::as_type)
            .expect("clif.func must carry a type attribute")
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

// ============================================================================
// clif.call / clif.return
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call(OpRef);
impl_dialect_op!(Call, "clif", "call");

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
            .expect("clif.call must carry a callee attribute")
    }

    pub fn args(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn results(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_results(self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Return(OpRef);
impl_dialect_op!(Return, "clif", "return");

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
// Control flow
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Jump(OpRef);
impl_dialect_op!(Jump, "clif", "jump");

pub fn jump(
    ctx: &mut IrContext,
    location: Location,
    args: impl IntoIterator<Item = ValueRef>,
    dest: BlockRef,
) -> Jump {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("jump"))
        .operands(args)
        .successor(dest)
        .build(ctx);
    Jump(ctx.create_op(data))
}

impl Jump {
    pub fn args(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn dest(self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Brif(OpRef);
impl_dialect_op!(Brif, "clif", "brif");

pub fn brif(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    then_dest: BlockRef,
    else_dest: BlockRef,
) -> Brif {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("brif"))
        .operand(cond)
        .successor(then_dest)
        .successor(else_dest)
        .build(ctx);
    Brif(ctx.create_op(data))
}

impl Brif {
    pub fn cond(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn then_dest(self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }

    pub fn else_dest(self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[1]
    }
}

// ============================================================================
// Constants
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iconst(OpRef);
impl_dialect_op!(Iconst, "clif", "iconst");

pub fn iconst(ctx: &mut IrContext, location: Location, result_ty: TypeRef, value: i64) -> Iconst {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("iconst"))
        .attr("value", Attribute::from(value))
        .result(result_ty)
        .build(ctx);
    Iconst(ctx.create_op(data))
}

impl Iconst {
    pub fn value(self, ctx: &IrContext) -> i64 {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("value"))
            .and_then(Attribute::as_i64)
            .expect("clif.iconst must carry a value attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct F64const(OpRef);
impl_dialect_op!(F64const, "clif", "f64const");

pub fn f64const(ctx: &mut IrContext, location: Location, result_ty: TypeRef, value: f64) -> F64const {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("f64const"))
        .attr("value", Attribute::from(value))
        .result(result_ty)
        .build(ctx);
    F64const(ctx.create_op(data))
}

impl F64const {
    pub fn value(self, ctx: &IrContext) -> f64 {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("value"))
            .and_then(Attribute::as_f64)
            .expect("clif.f64const must carry a value attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

// ============================================================================
// Integer arithmetic
// ============================================================================

macro_rules! clif_binary_op {
    ($wrapper:ident, $ctor:ident, $name:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $wrapper(OpRef);
        impl_dialect_op!($wrapper, "clif", $name);

        pub fn $ctor(
            ctx: &mut IrContext,
            location: Location,
            lhs: ValueRef,
            rhs: ValueRef,
            result_ty: TypeRef,
        ) -> $wrapper {
            let data =
                OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new($name))
                    .operand(lhs)
                    .operand(rhs)
                    .result(result_ty)
                    .build(ctx);
            $wrapper(ctx.create_op(data))
        }

        impl $wrapper {
            pub fn lhs(self, ctx: &IrContext) -> ValueRef {
                ctx.op_operands(self.0)[0]
            }

            pub fn rhs(self, ctx: &IrContext) -> ValueRef {
                ctx.op_operands(self.0)[1]
            }

            pub fn result(self, ctx: &IrContext) -> ValueRef {
                ctx.op_result(self.0, 0)
            }
        }
    };
}

clif_binary_op!(Iadd, iadd, "iadd");
clif_binary_op!(Isub, isub, "isub");
clif_binary_op!(Imul, imul, "imul");
clif_binary_op!(IcmpEq, icmp_eq, "icmp_eq");

// ============================================================================
// Memory
// ============================================================================

/// Explicit stack slot. Result is a `core.ptr` to the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackAlloc(OpRef);
impl_dialect_op!(StackAlloc, "clif", "stack_alloc");

pub fn stack_alloc(
    ctx: &mut IrContext,
    location: Location,
    result_ty: TypeRef,
    size: u64,
    align: u64,
) -> StackAlloc {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("stack_alloc"))
        .attr("align", Attribute::IntBits(align))
        .attr("size", Attribute::IntBits(size))
        .result(result_ty)
        .build(ctx);
    StackAlloc(ctx.create_op(data))
}

impl StackAlloc {
    pub fn size(self, ctx: &IrContext) -> u64 {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("size"))
            .and_then(Attribute::as_u64)
            .expect("clif.stack_alloc must carry a size attribute")
    }

    pub fn align(self, ctx: &IrContext) -> u64 {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("align"))
            .and_then(Attribute::as_u64)
            .expect("clif.stack_alloc must carry an align attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Load(OpRef);
impl_dialect_op!(Load, "clif", "load");

pub fn load(ctx: &mut IrContext, location: Location, addr: ValueRef, result_ty: TypeRef) -> Load {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("load"))
        .operand(addr)
        .result(result_ty)
        .build(ctx);
    Load(ctx.create_op(data))
}

impl Load {
    pub fn addr(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }

    pub fn result_ty(self, ctx: &IrContext) -> TypeRef {
        ctx.op_result_types(self.0)[0]
    }
}

/// Store: operands are `(addr, value)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Store(OpRef);
impl_dialect_op!(Store, "clif", "store");

pub fn store(ctx: &mut IrContext, location: Location, addr: ValueRef, value: ValueRef) -> Store {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("store"))
        .operand(addr)
        .operand(value)
        .build(ctx);
    Store(ctx.create_op(data))
}

impl Store {
    pub fn addr(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn value(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }
}
