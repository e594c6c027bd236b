//! The `arith` dialect: constants and integer arithmetic.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{OpRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location};

pub const DIALECT: &str = "arith";

// ============================================================================
// arith.const
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Const(OpRef);
impl_dialect_op!(Const, "arith", "const");

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
            .expect("arith.const must carry a value attribute")
    }

    pub fn result(self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.0, 0)
    }
}

// ============================================================================
// Binary operations
// ============================================================================

fn binary(
    ctx: &mut IrContext,
    location: Location,
    name: &'static str,
    lhs: ValueRef,
    rhs: ValueRef,
    result_ty: TypeRef,
) -> OpRef {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new(name))
        .operand(lhs)
        .operand(rhs)
        .result(result_ty)
        .build(ctx);
    ctx.create_op(data)
}

macro_rules! binary_op {
    ($wrapper:ident, $ctor:ident, $name:literal) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub struct $wrapper(OpRef);
        impl_dialect_op!($wrapper, "arith", $name);

        pub fn $ctor(
            ctx: &mut IrContext,
            location: Location,
            lhs: ValueRef,
            rhs: ValueRef,
            result_ty: TypeRef,
        ) -> $wrapper {
            $wrapper(binary(ctx, location, $name, lhs, rhs, result_ty))
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

binary_op!(Add, add, "add");
binary_op!(Sub, sub, "sub");
binary_op!(Mul, mul, "mul");
binary_op!(CmpEq, cmp_eq, "cmp_eq");
