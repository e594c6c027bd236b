//! The `cf` dialect: unstructured control flow between blocks.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::impl_dialect_op;
use crate::refs::{BlockRef, OpRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Location;

pub const DIALECT: &str = "cf";

/// Unconditional branch carrying block arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Br(OpRef);
impl_dialect_op!(Br, "cf", "br");

pub fn br(
    ctx: &mut IrContext,
    location: Location,
    args: impl IntoIterator<Item = ValueRef>,
    dest: BlockRef,
) -> Br {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("br"))
        .operands(args)
        .successor(dest)
        .build(ctx);
    Br(ctx.create_op(data))
}

impl Br {
    pub fn args(self, ctx: &IrContext) -> &[ValueRef] {
        ctx.op_operands(self.0)
    }

    pub fn dest(self, ctx: &IrContext) -> BlockRef {
        ctx.op(self.0).successors[0]
    }
}

/// Conditional branch. Carries no block arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CondBr(OpRef);
impl_dialect_op!(CondBr, "cf", "cond_br");

pub fn cond_br(
    ctx: &mut IrContext,
    location: Location,
    cond: ValueRef,
    then_dest: BlockRef,
    else_dest: BlockRef,
) -> CondBr {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("cond_br"))
        .operand(cond)
        .successor(then_dest)
        .successor(else_dest)
        .build(ctx);
    CondBr(ctx.create_op(data))
}

impl CondBr {
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
