//! The `core` builtin dialect: the module container op and scalar types.

use smallvec::smallvec;

use crate::context::{IrContext, OperationDataBuilder, RegionData};
use crate::ops::impl_dialect_op;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

pub const DIALECT: &str = "core";

// ============================================================================
// Types
// ============================================================================

fn scalar(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(Symbol::new(DIALECT), Symbol::new(name)).build())
}

pub fn i8_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i8")
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

/// Untyped pointer; every memory reference erases to this at the clif level.
pub fn ptr_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "ptr")
}

/// The empty type, used as the result of value-less functions.
pub fn nil_ty(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "nil")
}

// ============================================================================
// core.module
// ============================================================================

/// The root container operation. Owns one region holding one block of
/// top-level operations (functions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Module(OpRef);
impl_dialect_op!(Module, "core", "module");

/// Create an empty `core.module` with a single-block body region.
pub fn module(ctx: &mut IrContext, location: Location, sym_name: Symbol) -> Module {
    let block = ctx.create_empty_block(location);
    let region = ctx.create_region(RegionData {
        location,
        blocks: smallvec![block],
        parent_op: None,
    });
    module_with_body(ctx, location, sym_name, region)
}

/// Create a `core.module` around an existing body region.
pub fn module_with_body(
    ctx: &mut IrContext,
    location: Location,
    sym_name: Symbol,
    body: RegionRef,
) -> Module {
    let data = OperationDataBuilder::new(location, Symbol::new(DIALECT), Symbol::new("module"))
        .attr("sym_name", Attribute::Symbol(sym_name))
        .region(body)
        .build(ctx);
    Module(ctx.create_op(data))
}

impl Module {
    /// The module's body region.
    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    /// The first block of the module body.
    pub fn first_block(self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// All top-level operations in the module's first block.
    pub fn ops(self, ctx: &IrContext) -> Vec<OpRef> {
        match self.first_block(ctx) {
            Some(block) => ctx.block(block).ops.to_vec(),
            None => vec![],
        }
    }

    /// The module name (from the `sym_name` attribute).
    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        ctx.op(self.0)
            .attributes
            .get(&Symbol::new("sym_name"))
            .and_then(Attribute::as_symbol)
    }

    /// Append a top-level operation to the module body.
    pub fn push_op(self, ctx: &mut IrContext, op: OpRef) {
        let block = self
            .first_block(ctx)
            .expect("core.module body must have a block");
        ctx.push_op(block, op);
    }
}
