//! Recursive operation traversal utilities.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into nested regions.
    Advance,
    /// Skip the nested regions of the current operation.
    Skip,
}

/// Walk all operations in a region recursively.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk all operations in a block recursively.
pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk an operation and its nested regions recursively.
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{IrContext, OperationDataBuilder, RegionData};
    use crate::location::Span;
    use crate::symbol::Symbol;
    use crate::types::{Location, TypeDataBuilder};
    use smallvec::smallvec;

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.cdr".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    fn const_op(ctx: &mut IrContext, loc: Location) -> crate::refs::OpRef {
        let i32_ty = ctx
            .types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("i32")).build());
        let data = OperationDataBuilder::new(loc, Symbol::new("arith"), Symbol::new("const"))
            .result(i32_ty)
            .build(ctx);
        ctx.create_op(data)
    }

    #[test]
    fn walk_region_finds_all_ops() {
        let (mut ctx, loc) = test_ctx();
        let op1 = const_op(&mut ctx, loc);
        let op2 = const_op(&mut ctx, loc);

        let block = ctx.create_empty_block(loc);
        ctx.push_op(block, op1);
        ctx.push_op(block, op2);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let mut count = 0;
        let _ = walk_region::<()>(&ctx, region, &mut |_op| {
            count += 1;
            ControlFlow::Continue(WalkAction::Advance)
        });
        assert_eq!(count, 2);
    }

    #[test]
    fn walk_with_early_exit() {
        let (mut ctx, loc) = test_ctx();
        let op1 = const_op(&mut ctx, loc);
        let op2 = const_op(&mut ctx, loc);

        let block = ctx.create_empty_block(loc);
        ctx.push_op(block, op1);
        ctx.push_op(block, op2);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });

        let mut visited = 0;
        let result = walk_region::<()>(&ctx, region, &mut |_op| {
            visited += 1;
            ControlFlow::Break(())
        });
        assert!(result.is_break());
        assert_eq!(visited, 1);
    }

    #[test]
    fn walk_skip_nested_regions() {
        let (mut ctx, loc) = test_ctx();

        let inner = const_op(&mut ctx, loc);
        let inner_block = ctx.create_empty_block(loc);
        ctx.push_op(inner_block, inner);
        let inner_region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![inner_block],
            parent_op: None,
        });

        let func_data = OperationDataBuilder::new(loc, Symbol::new("func"), Symbol::new("func"))
            .region(inner_region)
            .build(&mut ctx);
        let func_op = ctx.create_op(func_data);
        let outer_block = ctx.create_empty_block(loc);
        ctx.push_op(outer_block, func_op);
        let outer_region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![outer_block],
            parent_op: None,
        });

        let mut found_const = false;
        let _ = walk_region::<()>(&ctx, outer_region, &mut |op| {
            let data = ctx.op(op);
            if data.dialect == Symbol::new("func") {
                ControlFlow::<(), _>::Continue(WalkAction::Skip)
            } else {
                if data.dialect == Symbol::new("arith") {
                    found_const = true;
                }
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        assert!(!found_const);
    }
}
