//! Structural region cloning with value remapping.
//!
//! Function-lowering rewrites transplant a body region into a freshly built
//! function header. The transplant is a deep structural clone: every block,
//! block argument, and operation is recreated in the destination, and every
//! operand is rewritten through a [`ValueMapper`] to point at its clone.
//! Operands defined outside the cloned region fall through unmapped.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};

/// Fresh defining-site mapping from source values to their clones.
#[derive(Default)]
pub struct ValueMapper {
    values: HashMap<ValueRef, ValueRef>,
    blocks: HashMap<BlockRef, BlockRef>,
}

impl ValueMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old` is cloned as `new`.
    pub fn map_value(&mut self, old: ValueRef, new: ValueRef) {
        self.values.insert(old, new);
    }

    /// Record that block `old` is cloned as `new`.
    pub fn map_block(&mut self, old: BlockRef, new: BlockRef) {
        self.blocks.insert(old, new);
    }

    /// Resolve a value: its clone if mapped, itself otherwise.
    pub fn lookup(&self, v: ValueRef) -> ValueRef {
        self.values.get(&v).copied().unwrap_or(v)
    }

    /// Resolve a block: its clone if mapped, itself otherwise.
    pub fn lookup_block(&self, b: BlockRef) -> BlockRef {
        self.blocks.get(&b).copied().unwrap_or(b)
    }

    /// Whether `old` has a recorded clone.
    pub fn contains(&self, v: ValueRef) -> bool {
        self.values.contains_key(&v)
    }
}

/// Clone a region and everything inside it.
///
/// `ty_map` is applied to every block-argument type and operation result
/// type (pass the identity to clone without type conversion). Operand
/// wiring is remapped through `mapper`; attributes and successor structure
/// are preserved. The mapper is left populated so callers can relate source
/// values to their clones afterwards.
pub fn clone_region(
    ctx: &mut IrContext,
    src: RegionRef,
    mapper: &mut ValueMapper,
    ty_map: &mut dyn FnMut(&mut IrContext, TypeRef) -> TypeRef,
) -> RegionRef {
    let location = ctx.region(src).location;
    let src_blocks: SmallVec<[BlockRef; 4]> = ctx.region(src).blocks.clone();

    // Pass 1: create all destination blocks up front so forward successor
    // references resolve, and map their arguments.
    let mut dst_blocks: SmallVec<[BlockRef; 4]> = SmallVec::new();
    for &src_block in &src_blocks {
        let block_loc = ctx.block(src_block).location;
        let arg_tys: Vec<TypeRef> = ctx.block(src_block).args.iter().map(|a| a.ty).collect();
        let args: Vec<BlockArgData> = arg_tys
            .into_iter()
            .map(|ty| BlockArgData {
                ty: ty_map(ctx, ty),
            })
            .collect();
        let dst_block = ctx.create_block(BlockData {
            location: block_loc,
            args,
            ops: SmallVec::new(),
            parent_region: None,
        });
        mapper.map_block(src_block, dst_block);
        let src_args: Vec<ValueRef> = ctx.block_args(src_block).to_vec();
        let dst_args: Vec<ValueRef> = ctx.block_args(dst_block).to_vec();
        for (old, new) in src_args.into_iter().zip(dst_args) {
            mapper.map_value(old, new);
        }
        dst_blocks.push(dst_block);
    }

    // Pass 2: clone operations block by block, in order.
    for (&src_block, &dst_block) in src_blocks.iter().zip(dst_blocks.iter()) {
        let ops: SmallVec<[OpRef; 4]> = ctx.block(src_block).ops.clone();
        for op in ops {
            let new_op = clone_op(ctx, op, mapper, ty_map);
            ctx.push_op(dst_block, new_op);
        }
    }

    ctx.create_region(RegionData {
        location,
        blocks: dst_blocks,
        parent_op: None,
    })
}

fn clone_op(
    ctx: &mut IrContext,
    op: OpRef,
    mapper: &mut ValueMapper,
    ty_map: &mut dyn FnMut(&mut IrContext, TypeRef) -> TypeRef,
) -> OpRef {
    let (location, dialect, name) = {
        let data = ctx.op(op);
        (data.location, data.dialect, data.name)
    };
    let operands: Vec<ValueRef> = ctx.op_operands(op).iter().map(|&v| mapper.lookup(v)).collect();
    let result_types: Vec<TypeRef> = ctx.op_result_types(op).to_vec();
    let attributes = ctx.op(op).attributes.clone();
    let successors: SmallVec<[BlockRef; 4]> = ctx.op(op).successors.clone();
    let src_regions: SmallVec<[RegionRef; 4]> = ctx.op(op).regions.clone();

    let mut builder = OperationDataBuilder::new(location, dialect, name).operands(operands);
    for ty in result_types {
        let mapped = ty_map(ctx, ty);
        builder = builder.result(mapped);
    }
    for (key, val) in attributes {
        builder = builder.attr(key, val);
    }
    for succ in successors {
        builder = builder.successor(mapper.lookup_block(succ));
    }
    for src_region in src_regions {
        let cloned = clone_region(ctx, src_region, mapper, ty_map);
        builder = builder.region(cloned);
    }

    let data = builder.build(ctx);
    let new_op = ctx.create_op(data);

    let old_results: Vec<ValueRef> = ctx.op_results(op).to_vec();
    let new_results: Vec<ValueRef> = ctx.op_results(new_op).to_vec();
    for (old, new) in old_results.into_iter().zip(new_results) {
        mapper.map_value(old, new);
    }

    new_op
}
