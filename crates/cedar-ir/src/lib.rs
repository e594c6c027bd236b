//! Cedar IR crate.
//!
//! The compiler's central multi-level dialect IR: arena-allocated operations,
//! values, blocks, and regions with explicit use-chains, plus the rewrite
//! infrastructure (patterns, conversion targets, type converters, and the
//! full/partial conversion driver) that lowers the `cedar` source dialect
//! down to the flat `clif` target dialect.

pub mod clone;
pub mod context;
pub mod dialect;
pub mod location;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod refs;
pub mod rewrite;
pub mod symbol;
pub mod types;
pub mod validation;
pub mod walk;

pub use clone::{ValueMapper, clone_region};
pub use context::{
    BlockArgData, BlockData, IrContext, OperationData, OperationDataBuilder, RegionData, Use,
};
pub use location::Span;
pub use ops::{DialectOp, OpMismatch};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{Attribute, Location, PathInterner, TypeData, TypeDataBuilder, TypeInterner};
pub use walk::WalkAction;
