//! Dialect operation wrapper trait.
//!
//! Typed wrappers give structured access to generic `OperationData`:
//! `from_op` checks the dialect/op name and returns a `Copy` handle with
//! accessor methods defined per operation in `crate::dialect`.

use std::fmt;

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::symbol::Symbol;

/// Trait for typed dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT: &'static str;
    const NAME: &'static str;

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, OpMismatch>;
    fn op_ref(self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        let data = ctx.op(op);
        data.dialect == Symbol::new(Self::DIALECT) && data.name == Symbol::new(Self::NAME)
    }
}

/// Error returned when an operation does not have the expected kind.
#[derive(Clone, Copy, Debug)]
pub struct OpMismatch {
    pub expected_dialect: &'static str,
    pub expected_name: &'static str,
    pub op: OpRef,
}

impl OpMismatch {
    pub fn new<T: DialectOp>(op: OpRef) -> Self {
        Self {
            expected_dialect: T::DIALECT,
            expected_name: T::NAME,
            op,
        }
    }
}

impl fmt::Display for OpMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation {} is not a {}.{}",
            self.op, self.expected_dialect, self.expected_name
        )
    }
}

impl std::error::Error for OpMismatch {}

/// Implements the `DialectOp` boilerplate for a newtype wrapper over `OpRef`.
macro_rules! impl_dialect_op {
    ($ty:ident, $dialect:literal, $name:literal) => {
        impl $crate::ops::DialectOp for $ty {
            const DIALECT: &'static str = $dialect;
            const NAME: &'static str = $name;

            fn from_op(
                ctx: &$crate::context::IrContext,
                op: $crate::refs::OpRef,
            ) -> Result<Self, $crate::ops::OpMismatch> {
                if Self::matches(ctx, op) {
                    Ok(Self(op))
                } else {
                    Err($crate::ops::OpMismatch::new::<Self>(op))
                }
            }

            fn op_ref(self) -> $crate::refs::OpRef {
                self.0
            }
        }
    };
}
pub(crate) use impl_dialect_op;
