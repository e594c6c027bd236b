//! Rewrite pattern trait.

use crate::context::IrContext;
use crate::refs::OpRef;
use crate::rewrite::rewriter::PatternRewriter;

/// A pattern that can match and transform one operation kind.
///
/// # Arguments
///
/// - `ctx`: Mutable reference to the IR context for querying and creating
///   replacement entities.
/// - `op`: The candidate operation.
/// - `rewriter`: Accumulates mutations (insert, replace, erase).
///
/// # Return value
///
/// Return `true` if the pattern matched and recorded mutations via the
/// rewriter. Return `false` for no-match; the IR must be left unmodified in
/// that case (a type conversion coming back unsupported mid-match is
/// reported the same way).
pub trait RewritePattern {
    /// Attempt to match and rewrite an operation.
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool;

    /// Relative priority among patterns matching the same operation.
    ///
    /// Higher benefit wins; ties are broken by registration order.
    fn benefit(&self) -> u16 {
        1
    }

    /// Human-readable name for debugging.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
