//! Conversion driver: applies rewrite patterns to a module under a legality
//! target, in full or partial mode.
//!
//! Application is a fixpoint sweep over block snapshots. Ops detached by an
//! earlier rewrite in the same sweep are re-validated (parent-block check)
//! and skipped, so a pattern never observes a stale operation.

use std::cmp::Reverse;
use std::fmt;

use crate::context::IrContext;
use crate::dialect::core::Module;
use crate::refs::{BlockRef, OpRef, RegionRef};
use crate::rewrite::conversion_target::{ConversionTarget, IllegalOp};
use crate::rewrite::pattern::RewritePattern;
use crate::rewrite::rewriter::{self, PatternRewriter};
use crate::rewrite::type_converter::TypeConverter;

/// Result of applying rewrite patterns.
#[derive(Debug)]
pub struct ApplyResult {
    /// Number of fixpoint iterations performed.
    pub iterations: usize,
    /// Total number of pattern matches (mutations applied).
    pub total_changes: usize,
    /// Whether the fixpoint was reached (no changes in last iteration).
    pub reached_fixpoint: bool,
}

/// Fatal conversion failure.
#[derive(Debug)]
pub enum ConversionError {
    /// A sweep finished with operations that violate the target's legality
    /// requirements for the chosen mode.
    ConversionFailure { remaining: Vec<IllegalOp> },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::ConversionFailure { remaining } => {
                write!(
                    f,
                    "conversion failed: {} illegal operation(s) remain:",
                    remaining.len()
                )?;
                for op in remaining {
                    write!(f, " {op}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConversionError {}

/// Applies rewrite patterns using fixpoint iteration.
pub struct ConversionDriver {
    patterns: Vec<Box<dyn RewritePattern>>,
    type_converter: TypeConverter,
    max_iterations: usize,
}

impl ConversionDriver {
    /// Create a new driver with the given type converter.
    pub fn new(type_converter: TypeConverter) -> Self {
        Self {
            patterns: Vec::new(),
            type_converter,
            max_iterations: 10,
        }
    }

    /// Register a rewrite pattern. Registration order breaks benefit ties.
    pub fn add_pattern(mut self, pattern: impl RewritePattern + 'static) -> Self {
        self.patterns.push(Box::new(pattern));
        self
    }

    /// Set maximum fixpoint iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// The driver's type converter.
    pub fn type_converter(&self) -> &TypeConverter {
        &self.type_converter
    }

    /// Partial conversion: ops with no applicable pattern and not declared
    /// illegal pass through; only explicitly illegal survivors are an error.
    pub fn apply_partial(
        &self,
        ctx: &mut IrContext,
        module: Module,
        target: &ConversionTarget,
    ) -> Result<ApplyResult, ConversionError> {
        let result = self.apply_patterns(ctx, module, target);
        let remaining = target.collect_illegal(ctx, module.body(ctx));
        if remaining.is_empty() {
            Ok(result)
        } else {
            Err(ConversionError::ConversionFailure { remaining })
        }
    }

    /// Full conversion: every reachable operation must end up legal.
    pub fn apply_full(
        &self,
        ctx: &mut IrContext,
        module: Module,
        target: &ConversionTarget,
    ) -> Result<ApplyResult, ConversionError> {
        let result = self.apply_patterns(ctx, module, target);
        let remaining = target.collect_non_legal(ctx, module.body(ctx));
        if remaining.is_empty() {
            Ok(result)
        } else {
            Err(ConversionError::ConversionFailure { remaining })
        }
    }

    /// Patterns in application order: benefit descending, then registration
    /// order. The sort is stable, so equal benefits keep their registration
    /// order and application is deterministic across runs.
    fn sorted_patterns(&self) -> Vec<&dyn RewritePattern> {
        let mut order: Vec<usize> = (0..self.patterns.len()).collect();
        order.sort_by_key(|&i| Reverse(self.patterns[i].benefit()));
        order
            .into_iter()
            .map(|i| self.patterns[i].as_ref())
            .collect()
    }

    /// Run the fixpoint sweep without verifying legality.
    fn apply_patterns(
        &self,
        ctx: &mut IrContext,
        module: Module,
        target: &ConversionTarget,
    ) -> ApplyResult {
        let patterns = self.sorted_patterns();
        let body = module.body(ctx);

        let mut total_changes = 0;
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let changes = self.visit_region(ctx, body, target, &patterns);
            total_changes += changes;
            if changes == 0 {
                return ApplyResult {
                    iterations,
                    total_changes,
                    reached_fixpoint: true,
                };
            }
        }

        ApplyResult {
            iterations,
            total_changes,
            reached_fixpoint: false,
        }
    }

    fn visit_region(
        &self,
        ctx: &mut IrContext,
        region: RegionRef,
        target: &ConversionTarget,
        patterns: &[&dyn RewritePattern],
    ) -> usize {
        let mut changes = 0;
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        for block in blocks {
            changes += self.visit_block(ctx, block, target, patterns);
        }
        changes
    }

    fn visit_block(
        &self,
        ctx: &mut IrContext,
        block: BlockRef,
        target: &ConversionTarget,
        patterns: &[&dyn RewritePattern],
    ) -> usize {
        let mut changes = 0;

        // Snapshot the ops in this block.
        let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();

        for op in ops {
            // Skip ops removed from the block since the snapshot.
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            // Recurse into nested regions first.
            let regions: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            for region in regions {
                changes += self.visit_region(ctx, region, target, patterns);
            }

            // Re-validate: nested processing may have replaced this op.
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            // Already-legal ops need no conversion.
            if target.is_legal(ctx, op) {
                continue;
            }

            for pattern in patterns {
                let mut rw = PatternRewriter::new(&self.type_converter);
                let matched = pattern.match_and_rewrite(ctx, op, &mut rw);
                if matched && rw.has_mutations() {
                    let mutations = rw.take_mutations();
                    rewriter::apply_mutations(ctx, op, mutations);
                    changes += 1;
                    break; // Only one pattern per op per iteration.
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::dialect::core;
    use crate::location::Span;
    use crate::refs::TypeRef;
    use crate::symbol::Symbol;
    use crate::types::{Location, TypeDataBuilder};

    fn test_ctx() -> (IrContext, Location) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.cdr".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        (ctx, loc)
    }

    fn i32_type(ctx: &mut IrContext) -> TypeRef {
        ctx.types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("i32")).build())
    }

    fn make_module(ctx: &mut IrContext, loc: Location, ops: Vec<OpRef>) -> Module {
        let module = core::module(ctx, loc, Symbol::new("test"));
        for op in ops {
            module.push_op(ctx, op);
        }
        module
    }

    fn make_op(
        ctx: &mut IrContext,
        loc: Location,
        dialect: &'static str,
        name: &'static str,
    ) -> OpRef {
        let ty = i32_type(ctx);
        let data = OperationDataBuilder::new(loc, Symbol::new(dialect), Symbol::new(name))
            .result(ty)
            .build(ctx);
        ctx.create_op(data)
    }

    /// Renames `test.<from>` to `test.<to>`, keeping result types.
    struct Rename {
        from: &'static str,
        to: &'static str,
        benefit: u16,
    }

    impl RewritePattern for Rename {
        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter<'_>,
        ) -> bool {
            let data = ctx.op(op);
            if data.dialect != Symbol::new("test") || data.name != Symbol::from_dynamic(self.from) {
                return false;
            }
            let loc = data.location;
            let result_types: Vec<TypeRef> = ctx.op_result_types(op).to_vec();
            let new_data =
                OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::from_dynamic(self.to))
                    .results(result_types)
                    .build(ctx);
            let new_op = ctx.create_op(new_data);
            rewriter.replace_op(new_op);
            true
        }

        fn benefit(&self) -> u16 {
            self.benefit
        }
    }

    #[test]
    fn driver_renames_and_preserves_uses() {
        let (mut ctx, loc) = test_ctx();
        let src = make_op(&mut ctx, loc, "test", "source");
        let v = ctx.op_result(src, 0);
        let i32_ty = i32_type(&mut ctx);
        let use_data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new("sink"))
            .operand(v)
            .result(i32_ty)
            .build(&mut ctx);
        let sink = ctx.create_op(use_data);
        let module = make_module(&mut ctx, loc, vec![src, sink]);

        let driver = ConversionDriver::new(TypeConverter::new()).add_pattern(Rename {
            from: "source",
            to: "target",
            benefit: 1,
        });
        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "source");
        target.add_legal_op("test", "target");
        target.add_legal_op("test", "sink");

        let result = driver.apply_partial(&mut ctx, module, &target).unwrap();
        assert!(result.reached_fixpoint);
        assert_eq!(result.total_changes, 1);

        let ops = module.ops(&ctx);
        assert_eq!(ops.len(), 2);
        assert_eq!(ctx.op(ops[0]).name, Symbol::new("target"));
        // The sink's operand was redirected to the replacement's result.
        let new_v = ctx.op_result(ops[0], 0);
        assert_eq!(ctx.op_operands(ops[1]), &[new_v]);
        assert!(!ctx.has_uses(v));
    }

    #[test]
    fn higher_benefit_pattern_wins() {
        let (mut ctx, loc) = test_ctx();
        let src = make_op(&mut ctx, loc, "test", "source");
        let module = make_module(&mut ctx, loc, vec![src]);

        // Registered first but lower benefit: must lose.
        let driver = ConversionDriver::new(TypeConverter::new())
            .add_pattern(Rename {
                from: "source",
                to: "low",
                benefit: 1,
            })
            .add_pattern(Rename {
                from: "source",
                to: "high",
                benefit: 5,
            });
        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "source");

        driver.apply_partial(&mut ctx, module, &target).unwrap();
        let ops = module.ops(&ctx);
        assert_eq!(ctx.op(ops[0]).name, Symbol::new("high"));
    }

    #[test]
    fn equal_benefit_keeps_registration_order() {
        let (mut ctx, loc) = test_ctx();
        let src = make_op(&mut ctx, loc, "test", "source");
        let module = make_module(&mut ctx, loc, vec![src]);

        let driver = ConversionDriver::new(TypeConverter::new())
            .add_pattern(Rename {
                from: "source",
                to: "first",
                benefit: 2,
            })
            .add_pattern(Rename {
                from: "source",
                to: "second",
                benefit: 2,
            });
        let target = ConversionTarget::new();

        driver.apply_partial(&mut ctx, module, &target).unwrap();
        let ops = module.ops(&ctx);
        assert_eq!(ctx.op(ops[0]).name, Symbol::new("first"));
    }

    #[test]
    fn transitive_rewrites_reach_fixpoint() {
        let (mut ctx, loc) = test_ctx();
        let src = make_op(&mut ctx, loc, "test", "a");
        let module = make_module(&mut ctx, loc, vec![src]);

        // a -> b -> c across iterations.
        let driver = ConversionDriver::new(TypeConverter::new())
            .add_pattern(Rename {
                from: "a",
                to: "b",
                benefit: 1,
            })
            .add_pattern(Rename {
                from: "b",
                to: "c",
                benefit: 1,
            });
        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "a");
        target.add_illegal_op("test", "b");

        let result = driver.apply_partial(&mut ctx, module, &target).unwrap();
        assert!(result.reached_fixpoint);
        assert_eq!(result.total_changes, 2);
        let ops = module.ops(&ctx);
        assert_eq!(ctx.op(ops[0]).name, Symbol::new("c"));
    }

    #[test]
    fn full_conversion_rejects_unknown_survivors() {
        let (mut ctx, loc) = test_ctx();
        let stray = make_op(&mut ctx, loc, "test", "stray");
        let module = make_module(&mut ctx, loc, vec![stray]);

        let driver = ConversionDriver::new(TypeConverter::new());
        let target = ConversionTarget::new(); // nothing is legal

        let err = driver.apply_full(&mut ctx, module, &target).unwrap_err();
        let ConversionError::ConversionFailure { remaining } = err;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, Symbol::new("stray"));
    }

    #[test]
    fn partial_conversion_passes_unknown_through() {
        let (mut ctx, loc) = test_ctx();
        let stray = make_op(&mut ctx, loc, "test", "stray");
        let module = make_module(&mut ctx, loc, vec![stray]);

        let driver = ConversionDriver::new(TypeConverter::new());
        let target = ConversionTarget::new();

        let result = driver.apply_partial(&mut ctx, module, &target).unwrap();
        assert_eq!(result.total_changes, 0);
        // The stray op is still there, untouched.
        let ops = module.ops(&ctx);
        assert_eq!(ops, vec![stray]);
    }

    #[test]
    fn partial_conversion_fails_on_illegal_survivor() {
        let (mut ctx, loc) = test_ctx();
        let stray = make_op(&mut ctx, loc, "test", "stray");
        let module = make_module(&mut ctx, loc, vec![stray]);

        let driver = ConversionDriver::new(TypeConverter::new()); // no patterns
        let mut target = ConversionTarget::new();
        target.add_illegal_op("test", "stray");

        let err = driver.apply_partial(&mut ctx, module, &target).unwrap_err();
        let ConversionError::ConversionFailure { remaining } = err;
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn legal_ops_are_not_matched() {
        let (mut ctx, loc) = test_ctx();
        let op = make_op(&mut ctx, loc, "test", "source");
        let module = make_module(&mut ctx, loc, vec![op]);

        let driver = ConversionDriver::new(TypeConverter::new()).add_pattern(Rename {
            from: "source",
            to: "target",
            benefit: 1,
        });
        let mut target = ConversionTarget::new();
        target.add_legal_op("test", "source");

        let result = driver.apply_partial(&mut ctx, module, &target).unwrap();
        assert_eq!(result.total_changes, 0);
        assert_eq!(ctx.op(module.ops(&ctx)[0]).name, Symbol::new("source"));
    }
}
