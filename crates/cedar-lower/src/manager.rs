//! Sequential pass manager.
//!
//! Runs passes strictly in registration order against one shared module.
//! The pipeline advances to the next pass only when the current pass
//! succeeds; the first failure aborts the whole pipeline and no later pass
//! runs.

use derive_more::{Display, Error};

use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;

use crate::pass::{Pass, PassError, PassStatus, PipelineStatus};

/// A failed pipeline run: which pass failed and why.
#[derive(Debug, Display, Error)]
#[display("pass '{pass}' failed: {error}")]
pub struct PipelineError {
    pub pass: &'static str,
    #[error(source)]
    pub error: PassError,
}

/// Ordered sequence of passes with per-pass and pipeline state tracking.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    statuses: Vec<PassStatus>,
    status: PipelineStatus,
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            statuses: Vec::new(),
            status: PipelineStatus::Pending,
        }
    }

    /// Append a pass to the end of the pipeline.
    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
        self.statuses.push(PassStatus::Pending);
    }

    /// Run all passes in order. Stops at the first failure.
    pub fn run(&mut self, ctx: &mut IrContext, module: Module) -> Result<(), PipelineError> {
        self.status = PipelineStatus::Running;

        for i in 0..self.passes.len() {
            let name = self.passes[i].name();
            self.statuses[i] = PassStatus::Running;
            tracing::debug!(pass = name, "pass started");

            match self.passes[i].run(ctx, module) {
                Ok(()) => {
                    self.statuses[i] = PassStatus::Succeeded;
                    tracing::debug!(pass = name, "pass succeeded");
                }
                Err(error) => {
                    self.statuses[i] = PassStatus::Failed;
                    self.status = PipelineStatus::Aborted;
                    tracing::debug!(pass = name, %error, "pass failed; pipeline aborted");
                    return Err(PipelineError { pass: name, error });
                }
            }
        }

        self.status = PipelineStatus::Succeeded;
        Ok(())
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn pass_statuses(&self) -> &[PassStatus] {
        &self.statuses
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedar_ir::dialect::core;
    use cedar_ir::location::Span;
    use cedar_ir::rewrite::{ConversionError, ConversionTarget, ConversionDriver, TypeConverter};
    use cedar_ir::symbol::Symbol;
    use cedar_ir::types::Location;

    struct NoopPass;
    impl Pass for NoopPass {
        fn name(&self) -> &'static str {
            "noop"
        }
        fn run(&self, _ctx: &mut IrContext, _module: Module) -> Result<(), PassError> {
            Ok(())
        }
    }

    /// Fails with a conversion error without touching the module.
    struct FailPass;
    impl Pass for FailPass {
        fn name(&self) -> &'static str {
            "fail"
        }
        fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError> {
            // An impossible target: the module's own ops are never legal.
            let driver = ConversionDriver::new(TypeConverter::new());
            let target = ConversionTarget::new();
            driver.apply_full(ctx, module, &target)?;
            Ok(())
        }
    }

    fn test_module() -> (IrContext, Module) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("test.cdr".to_owned());
        let loc = Location::new(path, Span::new(0, 0));
        let module = core::module(&mut ctx, loc, Symbol::new("m"));
        // One op so the full conversion in FailPass has something illegal.
        let ty = core::i32_ty(&mut ctx);
        let data = cedar_ir::context::OperationDataBuilder::new(
            loc,
            Symbol::new("test"),
            Symbol::new("stray"),
        )
        .result(ty)
        .build(&mut ctx);
        let op = ctx.create_op(data);
        module.push_op(&mut ctx, op);
        (ctx, module)
    }

    #[test]
    fn all_passes_succeed() {
        let (mut ctx, module) = test_module();
        let mut pm = PassManager::new();
        pm.add_pass(Box::new(NoopPass));
        pm.add_pass(Box::new(NoopPass));
        assert_eq!(pm.status(), PipelineStatus::Pending);

        pm.run(&mut ctx, module).expect("must succeed");
        assert_eq!(pm.status(), PipelineStatus::Succeeded);
        assert_eq!(
            pm.pass_statuses(),
            &[PassStatus::Succeeded, PassStatus::Succeeded]
        );
    }

    #[test]
    fn failure_short_circuits_later_passes() {
        let (mut ctx, module) = test_module();
        let mut pm = PassManager::new();
        pm.add_pass(Box::new(NoopPass));
        pm.add_pass(Box::new(FailPass));
        pm.add_pass(Box::new(NoopPass));

        let err = pm.run(&mut ctx, module).unwrap_err();
        assert_eq!(err.pass, "fail");
        assert!(matches!(err.error, PassError::Conversion(ConversionError::ConversionFailure { .. })));

        assert_eq!(pm.status(), PipelineStatus::Aborted);
        // The pass after the failure never ran.
        assert_eq!(
            pm.pass_statuses(),
            &[
                PassStatus::Succeeded,
                PassStatus::Failed,
                PassStatus::Pending
            ]
        );
    }
}
