//! The three-stage lowering pipeline.

use derive_more::{Display, Error, From};

use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;
use cedar_ir::validation::{self, VerificationError};

use crate::manager::{PassManager, PipelineError};
use crate::memory::ConvertCedarToMem;
use crate::structural::ConvertCedarToFunc;
use crate::target::ConvertToClif;

/// Why lowering failed: a pass aborted the pipeline, or the verifier
/// rejected the pipeline's own output (a rewrite produced ill-formed IR).
#[derive(Debug, Display, Error, From)]
pub enum LowerError {
    #[display("{_0}")]
    Pipeline(PipelineError),
    #[display("{_0}")]
    Verification(VerificationError),
}

/// The canonical stage order. Each stage assumes the previous stage's
/// legal set as its precondition.
pub fn build_pipeline() -> PassManager {
    let mut pm = PassManager::new();
    pm.add_pass(Box::new(ConvertCedarToFunc));
    pm.add_pass(Box::new(ConvertCedarToMem));
    pm.add_pass(Box::new(ConvertToClif));
    pm
}

/// Lower a source-dialect module all the way to the `clif` dialect and
/// verify the result. On failure the module is left partially rewritten
/// and must be discarded by the caller.
pub fn lower_to_clif(ctx: &mut IrContext, module: Module) -> Result<(), LowerError> {
    let mut pm = build_pipeline();
    tracing::info!("lowering module to clif");
    pm.run(ctx, module)?;
    validation::verify_module(ctx, module)?;
    tracing::info!("lowering succeeded");
    Ok(())
}
