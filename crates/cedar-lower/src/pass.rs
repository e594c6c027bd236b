//! The pass abstraction and its state machine.

use derive_more::{Display, Error, From};

use cedar_ir::context::IrContext;
use cedar_ir::dialect::core::Module;
use cedar_ir::rewrite::ConversionError;
use cedar_ir::validation::{self, VerificationError};

/// One unit of conversion work with its own legality predicate and
/// pattern set.
pub trait Pass {
    /// Stable textual name, used for registry lookup and diagnostics.
    fn name(&self) -> &'static str;

    /// Run the pass over the module, mutating it in place.
    fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError>;
}

/// Why a pass failed.
#[derive(Debug, Display, Error, From)]
pub enum PassError {
    #[display("{_0}")]
    Conversion(ConversionError),
    #[display("{_0}")]
    Verification(VerificationError),
}

/// Per-pass state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// Whole-pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Pending,
    Running,
    Succeeded,
    Aborted,
}

/// Auxiliary pass that runs the structural verifier.
pub struct VerifyPass;

impl Pass for VerifyPass {
    fn name(&self) -> &'static str {
        "verify"
    }

    fn run(&self, ctx: &mut IrContext, module: Module) -> Result<(), PassError> {
        validation::verify_module(ctx, module)?;
        Ok(())
    }
}
