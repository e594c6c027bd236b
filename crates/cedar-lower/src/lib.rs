//! Lowering passes for the Cedar compiler.
//!
//! The pipeline narrows the IR one dialect at a time:
//!
//! ```text
//! cedar.*  ──convert-cedar-to-func──►  func.* + cedar memory ops
//!          ──convert-cedar-to-mem───►  func.* + mem.* + arith.*
//!          ──convert-to-clif────────►  clif.*          (full conversion)
//! ```
//!
//! Each stage is a [`Pass`] pairing a pattern set with a legality target;
//! the [`PassManager`] runs them strictly in order and aborts on the first
//! failure. After the last stage the structural verifier must accept the
//! module before it is handed to the backend.

pub mod convert;
pub mod manager;
pub mod memory;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod structural;
pub mod target;

pub use manager::{PassManager, PipelineError};
pub use pass::{Pass, PassError, PassStatus, PipelineStatus, VerifyPass};
pub use pipeline::{LowerError, build_pipeline, lower_to_clif};
pub use registry::{DuplicatePass, PassRegistry, default_registry};
pub use structural::ConvertCedarToFunc;
pub use memory::ConvertCedarToMem;
pub use target::ConvertToClif;
