//! Cranelift native backend for lowered Cedar modules.
//!
//! Consumes a module whose operations are entirely in the `clif` dialect
//! (the output of the lowering pipeline) and performs the structural
//! translation to Cranelift IR, producing a native object file.
//!
//! - `function`: clif.* → Cranelift `FunctionBuilder` instruction emission
//! - `translate`: module-level orchestration (declare, define, emit)
//! - `errors`: the backend error taxonomy

mod errors;
mod function;
mod translate;

pub use errors::{CompilationError, CompilationErrorKind, CompilationResult};
pub use translate::{ObjectEmitter, emit_object};
