//! Error types for Cranelift emission.

use derive_more::{Display, From};

pub type CompilationResult<T> = Result<T, CompilationError>;

#[derive(Display, Debug, From)]
#[display("{kind}")]
pub struct CompilationError {
    #[from]
    kind: Box<CompilationErrorKind>,
}

impl<E> From<E> for CompilationError
where
    CompilationErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        CompilationError {
            kind: Box::new(CompilationErrorKind::from(error)),
        }
    }
}

impl CompilationError {
    pub(crate) fn codegen(msg: impl std::fmt::Display) -> Self {
        CompilationErrorKind::Codegen(msg.to_string()).into()
    }

    pub(crate) fn type_error(msg: impl std::fmt::Display) -> Self {
        CompilationErrorKind::TypeError(msg.to_string()).into()
    }

    pub(crate) fn function_not_found(name: impl std::fmt::Display) -> Self {
        CompilationErrorKind::FunctionNotFound(name.to_string()).into()
    }

    pub(crate) fn invalid_target(msg: impl std::fmt::Display) -> Self {
        CompilationErrorKind::InvalidTarget(msg.to_string()).into()
    }

    pub(crate) fn empty_object() -> Self {
        CompilationErrorKind::EmptyObject.into()
    }

    pub fn kind(&self) -> &CompilationErrorKind {
        &self.kind
    }
}

impl std::error::Error for CompilationError {}

#[derive(Display, Debug)]
pub enum CompilationErrorKind {
    #[display("code generation error: {_0}")]
    Codegen(String),

    #[display("module error: {_0}")]
    Module(cranelift_module::ModuleError),

    #[display("type error: {_0}")]
    TypeError(String),

    #[display("function not found: {_0}")]
    FunctionNotFound(String),

    #[display("invalid target: {_0}")]
    InvalidTarget(String),

    #[display("object generation failed: {_0}")]
    Object(object::write::Error),

    #[display("emission produced an empty object")]
    EmptyObject,
}

impl From<cranelift_module::ModuleError> for CompilationErrorKind {
    fn from(error: cranelift_module::ModuleError) -> Self {
        CompilationErrorKind::Module(error)
    }
}

impl From<object::write::Error> for CompilationErrorKind {
    fn from(error: object::write::Error) -> Self {
        CompilationErrorKind::Object(error)
    }
}
