//! Module-level object emission.
//!
//! Declares every `clif.func` in an `ObjectModule`, defines each body via
//! [`crate::function::FunctionTranslator`], and emits the final object
//! bytes. A module containing anything but `clif` functions at the top
//! level is rejected: lowering must have run first.

use std::collections::HashMap;

use cranelift_codegen::ir::{Function, Signature, UserFuncName};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{FuncId, Linkage, Module as _, default_libcall_names};
use cranelift_object::{ObjectBuilder, ObjectModule};
use target_lexicon::Triple;

use cedar_ir::context::IrContext;
use cedar_ir::dialect::clif;
use cedar_ir::dialect::core::Module;
use cedar_ir::ops::DialectOp;
use cedar_ir::symbol::Symbol;

use crate::errors::{CompilationError, CompilationResult};
use crate::function::{FunctionTranslator, translate_signature};

/// Emits native object files from fully lowered modules.
pub struct ObjectEmitter {
    module: ObjectModule,
}

impl ObjectEmitter {
    /// Create an emitter for the given target (host if unspecified).
    pub fn new(target: Option<Triple>) -> CompilationResult<Self> {
        let target = target.unwrap_or_else(Triple::host);

        let mut flag_builder = settings::builder();
        flag_builder
            .set("use_colocated_libcalls", "false")
            .map_err(CompilationError::codegen)?;
        flag_builder
            .set("is_pic", "false")
            .map_err(CompilationError::codegen)?;

        let isa_builder = cranelift_codegen::isa::lookup(target.clone())
            .map_err(CompilationError::invalid_target)?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(CompilationError::codegen)?;

        let object_builder = ObjectBuilder::new(isa, "cedar", default_libcall_names())
            .map_err(CompilationError::codegen)?;
        let module = ObjectModule::new(object_builder);

        Ok(ObjectEmitter { module })
    }

    /// Translate a lowered module and emit object bytes.
    pub fn emit_module(mut self, ctx: &IrContext, module: Module) -> CompilationResult<Vec<u8>> {
        let call_conv = self.module.isa().default_call_conv();

        // Declare all functions first so calls between them resolve.
        let mut func_ids: HashMap<Symbol, (FuncId, Signature)> = HashMap::new();
        let mut funcs = Vec::new();
        for op in module.ops(ctx) {
            let f = clif::Func::from_op(ctx, op).map_err(|_| {
                CompilationError::codegen(format!(
                    "cannot emit unlowered operation {}",
                    ctx.op_full_name(op),
                ))
            })?;
            let sym = f.sym_name(ctx);
            let sig = translate_signature(ctx, f.ty(ctx), call_conv)?;
            let id = self
                .module
                .declare_function(&sym.to_string(), Linkage::Export, &sig)?;
            func_ids.insert(sym, (id, sig));
            funcs.push(f);
        }

        // Define each function body.
        let mut fb_ctx = FunctionBuilderContext::new();
        for f in funcs {
            let sym = f.sym_name(ctx);
            let (id, sig) = func_ids
                .get(&sym)
                .cloned()
                .expect("function was declared above");
            tracing::debug!(function = %sym, "defining function");

            let mut cl_func = Function::with_name_signature(UserFuncName::user(0, id.as_u32()), sig);
            {
                let builder = FunctionBuilder::new(&mut cl_func, &mut fb_ctx);
                let mut translator =
                    FunctionTranslator::new(ctx, builder, &mut self.module, &func_ids);
                translator.translate_function(f)?;
                translator.finalize();
            }

            let mut codegen_ctx = self.module.make_context();
            codegen_ctx.func = cl_func;
            self.module.define_function(id, &mut codegen_ctx)?;
            self.module.clear_context(&mut codegen_ctx);
        }

        let object = self.module.finish();
        let bytes = object.emit()?;
        if bytes.is_empty() {
            return Err(CompilationError::empty_object());
        }
        Ok(bytes)
    }
}

/// Emit a lowered module as a native object file for the host target.
pub fn emit_object(ctx: &IrContext, module: Module) -> CompilationResult<Vec<u8>> {
    ObjectEmitter::new(None)?.emit_module(ctx, module)
}
