//! IR text format parser.
//!
//! Parses the textual format produced by [`crate::printer`] into arena IR.
//!
//! # Two-stage parsing
//!
//! 1. **Raw parse**: winnow combinators parse text into `Raw*` structures.
//! 2. **IR build**: `IrBuilder` resolves names and converts `Raw*` into
//!    arena `OpRef`/`BlockRef`/`RegionRef` entities.

mod raw;

use std::collections::{HashMap, HashSet};

use smallvec::smallvec;
use winnow::prelude::*;

use crate::context::{BlockArgData, BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::dialect::core::Module;
use crate::location::Span;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, Location, TypeDataBuilder};

pub use raw::ParseError;
use raw::{RawAttribute, RawOperation, RawRegion, RawType};

/// Parse a textual IR module into the context.
pub fn parse_module(ctx: &mut IrContext, text: &str) -> Result<Module, ParseError> {
    let mut input = text;
    let raw_op = raw::raw_operation
        .parse_next(&mut input)
        .map_err(|e| ParseError {
            message: format!("invalid operation syntax: {e}"),
            offset: text.len() - input.len(),
        })?;
    let _ = raw::ws.parse_next(&mut input);
    if !input.is_empty() {
        return Err(ParseError {
            message: format!("trailing input after module: {:.40}", input),
            offset: text.len() - input.len(),
        });
    }

    if raw_op.dialect != "core" || raw_op.op_name != "module" {
        return Err(ParseError {
            message: format!(
                "expected core.module at top level, found {}.{}",
                raw_op.dialect, raw_op.op_name
            ),
            offset: 0,
        });
    }

    let mut builder = IrBuilder::new(ctx);
    let op = builder.build_operation(&raw_op)?;
    Module::from_op(ctx, op).map_err(|e| ParseError {
        message: e.to_string(),
        offset: 0,
    })
}

// ============================================================================
// IrBuilder (Raw -> arena IR)
// ============================================================================

struct IrBuilder<'a> {
    ctx: &'a mut IrContext,
    location: Location,
    /// Maps value name (without %) -> ValueRef
    value_map: HashMap<String, ValueRef>,
    /// Maps block label (without ^) -> BlockRef
    block_map: HashMap<String, BlockRef>,
}

impl<'a> IrBuilder<'a> {
    fn new(ctx: &'a mut IrContext) -> Self {
        let path = ctx.paths.intern("textual-ir".to_owned());
        let location = Location::new(path, Span::new(0, 0));
        Self {
            ctx,
            location,
            value_map: HashMap::new(),
            block_map: HashMap::new(),
        }
    }

    // ----------------------------------------------------------------
    // Type / attribute conversion
    // ----------------------------------------------------------------

    fn build_type(&mut self, raw: &RawType<'_>) -> TypeRef {
        let dialect = Symbol::from_dynamic(raw.dialect);
        let name = Symbol::from_dynamic(raw.name);
        let params: Vec<TypeRef> = raw.params.iter().map(|p| self.build_type(p)).collect();
        self.ctx
            .types
            .intern(TypeDataBuilder::new(dialect, name).params(params).build())
    }

    fn build_attribute(&mut self, raw: &RawAttribute<'_>) -> Attribute {
        match raw {
            RawAttribute::Bool(b) => Attribute::Bool(*b),
            RawAttribute::Int(n) => Attribute::IntBits(*n),
            RawAttribute::Float(f) => Attribute::FloatBits(f.to_bits()),
            RawAttribute::String(s) => Attribute::String(s.clone()),
            RawAttribute::Symbol(s) => Attribute::Symbol(Symbol::from_dynamic(s.as_str())),
            RawAttribute::Type(t) => Attribute::Type(self.build_type(t)),
            RawAttribute::List(items) => {
                Attribute::List(items.iter().map(|a| self.build_attribute(a)).collect())
            }
            RawAttribute::Unit => Attribute::Unit,
        }
    }

    // ----------------------------------------------------------------
    // Scope handling
    // ----------------------------------------------------------------

    fn save_scopes(&self) -> (HashMap<String, ValueRef>, HashMap<String, BlockRef>) {
        (self.value_map.clone(), self.block_map.clone())
    }

    fn restore_scopes(&mut self, saved: (HashMap<String, ValueRef>, HashMap<String, BlockRef>)) {
        self.value_map = saved.0;
        self.block_map = saved.1;
    }

    // ----------------------------------------------------------------
    // Region / block building
    // ----------------------------------------------------------------

    /// Build a region from raw data.
    ///
    /// `extra_entry_args` are injected as the entry block's leading
    /// arguments (from a func-style signature).
    fn build_region(
        &mut self,
        raw: &RawRegion<'_>,
        extra_entry_args: &[(&str, RawType<'_>)],
    ) -> Result<RegionRef, ParseError> {
        let saved = self.save_scopes();
        let result = self.build_region_inner(raw, extra_entry_args);
        self.restore_scopes(saved);
        result
    }

    fn build_region_inner(
        &mut self,
        raw: &RawRegion<'_>,
        extra_entry_args: &[(&str, RawType<'_>)],
    ) -> Result<RegionRef, ParseError> {
        // --- Pass 1: pre-create all blocks so successor references and
        // block-argument values resolve before any op is built. ---
        let mut seen_labels = HashSet::new();
        let mut block_refs = Vec::with_capacity(raw.blocks.len());

        for (i, raw_block) in raw.blocks.iter().enumerate() {
            let label = raw_block.label.to_string();
            if !seen_labels.insert(label.clone()) {
                return Err(ParseError {
                    message: format!("duplicate block label '^{}'", label),
                    offset: 0,
                });
            }

            let mut all_args: Vec<(&str, &RawType<'_>)> = Vec::new();
            if i == 0 {
                all_args.extend(extra_entry_args.iter().map(|(n, t)| (*n, t)));
            }
            all_args.extend(raw_block.args.iter().map(|(n, t)| (*n, t)));

            let mut seen_names = HashSet::new();
            let mut args = Vec::with_capacity(all_args.len());
            let mut arg_names = Vec::with_capacity(all_args.len());
            for (name, raw_ty) in &all_args {
                if !seen_names.insert(name.to_string()) {
                    return Err(ParseError {
                        message: format!("duplicate block argument name '%{}'", name),
                        offset: 0,
                    });
                }
                let ty = self.build_type(raw_ty);
                args.push(BlockArgData { ty });
                arg_names.push(name.to_string());
            }

            let block_ref = self.ctx.create_block(BlockData {
                location: self.location,
                args,
                ops: smallvec![],
                parent_region: None,
            });
            self.block_map.insert(label, block_ref);

            for (j, name) in arg_names.iter().enumerate() {
                let value = self.ctx.block_arg(block_ref, j as u32);
                self.value_map.insert(name.clone(), value);
            }

            block_refs.push(block_ref);
        }

        // --- Pass 2: build operations in order. ---
        for (raw_block, &block_ref) in raw.blocks.iter().zip(block_refs.iter()) {
            for raw_op in &raw_block.ops {
                let op = self.build_operation(raw_op)?;
                self.ctx.push_op(block_ref, op);
            }
        }

        Ok(self.ctx.create_region(RegionData {
            location: self.location,
            blocks: block_refs.into(),
            parent_op: None,
        }))
    }

    // ----------------------------------------------------------------
    // Operation building
    // ----------------------------------------------------------------

    fn build_operation(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let is_module = raw.dialect == "core" && raw.op_name == "module";
        let is_func_like = raw.op_name == "func"
            && matches!(raw.dialect, "cedar" | "func" | "clif");

        if is_module {
            return self.build_module_op(raw);
        }
        if is_func_like {
            return self.build_func_op(raw);
        }
        self.build_generic_op(raw)
    }

    fn build_module_op(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let body = match raw.regions.first() {
            Some(region) => self.build_region(region, &[])?,
            None => {
                // `core.module @m {}` parses its empty braces as an empty
                // attribute dict; give it an empty body region.
                let block = self.ctx.create_empty_block(self.location);
                self.ctx.create_region(RegionData {
                    location: self.location,
                    blocks: smallvec![block],
                    parent_op: None,
                })
            }
        };

        let sym_name = raw.sym_name.as_deref().unwrap_or("module");
        let data = OperationDataBuilder::new(
            self.location,
            Symbol::new("core"),
            Symbol::new("module"),
        )
        .attr("sym_name", Attribute::Symbol(Symbol::from_dynamic(sym_name)))
        .region(body)
        .build(self.ctx);
        Ok(self.ctx.create_op(data))
    }

    fn build_func_op(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        let sym_name = raw.sym_name.as_deref().ok_or_else(|| ParseError {
            message: format!("{}.{} requires a @symbol name", raw.dialect, raw.op_name),
            offset: 0,
        })?;

        // Function type: result from `-> type` (core.nil when absent),
        // parameters from the signature.
        let result_ty = match &raw.return_type {
            Some(ty) => self.build_type(ty),
            None => crate::dialect::core::nil_ty(self.ctx),
        };
        let param_tys: Vec<TypeRef> = raw
            .func_params
            .iter()
            .map(|(_, ty)| self.build_type(ty))
            .collect();
        let fn_ty = crate::dialect::func::fn_ty(self.ctx, result_ty, param_tys);

        let body = match raw.regions.first() {
            Some(region) => self.build_region(region, &raw.func_params)?,
            None => {
                return Err(ParseError {
                    message: format!("{}.{} requires a body region", raw.dialect, raw.op_name),
                    offset: 0,
                });
            }
        };

        let data = OperationDataBuilder::new(
            self.location,
            Symbol::from_dynamic(raw.dialect),
            Symbol::new("func"),
        )
        .attr("sym_name", Attribute::Symbol(Symbol::from_dynamic(sym_name)))
        .attr("type", Attribute::Type(fn_ty))
        .region(body)
        .build(self.ctx);
        Ok(self.ctx.create_op(data))
    }

    fn build_generic_op(&mut self, raw: &RawOperation<'_>) -> Result<OpRef, ParseError> {
        if !raw.func_params.is_empty() {
            return Err(ParseError {
                message: format!(
                    "{}.{} does not take a parameter list",
                    raw.dialect, raw.op_name
                ),
                offset: 0,
            });
        }

        let operands: Vec<ValueRef> = raw
            .operands
            .iter()
            .map(|name| {
                self.value_map.get(*name).copied().ok_or_else(|| ParseError {
                    message: format!("undefined value '%{}'", name),
                    offset: 0,
                })
            })
            .collect::<Result<_, _>>()?;

        let successors: Vec<BlockRef> = raw
            .successors
            .iter()
            .map(|label| {
                self.block_map.get(*label).copied().ok_or_else(|| ParseError {
                    message: format!("undefined block label '^{}'", label),
                    offset: 0,
                })
            })
            .collect::<Result<_, _>>()?;

        let result_types: Vec<TypeRef> = raw
            .result_types
            .iter()
            .map(|ty| self.build_type(ty))
            .collect();
        if raw.results.len() != result_types.len() {
            return Err(ParseError {
                message: format!(
                    "{}.{}: {} result name(s) but {} result type(s)",
                    raw.dialect,
                    raw.op_name,
                    raw.results.len(),
                    result_types.len()
                ),
                offset: 0,
            });
        }

        let mut builder = OperationDataBuilder::new(
            self.location,
            Symbol::from_dynamic(raw.dialect),
            Symbol::from_dynamic(raw.op_name),
        )
        .operands(operands)
        .results(result_types);
        for (key, val) in &raw.attributes {
            let attr = self.build_attribute(val);
            builder = builder.attr(Symbol::from_dynamic(key), attr);
        }
        if let Some(sym) = &raw.sym_name {
            builder = builder.attr("sym_name", Attribute::Symbol(Symbol::from_dynamic(sym)));
        }
        for succ in successors {
            builder = builder.successor(succ);
        }

        let mut regions = Vec::new();
        for raw_region in &raw.regions {
            regions.push(self.build_region(raw_region, &[])?);
        }
        for region in regions {
            builder = builder.region(region);
        }

        let data = builder.build(self.ctx);
        let op = self.ctx.create_op(data);

        for (i, name) in raw.results.iter().enumerate() {
            let value = self.ctx.op_result(op, i as u32);
            self.value_map.insert(name.to_string(), value);
        }

        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{cedar, core, func};
    use crate::printer;

    #[test]
    fn parse_simple_module() {
        let mut ctx = IrContext::new();
        let text = "\
core.module @main {
  cedar.func @answer() -> cedar.i32 {
    %0 = cedar.const {value = 42} : cedar.i32
    cedar.return %0
  }
}
";
        let module = parse_module(&mut ctx, text).expect("should parse");
        assert_eq!(module.name(&ctx), Some(Symbol::new("main")));

        let ops = module.ops(&ctx);
        assert_eq!(ops.len(), 1);
        let f = cedar::Func::from_op(&ctx, ops[0]).expect("should be cedar.func");
        assert_eq!(f.sym_name(&ctx), Symbol::new("answer"));

        let (result, params) = func::fn_ty_parts(&ctx, f.ty(&ctx)).unwrap();
        assert_eq!(result, cedar::i32_ty(&mut ctx));
        assert!(params.is_empty());

        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let body_ops = ctx.block(entry).ops.to_vec();
        assert_eq!(body_ops.len(), 2);
        let c = cedar::Const::from_op(&ctx, body_ops[0]).unwrap();
        assert_eq!(c.value(&ctx), Attribute::IntBits(42));
        let r = cedar::Return::from_op(&ctx, body_ops[1]).unwrap();
        assert_eq!(r.values(&ctx), &[c.result(&ctx)]);
    }

    #[test]
    fn parse_function_with_params() {
        let mut ctx = IrContext::new();
        let text = "\
core.module @main {
  cedar.func @add(%arg0: cedar.i32, %arg1: cedar.i32) -> cedar.i32 {
    %0 = arith.add %arg0, %arg1 : cedar.i32
    cedar.return %0
  }
}
";
        let module = parse_module(&mut ctx, text).expect("should parse");
        let f = cedar::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        assert_eq!(ctx.block_args(entry).len(), 2);

        // The add's operands are the entry block args.
        let add = ctx.block(entry).ops[0];
        let args: Vec<ValueRef> = ctx.block_args(entry).to_vec();
        assert_eq!(ctx.op_operands(add), args.as_slice());
    }

    #[test]
    fn parse_multi_block_function() {
        let mut ctx = IrContext::new();
        let text = "\
core.module @main {
  cedar.func @pick(%arg0: cedar.bool) -> cedar.i32 {
    cf.cond_br %arg0 [^bb1, ^bb2]
  ^bb1:
    %0 = cedar.const {value = 1} : cedar.i32
    cedar.return %0
  ^bb2:
    %1 = cedar.const {value = 2} : cedar.i32
    cedar.return %1
  }
}
";
        let module = parse_module(&mut ctx, text).expect("should parse");
        let f = cedar::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let blocks = ctx.region(f.body(&ctx)).blocks.to_vec();
        assert_eq!(blocks.len(), 3);

        let cond_br = ctx.block(blocks[0]).ops[0];
        assert_eq!(ctx.op(cond_br).successors.as_slice(), &blocks[1..]);
    }

    #[test]
    fn undefined_value_is_an_error() {
        let mut ctx = IrContext::new();
        let text = "\
core.module @main {
  cedar.func @bad() {
    cedar.return %0
  }
}
";
        let err = parse_module(&mut ctx, text).unwrap_err();
        assert!(err.message.contains("undefined value"), "{}", err.message);
    }

    #[test]
    fn top_level_must_be_module() {
        let mut ctx = IrContext::new();
        let err = parse_module(&mut ctx, "cedar.return\n").unwrap_err();
        assert!(err.message.contains("core.module"), "{}", err.message);
    }

    #[test]
    fn print_parse_round_trip() {
        let mut ctx = IrContext::new();
        let text = "\
core.module @main {
  cedar.func @answer() -> cedar.i32 {
    %0 = cedar.alloca {align = 4} : cedar.ptr(cedar.i32)
    %1 = cedar.const {value = 42} : cedar.i32
    cedar.store %0, %1
    %2 = cedar.load %0 : cedar.i32
    cedar.return %2
  }
}
";
        let module = parse_module(&mut ctx, text).expect("should parse");
        let printed = printer::print_module(&ctx, module.op_ref());
        assert_eq!(printed, text);

        // Idempotent: parse what we printed, print again.
        let mut ctx2 = IrContext::new();
        let module2 = parse_module(&mut ctx2, &printed).expect("round trip");
        assert_eq!(printer::print_module(&ctx2, module2.op_ref()), printed);
    }

    #[test]
    fn empty_module_round_trips() {
        let mut ctx = IrContext::new();
        let module = parse_module(&mut ctx, "core.module @empty {\n}\n").expect("should parse");
        assert_eq!(module.name(&ctx), Some(Symbol::new("empty")));
        assert!(module.ops(&ctx).is_empty());
        let _ = core::Module::from_op(&ctx, module.op_ref()).unwrap();
    }
}
