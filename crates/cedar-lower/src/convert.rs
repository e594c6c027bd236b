//! Stage type converters.

use cedar_ir::dialect::{core, mem};
use cedar_ir::rewrite::TypeConverter;
use cedar_ir::symbol::Symbol;

/// Converter for the structural and memory stages: maps `cedar` types onto
/// `core` scalars and `mem.ref` references, and rewrites function
/// signatures component-wise.
pub fn cedar_to_generic() -> TypeConverter {
    let mut tc = TypeConverter::new();
    tc.add_conversion(|tc, ctx, ty| {
        let (dialect, name, first_param) = {
            let data = ctx.types.get(ty);
            (data.dialect, data.name, data.params.first().copied())
        };
        if dialect != Symbol::new("cedar") {
            return None;
        }
        if name == Symbol::new("i32") {
            Some(core::i32_ty(ctx))
        } else if name == Symbol::new("i64") {
            Some(core::i64_ty(ctx))
        } else if name == Symbol::new("f64") {
            Some(core::f64_ty(ctx))
        } else if name == Symbol::new("bool") {
            Some(core::i8_ty(ctx))
        } else if name == Symbol::new("ptr") {
            let elem = first_param?;
            let new_elem = tc.convert_type_or_identity(ctx, elem);
            Some(mem::ref_ty(ctx, new_elem))
        } else {
            None
        }
    });
    tc.add_conversion(|tc, ctx, ty| tc.convert_signature(ctx, ty));
    tc
}

/// Converter for the target stage: erases `mem.ref` to `core.ptr` and
/// rewrites function signatures component-wise. `core` scalars are already
/// legal and map to themselves.
pub fn generic_to_clif() -> TypeConverter {
    let mut tc = TypeConverter::new();
    tc.add_conversion(|_, ctx, ty| {
        if mem::is_ref_ty(ctx, ty) {
            Some(core::ptr_ty(ctx))
        } else {
            None
        }
    });
    tc.add_conversion(|tc, ctx, ty| tc.convert_signature(ctx, ty));
    tc
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedar_ir::context::IrContext;
    use cedar_ir::dialect::{cedar, func};

    #[test]
    fn cedar_scalars_map_to_core() {
        let mut ctx = IrContext::new();
        let tc = cedar_to_generic();

        let src = cedar::i32_ty(&mut ctx);
        let expected = core::i32_ty(&mut ctx);
        assert_eq!(tc.convert_type(&mut ctx, src), Some(expected));

        let src = cedar::bool_ty(&mut ctx);
        let expected = core::i8_ty(&mut ctx);
        assert_eq!(tc.convert_type(&mut ctx, src), Some(expected));
    }

    #[test]
    fn cedar_ptr_maps_to_mem_ref_of_converted_elem() {
        let mut ctx = IrContext::new();
        let tc = cedar_to_generic();

        let elem = cedar::i32_ty(&mut ctx);
        let ptr = cedar::ptr_ty(&mut ctx, elem);
        let converted = tc.convert_type(&mut ctx, ptr).expect("must convert");

        let core_i32 = core::i32_ty(&mut ctx);
        assert_eq!(mem::ref_elem_ty(&ctx, converted), Some(core_i32));
    }

    #[test]
    fn same_source_type_converts_consistently() {
        let mut ctx = IrContext::new();
        let tc = cedar_to_generic();

        let src = cedar::i64_ty(&mut ctx);
        let a = tc.convert_type(&mut ctx, src);
        let b = tc.convert_type(&mut ctx, src);
        assert_eq!(a, b);
    }

    #[test]
    fn signatures_convert_component_wise() {
        let mut ctx = IrContext::new();
        let tc = cedar_to_generic();

        let i32_src = cedar::i32_ty(&mut ctx);
        let fn_ty = func::fn_ty(&mut ctx, i32_src, [i32_src]);
        let converted = tc.convert_type(&mut ctx, fn_ty).expect("must convert");

        let core_i32 = core::i32_ty(&mut ctx);
        let (result, params) = func::fn_ty_parts(&ctx, converted).unwrap();
        assert_eq!(result, core_i32);
        assert_eq!(params, vec![core_i32]);
    }

    #[test]
    fn mem_ref_erases_to_core_ptr() {
        let mut ctx = IrContext::new();
        let tc = generic_to_clif();

        let elem = core::i32_ty(&mut ctx);
        let r = mem::ref_ty(&mut ctx, elem);
        let expected = core::ptr_ty(&mut ctx);
        assert_eq!(tc.convert_type(&mut ctx, r), Some(expected));

        // Core scalars are already legal.
        assert_eq!(tc.convert_type(&mut ctx, elem), None);
    }
}
