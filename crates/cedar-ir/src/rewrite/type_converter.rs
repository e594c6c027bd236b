//! Type converter: maps source types to target types during conversion.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::context::IrContext;
use crate::dialect::func;
use crate::refs::TypeRef;

/// Type conversion function signature.
///
/// Takes the owning converter so rules can recurse into type parameters,
/// and a mutable context because producing a new type interns it.
/// Returns `None` if the rule does not apply.
type ConversionFn = dyn Fn(&TypeConverter, &mut IrContext, TypeRef) -> Option<TypeRef>;

/// Maps types during dialect conversion.
///
/// Conversion functions are tried in registration order; the first `Some`
/// wins. Results are memoized per converter, so within one conversion run
/// the same source type always maps to the same target type — block
/// arguments and call signatures sharing a source type stay identical after
/// rewriting.
pub struct TypeConverter {
    conversions: Vec<Box<ConversionFn>>,
    cache: RefCell<HashMap<TypeRef, Option<TypeRef>>>,
}

impl TypeConverter {
    pub fn new() -> Self {
        Self {
            conversions: Vec::new(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Add a type conversion function.
    pub fn add_conversion(
        &mut self,
        f: impl Fn(&TypeConverter, &mut IrContext, TypeRef) -> Option<TypeRef> + 'static,
    ) {
        self.conversions.push(Box::new(f));
    }

    /// Convert a type, trying each conversion function in order.
    ///
    /// Returns `None` if no rule applies; for a type the stage requires to
    /// change, the caller treats that as an unsupported conversion and fails
    /// its match.
    pub fn convert_type(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        if let Some(&cached) = self.cache.borrow().get(&ty) {
            return cached;
        }
        let mut result = None;
        for conv in &self.conversions {
            if let Some(converted) = conv(self, ctx, ty) {
                result = Some(converted);
                break;
            }
        }
        self.cache.borrow_mut().insert(ty, result);
        result
    }

    /// Convert a type, returning the original if no rule applies.
    pub fn convert_type_or_identity(&self, ctx: &mut IrContext, ty: TypeRef) -> TypeRef {
        self.convert_type(ctx, ty).unwrap_or(ty)
    }

    /// Convert a `func.fn` signature component-wise.
    ///
    /// Returns `None` when `ty` is not a function type or no component
    /// changed.
    pub fn convert_signature(&self, ctx: &mut IrContext, ty: TypeRef) -> Option<TypeRef> {
        let (result, params) = func::fn_ty_parts(ctx, ty)?;

        let new_result = self.convert_type_or_identity(ctx, result);
        let new_params: Vec<TypeRef> = params
            .iter()
            .map(|&p| self.convert_type_or_identity(ctx, p))
            .collect();

        if new_result == result && new_params == params {
            return None;
        }
        Some(func::fn_ty(ctx, new_result, new_params))
    }

    /// Check if this converter has any conversion functions.
    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new()
    }
}
