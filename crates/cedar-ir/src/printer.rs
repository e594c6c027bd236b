//! Text format printer for the IR.
//!
//! Prints IR in the format the parser accepts:
//!
//! ```text
//! core.module @main {
//!   cedar.func @answer() -> cedar.i32 {
//!     %0 = cedar.const {value = 42} : cedar.i32
//!     cedar.return %0
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

use crate::context::IrContext;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

/// Print state for value numbering and block labeling.
struct PrintState<'a> {
    ctx: &'a IrContext,
    value_names: HashMap<ValueRef, String>,
    block_labels: HashMap<BlockRef, String>,
    next_value_num: usize,
    next_block_num: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            value_names: HashMap::new(),
            block_labels: HashMap::new(),
            next_value_num: 0,
            next_block_num: 0,
        }
    }

    fn assign_value_name(&mut self, v: ValueRef) -> String {
        let name = format!("%{}", self.next_value_num);
        self.next_value_num += 1;
        self.value_names.insert(v, name.clone());
        name
    }

    fn assign_arg_name(&mut self, v: ValueRef, index: usize) -> String {
        let name = format!("%arg{index}");
        self.value_names.insert(v, name.clone());
        name
    }

    fn get_value_name(&self, v: ValueRef) -> &str {
        self.value_names.get(&v).map(|s| s.as_str()).unwrap_or("%?")
    }

    fn assign_block_label(&mut self, b: BlockRef) -> String {
        let label = format!("^bb{}", self.next_block_num);
        self.next_block_num += 1;
        self.block_labels.insert(b, label.clone());
        label
    }

    fn get_block_label(&self, b: BlockRef) -> &str {
        self.block_labels
            .get(&b)
            .map(|s| s.as_str())
            .unwrap_or("^bb?")
    }

    fn reset_numbering(&mut self) {
        self.next_value_num = 0;
        self.next_block_num = 0;
        self.value_names.clear();
        self.block_labels.clear();
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print a single operation as IR text.
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

/// Print a type as IR text.
pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

/// Print a module (root operation with nested functions) as IR text.
pub fn print_module(ctx: &IrContext, root: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, root, 0).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Type printing
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    }
    Ok(())
}

// ============================================================================
// Attribute printing
// ============================================================================

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(v) => write!(f, "{v}"),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            let s = format!("{v}");
            f.write_str(&s)?;
            // Ensure a decimal point for finite whole numbers so the value
            // round-trips as a float (don't corrupt inf/NaN).
            if v.is_finite() && !s.contains('.') && !s.contains('e') && !s.contains('E') {
                f.write_str(".0")?;
            }
            Ok(())
        }
        Attribute::String(s) => {
            f.write_char('"')?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        }
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(list) => {
            f.write_char('[')?;
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
    }
}

fn write_escaped_string(f: &mut impl Write, s: &str) -> fmt::Result {
    for ch in s.chars() {
        match ch {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        let needs_quoting = s.is_empty() || !s.chars().all(|c| c.is_alphanumeric() || c == '_');
        if needs_quoting {
            f.write_str("@\"")?;
            write_escaped_string(f, s)?;
            f.write_char('"')
        } else {
            write!(f, "@{s}")
        }
    })
}

// ============================================================================
// Operation printing
// ============================================================================

fn is_func_like(dialect: Symbol, name: Symbol) -> bool {
    name == Symbol::new("func")
        && (dialect == Symbol::new("cedar")
            || dialect == Symbol::new("func")
            || dialect == Symbol::new("clif"))
}

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let data = state.ctx.op(op);
    let dialect = data.dialect;
    let name = data.name;

    if dialect == Symbol::new("core") && name == Symbol::new("module") {
        return print_module_op(state, f, op, indent);
    }
    if is_func_like(dialect, name) {
        return print_func_op(state, f, op, indent);
    }
    print_generic_op(state, f, op, indent)
}

fn print_module_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let indent_str = " ".repeat(indent);
    let data = state.ctx.op(op);
    write!(f, "{indent_str}{}.{}", data.dialect, data.name)?;
    if let Some(sym) = data
        .attributes
        .get(&Symbol::new("sym_name"))
        .and_then(Attribute::as_symbol)
    {
        f.write_char(' ')?;
        write_symbol(f, sym)?;
    }
    f.write_str(" {\n")?;
    for &region in state.ctx.op(op).regions.clone().iter() {
        print_region_blocks(state, f, region, indent + 2, false)?;
    }
    writeln!(f, "{indent_str}}}")
}

fn print_func_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    // Each function gets fresh value numbering.
    state.reset_numbering();

    let indent_str = " ".repeat(indent);
    let data = state.ctx.op(op);
    let dialect = data.dialect;
    let name = data.name;
    let sym_name = data
        .attributes
        .get(&Symbol::new("sym_name"))
        .and_then(Attribute::as_symbol);
    let fn_ty = data
        .attributes
        .get(&Symbol::new("type"))
        .and_then(Attribute::as_type);
    let region = data.regions.first().copied();

    write!(f, "{indent_str}{dialect}.{name}")?;
    if let Some(sym) = sym_name {
        f.write_char(' ')?;
        write_symbol(f, sym)?;
    }

    // Parameters from the entry block arguments.
    f.write_char('(')?;
    if let Some(region) = region {
        if let Some(&entry) = state.ctx.region(region).blocks.first() {
            let args: Vec<ValueRef> = state.ctx.block_args(entry).to_vec();
            for (i, arg) in args.into_iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                let arg_name = state.assign_arg_name(arg, i);
                let ty = state.ctx.value_ty(arg);
                write!(f, "{arg_name}: ")?;
                write_type(state.ctx, f, ty)?;
            }
        }
    }
    f.write_char(')')?;

    // Result type from the function type attribute; nil results are elided.
    if let Some(fn_ty) = fn_ty {
        let ty_data = state.ctx.types.get(fn_ty);
        if let Some(&result) = ty_data.params.first() {
            let result_data = state.ctx.types.get(result);
            let is_nil =
                result_data.dialect == Symbol::new("core") && result_data.name == Symbol::new("nil");
            if !is_nil {
                f.write_str(" -> ")?;
                write_type(state.ctx, f, result)?;
            }
        }
    }

    f.write_str(" {\n")?;
    if let Some(region) = region {
        print_region_blocks(state, f, region, indent + 2, true)?;
    }
    writeln!(f, "{indent_str}}}")
}

fn print_generic_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let indent_str = " ".repeat(indent);
    write!(f, "{indent_str}")?;

    // Results
    let results: Vec<ValueRef> = state.ctx.op_results(op).to_vec();
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let name = state.assign_value_name(v);
            f.write_str(&name)?;
        }
        f.write_str(" = ")?;
    }

    // dialect.op
    let data = state.ctx.op(op);
    write!(f, "{}.{}", data.dialect, data.name)?;

    // Operands
    let operands: Vec<ValueRef> = state.ctx.op_operands(op).to_vec();
    if !operands.is_empty() {
        f.write_char(' ')?;
        for (i, &v) in operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.get_value_name(v))?;
        }
    }

    // Successors
    let successors = state.ctx.op(op).successors.clone();
    if !successors.is_empty() {
        f.write_str(" [")?;
        for (i, &b) in successors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(state.get_block_label(b))?;
        }
        f.write_char(']')?;
    }

    // Attributes
    let attrs = state.ctx.op(op).attributes.clone();
    if !attrs.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(state.ctx, f, val)?;
        }
        f.write_char('}')?;
    }

    // Result types
    let result_types: Vec<TypeRef> = state.ctx.op_result_types(op).to_vec();
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(state.ctx, f, ty)?;
        }
    }

    // Regions
    let regions: Vec<RegionRef> = state.ctx.op(op).regions.to_vec();
    for region in regions {
        f.write_str(" {\n")?;
        print_region_blocks(state, f, region, indent + 2, false)?;
        write!(f, "{indent_str}}}")?;
    }

    f.write_char('\n')
}

// ============================================================================
// Region / block printing
// ============================================================================

/// Print the blocks of a region.
///
/// `elide_entry_label` suppresses the entry block's label and argument list
/// (used for function bodies, whose entry arguments are already shown in the
/// signature).
fn print_region_blocks(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
    elide_entry_label: bool,
) -> fmt::Result {
    let blocks: Vec<BlockRef> = state.ctx.region(region).blocks.to_vec();

    // Pre-assign block labels so forward successor references resolve.
    for &block in &blocks {
        state.assign_block_label(block);
    }

    let single_plain_block =
        blocks.len() == 1 && state.ctx.block_args(blocks[0]).is_empty();

    for (i, &block) in blocks.iter().enumerate() {
        let elide = (i == 0 && elide_entry_label) || single_plain_block;
        if !elide {
            let indent_str = " ".repeat(indent);
            let label = state.get_block_label(block).to_owned();
            write!(f, "{indent_str}{label}")?;
            let args: Vec<ValueRef> = state.ctx.block_args(block).to_vec();
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    let arg_name = state.assign_value_name(arg);
                    let ty = state.ctx.value_ty(arg);
                    write!(f, "{arg_name}: ")?;
                    write_type(state.ctx, f, ty)?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }

        let ops: Vec<OpRef> = state.ctx.block(block).ops.to_vec();
        for op in ops {
            print_operation(state, f, op, indent)?;
        }
    }
    Ok(())
}
