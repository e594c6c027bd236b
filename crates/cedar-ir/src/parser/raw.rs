//! Raw (unresolved) parse structures and winnow combinators for the IR
//! text format.
//!
//! Stage 1 of parsing: text → `Raw*` structs. Name resolution and arena
//! construction happen in the builder (`super`).

use winnow::ascii;
use winnow::combinator::{alt, delimited, opt, preceded, separated};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

// ============================================================================
// Error type
// ============================================================================

/// Parse error for the IR text format.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error at offset {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Raw (unresolved) AST structures
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct RawOperation<'a> {
    pub results: Vec<&'a str>,
    pub dialect: &'a str,
    pub op_name: &'a str,
    /// Optional symbol name parsed from `@name` after `dialect.op`.
    pub sym_name: Option<String>,
    /// Optional function-style parameters: `(%arg: type, ...)`.
    pub func_params: Vec<(&'a str, RawType<'a>)>,
    /// Optional return type from `-> type`.
    pub return_type: Option<RawType<'a>>,
    pub operands: Vec<&'a str>,
    pub attributes: Vec<(&'a str, RawAttribute<'a>)>,
    pub result_types: Vec<RawType<'a>>,
    pub regions: Vec<RawRegion<'a>>,
    /// Optional successor list from `[^bb0, ^bb1]`.
    pub successors: Vec<&'a str>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawRegion<'a> {
    pub blocks: Vec<RawBlock<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawBlock<'a> {
    pub label: &'a str,
    pub args: Vec<(&'a str, RawType<'a>)>,
    pub ops: Vec<RawOperation<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawType<'a> {
    pub dialect: &'a str,
    pub name: &'a str,
    pub params: Vec<RawType<'a>>,
}

#[derive(Debug, Clone)]
pub(crate) enum RawAttribute<'a> {
    Bool(bool),
    Int(u64),
    Float(f64),
    String(String),
    Symbol(String),
    Type(RawType<'a>),
    List(Vec<RawAttribute<'a>>),
    Unit,
}

// ============================================================================
// Winnow parsers
// ============================================================================

/// Skip whitespace.
pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

/// Parse an identifier: [a-zA-Z_][a-zA-Z0-9_]*
pub(crate) fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Parse a value reference: %name or %number
pub(crate) fn value_ref<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(
        '%',
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
    .parse_next(input)
}

/// Parse a symbol reference: @name or @"quoted name"
pub(crate) fn symbol_ref(input: &mut &str) -> ModalResult<String> {
    '@'.parse_next(input)?;
    if input.starts_with('"') {
        string_lit.parse_next(input)
    } else {
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_')
            .map(|s: &str| s.to_owned())
            .parse_next(input)
    }
}

/// Parse a block label: ^bbN or ^name
pub(crate) fn block_label<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(
        '^',
        take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
    .parse_next(input)
}

/// Parse a dialect-qualified name: dialect.name
pub(crate) fn qualified_name<'a>(input: &mut &'a str) -> ModalResult<(&'a str, &'a str)> {
    (ident, '.', ident)
        .map(|(d, _, n)| (d, n))
        .parse_next(input)
}

/// Parse an integer literal (unsigned or negative via two's complement).
pub(crate) fn integer_lit(input: &mut &str) -> ModalResult<u64> {
    let negative = opt('-').parse_next(input)?.is_some();
    let value: u64 = ascii::dec_uint(input)?;
    if negative {
        // The magnitude must fit in i64 range; i64::MIN needs care.
        let i64_min_magnitude = i64::MAX as u64 + 1;
        if value > i64_min_magnitude {
            return Err(winnow::error::ErrMode::Backtrack(
                winnow::error::ContextError::new(),
            ));
        }
        if value == i64_min_magnitude {
            Ok(u64::from_ne_bytes(i64::MIN.to_ne_bytes()))
        } else {
            let signed = -(value as i64);
            Ok(u64::from_ne_bytes(signed.to_ne_bytes()))
        }
    } else {
        Ok(value)
    }
}

/// Parse a float literal that MUST contain a decimal point, so `42` is not
/// parsed as a float. Accepts exponent notation: `3.14`, `-1.0e10`, `2.5e-3`.
pub(crate) fn float_with_dot(input: &mut &str) -> ModalResult<f64> {
    let s = (
        opt('-'),
        take_while(1.., |c: char| c.is_ascii_digit()),
        '.',
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt((
            one_of(['e', 'E']),
            opt(one_of(['+', '-'])),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )),
    )
        .take()
        .parse_next(input)?;
    s.parse::<f64>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new()))
}

/// Parse a string literal: "content"
pub(crate) fn string_lit(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut result = String::new();
    loop {
        let c = any.parse_next(input)?;
        match c {
            '"' => break,
            '\\' => {
                let escaped = any.parse_next(input)?;
                match escaped {
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '0' => result.push('\0'),
                    'x' => {
                        let h1 = any.parse_next(input)?;
                        let h2 = any.parse_next(input)?;
                        let hex_str = format!("{}{}", h1, h2);
                        if let Ok(code) = u8::from_str_radix(&hex_str, 16) {
                            result.push(code as char);
                        } else {
                            result.push('\\');
                            result.push('x');
                            result.push(h1);
                            result.push(h2);
                        }
                    }
                    _ => {
                        result.push('\\');
                        result.push(escaped);
                    }
                }
            }
            _ => result.push(c),
        }
    }
    Ok(result)
}

/// Parse a type: `dialect.name` or `dialect.name(params)`.
pub(crate) fn raw_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    let (dialect, name) = qualified_name.parse_next(input)?;

    let params = opt(delimited(
        ('(', ws),
        separated(0.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
        (ws, ')'),
    ))
    .parse_next(input)?
    .unwrap_or_default();

    Ok(RawType {
        dialect,
        name,
        params,
    })
}

/// Parse an attribute value.
pub(crate) fn raw_attr_value<'a>(input: &mut &'a str) -> ModalResult<RawAttribute<'a>> {
    alt((
        "true".value(RawAttribute::Bool(true)),
        "false".value(RawAttribute::Bool(false)),
        "unit".value(RawAttribute::Unit),
        string_lit.map(RawAttribute::String),
        symbol_ref.map(RawAttribute::Symbol),
        delimited(
            ('[', ws),
            separated(0.., (ws, raw_attr_value, ws).map(|(_, a, _)| a), ','),
            (ws, ']'),
        )
        .map(RawAttribute::List),
        float_with_dot.map(RawAttribute::Float),
        integer_lit.map(RawAttribute::Int),
        raw_type.map(RawAttribute::Type),
    ))
    .parse_next(input)
}

/// Parse an attribute dict: {key = value, ...}
pub(crate) fn raw_attr_dict<'a>(
    input: &mut &'a str,
) -> ModalResult<Vec<(&'a str, RawAttribute<'a>)>> {
    delimited(
        ('{', ws),
        separated(
            0..,
            (ws, ident, ws, '=', ws, raw_attr_value, ws).map(|(_, k, _, _, _, v, _)| (k, v)),
            ',',
        ),
        (ws, '}'),
    )
    .parse_next(input)
}

/// Parse a result list: `%0 =` or `%0, %1 =`
fn result_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    let results: Vec<&str> =
        separated(1.., (ws, value_ref, ws).map(|(_, v, _)| v), ',').parse_next(input)?;
    ws.parse_next(input)?;
    '='.parse_next(input)?;
    Ok(results)
}

/// Parse an operand list: %a, %b, ...
fn operand_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1.., (ws, value_ref, ws).map(|(_, v, _)| v), ',').parse_next(input)
}

/// Parse a type annotation: `: type1, type2`
fn type_annotation<'a>(input: &mut &'a str) -> ModalResult<Vec<RawType<'a>>> {
    preceded(
        (ws, ':', ws),
        separated(1.., (ws, raw_type, ws).map(|(_, t, _)| t), ','),
    )
    .parse_next(input)
}

/// Parse a function-style parameter list: (%arg: type, ...)
pub(crate) fn func_params<'a>(input: &mut &'a str) -> ModalResult<Vec<(&'a str, RawType<'a>)>> {
    delimited(
        ('(', ws),
        separated(
            0..,
            (ws, value_ref, ws, ':', ws, raw_type, ws).map(|(_, name, _, _, _, ty, _)| (name, ty)),
            ',',
        ),
        (ws, ')'),
    )
    .parse_next(input)
}

/// Parse empty parens: ()
fn empty_parens(input: &mut &str) -> ModalResult<()> {
    ('(', ws, ')').void().parse_next(input)
}

/// Parse a return type: -> type
fn return_type<'a>(input: &mut &'a str) -> ModalResult<RawType<'a>> {
    preceded((ws, '-', '>', ws), raw_type).parse_next(input)
}

/// Parse a successor list: [^bb0, ^bb1]
fn successor_list<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    delimited(
        ('[', ws),
        separated(1.., (ws, block_label, ws).map(|(_, l, _)| l), ','),
        (ws, ']'),
    )
    .parse_next(input)
}

/// Parse a single operation.
///
/// Grammar:
/// ```text
/// [results =] dialect.op [@symbol] [(%arg: type, ...) | () | operands]
///   [[successors]] [-> type] [{attrs}] [: types] [regions]
/// ```
pub(crate) fn raw_operation<'a>(input: &mut &'a str) -> ModalResult<RawOperation<'a>> {
    ws.parse_next(input)?;

    let results = opt(result_list).parse_next(input)?.unwrap_or_default();
    ws.parse_next(input)?;

    let (dialect, op_name) = qualified_name.parse_next(input)?;

    // Optional @symbol (e.g., core.module @main, cedar.func @answer)
    let sym_name = opt(preceded(ws, symbol_ref)).parse_next(input)?;

    // Either func-style params (%arg: type, ...), empty parens, or operands.
    let mut func_params_parsed = Vec::new();
    let mut operands = Vec::new();

    ws.parse_next(input)?;
    if input.starts_with('(') {
        if let Some(params) = opt(func_params).parse_next(input)? {
            func_params_parsed = params;
        } else {
            // Empty parens: no params, no operands.
            opt(empty_parens).parse_next(input)?;
        }
    } else if input.starts_with('%') {
        operands = opt(operand_list).parse_next(input)?.unwrap_or_default();
    }

    // Successor list (optional): [^bb0, ^bb1]
    let successors = opt(preceded(ws, successor_list))
        .parse_next(input)?
        .unwrap_or_default();

    // Optional return type: -> type
    let return_ty = opt(return_type).parse_next(input)?;

    // Attributes (optional)
    let attributes = opt(preceded(ws, raw_attr_dict))
        .parse_next(input)?
        .unwrap_or_default();

    // Type annotation (optional): : type1, type2
    let result_types = opt(type_annotation).parse_next(input)?.unwrap_or_default();

    // Regions (optional, zero or more)
    let mut regions = Vec::new();
    loop {
        ws.parse_next(input)?;
        if input.starts_with('{') {
            let region = raw_region.parse_next(input)?;
            regions.push(region);
        } else {
            break;
        }
    }

    Ok(RawOperation {
        results,
        dialect,
        op_name,
        sym_name,
        func_params: func_params_parsed,
        return_type: return_ty,
        operands,
        attributes,
        result_types,
        regions,
        successors,
    })
}

/// Parse a block: ^label(args): ops...
pub(crate) fn raw_block<'a>(input: &mut &'a str) -> ModalResult<RawBlock<'a>> {
    ws.parse_next(input)?;
    let label = block_label.parse_next(input)?;

    let args = opt(delimited(
        ('(', ws),
        separated(
            0..,
            (ws, value_ref, ws, ':', ws, raw_type, ws).map(|(_, name, _, _, _, ty, _)| (name, ty)),
            ',',
        ),
        (ws, ')'),
    ))
    .parse_next(input)?
    .unwrap_or_default();

    ws.parse_next(input)?;
    ':'.parse_next(input)?;

    let mut ops = Vec::new();
    loop {
        ws.parse_next(input)?;
        if input.starts_with('^') || input.starts_with('}') || input.is_empty() {
            break;
        }
        let op = raw_operation.parse_next(input)?;
        ops.push(op);
    }

    Ok(RawBlock { label, args, ops })
}

/// Parse a region: `{ blocks... }`, `{ ops... }` (implicit entry block), or
/// `{ ops... ^bb1: ... }` (implicit entry followed by labeled blocks).
pub(crate) fn raw_region<'a>(input: &mut &'a str) -> ModalResult<RawRegion<'a>> {
    '{'.parse_next(input)?;
    ws.parse_next(input)?;

    let mut blocks = Vec::new();

    // Implicit entry block: operations before the first block label.
    if !input.starts_with('^') && !input.starts_with('}') {
        let mut ops = Vec::new();
        loop {
            ws.parse_next(input)?;
            if input.starts_with('^') || input.starts_with('}') || input.is_empty() {
                break;
            }
            let op = raw_operation.parse_next(input)?;
            ops.push(op);
        }
        blocks.push(RawBlock {
            label: "bb0",
            args: vec![],
            ops,
        });
    }

    // Labeled blocks.
    loop {
        ws.parse_next(input)?;
        if input.starts_with('}') || input.is_empty() {
            break;
        }
        let block = raw_block.parse_next(input)?;
        blocks.push(block);
    }

    ws.parse_next(input)?;
    '}'.parse_next(input)?;

    Ok(RawRegion { blocks })
}

// ============================================================================
// Tests (pure combinator tests)
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_type() {
        let mut input = "core.i32";
        let raw = raw_type.parse_next(&mut input).expect("should parse type");
        assert_eq!(raw.dialect, "core");
        assert_eq!(raw.name, "i32");
        assert!(raw.params.is_empty());
    }

    #[test]
    fn parse_parameterized_type() {
        let mut input = "func.fn(core.i32, core.i32, mem.ref(core.i64))";
        let raw = raw_type.parse_next(&mut input).expect("should parse type");
        assert_eq!(raw.dialect, "func");
        assert_eq!(raw.name, "fn");
        assert_eq!(raw.params.len(), 3);
        assert_eq!(raw.params[2].name, "ref");
        assert_eq!(raw.params[2].params.len(), 1);
    }

    #[test]
    fn parse_attribute_values() {
        let mut input = "42";
        let attr = raw_attr_value.parse_next(&mut input).expect("int");
        assert!(matches!(attr, RawAttribute::Int(42)));

        let mut input = "3.25";
        let attr = raw_attr_value.parse_next(&mut input).expect("float");
        assert!(matches!(attr, RawAttribute::Float(f) if (f - 3.25).abs() < 1e-10));

        let mut input = "true";
        let attr = raw_attr_value.parse_next(&mut input).expect("bool");
        assert!(matches!(attr, RawAttribute::Bool(true)));

        let mut input = r#""hello""#;
        let attr = raw_attr_value.parse_next(&mut input).expect("string");
        assert!(matches!(attr, RawAttribute::String(ref s) if s == "hello"));

        let mut input = "@foo";
        let attr = raw_attr_value.parse_next(&mut input).expect("symbol");
        assert!(matches!(attr, RawAttribute::Symbol(ref s) if s == "foo"));
    }

    #[test]
    fn parse_string_escapes() {
        let cases = [
            (r#""hello""#, "hello"),
            (r#""a\nb""#, "a\nb"),
            (r#""a\\b""#, "a\\b"),
            (r#""a\"b""#, "a\"b"),
            (r#""a\x7fb""#, "a\x7fb"),
        ];
        for (input_str, expected) in &cases {
            let mut input = *input_str;
            let result = string_lit.parse_next(&mut input).expect("should parse");
            assert_eq!(&result, *expected, "failed for input: {}", input_str);
        }
    }

    #[test]
    fn parse_negative_integer() {
        let mut input = "-42";
        let val = integer_lit.parse_next(&mut input).expect("should parse");
        assert_eq!(val, u64::from_ne_bytes((-42i64).to_ne_bytes()));
    }

    #[test]
    fn parse_successor_list() {
        let mut input = "[^bb0, ^bb1]";
        let result = successor_list.parse_next(&mut input).expect("should parse");
        assert_eq!(result, vec!["bb0", "bb1"]);
    }

    #[test]
    fn parse_operation_with_operands_and_attrs() {
        let mut input = "%2 = arith.add %0, %1 {flag = true} : core.i32";
        let op = raw_operation.parse_next(&mut input).expect("should parse");
        assert_eq!(op.results, vec!["2"]);
        assert_eq!(op.dialect, "arith");
        assert_eq!(op.op_name, "add");
        assert_eq!(op.operands, vec!["0", "1"]);
        assert_eq!(op.attributes.len(), 1);
        assert_eq!(op.result_types.len(), 1);
    }

    #[test]
    fn parse_region_with_implicit_entry_and_labeled_blocks() {
        let mut input = "{\n  cf.br [^bb1]\n^bb1:\n  cedar.return\n}";
        let region = raw_region.parse_next(&mut input).expect("should parse");
        assert_eq!(region.blocks.len(), 2);
        assert_eq!(region.blocks[0].label, "bb0");
        assert_eq!(region.blocks[0].ops.len(), 1);
        assert_eq!(region.blocks[1].label, "bb1");
    }
}
