// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rendering a [Value] back to the textual composite value grammar.
//!
//! Two modes, matching [crate::parser]'s two entry points:
//!
//! - *Display* mode produces output meant for a human (used by `\dconfig`
//!   style tooling): compact, no unnecessary quoting of atoms.
//! - *Serialize* mode produces output meant to be parsed back by
//!   [crate::parser::parse_composite] unambiguously: every atom is rendered
//!   as a token the grammar accepts standalone, and a dynamic array whose
//!   serialized length would reach [TypeRegistry::expand_array_view_threshold]
//!   is rendered in the expanded `{size: N, data: [...]}` form instead of the
//!   bare `[...]` literal.
//!
//! Records always render as named fields (`{name: value, ...}`) and arrays
//! always render as `[...]`-bracketed literals with positional elements, so
//! that [serialize]'s output is always re-parseable by [crate::parser].

use crate::error::CompositeError;
use crate::host::Host;
use crate::layout::{self, Arity, ElementKind, TypeExpr, TypeResolver};
use crate::ops;
use crate::registry::TypeRegistry;
use crate::value::{read_bool, read_dynamic_header, read_f64, read_i32, read_ptr};
use crate::Value;
use composite_types::AtomKind;
use std::fmt::Write as _;

/// Serialization mode. See module docs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Display,
    Serialize,
}

/// Render `value` to text in the given [Mode].
pub fn serialize(value: &Value, mode: Mode, host: &impl Host) -> Result<String, CompositeError> {
    let mut out = String::new();
    write_typed(
        &mut out,
        value.type_expr(),
        value.bytes(),
        value.registry(),
        mode,
        host,
    )?;
    Ok(out)
}

/// Cheap upper-bound estimate of [serialize]'s output length, usable to
/// preallocate a buffer without doing the full string build.
///
/// Matches the spirit of the original's separate length-estimation pass:
/// callers that only need a size hint don't pay for constructing the string.
pub fn serialized_length(value: &Value) -> usize {
    estimate_typed(value.type_expr(), value.bytes(), value.registry())
}

fn write_typed(
    out: &mut String,
    type_expr: &TypeExpr,
    buf: &[u8],
    registry: &TypeRegistry,
    mode: Mode,
    host: &impl Host,
) -> Result<(), CompositeError> {
    match type_expr.arity {
        Arity::Scalar => write_element(out, &type_expr.element, buf, 0, registry, mode, host),
        Arity::Fixed(count) => {
            let (size, align) = layout::element_size_align(&type_expr.element, registry)?;
            let stride = layout::element_stride(size, align);
            write_bracketed_elements(
                out,
                &type_expr.element,
                buf,
                count,
                stride,
                registry,
                mode,
                host,
            )
        }
        Arity::Dynamic => {
            let (size, align) = layout::element_size_align(&type_expr.element, registry)?;
            let stride = layout::element_stride(size, align);
            let header = read_dynamic_header(buf, 0);
            let count = header.len.max(0) as usize;

            let elements = if header.data.is_null() {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(header.data, stride * count) }
            };

            let threshold = registry.expand_array_view_threshold;
            let use_expanded =
                mode == Mode::Serialize && count * stride.max(1) >= threshold;

            if use_expanded {
                write!(out, "{{size: {count}, data: ").expect("String write is infallible");
                write_bracketed_elements(
                    out,
                    &type_expr.element,
                    elements,
                    count,
                    stride,
                    registry,
                    mode,
                    host,
                )?;
                out.push('}');
                Ok(())
            } else {
                write_bracketed_elements(
                    out,
                    &type_expr.element,
                    elements,
                    count,
                    stride,
                    registry,
                    mode,
                    host,
                )
            }
        }
    }
}

fn write_bracketed_elements(
    out: &mut String,
    kind: &ElementKind,
    buf: &[u8],
    count: usize,
    stride: usize,
    registry: &TypeRegistry,
    mode: Mode,
    host: &impl Host,
) -> Result<(), CompositeError> {
    out.push('[');
    for i in 0..count {
        if i > 0 {
            out.push_str(", ");
        }
        write_element(out, kind, buf, i * stride, registry, mode, host)?;
    }
    out.push(']');
    Ok(())
}

fn write_element(
    out: &mut String,
    kind: &ElementKind,
    buf: &[u8],
    offset: usize,
    registry: &TypeRegistry,
    mode: Mode,
    host: &impl Host,
) -> Result<(), CompositeError> {
    match kind {
        ElementKind::Atom(atom) => write_atom_token(out, *atom, buf, offset, mode, host),
        ElementKind::Record(name) => {
            let record = registry.resolve_record(name).ok_or_else(|| {
                CompositeError::NameError(crate::error::Diagnostic::new(format!(
                    "unknown type \"{name}\""
                )))
            })?;
            out.push('{');
            for (i, field) in record.fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write!(out, "{}: ", field.name).expect("String write is infallible");
                let field_expr = layout::parse_type_expr(&field.type_expr)?;
                write_typed(
                    out,
                    &field_expr,
                    &buf[offset + field.offset..],
                    registry,
                    mode,
                    host,
                )?;
            }
            out.push('}');
            Ok(())
        }
    }
}

/// Render one atom value. `bool`/`int`/`real` are bare tokens in [Mode::Display]
/// (the common case a human reads) and the same bare tokens in [Mode::Serialize]
/// too: the grammar's `atom` production for them has no quoting form to begin
/// with, so both modes agree. `string` always renders single-quoted with `''`
/// escaping, or the bare `nil` sentinel for a null string, in both modes — a
/// bare unquoted string would be ambiguous against `nil` and against another
/// field's name on reparse.
fn write_atom_token(
    out: &mut String,
    atom: AtomKind,
    buf: &[u8],
    offset: usize,
    mode: Mode,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let _ = mode;
    match atom {
        AtomKind::Bool => {
            out.push_str(if read_bool(buf, offset) { "true" } else { "false" });
        }
        AtomKind::Int => {
            write!(out, "{}", read_i32(buf, offset)).expect("String write is infallible");
        }
        AtomKind::Real => {
            write!(out, "{}", read_f64(buf, offset)).expect("String write is infallible");
        }
        AtomKind::String => {
            let ptr = read_ptr(buf, offset);
            match ops::read_string(ptr) {
                None => out.push_str("nil"),
                Some(s) => {
                    out.push('\'');
                    out.push_str(&host.escape_quotes(s));
                    out.push('\'');
                }
            }
        }
    }
    Ok(())
}

fn estimate_typed(type_expr: &TypeExpr, buf: &[u8], registry: &TypeRegistry) -> usize {
    match type_expr.arity {
        Arity::Scalar => estimate_element(&type_expr.element, buf, 0, registry),
        Arity::Fixed(count) => {
            let Ok((size, align)) = layout::element_size_align(&type_expr.element, registry)
            else {
                return 2;
            };
            let stride = layout::element_stride(size, align);
            2 + (0..count)
                .map(|i| estimate_element(&type_expr.element, buf, i * stride, registry) + 2)
                .sum::<usize>()
        }
        Arity::Dynamic => {
            let Ok((size, align)) = layout::element_size_align(&type_expr.element, registry)
            else {
                return 2;
            };
            let stride = layout::element_stride(size, align);
            let header = read_dynamic_header(buf, 0);
            let count = header.len.max(0) as usize;
            let elements = if header.data.is_null() {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(header.data, stride * count) }
            };
            16 + (0..count)
                .map(|i| estimate_element(&type_expr.element, elements, i * stride, registry) + 2)
                .sum::<usize>()
        }
    }
}

fn estimate_element(kind: &ElementKind, buf: &[u8], offset: usize, registry: &TypeRegistry) -> usize {
    match kind {
        ElementKind::Atom(AtomKind::Bool) => 5,
        ElementKind::Atom(AtomKind::Int) => 11,
        ElementKind::Atom(AtomKind::Real) => 24,
        ElementKind::Atom(AtomKind::String) => {
            let ptr = read_ptr(buf, offset);
            ops::read_string(ptr).map(|s| s.len() + 2).unwrap_or(3)
        }
        ElementKind::Record(name) => registry
            .resolve_record(name)
            .map(|record| {
                2 + record
                    .fields
                    .iter()
                    .map(|field| {
                        let name_cost = field.name.len() + 2;
                        layout::parse_type_expr(&field.type_expr)
                            .map(|expr| {
                                name_cost
                                    + estimate_typed(&expr, &buf[offset + field.offset..], registry)
                                    + 2
                            })
                            .unwrap_or(name_cost + 2)
                    })
                    .sum::<usize>()
            })
            .unwrap_or(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DefaultHost;
    use crate::parser::parse_composite;
    use crate::registry::TypeRegistry;
    use std::sync::Arc;

    #[test]
    fn round_trips_a_record() {
        let mut reg = TypeRegistry::new();
        reg.define_type("node", "string name; int state").unwrap();
        let registry = Arc::new(reg);

        let type_expr = layout::parse_type_expr("node").unwrap();
        let value = parse_composite(
            "{name: 'primary', state: 7}",
            &type_expr,
            &registry,
            &DefaultHost,
            None,
        )
        .unwrap();

        let text = serialize(&value, Mode::Serialize, &DefaultHost).unwrap();
        assert_eq!(text, "{name: 'primary', state: 7}");

        let reparsed =
            parse_composite(&text, &type_expr, &registry, &DefaultHost, None).unwrap();

        assert_eq!(
            ops::compare(&value, &reparsed).unwrap(),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn round_trips_a_fixed_array_of_records() {
        let mut reg = TypeRegistry::new();
        reg.define_type("node", "string name; int state").unwrap();
        reg.define_type("cluster", "string name; int size; node[2] nodes")
            .unwrap();
        let registry = Arc::new(reg);

        let type_expr = layout::parse_type_expr("cluster").unwrap();
        let value = parse_composite(
            "{name: 'prod', size: 2, nodes: [{name: 'a', state: 1}, {name: 'b', state: 0}]}",
            &type_expr,
            &registry,
            &DefaultHost,
            None,
        )
        .unwrap();

        let text = serialize(&value, Mode::Serialize, &DefaultHost).unwrap();
        let reparsed =
            parse_composite(&text, &type_expr, &registry, &DefaultHost, None).unwrap();
        assert_eq!(
            ops::compare(&value, &reparsed).unwrap(),
            std::cmp::Ordering::Equal
        );
    }

    #[test]
    fn null_string_serializes_as_nil() {
        let mut reg = TypeRegistry::new();
        reg.define_type("node", "string name; int state").unwrap();
        let registry = Arc::new(reg);

        let type_expr = layout::parse_type_expr("node").unwrap();
        let value = parse_composite(
            "{name: nil, state: 0}",
            &type_expr,
            &registry,
            &DefaultHost,
            None,
        )
        .unwrap();

        let text = serialize(&value, Mode::Serialize, &DefaultHost).unwrap();
        assert_eq!(text, "{name: nil, state: 0}");
    }

    #[test]
    fn large_dynamic_array_serializes_in_expanded_form() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("int[]").unwrap();

        let literal = format!(
            "[{}]",
            (0..20).map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
        );
        let value =
            parse_composite(&literal, &type_expr, &registry, &DefaultHost, None).unwrap();

        let mut reg = TypeRegistry::new();
        reg.expand_array_view_threshold = 8;
        let small_threshold_registry = Arc::new(reg);
        let value_for_threshold = parse_composite(
            &literal,
            &type_expr,
            &small_threshold_registry,
            &DefaultHost,
            None,
        )
        .unwrap();

        let text = serialize(&value, Mode::Serialize, &DefaultHost).unwrap();
        assert!(text.starts_with('['));

        let expanded_text =
            serialize(&value_for_threshold, Mode::Serialize, &DefaultHost).unwrap();
        assert!(expanded_text.starts_with("{size: 20, data: ["));

        let reparsed = parse_composite(
            &expanded_text,
            &type_expr,
            &small_threshold_registry,
            &DefaultHost,
            None,
        )
        .unwrap();
        assert_eq!(
            ops::compare(&value_for_threshold, &reparsed).unwrap(),
            std::cmp::Ordering::Equal
        );
    }
}
