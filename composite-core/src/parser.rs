// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parses composite value text into a [Value], either as a full-value
//! literal or as a `;`-terminated assignment list applied on top of a prior
//! value.
//!
//! Both forms are really the same operation: merge some text into a buffer
//! that already holds either zeroed bytes or a deep clone of a prior value.
//! A record field or array element the input text doesn't mention is left
//! exactly as that starting buffer had it — there is no separate
//! "patch mode", just a different starting buffer and a different outer
//! entry point ([is_assignment_list]).

use crate::error::{CompositeError, Diagnostic, ErrorHint};
use crate::host::Host;
use crate::layout::{self, Arity, ElementKind, TypeExpr};
use crate::lexer::{check_braces, get_element_index, get_index, get_name, same_level_find, LexResult};
use crate::ops;
use crate::registry::TypeRegistry;
use crate::value::Value;
use composite_types::AtomKind;
use std::sync::Arc;

/// Parse `text` against `type_expr`, either as a full value or (if `text` is
/// a `;`-terminated assignment list) as a sequence of patches.
///
/// `prev` supplies the starting value: record fields and array elements
/// `text` doesn't mention keep whatever `prev` already held, or the type's
/// zero value if `prev` is `None`. On any parse error, the partially-applied
/// result is discarded and an error is returned; the caller's own prior
/// value (if any) is left untouched, since `prev` is never mutated in place.
pub fn parse_composite(
    text: &str,
    type_expr: &TypeExpr,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
    prev: Option<&Value>,
) -> Result<Value, CompositeError> {
    check_braces(text)?;
    let trimmed = text.trim();

    let mut value = match prev {
        Some(v) => ops::clone(v),
        None => ops::new_value(registry, type_expr.clone())?,
    };

    if is_assignment_list(trimmed) {
        for assignment in parse_patch_list(trimmed)? {
            apply_patch(&mut value, &assignment, host)?;
        }
    } else {
        merge_into(type_expr, value.bytes_mut(), trimmed, registry, host)?;
    }

    Ok(value)
}

/// A value text whose last non-whitespace character is `;` is an assignment
/// list rather than a full-value literal.
pub fn is_assignment_list(text: &str) -> bool {
    text.trim_end().ends_with(';')
}

/// One `path=value` segment of an assignment list, not yet converted into
/// nested value text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchAssignment {
    pub path: String,
    pub value_text: String,
}

/// Split a `;`-separated and `;`-terminated assignment list into its
/// individual `path=value` segments.
pub fn parse_patch_list(text: &str) -> Result<Vec<PatchAssignment>, CompositeError> {
    let text = text.trim();
    let body = text.strip_suffix(';').ok_or_else(|| {
        CompositeError::SyntaxError(
            Diagnostic::new("assignment list must be terminated by \";\"")
                .with_hint(ErrorHint::CheckDelimiters),
        )
    })?;

    let mut assignments = Vec::new();
    let mut pos = 0;

    loop {
        if body[pos..].trim().is_empty() {
            break;
        }

        let (segment, next_pos) = match same_level_find(body, pos, ';') {
            LexResult::Found(idx, next) => (&body[pos..idx], next),
            LexResult::NotFound(_) => (&body[pos..], body.len()),
            LexResult::Err(e) => return Err(e),
        };

        let (path, value_text) = split_assignment(segment)?;
        assignments.push(PatchAssignment {
            path: path.trim().to_string(),
            value_text: value_text.trim().to_string(),
        });

        pos = next_pos;
    }

    Ok(assignments)
}

fn split_assignment(segment: &str) -> Result<(&str, &str), CompositeError> {
    match same_level_find(segment, 0, '=') {
        LexResult::Found(idx, next) => Ok((&segment[..idx], &segment[next..])),
        LexResult::NotFound(_) => Err(CompositeError::SyntaxError(Diagnostic::new(format!(
            "expected \"path=value\" in assignment list, found \"{segment}\""
        )))),
        LexResult::Err(e) => Err(e),
    }
}

/// One token of a `->`/`[]` path.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PathToken {
    Name(String),
    Index(usize),
}

fn tokenize_path(path: &str) -> Result<Vec<PathToken>, CompositeError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < path.len() {
        match get_index(&path[pos..]) {
            LexResult::Found(index, consumed) => {
                tokens.push(PathToken::Index(index));
                pos += consumed;
                continue;
            }
            LexResult::Err(e) => return Err(e),
            LexResult::NotFound(_) => {}
        }

        match get_name(&path[pos..]) {
            LexResult::Found(name, consumed) => {
                tokens.push(PathToken::Name(name));
                pos += consumed;
            }
            LexResult::Err(e) => return Err(e),
            LexResult::NotFound(_) => {
                return Err(CompositeError::SyntaxError(Diagnostic::new(format!(
                    "malformed path remainder \"{}\"",
                    &path[pos..]
                ))));
            }
        }
    }

    if tokens.is_empty() {
        return Err(CompositeError::SyntaxError(Diagnostic::new("empty path")));
    }

    Ok(tokens)
}

/// Wrap `value_text` in nested `{name: ...}` / `[index: ...]` literals, one
/// per path token, from the innermost (last) token outward to the outermost
/// (first). The result is a value literal of the *root* type that, merged
/// in, updates only the field/element the path names.
pub fn convert_path(path: &str, value_text: &str) -> Result<String, CompositeError> {
    let tokens = tokenize_path(path)?;
    let mut current = value_text.trim().to_string();

    for token in tokens.iter().rev() {
        current = match token {
            PathToken::Name(name) => format!("{{{name}: {current}}}"),
            PathToken::Index(index) => format!("[{index}: {current}]"),
        };
    }

    Ok(current)
}

/// Apply one `path=value` patch to `value` in place, by wrapping the patch
/// into nested value text via [convert_path] and merging it at the root.
pub fn apply_patch(
    value: &mut Value,
    assignment: &PatchAssignment,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let wrapped = convert_path(&assignment.path, &assignment.value_text)?;
    let registry = Arc::clone(&value.registry);
    let type_expr = value.type_expr.clone();
    merge_into(&type_expr, value.bytes_mut(), &wrapped, &registry, host)
}

/// Escape `value` for embedding in an assignment-list/path patch, the way a
/// host-side `name=value` UI input would need to before handing it to
/// [convert_path]. Names ending in `->` denote a nested composite value,
/// passed through unescaped; any other name is treated as a leaf atom and
/// single-quote-escaped.
pub fn normalize_value(name: &str, value: &str) -> String {
    if name.ends_with("->") {
        value.to_string()
    } else {
        value.replace('\'', "''")
    }
}

// --- merge-in-place core ---

fn merge_into(
    type_expr: &TypeExpr,
    buf: &mut [u8],
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    match type_expr.arity {
        Arity::Scalar => merge_element(&type_expr.element, buf, 0, text, registry, host),
        Arity::Fixed(count) => merge_fixed_array(&type_expr.element, count, buf, text, registry, host),
        Arity::Dynamic => merge_dynamic_array(&type_expr.element, buf, text, registry, host),
    }
}

fn merge_element(
    kind: &ElementKind,
    buf: &mut [u8],
    offset: usize,
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    match kind {
        ElementKind::Atom(atom) => merge_atom(*atom, buf, offset, text, host),
        ElementKind::Record(name) => merge_record(name, buf, offset, text, registry, host),
    }
}

fn merge_atom(
    atom: AtomKind,
    buf: &mut [u8],
    offset: usize,
    text: &str,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let text = text.trim();
    match atom {
        AtomKind::Bool => {
            let parsed = host.parse_bool(text).ok_or_else(|| {
                CompositeError::AtomError(Diagnostic::new(format!(
                    "\"{text}\" is not a valid boolean"
                )))
            })?;
            crate::value::write_bool(buf, offset, parsed);
        }
        AtomKind::Int => {
            let parsed = host.parse_int(text).ok_or_else(|| {
                CompositeError::AtomError(Diagnostic::new(format!(
                    "\"{text}\" is not a valid integer"
                )))
            })?;
            crate::value::write_i32(buf, offset, parsed);
        }
        AtomKind::Real => {
            let parsed = host.parse_real(text).ok_or_else(|| {
                CompositeError::AtomError(Diagnostic::new(format!(
                    "\"{text}\" is not a valid real number"
                )))
            })?;
            crate::value::write_f64(buf, offset, parsed);
        }
        AtomKind::String => {
            let unquoted = unquote_string(text, host)?;
            ops::set_string_in_buf(buf, offset, unquoted.as_deref());
        }
    }
    Ok(())
}

/// Parse a `qstring` (`'...'` with doubled `''` escaping) or the unquoted
/// `nil` sentinel.
fn unquote_string(text: &str, host: &impl Host) -> Result<Option<String>, CompositeError> {
    if text == "nil" {
        return Ok(None);
    }

    let inner = text
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .ok_or_else(|| {
            CompositeError::SyntaxError(
                Diagnostic::new(format!("expected a single-quoted string, found \"{text}\""))
                    .with_hint(ErrorHint::CheckDelimiters),
            )
        })?;

    Ok(Some(host.unescape_quotes(inner)))
}

fn merge_record(
    name: &str,
    buf: &mut [u8],
    offset: usize,
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let record = registry.lookup(name).cloned().ok_or_else(|| {
        CompositeError::NameError(
            Diagnostic::new(format!("unknown type \"{name}\"")).with_hint(ErrorHint::CheckTypeName),
        )
    })?;

    let inner = unwrap_braces(text)?;
    let parts = split_elements(inner)?;

    for part in &parts {
        let (field_name, value_text) = split_field(part)?;
        let field = record.field(field_name).ok_or_else(|| {
            CompositeError::NameError(
                Diagnostic::new(format!("no field \"{field_name}\" on type \"{name}\""))
                    .with_hint(ErrorHint::CheckFieldOrIndex),
            )
        })?;
        let field_expr = layout::parse_type_expr(&field.type_expr)?;
        merge_into(
            &field_expr,
            &mut buf[offset + field.offset..],
            value_text,
            registry,
            host,
        )?;
    }

    Ok(())
}

fn split_field(part: &str) -> Result<(&str, &str), CompositeError> {
    match same_level_find(part, 0, ':') {
        LexResult::Found(idx, next) => Ok((part[..idx].trim(), part[next..].trim())),
        LexResult::NotFound(_) => Err(CompositeError::SyntaxError(Diagnostic::new(format!(
            "expected \"name: value\" in record literal, found \"{part}\""
        )))),
        LexResult::Err(e) => Err(e),
    }
}

fn unwrap_braces(text: &str) -> Result<&str, CompositeError> {
    let text = text.trim();
    let inner = text.strip_prefix('{').ok_or_else(|| {
        CompositeError::SyntaxError(
            Diagnostic::new(format!("expected opening \"{{\", found \"{text}\""))
                .with_hint(ErrorHint::CheckDelimiters),
        )
    })?;
    inner.strip_suffix('}').ok_or_else(|| {
        CompositeError::SyntaxError(
            Diagnostic::new(format!("expected closing \"}}\", found \"{text}\""))
                .with_hint(ErrorHint::CheckDelimiters),
        )
    })
}

fn unwrap_brackets(text: &str) -> Result<&str, CompositeError> {
    let text = text.trim();
    let inner = text.strip_prefix('[').ok_or_else(|| {
        CompositeError::SyntaxError(
            Diagnostic::new(format!("expected opening \"[\", found \"{text}\""))
                .with_hint(ErrorHint::CheckDelimiters),
        )
    })?;
    inner.strip_suffix(']').ok_or_else(|| {
        CompositeError::SyntaxError(
            Diagnostic::new(format!("expected closing \"]\", found \"{text}\""))
                .with_hint(ErrorHint::CheckDelimiters),
        )
    })
}

/// Split the inside of a `{...}`/`[...]` literal on top-level commas. An
/// empty (all-whitespace) body yields zero parts rather than one blank part.
fn split_elements(inner: &str) -> Result<Vec<&str>, CompositeError> {
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut pos = 0;

    loop {
        match same_level_find(inner, pos, ',') {
            LexResult::Found(idx, next) => {
                parts.push(inner[pos..idx].trim());
                pos = next;
            }
            LexResult::NotFound(_) => {
                parts.push(inner[pos..].trim());
                break;
            }
            LexResult::Err(e) => return Err(e),
        }
    }

    Ok(parts)
}

/// Resolve positional/explicit element indices for one `[...]`/`data: [...]`
/// array literal body (already comma-split). Enforces uniform indexing: the
/// elements must be all-positional (`prev + 1`, starting at 0) or all
/// explicit (`index: value`) — never a mix.
fn resolve_array_indices<'a>(parts: &[&'a str]) -> Result<Vec<(usize, &'a str)>, CompositeError> {
    let mut explicit: Option<bool> = None;
    let mut result = Vec::with_capacity(parts.len());
    let mut next_index = 0usize;

    for part in parts {
        match get_element_index(part) {
            LexResult::Found(index, consumed) => {
                if explicit == Some(false) {
                    return Err(mixed_indexing_error());
                }
                explicit = Some(true);
                result.push((index, part[consumed..].trim()));
            }
            LexResult::NotFound(_) => {
                if explicit == Some(true) {
                    return Err(mixed_indexing_error());
                }
                explicit = Some(false);
                result.push((next_index, *part));
                next_index += 1;
            }
            LexResult::Err(e) => return Err(e),
        }
    }

    Ok(result)
}

fn mixed_indexing_error() -> CompositeError {
    CompositeError::ShapeError(
        Diagnostic::new("array literal mixes positional and explicit indices")
            .with_hint(ErrorHint::CheckUniformIndexing),
    )
}

fn merge_fixed_array(
    element: &ElementKind,
    count: usize,
    buf: &mut [u8],
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let inner = unwrap_brackets(text)?;
    let parts = split_elements(inner)?;
    let indices = resolve_array_indices(&parts)?;

    for &(index, _) in &indices {
        if index >= count {
            return Err(CompositeError::BoundsError(
                Diagnostic::new(format!("index {index} out of range (capacity {count})"))
                    .with_hint(ErrorHint::CheckFieldOrIndex),
            ));
        }
    }

    let (elem_size, elem_align) = layout::element_size_align(element, registry.as_ref())?;
    let stride = layout::element_stride(elem_size, elem_align);

    for (index, value_text) in indices {
        merge_element(element, buf, index * stride, value_text, registry, host)?;
    }

    Ok(())
}

fn merge_dynamic_array(
    element: &ElementKind,
    buf: &mut [u8],
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        let inner = unwrap_brackets(trimmed)?;
        let parts = split_elements(inner)?;
        let indices = resolve_array_indices(&parts)?;

        if indices.is_empty() {
            return Ok(());
        }

        let max_index = indices.iter().map(|(i, _)| *i).max().unwrap();
        let prev_length = current_length(buf);
        let required_length = prev_length.max(max_index + 1);

        resize_and_apply(buf, element, registry, required_length, &indices, host)
    } else if trimmed.starts_with('{') {
        merge_extended_dynamic_array(element, buf, trimmed, registry, host)
    } else {
        Err(CompositeError::SyntaxError(
            Diagnostic::new(format!(
                "expected \"[...]\" or \"{{...}}\" dynamic array literal, found \"{trimmed}\""
            ))
            .with_hint(ErrorHint::CheckDelimiters),
        ))
    }
}

fn current_length(buf: &[u8]) -> usize {
    crate::value::read_dynamic_header(buf, 0).len.max(0) as usize
}

fn merge_extended_dynamic_array(
    element: &ElementKind,
    buf: &mut [u8],
    text: &str,
    registry: &Arc<TypeRegistry>,
    host: &impl Host,
) -> Result<(), CompositeError> {
    let inner = unwrap_braces(text)?;
    let parts = split_elements(inner)?;

    let mut size: Option<usize> = None;
    let mut data_text: Option<&str> = None;

    for part in &parts {
        let (field_name, value_text) = split_field(part)?;
        match field_name {
            "size" => {
                if size.is_some() {
                    return Err(CompositeError::ShapeError(Diagnostic::new(
                        "duplicate \"size\" field in extended dynamic array literal",
                    )));
                }
                let n: usize = value_text.parse().map_err(|_| {
                    CompositeError::SyntaxError(Diagnostic::new(format!(
                        "non-numeric \"size\" value \"{value_text}\""
                    )))
                })?;
                size = Some(n);
            }
            "data" => {
                if data_text.is_some() {
                    return Err(CompositeError::ShapeError(Diagnostic::new(
                        "duplicate \"data\" field in extended dynamic array literal",
                    )));
                }
                data_text = Some(value_text);
            }
            other => {
                return Err(CompositeError::ShapeError(Diagnostic::new(format!(
                    "unknown field \"{other}\" in extended dynamic array literal"
                ))))
            }
        }
    }

    if size.is_none() && data_text.is_none() {
        return Err(CompositeError::ShapeError(Diagnostic::new(
            "extended dynamic array literal must specify at least one of \"size\" or \"data\"",
        )));
    }

    let indices = match data_text {
        Some(data) => {
            let inner = unwrap_brackets(data)?;
            let parts = split_elements(inner)?;
            resolve_array_indices(&parts)?
        }
        None => Vec::new(),
    };

    let max_index = indices.iter().map(|(i, _)| *i).max();

    let required_length = match (size, max_index) {
        (Some(n), Some(max)) => {
            if max >= n {
                return Err(CompositeError::BoundsError(Diagnostic::new(format!(
                    "data element index {max} out of range for declared size {n}"
                ))));
            }
            n
        }
        (Some(n), None) => n,
        (None, Some(max)) => current_length(buf).max(max + 1),
        (None, None) => current_length(buf),
    };

    resize_and_apply(buf, element, registry, required_length, &indices, host)
}

/// Resize a dynamic array's element storage to `required_length` elements
/// (a no-op if it's already that length), then merge `indices` into the
/// resulting buffer.
///
/// Resizing allocates a new buffer, copies `min(prev_bytes, new_bytes)`
/// bytes from the old one, zeroes the remainder, and releases the old
/// *outer* allocation without walking its elements — ownership of whatever
/// owned children those bytes held (e.g. string pointers) transfers to the
/// new buffer along with the bytes. Indices that land on a carried-over
/// slot still get a clean free of its old contents, because
/// [merge_element] (via [ops::set_string_in_buf] for strings, or
/// recursively for records) always frees what was there before writing the
/// new value.
fn resize_and_apply(
    buf: &mut [u8],
    element: &ElementKind,
    registry: &Arc<TypeRegistry>,
    required_length: usize,
    indices: &[(usize, &str)],
    host: &impl Host,
) -> Result<(), CompositeError> {
    let (elem_size, elem_align) = layout::element_size_align(element, registry.as_ref())?;
    let stride = layout::element_stride(elem_size, elem_align);

    let header = crate::value::read_dynamic_header(buf, 0);
    let prev_length = header.len.max(0) as usize;

    let new_data = if required_length == prev_length {
        header.data
    } else {
        let new_bytes = stride * required_length;
        let prev_bytes = stride * prev_length;
        let new_ptr = ops::alloc_bytes(new_bytes);

        if new_bytes > 0 {
            let copy_len = prev_bytes.min(new_bytes);
            if copy_len > 0 && !header.data.is_null() {
                unsafe {
                    std::ptr::copy_nonoverlapping(header.data, new_ptr, copy_len);
                }
            }
            if new_bytes > copy_len {
                unsafe {
                    std::ptr::write_bytes(new_ptr.add(copy_len), 0, new_bytes - copy_len);
                }
            }
        }

        ops::free_bytes(header.data, prev_bytes);
        new_ptr
    };

    if required_length > 0 && !indices.is_empty() {
        let elem_buf =
            unsafe { std::slice::from_raw_parts_mut(new_data, stride * required_length) };
        for &(index, value_text) in indices {
            merge_element(element, elem_buf, index * stride, value_text, registry, host)?;
        }
    }

    crate::value::write_dynamic_header(
        buf,
        0,
        &crate::value::DynamicArrayHeader {
            data: new_data,
            len: required_length as i32,
        },
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DefaultHost;

    fn cluster_registry() -> Arc<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        registry
            .define_type("node", "string name; int state")
            .unwrap();
        registry
            .define_type("cluster", "string name; int size; node[10] nodes")
            .unwrap();
        Arc::new(registry)
    }

    fn node_value(registry: &Arc<TypeRegistry>, text: &str) -> Value {
        let type_expr = layout::parse_type_expr("node").unwrap();
        parse_composite(text, &type_expr, registry, &DefaultHost, None).unwrap()
    }

    #[test]
    fn parses_named_record_fields() {
        let registry = cluster_registry();
        let value = node_value(&registry, "{name: 'primary', state: 42}");

        let name = ops::nested_field_ptr(&value, "name").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(name.bytes, 0)),
            Some("primary")
        );

        let state = ops::nested_field_ptr(&value, "state").unwrap();
        assert_eq!(crate::value::read_i32(state.bytes, 0), 42);
    }

    #[test]
    fn record_absent_field_keeps_prior_value() {
        let registry = cluster_registry();
        let type_expr = layout::parse_type_expr("node").unwrap();
        let prev = node_value(&registry, "{name: 'primary', state: 42}");

        let patched =
            parse_composite("{state: 7}", &type_expr, &registry, &DefaultHost, Some(&prev))
                .unwrap();

        let name = ops::nested_field_ptr(&patched, "name").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(name.bytes, 0)),
            Some("primary")
        );
        let state = ops::nested_field_ptr(&patched, "state").unwrap();
        assert_eq!(crate::value::read_i32(state.bytes, 0), 7);
    }

    #[test]
    fn unknown_record_field_is_a_name_error() {
        let registry = cluster_registry();
        let type_expr = layout::parse_type_expr("node").unwrap();
        let err =
            parse_composite("{bogus: 1}", &type_expr, &registry, &DefaultHost, None).unwrap_err();
        assert!(matches!(err, CompositeError::NameError(_)));
    }

    #[test]
    fn patch_list_updates_nested_array_fields() {
        let registry = cluster_registry();
        let type_expr = layout::parse_type_expr("cluster").unwrap();
        let value = parse_composite(
            "nodes[0]->name='a';nodes[1]->state=7;",
            &type_expr,
            &registry,
            &DefaultHost,
            None,
        )
        .unwrap();

        let name0 = ops::nested_field_ptr(&value, "nodes[0]->name").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(name0.bytes, 0)),
            Some("a")
        );
        let state1 = ops::nested_field_ptr(&value, "nodes[1]->state").unwrap();
        assert_eq!(crate::value::read_i32(state1.bytes, 0), 7);
        let state0 = ops::nested_field_ptr(&value, "nodes[0]->state").unwrap();
        assert_eq!(crate::value::read_i32(state0.bytes, 0), 0);
    }

    #[test]
    fn extended_dynamic_array_carries_over_untouched_elements() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("string[]").unwrap();

        let prev = parse_composite("['x']", &type_expr, &registry, &DefaultHost, None).unwrap();
        let patched = parse_composite(
            "{size: 3, data: [0:'a', 2:'c']}",
            &type_expr,
            &registry,
            &DefaultHost,
            Some(&prev),
        )
        .unwrap();

        let elem1 = ops::nested_field_ptr(&patched, "[1]").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(elem1.bytes, 0)),
            Some("x")
        );
        let elem0 = ops::nested_field_ptr(&patched, "[0]").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(elem0.bytes, 0)),
            Some("a")
        );
        let elem2 = ops::nested_field_ptr(&patched, "[2]").unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(elem2.bytes, 0)),
            Some("c")
        );
    }

    #[test]
    fn short_form_dynamic_array_grows_to_cover_max_index() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("int[]").unwrap();

        let value =
            parse_composite("[0:1, 2:3]", &type_expr, &registry, &DefaultHost, None).unwrap();
        let size = ops::nested_field_ptr(&value, "size").unwrap();
        assert_eq!(crate::value::read_i32(size.bytes, 0), 3);

        assert_eq!(
            crate::value::read_i32(ops::nested_field_ptr(&value, "[0]").unwrap().bytes, 0),
            1
        );
        assert_eq!(
            crate::value::read_i32(ops::nested_field_ptr(&value, "[1]").unwrap().bytes, 0),
            0
        );
        assert_eq!(
            crate::value::read_i32(ops::nested_field_ptr(&value, "[2]").unwrap().bytes, 0),
            3
        );
    }

    #[test]
    fn mixed_positional_and_explicit_indexing_is_a_shape_error() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("int[]").unwrap();
        let prev = parse_composite("[1, 2]", &type_expr, &registry, &DefaultHost, None).unwrap();

        let err =
            parse_composite("[0:1, 3]", &type_expr, &registry, &DefaultHost, Some(&prev))
                .unwrap_err();

        assert!(matches!(err, CompositeError::ShapeError(_)));
    }

    #[test]
    fn nil_and_quoted_nil_are_distinct() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("string").unwrap();

        let null_value =
            parse_composite("nil", &type_expr, &registry, &DefaultHost, None).unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(null_value.bytes(), 0)),
            None
        );

        let literal_value =
            parse_composite("'nil'", &type_expr, &registry, &DefaultHost, None).unwrap();
        assert_eq!(
            ops::read_string(crate::value::read_ptr(literal_value.bytes(), 0)),
            Some("nil")
        );
    }

    #[test]
    fn assignment_list_detection() {
        assert!(is_assignment_list("name='a';"));
        assert!(!is_assignment_list("{name: 'a'}"));
    }

    #[test]
    fn convert_path_wraps_leaf_value_outward() {
        let wrapped = convert_path("nodes[0]->name", "'a'").unwrap();
        assert_eq!(wrapped, "{nodes: [0: {name: 'a'}]}");
    }

    #[test]
    fn empty_extended_dynamic_array_is_a_shape_error() {
        let registry = Arc::new(TypeRegistry::new());
        let type_expr = layout::parse_type_expr("int[]").unwrap();
        let err = parse_composite("{}", &type_expr, &registry, &DefaultHost, None).unwrap_err();
        assert!(matches!(err, CompositeError::ShapeError(_)));
    }
}
