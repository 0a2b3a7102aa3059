// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural operations on composite values: deep clone, deep compare,
//! free, and nested-path field access.
//!
//! Together with [crate::layout], this is the only module allowed to turn a
//! byte offset into a pointer dereference. Everything here that looks at a
//! `string` or dynamic-array field goes through [crate::value]'s thin
//! pointer helpers rather than reaching into the buffer directly.

use crate::error::{CompositeError, Diagnostic, ErrorHint};
use crate::layout::{self, Arity, ElementKind, TypeExpr, TypeResolver};
use crate::lexer::{get_index, get_name, LexResult};
use crate::registry::TypeRegistry;
use crate::value::{
    read_bool, read_dynamic_header, read_f64, read_i32, read_ptr, write_dynamic_header, write_ptr,
    DynamicArrayHeader, Value,
};
use composite_types::AtomKind;
use std::cmp::Ordering;
use std::sync::Arc;

pub(crate) fn alloc_bytes(len: usize) -> *mut u8 {
    if len == 0 {
        return std::ptr::null_mut();
    }
    let boxed: Box<[u8]> = vec![0u8; len].into_boxed_slice();
    Box::into_raw(boxed) as *mut u8
}

/// Release the single outer allocation backing a dynamic array's element
/// storage. Never walks into the elements themselves: after a resize, the
/// old buffer's bytes have already been shallow-copied into a new
/// allocation and freeing their owned children here would double-free them.
pub(crate) fn free_bytes(ptr: *mut u8, len: usize) {
    if ptr.is_null() || len == 0 {
        return;
    }
    unsafe {
        drop(Box::from_raw(std::slice::from_raw_parts_mut(ptr, len)));
    }
}

fn clone_bytes(ptr: *mut u8, len: usize) -> *mut u8 {
    if ptr.is_null() || len == 0 {
        return std::ptr::null_mut();
    }
    unsafe {
        let src = std::slice::from_raw_parts(ptr, len);
        let boxed: Box<[u8]> = src.to_vec().into_boxed_slice();
        Box::into_raw(boxed) as *mut u8
    }
}

fn string_len(ptr: *mut u8) -> usize {
    let mut len = 0;
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
    }
    len
}

pub(crate) fn alloc_string(text: &str) -> *mut u8 {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    let boxed = bytes.into_boxed_slice();
    Box::into_raw(boxed) as *mut u8
}

/// Read a `string` atom field's value given the raw pointer [crate::value::read_ptr]
/// returned for it (`None` for a null string field, otherwise the NUL-terminated
/// text). Public alongside [crate::value::read_ptr]/[crate::value::read_i32]
/// so callers holding a [FieldPtr] can interpret every atom kind.
pub fn read_string<'a>(ptr: *mut u8) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    let len = string_len(ptr);
    unsafe {
        let slice = std::slice::from_raw_parts(ptr, len);
        std::str::from_utf8(slice).ok()
    }
}

fn free_string(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    free_bytes(ptr, string_len(ptr) + 1);
}

fn clone_string(ptr: *mut u8) -> *mut u8 {
    if ptr.is_null() {
        return std::ptr::null_mut();
    }
    clone_bytes(ptr, string_len(ptr) + 1)
}

/// Element size/stride for a record's field array, resolved through the
/// registry. Shared by clone/compare/free so they agree on how far apart
/// elements sit.
fn element_layout(
    kind: &ElementKind,
    registry: &TypeRegistry,
) -> Result<(usize, usize), CompositeError> {
    layout::element_size_align(kind, registry)
}

/// Recursively release every owned pointer reachable from a value whose
/// type is `type_expr` and whose bytes are `buf` (exactly
/// `layout::field_size_align(type_expr, registry)` long).
///
/// Called from [Value]'s `Drop` impl; also reachable via [free] for hosts
/// that want to release a value at an explicit point.
pub(crate) fn release_owned_children(type_expr: &TypeExpr, buf: &mut [u8], registry: &TypeRegistry) {
    match type_expr.arity {
        Arity::Scalar => release_element(&type_expr.element, buf, 0, registry),
        Arity::Fixed(count) => {
            if let Ok((size, align)) = element_layout(&type_expr.element, registry) {
                let stride = layout::element_stride(size, align);
                for i in 0..count {
                    release_element(&type_expr.element, buf, i * stride, registry);
                }
            }
        }
        Arity::Dynamic => {
            if let Ok((size, align)) = element_layout(&type_expr.element, registry) {
                let stride = layout::element_stride(size, align);
                let header = read_dynamic_header(buf, 0);
                if !header.data.is_null() {
                    let total = stride * header.len.max(0) as usize;
                    let elem_buf =
                        unsafe { std::slice::from_raw_parts_mut(header.data, total) };
                    for i in 0..header.len.max(0) as usize {
                        release_element(&type_expr.element, elem_buf, i * stride, registry);
                    }
                    free_bytes(header.data, total);
                }
            }
        }
    }
}

fn release_element(kind: &ElementKind, buf: &mut [u8], offset: usize, registry: &TypeRegistry) {
    match kind {
        ElementKind::Atom(AtomKind::String) => {
            let ptr = read_ptr(buf, offset);
            free_string(ptr);
        }
        ElementKind::Atom(_) => {}
        ElementKind::Record(name) => {
            if let Some(record) = registry.resolve_record(name) {
                for field in &record.fields {
                    if let Ok(expr) = layout::parse_type_expr(&field.type_expr) {
                        release_owned_children(
                            &expr,
                            &mut buf[offset + field.offset..],
                            registry,
                        );
                    }
                }
            }
        }
    }
}

/// Deep clone a value, duplicating every owned string and dynamic-array
/// allocation it reaches.
pub fn clone(value: &Value) -> Value {
    let mut buf = value.bytes().to_vec();
    clone_children(&value.type_expr, &mut buf, &value.registry);
    Value::new(Arc::clone(&value.registry), value.type_expr.clone(), buf)
}

fn clone_children(type_expr: &TypeExpr, buf: &mut [u8], registry: &TypeRegistry) {
    match type_expr.arity {
        Arity::Scalar => clone_element(&type_expr.element, buf, 0, registry),
        Arity::Fixed(count) => {
            if let Ok((size, align)) = element_layout(&type_expr.element, registry) {
                let stride = layout::element_stride(size, align);
                for i in 0..count {
                    clone_element(&type_expr.element, buf, i * stride, registry);
                }
            }
        }
        Arity::Dynamic => {
            if let Ok((size, align)) = element_layout(&type_expr.element, registry) {
                let stride = layout::element_stride(size, align);
                let header = read_dynamic_header(buf, 0);
                let total = stride * header.len.max(0) as usize;
                let new_data = clone_bytes(header.data, total);
                if !new_data.is_null() {
                    let elem_buf = unsafe { std::slice::from_raw_parts_mut(new_data, total) };
                    for i in 0..header.len.max(0) as usize {
                        clone_element(&type_expr.element, elem_buf, i * stride, registry);
                    }
                }
                write_dynamic_header(
                    buf,
                    0,
                    &DynamicArrayHeader {
                        data: new_data,
                        len: header.len,
                    },
                );
            }
        }
    }
}

fn clone_element(kind: &ElementKind, buf: &mut [u8], offset: usize, registry: &TypeRegistry) {
    match kind {
        ElementKind::Atom(AtomKind::String) => {
            let ptr = read_ptr(buf, offset);
            write_ptr(buf, offset, clone_string(ptr));
        }
        ElementKind::Atom(_) => {}
        ElementKind::Record(name) => {
            if let Some(record) = registry.resolve_record(name) {
                for field in &record.fields {
                    if let Ok(expr) = layout::parse_type_expr(&field.type_expr) {
                        clone_children(&expr, &mut buf[offset + field.offset..], registry);
                    }
                }
            }
        }
    }
}

/// Explicitly release a value's owned allocations.
///
/// Equivalent to letting `value` go out of scope; provided for hosts that
/// need to free a value at a point other than Rust scope exit (e.g. one
/// stored in a host-owned slot outside this crate's control).
pub fn free(value: Value) {
    drop(value);
}

/// Deep structural comparison. Records compare field-by-field in
/// declaration order; arrays compare element-by-element, and a shorter
/// dynamic array sorts before a longer one with a matching prefix.
///
/// Comparing two values of different types is a [CompositeError::ShapeError]:
/// unlike an *unknown* type (caught earlier, at registration or parse time),
/// a type mismatch between two already-valid values is a caller bug, not a
/// data-shape question a sentinel return could usefully encode here.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, CompositeError> {
    if a.type_expr != b.type_expr {
        return Err(CompositeError::ShapeError(Diagnostic::new(
            "cannot compare values of different types",
        )));
    }
    Ok(compare_typed(&a.type_expr, a.bytes(), b.bytes(), &a.registry))
}

fn compare_typed(type_expr: &TypeExpr, a: &[u8], b: &[u8], registry: &TypeRegistry) -> Ordering {
    match type_expr.arity {
        Arity::Scalar => compare_element(&type_expr.element, a, 0, b, 0, registry),
        Arity::Fixed(count) => {
            let Ok((size, align)) = element_layout(&type_expr.element, registry) else {
                return Ordering::Equal;
            };
            let stride = layout::element_stride(size, align);
            for i in 0..count {
                let ord = compare_element(
                    &type_expr.element,
                    a,
                    i * stride,
                    b,
                    i * stride,
                    registry,
                );
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        Arity::Dynamic => {
            let Ok((size, align)) = element_layout(&type_expr.element, registry) else {
                return Ordering::Equal;
            };
            let stride = layout::element_stride(size, align);
            let ha = read_dynamic_header(a, 0);
            let hb = read_dynamic_header(b, 0);
            let common = ha.len.min(hb.len).max(0) as usize;

            let buf_a = if ha.data.is_null() {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(ha.data, stride * ha.len.max(0) as usize) }
            };
            let buf_b = if hb.data.is_null() {
                &[][..]
            } else {
                unsafe { std::slice::from_raw_parts(hb.data, stride * hb.len.max(0) as usize) }
            };

            for i in 0..common {
                let ord = compare_element(
                    &type_expr.element,
                    buf_a,
                    i * stride,
                    buf_b,
                    i * stride,
                    registry,
                );
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            ha.len.cmp(&hb.len)
        }
    }
}

fn compare_element(
    kind: &ElementKind,
    a: &[u8],
    off_a: usize,
    b: &[u8],
    off_b: usize,
    registry: &TypeRegistry,
) -> Ordering {
    match kind {
        ElementKind::Atom(AtomKind::Bool) => read_bool(a, off_a).cmp(&read_bool(b, off_b)),
        ElementKind::Atom(AtomKind::Int) => read_i32(a, off_a).cmp(&read_i32(b, off_b)),
        ElementKind::Atom(AtomKind::Real) => read_f64(a, off_a)
            .partial_cmp(&read_f64(b, off_b))
            .unwrap_or(Ordering::Equal),
        ElementKind::Atom(AtomKind::String) => {
            let sa = read_string(read_ptr(a, off_a));
            let sb = read_string(read_ptr(b, off_b));
            sa.cmp(&sb)
        }
        ElementKind::Record(name) => {
            let Some(record) = registry.resolve_record(name) else {
                return Ordering::Equal;
            };
            for field in &record.fields {
                let Ok(expr) = layout::parse_type_expr(&field.type_expr) else {
                    continue;
                };
                let ord = compare_typed(
                    &expr,
                    &a[off_a + field.offset..],
                    &b[off_b + field.offset..],
                    registry,
                );
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
    }
}

/// A borrowed view of one field/element reached by [nested_field_ptr].
pub struct FieldPtr<'a> {
    pub type_expr: TypeExpr,
    pub bytes: &'a [u8],
}

/// Resolve a `->`/`[]` path (`"nodes[2]->name"`) against a value, returning
/// the bytes and type expression at that position. On a dynamic array,
/// indexing transparently dereferences into the `data` buffer unless the
/// next token is literally `size` or `data`.
pub fn nested_field_ptr<'a>(value: &'a Value, path: &str) -> Result<FieldPtr<'a>, CompositeError> {
    let (type_expr, bytes) = resolve_path(&value.type_expr, value.bytes(), path, &value.registry)?;
    Ok(FieldPtr { type_expr, bytes })
}

/// Resolve a path against a value's type only, without requiring a live
/// value (e.g. for validating a patch path, or determining the type to
/// parse a patch's value text against before applying it).
pub fn nested_field_type(
    type_expr: &TypeExpr,
    registry: &TypeRegistry,
    path: &str,
) -> Result<TypeExpr, CompositeError> {
    resolve_path_type(type_expr, path, registry)
}

/// Resolve a path against `buf`, which must already be exactly the bytes of
/// a value of type `type_expr` (no outer offset): each recursive step
/// reslices into either the same buffer (fixed arrays, record fields) or a
/// freshly-borrowed view of a dynamic array's separate heap allocation, so
/// the returned slice is always relative to wherever its bytes actually
/// live rather than to the original top-level buffer.
fn resolve_path<'a>(
    type_expr: &TypeExpr,
    buf: &'a [u8],
    path: &str,
    registry: &TypeRegistry,
) -> Result<(TypeExpr, &'a [u8]), CompositeError> {
    if path.is_empty() {
        let (size, _align) = layout::field_size_align(type_expr, registry)?;
        return Ok((type_expr.clone(), &buf[..size]));
    }

    match get_index(path) {
        LexResult::Found(index, consumed) => resolve_index(type_expr, buf, index, &path[consumed..], registry),
        LexResult::NotFound(_) => match get_name(path) {
            LexResult::Found(name, consumed) => {
                resolve_name(type_expr, buf, &name, &path[consumed..], registry)
            }
            LexResult::NotFound(_) => Err(CompositeError::SyntaxError(Diagnostic::new(format!(
                "malformed path remainder \"{path}\""
            )))),
            LexResult::Err(e) => Err(e),
        },
        LexResult::Err(e) => Err(e),
    }
}

fn resolve_index<'a>(
    type_expr: &TypeExpr,
    buf: &'a [u8],
    index: usize,
    rest: &str,
    registry: &TypeRegistry,
) -> Result<(TypeExpr, &'a [u8]), CompositeError> {
    let (elem_size, elem_align) = element_layout(&type_expr.element, registry)?;
    let stride = layout::element_stride(elem_size, elem_align);

    let elements: &'a [u8] = match type_expr.arity {
        Arity::Fixed(count) => {
            if index >= count {
                return Err(CompositeError::BoundsError(
                    Diagnostic::new(format!("index {index} out of range (len {count})"))
                        .with_hint(ErrorHint::CheckFieldOrIndex),
                ));
            }
            buf
        }
        Arity::Dynamic => {
            let header = read_dynamic_header(buf, 0);
            let count = header.len.max(0) as usize;
            if index >= count {
                return Err(CompositeError::BoundsError(
                    Diagnostic::new(format!("index {index} out of range (len {count})"))
                        .with_hint(ErrorHint::CheckFieldOrIndex),
                ));
            }
            if header.data.is_null() {
                &[]
            } else {
                unsafe { std::slice::from_raw_parts(header.data, stride * count) }
            }
        }
        Arity::Scalar => {
            return Err(CompositeError::ShapeError(Diagnostic::new(
                "cannot index a scalar value",
            )))
        }
    };

    resolve_path(
        &TypeExpr {
            element: type_expr.element.clone(),
            arity: Arity::Scalar,
        },
        &elements[index * stride..],
        rest,
        registry,
    )
}

fn resolve_name<'a>(
    type_expr: &TypeExpr,
    buf: &'a [u8],
    name: &str,
    rest: &str,
    registry: &TypeRegistry,
) -> Result<(TypeExpr, &'a [u8]), CompositeError> {
    match type_expr.arity {
        Arity::Dynamic => match name {
            "size" => {
                if !rest.is_empty() {
                    return Err(CompositeError::NameError(Diagnostic::new(
                        "\"size\" is a leaf field and cannot be indexed further",
                    )));
                }
                let size_expr = TypeExpr {
                    element: ElementKind::Atom(AtomKind::Int),
                    arity: Arity::Scalar,
                };
                Ok((size_expr, &buf[layout::POINTER_SIZE..layout::POINTER_SIZE + 4]))
            }
            "data" => resolve_path(type_expr, buf, rest, registry),
            _ => Err(CompositeError::NameError(
                Diagnostic::new(format!("\"{name}\" is not a field of a dynamic array"))
                    .with_hint(ErrorHint::CheckFieldOrIndex),
            )),
        },
        Arity::Fixed(_) => Err(CompositeError::NameError(Diagnostic::new(format!(
            "\"{name}\" is not a field of a fixed array"
        )))),
        Arity::Scalar => {
            let ElementKind::Record(record_name) = &type_expr.element else {
                return Err(CompositeError::NameError(Diagnostic::new(format!(
                    "\"{name}\" is not a field of a non-record value"
                ))));
            };
            let record = registry.resolve_record(record_name).ok_or_else(|| {
                CompositeError::NameError(
                    Diagnostic::new(format!("unknown type \"{record_name}\""))
                        .with_hint(ErrorHint::CheckTypeName),
                )
            })?;
            let field = record.field(name).ok_or_else(|| {
                CompositeError::NameError(
                    Diagnostic::new(format!("no field \"{name}\" on type \"{record_name}\""))
                        .with_hint(ErrorHint::CheckFieldOrIndex),
                )
            })?;
            let field_expr = layout::parse_type_expr(&field.type_expr)?;
            resolve_path(&field_expr, &buf[field.offset..], rest, registry)
        }
    }
}

fn resolve_path_type(
    type_expr: &TypeExpr,
    path: &str,
    registry: &TypeRegistry,
) -> Result<TypeExpr, CompositeError> {
    if path.is_empty() {
        return Ok(type_expr.clone());
    }

    match get_index(path) {
        LexResult::Found(_, consumed) => {
            if type_expr.arity == Arity::Scalar {
                return Err(CompositeError::ShapeError(Diagnostic::new(
                    "cannot index a scalar value",
                )));
            }
            resolve_path_type(
                &TypeExpr {
                    element: type_expr.element.clone(),
                    arity: Arity::Scalar,
                },
                &path[consumed..],
                registry,
            )
        }
        LexResult::NotFound(_) => match get_name(path) {
            LexResult::Found(name, consumed) => match type_expr.arity {
                Arity::Dynamic => match name.as_str() {
                    "size" => {
                        if !path[consumed..].is_empty() {
                            return Err(CompositeError::NameError(Diagnostic::new(
                                "\"size\" is a leaf field and cannot be indexed further",
                            )));
                        }
                        Ok(TypeExpr {
                            element: ElementKind::Atom(AtomKind::Int),
                            arity: Arity::Scalar,
                        })
                    }
                    "data" => resolve_path_type(type_expr, &path[consumed..], registry),
                    _ => Err(CompositeError::NameError(Diagnostic::new(format!(
                        "\"{name}\" is not a field of a dynamic array"
                    )))),
                },
                Arity::Fixed(_) => Err(CompositeError::NameError(Diagnostic::new(format!(
                    "\"{name}\" is not a field of a fixed array"
                )))),
                Arity::Scalar => {
                    let ElementKind::Record(record_name) = &type_expr.element else {
                        return Err(CompositeError::NameError(Diagnostic::new(format!(
                            "\"{name}\" is not a field of a non-record value"
                        ))));
                    };
                    let record = registry.resolve_record(record_name).ok_or_else(|| {
                        CompositeError::NameError(Diagnostic::new(format!(
                            "unknown type \"{record_name}\""
                        )))
                    })?;
                    let field = record.field(&name).ok_or_else(|| {
                        CompositeError::NameError(Diagnostic::new(format!(
                            "no field \"{name}\" on type \"{record_name}\""
                        )))
                    })?;
                    let field_expr = layout::parse_type_expr(&field.type_expr)?;
                    resolve_path_type(&field_expr, &path[consumed..], registry)
                }
            },
            LexResult::NotFound(_) => Err(CompositeError::SyntaxError(Diagnostic::new(format!(
                "malformed path remainder \"{path}\""
            )))),
            LexResult::Err(e) => Err(e),
        },
        LexResult::Err(e) => Err(e),
    }
}

// --- value construction helpers used by the parser ---

pub(crate) fn new_value(
    registry: &Arc<TypeRegistry>,
    type_expr: TypeExpr,
) -> Result<Value, CompositeError> {
    let (size, _align) = layout::field_size_align(&type_expr, registry.as_ref())?;
    Ok(Value::new(Arc::clone(registry), type_expr, vec![0u8; size]))
}

/// Overwrite a `string` atom field at `offset` within a raw buffer,
/// releasing whatever pointer was already there first. Used both to build
/// a fresh value and to merge a patch into an existing one: either way the
/// old pointer at `offset` (null, for a fresh buffer) must be freed before
/// the new one is written.
pub(crate) fn set_string_in_buf(buf: &mut [u8], offset: usize, v: Option<&str>) {
    let old = read_ptr(buf, offset);
    free_string(old);
    let ptr = v.map(alloc_string).unwrap_or(std::ptr::null_mut());
    write_ptr(buf, offset, ptr);
}
