// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-memory representation of a composite value: a byte arena laid
//! out exactly as [crate::layout] computes, plus the type expression that
//! says how to interpret it.
//!
//! Strings and dynamic-array payloads are owned heap blocks referenced by a
//! raw pointer written at their field's byte offset (`Box::into_raw` on
//! write, `Box::from_raw` on free/clone/compare), so that a host embedding
//! this crate can cast the arena to a C struct and see bit-compatible
//! pointer and length fields. All pointer arithmetic lives here and in
//! [crate::ops] / [crate::layout]; nothing above this module ever computes
//! a raw offset by hand.

use crate::layout::TypeExpr;
use crate::registry::TypeRegistry;
use std::sync::Arc;

/// Header written inline for every dynamic array: a pointer to the
/// heap-allocated element buffer, followed by its element count.
#[derive(Debug)]
pub(crate) struct DynamicArrayHeader {
    pub data: *mut u8,
    pub len: i32,
}

/// An owned composite value: a type expression plus a byte arena.
///
/// Dropping a [Value] recursively frees every string and dynamic-array
/// payload it owns, the same set of allocations [crate::ops::free] frees
/// explicitly. [crate::ops::free] exists for hosts that want to release a
/// value at a specific point rather than relying on scope exit; it is
/// implemented in terms of ordinary drop.
pub struct Value {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) type_expr: TypeExpr,
    pub(crate) buf: Vec<u8>,
}

impl Value {
    pub(crate) fn new(registry: Arc<TypeRegistry>, type_expr: TypeExpr, buf: Vec<u8>) -> Self {
        Self {
            registry,
            type_expr,
            buf,
        }
    }

    pub fn type_expr(&self) -> &TypeExpr {
        &self.type_expr
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let registry = Arc::clone(&self.registry);
        crate::ops::release_owned_children(&self.type_expr, &mut self.buf, &registry);
    }
}

/// Read a little-endian `i32` at `offset`. Public so callers holding a
/// [crate::ops::FieldPtr] can interpret its bytes.
pub fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub(crate) fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Read a little-endian `f64` at `offset`.
pub fn read_f64(buf: &[u8], offset: usize) -> f64 {
    f64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap())
}

pub(crate) fn write_f64(buf: &mut [u8], offset: usize, value: f64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

pub fn read_bool(buf: &[u8], offset: usize) -> bool {
    buf[offset] != 0
}

pub(crate) fn write_bool(buf: &mut [u8], offset: usize, value: bool) {
    buf[offset] = value as u8;
}

/// Read the owned-pointer field at `offset` as a raw `*mut u8`, or null.
pub fn read_ptr(buf: &[u8], offset: usize) -> *mut u8 {
    let raw = usize::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
    raw as *mut u8
}

pub(crate) fn write_ptr(buf: &mut [u8], offset: usize, ptr: *mut u8) {
    buf[offset..offset + 8].copy_from_slice(&(ptr as usize).to_le_bytes());
}

pub(crate) fn read_dynamic_header(buf: &[u8], offset: usize) -> DynamicArrayHeader {
    DynamicArrayHeader {
        data: read_ptr(buf, offset),
        len: read_i32(buf, offset + 8),
    }
}

pub(crate) fn write_dynamic_header(buf: &mut [u8], offset: usize, header: &DynamicArrayHeader) {
    write_ptr(buf, offset, header.data);
    write_i32(buf, offset + 8, header.len);
}
