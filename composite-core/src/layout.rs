// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pure functions resolving a type expression string to a size, alignment,
//! and (for arrays) element layout.
//!
//! Nothing in this module does I/O or logging: it is on the hot path of
//! every parse, serialize, clone, compare, and free, and it is called
//! recursively for nested records. All pointer and offset arithmetic in
//! this crate is confined to this module and [crate::ops].

use crate::error::{CompositeError, Diagnostic, ErrorHint};
use composite_types::{AtomKind, RecordDescriptor};
use std::sync::Arc;

/// Byte width and alignment of the `{ data: *mut u8, len: i32 }` footprint
/// every dynamic array occupies inline in its containing record, regardless
/// of its element type.
pub const POINTER_SIZE: usize = 8;
pub const POINTER_ALIGN: usize = 8;

/// Anything that can resolve a registered record type by name.
///
/// Implemented by [crate::registry::TypeRegistry]. Kept as a trait so the
/// layout functions don't need to know about the registry's storage.
pub trait TypeResolver {
    fn resolve_record(&self, name: &str) -> Option<Arc<RecordDescriptor>>;
}

/// What a single field (or the top-level value) of a composite type
/// expression names as its element kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Atom(AtomKind),
    Record(String),
}

/// Array-ness of a parsed type expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    /// Not an array: exactly one value of the element type.
    Scalar,
    /// `base[N]`: exactly `N` contiguous values.
    Fixed(usize),
    /// `base[]` or `base[0]`: a variable number of values behind a pointer.
    Dynamic,
}

/// A parsed type expression: an element kind plus its arity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeExpr {
    pub element: ElementKind,
    pub arity: Arity,
}

/// Split `"node[10]"` into `("node", Fixed(10))`, `"node[]"` / `"node[0]"`
/// into `("node", Dynamic)`, and `"node"` into `("node", Scalar)`.
pub fn parse_type_expr(expr: &str) -> Result<TypeExpr, CompositeError> {
    let expr = expr.trim();

    let (base, arity) = if let Some(open) = expr.find('[') {
        if !expr.ends_with(']') {
            return Err(CompositeError::SyntaxError(
                Diagnostic::new(format!("unterminated array suffix in type \"{expr}\""))
                    .with_hint(ErrorHint::CheckDelimiters),
            ));
        }

        let base = expr[..open].trim();
        let inside = expr[open + 1..expr.len() - 1].trim();

        let arity = if inside.is_empty() || inside == "0" {
            Arity::Dynamic
        } else {
            let count: usize = inside.parse().map_err(|_| {
                CompositeError::SyntaxError(Diagnostic::new(format!(
                    "non-numeric array size \"{inside}\" in type \"{expr}\""
                )))
            })?;

            if count == 0 {
                Arity::Dynamic
            } else {
                Arity::Fixed(count)
            }
        };

        (base, arity)
    } else {
        (expr, Arity::Scalar)
    };

    if base.is_empty() {
        return Err(CompositeError::SyntaxError(Diagnostic::new(format!(
            "empty base type in expression \"{expr}\""
        ))));
    }

    let element = match AtomKind::from_name(base) {
        Some(atom) => ElementKind::Atom(atom),
        None => ElementKind::Record(base.to_string()),
    };

    Ok(TypeExpr { element, arity })
}

/// Ordinary C alignment padding: round `value` up to the next multiple of
/// `align`. Used for record field offsets, overall record size, and the
/// dynamic-array in-struct footprint.
pub fn align_up(value: usize, align: usize) -> usize {
    if align == 0 {
        return value;
    }
    let rem = value % align;
    if rem == 0 {
        value
    } else {
        value + (align - rem)
    }
}

/// The source's non-standard *array* stride formula: pads `value` by
/// `value % align` rather than rounding up to the next multiple of `align`.
/// Preserved verbatim because host C structs depend on it bit-for-bit.
///
/// This is reserved for array element stride ([element_stride]) only.
/// Record field offsets and overall record/footprint sizes use ordinary
/// [align_up] instead — the two formulas only coincide when `value % align`
/// happens to equal `align / 2`, so conflating them misplaces fields (e.g. a
/// `bool` followed by an `int` would land the `int` at offset 2 instead of
/// the C-correct offset 4).
pub fn pad(value: usize, align: usize) -> usize {
    if align == 0 {
        value
    } else {
        value + (value % align)
    }
}

/// Size and alignment of one element of `kind`, without any array stride
/// applied.
pub fn element_size_align(
    kind: &ElementKind,
    resolver: &impl TypeResolver,
) -> Result<(usize, usize), CompositeError> {
    match kind {
        ElementKind::Atom(atom) => Ok((atom.size(), atom.align())),
        ElementKind::Record(name) => {
            let record = resolver.resolve_record(name).ok_or_else(|| {
                CompositeError::NameError(
                    Diagnostic::new(format!("unknown type \"{name}\""))
                        .with_hint(ErrorHint::CheckTypeName),
                )
            })?;
            Ok((record.size, record.align))
        }
    }
}

/// Size and alignment of a full field (element kind + arity), i.e. what a
/// containing record's layout pass uses when placing this field.
pub fn field_size_align(
    expr: &TypeExpr,
    resolver: &impl TypeResolver,
) -> Result<(usize, usize), CompositeError> {
    let (elem_size, elem_align) = element_size_align(&expr.element, resolver)?;

    match expr.arity {
        Arity::Scalar => Ok((elem_size, elem_align)),
        Arity::Fixed(count) => {
            let stride = element_stride(elem_size, elem_align);
            Ok((stride * count, elem_align))
        }
        Arity::Dynamic => Ok((align_up(POINTER_SIZE + 4, POINTER_ALIGN), POINTER_ALIGN)),
    }
}

/// Compute field offsets and the overall size/alignment for a record given
/// its fields' type expressions, in declaration order. Each field's offset
/// is the running cursor advanced to the next multiple of the field's
/// `align` (ordinary C struct layout), then the cursor is advanced past the
/// field's size; the record's own size is the final cursor padded up to its
/// overall alignment the same way.
///
/// Returns `(offsets, size, align)` where `offsets[i]` is the byte offset of
/// `fields[i]`.
pub fn layout_record(
    fields: &[TypeExpr],
    resolver: &impl TypeResolver,
) -> Result<(Vec<usize>, usize, usize), CompositeError> {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut cursor = 0usize;
    let mut record_align = 1usize;

    for expr in fields {
        let (size, align) = field_size_align(expr, resolver)?;
        let offset = align_up(cursor, align.max(1));
        offsets.push(offset);
        cursor = offset + size;
        record_align = record_align.max(align);
    }

    let size = align_up(cursor, record_align.max(1));
    Ok((offsets, size, record_align))
}

/// The stride between consecutive elements of an array whose element kind
/// has `(size, align)`. This is the non-standard [pad] formula, reproduced
/// verbatim for C ABI compatibility.
pub fn element_stride(size: usize, align: usize) -> usize {
    pad(size, align)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct TestResolver(HashMap<String, Arc<RecordDescriptor>>);

    impl TypeResolver for TestResolver {
        fn resolve_record(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn parses_scalar_fixed_and_dynamic() {
        assert_eq!(parse_type_expr("int").unwrap().arity, Arity::Scalar);
        assert_eq!(
            parse_type_expr("node[10]").unwrap().arity,
            Arity::Fixed(10)
        );
        assert_eq!(parse_type_expr("node[]").unwrap().arity, Arity::Dynamic);
        assert_eq!(parse_type_expr("node[0]").unwrap().arity, Arity::Dynamic);
    }

    #[test]
    fn atom_layout_is_self_describing() {
        let resolver = TestResolver(HashMap::new());
        let expr = parse_type_expr("real").unwrap();
        let (size, align) = field_size_align(&expr, &resolver).unwrap();
        assert_eq!((size, align), (8, 8));
    }

    #[test]
    fn record_layout_uses_ordinary_alignment_not_array_stride() {
        // bool (size 1, align 1) then int (size 4, align 4): the field
        // offset must land on the next multiple of 4, not `pad(1, 4) == 2`.
        let resolver = TestResolver(HashMap::new());
        let fields = vec![
            parse_type_expr("bool").unwrap(),
            parse_type_expr("int").unwrap(),
            parse_type_expr("real").unwrap(),
        ];
        let (offsets, size, align) = layout_record(&fields, &resolver).unwrap();
        assert_eq!(offsets, vec![0, 4, 8]);
        assert_eq!(align, 8);
        assert_eq!(size, 16);
    }

    #[test]
    fn pad_and_align_up_diverge_off_the_halfway_point() {
        assert_eq!(pad(1, 4), 2);
        assert_eq!(align_up(1, 4), 4);
    }

    #[test]
    fn unknown_record_reference_errors() {
        let resolver = TestResolver(HashMap::new());
        let expr = parse_type_expr("nonexistent").unwrap();
        assert!(matches!(
            element_size_align(&expr.element, &resolver),
            Err(CompositeError::NameError(_))
        ));
    }
}
