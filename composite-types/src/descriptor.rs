// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registered record type descriptors.
//!
//! Only records are named, registered entities. Arrays are a syntactic
//! property of a *type expression* (`base[N]` / `base[]`) and atoms are
//! four built-in names; neither has a descriptor of its own. See
//! `composite-core::layout` for the functions that resolve a type
//! expression string (possibly naming a registered record) to a size,
//! alignment, and field table.

/// One field of a registered record, in declaration order.
///
/// `offset` is computed once, when the record is registered, following the
/// same C alignment rules the layout engine uses everywhere else: it is
/// immutable for the lifetime of the descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    /// The field's type expression, e.g. `"int"`, `"node"`, `"node[10]"`,
    /// `"string[]"`.
    pub type_expr: String,
    pub offset: usize,
}

/// A registered composite (record) type: an ordered, named field list plus
/// its precomputed C-compatible layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub name: String,
    pub signature: String,
    pub fields: Vec<RecordField>,
    pub size: usize,
    pub align: usize,
}

impl RecordDescriptor {
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }
}
