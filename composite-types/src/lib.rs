// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data structures describing user-defined composite configuration types.
//!
//! This crate defines the data model for a small embedded type system used
//! to declare composite configuration values: records, fixed-size arrays,
//! and variable-length arrays, built on four scalar atoms (`bool`, `int`,
//! `real`, `string`).
//!
//! # Minimal by Design
//!
//! This crate only describes *types*. It purposefully has no opinion on
//! how values of those types are parsed, serialized, or laid out in memory
//! beyond the field offsets every [RecordDescriptor] caches at registration
//! time. Parsing, serialization, and the registry that resolves a name to a
//! descriptor live in `composite-core`.
//!
//! # Type Expressions vs. Registered Types
//!
//! Only records are named, registered entities ([RecordDescriptor]). Atoms
//! are four fixed built-in names ([AtomKind]). Arrays are not registered at
//! all: they are a syntactic property of a *type expression* string, written
//! `base[N]` (fixed capacity `N`) or `base[]` / `base[0]` (dynamic). A field
//! whose declared type is `"node[10]"` does not look up a type named
//! `"node[10]"` in the registry; it looks up `"node"` and treats the whole
//! expression as "ten of those, contiguous". See `composite-core::layout`
//! for where that resolution happens.

mod atom;
mod descriptor;
mod error;

pub use atom::AtomKind;
pub use descriptor::{RecordDescriptor, RecordField};
pub use error::{Result, TypeError};
