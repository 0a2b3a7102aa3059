// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry, parser, serializer, and structural operations for composite
//! configuration values.
//!
//! A composite configuration value is an instance of a record, fixed
//! array, or dynamic array type built on the four scalar atoms defined by
//! [composite_types]. This crate owns everything [composite_types] leaves
//! out: resolving a type name to a layout ([layout]), tokenizing and
//! parsing the textual grammar ([lexer], [parser]), rendering values back
//! to text ([serializer]), and the deep clone/compare/free/path-lookup
//! operations values support ([ops]).
//!
//! # Getting started
//!
//! ```
//! use composite_core::host::DefaultHost;
//! use composite_core::registry::TypeRegistry;
//! use composite_core::{layout, ops, parser, serializer};
//! use std::sync::Arc;
//!
//! let mut registry = TypeRegistry::new();
//! registry.define_type("point", "int x; int y").unwrap();
//! let registry = Arc::new(registry);
//!
//! let type_expr = layout::parse_type_expr("point").unwrap();
//! let value =
//!     parser::parse_composite("{x: 1, y: 2}", &type_expr, &registry, &DefaultHost, None)
//!         .unwrap();
//! let text = serializer::serialize(&value, serializer::Mode::Display, &DefaultHost).unwrap();
//! assert_eq!(text, "{x: 1, y: 2}");
//!
//! let field = ops::nested_field_ptr(&value, "y").unwrap();
//! assert_eq!(composite_core::value::read_i32(field.bytes, 0), 2);
//! ```
//!
//! # Where the unsafe lives
//!
//! [Value] is a byte arena laid out exactly as [layout] computes. Strings
//! and dynamic-array payloads are owned heap blocks referenced by a raw
//! pointer stored at their field's offset, so that a host embedding this
//! crate can cast the arena to a C struct and see bit-compatible pointer
//! and length fields. All pointer arithmetic is confined to [layout] and
//! [ops]; nothing above those two modules computes a raw offset by hand.

pub mod error;
pub mod host;
pub mod layout;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod registry;
pub mod serializer;
pub mod value;

pub use error::{CompositeError, Result};
pub use value::Value;
