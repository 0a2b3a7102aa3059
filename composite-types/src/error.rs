// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors raised while building and resolving composite type descriptors.

use core::fmt::{Display, Formatter};

/// An error building or resolving a [crate::RecordDescriptor].
///
/// This is the lightweight, schema-only error kind. Parsing and
/// serializing *values* of a type raise the richer error type in
/// `composite-core`, which wraps this one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// `define_type` was called with a signature containing no fields.
    EmptySignature { type_name: String },
    /// A field declaration did not split into exactly a type and a name.
    BadFieldDeclaration { type_name: String, declaration: String },
    /// A field (or array element) referenced a type that isn't registered.
    UnknownType { reference: String },
    /// `define_type` was called with a name that is already registered.
    ///
    /// The registry is monotonic: types may be added but never replaced or
    /// removed once the process has registered them.
    Redefinition { type_name: String },
    /// A record signature declared the same field name twice.
    DuplicateField { type_name: String, field: String },
}

impl Display for TypeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptySignature { type_name } => {
                write!(f, "signature of \"{type_name}\" type is empty")
            }
            Self::BadFieldDeclaration {
                type_name,
                declaration,
            } => write!(
                f,
                "wrong field definition: \"{declaration}\" in definition of type \"{type_name}\""
            ),
            Self::UnknownType { reference } => {
                write!(f, "wrong type \"{reference}\" is used in field definition")
            }
            Self::Redefinition { type_name } => {
                write!(f, "type \"{type_name}\" is already registered")
            }
            Self::DuplicateField { type_name, field } => write!(
                f,
                "field \"{field}\" is declared more than once in type \"{type_name}\""
            ),
        }
    }
}

impl std::error::Error for TypeError {}

pub type Result<T, E = TypeError> = std::result::Result<T, E>;
