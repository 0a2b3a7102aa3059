// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The four built-in scalar types.

use core::fmt::{Display, Formatter};

/// One of the four built-in scalar types a composite value can bottom out at.
///
/// `String` atoms are owned, NUL-terminated, pointer-sized fields in the
/// C-layout buffer (or the null sentinel); the other three are stored
/// by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AtomKind {
    Bool,
    Int,
    Real,
    String,
}

impl AtomKind {
    /// Parse the textual name used in signatures and type expressions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "real" => Some(Self::Real),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Real => "real",
            Self::String => "string",
        }
    }

    /// Size in bytes, per the C ABI this layout is required to match.
    ///
    /// Assumes an LP64 host: 4-byte `int`, 8-byte `double`, 8-byte pointer.
    pub const fn size(self) -> usize {
        match self {
            Self::Bool => 1,
            Self::Int => 4,
            Self::Real => 8,
            Self::String => 8,
        }
    }

    /// Alignment in bytes. Equal to size for every built-in atom.
    pub const fn align(self) -> usize {
        self.size()
    }
}

impl Display for AtomKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
