// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors raised while registering, parsing, serializing, and operating on
//! composite values.

use composite_types::TypeError;
use thiserror::Error;

/// A hint attached to a [CompositeError] suggesting how a caller might fix it.
///
/// Purely advisory: nothing in this crate branches on a hint's value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ErrorHint {
    #[default]
    None,
    /// Suggests the text value is missing required delimiters.
    CheckDelimiters,
    /// Suggests a field or element name/index was misspelled or out of range.
    CheckFieldOrIndex,
    /// Suggests the type name itself is not registered.
    CheckTypeName,
    /// Suggests an array literal mixes positional and explicit indexing.
    CheckUniformIndexing,
}

/// Extra human-readable context accompanying a [CompositeError].
///
/// Roughly mirrors the `detail`/`hint` split the original host's diagnostic
/// reporting function takes alongside its primary message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub detail: Option<String>,
    pub hint: ErrorHint,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            hint: ErrorHint::None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_hint(mut self, hint: ErrorHint) -> Self {
        self.hint = hint;
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

/// The error type for every fallible operation in this crate.
///
/// Each variant corresponds to one of the closed set of error kinds a
/// composite value operation can raise.
#[derive(Debug, Error)]
pub enum CompositeError {
    /// The textual value did not match the composite value grammar.
    #[error("malformed composite value: {0}")]
    SyntaxError(Diagnostic),

    /// A field or type name referenced in a value, path, or signature does
    /// not resolve (unknown record field, unknown type reference, or an
    /// unrecognized selector on a dynamic array).
    #[error("no such name: {0}")]
    NameError(Diagnostic),

    /// An array index referenced in a path or literal was out of bounds.
    #[error("index out of range: {0}")]
    BoundsError(Diagnostic),

    /// An array literal's shape was invalid: mixed positional/explicit
    /// indexing, or a malformed extended dynamic-array form (duplicate,
    /// unknown, or missing `size`/`data` field).
    #[error("malformed array shape: {0}")]
    ShapeError(Diagnostic),

    /// An atom value (`bool`/`int`/`real`/`string`) could not be parsed by
    /// the host.
    #[error("invalid scalar value: {0}")]
    AtomError(Diagnostic),

    /// The registry rejected a mutation (e.g. redefining an existing type).
    #[error("registry error: {0}")]
    RegistryError(#[from] TypeError),
}

pub type Result<T, E = CompositeError> = std::result::Result<T, E>;
