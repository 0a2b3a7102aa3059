// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The process-wide registry of composite record types and the composite
//! configuration variables backed by them.
//!
//! The registry is monotonic: types are added during an initialization
//! phase and never replaced or removed afterward. This models the
//! original's `guc_types_hashtab` HTAB without exposing a shared mutable
//! global to the rest of the program (callers own their [TypeRegistry] and
//! pass it, or an [std::sync::Arc] of it, through explicitly).

use crate::error::CompositeError;
use crate::layout::{layout_record, parse_type_expr, TypeResolver};
use bitflags::bitflags;
use composite_types::{RecordDescriptor, RecordField, TypeError};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

bitflags! {
    /// Context and behavior flags for a registered configuration variable.
    ///
    /// The registry does not interpret these; it only stores them for the
    /// host to read back when deciding how a variable may be set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VariableFlags: u32 {
        /// Variable can only be changed on server restart.
        const SIGHUP = 1 << 0;
        /// Variable can only be changed by a superuser-equivalent role.
        const SUSET = 1 << 1;
        /// Variable is excluded from configuration dumps/samples.
        const NOT_IN_SAMPLE = 1 << 2;
    }
}

/// A registered configuration variable: a name, documentation, the
/// composite type backing its value, and the host-owned bookkeeping the
/// registry stores but never dereferences.
#[derive(Clone, Debug)]
pub struct VariableDescriptor {
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub type_name: String,
    /// Opaque address of the host's storage slot for this variable's
    /// current value. The registry never dereferences this: the host's
    /// memory layout and lifetime are out of scope here.
    pub slot: usize,
    /// Opaque address of the host's storage slot for this variable's boot
    /// (default) value.
    pub boot: usize,
    pub context: String,
    pub flags: VariableFlags,
}

/// The process-local registry of composite record types and variables.
///
/// Build one with [TypeRegistry::new], call [TypeRegistry::define_type] and
/// [TypeRegistry::define_variable] during startup, then treat it as
/// read-only and share it (typically behind an [Arc]) with every consumer.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<String, Arc<RecordDescriptor>>,
    variables: HashMap<String, Arc<VariableDescriptor>>,
    /// Values at or above this serialized byte length use the expanded
    /// `{size: N, data: [...]}` serialization form. Named after the
    /// original's `expand_array_view_thd` GUC.
    pub expand_array_view_threshold: usize,
}

impl TypeResolver for TypeRegistry {
    fn resolve_record(&self, name: &str) -> Option<Arc<RecordDescriptor>> {
        self.records.get(name).cloned()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            variables: HashMap::new(),
            expand_array_view_threshold: 64,
        }
    }

    /// Register a new record type.
    ///
    /// `signature` is a `;`-separated list of `"type_expr field_name"`
    /// declarations, e.g. `"int x; int y; string label"`. Every referenced
    /// type must already be registered (including `name` itself referenced
    /// recursively, which is never allowed: see Non-goals).
    pub fn define_type(&mut self, name: &str, signature: &str) -> Result<(), CompositeError> {
        if self.records.contains_key(name) {
            warn!("rejected redefinition of composite type \"{name}\"");
            return Err(TypeError::Redefinition {
                type_name: name.to_string(),
            }
            .into());
        }

        let mut fields = Vec::new();
        let mut exprs = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for declaration in signature.split(';') {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                continue;
            }

            let mut parts = declaration.split_whitespace();
            let type_expr = parts.next();
            let field_name = parts.next();
            if parts.next().is_some() || type_expr.is_none() || field_name.is_none() {
                return Err(TypeError::BadFieldDeclaration {
                    type_name: name.to_string(),
                    declaration: declaration.to_string(),
                }
                .into());
            }
            let type_expr = type_expr.unwrap().to_string();
            let field_name = field_name.unwrap().to_string();

            if !seen.insert(field_name.clone()) {
                return Err(TypeError::DuplicateField {
                    type_name: name.to_string(),
                    field: field_name,
                }
                .into());
            }

            exprs.push(parse_type_expr(&type_expr).map_err(|_| TypeError::UnknownType {
                reference: type_expr.clone(),
            })?);
            fields.push((type_expr, field_name));
        }

        if fields.is_empty() {
            return Err(TypeError::EmptySignature {
                type_name: name.to_string(),
            }
            .into());
        }

        let (offsets, size, align) = layout_record(&exprs, &*self).map_err(|_| {
            // One of the referenced field types isn't registered; report it
            // by name rather than surfacing the layout engine's own error.
            let unresolved = fields
                .iter()
                .zip(exprs.iter())
                .find(|(_, expr)| {
                    crate::layout::element_size_align(&expr.element, &*self).is_err()
                })
                .map(|((type_expr, _), _)| type_expr.clone())
                .unwrap_or_else(|| name.to_string());

            TypeError::UnknownType {
                reference: unresolved,
            }
        })?;

        let record_fields = fields
            .into_iter()
            .zip(offsets)
            .map(|((type_expr, field_name), offset)| RecordField {
                name: field_name,
                type_expr,
                offset,
            })
            .collect();

        let descriptor = RecordDescriptor {
            name: name.to_string(),
            signature: signature.to_string(),
            fields: record_fields,
            size,
            align,
        };

        debug!("registered composite type \"{name}\" (size={size}, align={align})");
        self.records.insert(name.to_string(), Arc::new(descriptor));
        Ok(())
    }

    /// Look up a registered record type by name.
    pub fn lookup(&self, name: &str) -> Option<&Arc<RecordDescriptor>> {
        self.records.get(name)
    }

    /// Register a configuration variable backed by a composite type.
    ///
    /// `type_name` must already be registered via [Self::define_type].
    #[allow(clippy::too_many_arguments)]
    pub fn define_variable(
        &mut self,
        name: &str,
        short_desc: &str,
        long_desc: &str,
        type_name: &str,
        slot: usize,
        boot: usize,
        context: &str,
        flags: VariableFlags,
    ) -> Result<(), CompositeError> {
        if !self.records.contains_key(type_name) {
            warn!("variable \"{name}\" references unknown type \"{type_name}\"");
            return Err(TypeError::UnknownType {
                reference: type_name.to_string(),
            }
            .into());
        }

        if self.variables.contains_key(name) {
            warn!("rejected redefinition of composite variable \"{name}\"");
            return Err(TypeError::Redefinition {
                type_name: name.to_string(),
            }
            .into());
        }

        debug!("registered composite variable \"{name}\" of type \"{type_name}\"");
        self.variables.insert(
            name.to_string(),
            Arc::new(VariableDescriptor {
                name: name.to_string(),
                short_desc: short_desc.to_string(),
                long_desc: long_desc.to_string(),
                type_name: type_name.to_string(),
                slot,
                boot,
                context: context.to_string(),
                flags,
            }),
        );
        Ok(())
    }

    /// Look up a registered variable by name.
    pub fn lookup_variable(&self, name: &str) -> Option<&Arc<VariableDescriptor>> {
        self.variables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_lookup_simple_record() {
        let mut registry = TypeRegistry::new();
        registry.define_type("node", "int id; string label").unwrap();

        let node = registry.lookup("node").unwrap();
        assert_eq!(node.size, 16);
        assert_eq!(node.field("id").unwrap().offset, 0);
        assert_eq!(node.field("label").unwrap().offset, 8);
    }

    #[test]
    fn rejects_redefinition() {
        let mut registry = TypeRegistry::new();
        registry.define_type("node", "int id").unwrap();
        assert!(registry.define_type("node", "int id").is_err());
    }

    #[test]
    fn rejects_unknown_field_type() {
        let mut registry = TypeRegistry::new();
        assert!(registry.define_type("node", "frobnicate x").is_err());
    }

    #[test]
    fn nested_record_field() {
        let mut registry = TypeRegistry::new();
        registry.define_type("point", "int x; int y").unwrap();
        registry
            .define_type("line", "point start; point end")
            .unwrap();

        let line = registry.lookup("line").unwrap();
        assert_eq!(line.field("start").unwrap().offset, 0);
        assert_eq!(line.field("end").unwrap().offset, 8);
        assert_eq!(line.size, 16);
    }

    #[test]
    fn define_variable_requires_registered_type() {
        let mut registry = TypeRegistry::new();
        registry.define_type("node", "int id").unwrap();
        registry
            .define_variable(
                "my.node",
                "short",
                "long",
                "node",
                0,
                0,
                "postmaster",
                VariableFlags::SIGHUP,
            )
            .unwrap();

        assert!(registry
            .define_variable(
                "my.bad",
                "short",
                "long",
                "missing",
                0,
                0,
                "postmaster",
                VariableFlags::empty(),
            )
            .is_err());
    }
}
