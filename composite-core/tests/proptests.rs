// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use composite_core::host::DefaultHost;
use composite_core::registry::TypeRegistry;
use composite_core::{layout, ops, parser, serializer};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;

fn node_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry
        .define_type("node", "int id; bool active; real weight; string label")
        .unwrap();
    Arc::new(registry)
}

/// Builds a named-field literal. Only needs to guarantee syntactic validity,
/// so it escapes conservatively rather than reusing the crate's own (private)
/// escaping path.
fn node_literal(id: i32, active: bool, weight: f64, label: &str) -> String {
    format!(
        "{{id: {id}, active: {active}, weight: {weight}, label: '{}'}}",
        label.replace('\'', "''")
    )
}

proptest! {
    #[test]
    fn parse_serialize_round_trip_preserves_value(
        id in any::<i32>(),
        active in any::<bool>(),
        weight in -1e6f64..1e6f64,
        label in "[a-zA-Z0-9 ]{0,16}",
    ) {
        let registry = node_registry();
        let type_expr = layout::parse_type_expr("node").unwrap();
        let text = node_literal(id, active, weight, &label);

        let value =
            parser::parse_composite(&text, &type_expr, &registry, &DefaultHost, None).unwrap();
        let serialized =
            serializer::serialize(&value, serializer::Mode::Serialize, &DefaultHost).unwrap();
        let reparsed =
            parser::parse_composite(&serialized, &type_expr, &registry, &DefaultHost, None)
                .unwrap();

        prop_assert_eq!(ops::compare(&value, &reparsed).unwrap(), Ordering::Equal);
    }

    #[test]
    fn clone_then_patch_never_mutates_the_source(
        id in any::<i32>(),
        new_id in any::<i32>(),
        label in "[a-zA-Z0-9 ]{0,16}",
    ) {
        let registry = node_registry();
        let type_expr = layout::parse_type_expr("node").unwrap();
        let text = node_literal(id, true, 1.0, &label);

        let original =
            parser::parse_composite(&text, &type_expr, &registry, &DefaultHost, None).unwrap();
        let cloned = ops::clone(&original);

        let patched = parser::parse_composite(
            &format!("id={new_id};"),
            &type_expr,
            &registry,
            &DefaultHost,
            Some(&cloned),
        )
        .unwrap();

        let original_id = ops::nested_field_ptr(&original, "id").unwrap();
        prop_assert_eq!(composite_core::value::read_i32(original_id.bytes, 0), id);

        let patched_id = ops::nested_field_ptr(&patched, "id").unwrap();
        prop_assert_eq!(composite_core::value::read_i32(patched_id.bytes, 0), new_id);
    }
}
