// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use composite_core::host::DefaultHost;
use composite_core::registry::TypeRegistry;
use composite_core::{layout, ops, parser, serializer};
use std::cmp::Ordering;
use std::sync::Arc;

fn cluster_registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry
        .define_type("node", "string name; int state")
        .unwrap();
    registry
        .define_type("cluster", "string name; int size; node[10] nodes")
        .unwrap();
    Arc::new(registry)
}

// Scenario 1: a full-value literal names every field, in any order, by name.
#[test]
fn full_value_literal_addresses_fields_by_name() {
    let registry = cluster_registry();
    let type_expr = layout::parse_type_expr("node").unwrap();
    let value = parser::parse_composite(
        "{state: 1, name: 'alpha'}",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    let name = ops::nested_field_ptr(&value, "name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(name.bytes, 0)),
        Some("alpha")
    );
    let state = ops::nested_field_ptr(&value, "state").unwrap();
    assert_eq!(composite_core::value::read_i32(state.bytes, 0), 1);
}

// Scenario 2: an assignment-list patch updates individual array elements'
// fields, leaving every untouched field and element exactly as it was.
#[test]
fn patch_list_updates_array_element_fields_in_order() {
    let registry = cluster_registry();
    let type_expr = layout::parse_type_expr("cluster").unwrap();
    let base = parser::parse_composite(
        "{name: 'west', size: 2, nodes: [{name: 'a', state: 1}, {name: 'b', state: 2}]}",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    let patched = parser::parse_composite(
        "nodes[0]->state=9;nodes[1]->name='renamed';",
        &type_expr,
        &registry,
        &DefaultHost,
        Some(&base),
    )
    .unwrap();

    let state0 = ops::nested_field_ptr(&patched, "nodes[0]->state").unwrap();
    assert_eq!(composite_core::value::read_i32(state0.bytes, 0), 9);

    let name0 = ops::nested_field_ptr(&patched, "nodes[0]->name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(name0.bytes, 0)),
        Some("a")
    );

    let name1 = ops::nested_field_ptr(&patched, "nodes[1]->name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(name1.bytes, 0)),
        Some("renamed")
    );

    let cluster_name = ops::nested_field_ptr(&patched, "name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(cluster_name.bytes, 0)),
        Some("west")
    );
}

// Scenario 3: the extended `{size, data}` dynamic-array form carries over
// whatever element an untouched index already held.
#[test]
fn extended_dynamic_array_form_carries_over_untouched_elements() {
    let registry = Arc::new(TypeRegistry::new());
    let type_expr = layout::parse_type_expr("int[]").unwrap();

    let prev =
        parser::parse_composite("[10, 20, 30]", &type_expr, &registry, &DefaultHost, None)
            .unwrap();
    let patched = parser::parse_composite(
        "{size: 4, data: [1:99]}",
        &type_expr,
        &registry,
        &DefaultHost,
        Some(&prev),
    )
    .unwrap();

    assert_eq!(
        composite_core::value::read_i32(ops::nested_field_ptr(&patched, "[0]").unwrap().bytes, 0),
        10
    );
    assert_eq!(
        composite_core::value::read_i32(ops::nested_field_ptr(&patched, "[1]").unwrap().bytes, 0),
        99
    );
    assert_eq!(
        composite_core::value::read_i32(ops::nested_field_ptr(&patched, "[2]").unwrap().bytes, 0),
        30
    );
    assert_eq!(
        composite_core::value::read_i32(ops::nested_field_ptr(&patched, "[3]").unwrap().bytes, 0),
        0
    );
}

// Scenario 4: the short `[...]` form grows a dynamic array to cover its
// highest explicit index, zeroing any gap.
#[test]
fn short_form_grows_array_and_zeroes_gaps() {
    let registry = Arc::new(TypeRegistry::new());
    let type_expr = layout::parse_type_expr("string[]").unwrap();

    let value = parser::parse_composite(
        "[0:'first', 3:'fourth']",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    let size = ops::nested_field_ptr(&value, "size").unwrap();
    assert_eq!(composite_core::value::read_i32(size.bytes, 0), 4);

    let gap = ops::nested_field_ptr(&value, "[1]").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(gap.bytes, 0)),
        None
    );
}

// Scenario 5: mixing positional and explicit indices in one array literal is
// a shape error, not a silent reinterpretation.
#[test]
fn mixed_indexing_in_one_array_literal_is_a_shape_error() {
    let registry = Arc::new(TypeRegistry::new());
    let type_expr = layout::parse_type_expr("int[]").unwrap();

    let err = parser::parse_composite("[0:1, 2]", &type_expr, &registry, &DefaultHost, None)
        .unwrap_err();
    assert!(matches!(err, composite_core::CompositeError::ShapeError(_)));
}

// Scenario 6: a dynamic array at or above the expand threshold serializes in
// the expanded form, and that form is re-parseable by the parser.
#[test]
fn expand_threshold_boundary_round_trips() {
    let mut registry = TypeRegistry::new();
    registry.expand_array_view_threshold = 16;
    let registry = Arc::new(registry);

    let type_expr = layout::parse_type_expr("int[]").unwrap();
    let value =
        parser::parse_composite("[1, 2, 3, 4, 5]", &type_expr, &registry, &DefaultHost, None)
            .unwrap();

    let text = serializer::serialize(&value, serializer::Mode::Serialize, &DefaultHost).unwrap();
    assert_eq!(text, "{size: 5, data: [1, 2, 3, 4, 5]}");

    let reparsed =
        parser::parse_composite(&text, &type_expr, &registry, &DefaultHost, None).unwrap();
    assert_eq!(ops::compare(&value, &reparsed).unwrap(), Ordering::Equal);

    let display_text =
        serializer::serialize(&value, serializer::Mode::Display, &DefaultHost).unwrap();
    assert_eq!(display_text, "[1, 2, 3, 4, 5]");
}

#[test]
fn nil_and_quoted_nil_are_distinct_string_values() {
    let registry = Arc::new(TypeRegistry::new());
    let type_expr = layout::parse_type_expr("string").unwrap();

    let null_value =
        parser::parse_composite("nil", &type_expr, &registry, &DefaultHost, None).unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(null_value.bytes(), 0)),
        None
    );

    let literal_value =
        parser::parse_composite("'nil'", &type_expr, &registry, &DefaultHost, None).unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(literal_value.bytes(), 0)),
        Some("nil")
    );
}

#[test]
fn clone_is_independent_of_source() {
    let registry = cluster_registry();
    let type_expr = layout::parse_type_expr("node").unwrap();
    let original = parser::parse_composite(
        "{name: 'alpha', state: 1}",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    let mut cloned = ops::clone(&original);
    let patched = parser::parse_composite(
        "name='beta';",
        &type_expr,
        &registry,
        &DefaultHost,
        Some(&cloned),
    )
    .unwrap();
    cloned = patched;

    let original_name = ops::nested_field_ptr(&original, "name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(original_name.bytes, 0)),
        Some("alpha")
    );

    let cloned_name = ops::nested_field_ptr(&cloned, "name").unwrap();
    assert_eq!(
        ops::read_string(composite_core::value::read_ptr(cloned_name.bytes, 0)),
        Some("beta")
    );

    assert_eq!(ops::compare(&original, &cloned).unwrap(), Ordering::Less);
}

#[test]
fn unknown_record_field_path_is_a_name_error() {
    let registry = cluster_registry();
    let type_expr = layout::parse_type_expr("node").unwrap();
    let value = parser::parse_composite(
        "{name: 'alpha', state: 1}",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    assert!(matches!(
        ops::nested_field_ptr(&value, "nonexistent"),
        Err(composite_core::CompositeError::NameError(_))
    ));
}

#[test]
fn index_out_of_range_is_a_bounds_error() {
    let registry = cluster_registry();
    let type_expr = layout::parse_type_expr("cluster").unwrap();
    let value = parser::parse_composite(
        "{name: 'west', size: 0, nodes: []}",
        &type_expr,
        &registry,
        &DefaultHost,
        None,
    )
    .unwrap();

    assert!(matches!(
        ops::nested_field_ptr(&value, "nodes[10]->name"),
        Err(composite_core::CompositeError::BoundsError(_))
    ));
}
