use apollo_compiler::ast;
use apollo_compiler::{Name, Node};
use indexmap::IndexMap;
use schema_stitch::document::{
    collect_fragments, ensure_nonempty_selection, inline_required_fragments, project_variables,
};
use serde_json_bytes::json;

fn name(value: &str) -> Name {
    Name::new(value).unwrap()
}

fn leaf(field_name: &str) -> ast::Selection {
    ast::Selection::Field(Node::new(ast::Field {
        alias: None,
        name: name(field_name),
        arguments: Vec::new(),
        directives: ast::DirectiveList::default(),
        selection_set: Vec::new(),
    }))
}

fn spread(fragment_name: &str) -> ast::Selection {
    ast::Selection::FragmentSpread(Node::new(ast::FragmentSpread {
        fragment_name: name(fragment_name),
        directives: ast::DirectiveList::default(),
    }))
}

fn fragment_def(
    frag_name: &str,
    type_condition: &str,
    selection_set: Vec<ast::Selection>,
) -> Node<ast::FragmentDefinition> {
    Node::new(ast::FragmentDefinition {
        name: name(frag_name),
        type_condition: name(type_condition),
        directives: ast::DirectiveList::default(),
        selection_set,
    })
}

#[test]
fn collect_fragments_follows_spreads_transitively() {
    let mut available = IndexMap::new();
    available.insert(
        name("Inner"),
        fragment_def("Inner", "Property", vec![leaf("city")]),
    );
    available.insert(
        name("Outer"),
        fragment_def("Outer", "Property", vec![leaf("name"), spread("Inner")]),
    );

    let selection = vec![leaf("id"), spread("Outer")];
    let mut out = std::collections::HashSet::new();
    collect_fragments(&selection, &available, &mut out);

    assert_eq!(out.len(), 2);
    assert!(out.contains(&name("Outer")));
    assert!(out.contains(&name("Inner")));
}

#[test]
fn collect_fragments_does_not_loop_forever_on_a_cycle() {
    // `A` spreads `B` and `B` spreads `A` back: a buggy implementation that
    // doesn't track visited names would recurse forever.
    let mut available = IndexMap::new();
    available.insert(name("A"), fragment_def("A", "Property", vec![spread("B")]));
    available.insert(name("B"), fragment_def("B", "Property", vec![spread("A")]));

    let selection = vec![spread("A")];
    let mut out = std::collections::HashSet::new();
    collect_fragments(&selection, &available, &mut out);

    assert_eq!(out.len(), 2);
}

#[test]
fn inline_required_fragments_replaces_spreads_with_their_selections() {
    let mut available = IndexMap::new();
    available.insert(
        name("PropertyFields"),
        fragment_def("PropertyFields", "Property", vec![leaf("name"), leaf("city")]),
    );

    let selection = vec![leaf("id"), spread("PropertyFields")];
    let inlined = inline_required_fragments(&selection, &available);

    let field_names: Vec<&str> = inlined
        .iter()
        .map(|s| match s {
            ast::Selection::Field(f) => f.name.as_str(),
            other => panic!("expected a field selection, got {other:?}"),
        })
        .collect();

    assert_eq!(field_names, vec!["id", "name", "city"]);
}

#[test]
fn inline_required_fragments_recurses_into_nested_inline_fragments() {
    let mut available = IndexMap::new();
    available.insert(
        name("NameOnly"),
        fragment_def("NameOnly", "Property", vec![leaf("name")]),
    );

    let inline = ast::Selection::InlineFragment(Node::new(ast::InlineFragment {
        type_condition: Some(name("Property")),
        directives: ast::DirectiveList::default(),
        selection_set: vec![spread("NameOnly")],
    }));

    let inlined = inline_required_fragments(&[inline], &available);
    assert_eq!(inlined.len(), 1);
    match &inlined[0] {
        ast::Selection::InlineFragment(frag) => {
            let names: Vec<&str> = frag
                .selection_set
                .iter()
                .map(|s| match s {
                    ast::Selection::Field(f) => f.name.as_str(),
                    other => panic!("expected a field, got {other:?}"),
                })
                .collect();
            assert_eq!(names, vec!["name"]);
        }
        other => panic!("expected an inline fragment, got {other:?}"),
    }
}

#[test]
fn ensure_nonempty_selection_injects_typename_only_when_empty() {
    let filled = ensure_nonempty_selection(vec![leaf("id")]);
    assert_eq!(filled.len(), 1);

    let empty = ensure_nonempty_selection(Vec::new());
    match &empty[0] {
        ast::Selection::Field(field) => assert_eq!(field.name.as_str(), "__typename"),
        other => panic!("expected a __typename field, got {other:?}"),
    }
}

#[test]
fn project_variables_keeps_only_referenced_definitions_and_values() {
    let mut definitions = IndexMap::new();
    definitions.insert(
        name("usedVar"),
        Node::new(ast::VariableDefinition {
            name: name("usedVar"),
            ty: ast::Type::Named(name("String")),
            default_value: None,
            directives: ast::DirectiveList::default(),
        }),
    );
    definitions.insert(
        name("unusedVar"),
        Node::new(ast::VariableDefinition {
            name: name("unusedVar"),
            ty: ast::Type::Named(name("String")),
            default_value: None,
            directives: ast::DirectiveList::default(),
        }),
    );

    let mut values = schema_stitch::Variables::new();
    values.insert("usedVar".to_string(), json!("hi"));
    values.insert("unusedVar".to_string(), json!("bye"));

    let field_with_arg = ast::Selection::Field(Node::new(ast::Field {
        alias: None,
        name: name("city"),
        arguments: vec![Node::new(ast::Argument {
            name: name("lang"),
            value: Node::new(ast::Value::Variable(name("usedVar"))),
        })],
        directives: ast::DirectiveList::default(),
        selection_set: Vec::new(),
    }));

    let usage = project_variables(&[field_with_arg], &definitions, &values);

    assert_eq!(usage.definitions.len(), 1);
    assert_eq!(usage.definitions[0].name.as_str(), "usedVar");
    assert_eq!(usage.values.get("usedVar"), Some(&json!("hi")));
    assert_eq!(usage.values.get("unusedVar"), None);
}
