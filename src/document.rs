//! Pure AST rewrite passes (spec §4.4; design note in §9): translating an
//! incoming field into a standalone upstream operation is a pipeline of
//! small, independently testable functions over `apollo_compiler::ast` node
//! values. None of them mutate a node in place — each takes a selection and
//! returns a new one — so the pipeline can be reasoned about (and tested)
//! one pass at a time instead of as one large recursive rewrite.

use std::collections::HashSet;

use apollo_compiler::ast::{self, Selection};
use apollo_compiler::executable;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::{Name, Node};
use indexmap::IndexMap;

use crate::link::RequiredPath;
use crate::types::{FieldResolution, MergedSchema, MergedType};
use crate::value::{Value as JsonValue, Variables};

/// Converts one bound, validated selection from the incoming operation into
/// the unvalidated shape used to synthesize the outgoing document. Fragment
/// spreads are preserved as spreads; see [`inline_required_fragments`].
pub fn to_ast_selection(selection: &executable::Selection) -> ast::Selection {
    match selection {
        executable::Selection::Field(field) => ast::Selection::Field(Node::new(ast::Field {
            alias: field.alias.clone(),
            name: field.name.clone(),
            arguments: field.arguments.clone(),
            directives: field.directives.clone(),
            selection_set: field
                .selection_set
                .selections
                .iter()
                .map(to_ast_selection)
                .collect(),
        })),
        executable::Selection::FragmentSpread(spread) => {
            ast::Selection::FragmentSpread(Node::new(ast::FragmentSpread {
                fragment_name: spread.fragment_name.clone(),
                directives: spread.directives.clone(),
            }))
        }
        executable::Selection::InlineFragment(inline) => {
            ast::Selection::InlineFragment(Node::new(ast::InlineFragment {
                type_condition: inline.type_condition.clone(),
                directives: inline.directives.clone(),
                selection_set: inline
                    .selection_set
                    .selections
                    .iter()
                    .map(to_ast_selection)
                    .collect(),
            }))
        }
    }
}

pub fn to_ast_fragment(fragment: &executable::Fragment) -> ast::FragmentDefinition {
    ast::FragmentDefinition {
        name: fragment.name.clone(),
        type_condition: fragment.selection_set.ty.clone(),
        directives: fragment.directives.clone(),
        selection_set: fragment
            .selection_set
            .selections
            .iter()
            .map(to_ast_selection)
            .collect(),
    }
}

/// Transitively collects the names of every fragment a selection set spreads
/// in, directly or through another spread it reaches.
pub fn collect_fragments(
    selections: &[ast::Selection],
    available: &IndexMap<Name, Node<ast::FragmentDefinition>>,
    out: &mut HashSet<Name>,
) {
    for selection in selections {
        match selection {
            Selection::FragmentSpread(spread) => {
                if out.insert(spread.fragment_name.clone()) {
                    if let Some(frag) = available.get(&spread.fragment_name) {
                        collect_fragments(&frag.selection_set, available, out);
                    }
                }
            }
            Selection::InlineFragment(inline) => {
                collect_fragments(&inline.selection_set, available, out);
            }
            Selection::Field(field) => {
                collect_fragments(&field.selection_set, available, out);
            }
        }
    }
}

/// Replaces every fragment spread with the spread fragment's own selections,
/// recursively, so the outgoing document is self-contained and the upstream
/// schema never needs to resolve a fragment name it never declared.
pub fn inline_required_fragments(
    selections: &[ast::Selection],
    available: &IndexMap<Name, Node<ast::FragmentDefinition>>,
) -> Vec<ast::Selection> {
    selections
        .iter()
        .flat_map(|selection| match selection {
            Selection::FragmentSpread(spread) => match available.get(&spread.fragment_name) {
                Some(frag) => inline_required_fragments(&frag.selection_set, available),
                None => Vec::new(),
            },
            Selection::InlineFragment(inline) => {
                vec![Selection::InlineFragment(Node::new(ast::InlineFragment {
                    type_condition: inline.type_condition.clone(),
                    directives: inline.directives.clone(),
                    selection_set: inline_required_fragments(&inline.selection_set, available),
                }))]
            }
            Selection::Field(field) => {
                vec![Selection::Field(Node::new(ast::Field {
                    alias: field.alias.clone(),
                    name: field.name.clone(),
                    arguments: field.arguments.clone(),
                    directives: field.directives.clone(),
                    selection_set: inline_required_fragments(&field.selection_set, available),
                }))]
            }
        })
        .collect()
}

/// Drops fields the merged schema resolves with a [`FieldResolution::LinkResolver`]
/// from a selection bound for delegation: a link field's value is spliced in
/// locally after delegation returns, so asking the upstream schema for it
/// would either fail or fetch data nobody will use (spec §4.4). Every
/// dropped link field's fragment annotation is then merged back into this
/// same selection scope, so the parent the link resolver receives still
/// carries the projections it declared it needs, whether or not the client
/// itself asked for them (spec §4.4 step 3, §9 "fragment-on-parent link
/// contract").
pub fn drop_link_fields(
    selections: &[ast::Selection],
    parent_type: &Name,
    schema: &MergedSchema,
) -> Vec<ast::Selection> {
    let Some(merged_type) = schema.get(parent_type.as_str()) else {
        return selections.to_vec();
    };

    // A union carries no fields of its own: every selection underneath it is
    // either `__typename` or an inline fragment on one of its members. Only
    // the possible-type tie-break applies here; recurse into each surviving
    // fragment using its own concrete type condition (spec §4.4 "tie-break
    // for abstract types").
    if matches!(merged_type.definition, ExtendedType::Union(_)) {
        return retain_possible_types(selections, parent_type, schema)
            .into_iter()
            .map(|selection| match selection {
                Selection::InlineFragment(inline) => {
                    let condition = inline.type_condition.clone().unwrap_or_else(|| parent_type.clone());
                    Selection::InlineFragment(Node::new(ast::InlineFragment {
                        type_condition: inline.type_condition.clone(),
                        directives: inline.directives.clone(),
                        selection_set: drop_link_fields(&inline.selection_set, &condition, schema),
                    }))
                }
                other => other,
            })
            .collect();
    }

    // Interfaces carry their own fields *and* may be queried through inline
    // fragments on a concrete implementing type the owning schema doesn't
    // know about (spec §4.4 "abstract-type tie-break"); apply the same
    // filter before walking the field-based path below.
    let owned_selections;
    let selections = if matches!(merged_type.definition, ExtendedType::Interface(_)) {
        owned_selections = retain_possible_types(selections, parent_type, schema);
        owned_selections.as_slice()
    } else {
        selections
    };

    let mut retained = Vec::new();
    let mut required_paths: Vec<RequiredPath> = Vec::new();

    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if field.name == "__typename" {
                    retained.push(selection.clone());
                    continue;
                }
                let resolution = merged_type.fields.get(field.name.as_str()).map(|f| &f.resolution);
                if let Some(FieldResolution::LinkResolver(spec)) = resolution {
                    required_paths.extend(spec.required_paths.iter().cloned());
                    continue;
                }
                let pruned_children = match child_type_name(&field.name, merged_type, schema) {
                    Some(child_type) => drop_link_fields(&field.selection_set, &child_type, schema),
                    None => field.selection_set.clone(),
                };
                retained.push(Selection::Field(Node::new(ast::Field {
                    alias: field.alias.clone(),
                    name: field.name.clone(),
                    arguments: field.arguments.clone(),
                    directives: field.directives.clone(),
                    selection_set: pruned_children,
                })));
            }
            Selection::InlineFragment(inline) => {
                let condition = inline.type_condition.clone().unwrap_or_else(|| parent_type.clone());
                retained.push(Selection::InlineFragment(Node::new(ast::InlineFragment {
                    type_condition: inline.type_condition.clone(),
                    directives: inline.directives.clone(),
                    selection_set: drop_link_fields(&inline.selection_set, &condition, schema),
                })));
            }
            Selection::FragmentSpread(_) => retained.push(selection.clone()),
        }
    }

    for path in &required_paths {
        merge_required_path(&mut retained, path);
    }

    retained
}

/// Ensures `path` (a link resolver's fragment annotation, reduced to a
/// sequence of field names) is present in `selections`, reusing an already-
/// retained field of the same name at each level rather than duplicating it.
fn merge_required_path(selections: &mut Vec<ast::Selection>, path: &[Name]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };

    for selection in selections.iter_mut() {
        if let Selection::Field(field) = selection {
            if field.name == *head {
                if !rest.is_empty() {
                    merge_required_path(&mut field.make_mut().selection_set, rest);
                }
                return;
            }
        }
    }

    let mut selection_set = Vec::new();
    if !rest.is_empty() {
        merge_required_path(&mut selection_set, rest);
    }
    selections.push(Selection::Field(Node::new(ast::Field {
        alias: None,
        name: head.clone(),
        arguments: Vec::new(),
        directives: ast::DirectiveList::default(),
        selection_set,
    })));
}

fn child_type_name(field_name: &Name, parent: &MergedType, schema: &MergedSchema) -> Option<Name> {
    let inner = match &parent.definition {
        ExtendedType::Object(obj) => obj.fields.get(field_name)?.ty.inner_named_type().clone(),
        ExtendedType::Interface(iface) => iface.fields.get(field_name)?.ty.inner_named_type().clone(),
        _ => return None,
    };
    schema.get(inner.as_str()).map(|_| inner)
}

/// Drops inline fragments whose type condition is not actually a possible
/// type of `abstract_type` in the merged schema — the upstream schema may
/// know nothing about concrete types other contributions added to a shared
/// union or interface (spec §4.4 "abstract-type tie-break").
pub fn retain_possible_types(
    selections: &[ast::Selection],
    abstract_type: &Name,
    schema: &MergedSchema,
) -> Vec<ast::Selection> {
    let possible = possible_types(abstract_type, schema);
    selections
        .iter()
        .filter(|selection| match selection {
            Selection::InlineFragment(inline) => match &inline.type_condition {
                Some(condition) => condition == abstract_type || possible.contains(condition),
                None => true,
            },
            _ => true,
        })
        .cloned()
        .collect()
}

fn possible_types(abstract_type: &Name, schema: &MergedSchema) -> HashSet<Name> {
    match schema.get(abstract_type.as_str()).map(|t| &t.definition) {
        Some(ExtendedType::Union(union_ty)) => {
            union_ty.members.iter().map(|member| member.name.clone()).collect()
        }
        Some(ExtendedType::Interface(_)) => schema
            .types
            .iter()
            .filter_map(|(name, ty)| match &ty.definition {
                ExtendedType::Object(obj)
                    if obj
                        .implements_interfaces
                        .iter()
                        .any(|iface| iface.as_str() == abstract_type.as_str()) =>
                {
                    Some(name.clone())
                }
                _ => None,
            })
            .collect(),
        _ => HashSet::new(),
    }
}

/// Injects `__typename` when a pruning pass leaves a selection set empty —
/// every GraphQL field needs at least one sub-selection once it carries an
/// object/interface/union return type.
pub fn ensure_nonempty_selection(selections: Vec<ast::Selection>) -> Vec<ast::Selection> {
    if selections.is_empty() {
        vec![Selection::Field(Node::new(ast::Field {
            alias: None,
            name: Name::new("__typename").expect("`__typename` is a valid GraphQL name"),
            arguments: Vec::new(),
            directives: ast::DirectiveList::default(),
            selection_set: Vec::new(),
        }))]
    } else {
        selections
    }
}

/// Variable definitions and values a rewritten operation needs beyond the
/// fresh ones [`rewrite_operation`] mints for the delegated field's own
/// arguments — i.e. variables the caller's *nested* selections still
/// reference.
#[derive(Default)]
pub struct VariableUsage {
    pub definitions: Vec<Node<ast::VariableDefinition>>,
    pub values: Variables,
}

/// Projects down to just the variables a selection set actually references,
/// out of everything the caller's original operation declared (spec §4.4
/// "project variables").
pub fn project_variables(
    selections: &[ast::Selection],
    original_definitions: &IndexMap<Name, Node<ast::VariableDefinition>>,
    original_values: &Variables,
) -> VariableUsage {
    let mut used = HashSet::new();
    collect_variable_refs(selections, &mut used);

    let mut definitions = Vec::new();
    let mut values = Variables::new();
    for name in used {
        if let Some(def) = original_definitions.get(&name) {
            definitions.push(def.clone());
        }
        if let Some(value) = original_values.get(name.as_str()) {
            values.insert(name.to_string(), value.clone());
        }
    }

    VariableUsage { definitions, values }
}

fn collect_variable_refs(selections: &[ast::Selection], out: &mut HashSet<Name>) {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                for argument in &field.arguments {
                    collect_value_variable_refs(&argument.value, out);
                }
                collect_variable_refs(&field.selection_set, out);
            }
            Selection::InlineFragment(inline) => collect_variable_refs(&inline.selection_set, out),
            Selection::FragmentSpread(_) => {}
        }
    }
}

fn collect_value_variable_refs(value: &ast::Value, out: &mut HashSet<Name>) {
    match value {
        ast::Value::Variable(name) => {
            out.insert(name.clone());
        }
        ast::Value::List(items) => items.iter().for_each(|item| collect_value_variable_refs(item, out)),
        ast::Value::Object(fields) => fields
            .iter()
            .for_each(|(_, value)| collect_value_variable_refs(value, out)),
        _ => {}
    }
}

/// Assembles the final standalone operation document for one delegated
/// field: `args` becomes a set of fresh `$__stitch_argN` variables (spec
/// §4.4 "args become fresh variables"), `nested_selection` is the
/// already-pruned, already-inlined selection the field should be asked for,
/// and `passthrough` carries any variables that selection still references
/// from the caller's own operation.
pub fn rewrite_operation(
    operation_type: ast::OperationType,
    target_root_field: &Name,
    alias: Option<Name>,
    args: &IndexMap<Name, (ast::Type, JsonValue)>,
    nested_selection: Vec<ast::Selection>,
    passthrough: VariableUsage,
) -> (ast::Document, Variables) {
    let mut variable_defs = passthrough.definitions;
    let mut variable_values = passthrough.values;
    let mut field_arguments = Vec::new();

    for (index, (arg_name, (ty, value))) in args.iter().enumerate() {
        let fresh = Name::new(format!("__stitch_arg{index}"))
            .expect("synthetic variable names are always valid GraphQL names");
        variable_defs.push(Node::new(ast::VariableDefinition {
            name: fresh.clone(),
            ty: ty.clone(),
            default_value: None,
            directives: ast::DirectiveList::default(),
        }));
        variable_values.insert(fresh.to_string(), value.clone());
        field_arguments.push(Node::new(ast::Argument {
            name: arg_name.clone(),
            value: Node::new(ast::Value::Variable(fresh)),
        }));
    }

    let outer_field = ast::Field {
        alias,
        name: target_root_field.clone(),
        arguments: field_arguments,
        directives: ast::DirectiveList::default(),
        selection_set: ensure_nonempty_selection(nested_selection),
    };

    let operation = ast::OperationDefinition {
        operation_type,
        name: None,
        variables: variable_defs,
        directives: ast::DirectiveList::default(),
        selection_set: vec![Selection::Field(Node::new(outer_field))],
    };

    let mut document = ast::Document::new();
    document
        .definitions
        .push(ast::Definition::OperationDefinition(Node::new(operation)));

    (document, variable_values)
}
