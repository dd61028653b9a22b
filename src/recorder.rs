//! Schema Recorder (spec §4.1): normalizes heterogeneous schema
//! contributions — already-built executable schemas or SDL strings — into
//! an ordered list of [`SchemaInventory`] values for the [`crate::merge`]
//! step to fold.

use apollo_compiler::ast::{self, Definition};
use apollo_compiler::schema::{
    Component, ComponentOrigin, EnumType, EnumValueDefinition, ExtendedType, InputObjectType,
    InterfaceType, ObjectType, ScalarType, UnionType,
};
use apollo_compiler::validation::Valid;
use apollo_compiler::{Name, Node, Schema};
use tracing::{debug, trace, warn};

use crate::error::{Result, StitchError};
use crate::types::{Origin, PendingExtension, SchemaId, SchemaInventory, SchemaInventoryEntry};

const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// One schema contribution as given to [`crate::merge_schemas`].
pub enum SchemaContribution {
    /// A schema already built and, typically, already executable by the
    /// host engine against its owning upstream.
    Executable(Valid<Schema>),
    /// SDL text, which may contain `extend type ...` declarations. These
    /// extensions are recorded but not applied until the Type Merger runs
    /// (spec §4.1).
    Sdl(String),
}

fn is_shared(name: &str) -> bool {
    name.starts_with("__") || BUILTIN_SCALARS.contains(&name)
}

/// Walks schema contributions in input order, producing one
/// [`SchemaInventory`] per contribution.
pub struct Recorder;

impl Recorder {
    pub fn record(contributions: &[SchemaContribution]) -> Result<Vec<SchemaInventory>> {
        contributions
            .iter()
            .enumerate()
            .map(|(index, contribution)| match contribution {
                SchemaContribution::Executable(schema) => {
                    Ok(Self::record_executable(SchemaId(index), schema))
                }
                SchemaContribution::Sdl(text) => Self::record_sdl(index, text),
            })
            .collect()
    }

    fn record_executable(id: SchemaId, schema: &Valid<Schema>) -> SchemaInventory {
        debug!(%id, "recording executable schema contribution");
        let mut inventory = SchemaInventory {
            query_type: schema.schema_definition.query.as_ref().map(|c| c.name.clone()),
            mutation_type: schema
                .schema_definition
                .mutation
                .as_ref()
                .map(|c| c.name.clone()),
            ..Default::default()
        };

        for (name, definition) in schema.types.iter() {
            let origin = if is_shared(name.as_str()) {
                Origin::Shared
            } else {
                Origin::Schema(id)
            };
            inventory.types.insert(
                name.clone(),
                SchemaInventoryEntry {
                    name: name.clone(),
                    definition: definition.clone(),
                    origin,
                },
            );
        }

        inventory
    }

    fn record_sdl(contribution_index: usize, text: &str) -> Result<SchemaInventory> {
        debug!(contribution_index, "recording SDL contribution");
        let ast = ast::Document::parse(text, format!("contribution_{contribution_index}.graphql"))
            .map_err(|err| StitchError::SdlParse {
                contribution_index,
                message: err.to_string(),
            })?;

        let id = SchemaId(contribution_index);
        let mut inventory = SchemaInventory::default();

        for definition in &ast.definitions {
            match definition {
                Definition::ObjectTypeDefinition(def) => {
                    let ty = ExtendedType::Object(Node::new(ObjectType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        implements_interfaces: def.implements_interfaces.iter().cloned().collect(),
                        directives: component_directives(&def.directives),
                        fields: def
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }
                Definition::InterfaceTypeDefinition(def) => {
                    let ty = ExtendedType::Interface(Node::new(InterfaceType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        implements_interfaces: def.implements_interfaces.iter().cloned().collect(),
                        directives: component_directives(&def.directives),
                        fields: def
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }
                Definition::UnionTypeDefinition(def) => {
                    let ty = ExtendedType::Union(Node::new(UnionType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        directives: component_directives(&def.directives),
                        members: def
                            .members
                            .iter()
                            .map(|m| component_name(m.clone()))
                            .collect(),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }
                Definition::EnumTypeDefinition(def) => {
                    let ty = ExtendedType::Enum(Node::new(EnumType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        directives: component_directives(&def.directives),
                        values: def
                            .values
                            .iter()
                            .map(|v| {
                                (
                                    v.value.clone(),
                                    Component::new(EnumValueDefinition {
                                        description: v.description.clone(),
                                        value: v.value.clone(),
                                        directives: v.directives.clone(),
                                    }),
                                )
                            })
                            .collect(),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }
                Definition::ScalarTypeDefinition(def) => {
                    let ty = ExtendedType::Scalar(Node::new(ScalarType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        directives: component_directives(&def.directives),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }
                Definition::InputObjectTypeDefinition(def) => {
                    let ty = ExtendedType::InputObject(Node::new(InputObjectType {
                        description: def.description.clone(),
                        name: def.name.clone(),
                        directives: component_directives(&def.directives),
                        fields: def
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    insert_owned(&mut inventory, def.name.clone(), ty, id);
                }

                Definition::ObjectTypeExtension(ext) => {
                    let ty = ExtendedType::Object(Node::new(ObjectType {
                        description: None,
                        name: ext.name.clone(),
                        implements_interfaces: ext.implements_interfaces.iter().cloned().collect(),
                        directives: component_directives(&ext.directives),
                        fields: ext
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    defer(&mut inventory, ext.name.clone(), contribution_index, ty);
                }
                Definition::InterfaceTypeExtension(ext) => {
                    let ty = ExtendedType::Interface(Node::new(InterfaceType {
                        description: None,
                        name: ext.name.clone(),
                        implements_interfaces: ext.implements_interfaces.iter().cloned().collect(),
                        directives: component_directives(&ext.directives),
                        fields: ext
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    defer(&mut inventory, ext.name.clone(), contribution_index, ty);
                }
                Definition::UnionTypeExtension(ext) => {
                    let ty = ExtendedType::Union(Node::new(UnionType {
                        description: None,
                        name: ext.name.clone(),
                        directives: component_directives(&ext.directives),
                        members: ext
                            .members
                            .iter()
                            .map(|m| component_name(m.clone()))
                            .collect(),
                    }));
                    defer(&mut inventory, ext.name.clone(), contribution_index, ty);
                }
                Definition::EnumTypeExtension(ext) => {
                    let ty = ExtendedType::Enum(Node::new(EnumType {
                        description: None,
                        name: ext.name.clone(),
                        directives: component_directives(&ext.directives),
                        values: ext
                            .values
                            .iter()
                            .map(|v| {
                                (
                                    v.value.clone(),
                                    Component::new(EnumValueDefinition {
                                        description: v.description.clone(),
                                        value: v.value.clone(),
                                        directives: v.directives.clone(),
                                    }),
                                )
                            })
                            .collect(),
                    }));
                    defer(&mut inventory, ext.name.clone(), contribution_index, ty);
                }
                Definition::InputObjectTypeExtension(ext) => {
                    let ty = ExtendedType::InputObject(Node::new(InputObjectType {
                        description: None,
                        name: ext.name.clone(),
                        directives: component_directives(&ext.directives),
                        fields: ext
                            .fields
                            .iter()
                            .map(|f| (f.name.clone(), Component::new((**f).clone())))
                            .collect(),
                    }));
                    defer(&mut inventory, ext.name.clone(), contribution_index, ty);
                }
                Definition::SchemaDefinition(def) => {
                    for root in &def.root_operations {
                        let (op_type, name) = &**root;
                        match op_type {
                            ast::OperationType::Query => inventory.query_type = Some(name.clone()),
                            ast::OperationType::Mutation => {
                                inventory.mutation_type = Some(name.clone())
                            }
                            ast::OperationType::Subscription => {}
                        }
                    }
                }
                Definition::ScalarTypeExtension(_)
                | Definition::SchemaExtension(_)
                | Definition::DirectiveDefinition(_) => {
                    trace!(contribution_index, "ignoring directive/scalar-extension/schema-extension definition");
                }
                other => {
                    warn!(contribution_index, kind = ?other, "unrecognized SDL definition kind, ignoring");
                }
            }
        }

        // A contribution that never writes an explicit `schema { ... }` block
        // still names its roots by the GraphQL default-root-type convention
        // (an object type literally named `Query`/`Mutation`). `Schema`
        // building for an executable contribution already resolves this for
        // us via `schema_definition`; SDL contributions need it spelled out
        // here so the Type Merger sees a root type name to key its additive
        // field merge on (spec §4.2).
        if inventory.query_type.is_none() && inventory.types.contains_key("Query") {
            inventory.query_type = Some(Name::new("Query").expect("\"Query\" is a valid GraphQL name"));
        }
        if inventory.mutation_type.is_none() && inventory.types.contains_key("Mutation") {
            inventory.mutation_type =
                Some(Name::new("Mutation").expect("\"Mutation\" is a valid GraphQL name"));
        }

        Ok(inventory)
    }
}

/// Records a type this contribution itself defines (as opposed to one it
/// only `extend`s). Built-in scalars and introspection types are shared
/// across every contribution and exempt from conflict detection; anything
/// else belongs to the contributing schema (spec §4.1).
fn insert_owned(inventory: &mut SchemaInventory, name: Name, definition: ExtendedType, id: SchemaId) {
    let origin = if is_shared(name.as_str()) {
        Origin::Shared
    } else {
        Origin::Schema(id)
    };
    inventory.types.insert(
        name.clone(),
        SchemaInventoryEntry {
            name,
            definition,
            origin,
        },
    );
}

fn defer(inventory: &mut SchemaInventory, target: Name, contribution_index: usize, extension: ExtendedType) {
    inventory.deferred_extensions.push(PendingExtension {
        target,
        contribution_index,
        extension,
    });
}

fn component_directives(directives: &ast::DirectiveList) -> apollo_compiler::schema::DirectiveList {
    apollo_compiler::schema::DirectiveList(
        directives
            .iter()
            .map(|d| Component::new((**d).clone()))
            .collect(),
    )
}

fn component_name(name: Name) -> apollo_compiler::schema::ComponentName {
    apollo_compiler::schema::ComponentName {
        origin: ComponentOrigin::Definition,
        name,
    }
}
