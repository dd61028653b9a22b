//! Delegation Engine (spec §4.4, §9): turns one field resolution into a
//! standalone operation against the schema that owns it, or — for nested
//! fields whose data already arrived as part of an enclosing delegation —
//! a plain read out of the parent object.
//!
//! The host engine and the wire format used to actually reach a remote
//! schema are out of scope (spec Non-goals); this module only defines the
//! two seams a host plugs into, [`LocalExecutor`] and [`Fetcher`], and the
//! primitive, [`Delegator::delegate`], that drives them.

use std::sync::Arc;

use apollo_compiler::ast;
use apollo_compiler::{Name, Node};
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::document::{self, VariableUsage};
use crate::error::{Result, StitchError};
use crate::link::LinkResolverContext;
use crate::types::{FieldResolution, MergedSchema, SchemaId};
use crate::value::{Value, Variables};

/// Executes a synthesized operation against a schema the host runs
/// in-process — no transport involved.
#[async_trait]
pub trait LocalExecutor: Send + Sync {
    async fn execute(&self, document: &ast::Document, variables: Variables) -> Result<Value>;
}

/// Executes a synthesized operation against a schema reached over whatever
/// transport the host uses (HTTP, gRPC, an in-memory channel to another
/// process — the crate does not care).
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, document: &ast::Document, variables: Variables) -> Result<Value>;
}

/// One upstream schema's execution seam, as supplied by the host when it
/// calls [`crate::merge_schemas`].
pub enum UpstreamSchema {
    Local(Arc<dyn LocalExecutor>),
    Remote(Arc<dyn Fetcher>),
}

/// The context a resolver (link or built-in) sees for the field it is
/// asked to resolve: where it sits in the response, and the selection the
/// caller asked for underneath it.
pub struct ResolveInfo<'a> {
    pub operation_type: ast::OperationType,
    pub parent_type: &'a Name,
    pub field_name: &'a Name,
    pub alias: Option<&'a Name>,
    pub path: &'a [String],
    pub selection: &'a [ast::Selection],
    pub variable_definitions: &'a IndexMap<Name, Node<ast::VariableDefinition>>,
    pub variable_values: &'a Variables,
}

/// Binds a [`MergedSchema`] to the concrete upstream schemas it was merged
/// from, and exposes the primitive the crate's execution layer uses to
/// satisfy a field (spec §4.4 "Merged Info Object").
pub struct Delegator {
    schema: Arc<MergedSchema>,
    upstreams: IndexMap<SchemaId, UpstreamSchema>,
}

impl Delegator {
    pub fn new(schema: Arc<MergedSchema>, upstreams: IndexMap<SchemaId, UpstreamSchema>) -> Self {
        Self { schema, upstreams }
    }

    pub fn schema(&self) -> &MergedSchema {
        &self.schema
    }

    /// The delegation primitive (spec §4.4): synthesizes a standalone
    /// operation for `target_root_field` on `target_schema` and runs it.
    /// Returns just the value the field itself resolved to, not the
    /// enclosing `{ "data": ... }` envelope.
    pub async fn delegate(
        &self,
        target_schema: SchemaId,
        operation_type: ast::OperationType,
        target_root_field: &Name,
        alias: Option<Name>,
        args: IndexMap<Name, (ast::Type, Value)>,
        nested_selection: Vec<ast::Selection>,
        passthrough: VariableUsage,
    ) -> Result<Value> {
        let upstream = self.upstreams.get(&target_schema).ok_or_else(|| {
            StitchError::DelegationTargetMissing {
                target_schema: target_schema.to_string(),
                operation_type: format!("{operation_type:?}"),
                field_name: target_root_field.to_string(),
            }
        })?;

        for (arg_name, (ty, value)) in &args {
            check_argument_coercion(arg_name, ty, value)?;
        }

        let (document, variables) = document::rewrite_operation(
            operation_type,
            target_root_field,
            alias.clone(),
            &args,
            nested_selection,
            passthrough,
        );

        trace!(%target_schema, field = %target_root_field, "delegating");
        let response = match upstream {
            UpstreamSchema::Local(executor) => executor.execute(&document, variables).await?,
            UpstreamSchema::Remote(fetcher) => fetcher.fetch(&document, variables).await?,
        };

        let key = crate::value::response_key(
            alias.as_ref().map(|n| n.as_str()),
            target_root_field.as_str(),
        );
        Ok(match response {
            Value::Object(mut map) => map.remove(&key).unwrap_or(Value::Null),
            other => other,
        })
    }

    /// Resolves one field given its already-computed arguments and its
    /// parent object, dispatching on the merged schema's
    /// [`FieldResolution`] for it (spec §3, §4.4). This is the function the
    /// host's execution loop calls for every field; it is where the
    /// passthrough-vs-fresh-delegation distinction for
    /// [`FieldResolution::UpstreamDelegated`] is made.
    pub async fn resolve_field(
        &self,
        parent: &Value,
        info: &ResolveInfo<'_>,
        args: IndexMap<Name, (ast::Type, Value)>,
    ) -> Result<Value> {
        let resolution = self
            .schema
            .field_resolution(info.parent_type.as_str(), info.field_name.as_str())
            .ok_or_else(|| StitchError::missing_link_resolver(info.parent_type, info.field_name))?
            .clone();

        let response_key = crate::value::response_key(
            info.alias.map(|n| n.as_str()),
            info.field_name.as_str(),
        );

        match resolution {
            FieldResolution::PassthroughScalar | FieldResolution::EnumIdentity => {
                Ok(read_key(parent, &response_key))
            }
            FieldResolution::UnionTypeResolver(schema_id) | FieldResolution::UpstreamDelegated(schema_id) => {
                if let Value::Object(map) = parent {
                    if let Some(existing) = map.get(&response_key) {
                        trace!(field = %info.field_name, "nested field satisfied from parent response");
                        return Ok(existing.clone());
                    }
                }

                debug!(field = %info.field_name, %schema_id, "no pre-fetched value, delegating fresh");
                // Prune/rewrite against the field's own return type `R`, not
                // the field itself (spec §4.4 step 1): a root field and its
                // return type are rarely named alike (`property` returns
                // `Property`), and for a nested field it is what lets
                // `drop_link_fields` recognize an abstract return type and
                // apply the possible-types tie-break.
                let return_type = self
                    .schema
                    .field_return_type_name(info.parent_type.as_str(), info.field_name.as_str())
                    .cloned()
                    .unwrap_or_else(|| info.field_name.clone());
                let selection = document::drop_link_fields(info.selection, &return_type, &self.schema);
                let passthrough = document::project_variables(
                    &selection,
                    info.variable_definitions,
                    info.variable_values,
                );
                self.delegate(
                    schema_id,
                    info.operation_type,
                    info.field_name,
                    info.alias.cloned(),
                    args,
                    selection,
                    passthrough,
                )
                .await
                .map_err(|err| err.with_path_prefix(info.path))
            }
            FieldResolution::LinkResolver(spec) => {
                let scoped_parent = project_required_paths(parent, &spec.required_paths);
                let link_args: IndexMap<Name, Value> =
                    args.into_iter().map(|(name, (_, value))| (name, value)).collect();
                let ctx = LinkResolverContext {
                    args: &link_args,
                    parent: &scoped_parent,
                    delegate: self,
                };
                spec.resolver
                    .resolve(ctx)
                    .await
                    .map_err(|err| err.with_path_prefix(info.path))
            }
            FieldResolution::Unbound => Err(StitchError::missing_link_resolver(
                info.parent_type,
                info.field_name,
            )),
        }
    }
}

/// Rejects a `null` argument value against a non-null upstream argument type
/// before it is ever minted into a variable (spec §4.4 "variable coercion
/// failure"; spec §7 `VariableCoercionError`). Coercion beyond nullability
/// — scalar parsing, input-object shape — is the host engine's job (spec §1
/// Out of scope): the argument arrives already as a concrete `Value` the
/// host itself produced, so this check only guards the one failure mode
/// that is this crate's own doing: it, not the host, picks which of `T`'s
/// declared argument types the synthesized variable gets.
fn check_argument_coercion(arg_name: &Name, ty: &ast::Type, value: &Value) -> Result<()> {
    if ty.is_non_null() && matches!(value, Value::Null) {
        return Err(StitchError::VariableCoercion {
            variable_name: arg_name.to_string(),
            expected_type: ty.to_string(),
        });
    }
    Ok(())
}

fn read_key(parent: &Value, key: &crate::value::ByteString) -> Value {
    match parent {
        Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Scopes a parent object down to just the paths a link resolver declared
/// it needs (spec §4.3).
fn project_required_paths(parent: &Value, required_paths: &[Vec<Name>]) -> Value {
    if required_paths.is_empty() {
        return parent.clone();
    }

    let Value::Object(source) = parent else {
        return parent.clone();
    };

    let mut scoped = crate::value::Map::new();
    for path in required_paths {
        copy_path(source, &mut scoped, path);
    }
    Value::Object(scoped)
}

fn copy_path(source: &crate::value::Map<crate::value::ByteString, Value>, dest: &mut crate::value::Map<crate::value::ByteString, Value>, path: &[Name]) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let key = crate::value::ByteString::from(head.as_str());
    let Some(value) = source.get(&key) else {
        return;
    };

    if rest.is_empty() {
        dest.insert(key, value.clone());
        return;
    }

    let Value::Object(nested_source) = value else {
        return;
    };
    let mut nested_dest = match dest.get(&key) {
        Some(Value::Object(existing)) => existing.clone(),
        _ => crate::value::Map::new(),
    };
    copy_path(nested_source, &mut nested_dest, rest);
    dest.insert(key, Value::Object(nested_dest));
}
