//! Link Resolver Binder (spec §4.3): attaches operator-supplied resolvers to
//! fields the Type Merger left as [`FieldResolution::Unbound`] (fields that
//! only ever appeared via an `extend type` declaration), and to fields an
//! operator wants to override despite having an upstream origin.

use std::sync::Arc;

use apollo_compiler::ast::{self, Definition, Selection};
use apollo_compiler::Name;
use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::delegate::Delegator;
use crate::error::{Result, StitchError};
use crate::types::{FieldResolution, MergedField, MergedSchema};
use crate::value::Value;

/// One field's path from a link resolver's parent object, e.g. `property.id`
/// for a two-level `fragment _ on Booking { property { id } }` annotation.
pub type RequiredPath = Vec<Name>;

/// The arguments, already-resolved parent data, and delegation primitive a
/// link resolver receives. `delegate` is what a resolve function uses to
/// reach a second upstream schema itself — spec §3's Resolver Spec requires
/// every resolve function be able to "return either a plain value or the
/// result of a `delegate` call"; a resolver with no way to obtain `delegate`
/// could never satisfy that contract.
pub struct LinkResolverContext<'a> {
    pub args: &'a IndexMap<Name, Value>,
    /// The parent object's resolved fields, scoped down to exactly the
    /// `required_paths` the resolver declared (spec §4.3).
    pub parent: &'a Value,
    /// The delegation primitive, bound to the same merged schema and
    /// upstreams the field currently being resolved was reached through.
    pub delegate: &'a Delegator,
}

/// A resolver an operator supplies to fill in a field the merged schema has
/// no upstream origin for (or to override one that does).
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, ctx: LinkResolverContext<'_>) -> Result<Value>;
}

/// A resolver plus the metadata the binder derived from its fragment
/// annotation. Stored behind `Arc` because [`FieldResolution::LinkResolver`]
/// is cloned freely while walking the merged type arena.
pub struct ResolverSpec {
    pub type_name: Name,
    pub field_name: Name,
    pub required_paths: Vec<RequiredPath>,
    pub resolver: Arc<dyn LinkResolver>,
}

impl std::fmt::Debug for ResolverSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverSpec")
            .field("type_name", &self.type_name)
            .field("field_name", &self.field_name)
            .field("required_paths", &self.required_paths)
            .finish_non_exhaustive()
    }
}

/// One resolver submission, as given to [`LinkBinder::bind`].
pub struct ResolverInput {
    pub type_name: Name,
    pub field_name: Name,
    /// A standalone `fragment _ on ParentType { ... }` declaring which
    /// parent fields the resolver reads (spec §4.3). `None` means the
    /// resolver reads no parent data beyond its own arguments.
    pub fragment: Option<String>,
    pub resolver: Arc<dyn LinkResolver>,
}

pub struct LinkBinder;

impl LinkBinder {
    /// Binds every submitted resolver onto the merged schema in place.
    /// Fails fast on the first resolver that targets a nonexistent
    /// type/field or carries an unparsable fragment (spec §7
    /// `InvalidLinkResolver`).
    pub fn bind(schema: &mut MergedSchema, resolvers: Vec<ResolverInput>) -> Result<()> {
        for input in resolvers {
            Self::bind_one(schema, input)?;
        }
        Self::check_unbound(schema)
    }

    fn bind_one(schema: &mut MergedSchema, input: ResolverInput) -> Result<()> {
        let ResolverInput {
            type_name,
            field_name,
            fragment,
            resolver,
        } = input;

        if schema.get(type_name.as_str()).is_none() {
            return Err(StitchError::InvalidLinkResolver {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                message: "no such type in the merged schema".to_string(),
            });
        }

        let required_paths = match &fragment {
            Some(src) => parse_required_paths(src).map_err(|message| StitchError::InvalidLinkResolver {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                message,
            })?,
            None => Vec::new(),
        };

        let spec = Arc::new(ResolverSpec {
            type_name: type_name.clone(),
            field_name: field_name.clone(),
            required_paths,
            resolver,
        });

        let ty = schema
            .types
            .get_mut(type_name.as_str())
            .expect("presence checked above");

        if !ty.fields.contains_key(field_name.as_str()) {
            return Err(StitchError::InvalidLinkResolver {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
                message: "no such field on this type".to_string(),
            });
        }

        debug!(%type_name, %field_name, "binding link resolver");
        ty.fields.insert(
            field_name,
            MergedField {
                resolution: FieldResolution::LinkResolver(spec),
            },
        );

        Ok(())
    }

    /// Every field left [`FieldResolution::Unbound`] after binding is a
    /// configuration error: it was added by an `extend` with no resolver to
    /// back it (spec §4.2, §7).
    fn check_unbound(schema: &MergedSchema) -> Result<()> {
        for (type_name, ty) in &schema.types {
            for (field_name, field) in &ty.fields {
                if matches!(field.resolution, FieldResolution::Unbound) {
                    warn!(%type_name, %field_name, "field has no upstream origin and no bound resolver");
                    return Err(StitchError::missing_link_resolver(type_name, field_name));
                }
            }
        }
        Ok(())
    }
}

/// Parses a fragment annotation into the nested field paths it reads,
/// without validating it against a schema — fragment annotations are a
/// lightweight dependency declaration, not an executable selection (spec
/// §4.3).
fn parse_required_paths(fragment_src: &str) -> std::result::Result<Vec<RequiredPath>, String> {
    let doc = ast::Document::parse(fragment_src, "resolver_fragment.graphql")
        .map_err(|err| format!("fragment annotation failed to parse: {err}"))?;

    let definition = doc
        .definitions
        .iter()
        .find_map(|def| match def {
            Definition::FragmentDefinition(frag) => Some(frag),
            _ => None,
        })
        .ok_or_else(|| "fragment annotation must contain a fragment definition".to_string())?;

    let mut paths = Vec::new();
    let mut prefix = Vec::new();
    collect_paths(&definition.selection_set, &mut prefix, &mut paths)?;
    Ok(paths)
}

fn collect_paths(
    selections: &[Selection],
    prefix: &mut Vec<Name>,
    out: &mut Vec<RequiredPath>,
) -> std::result::Result<(), String> {
    for selection in selections {
        match selection {
            Selection::Field(field) => {
                if field.name == "__typename" {
                    continue;
                }
                prefix.push(field.name.clone());
                if field.selection_set.is_empty() {
                    out.push(prefix.clone());
                } else {
                    collect_paths(&field.selection_set, prefix, out)?;
                }
                prefix.pop();
            }
            Selection::InlineFragment(inline) => {
                collect_paths(&inline.selection_set, prefix, out)?;
            }
            Selection::FragmentSpread(spread) => {
                return Err(format!(
                    "fragment annotation spreads `{}`, which it does not itself define",
                    spread.fragment_name
                ));
            }
        }
    }
    Ok(())
}
