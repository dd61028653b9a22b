//! Shared data model: the schema inventory, the merged type arena, and the
//! resolution-strategy table that drives the delegation engine.

use std::fmt;
use std::sync::Arc;

use apollo_compiler::ast::OperationType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use indexmap::IndexMap;

use crate::link::ResolverSpec;

/// Identifies one contributing (upstream) schema by the order in which it was
/// passed to [`crate::merge_schemas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub usize);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema#{}", self.0)
    }
}

/// Where a type or field's execution originates.
///
/// Invariant (spec §3): a type's origin determines where its fields execute
/// unless a [`crate::link`] resolver override exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Owned by one of the contributed schemas.
    Schema(SchemaId),
    /// Introduced by `extend type ...` SDL with no owning schema; requires a
    /// link resolver before it is usable (spec §4.2).
    Synthetic,
    /// A built-in scalar, introspection type, or directive definition,
    /// recorded once and exempt from conflict detection (spec §4.1).
    Shared,
}

/// One recorded type, prior to merging, along with the schema it came from.
#[derive(Debug, Clone)]
pub struct SchemaInventoryEntry {
    pub name: Name,
    pub definition: ExtendedType,
    pub origin: Origin,
}

/// The normalized output of the [`crate::recorder::Recorder`]: every named
/// type seen in one contribution, plus any `extend` declarations deferred
/// for the [`crate::merge::Merger`] to apply.
#[derive(Debug, Default)]
pub struct SchemaInventory {
    pub types: IndexMap<Name, SchemaInventoryEntry>,
    pub deferred_extensions: Vec<PendingExtension>,
    pub query_type: Option<Name>,
    pub mutation_type: Option<Name>,
}

/// A deferred `extend type Foo { ... }` declaration, applied once all
/// contributions have been folded into the merged type map (spec §4.1, §4.2).
#[derive(Debug, Clone)]
pub struct PendingExtension {
    pub target: Name,
    pub contribution_index: usize,
    pub extension: ExtendedType,
}

/// How a field on the merged schema resolves at runtime. Exactly one of
/// these applies to every object/interface field (spec §3 invariant).
#[derive(Debug, Clone)]
pub enum FieldResolution {
    /// Resolved by delegating to the named upstream schema. For a root
    /// (`Query`/`Mutation`) field this always triggers a fresh delegation;
    /// for a nested field it is satisfied for free whenever the parent
    /// object already carries the value (because it arrived as part of an
    /// enclosing delegation's response) and otherwise falls back to a fresh
    /// delegation. See [`crate::delegate::Delegator::resolve_field`].
    UpstreamDelegated(SchemaId),
    /// Resolved by an operator-supplied link resolver.
    LinkResolver(Arc<ResolverSpec>),
    /// A field whose return type is a scalar: the value is forwarded as-is.
    PassthroughScalar,
    /// A field whose return type is an enum: the value is forwarded as-is.
    EnumIdentity,
    /// A field whose return type is a union or interface: data is still
    /// fetched from `origin`, but concrete-type resolution for the returned
    /// object defers to that schema's own `resolveType` (spec §4.4).
    UnionTypeResolver(SchemaId),
    /// Added only by an `extend` declaration and not yet bound to a
    /// resolver. Resolving this field is an error (spec §4.2, §7).
    Unbound,
}

/// One field's declaration on the merged schema, paired with how it resolves.
#[derive(Debug, Clone)]
pub struct MergedField {
    pub resolution: FieldResolution,
}

/// One type's winning definition in the merged schema, plus the bookkeeping
/// the Type Merger needs: the origin of the winning definition, and, for
/// conflicted type names, the origin that lost (so a query whose path still
/// targets that original schema keeps routing correctly, per spec §4.2).
#[derive(Debug, Clone)]
pub struct MergedType {
    pub definition: ExtendedType,
    pub origin: Origin,
    pub shadowed_origins: Vec<Origin>,
    pub fields: IndexMap<Name, MergedField>,
}

/// The frozen result of the Type Merger: a name-indexed arena. Types refer
/// to each other by name; cyclic references (Booking.property.bookings...)
/// need no special handling because nothing here is resolved recursively by
/// value (spec §9).
#[derive(Debug, Default)]
pub struct MergedSchema {
    pub types: IndexMap<Name, MergedType>,
    pub query_type: Option<Name>,
    pub mutation_type: Option<Name>,
}

impl MergedSchema {
    pub fn get(&self, name: &str) -> Option<&MergedType> {
        self.types.get(name)
    }

    pub fn field_resolution(&self, type_name: &str, field_name: &str) -> Option<&FieldResolution> {
        self.types
            .get(type_name)
            .and_then(|ty| ty.fields.get(field_name))
            .map(|f| &f.resolution)
    }

    /// The declared return type name of one object/interface field, used to
    /// scope the [`crate::document`] rewrite passes to the field's own
    /// return type `R` rather than the field itself (spec §4.4 step 1).
    pub fn field_return_type_name(&self, type_name: &str, field_name: &str) -> Option<&Name> {
        match &self.types.get(type_name)?.definition {
            ExtendedType::Object(obj) => Some(obj.fields.get(field_name)?.ty.inner_named_type()),
            ExtendedType::Interface(iface) => Some(iface.fields.get(field_name)?.ty.inner_named_type()),
            _ => None,
        }
    }

    pub fn query_type_name(&self) -> Option<&Name> {
        self.query_type.as_ref()
    }

    pub fn mutation_type_name(&self) -> Option<&Name> {
        self.mutation_type.as_ref()
    }

    pub fn root_type_name(&self, operation_type: OperationType) -> Option<&Name> {
        match operation_type {
            OperationType::Query => self.query_type_name(),
            OperationType::Mutation => self.mutation_type_name(),
            OperationType::Subscription => None,
        }
    }
}
