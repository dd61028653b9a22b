//! Type Merger (spec §4.2): folds schema inventories, in input order, into
//! one [`MergedSchema`], invoking a tie-break callback on name collisions
//! and then applying deferred `extend` declarations.

use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{Result, StitchError};
use crate::types::{
    FieldResolution, MergedField, MergedSchema, MergedType, Origin, PendingExtension,
    SchemaInventory, SchemaInventoryEntry,
};

/// The tie-break callback's verdict for one type-name collision (spec §4.2).
pub enum ConflictResolution {
    /// Keep the definition already in the merged map.
    KeepExisting,
    /// Replace it with the newly encountered definition.
    TakeIncoming,
    /// Use an operator-constructed definition equivalent to neither input
    /// verbatim (spec §9 Open Question: "treat as operator-defined").
    Merged(SchemaInventoryEntry),
}

/// `on_conflict(existing, incoming) -> ConflictResolution`. A missing
/// callback is treated as "keep existing" (spec §4.2).
pub type ConflictFn<'a> = dyn Fn(&SchemaInventoryEntry, &SchemaInventoryEntry) -> ConflictResolution + 'a;

pub struct Merger;

impl Merger {
    pub fn merge(
        inventories: Vec<SchemaInventory>,
        on_conflict: Option<&ConflictFn>,
    ) -> Result<MergedSchema> {
        let mut winners: IndexMap<Name, SchemaInventoryEntry> = IndexMap::new();
        let mut shadowed: IndexMap<Name, Vec<Origin>> = IndexMap::new();
        let mut deferred: Vec<PendingExtension> = Vec::new();
        let mut query_type = None;
        let mut mutation_type = None;

        // A root operation type (`Query`/`Mutation`) is not one contribution's
        // type colliding with another's — it is every contribution's entry
        // point into the merged schema, and composing disjoint sub-queries is
        // the whole point of stitching (spec §8 "Composition of disjoint
        // sub-queries"). Collect every name any contribution designates as a
        // root before folding, so the fold below can give those names an
        // additive field union instead of routing them through the
        // single-winner `on_conflict` path.
        let mut root_names: std::collections::HashSet<Name> = std::collections::HashSet::new();
        for inventory in &inventories {
            if let Some(name) = &inventory.query_type {
                root_names.insert(name.clone());
            }
            if let Some(name) = &inventory.mutation_type {
                root_names.insert(name.clone());
            }
        }
        let mut root_field_origins: IndexMap<Name, IndexMap<Name, Origin>> = IndexMap::new();

        for inventory in inventories {
            if query_type.is_none() {
                query_type = inventory.query_type.clone();
            }
            if mutation_type.is_none() {
                mutation_type = inventory.mutation_type.clone();
            }
            deferred.extend(inventory.deferred_extensions);

            for (name, entry) in inventory.types {
                if root_names.contains(&name) {
                    merge_root_type(&mut winners, &mut root_field_origins, name, entry);
                    continue;
                }

                match winners.entry(name.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                    Entry::Occupied(mut slot) => {
                        if matches!(slot.get().origin, Origin::Shared)
                            && matches!(entry.origin, Origin::Shared)
                        {
                            // Built-ins/introspection types are recorded once and never conflict.
                            continue;
                        }

                        let resolution = match on_conflict {
                            Some(cb) => cb(slot.get(), &entry),
                            None => ConflictResolution::KeepExisting,
                        };

                        match resolution {
                            ConflictResolution::KeepExisting => {
                                shadowed.entry(name).or_default().push(entry.origin);
                            }
                            ConflictResolution::TakeIncoming => {
                                let loser = slot.get().origin.clone();
                                shadowed.entry(name).or_default().push(loser);
                                slot.insert(entry);
                            }
                            ConflictResolution::Merged(merged) => {
                                shadowed
                                    .entry(name)
                                    .or_default()
                                    .extend([slot.get().origin.clone(), entry.origin.clone()]);
                                slot.insert(merged);
                            }
                        }
                    }
                }
            }
        }

        let mut extension_added_fields: IndexMap<Name, Vec<Name>> = IndexMap::new();
        for pending in deferred {
            let PendingExtension {
                target,
                contribution_index,
                extension,
            } = pending;

            let Some(entry) = winners.get_mut(&target) else {
                return Err(StitchError::DanglingExtension {
                    target: target.to_string(),
                    contribution_index,
                });
            };

            let added = apply_extension(&mut entry.definition, extension);
            extension_added_fields
                .entry(target)
                .or_default()
                .extend(added);
        }

        // First pass: record, per object/interface field, which schema (if any)
        // it came from and what its declared return type is named.
        struct PendingField {
            origin: Origin,
            return_type: Name,
        }
        let mut pending_fields: IndexMap<Name, IndexMap<Name, PendingField>> = IndexMap::new();
        let mut merged_types: IndexMap<Name, MergedType> = IndexMap::new();

        for (name, entry) in &winners {
            let added_here = extension_added_fields
                .get(name)
                .cloned()
                .unwrap_or_default();

            let field_defs: Vec<(Name, Name)> = match &entry.definition {
                ExtendedType::Object(obj) => obj
                    .fields
                    .iter()
                    .map(|(fname, fdef)| (fname.clone(), fdef.ty.inner_named_type().clone()))
                    .collect(),
                ExtendedType::Interface(iface) => iface
                    .fields
                    .iter()
                    .map(|(fname, fdef)| (fname.clone(), fdef.ty.inner_named_type().clone()))
                    .collect(),
                _ => Vec::new(),
            };

            let field_origins = root_field_origins.get(name);
            let mut fields = IndexMap::new();
            for (fname, return_type) in field_defs {
                let origin = if added_here.contains(&fname) {
                    Origin::Synthetic
                } else if let Some(origin) = field_origins.and_then(|origins| origins.get(&fname)) {
                    // A root type's fields each keep the origin of whichever
                    // contribution actually declared them, not the one shared
                    // origin an ordinary type's fields all inherit.
                    origin.clone()
                } else {
                    entry.origin.clone()
                };
                fields.insert(fname, PendingField { origin, return_type });
            }
            pending_fields.insert(name.clone(), fields);

            merged_types.insert(
                name.clone(),
                MergedType {
                    definition: entry.definition.clone(),
                    origin: entry.origin.clone(),
                    shadowed_origins: shadowed.get(name).cloned().unwrap_or_default(),
                    fields: IndexMap::new(),
                },
            );
        }

        // Second pass: now that every type is in the arena, resolve each
        // field's strategy by inspecting its return type's kind.
        for (type_name, fields) in pending_fields {
            let mut resolved = IndexMap::new();
            for (field_name, pending) in fields {
                let resolution = resolve_field(&pending.origin, &pending.return_type, &merged_types);
                resolved.insert(field_name, MergedField { resolution });
            }
            if let Some(ty) = merged_types.get_mut(&type_name) {
                ty.fields = resolved;
            }
        }

        debug!(type_count = merged_types.len(), "merged schema built");

        Ok(MergedSchema {
            types: merged_types,
            query_type,
            mutation_type,
        })
    }
}

/// Folds one contribution's root operation type into the merged schema
/// additively: every field the contribution declares on `Query`/`Mutation`
/// is unioned into whatever is already there (first declaration of a given
/// field name wins), rather than the whole type losing a single-winner
/// tie-break to an earlier contribution's root type. Also records which
/// schema actually declared each field, since a root type's fields do not
/// all share one origin the way an ordinary type's do.
fn merge_root_type(
    winners: &mut IndexMap<Name, SchemaInventoryEntry>,
    root_field_origins: &mut IndexMap<Name, IndexMap<Name, Origin>>,
    name: Name,
    entry: SchemaInventoryEntry,
) {
    let field_names: Vec<Name> = match &entry.definition {
        ExtendedType::Object(obj) => obj.fields.iter().map(|(fname, _)| fname.clone()).collect(),
        _ => {
            warn!(%name, "root operation type is not an object type, skipping additive merge");
            Vec::new()
        }
    };

    let origins = root_field_origins.entry(name.clone()).or_default();
    for field_name in &field_names {
        origins
            .entry(field_name.clone())
            .or_insert_with(|| entry.origin.clone());
    }

    match winners.entry(name) {
        Entry::Vacant(slot) => {
            slot.insert(entry);
        }
        Entry::Occupied(mut slot) => {
            if let (ExtendedType::Object(existing_obj), ExtendedType::Object(incoming_obj)) =
                (&mut slot.get_mut().definition, &entry.definition)
            {
                let existing_obj = existing_obj.make_mut();
                for (field_name, field_def) in incoming_obj.fields.iter() {
                    existing_obj
                        .fields
                        .entry(field_name.clone())
                        .or_insert_with(|| field_def.clone());
                }
            }
        }
    }
}

fn resolve_field(
    origin: &Origin,
    return_type: &Name,
    types: &IndexMap<Name, MergedType>,
) -> FieldResolution {
    match origin {
        Origin::Synthetic => FieldResolution::Unbound,
        Origin::Shared => FieldResolution::PassthroughScalar,
        Origin::Schema(schema_id) => match types.get(return_type).map(|t| &t.definition) {
            Some(ExtendedType::Union(_)) | Some(ExtendedType::Interface(_)) => {
                FieldResolution::UnionTypeResolver(*schema_id)
            }
            Some(ExtendedType::Enum(_)) => FieldResolution::EnumIdentity,
            Some(ExtendedType::Scalar(_)) | None => FieldResolution::PassthroughScalar,
            Some(ExtendedType::Object(_)) | Some(ExtendedType::InputObject(_)) => {
                FieldResolution::UpstreamDelegated(*schema_id)
            }
        },
    }
}

/// Appends an extension's fields/members/values onto `target` in place,
/// returning the names of any fields it added (so the caller can mark them
/// as having no upstream origin, per spec §4.2). Mismatched-kind extensions
/// (e.g. `extend union` onto an object) are logged and ignored rather than
/// failing the merge — the source spec does not define behavior for this
/// malformed case.
fn apply_extension(target: &mut ExtendedType, extension: ExtendedType) -> Vec<Name> {
    let mut added = Vec::new();
    match (target, extension) {
        (ExtendedType::Object(base), ExtendedType::Object(ext)) => {
            let base = base.make_mut();
            for (name, field) in ext.fields.iter() {
                base.fields.insert(name.clone(), field.clone());
                added.push(name.clone());
            }
            for iface in ext.implements_interfaces.iter() {
                base.implements_interfaces.insert(iface.clone());
            }
        }
        (ExtendedType::Interface(base), ExtendedType::Interface(ext)) => {
            let base = base.make_mut();
            for (name, field) in ext.fields.iter() {
                base.fields.insert(name.clone(), field.clone());
                added.push(name.clone());
            }
            for iface in ext.implements_interfaces.iter() {
                base.implements_interfaces.insert(iface.clone());
            }
        }
        (ExtendedType::Union(base), ExtendedType::Union(ext)) => {
            let base = base.make_mut();
            for member in ext.members.iter() {
                base.members.insert(member.clone());
            }
        }
        (ExtendedType::Enum(base), ExtendedType::Enum(ext)) => {
            let base = base.make_mut();
            for (name, value) in ext.values.iter() {
                base.values.insert(name.clone(), value.clone());
            }
        }
        (ExtendedType::InputObject(base), ExtendedType::InputObject(ext)) => {
            let base = base.make_mut();
            for (name, field) in ext.fields.iter() {
                base.fields.insert(name.clone(), field.clone());
                added.push(name.clone());
            }
        }
        (ExtendedType::Scalar(_), ExtendedType::Scalar(_)) => {}
        (base, _) => {
            warn!(type_name = %base.name(), "extension kind does not match base type kind, ignoring");
        }
    }
    added
}
