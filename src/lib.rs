//! Merges independently defined GraphQL schemas into one executable schema
//! and delegates field resolution back to whichever schema owns each field.
//!
//! The pipeline is four stages, each its own module: [`recorder`] normalizes
//! raw contributions into a [`types::SchemaInventory`] per contribution,
//! [`merge`] folds those into one [`types::MergedSchema`], [`link`] binds
//! operator-supplied resolvers onto whatever the merge left unresolved, and
//! [`delegate`] is the primitive a host's execution engine calls to actually
//! satisfy a field. [`document`] holds the pure AST rewrite passes
//! [`delegate`] uses to synthesize standalone upstream operations.
//!
//! The crate does not execute GraphQL itself — it has no parser-to-response
//! pipeline of its own — and ships no transport. A host supplies both by
//! implementing [`delegate::LocalExecutor`] and [`delegate::Fetcher`].

pub mod config;
pub mod delegate;
pub mod document;
pub mod error;
pub mod link;
pub mod merge;
pub mod recorder;
pub mod types;
pub mod value;

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::info;

pub use crate::delegate::{Delegator, Fetcher, LocalExecutor, ResolveInfo, UpstreamSchema};
pub use crate::document::VariableUsage;
pub use crate::error::{ErrorPath, Result, StitchError};
pub use crate::link::{LinkResolver, LinkResolverContext, RequiredPath, ResolverInput, ResolverSpec};
pub use crate::merge::ConflictResolution;
pub use crate::recorder::SchemaContribution;
pub use crate::types::{FieldResolution, MergedSchema, MergedType, Origin, SchemaId};
pub use crate::value::{ByteString, Map, Value, Variables};

use crate::link::LinkBinder;
use crate::merge::{ConflictFn, Merger};
use crate::recorder::Recorder;
use crate::types::SchemaInventory;

/// Everything [`merge_schemas`] needs beyond the raw schema contributions:
/// the tie-break callback for type-name collisions, the link resolvers to
/// bind, and the execution seam for each contributed schema.
pub struct MergeSchemasOptions<'a> {
    pub contributions: Vec<SchemaContribution>,
    pub resolvers: Vec<ResolverInput>,
    pub upstreams: IndexMap<SchemaId, UpstreamSchema>,
    /// Tie-break for type-name collisions (spec §4.2). `None` keeps
    /// whichever contribution was recorded first.
    pub on_conflict: Option<&'a ConflictFn<'a>>,
}

/// The output of a successful merge: the merged schema plus a delegator
/// bound to the upstream schemas it was built from.
pub struct Stitched {
    pub schema: Arc<MergedSchema>,
    pub delegator: Delegator,
}

/// Runs the full stitching pipeline (spec §2): record each contribution,
/// fold them into one merged schema, apply deferred `extend` declarations,
/// bind link resolvers, and hand back a [`Delegator`] ready to execute
/// fields against it.
pub fn merge_schemas(options: MergeSchemasOptions<'_>) -> Result<Stitched> {
    let MergeSchemasOptions {
        contributions,
        resolvers,
        upstreams,
        on_conflict,
    } = options;

    let inventories: Vec<SchemaInventory> = Recorder::record(&contributions)?;
    let mut merged = Merger::merge(inventories, on_conflict)?;
    LinkBinder::bind(&mut merged, resolvers)?;

    info!(
        type_count = merged.types.len(),
        schema_count = upstreams.len(),
        "schema stitching complete"
    );

    let schema = Arc::new(merged);
    let delegator = Delegator::new(schema.clone(), upstreams);

    Ok(Stitched { schema, delegator })
}
