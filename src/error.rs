//! Typed errors for every failure kind named in spec §7, in the style of
//! `apollo-federation-internals::error::GraphQLError` and
//! `apollo-subgraph::SubgraphError`: one enum, `thiserror`-derived, carrying
//! enough structure for a host to build a GraphQL response error from it.

use apollo_compiler::Name;
use thiserror::Error;

/// A path segment used when prefixing an upstream error with the caller's
/// field path (spec §4.4, §7).
pub type ErrorPath = Vec<String>;

#[derive(Debug, Error)]
pub enum StitchError {
    /// A type name collision reached `merge_schemas` with no
    /// `on_conflict` guidance and the default "keep existing" policy could
    /// not apply (kept for completeness; spec notes this should not occur
    /// under the default policy).
    #[error("unresolved type conflict for `{type_name}`")]
    MergeConflict { type_name: String },

    /// An SDL contribution failed to parse.
    #[error("contribution #{contribution_index} failed to parse as SDL: {message}")]
    SdlParse {
        contribution_index: usize,
        message: String,
    },

    /// An `extend type Foo` declaration targeted a type no contribution ever
    /// introduced.
    #[error("`extend` at contribution #{contribution_index} targets unknown type `{target}`")]
    DanglingExtension {
        target: String,
        contribution_index: usize,
    },

    /// Execution reached a field that was added only by an `extend`
    /// declaration and has no bound link resolver.
    #[error("field `{type_name}.{field_name}` has no resolver and no upstream origin")]
    MissingLinkResolver { type_name: String, field_name: String },

    /// A link resolver's fragment annotation, or the binder itself,
    /// referenced a type or field absent from the merged schema.
    #[error("link resolver for `{type_name}.{field_name}` is invalid: {message}")]
    InvalidLinkResolver {
        type_name: String,
        field_name: String,
        message: String,
    },

    /// `delegate()` was asked for a root field that does not exist on the
    /// named target operation.
    #[error("`{target_schema}` has no {operation_type} field `{field_name}`")]
    DelegationTargetMissing {
        target_schema: String,
        operation_type: String,
        field_name: String,
    },

    /// An argument could not be coerced to the upstream field's declared
    /// variable type.
    #[error("argument `{variable_name}` cannot be coerced to `{expected_type}`")]
    VariableCoercion {
        variable_name: String,
        expected_type: String,
    },

    /// An error the upstream schema itself reported, threaded back into the
    /// outer execution with the caller's path prepended.
    #[error("upstream error at {}: {message}", path.join("."))]
    UpstreamExecution { path: ErrorPath, message: String },

    /// Catch-all for an upstream/user resolver failure that doesn't fit a
    /// more specific kind above; preserves the original error as `source`.
    #[error("resolver error: {0}")]
    Resolver(#[source] anyhow::Error),
}

impl StitchError {
    pub fn missing_link_resolver(type_name: &Name, field_name: &Name) -> Self {
        Self::MissingLinkResolver {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
        }
    }

    /// Prefixes an upstream error's path with the caller's, per spec §4.4
    /// ("path prefix of the caller preserved").
    pub fn with_path_prefix(self, prefix: &[String]) -> Self {
        match self {
            Self::UpstreamExecution { mut path, message } => {
                let mut full = prefix.to_vec();
                full.append(&mut path);
                Self::UpstreamExecution { path: full, message }
            }
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, StitchError>;
