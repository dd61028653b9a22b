//! Demo CLI: stitches a set of SDL files into one schema and prints the
//! merged type arena. Not part of the library's public contract — an
//! illustration of `merge_schemas`, not a host. This crate executes nothing
//! itself, so there is no query to run without a host supplying
//! `LocalExecutor`/`Fetcher` implementations.

use std::fs;
use std::panic::set_hook;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use indexmap::IndexMap;
use schema_stitch::config::StitchConfig;
use schema_stitch::{MergeSchemasOptions, SchemaContribution};
use tracing::{error, info};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
    prelude::*,
};

/// Stitches independently defined GraphQL SDL files into one schema and
/// prints the merged type arena.
#[derive(Debug, Parser)]
#[clap(about, name = "stitch", long_about = None)]
struct Args {
    /// SDL files to stitch together, in merge order. Overrides `schemas`
    /// from `--config` when given.
    schemas: Vec<PathBuf>,
    /// A YAML file deserialized into `StitchConfig`; CLI-supplied `schemas`
    /// still take precedence when both are given.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<StitchConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
        None => Ok(StitchConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(
            EnvFilter::builder()
                .with_default_directive(
                    LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::INFO).into(),
                )
                .from_env_lossy(),
        )
        .try_init()
        .expect("unable to set a global tracing subscriber");

    set_hook(Box::new(|panic| {
        if let Some(loc) = panic.location() {
            error!(
                message=%panic,
                panic.file=loc.file(),
                panic.line=loc.line(),
                panic.column=loc.column()
            );
        } else {
            error!(message=%panic);
        }
    }));

    let schema_paths = if args.schemas.is_empty() { config.schemas } else { args.schemas };
    if schema_paths.is_empty() {
        anyhow::bail!("no schemas given: pass SDL files as arguments or list them under `schemas:` in --config");
    }

    let contributions = schema_paths
        .iter()
        .map(|path| {
            info!(path=%path.display(), "reading schema contribution");
            fs::read_to_string(path).map(SchemaContribution::Sdl)
        })
        .collect::<std::io::Result<Vec<_>>>()?;

    let stitched = schema_stitch::merge_schemas(MergeSchemasOptions {
        contributions,
        resolvers: Vec::new(),
        upstreams: IndexMap::new(),
        on_conflict: None,
    })?;

    info!(type_count = stitched.schema.types.len(), "stitched schema");
    for (name, ty) in &stitched.schema.types {
        println!("{name}  ({} fields, origin {:?})", ty.fields.len(), ty.origin);
        for (field_name, field) in &ty.fields {
            println!("  {field_name}: {:?}", field.resolution);
        }
    }

    Ok(())
}
