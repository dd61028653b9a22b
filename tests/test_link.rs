use std::sync::Arc;

use apollo_compiler::Name;
use async_trait::async_trait;
use schema_stitch::merge::Merger;
use schema_stitch::recorder::{Recorder, SchemaContribution};
use schema_stitch::types::FieldResolution;
use schema_stitch::{LinkResolver, LinkResolverContext, ResolverInput, Result, StitchError, Value};

mod harness;

fn name(value: &str) -> Name {
    Name::new(value).unwrap()
}

struct NullResolver;

#[async_trait]
impl LinkResolver for NullResolver {
    async fn resolve(&self, _ctx: LinkResolverContext<'_>) -> Result<Value> {
        Ok(Value::Null)
    }
}

fn merged_with_extensions() -> schema_stitch::types::MergedSchema {
    let contributions = vec![
        SchemaContribution::Sdl(harness::PROPERTY_SCHEMA.to_string()),
        SchemaContribution::Sdl(harness::BOOKING_SCHEMA.to_string()),
        SchemaContribution::Sdl(harness::CUSTOMER_SCHEMA.to_string()),
        SchemaContribution::Sdl(harness::LINK_EXTENSIONS.to_string()),
    ];
    let inventories = Recorder::record(&contributions).unwrap();
    Merger::merge(inventories, None).unwrap()
}

#[test]
fn binds_a_resolver_with_a_fragment_annotation() -> anyhow::Result<()> {
    let mut merged = merged_with_extensions();

    let resolvers = vec![ResolverInput {
        type_name: name("Booking"),
        field_name: name("property"),
        fragment: Some("fragment _ on Booking { propertyId }".to_string()),
        resolver: Arc::new(NullResolver),
    }];

    // Binding only `Booking.property` leaves `Booking.customer` and
    // `Property.bookings` unbound, so this should still fail overall...
    let err = schema_stitch::link::LinkBinder::bind(&mut merged, resolvers).unwrap_err();
    assert!(matches!(err, StitchError::MissingLinkResolver { .. }));

    // ...but the one resolver that *was* submitted bound successfully and
    // parsed its fragment annotation into a required path.
    let field = merged
        .field_resolution("Booking", "property")
        .expect("Booking.property exists");
    match field {
        FieldResolution::LinkResolver(spec) => {
            assert_eq!(spec.required_paths, vec![vec![name("propertyId")]]);
        }
        other => panic!("expected a bound link resolver, got {other:?}"),
    }

    Ok(())
}

#[test]
fn binds_all_extension_fields_successfully() -> anyhow::Result<()> {
    let mut merged = merged_with_extensions();

    let resolvers = vec![
        ResolverInput {
            type_name: name("Booking"),
            field_name: name("property"),
            fragment: Some("fragment _ on Booking { propertyId }".to_string()),
            resolver: Arc::new(NullResolver),
        },
        ResolverInput {
            type_name: name("Booking"),
            field_name: name("customer"),
            fragment: Some("fragment _ on Booking { customerId }".to_string()),
            resolver: Arc::new(NullResolver),
        },
        ResolverInput {
            type_name: name("Property"),
            field_name: name("bookings"),
            fragment: Some("fragment _ on Property { id }".to_string()),
            resolver: Arc::new(NullResolver),
        },
    ];

    schema_stitch::link::LinkBinder::bind(&mut merged, resolvers)?;

    for (type_name, field_name) in [("Booking", "property"), ("Booking", "customer"), ("Property", "bookings")] {
        let field = merged.field_resolution(type_name, field_name).unwrap();
        assert!(matches!(field, FieldResolution::LinkResolver(_)));
    }

    Ok(())
}

#[test]
fn rejects_a_resolver_for_a_nonexistent_type() {
    let mut merged = merged_with_extensions();

    let resolvers = vec![ResolverInput {
        type_name: name("Ghost"),
        field_name: name("field"),
        fragment: None,
        resolver: Arc::new(NullResolver),
    }];

    let err = schema_stitch::link::LinkBinder::bind(&mut merged, resolvers).unwrap_err();
    assert!(matches!(err, StitchError::InvalidLinkResolver { .. }));
}

#[test]
fn rejects_a_resolver_for_a_nonexistent_field() {
    let mut merged = merged_with_extensions();

    let resolvers = vec![ResolverInput {
        type_name: name("Booking"),
        field_name: name("notAField"),
        fragment: None,
        resolver: Arc::new(NullResolver),
    }];

    let err = schema_stitch::link::LinkBinder::bind(&mut merged, resolvers).unwrap_err();
    assert!(matches!(err, StitchError::InvalidLinkResolver { .. }));
}

#[test]
fn rejects_a_fragment_annotation_that_spreads_another_fragment() {
    let mut merged = merged_with_extensions();

    let resolvers = vec![ResolverInput {
        type_name: name("Booking"),
        field_name: name("property"),
        fragment: Some("fragment _ on Booking { ...Other }".to_string()),
        resolver: Arc::new(NullResolver),
    }];

    let err = schema_stitch::link::LinkBinder::bind(&mut merged, resolvers).unwrap_err();
    assert!(matches!(err, StitchError::InvalidLinkResolver { .. }));
}

#[test]
fn a_fully_bound_schema_has_no_unbound_fields() -> anyhow::Result<()> {
    // Schemas with no extensions have nothing left to bind.
    let contributions = vec![
        SchemaContribution::Sdl(harness::PROPERTY_SCHEMA.to_string()),
        SchemaContribution::Sdl(harness::BOOKING_SCHEMA.to_string()),
        SchemaContribution::Sdl(harness::CUSTOMER_SCHEMA.to_string()),
    ];
    let inventories = Recorder::record(&contributions)?;
    let mut merged = Merger::merge(inventories, None)?;

    schema_stitch::link::LinkBinder::bind(&mut merged, Vec::new())?;
    Ok(())
}
