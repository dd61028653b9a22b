#![allow(dead_code)]
//! Fixture schemas and an in-memory [`LocalExecutor`] test double used
//! across the integration tests: three small schemas (`property`,
//! `booking`, `customer`) plus an SDL-only "glue" contribution that links
//! them together, mirroring the worked example the merge/link/delegate
//! modules are built around.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use apollo_compiler::ast;
use async_trait::async_trait;
use schema_stitch::{LocalExecutor, Result, Value, Variables};
use serde_json_bytes::{ByteString, Map};

pub const PROPERTY_SCHEMA: &str = r#"
type Property {
  id: ID!
  name: String!
  city: String!
}

type Query {
  property(id: ID!): Property
}
"#;

pub const BOOKING_SCHEMA: &str = r#"
type Booking {
  id: ID!
  propertyId: ID!
  customerId: ID!
  checkIn: String!
}

type Query {
  booking(id: ID!): Booking
  bookingsForProperty(propertyId: ID!): [Booking!]!
}
"#;

pub const CUSTOMER_SCHEMA: &str = r#"
type Customer {
  id: ID!
  name: String!
  email: String!
}

type Query {
  customer(id: ID!): Customer
}
"#;

/// An abstract-type fixture mirroring spec §8 scenario S7: an interface with
/// two implementors and a union return type nested underneath one of them.
pub const CUSTOMER_KIND_SCHEMA: &str = r#"
interface CustomerKind {
  id: ID!
}

type Person implements CustomerKind {
  id: ID!
  name: String!
  vehicle: Vehicle
}

type Organization implements CustomerKind {
  id: ID!
  name: String!
}

union Vehicle = Bike | Car

type Bike {
  bikeType: String!
}

type Car {
  licensePlate: String!
}

type Query {
  customerById(id: ID!): CustomerKind
}
"#;

/// An SDL-only contribution: no upstream owns these fields until link
/// resolvers are bound onto them (spec §4.2).
pub const LINK_EXTENSIONS: &str = r#"
extend type Booking {
  property: Property
  customer: Customer
}

extend type Property {
  bookings: [Booking!]!
}
"#;

/// A [`LocalExecutor`] that answers one root field out of a canned table of
/// records, keyed by `(field name, id argument)`, projecting each canned
/// record through whatever selection the synthesized document asked for —
/// the same selection-driven projection the teacher's own mock response
/// generator does, minus the randomness.
pub struct FixtureExecutor {
    records: HashMap<(&'static str, String), Value>,
}

impl FixtureExecutor {
    pub fn new(records: Vec<(&'static str, &str, Value)>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|(field, id, value)| ((field, id.to_string()), value))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            records: HashMap::new(),
        }
    }
}

#[async_trait]
impl LocalExecutor for FixtureExecutor {
    async fn execute(&self, document: &ast::Document, variables: Variables) -> Result<Value> {
        let operation = document
            .definitions
            .iter()
            .find_map(|definition| match definition {
                ast::Definition::OperationDefinition(op) => Some(op),
                _ => None,
            })
            .ok_or_else(|| schema_stitch::StitchError::Resolver(anyhow!("no operation in document")))?;

        let field = match operation.selection_set.first() {
            Some(ast::Selection::Field(field)) => field,
            _ => {
                return Err(schema_stitch::StitchError::Resolver(anyhow!(
                    "expected a single root field"
                )))
            }
        };

        let id_arg = field
            .arguments
            .iter()
            .find(|argument| argument.name == "id" || argument.name == "propertyId")
            .and_then(|argument| match &*argument.value {
                ast::Value::Variable(name) => variables.get(name.as_str()),
                _ => None,
            })
            .and_then(|value| value.as_str())
            .unwrap_or_default()
            .to_string();

        let record = self
            .records
            .get(&(field.name.as_str(), id_arg))
            .cloned()
            .unwrap_or(Value::Null);

        let projected = project(&field.selection_set, &record);

        let mut data = Map::new();
        let key = schema_stitch::value::response_key(
            field.alias.as_ref().map(|a| a.as_str()),
            field.name.as_str(),
        );
        data.insert(key, projected);
        Ok(Value::Object(data))
    }
}

fn project(selections: &[ast::Selection], source: &Value) -> Value {
    match source {
        Value::Object(map) => {
            let mut out = Map::new();
            project_into(selections, map, &mut out);
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|item| project(selections, item)).collect()),
        other => other.clone(),
    }
}

fn project_into(selections: &[ast::Selection], source: &Map<ByteString, Value>, out: &mut Map<ByteString, Value>) {
    for selection in selections {
        match selection {
            ast::Selection::Field(field) => {
                let source_key = ByteString::from(field.name.as_str());
                let value = source.get(&source_key).cloned().unwrap_or(Value::Null);
                let projected = if field.selection_set.is_empty() {
                    value
                } else {
                    project(&field.selection_set, &value)
                };
                let response_key = schema_stitch::value::response_key(
                    field.alias.as_ref().map(|a| a.as_str()),
                    field.name.as_str(),
                );
                out.insert(response_key, projected);
            }
            ast::Selection::InlineFragment(inline) => project_into(&inline.selection_set, source, out),
            ast::Selection::FragmentSpread(_) => {
                // Synthesized documents always arrive with fragments already inlined.
            }
        }
    }
}

pub fn local(executor: FixtureExecutor) -> Arc<dyn LocalExecutor> {
    Arc::new(executor)
}
