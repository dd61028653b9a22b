//! The JSON representation shared by arguments, variables, and resolved
//! field data. `serde_json_bytes` is the same crate the teacher and
//! `apollo-router` use for GraphQL response values, so link resolvers and
//! host-engine glue can move values between this crate and the rest of an
//! Apollo-shaped stack without a conversion step.

pub use serde_json_bytes::{ByteString, Map, Value};

/// Variables passed into a delegated operation: a plain object map, matching
/// the shape GraphQL transport-level requests use for `variables`.
pub type Variables = Map<ByteString, Value>;

/// Reads the response key a selection contributes under: the alias if
/// present, otherwise the field name (spec §4.4 "preserve aliases").
pub fn response_key(alias: Option<&str>, name: &str) -> ByteString {
    ByteString::from(alias.unwrap_or(name))
}
