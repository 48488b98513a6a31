//! Envelope extraction and user hydration.
//!
//! UserGrid wraps results as `{"entities": [ ... ]}`. A body with no
//! `entities` key, or an empty body, means "nothing matched" rather than an
//! error.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ApiError;
use crate::types::User;

const ENTITIES_KEY: &str = "entities";

/// Pull the entity list out of a raw response body.
pub fn extract_entities(raw: &str) -> Result<Vec<Value>, ApiError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut envelope: Value = serde_json::from_str(raw)?;
    match envelope.get_mut(ENTITIES_KEY).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entities)) => Ok(entities),
        Some(other) => Err(ApiError::UnexpectedShape(format!(
            "`{ENTITIES_KEY}` is {}, expected an array",
            json_kind(&other)
        ))),
    }
}

/// Read `key` from an entity as a string, coalescing missing and null to "".
///
/// Non-string values come back as their JSON text (`42`, `true`, `{...}`).
pub fn field_or_empty(entity: &Value, key: &str) -> String {
    match entity.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read `key` the same way as `field_or_empty`, but a missing or null value
/// is an error.
pub fn required_field(entity: &Value, key: &'static str) -> Result<String, ApiError> {
    match entity.get(key) {
        None | Some(Value::Null) => Err(ApiError::MissingField(key)),
        Some(_) => Ok(field_or_empty(entity, key)),
    }
}

/// Map one entity object onto a `User`.
///
/// `extra_fields` names keys to carry into `custom_properties`; each is
/// coalesced the same way as the known fields.
pub fn hydrate_user(entity: &Value, extra_fields: &[&str]) -> User {
    let custom_properties: HashMap<String, String> = extra_fields
        .iter()
        .map(|key| (key.to_string(), field_or_empty(entity, key)))
        .collect();

    // Older deployments sent `Email`.
    let email = match field_or_empty(entity, "email") {
        email if email.is_empty() => field_or_empty(entity, "Email"),
        email => email,
    };

    User {
        uuid: field_or_empty(entity, "uuid"),
        username: field_or_empty(entity, "username"),
        password: field_or_empty(entity, "password"),
        lastname: field_or_empty(entity, "lastname"),
        firstname: field_or_empty(entity, "firstname"),
        title: field_or_empty(entity, "title"),
        email,
        tel: field_or_empty(entity, "tel"),
        homepage: field_or_empty(entity, "homepage"),
        bday: field_or_empty(entity, "bday"),
        picture: field_or_empty(entity, "picture"),
        url: field_or_empty(entity, "url"),
        custom_properties,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
