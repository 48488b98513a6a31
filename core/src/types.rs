//! Account model for the UserGrid API.
//!
//! # Design
//! Known fields are plain `String`s that are empty when the server left them
//! out, never `Option`. Anything the caller wants beyond the known set lives
//! in `custom_properties`, which is flattened into the top level of the JSON
//! body on the way out, matching how UserGrid stores ad-hoc entity fields.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::ApiError;

/// Keys owned by the typed fields of `User`. A custom property with one of
/// these names is never sent.
pub const KNOWN_FIELDS: [&str; 12] = [
    "uuid", "username", "password", "lastname", "firstname", "title", "email", "tel", "homepage",
    "bday", "picture", "url",
];

/// A UserGrid user entity.
///
/// Built from responses by [`crate::entity::hydrate_user`]; serialized as the
/// body of create and update calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub uuid: String,
    pub username: String,
    pub password: String,
    pub lastname: String,
    pub firstname: String,
    pub title: String,
    pub email: String,
    pub tel: String,
    pub homepage: String,
    /// Date of birth, passed through as whatever string the server holds.
    pub bday: String,
    pub picture: String,
    pub url: String,
    pub custom_properties: HashMap<String, String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// JSON body for create and update calls.
    pub fn to_payload(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::Serialization(e.to_string()))
    }

    fn known_values(&self) -> [&str; 12] {
        [
            self.uuid.as_str(),
            self.username.as_str(),
            self.password.as_str(),
            self.lastname.as_str(),
            self.firstname.as_str(),
            self.title.as_str(),
            self.email.as_str(),
            self.tel.as_str(),
            self.homepage.as_str(),
            self.bday.as_str(),
            self.picture.as_str(),
            self.url.as_str(),
        ]
    }
}

/// Non-empty known fields first, then custom properties sorted by key.
impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut custom: Vec<(&String, &String)> = self
            .custom_properties
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .collect();
        custom.sort();

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in KNOWN_FIELDS.iter().zip(self.known_values()) {
            if !value.is_empty() {
                map.serialize_entry(key, value)?;
            }
        }
        for (key, value) in custom {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
