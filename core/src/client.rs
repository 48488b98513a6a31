//! Blocking client for the UserGrid account and token endpoints.
//!
//! # Design
//! `UsergridClient` holds a `base_url` and a `Transport`, nothing else. Each
//! operation is split the same way: a `build_*` method produces the
//! `HttpRequest`, the transport executes it, and a `parse_*` method turns the
//! body into a result. The `build_*`/`parse_*` halves are public so a host can
//! run the I/O itself; the combined methods (`get_user`, `get_token`, ...) do
//! the round-trip through the configured transport.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::{form_urlencoded, Url};

use crate::entity::{extract_entities, hydrate_user, required_field};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::types::User;

#[cfg(feature = "ureq")]
use crate::http::UreqTransport;

/// Environment variable read by `UsergridClient::from_env`.
pub const BASE_URL_ENV: &str = "USERGRID_URL";

/// Join `base_url` and `path` with exactly one `/` between them.
pub fn build_path(base_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    let mut url = String::with_capacity(base_url.len() + path.len() + 1);
    url.push_str(base_url);
    if !base_url.ends_with('/') {
        url.push('/');
    }
    url.push_str(path);
    url
}

/// Percent-encode `segment` so `/`, `?` and `#` stay inside one path segment.
fn path_segment(segment: &str) -> String {
    let Ok(mut scratch) = Url::parse("http://segment.invalid/") else {
        return segment.to_string();
    };
    if let Ok(mut segments) = scratch.path_segments_mut() {
        segments.clear().push(segment);
    }
    scratch.path().trim_start_matches('/').to_string()
}

/// Client for a UserGrid application endpoint.
#[derive(Debug, Clone)]
pub struct UsergridClient<T> {
    base_url: String,
    transport: T,
}

#[cfg(feature = "ureq")]
impl UsergridClient<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, UreqTransport::new())
    }

    /// Build a client from the `USERGRID_URL` environment variable.
    pub fn from_env() -> Result<Self, ApiError> {
        let base_url = std::env::var(BASE_URL_ENV)
            .map_err(|e| ApiError::Config(format!("{BASE_URL_ENV}: {e}")))?;
        Ok(Self::new(&base_url))
    }
}

impl<T: Transport> UsergridClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.to_string(),
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.to_string();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute URL for `path` under the configured base URL.
    pub fn build_path(&self, path: &str) -> String {
        build_path(&self.base_url, path)
    }

    // -----------------------------------------------------------------------
    // Generic requests
    // -----------------------------------------------------------------------

    /// Describe a request against `path`. A JSON body gets a content-type.
    pub fn build_request(&self, path: &str, method: HttpMethod, body: Option<String>) -> HttpRequest {
        let headers = match body {
            Some(_) => vec![("content-type".to_string(), "application/json".to_string())],
            None => Vec::new(),
        };
        HttpRequest {
            method,
            url: self.build_path(path),
            headers,
            body,
        }
    }

    /// GET `path` and deserialize the response body as `R`.
    pub fn perform_request<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.perform_request_with::<R, ()>(path, HttpMethod::Get, None)
    }

    /// Send `payload` (as JSON) to `path` with `method` and deserialize the
    /// response body as `R`.
    pub fn perform_request_with<R, P>(
        &self,
        path: &str,
        method: HttpMethod,
        payload: Option<&P>,
    ) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let body = self.request_raw(path, method, payload)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Like `perform_request_with` but hands back the body untouched.
    pub fn request_raw<P>(
        &self,
        path: &str,
        method: HttpMethod,
        payload: Option<&P>,
    ) -> Result<String, ApiError>
    where
        P: Serialize + ?Sized,
    {
        let body = payload.map(to_json).transpose()?;
        self.send(self.build_request(path, method, body))
    }

    fn send(&self, request: HttpRequest) -> Result<String, ApiError> {
        debug!(method = request.method.as_str(), url = request.redacted_url(), "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        check_status(response)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    /// `identifier` may be a uuid or a username; the API accepts both.
    pub fn build_get_user(&self, identifier: &str) -> HttpRequest {
        let path = format!("/users/{}", path_segment(identifier));
        self.build_request(&path, HttpMethod::Get, None)
    }

    pub fn build_get_users(&self) -> HttpRequest {
        self.build_request("/users", HttpMethod::Get, None)
    }

    pub fn build_create_account(&self, account: &User) -> Result<HttpRequest, ApiError> {
        Ok(self.build_request("/users", HttpMethod::Post, Some(account.to_payload()?)))
    }

    pub fn build_update_account(&self, account: &User) -> Result<HttpRequest, ApiError> {
        let path = format!("/users/{}", path_segment(&account.username));
        Ok(self.build_request(&path, HttpMethod::Put, Some(account.to_payload()?)))
    }

    pub fn build_get_token(&self, username: &str, password: &str) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        self.build_request(&format!("/token/?{query}"), HttpMethod::Get, None)
    }

    pub fn build_look_up_token(&self, token: &str) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("access_token", token)
            .finish();
        self.build_request(&format!("/users/me/?{query}"), HttpMethod::Get, None)
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_get_user(&self, body: &str, extra_fields: &[&str]) -> Result<User, ApiError> {
        let entities = extract_entities(body)?;
        if entities.len() > 1 {
            warn!(count = entities.len(), "lookup by identifier matched several entities");
            return Err(ApiError::AmbiguousLookup {
                count: entities.len(),
            });
        }
        let entity = entities.first().ok_or(ApiError::NoEntities)?;
        Ok(hydrate_user(entity, extra_fields))
    }

    pub fn parse_get_users(&self, body: &str) -> Result<Vec<User>, ApiError> {
        Ok(extract_entities(body)?
            .iter()
            .map(|entity| hydrate_user(entity, &[]))
            .collect())
    }

    /// The new account's uuid, or `None` when the API answered without an
    /// entity. An entity without a uuid is `MissingField`.
    pub fn parse_create_account(&self, body: &str) -> Result<Option<String>, ApiError> {
        extract_entities(body)?
            .first()
            .map(|entity| required_field(entity, "uuid"))
            .transpose()
    }

    pub fn parse_get_token(&self, body: &str) -> Result<String, ApiError> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        required_field(&value, "access_token")
    }

    pub fn parse_look_up_token(&self, body: &str) -> Result<String, ApiError> {
        let entities = extract_entities(body)?;
        let entity = entities.first().ok_or(ApiError::NoEntities)?;
        required_field(entity, "username")
    }

    // -----------------------------------------------------------------------
    // Account operations
    // -----------------------------------------------------------------------

    /// Fetch one user by uuid or username, copying `extra_fields` into
    /// `custom_properties`.
    pub fn get_user(&self, identifier: &str, extra_fields: &[&str]) -> Result<User, ApiError> {
        let body = self.send(self.build_get_user(identifier))?;
        self.parse_get_user(&body, extra_fields)
    }

    /// Every user, in the order the API returned them.
    pub fn get_users(&self) -> Result<Vec<User>, ApiError> {
        let body = self.send(self.build_get_users())?;
        self.parse_get_users(&body)
    }

    /// Create `account` and return its uuid.
    ///
    /// When the API answers the POST without an entity the account is updated
    /// in place instead, and the result of `update_account` is returned.
    pub fn create_account(&self, account: &User) -> Result<String, ApiError> {
        let body = self.send(self.build_create_account(account)?)?;
        match self.parse_create_account(&body)? {
            Some(uuid) => Ok(uuid),
            None => {
                warn!(username = %account.username, "create returned no entity, updating instead");
                self.update_account(account)
            }
        }
    }

    /// PUT `account` to `/users/{username}`. Returns an empty string; only
    /// transport and status failures are reported.
    pub fn update_account(&self, account: &User) -> Result<String, ApiError> {
        self.send(self.build_update_account(account)?)?;
        Ok(String::new())
    }

    // -----------------------------------------------------------------------
    // Token operations
    // -----------------------------------------------------------------------

    /// Exchange a username and password for an access token.
    pub fn get_token(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let body = self.send(self.build_get_token(username, password))?;
        self.parse_get_token(&body)
    }

    /// Resolve an access token to the username it was issued for.
    pub fn look_up_token(&self, token: &str) -> Result<String, ApiError> {
        let body = self.send(self.build_look_up_token(token))?;
        self.parse_look_up_token(&body)
    }
}

fn to_json<P: Serialize + ?Sized>(payload: &P) -> Result<String, ApiError> {
    serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Non-2xx responses become `HttpError` with the raw body.
fn check_status(response: HttpResponse) -> Result<String, ApiError> {
    if response.is_success() {
        return Ok(response.body);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body,
    })
}
