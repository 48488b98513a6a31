//! Blocking client for a UserGrid-style user-management API.
//!
//! # Overview
//! Account CRUD (`/users`) and password-grant tokens (`/token`,
//! `/users/me`). Every call is a single request/parse/map round-trip; nothing
//! is cached or retried.
//!
//! # Design
//! - `UsergridClient` holds only `base_url` and a `Transport`.
//! - Each operation has a `build_*` (produces an `HttpRequest`) and a
//!   `parse_*` (consumes a body) half, so the I/O boundary is explicit and
//!   a fake transport can stand in during tests.
//! - `UreqTransport` is the default blocking transport (`ureq` feature).
//! - Responses are read through `serde_json::Value`; the `entities` envelope
//!   and field coalescing live in `entity`.

pub mod client;
pub mod entity;
pub mod error;
pub mod http;
pub mod types;

pub use client::{build_path, UsergridClient, BASE_URL_ENV};
pub use entity::{extract_entities, hydrate_user};
pub use error::ApiError;
#[cfg(feature = "ureq")]
pub use http::UreqTransport;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use types::User;
