//! In-memory stand-in for a UserGrid application endpoint.
//!
//! Users are stored as loose JSON objects so ad-hoc properties survive a
//! round-trip, the same way UserGrid treats entity fields.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

/// Token lifetime reported to clients, in seconds.
pub const TOKEN_TTL_SECS: u64 = 604_800;

pub type Entity = Map<String, Value>;

#[derive(Debug, Default)]
pub struct Store {
    /// Creation order is listing order.
    users: Vec<Entity>,
    /// access token -> user uuid
    tokens: HashMap<String, String>,
}

impl Store {
    fn find(&self, identifier: &str) -> Option<usize> {
        self.users.iter().position(|user| {
            str_field(user, "uuid") == Some(identifier) || str_field(user, "username") == Some(identifier)
        })
    }

    fn find_uuid(&self, uuid: &str) -> Option<&Entity> {
        self.users.iter().find(|user| str_field(user, "uuid") == Some(uuid))
    }
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct MeParams {
    pub access_token: Option<String>,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me/", get(current_user))
        .route("/users/{id}", get(get_user).put(update_user))
        .route("/token/", get(issue_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn str_field<'a>(entity: &'a Entity, key: &str) -> Option<&'a str> {
    entity.get(key).and_then(Value::as_str)
}

fn failure(status: StatusCode, error: &str, description: impl Into<String>) -> Failure {
    (
        status,
        Json(json!({ "error": error, "error_description": description.into() })),
    )
}

/// Copy of `user` as clients see it: never includes the password.
fn public_view(user: &Entity) -> Value {
    let mut view = user.clone();
    view.remove("password");
    Value::Object(view)
}

fn envelope(users: &[&Entity]) -> Json<Value> {
    let entities: Vec<Value> = users.iter().map(|user| public_view(user)).collect();
    Json(json!({ "action": "get", "entities": entities }))
}

/// Apply `input` over `user`, leaving identity fields alone.
fn merge(user: &mut Entity, input: Entity) {
    for (key, value) in input {
        if key == "uuid" || key == "type" {
            continue;
        }
        user.insert(key, value);
    }
}

async fn list_users(State(db): State<Db>) -> Json<Value> {
    let store = db.read().await;
    let users: Vec<&Entity> = store.users.iter().collect();
    envelope(&users)
}

/// A POST for an existing username updates that user in place and answers
/// without an `entities` key.
async fn create_user(
    State(db): State<Db>,
    Json(input): Json<Entity>,
) -> Result<Json<Value>, Failure> {
    let username = match str_field(&input, "username") {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "required_property_not_found",
                "username is required",
            ))
        }
    };

    let mut store = db.write().await;
    if let Some(index) = store.find(&username) {
        merge(&mut store.users[index], input);
        info!(%username, "existing user updated by POST");
        return Ok(Json(json!({ "action": "post" })));
    }

    let uuid = Uuid::new_v4().to_string();
    let mut user = Entity::new();
    user.insert("uuid".to_string(), Value::String(uuid.clone()));
    user.insert("type".to_string(), Value::String("user".to_string()));
    merge(&mut user, input);
    store.users.push(user);
    info!(%username, %uuid, "user created");

    let created = store.users.last().map(public_view).unwrap_or(Value::Null);
    Ok(Json(json!({ "action": "post", "entities": [created] })))
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let index = store.find(&id).ok_or_else(|| {
        failure(
            StatusCode::NOT_FOUND,
            "service_resource_not_found",
            format!("user {id} not found"),
        )
    })?;
    Ok(envelope(&[&store.users[index]]))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<Entity>,
) -> Result<Json<Value>, Failure> {
    let mut store = db.write().await;
    let index = store.find(&id).ok_or_else(|| {
        failure(
            StatusCode::NOT_FOUND,
            "service_resource_not_found",
            format!("user {id} not found"),
        )
    })?;
    merge(&mut store.users[index], input);
    info!(%id, "user updated");
    Ok(envelope(&[&store.users[index]]))
}

async fn issue_token(
    State(db): State<Db>,
    Query(params): Query<TokenParams>,
) -> Result<Json<Value>, Failure> {
    if params.grant_type.as_deref() != Some("password") {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            "only grant_type=password is supported",
        ));
    }
    let username = params.username.unwrap_or_default();
    let password = params.password.unwrap_or_default();

    let mut store = db.write().await;
    let user = store
        .find(&username)
        .map(|index| &store.users[index])
        .filter(|user| str_field(user, "password") == Some(password.as_str()))
        .ok_or_else(|| {
            failure(
                StatusCode::BAD_REQUEST,
                "invalid_grant",
                "invalid username or password",
            )
        })?;
    let uuid = str_field(user, "uuid").unwrap_or_default().to_string();
    let view = public_view(user);

    let token = format!("YWMt{}", Uuid::new_v4().simple());
    store.tokens.insert(token.clone(), uuid);
    info!(%username, "token issued");

    Ok(Json(json!({
        "access_token": token,
        "expires_in": TOKEN_TTL_SECS,
        "user": view,
    })))
}

async fn current_user(
    State(db): State<Db>,
    Query(params): Query<MeParams>,
) -> Result<Json<Value>, Failure> {
    let store = db.read().await;
    let user = params
        .access_token
        .as_deref()
        .and_then(|token| store.tokens.get(token))
        .and_then(|uuid| store.find_uuid(uuid))
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "unauthorized", "invalid access token"))?;
    Ok(envelope(&[user]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn public_view_hides_password() {
        let user = entity(json!({"uuid": "u-1", "username": "bob", "password": "pw"}));
        let view = public_view(&user);
        assert_eq!(view["username"], "bob");
        assert!(view.get("password").is_none());
    }

    #[test]
    fn merge_keeps_identity_fields() {
        let mut user = entity(json!({"uuid": "u-1", "type": "user", "username": "bob"}));
        merge(
            &mut user,
            entity(json!({"uuid": "forged", "type": "admin", "firstname": "Bob"})),
        );
        assert_eq!(user["uuid"], "u-1");
        assert_eq!(user["type"], "user");
        assert_eq!(user["firstname"], "Bob");
    }

    #[test]
    fn find_matches_uuid_or_username() {
        let store = Store {
            users: vec![
                entity(json!({"uuid": "u-1", "username": "alice"})),
                entity(json!({"uuid": "u-2", "username": "bob"})),
            ],
            tokens: HashMap::new(),
        };
        assert_eq!(store.find("u-2"), Some(1));
        assert_eq!(store.find("alice"), Some(0));
        assert_eq!(store.find("carol"), None);
    }

    #[test]
    fn envelope_wraps_entities() {
        let user = entity(json!({"uuid": "u-1", "username": "bob"}));
        let Json(body) = envelope(&[&user]);
        assert_eq!(body["entities"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["entities"][0]["uuid"], "u-1");
    }
}
