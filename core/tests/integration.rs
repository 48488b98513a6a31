//! Account and token lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every client
//! operation over real HTTP through `UreqTransport`.

use usergrid_core::{ApiError, User, UsergridClient};

fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}/")
}

#[test]
fn account_and_token_lifecycle() {
    let client = UsergridClient::new(&start_server());

    // Step 1: list — should be empty.
    assert!(client.get_users().unwrap().is_empty(), "expected empty list");

    // Step 2: create an account.
    let mut account = User::new("jdoe");
    account.password = "hunter2".to_string();
    account.firstname = "Jane".to_string();
    account.email = "jane@example.com".to_string();
    account
        .custom_properties
        .insert("team".to_string(), "blue".to_string());
    let id = client.create_account(&account).unwrap();
    assert!(!id.is_empty());

    // Step 3: fetch by uuid and by username.
    let by_id = client.get_user(&id, &["team"]).unwrap();
    let by_name = client.get_user("jdoe", &["team"]).unwrap();
    assert_eq!(by_id, by_name);
    assert_eq!(by_id.uuid, id);
    assert_eq!(by_id.firstname, "Jane");
    assert_eq!(by_id.email, "jane@example.com");
    assert_eq!(by_id.lastname, "");
    assert_eq!(by_id.password, "", "server never echoes passwords");
    assert_eq!(by_id.custom_properties["team"], "blue");

    // Step 4: creating the same username again falls back to an update.
    account.lastname = "Doe".to_string();
    assert_eq!(client.create_account(&account).unwrap(), "");
    assert_eq!(client.get_user("jdoe", &[]).unwrap().lastname, "Doe");

    // Step 5: explicit update.
    account.title = "Dr".to_string();
    assert_eq!(client.update_account(&account).unwrap(), "");
    let fetched = client.get_user("jdoe", &[]).unwrap();
    assert_eq!(fetched.title, "Dr");
    assert_eq!(fetched.uuid, id);

    // Step 6: a second account shows up after the first.
    let mut other = User::new("rroe");
    other.password = "pa ss&word".to_string();
    client.create_account(&other).unwrap();
    let names: Vec<_> = client
        .get_users()
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, ["jdoe", "rroe"]);

    // Step 7: tokens, including a password that needs query escaping.
    let token = client.get_token("rroe", "pa ss&word").unwrap();
    assert!(!token.is_empty());
    assert_eq!(client.look_up_token(&token).unwrap(), "rroe");

    let token = client.get_token("jdoe", "hunter2").unwrap();
    assert_eq!(client.look_up_token(&token).unwrap(), "jdoe");

    // Step 8: failures surface as HTTP errors.
    let err = client.get_token("jdoe", "wrong").unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 400, .. }));

    let err = client.look_up_token("not-a-token").unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 401, .. }));

    let err = client.get_user("ghost", &[]).unwrap_err();
    assert!(matches!(err, ApiError::HttpError { status: 404, .. }));
}

#[test]
fn base_url_without_trailing_slash_reaches_same_server() {
    let base = start_server();
    let mut client = UsergridClient::new("http://127.0.0.1:1/");
    client.set_base_url(base.trim_end_matches('/'));
    assert!(client.get_users().unwrap().is_empty());
}

#[test]
fn unreachable_server_is_a_transport_error() {
    // Port 1 is privileged and never bound by the test harness.
    let client = UsergridClient::new("http://127.0.0.1:1");
    let err = client.get_users().unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
}
