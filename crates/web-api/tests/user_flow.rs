mod support;

use reqwest::StatusCode;
use serde_json::{json, Value};

use support::spawn_server;

#[tokio::test]
async fn register_login_and_lookup() {
    let server = spawn_server().await;

    let health = server
        .client
        .get(server.http("/health"))
        .send()
        .await
        .expect("health");
    assert_eq!(health.status(), StatusCode::OK);

    let registered = server.register("alice").await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let profile: Value = registered.json().await.expect("json");
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["status"], "offline");
    assert!(profile.get("password").is_none());

    let login = server.login("alice").await;
    assert_eq!(login.status(), StatusCode::OK);
    let cookie = login
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("session cookie")
        .to_string();
    let body: Value = login.json().await.expect("json");
    let token = body["token"].as_str().expect("token");
    assert!(cookie.starts_with(&format!("token={token}")));
    assert!(cookie.contains("HttpOnly"));
    assert!(body["expiresAt"].is_string());
    assert_eq!(body["user"]["id"], profile["id"]);

    let id = profile["id"].as_i64().unwrap();
    let lookup: Value = server
        .client
        .get(server.http(&format!("/api/v1/users/{id}")))
        .send()
        .await
        .expect("lookup")
        .json()
        .await
        .expect("json");
    assert_eq!(lookup["email"], "alice@example.com");
    assert_eq!(lookup["status"], "offline");
}

#[tokio::test]
async fn duplicate_registration_and_bad_credentials() {
    let server = spawn_server().await;
    assert_eq!(server.register("bob").await.status(), StatusCode::CREATED);

    let duplicate = server.register("bob").await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    let body: Value = duplicate.json().await.expect("json");
    assert_eq!(body["code"], "EMAIL_TAKEN");

    let wrong_password = server
        .client
        .post(server.http("/api/v1/users/login"))
        .json(&json!({ "email": "bob@example.com", "password": "wrong" }))
        .send()
        .await
        .expect("login");
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let body: Value = wrong_password.json().await.expect("json");
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let invalid = server
        .client
        .post(server.http("/api/v1/users/register"))
        .json(&json!({ "username": "", "email": "not-an-email", "password": "x" }))
        .send()
        .await
        .expect("register");
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    let body: Value = invalid.json().await.expect("json");
    assert_eq!(body["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let server = spawn_server().await;
    let response = server
        .client
        .get(server.http("/api/v1/users/4242"))
        .send()
        .await
        .expect("lookup");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["code"], "USER_NOT_FOUND");
}
