//! GoTrue client against a mock auth server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use todolist_auth::providers::{AuthProvider, GoTrueClient};
use todolist_auth::{AuthError, Credentials};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";

fn user_json() -> Value {
    json!({
        "id": "u1",
        "aud": "authenticated",
        "email": "ada@example.com",
        "user_metadata": { "full_name": "Ada Lovelace" },
        "created_at": "2024-01-01T00:00:00Z"
    })
}

fn session_json() -> Value {
    json!({
        "access_token": "access-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": 1_700_003_600,
        "refresh_token": "refresh-1",
        "user": user_json()
    })
}

fn credentials() -> Credentials {
    Credentials::new("ada@example.com", "secret")
}

async fn signed_in(server: &MockServer) -> GoTrueClient {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .mount(server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY);
    client.sign_in_with_password(&credentials()).await.unwrap();
    client
}

#[tokio::test]
async fn sign_in_posts_credentials_and_keeps_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer anon-key"))
        .and(body_json(json!({ "email": "ada@example.com", "password": "secret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = GoTrueClient::new(format!("{}/", server.uri()), ANON_KEY);
    let response = client.sign_in_with_password(&credentials()).await.unwrap();

    let user = response.user.unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.full_name(), Some("Ada Lovelace"));

    let session = client.get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.expires_at, Some(1_700_003_600));
}

#[tokio::test]
async fn rejected_credentials_surface_the_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "invalid_credentials",
            "msg": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY);
    let error = client
        .sign_in_with_password(&credentials())
        .await
        .unwrap_err();

    assert_eq!(error, AuthError::provider(400, "Invalid login credentials"));
    assert!(client.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn legacy_error_bodies_are_understood() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": "invalid_request",
            "error_description": "Password should be at least 6 characters"
        })))
        .mount(&server)
        .await;

    let error = GoTrueClient::new(server.uri(), ANON_KEY)
        .sign_up(&credentials())
        .await
        .unwrap_err();

    assert_eq!(
        error,
        AuthError::provider(422, "Password should be at least 6 characters")
    );
}

#[tokio::test]
async fn sign_up_without_auto_confirm_returns_only_the_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY);
    let response = client.sign_up(&credentials()).await.unwrap();

    assert_eq!(response.user.unwrap().email.as_deref(), Some("ada@example.com"));
    assert!(response.session.is_none());
    assert!(client.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn sign_up_with_auto_confirm_starts_a_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .mount(&server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY);
    let response = client.sign_up(&credentials()).await.unwrap();

    assert!(response.session.is_some());
    assert!(client.get_session().await.unwrap().is_some());
}

#[tokio::test]
async fn get_user_uses_the_session_token() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.get_user().await.unwrap().unwrap();

    assert_eq!(user.id, "u1");
}

#[tokio::test]
async fn signed_out_clients_have_no_user_and_make_no_calls() {
    let server = MockServer::start().await;
    let client = GoTrueClient::new(server.uri(), ANON_KEY);

    assert!(client.get_user().await.unwrap().is_none());
    client.sign_out().await.unwrap();

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn sign_out_revokes_and_forgets_the_session() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.sign_out().await.unwrap();

    assert!(client.get_session().await.unwrap().is_none());
}

#[tokio::test]
async fn unreachable_servers_are_transport_errors() {
    let client = GoTrueClient::new("http://127.0.0.1:9", ANON_KEY);

    let error = client
        .sign_in_with_password(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(error, AuthError::Transport(_)));
}

#[tokio::test]
async fn sessionless_clients_return_but_never_keep_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json()))
        .mount(&server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY).without_session();
    let response = client.sign_in_with_password(&credentials()).await.unwrap();

    assert_eq!(response.session.unwrap().access_token, "access-1");
    assert!(client.get_session().await.unwrap().is_none());
    assert!(client.get_user().await.unwrap().is_none());
}

#[tokio::test]
async fn token_lookups_use_the_callers_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer caller-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer stale-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "msg": "invalid JWT"
        })))
        .mount(&server)
        .await;

    let client = GoTrueClient::new(server.uri(), ANON_KEY).without_session();

    let user = client.get_user_with_token("caller-token").await.unwrap();
    assert_eq!(user.unwrap().id, "u1");
    assert!(client.get_user_with_token("stale-token").await.unwrap().is_none());
}

#[tokio::test]
async fn token_sign_out_revokes_only_that_token() {
    let server = MockServer::start().await;
    let client = signed_in(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", "Bearer other-token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.sign_out_with_token("other-token").await.unwrap();

    assert_eq!(
        client.get_session().await.unwrap().unwrap().access_token,
        "access-1"
    );
}
