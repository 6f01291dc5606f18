//! PostgREST backend against a mock REST server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{Value, json};
use todolist_core::{
    CreateTodo, ErrorCode, Filter, OwnerId, RecordStore, Select, TableBackend, TodoId,
    TodoService, UpdateTodo,
};
use todolist_postgrest::{FETCH_ERROR, PostgrestBackend};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";

fn todo_json(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "completed": false,
        "owner_id": "user1",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

async fn server_and_backend() -> (MockServer, PostgrestBackend) {
    let server = MockServer::start().await;
    let backend = PostgrestBackend::new(&server.uri(), ANON_KEY);
    (server, backend)
}

#[tokio::test]
async fn select_renders_the_read_as_query_parameters() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/todos"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer anon-key"))
        .and(query_param("select", "*"))
        .and(query_param("owner_id", "eq.user1"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([todo_json("t1", "A")])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = backend
        .select(
            "todos",
            Select::all().eq("owner_id", "user1").order("created_at", false),
        )
        .await
        .unwrap();

    assert_eq!(rows, vec![todo_json("t1", "A")]);
}

#[tokio::test]
async fn writes_ask_for_the_written_row() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/todos"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "title": "A", "owner_id": "user1", "completed": false })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([todo_json("t1", "A")])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/todos"))
        .and(query_param("id", "eq.t1"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!({ "completed": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = TodoService::new(RecordStore::new(backend));

    let created = service
        .create(CreateTodo::new("A", OwnerId::new("user1")))
        .await
        .unwrap();
    assert_eq!(created.id, TodoId::new("t1"));

    let missing = service
        .update(&TodoId::new("t1"), UpdateTodo::default().completed(true))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), &ErrorCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_filters_by_id_and_accepts_no_content() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/todos"))
        .and(query_param("id", "eq.t1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend
        .delete("todos", vec![Filter::eq("id", "t1")])
        .await
        .unwrap();
}

#[tokio::test]
async fn error_bodies_decode_into_backend_errors() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/todos"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "column todos.nope does not exist",
            "code": "42703",
            "details": null,
            "hint": "Perhaps you meant to reference the column \"todos.note\"."
        })))
        .mount(&server)
        .await;

    let error = backend
        .select("todos", Select::all().columns(&["nope"]))
        .await
        .unwrap_err();

    assert_eq!(error.message, "column todos.nope does not exist");
    assert_eq!(error.code.as_deref(), Some("42703"));
    assert!(error.hint.is_some());

    let domain = TodoService::new(RecordStore::new(backend))
        .find_by_owner(&OwnerId::new("user1"))
        .await
        .unwrap_err();
    assert_eq!(domain.code(), &ErrorCode::BAD_REQUEST);
    assert_eq!(domain.message(), "column todos.nope does not exist");
}

#[tokio::test]
async fn plain_text_failures_keep_the_status_as_code() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/todos"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let error = backend.select("todos", Select::all()).await.unwrap_err();

    assert_eq!(error.message, "upstream unavailable");
    assert_eq!(error.code.as_deref(), Some("503"));
}

#[tokio::test]
async fn access_tokens_replace_the_anon_bearer() {
    let (server, backend) = server_and_backend().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/todos"))
        .and(header("apikey", ANON_KEY))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let rows = backend
        .with_access_token("user-token")
        .select("todos", Select::all())
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn unreachable_databases_are_fetch_errors() {
    let backend = PostgrestBackend::new("http://127.0.0.1:9", ANON_KEY);

    let error = backend.select("todos", Select::all()).await.unwrap_err();

    assert_eq!(error.code.as_deref(), Some(FETCH_ERROR));
}
