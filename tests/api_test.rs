use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use dmconsole::app::AppState;
use dmconsole::config::DatabaseSettings;
use dmconsole::db::Session;
use dmconsole::ui::app_router;

fn test_server() -> (TestServer, AppState) {
    let state = AppState::new(Session::new(DatabaseSettings::sqlite_memory()));
    let server = TestServer::new(app_router(state.clone())).unwrap();
    (server, state)
}

async fn run(server: &TestServer, sql: &str) -> Value {
    server
        .post("/api/query")
        .json(&json!({ "sql": sql }))
        .await
        .json::<Value>()
}

#[tokio::test]
async fn health_check_works() {
    let (server, _) = test_server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn index_serves_the_form() {
    let (server, _) = test_server();

    let response = server.get("/").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.text();
    assert!(body.contains("Database Console"));
    assert!(body.contains("/api/query"));
}

#[tokio::test]
async fn query_returns_table_outcome() {
    let (server, _) = test_server();

    let response = server
        .post("/api/query")
        .json(&json!({ "sql": "SELECT 1 AS one" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({ "kind": "table", "columns": ["one"], "rows": [[1]], "row_count": 1 })
    );
}

#[tokio::test]
async fn write_returns_message_outcome() {
    let (server, _) = test_server();
    run(&server, "CREATE TABLE t (id INTEGER, x INTEGER)").await;
    run(&server, "INSERT INTO t VALUES (1, 0)").await;

    let body = run(&server, "UPDATE t SET x=1 WHERE id=1").await;

    assert_eq!(body["kind"], "message");
    assert_eq!(body["message"], "Executed successfully, rows affected: 1");
    assert_eq!(run(&server, "SELECT x FROM t").await["rows"], json!([[1]]));
}

#[tokio::test]
async fn blank_query_is_rejected_before_the_database() {
    let (server, state) = test_server();

    let response = server.post("/api/query").json(&json!({ "sql": "  " })).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["kind"], "error");
    assert_eq!(body["reason"], "invalid_input");
    assert_eq!(body["message"], "Please enter a SQL statement");
    assert!(!state.session.lock().await.is_connected());
}

#[tokio::test]
async fn failing_statement_returns_execute_error() {
    let (server, _) = test_server();

    let response = server
        .post("/api/query")
        .json(&json!({ "sql": "SELEC nonsense" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["kind"], "error");
    assert_eq!(body["reason"], "execute");
}

#[tokio::test]
async fn tables_share_the_tabular_shape() {
    let (server, _) = test_server();
    run(&server, "CREATE TABLE beta (id INTEGER)").await;
    run(&server, "CREATE TABLE alpha (id INTEGER)").await;

    let response = server.get("/api/tables").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(
        response.json::<Value>(),
        json!({
            "kind": "table",
            "columns": ["TABLE_NAME"],
            "rows": [["alpha"], ["beta"]],
            "row_count": 2
        })
    );
}

#[tokio::test]
async fn table_info_describes_columns() {
    let (server, _) = test_server();
    run(&server, "CREATE TABLE people (id INTEGER NOT NULL, name TEXT)").await;

    let body = server.get("/api/tables/people").await.json::<Value>();

    assert_eq!(body["kind"], "table");
    assert_eq!(
        body["columns"],
        json!(["COLUMN_NAME", "DATA_TYPE", "DATA_LENGTH", "NULLABLE", "DATA_DEFAULT"])
    );
    assert_eq!(body["row_count"], 2);
    assert_eq!(body["rows"][0][0], "id");
    assert_eq!(body["rows"][1][0], "name");
}

#[tokio::test]
async fn table_info_for_unknown_table_is_empty() {
    let (server, _) = test_server();

    let response = server.get("/api/tables/nonexistent_table").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["kind"], "table");
    assert_eq!(body["row_count"], 0);
}

#[tokio::test]
async fn disconnect_then_reconnect_on_next_request() {
    let (server, state) = test_server();
    run(&server, "CREATE TABLE kept (id INTEGER)").await;

    let body = server.post("/api/disconnect").await.json::<Value>();
    assert_eq!(body, json!({ "kind": "message", "message": "Disconnected" }));
    assert!(!state.session.lock().await.is_connected());

    // a fresh in-memory database comes back empty
    let body = server.get("/api/tables").await.json::<Value>();
    assert_eq!(body["row_count"], 0);
    assert!(state.session.lock().await.is_connected());

    let body = server.post("/api/connect").await.json::<Value>();
    assert_eq!(body["kind"], "message");
}

#[tokio::test]
async fn unreachable_database_reports_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = DatabaseSettings::sqlite_memory();
    settings.database = dir.path().join("absent").join("db.sqlite").display().to_string();
    let server = TestServer::new(app_router(AppState::new(Session::new(settings)))).unwrap();

    for response in [
        server.get("/api/tables").await,
        server.post("/api/connect").await,
        server.post("/api/query").json(&json!({ "sql": "SELECT 1" })).await,
    ] {
        assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let body = response.json::<Value>();
        assert_eq!(body["kind"], "error");
        assert_eq!(body["reason"], "connect");
    }
}
