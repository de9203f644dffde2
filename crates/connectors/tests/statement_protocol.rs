use polyquery_connectors::{Backend, DriverConfig, DriverRegistry};
use polyquery_error::ErrorCode;
use serde_json::json;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{batch, dsn_for, executing_path, mount_batches, QUERY_ID};

fn farmer_columns() -> serde_json::Value {
    json!([
        { "name": "id", "type": "bigint" },
        { "name": "name", "type": "varchar(64)" }
    ])
}

#[tokio::test]
async fn test_trino_follows_next_uri_across_batches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .and(header("X-Trino-User", "analyst"))
        .and(header("X-Trino-Catalog", "hive"))
        .and(header("X-Trino-Schema", "rewards"))
        .and(header("X-Trino-Source", "polyquery"))
        .and(body_string("SELECT id, name FROM farmers"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(batch(&server, None, None, Some(1))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(executing_path(1)))
        .and(header("X-Trino-User", "analyst"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch(
            &server,
            Some(farmer_columns()),
            Some(json!([[1, "alice"], [2, null]])),
            Some(2),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(executing_path(2)))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch(
            &server,
            Some(farmer_columns()),
            Some(json!([[3, "carol"]])),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let registry = DriverRegistry::new();
    registry
        .initialize(
            Backend::Trino,
            DriverConfig::Trino(dsn_for(&server, "catalog=hive&schema=rewards")),
        )
        .await
        .unwrap();

    let result = registry
        .execute("SELECT id, name FROM farmers", "trino")
        .await
        .unwrap();

    assert_eq!(result.column_names, vec!["id", "name"]);
    assert_eq!(result.column_types["id"], "BIGINT");
    assert_eq!(result.column_types["name"], "VARCHAR");
    assert_eq!(
        result.rows,
        vec![
            vec!["1".to_string(), "alice".to_string()],
            vec!["2".to_string(), "NIL".to_string()],
            vec!["3".to_string(), "carol".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_presto_uses_presto_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .and(header("X-Presto-User", "analyst"))
        .and(header("X-Presto-Schema", "default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch(
            &server,
            Some(json!([{ "name": "n", "type": "integer" }])),
            Some(json!([[7]])),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let registry = DriverRegistry::new();
    registry
        .initialize(
            Backend::Presto,
            DriverConfig::Presto(dsn_for(&server, "schema=default")),
        )
        .await
        .unwrap();

    let result = registry.execute("SELECT 7 AS n", Backend::Presto).await.unwrap();
    assert_eq!(result.column_types["n"], "INTEGER");
    assert_eq!(result.rows, vec![vec!["7".to_string()]]);
}

#[tokio::test]
async fn test_server_error_is_query_failure() {
    let server = MockServer::start().await;
    let failed = {
        let mut body = batch(&server, None, None, None);
        body["stats"] = json!({ "state": "FAILED" });
        body["error"] = json!({
            "message": "line 1:8: Column 'nme' cannot be resolved",
            "errorName": "COLUMN_NOT_FOUND",
            "errorCode": 47
        });
        body
    };
    mount_batches(&server, vec![batch(&server, None, None, Some(1)), failed]).await;

    let registry = DriverRegistry::new();
    registry
        .initialize(Backend::Trino, DriverConfig::Trino(dsn_for(&server, "")))
        .await
        .unwrap();

    let err = registry
        .execute("SELECT nme FROM farmers", Backend::Trino)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::QueryFailed);
    assert!(err.message.contains("COLUMN_NOT_FOUND"));
    assert_eq!(err.execution_id.as_deref(), Some(QUERY_ID));
}

#[tokio::test]
async fn test_rejected_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(503).set_body_string("server starting"))
        .mount(&server)
        .await;

    let registry = DriverRegistry::new();
    registry
        .initialize(Backend::Trino, DriverConfig::Trino(dsn_for(&server, "")))
        .await
        .unwrap();

    let err = registry.execute("SELECT 1", Backend::Trino).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::SubmissionFailed);
    assert!(err.message.contains("503"));
}

#[tokio::test]
async fn test_failed_batch_discards_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch(
            &server,
            Some(farmer_columns()),
            Some(json!([[1, "alice"]])),
            Some(1),
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(executing_path(1)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let registry = DriverRegistry::new();
    registry
        .initialize(Backend::Trino, DriverConfig::Trino(dsn_for(&server, "")))
        .await
        .unwrap();

    let err = registry
        .execute("SELECT * FROM farmers", Backend::Trino)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchFailed);
    assert_eq!(err.execution_id.as_deref(), Some(QUERY_ID));
}

#[tokio::test]
async fn test_statement_without_result_set() {
    let server = MockServer::start().await;
    mount_batches(
        &server,
        vec![
            batch(&server, None, None, Some(1)),
            batch(&server, None, None, None),
        ],
    )
    .await;

    let registry = DriverRegistry::new();
    registry
        .initialize(Backend::Trino, DriverConfig::Trino(dsn_for(&server, "")))
        .await
        .unwrap();

    let result = registry
        .execute("CREATE TABLE t (id bigint)", Backend::Trino)
        .await
        .unwrap();
    assert!(result.is_empty());
}
