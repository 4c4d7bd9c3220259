//! Execution path tests with test doubles.
//!
//! Covers construction failures and the single-error-kind contract of
//! `execute` and `query`.

use std::error::Error as _;
use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use watch_sql::db::mock::{MockConnection, MockQueryService};
use watch_sql::db::{Parameters, Record, Value};
use watch_sql::error::{ErrorKind, IntegrationError};
use watch_sql::integration::{SqlIntegration, SqlIntegrationConfiguration};

const CONNECTION_STRING: &str =
    r"Data Source=.\sqlexpress;Initial Catalog=MyDatabase;Integrated Security=True";

fn integration_with(
    connection: &MockConnection,
    service: &MockQueryService,
    query: Option<&str>,
) -> SqlIntegration {
    let mut builder = SqlIntegrationConfiguration::create(CONNECTION_STRING)
        .unwrap()
        .with_connection_provider(connection.provider())
        .with_query_service_provider(service.provider());
    if let Some(query) = query {
        builder = builder.with_query(query).unwrap();
    }
    SqlIntegration::create(Some(builder.build())).unwrap()
}

#[test]
fn test_initializing_without_configuration_fails() {
    let err = SqlIntegration::create(None).unwrap_err();

    assert!(matches!(err, IntegrationError::Configuration(_)));
    assert!(err
        .to_string()
        .contains("SQL integration configuration has not been provided."));
}

#[test]
fn test_initializing_with_invalid_connection_string_fails() {
    let err = SqlIntegrationConfiguration::create("invalid").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("SQL connection string is invalid"));
}

#[tokio::test]
async fn test_execute_with_failing_open() {
    let connection = MockConnection::failing_open("Error");
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("select * from users"));

    let err = integration.execute(None, None, None).await.unwrap_err();

    assert_eq!(connection.open_calls(), 1);
    assert!(matches!(err, IntegrationError::Execution { .. }));
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_query_with_failing_open() {
    let connection = MockConnection::failing_open("Error");
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("select * from users"));

    let err = integration
        .query::<serde_json::Value>(None, None, None)
        .await
        .unwrap_err();

    assert_eq!(connection.open_calls(), 1);
    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_query_that_fails() {
    let connection = MockConnection::new();
    let service = MockQueryService::failing("Error");
    let integration = integration_with(&connection, &service, Some("select * from users"));

    let err = integration
        .query::<serde_json::Value>(None, None, None)
        .await
        .unwrap_err();

    assert_eq!(connection.open_calls(), 1);
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(err.source().unwrap().to_string(), "Error");
}

#[tokio::test]
async fn test_execute_that_fails() {
    let connection = MockConnection::new();
    let service = MockQueryService::failing("Error");
    let integration = integration_with(&connection, &service, None);

    let err = integration
        .execute(Some("delete from users"), None, None)
        .await
        .unwrap_err();

    assert_eq!(connection.open_calls(), 1);
    assert_eq!(err.kind(), ErrorKind::Execution);
    assert_eq!(service.calls()[0].operation, "execute");
}

#[tokio::test]
async fn test_open_and_statement_failures_share_one_kind() {
    let failing_open = MockConnection::failing_open("connection refused");
    let failing_service = MockQueryService::failing("syntax error");

    let open_err = integration_with(&failing_open, &MockQueryService::new(), Some("select 1"))
        .execute(None, None, None)
        .await
        .unwrap_err();
    let statement_err = integration_with(&MockConnection::new(), &failing_service, Some("select 1"))
        .execute(None, None, None)
        .await
        .unwrap_err();

    assert_eq!(open_err.kind(), statement_err.kind());
    assert_eq!(open_err.source().unwrap().to_string(), "connection refused");
    assert_eq!(statement_err.source().unwrap().to_string(), "syntax error");
}

#[tokio::test]
async fn test_execute_succeeds() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("update checks set ok = true"));

    integration.execute(None, None, None).await.unwrap();

    assert_eq!(connection.open_calls(), 1);
    assert_eq!(service.calls()[0].query, "update checks set ok = true");
}

#[tokio::test]
async fn test_query_returns_service_rows_unchanged() {
    let rows = vec![
        Record::new().with("id", 1).with("name", "api"),
        Record::new().with("id", 2).with("name", Value::Null),
    ];
    let connection = MockConnection::new();
    let service = MockQueryService::new().with_rows(rows.clone());
    let integration = integration_with(&connection, &service, Some("select * from watchers"));

    let records: Vec<Record> = integration
        .query_records(None, None, None)
        .await
        .unwrap()
        .collect();

    assert_eq!(records, rows);
}

#[tokio::test]
async fn test_query_without_rows_is_empty() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("select * from watchers"));

    let rows = integration
        .query::<serde_json::Value>(None, None, None)
        .await
        .unwrap();

    assert!(rows.is_empty());
    assert_eq!(rows.count(), 0);
}

#[tokio::test]
async fn test_no_query_anywhere_is_usage_error() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, None);

    let err = integration
        .query::<serde_json::Value>(None, None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, IntegrationError::Usage(_)));
    assert_eq!(connection.open_calls(), 0);
}

#[tokio::test]
async fn test_defaults_apply_when_not_overridden() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let mut params = Parameters::new();
    params.insert("watcher".to_string(), Value::from("api"));

    let config = SqlIntegrationConfiguration::create(CONNECTION_STRING)
        .unwrap()
        .with_query("insert into events (watcher) values (@watcher)")
        .unwrap()
        .with_parameters(params.clone())
        .unwrap()
        .with_timeout(Duration::from_secs(15))
        .unwrap()
        .with_connection_provider(connection.provider())
        .with_query_service_provider(service.provider())
        .build();
    let integration = SqlIntegration::new(config);

    integration.execute(None, None, None).await.unwrap();
    integration
        .execute(None, Some(&Parameters::new()), None)
        .await
        .unwrap();

    let calls = service.calls();
    assert_eq!(calls[0].parameters, params);
    assert_eq!(calls[0].timeout, Some(Duration::from_secs(15)));
    // An empty per-call map still replaces the defaults
    assert!(calls[1].parameters.is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_open_their_own_connection() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("select 1"));

    let results = join_all((0..8).map(|_| integration.execute(None, None, None))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(connection.open_calls(), 8);
    assert_eq!(service.calls().len(), 8);
}

#[tokio::test]
async fn test_integration_can_be_shared_across_tasks() {
    let connection = MockConnection::new();
    let service = MockQueryService::new();
    let integration = integration_with(&connection, &service, Some("select 1"));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let integration = integration.clone();
            tokio::spawn(async move { integration.execute(None, None, None).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(connection.open_calls(), 4);
}
