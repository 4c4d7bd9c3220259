//! End-to-end tests against SQLite with the default collaborators.

use pretty_assertions::assert_eq;
use serde::Deserialize;
use watch_sql::db::{Parameters, Value};
use watch_sql::error::ErrorKind;
use watch_sql::integration::{SqlIntegration, SqlIntegrationConfiguration};

#[derive(Debug, Deserialize, PartialEq)]
struct Check {
    name: String,
    healthy: bool,
    latency_ms: Option<f64>,
}

/// Each call opens a fresh connection, so tests share a database file.
fn file_integration(dir: &tempfile::TempDir) -> SqlIntegration {
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("checks.db").display()
    );
    SqlIntegration::create(Some(
        SqlIntegrationConfiguration::create(url).unwrap().build(),
    ))
    .unwrap()
}

fn params(pairs: &[(&str, Value)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_execute_then_query() {
    let dir = tempfile::tempdir().unwrap();
    let integration = file_integration(&dir);

    integration
        .execute(
            Some(
                "create table checks \
                 (name text not null, healthy boolean not null, latency_ms real)",
            ),
            None,
            None,
        )
        .await
        .unwrap();

    let insert =
        "insert into checks (name, healthy, latency_ms) values (@name, @healthy, @latency)";
    integration
        .execute(
            Some(insert),
            Some(&params(&[
                ("name", "api".into()),
                ("healthy", true.into()),
                ("latency", 12.5.into()),
            ])),
            None,
        )
        .await
        .unwrap();
    integration
        .execute(
            Some(insert),
            Some(&params(&[
                ("name", "db".into()),
                ("healthy", false.into()),
                ("latency", Value::Null),
            ])),
            None,
        )
        .await
        .unwrap();

    let checks: Vec<Check> = integration
        .query(
            Some("select name, healthy, latency_ms from checks order by name"),
            None,
            None,
        )
        .await
        .unwrap()
        .collect();

    assert_eq!(
        checks,
        vec![
            Check {
                name: "api".to_string(),
                healthy: true,
                latency_ms: Some(12.5),
            },
            Check {
                name: "db".to_string(),
                healthy: false,
                latency_ms: None,
            },
        ]
    );
}

#[tokio::test]
async fn test_query_with_no_matches_is_empty() {
    let integration = SqlIntegration::new(
        SqlIntegrationConfiguration::create("sqlite::memory:")
            .unwrap()
            .build(),
    );

    let rows = integration
        .query::<serde_json::Value>(Some("select 1 as one where 1 = 0"), None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 0);
}

#[tokio::test]
async fn test_sql_error_is_integration_error() {
    let integration = SqlIntegration::new(
        SqlIntegrationConfiguration::create("sqlite::memory:")
            .unwrap()
            .with_query("select * from nonexistent_table_xyz")
            .unwrap()
            .build(),
    );

    let err = integration.execute(None, None, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_missing_parameter_is_integration_error() {
    let integration = SqlIntegration::new(
        SqlIntegrationConfiguration::create("sqlite::memory:")
            .unwrap()
            .build(),
    );

    let err = integration
        .query::<serde_json::Value>(Some("select @missing as x"), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
}

#[tokio::test]
async fn test_unreachable_sqlite_file_fails_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=ro",
        dir.path().join("does-not-exist.db").display()
    );
    let integration =
        SqlIntegration::new(SqlIntegrationConfiguration::create(url).unwrap().build());

    let err = integration
        .execute(Some("select 1"), None, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Execution);
    assert!(err.to_string().contains("opening the SQL connection"));
}
