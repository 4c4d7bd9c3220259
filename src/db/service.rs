//! Default query service.

use super::{BoundStatement, DbConnection, Parameters, QueryService, Record};
use crate::error::DriverResult;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Binds named parameters and runs statements on the given connection,
/// enforcing the per-call timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlQueryService;

impl SqlQueryService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryService for SqlQueryService {
    async fn execute(
        &self,
        connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<u64> {
        let style = connection.placeholder_style();
        let statement = BoundStatement::prepare(query, parameters, style)?;
        debug!(values = statement.values.len(), "Executing statement");
        with_timeout(timeout, connection.execute(&statement)).await
    }

    async fn query(
        &self,
        connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<Vec<Record>> {
        let style = connection.placeholder_style();
        let statement = BoundStatement::prepare(query, parameters, style)?;
        debug!(values = statement.values.len(), "Running query");
        with_timeout(timeout, connection.fetch_all(&statement)).await
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> DriverResult<T>
where
    F: Future<Output = DriverResult<T>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| format!("Query timed out after {limit:?}"))?,
        None => fut.await,
    }
}
