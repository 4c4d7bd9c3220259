//! The SQL integration used by watchers.
//!
//! A [`SqlIntegration`] runs one statement per call on a freshly opened
//! connection. Whatever goes wrong on the database side (opening the
//! connection, running the statement, mapping the rows) is reported as
//! [`IntegrationError::Execution`], so callers need a single match arm to
//! treat the side effect as failed.

mod configuration;
mod rows;

pub use configuration::{Builder, SqlIntegrationConfiguration};
pub use rows::QueryRows;

use crate::db::{DbConnection, Parameters, Record};
use crate::error::{IntegrationError, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs SQL statements as the side effect of a check.
#[derive(Debug, Clone)]
pub struct SqlIntegration {
    configuration: SqlIntegrationConfiguration,
}

impl SqlIntegration {
    /// Creates an integration, failing when no configuration was provided.
    pub fn create(configuration: Option<SqlIntegrationConfiguration>) -> Result<Self> {
        configuration.map(Self::new).ok_or_else(|| {
            IntegrationError::config("SQL integration configuration has not been provided.")
        })
    }

    pub fn new(configuration: SqlIntegrationConfiguration) -> Self {
        Self { configuration }
    }

    pub fn configuration(&self) -> &SqlIntegrationConfiguration {
        &self.configuration
    }

    /// Runs a statement for its effect.
    ///
    /// `None` arguments fall back to the configured defaults. Supplied values
    /// replace the defaults entirely.
    pub async fn execute(
        &self,
        query: Option<&str>,
        parameters: Option<&Parameters>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let query = self.resolve_query(query)?;
        let parameters = parameters.unwrap_or(self.configuration.parameters());
        let timeout = timeout.or(self.configuration.timeout());

        let mut connection = self.open_connection().await?;
        let service = self.configuration.query_service_provider().provide();
        match service
            .execute(&mut *connection, query, parameters, timeout)
            .await
        {
            Ok(affected) => {
                debug!(affected, "SQL statement executed");
                Ok(())
            }
            Err(e) => {
                warn!("SQL statement failed: {e}");
                Err(IntegrationError::execution(
                    "There was an error while executing the SQL statement.",
                    e,
                ))
            }
        }
    }

    /// Runs a query and maps every row into `T` through serde.
    ///
    /// Rows are deserialized from a JSON object keyed by column name, so `T`
    /// can be a struct with matching field names, a map, or `serde_json::Value`.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: Option<&str>,
        parameters: Option<&Parameters>,
        timeout: Option<Duration>,
    ) -> Result<QueryRows<T>> {
        let records = self.query_records(query, parameters, timeout).await?;

        let mut mapped = Vec::with_capacity(records.len());
        for (index, record) in records.enumerate() {
            let row = serde_json::from_value(serde_json::Value::Object(record.to_json()))
                .map_err(|e| {
                    warn!("Could not map SQL row {index}: {e}");
                    IntegrationError::execution(
                        format!("There was an error while mapping SQL row {index}."),
                        e,
                    )
                })?;
            mapped.push(row);
        }
        Ok(QueryRows::new(mapped))
    }

    /// Runs a query and returns the rows as they came from the query service.
    pub async fn query_records(
        &self,
        query: Option<&str>,
        parameters: Option<&Parameters>,
        timeout: Option<Duration>,
    ) -> Result<QueryRows<Record>> {
        let query = self.resolve_query(query)?;
        let parameters = parameters.unwrap_or(self.configuration.parameters());
        let timeout = timeout.or(self.configuration.timeout());

        let mut connection = self.open_connection().await?;
        let service = self.configuration.query_service_provider().provide();
        match service
            .query(&mut *connection, query, parameters, timeout)
            .await
        {
            Ok(records) => {
                debug!(rows = records.len(), "SQL query executed");
                Ok(QueryRows::new(records))
            }
            Err(e) => {
                warn!("SQL query failed: {e}");
                Err(IntegrationError::execution(
                    "There was an error while executing the SQL query.",
                    e,
                ))
            }
        }
    }

    /// Picks the per-call query, falling back to the configured one.
    ///
    /// A blank per-call query counts as not supplied.
    fn resolve_query<'a>(&'a self, query: Option<&'a str>) -> Result<&'a str> {
        query
            .filter(|q| !q.trim().is_empty())
            .or(self.configuration.query())
            .ok_or_else(|| {
                IntegrationError::usage(
                    "SQL query has not been provided and no default query is configured.",
                )
            })
    }

    /// Acquires a connection and opens it. The open is attempted exactly once.
    async fn open_connection(&self) -> Result<Box<dyn DbConnection>> {
        let connection_string = self.configuration.connection_string();
        let mut connection = self
            .configuration
            .connection_provider()
            .connect(connection_string);

        debug!("Opening SQL connection to {connection_string}");
        if let Err(e) = connection.open().await {
            warn!("Could not open SQL connection to {connection_string}: {e}");
            return Err(IntegrationError::execution(
                "There was an error while opening the SQL connection.",
                e,
            ));
        }
        Ok(connection)
    }
}
