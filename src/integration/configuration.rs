//! Integration configuration and its validating builder.

use crate::db::{
    is_valid_parameter_name, ConnectionProvider, ConnectionString, Parameters,
    QueryServiceProvider, SqlQueryService, SqlxConnectionProvider,
};
use crate::error::{IntegrationError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Immutable settings for a [`SqlIntegration`](super::SqlIntegration).
///
/// Built with [`SqlIntegrationConfiguration::create`]; every setter validates its
/// input, so a built configuration is always usable.
#[derive(Clone)]
pub struct SqlIntegrationConfiguration {
    connection_string: ConnectionString,
    query: Option<String>,
    parameters: Parameters,
    timeout: Option<Duration>,
    connection_provider: Arc<dyn ConnectionProvider>,
    query_service_provider: Arc<dyn QueryServiceProvider>,
}

impl SqlIntegrationConfiguration {
    /// Starts a builder for the given connection string.
    ///
    /// Fails right away when the connection string is empty or malformed.
    pub fn create(connection_string: impl AsRef<str>) -> Result<Builder> {
        let connection_string = ConnectionString::parse(connection_string.as_ref())?;
        Ok(Builder {
            configuration: Self {
                connection_string,
                query: None,
                parameters: Parameters::new(),
                timeout: None,
                connection_provider: Arc::new(SqlxConnectionProvider),
                query_service_provider: Arc::new(default_query_service),
            },
        })
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.connection_string
    }

    /// Query used when a call does not supply one.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Parameters used when a call does not supply any.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn connection_provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.connection_provider
    }

    pub fn query_service_provider(&self) -> &Arc<dyn QueryServiceProvider> {
        &self.query_service_provider
    }
}

impl fmt::Debug for SqlIntegrationConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlIntegrationConfiguration")
            .field("connection_string", &self.connection_string)
            .field("query", &self.query)
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn default_query_service() -> Arc<dyn crate::db::QueryService> {
    Arc::new(SqlQueryService::new())
}

/// Builder for [`SqlIntegrationConfiguration`].
#[derive(Debug)]
pub struct Builder {
    configuration: SqlIntegrationConfiguration,
}

impl Builder {
    /// Sets the default query. Fails when the query is blank.
    pub fn with_query(mut self, query: impl Into<String>) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(IntegrationError::config("SQL query can not be empty."));
        }
        self.configuration.query = Some(query);
        Ok(self)
    }

    /// Sets the default parameters. Every name must be a valid `@name` identifier.
    pub fn with_parameters(mut self, parameters: Parameters) -> Result<Self> {
        if let Some(name) = parameters.keys().find(|k| !is_valid_parameter_name(k)) {
            return Err(IntegrationError::config(format!(
                "SQL parameter name '{name}' is invalid."
            )));
        }
        self.configuration.parameters = parameters;
        Ok(self)
    }

    /// Sets the default query timeout. Fails on a zero duration.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(IntegrationError::config(
                "SQL query timeout can not be equal to zero.",
            ));
        }
        self.configuration.timeout = Some(timeout);
        Ok(self)
    }

    /// Replaces the sqlx connection provider.
    pub fn with_connection_provider<P>(mut self, provider: P) -> Self
    where
        P: ConnectionProvider + 'static,
    {
        self.configuration.connection_provider = Arc::new(provider);
        self
    }

    /// Replaces the default query service.
    pub fn with_query_service_provider<P>(mut self, provider: P) -> Self
    where
        P: QueryServiceProvider + 'static,
    {
        self.configuration.query_service_provider = Arc::new(provider);
        self
    }

    pub fn build(self) -> SqlIntegrationConfiguration {
        self.configuration
    }
}
