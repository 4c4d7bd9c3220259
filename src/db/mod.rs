//! Database abstraction layer for watch-sql.
//!
//! The integration talks to the database through two capabilities:
//! a [`ConnectionProvider`] that turns a connection string into a
//! [`DbConnection`], and a [`QueryService`] that runs a statement on an open
//! connection. The sqlx-backed implementations are the defaults; tests swap
//! in the doubles from [`mock`].

mod connection_string;
pub mod mock;
mod params;
mod service;
mod sqlx_conn;
mod types;

pub use connection_string::{Backend, ConnectionString, ServerSettings};
pub use params::{is_valid_parameter_name, BoundStatement, PlaceholderStyle};
pub use service::SqlQueryService;
pub use sqlx_conn::{SqlxConnection, SqlxConnectionProvider};
pub use types::{Parameters, Record, Value};

use crate::error::DriverResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A single database connection handle.
///
/// Handles are created closed; [`DbConnection::open`] must succeed before
/// statements can run. The connection is released when the handle is dropped.
#[async_trait]
pub trait DbConnection: Send {
    /// Opens the connection.
    async fn open(&mut self) -> DriverResult<()>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&mut self, statement: &BoundStatement) -> DriverResult<u64>;

    /// Runs a statement and returns all result rows.
    async fn fetch_all(&mut self, statement: &BoundStatement) -> DriverResult<Vec<Record>>;

    /// Placeholder syntax understood by this connection.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
    }
}

/// Produces connection handles from a connection string.
pub trait ConnectionProvider: Send + Sync {
    fn connect(&self, connection_string: &ConnectionString) -> Box<dyn DbConnection>;
}

impl<F> ConnectionProvider for F
where
    F: Fn(&ConnectionString) -> Box<dyn DbConnection> + Send + Sync,
{
    fn connect(&self, connection_string: &ConnectionString) -> Box<dyn DbConnection> {
        self(connection_string)
    }
}

/// Runs SQL against an open connection.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Runs a statement for its effect, returning the number of affected rows.
    async fn execute(
        &self,
        connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<u64>;

    /// Runs a statement and returns its rows.
    async fn query(
        &self,
        connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<Vec<Record>>;
}

/// Produces the query service used for an invocation.
pub trait QueryServiceProvider: Send + Sync {
    fn provide(&self) -> Arc<dyn QueryService>;
}

impl<F> QueryServiceProvider for F
where
    F: Fn() -> Arc<dyn QueryService> + Send + Sync,
{
    fn provide(&self) -> Arc<dyn QueryService> {
        self()
    }
}
