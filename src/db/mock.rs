//! Test doubles for the database capabilities.
//!
//! [`MockConnection`] and [`MockQueryService`] share their state between clones,
//! so a test can hand a clone to the integration and inspect the original
//! afterwards.

use super::{
    BoundStatement, ConnectionProvider, ConnectionString, DbConnection, Parameters,
    PlaceholderStyle, QueryService, QueryServiceProvider, Record,
};
use crate::error::DriverResult;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct ConnectionState {
    opens: AtomicUsize,
    statements: Mutex<Vec<BoundStatement>>,
}

/// An in-memory connection that records what happens to it.
#[derive(Clone)]
pub struct MockConnection {
    state: Arc<ConnectionState>,
    open_error: Option<String>,
    statement_error: Option<String>,
    rows: Vec<Record>,
    delay: Option<Duration>,
    style: PlaceholderStyle,
}

impl MockConnection {
    /// Creates a connection that opens and runs every statement successfully.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            open_error: None,
            statement_error: None,
            rows: Vec::new(),
            delay: None,
            style: PlaceholderStyle::Dollar,
        }
    }

    /// Creates a connection whose `open` always fails with `message`.
    pub fn failing_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::new()
        }
    }

    /// Makes every statement fail with `message`.
    pub fn with_statement_error(mut self, message: impl Into<String>) -> Self {
        self.statement_error = Some(message.into());
        self
    }

    /// Rows returned by `fetch_all`.
    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    /// Delays every statement by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Number of times `open` was called on this connection or any clone.
    pub fn open_calls(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Statements received so far, in order.
    pub fn statements(&self) -> Vec<BoundStatement> {
        lock(&self.state.statements).clone()
    }

    /// A provider that hands out clones of this connection.
    pub fn provider(&self) -> impl ConnectionProvider + 'static {
        let connection = self.clone();
        move |_: &ConnectionString| -> Box<dyn DbConnection> { Box::new(connection.clone()) }
    }

    async fn run(&self, statement: &BoundStatement) -> DriverResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.state.statements).push(statement.clone());
        match &self.statement_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DbConnection for MockConnection {
    async fn open(&mut self) -> DriverResult<()> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        match &self.open_error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }

    async fn execute(&mut self, statement: &BoundStatement) -> DriverResult<u64> {
        self.run(statement).await?;
        Ok(1)
    }

    async fn fetch_all(&mut self, statement: &BoundStatement) -> DriverResult<Vec<Record>> {
        self.run(statement).await?;
        Ok(self.rows.clone())
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

/// A call received by [`MockQueryService`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub query: String,
    pub parameters: Parameters,
    pub timeout: Option<Duration>,
}

/// A query service that records its calls and returns canned results.
///
/// It never touches the connection it is given.
#[derive(Clone, Default)]
pub struct MockQueryService {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    error: Option<String>,
    rows: Vec<Record>,
}

impl MockQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service whose `execute` and `query` always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Rows returned by `query`.
    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// A provider that hands out this service.
    pub fn provider(&self) -> impl QueryServiceProvider + 'static {
        let service: Arc<dyn QueryService> = Arc::new(self.clone());
        move || Arc::clone(&service)
    }

    fn record(
        &self,
        operation: &'static str,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<()> {
        lock(&self.calls).push(RecordedCall {
            operation,
            query: query.to_string(),
            parameters: parameters.clone(),
            timeout,
        });
        match &self.error {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn execute(
        &self,
        _connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<u64> {
        self.record("execute", query, parameters, timeout)?;
        Ok(0)
    }

    async fn query(
        &self,
        _connection: &mut dyn DbConnection,
        query: &str,
        parameters: &Parameters,
        timeout: Option<Duration>,
    ) -> DriverResult<Vec<Record>> {
        self.record("query", query, parameters, timeout)?;
        Ok(self.rows.clone())
    }
}
