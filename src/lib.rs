//! watch-sql - run SQL statements as the side effect of health checks.
//!
//! ```no_run
//! # async fn demo() -> watch_sql::error::Result<()> {
//! use watch_sql::integration::{SqlIntegration, SqlIntegrationConfiguration};
//!
//! let configuration = SqlIntegrationConfiguration::create("postgres://watcher@localhost/metrics")?
//!     .with_query("insert into checks (healthy) values (false)")?
//!     .build();
//! let integration = SqlIntegration::create(Some(configuration))?;
//! integration.execute(None, None, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod integration;
pub mod logging;
