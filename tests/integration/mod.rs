//! Integration tests for watch-sql.

pub mod execution_test;
pub mod sqlite_test;
