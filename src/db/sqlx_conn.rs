//! sqlx-backed connections for PostgreSQL and SQLite.
//!
//! Each handle owns a single unpooled connection, established on `open`.

use super::{
    Backend, BoundStatement, ConnectionProvider, ConnectionString, DbConnection,
    PlaceholderStyle, Record, Value,
};
use crate::error::DriverResult;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive as _;
use rust_decimal::Decimal;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgConnection, PgRow};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono::SecondsFormat;
use sqlx::types::{Json, Uuid};
use sqlx::{Column as _, ConnectOptions, Postgres, Row as _, Sqlite, TypeInfo as _, ValueRef as _};
use std::str::FromStr;
use tracing::debug;

/// Default provider: one [`SqlxConnection`] per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxConnectionProvider;

impl ConnectionProvider for SqlxConnectionProvider {
    fn connect(&self, connection_string: &ConnectionString) -> Box<dyn DbConnection> {
        Box::new(SqlxConnection::new(connection_string.clone()))
    }
}

enum Inner {
    Closed,
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
}

/// A PostgreSQL or SQLite connection chosen by the connection string.
pub struct SqlxConnection {
    target: ConnectionString,
    inner: Inner,
}

impl SqlxConnection {
    /// Creates a closed connection handle.
    pub fn new(target: ConnectionString) -> Self {
        Self {
            target,
            inner: Inner::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.inner, Inner::Closed)
    }

    fn postgres_options(&self) -> DriverResult<PgConnectOptions> {
        let Some(settings) = self.target.server_settings() else {
            return Ok(PgConnectOptions::from_str(self.target.as_str())?);
        };

        if self.target.keyword("integrated security").is_some() {
            debug!("Ignoring 'Integrated Security', not supported by PostgreSQL");
        }

        let mut options = PgConnectOptions::new().host(&settings.host);
        if let Some(port) = settings.port {
            options = options.port(port);
        }
        if let Some(database) = &settings.database {
            options = options.database(database);
        }
        if let Some(user) = &settings.user {
            options = options.username(user);
        }
        if let Some(password) = &settings.password {
            options = options.password(password);
        }
        Ok(options)
    }
}

#[async_trait]
impl DbConnection for SqlxConnection {
    async fn open(&mut self) -> DriverResult<()> {
        if self.is_open() {
            return Ok(());
        }

        debug!("Opening connection to {}", self.target);
        self.inner = match self.target.backend() {
            Backend::Postgres => Inner::Postgres(self.postgres_options()?.connect().await?),
            Backend::Sqlite => {
                let options = SqliteConnectOptions::from_str(self.target.as_str())?;
                Inner::Sqlite(options.connect().await?)
            }
        };
        Ok(())
    }

    async fn execute(&mut self, statement: &BoundStatement) -> DriverResult<u64> {
        let affected = match &mut self.inner {
            Inner::Closed => return Err(not_open()),
            Inner::Postgres(conn) => bind_postgres(sqlx::query(&statement.sql), &statement.values)
                .execute(&mut *conn)
                .await?
                .rows_affected(),
            Inner::Sqlite(conn) => bind_sqlite(sqlx::query(&statement.sql), &statement.values)
                .execute(&mut *conn)
                .await?
                .rows_affected(),
        };
        Ok(affected)
    }

    async fn fetch_all(&mut self, statement: &BoundStatement) -> DriverResult<Vec<Record>> {
        let records = match &mut self.inner {
            Inner::Closed => return Err(not_open()),
            Inner::Postgres(conn) => bind_postgres(sqlx::query(&statement.sql), &statement.values)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(convert_pg_row)
                .collect::<DriverResult<_>>()?,
            Inner::Sqlite(conn) => bind_sqlite(sqlx::query(&statement.sql), &statement.values)
                .fetch_all(&mut *conn)
                .await?
                .iter()
                .map(convert_sqlite_row)
                .collect::<DriverResult<_>>()?,
        };
        Ok(records)
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        match self.target.backend() {
            Backend::Postgres => PlaceholderStyle::Dollar,
            Backend::Sqlite => PlaceholderStyle::Question,
        }
    }
}

fn not_open() -> crate::error::BoxError {
    "connection is not open".into()
}

fn bind_postgres<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    values: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Json(j) => query.bind(Json(j)),
        };
    }
    query
}

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            Value::Json(j) => query.bind(j.to_string()),
        };
    }
    query
}

/// Converts a sqlx PgRow to a Record.
fn convert_pg_row(row: &PgRow) -> DriverResult<Record> {
    let mut record = Record::new();
    for (i, col) in row.columns().iter().enumerate() {
        record.push(col.name(), convert_pg_value(row, i, col.type_info().name())?);
    }
    Ok(record)
}

/// Converts a single column value from a PgRow, by column type.
///
/// Temporal and UUID values become strings (RFC 3339 for `TIMESTAMPTZ`).
/// `NUMERIC` becomes an integer when it has no fraction, otherwise a float.
/// A type with no conversion here is decoded as text, and fails if the
/// driver refuses that.
fn convert_pg_value(row: &PgRow, index: usize, type_name: &str) -> DriverResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let value: Value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<bool, _>(index)?.into(),
        "INT2" | "SMALLINT" => i64::from(row.try_get::<i16, _>(index)?).into(),
        "INT4" | "INT" | "INTEGER" => i64::from(row.try_get::<i32, _>(index)?).into(),
        "INT8" | "BIGINT" => row.try_get::<i64, _>(index)?.into(),
        "OID" => i64::from(row.try_get::<Oid, _>(index)?.0).into(),
        "FLOAT4" | "REAL" => f64::from(row.try_get::<f32, _>(index)?).into(),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<f64, _>(index)?.into(),
        "NUMERIC" | "DECIMAL" => convert_decimal(row.try_get::<Decimal, _>(index)?),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index)?.into(),
        "UUID" => row.try_get::<Uuid, _>(index)?.to_string().into(),
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index)?.into(),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)?
            .to_rfc3339_opts(SecondsFormat::AutoSi, true)
            .into(),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)?
            .format("%Y-%m-%dT%H:%M:%S%.f")
            .to_string()
            .into(),
        "DATE" => row.try_get::<NaiveDate, _>(index)?.to_string().into(),
        "TIME" => row.try_get::<NaiveTime, _>(index)?.to_string().into(),
        "VOID" => Value::Null,
        _ => row.try_get::<String, _>(index)?.into(),
    };
    Ok(value)
}

fn convert_decimal(d: Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return Value::Int(i);
        }
    }
    d.to_f64()
        .map(Value::Float)
        .unwrap_or_else(|| Value::String(d.to_string()))
}

/// Converts a sqlx SqliteRow to a Record.
fn convert_sqlite_row(row: &SqliteRow) -> DriverResult<Record> {
    let mut record = Record::new();
    for (i, col) in row.columns().iter().enumerate() {
        record.push(col.name(), convert_sqlite_value(row, i, col.type_info().name())?);
    }
    Ok(record)
}

/// SQLite is dynamically typed: booleans are recognised by the declared column
/// type, everything else by the storage class of the value itself.
fn convert_sqlite_value(row: &SqliteRow, index: usize, declared: &str) -> DriverResult<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_uppercase();

    if declared.eq_ignore_ascii_case("BOOLEAN") {
        if let Ok(b) = row.try_get::<bool, _>(index) {
            return Ok(Value::Bool(b));
        }
    }

    let value: Value = match storage.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row.try_get::<i64, _>(index)?.into(),
        "REAL" => row.try_get::<f64, _>(index)?.into(),
        "BLOB" => row.try_get::<Vec<u8>, _>(index)?.into(),
        _ => row.try_get::<String, _>(index)?.into(),
    };
    Ok(value)
}
