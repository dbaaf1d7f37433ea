//! SQLite connection provider built on sqlx.

use futures::{Stream, TryStreamExt};
use oxide_rowset_core::{CompiledQuery, Error, Result, SqlValue};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{
    Column as _, ConnectOptions as _, Row as _, Sqlite, SqliteConnection, TypeInfo as _,
    ValueRef as _,
};
use tracing::{debug, trace};

use crate::config::Config;
use crate::connection::{Connection, Record, RecordStream};

/// A single SQLite connection owned by the caller.
#[derive(Debug)]
pub struct SqliteDriver {
    conn: SqliteConnection,
}

impl SqliteDriver {
    /// Opens a new connection.
    pub async fn connect(config: &Config) -> Result<Self> {
        debug!("Opening SQLite connection to {}", config.url);
        let conn = config
            .connect_options()?
            .connect()
            .await
            .map_err(Error::connectivity)?;
        Ok(Self { conn })
    }

    /// Wraps an already open sqlx connection.
    #[must_use]
    pub const fn from_connection(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    /// Runs unparameterized SQL (DDL, pragmas), possibly several statements.
    pub async fn execute_script(&mut self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&mut self.conn)
            .await
            .map_err(Error::connectivity)?;
        Ok(())
    }

    /// Returns the wrapped sqlx connection.
    #[must_use]
    pub fn into_inner(self) -> SqliteConnection {
        self.conn
    }
}

impl Connection for SqliteDriver {
    fn fetch(&mut self, query: CompiledQuery) -> RecordStream<'_> {
        trace!(sql = %query.sql, params = query.params.len(), "fetch");
        record_stream(async_stream::try_stream! {
            let CompiledQuery { sql, params } = query;
            let mut rows = bind_params(sqlx::query(&sql), params).fetch(&mut self.conn);
            while let Some(row) = rows.try_next().await.map_err(Error::connectivity)? {
                yield decode_record(&row)?;
            }
        })
    }

    async fn execute(&mut self, query: CompiledQuery) -> Result<u64> {
        trace!(sql = %query.sql, params = query.params.len(), "execute");
        let CompiledQuery { sql, params } = query;
        let result = bind_params(sqlx::query(&sql), params)
            .execute(&mut self.conn)
            .await
            .map_err(Error::connectivity)?;
        Ok(result.rows_affected())
    }
}

fn record_stream<'c, S>(stream: S) -> RecordStream<'c>
where
    S: Stream<Item = Result<Record>> + Send + 'c,
{
    Box::pin(stream)
}

/// Binds SqlValue parameters to a raw query.
fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<SqlValue>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Float(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Blob(b) => query.bind(b),
        };
    }
    query
}

/// Reads a result row into a record using each value's storage class.
fn decode_record(row: &SqliteRow) -> Result<Record> {
    let mut record = Record::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index).map_err(Error::connectivity)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => SqlValue::Int(row.try_get(index).map_err(Error::connectivity)?),
                "REAL" => SqlValue::Float(row.try_get(index).map_err(Error::connectivity)?),
                "BLOB" => SqlValue::Blob(row.try_get(index).map_err(Error::connectivity)?),
                _ => SqlValue::Text(row.try_get(index).map_err(Error::connectivity)?),
            }
        };
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}
