use super::{Backend, ConnectionTarget, DatabaseConfig, Dialect, connect_pool, replace_scheme};
use crate::cursor::{Cursor, Record, Scope, SqlParam, SqlValue, bind_params};
use crate::error::{StorageError, StorageResult};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlPool, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::str::FromStr;

/// MySQL-compatible store, local or hosted (ClearDB and friends).
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    fn connect_options(target: &ConnectionTarget) -> StorageResult<MySqlConnectOptions> {
        let options = match target {
            ConnectionTarget::Url(url) => {
                let url = replace_scheme(url, "mysql")?;
                MySqlConnectOptions::from_str(&url).map_err(|e| {
                    StorageError::Configuration(format!("Invalid database URL: {}", e))
                })?
            }
            ConnectionTarget::Local {
                host,
                port,
                user,
                password,
                database,
            } => MySqlConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(database),
        };

        Ok(options.charset("utf8mb4"))
    }

    /// Get a reference to the underlying connection pool
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

impl Backend for MySqlBackend {
    type Cursor = MySqlCursor;

    async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let options = Self::connect_options(&config.target)?;
        let pool = connect_pool::<MySql>(config, options).await?;
        Ok(Self { pool })
    }

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn cursor(&self) -> StorageResult<MySqlCursor> {
        Ok(MySqlCursor {
            scope: Scope::Pooled(self.pool.acquire().await?),
        })
    }

    async fn begin(&self) -> StorageResult<MySqlCursor> {
        Ok(MySqlCursor {
            scope: Scope::Transaction(self.pool.begin().await?),
        })
    }

    async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("../../migrations/mysql")
            .run(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct MySqlCursor {
    scope: Scope<MySql>,
}

impl Cursor for MySqlCursor {
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Vec<Record>> {
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(self.scope.connection())
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<Record>> {
        let row = bind_params(sqlx::query(sql), params)
            .fetch_optional(self.scope.connection())
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<u64> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(self.scope.connection())
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<i64>> {
        let result = bind_params(sqlx::query(sql), params)
            .execute(self.scope.connection())
            .await?;

        if result.rows_affected() == 0 || result.last_insert_id() == 0 {
            return Ok(None);
        }
        Ok(i64::try_from(result.last_insert_id()).ok())
    }

    async fn commit(self) -> StorageResult<()> {
        self.scope.commit().await
    }

    async fn rollback(self) -> StorageResult<()> {
        self.scope.rollback().await
    }
}

fn decode_row(row: &MySqlRow) -> StorageResult<Record> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let (is_null, type_name) = {
            let raw = row.try_get_raw(index)?;
            (raw.is_null(), raw.type_info().name().to_string())
        };

        let value = if is_null {
            SqlValue::Null
        } else {
            decode_value(row, index, column.name(), &type_name)?
        };

        record.insert(column.name(), value);
    }

    Ok(record)
}

fn decode_value(row: &MySqlRow, index: usize, column: &str, type_name: &str) -> StorageResult<SqlValue> {
    let value = match type_name {
        "BOOLEAN" => SqlValue::Bool(row.try_get_unchecked::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            SqlValue::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => {
            let value = row.try_get_unchecked::<u64, _>(index)?;
            SqlValue::Int(i64::try_from(value).map_err(|_| StorageError::Decode {
                column: column.to_string(),
                message: format!("{value} does not fit a signed integer"),
            })?)
        }
        "FLOAT" => SqlValue::Float(row.try_get_unchecked::<f32, _>(index)?.into()),
        "DOUBLE" => SqlValue::Float(row.try_get_unchecked::<f64, _>(index)?),
        "DECIMAL" => {
            let decimal = row.try_get_unchecked::<Decimal, _>(index)?;
            SqlValue::Float(decimal.to_f64().ok_or_else(|| StorageError::Decode {
                column: column.to_string(),
                message: format!("{decimal} does not fit a float"),
            })?)
        }
        "DATE" => SqlValue::Date(row.try_get_unchecked::<NaiveDate, _>(index)?),
        "DATETIME" | "TIMESTAMP" => {
            SqlValue::Timestamp(row.try_get_unchecked::<NaiveDateTime, _>(index)?)
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
            SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => SqlValue::Text(row.try_get_unchecked::<String, _>(index)?),
    };

    Ok(value)
}
