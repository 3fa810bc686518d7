//! Dialect-neutral cursor over one pooled connection.
//!
//! A cursor is acquired from [`Database::cursor`](crate::Database::cursor)
//! (autocommit) or [`Database::begin`](crate::Database::begin)
//! (transactional). The connection goes back to the pool when the cursor is
//! dropped. A transactional cursor dropped without `commit` rolls back.
//!
//! Statements use `?` placeholders in every dialect. Rows come back as
//! [`Record`]s keyed by column name, whatever the driver.

#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Encode, Transaction, Type};
use std::collections::BTreeMap;

/// A bound statement parameter.
///
/// NULLs carry their type so PostgreSQL can infer the parameter type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
}

macro_rules! impl_from_param {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for SqlParam {
            fn from(value: $ty) -> Self {
                SqlParam::$variant(Some(value.into()))
            }
        }

        impl From<Option<$ty>> for SqlParam {
            fn from(value: Option<$ty>) -> Self {
                SqlParam::$variant(value.map(Into::into))
            }
        }
    };
}

impl_from_param!(Int, i64);
impl_from_param!(Float, f64);
impl_from_param!(Text, String);
impl_from_param!(Bool, bool);
impl_from_param!(Date, NaiveDate);

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(Some(value.to_string()))
    }
}

impl From<Option<&str>> for SqlParam {
    fn from(value: Option<&str>) -> Self {
        SqlParam::Text(value.map(str::to_string))
    }
}

/// Build a `&[SqlParam]` from heterogeneous values.
#[macro_export]
macro_rules! params {
    () => { &[] as &[$crate::cursor::SqlParam] };
    ($($value:expr),+ $(,)?) => {
        &[$($crate::cursor::SqlParam::from($value)),+] as &[$crate::cursor::SqlParam]
    };
}

/// A decoded column value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

/// One result row, column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    columns: BTreeMap<String, SqlValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    /// Raw value, `None` if the column is absent.
    pub fn raw(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Typed read of a column.
    ///
    /// # Errors
    /// `StorageError::Decode` if the column is missing, unexpectedly NULL,
    /// or holds a value of another type.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> StorageResult<T> {
        let value = self.columns.get(column).ok_or_else(|| StorageError::Decode {
            column: column.to_string(),
            message: "column not present in row".to_string(),
        })?;

        T::from_sql_value(value).map_err(|message| StorageError::Decode {
            column: column.to_string(),
            message,
        })
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Conversion out of a [`SqlValue`].
///
/// Lenient where drivers disagree: integers read as floats and booleans,
/// text reads as dates and timestamps.
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &SqlValue) -> String {
    match value {
        SqlValue::Null => format!("expected {expected}, found NULL"),
        other => format!("expected {expected}, found {other:?}"),
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Int(v) => Ok(*v),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Float(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch("number", other)),
        }
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Text(v) => Ok(v.clone()),
            other => Err(mismatch("text", other)),
        }
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Bool(v) => Ok(*v),
            SqlValue::Int(v) => Ok(*v != 0),
            other => Err(mismatch("boolean", other)),
        }
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Date(v) => Ok(*v),
            SqlValue::Timestamp(v) => Ok(v.date()),
            SqlValue::Text(v) => NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|e| format!("invalid date {v:?}: {e}")),
            other => Err(mismatch("date", other)),
        }
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Timestamp(v) => Ok(*v),
            SqlValue::Text(v) => {
                let v = v.trim();
                NaiveDateTime::parse_from_str(v, "%Y-%m-%d %H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(v, "%Y-%m-%dT%H:%M:%S%.f"))
                    .map_err(|e| format!("invalid timestamp {v:?}: {e}"))
            }
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, String> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

/// Uniform statement execution over any dialect.
pub trait Cursor {
    /// Every row of a query.
    async fn fetch_all(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Vec<Record>>;

    /// The first row, if any.
    async fn fetch_optional(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<Record>>;

    /// Exactly one row; `sqlx::Error::RowNotFound` otherwise.
    async fn fetch_one(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Record> {
        self.fetch_optional(sql, params)
            .await?
            .ok_or(StorageError::Database(sqlx::Error::RowNotFound))
    }

    /// Run a statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<u64>;

    /// Run an `INSERT` and report the generated `id`.
    ///
    /// `None` when the driver has no id to report.
    async fn insert(&mut self, sql: &str, params: &[SqlParam]) -> StorageResult<Option<i64>>;

    /// Commit a transactional cursor. No-op in autocommit mode.
    async fn commit(self) -> StorageResult<()>;

    /// Roll back a transactional cursor. No-op in autocommit mode.
    async fn rollback(self) -> StorageResult<()>;
}

/// The connection a backend cursor runs its statements on.
pub(crate) enum Scope<DB: sqlx::Database> {
    Pooled(PoolConnection<DB>),
    Transaction(Transaction<'static, DB>),
}

impl<DB: sqlx::Database> Scope<DB> {
    pub(crate) fn connection(&mut self) -> &mut DB::Connection {
        match self {
            Scope::Pooled(conn) => &mut **conn,
            Scope::Transaction(tx) => &mut **tx,
        }
    }

    pub(crate) async fn commit(self) -> StorageResult<()> {
        if let Scope::Transaction(tx) = self {
            tx.commit().await?;
        }
        Ok(())
    }

    pub(crate) async fn rollback(self) -> StorageResult<()> {
        if let Scope::Transaction(tx) = self {
            tx.rollback().await?;
        }
        Ok(())
    }
}

/// Bind `params` in order onto a query.
pub(crate) fn bind_params<'q, DB>(
    mut query: Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>,
    params: &[SqlParam],
) -> Query<'q, DB, <DB as sqlx::Database>::Arguments<'q>>
where
    DB: sqlx::Database,
    Option<i64>: Encode<'q, DB> + Type<DB>,
    Option<f64>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
    Option<bool>: Encode<'q, DB> + Type<DB>,
    Option<NaiveDate>: Encode<'q, DB> + Type<DB>,
{
    for param in params {
        query = match param.clone() {
            SqlParam::Int(v) => query.bind(v),
            SqlParam::Float(v) => query.bind(v),
            SqlParam::Text(v) => query.bind(v),
            SqlParam::Bool(v) => query.bind(v),
            SqlParam::Date(v) => query.bind(v),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        let mut record = Record::new();
        record.insert("id", SqlValue::Int(3));
        record.insert("salario", SqlValue::Int(3200));
        record.insert("ativo", SqlValue::Int(1));
        record.insert("descricao", SqlValue::Null);
        record.insert("data_nascimento", SqlValue::Text("1990-05-17".into()));
        record.insert("created_at", SqlValue::Text("2025-01-02 10:30:00".into()));
        record
    }

    #[test]
    fn test_record_typed_reads() {
        let record = sample();

        assert_eq!(record.get::<i64>("id").unwrap(), 3);
        assert_eq!(record.get::<f64>("salario").unwrap(), 3200.0);
        assert!(record.get::<bool>("ativo").unwrap());
        assert_eq!(record.get::<Option<String>>("descricao").unwrap(), None);
        assert_eq!(
            record.get::<NaiveDate>("data_nascimento").unwrap(),
            NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()
        );
        assert_eq!(
            record.get::<NaiveDateTime>("created_at").unwrap().to_string(),
            "2025-01-02 10:30:00"
        );
    }

    #[test]
    fn test_record_decode_errors() {
        let record = sample();

        assert!(matches!(
            record.get::<String>("descricao"),
            Err(StorageError::Decode { ref column, .. }) if column == "descricao"
        ));
        assert!(matches!(record.get::<i64>("missing"), Err(StorageError::Decode { .. })));
        assert!(matches!(record.get::<String>("id"), Err(StorageError::Decode { .. })));
    }

    #[test]
    fn test_record_serializes_as_object() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["descricao"], serde_json::Value::Null);
        assert_eq!(json["data_nascimento"], "1990-05-17");
    }

    #[test]
    fn test_params_macro() {
        let params = params!["Ana", 7_i64, None::<String>, true];

        assert_eq!(params.len(), 4);
        assert_eq!(params[0], SqlParam::Text(Some("Ana".into())));
        assert_eq!(params[1], SqlParam::Int(Some(7)));
        assert_eq!(params[2], SqlParam::Text(None));
        assert_eq!(params[3], SqlParam::Bool(Some(true)));
        assert!(params!().is_empty());
    }
}
