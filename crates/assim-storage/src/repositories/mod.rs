pub mod employee;
pub mod role;

pub use employee::{EmployeeRepository, SqlEmployeeRepository};
pub use role::{RoleRepository, SqlRoleRepository};

use crate::cursor::{Cursor, SqlParam};
use crate::error::StorageResult;

/// Run a `SELECT COUNT(*) AS total ...` statement.
pub(crate) async fn count_rows(
    cursor: &mut impl Cursor,
    sql: &str,
    params: &[SqlParam],
) -> StorageResult<i64> {
    cursor.fetch_one(sql, params).await?.get::<i64>("total")
}

/// Append `WHERE a AND b ...` when there is anything to filter on.
pub(crate) fn push_where(sql: &mut String, conditions: &[String]) {
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
}
