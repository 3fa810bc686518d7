pub mod employee;
pub mod role;

pub use employee::{Employee, EmployeeFilter, EmployeePatch, NewEmployee};
pub use role::{NewRole, Role, RolePatch};

use serde::{Deserialize, Deserializer};

/// Keep `null` distinct from an absent field in partial updates.
///
/// Absent stays `None` (through `#[serde(default)]`), `null` becomes
/// `Some(None)` and a value becomes `Some(Some(value))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn default_true() -> bool {
    true
}
