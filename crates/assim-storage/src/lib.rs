//! Storage layer for the Assim Saúde HR records.
//!
//! This crate persists job roles (`cargos`) and employees (`funcionarios`)
//! on MySQL, PostgreSQL or SQLite behind one dialect-neutral API.
//!
//! # Architecture
//!
//! - [`Database`] - Connection context for the selected dialect, with bounded
//!   connection retry and embedded migrations
//! - [`Cursor`] - Scoped statement execution returning [`Record`]s keyed by column
//! - [`RoleRepository`], [`EmployeeRepository`] - Data access traits
//! - [`StorageError`] - Errors classified by [`ErrorKind`], each mapped to an HTTP status
//!
//! # Core Concepts
//!
//! ## Dialect Selection
//!
//! The URL scheme picks the driver: `postgres://` and `postgresql://` select
//! PostgreSQL, `sqlite:` selects SQLite, anything else is MySQL. Without a
//! URL, discrete `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`
//! variables describe a MySQL server. See [`DatabaseConfig::from_env`].
//!
//! ## Validation Before Storage
//!
//! Input is validated (required fields, lengths, CPF check digits) before any
//! statement runs. Uniqueness and role references are checked inside the same
//! transaction as the write; a violation the driver still reports is
//! translated into [`StorageError::Conflict`].
//!
//! # Examples
//!
//! ```no_run
//! use assim_storage::{Database, DatabaseConfig, RoleRepository, SqlRoleRepository};
//! use assim_storage::{EmployeeRepository, SqlEmployeeRepository};
//! use assim_storage::models::{EmployeeFilter, NewEmployee, NewRole};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect(&DatabaseConfig::from_env()?).await?;
//!
//! let roles = SqlRoleRepository::new(db.clone());
//! let cargo_id = roles.create(&NewRole::new("Enfermeiro", 3200.0)).await?;
//!
//! let employees = SqlEmployeeRepository::new(db.clone());
//! let mut hire = NewEmployee::new("Ana Silva", "111.444.777-35");
//! hire.cargo_id = cargo_id;
//! employees.create(&hire).await?;
//!
//! for employee in employees.list(&EmployeeFilter::default().nome("Silva")).await? {
//!     println!("{} - {:?}", employee.nome, employee.cargo);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod cursor;
pub mod error;
pub mod messages;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig, DbCursor, Dialect, RetryPolicy};
pub use cursor::{Cursor, Record, SqlParam, SqlValue};
pub use error::{ErrorKind, StorageError, StorageResult};
pub use messages::Messages;
pub use models::{Employee, EmployeeFilter, EmployeePatch, NewEmployee, NewRole, Role, RolePatch};
pub use repositories::{
    EmployeeRepository, RoleRepository, SqlEmployeeRepository, SqlRoleRepository,
};
