//! Domain rules shared by every layer of the Assim Saúde HR store.
//!
//! Nothing in this crate touches a database. It holds the CPF checksum,
//! the field limits of the `cargos`/`funcionarios` schema and the input
//! validation applied before any write.

pub mod constants;
pub mod cpf;
pub mod error;
pub mod validation;

pub use cpf::{Cpf, normalize_cpf, validate_cpf};
pub use error::{Error, Result};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
