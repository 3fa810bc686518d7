pub mod cargos;
pub mod funcionarios;

use assim_storage::{Messages, StorageError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Parse a JSON request body. Malformed input is a validation error.
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, StorageError> {
    serde_json::from_str(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        StorageError::Validation(format!("{}: {}", Messages::INVALID_BODY, e))
    })
}

pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<Value> {
    Ok(serde_json::to_value(value)?)
}
