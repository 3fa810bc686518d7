use thiserror::Error;

/// Input rejected before it reaches the store.
///
/// Messages are user facing and kept in Portuguese.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("CPF inválido")]
    InvalidCpf,

    #[error("Campo {0} é obrigatório")]
    MissingField(&'static str),

    #[error("Campo {field} excede {max} caracteres")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Campo {field} inválido: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
