//! User-facing messages for repository outcomes.
//!
//! All messages are in Portuguese (Brazilian). The API layer returns them
//! verbatim in the `erro` field of a response body.
//!
//! # Usage
//!
//! ```
//! use assim_storage::messages::Messages;
//!
//! assert_eq!(Messages::DUPLICATE_CPF, "CPF já cadastrado");
//! assert_eq!(Messages::not_found("Cargo"), "Cargo não encontrado");
//! ```

/// Messages returned to callers of the repositories.
pub struct Messages;

impl Messages {
    /// Employee insert or update hit an existing `cpf`.
    pub const DUPLICATE_CPF: &'static str = "CPF já cadastrado";

    /// Role insert or update hit an existing `nome`.
    pub const DUPLICATE_ROLE: &'static str = "Já existe um cargo com este nome";

    /// Role delete blocked by employees still pointing at it.
    pub const ROLE_IN_USE: &'static str =
        "Não é possível excluir este cargo: existem funcionários vinculados.";

    /// Employee references a `cargo_id` that does not exist.
    pub const UNKNOWN_ROLE: &'static str = "Cargo informado não existe";

    /// Update request carrying no field at all.
    pub const NOTHING_TO_UPDATE: &'static str = "Nenhum campo para atualizar";

    /// Request body is not valid JSON for the entity.
    pub const INVALID_BODY: &'static str = "Dados inválidos";

    /// Connection lost mid-operation.
    pub const DATABASE_UNAVAILABLE: &'static str = "Banco de dados indisponível";

    /// Anything the caller should not see the details of.
    pub const INTERNAL_ERROR: &'static str = "Erro interno";

    /// `"<Entidade> não encontrado"`
    pub fn not_found(entity_type: &str) -> String {
        format!("{entity_type} não encontrado")
    }
}
