use super::{parse_body, to_json};
use anyhow::Result;
use assim_storage::models::{NewRole, RolePatch};
use assim_storage::{Database, Messages, RoleRepository, SqlRoleRepository, StorageError};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

#[derive(Args, Debug)]
pub struct CargosArgs {
    #[command(subcommand)]
    pub command: CargosCommand,
}

#[derive(Subcommand, Debug)]
pub enum CargosCommand {
    /// List roles whose name contains the filter (case-sensitive), newest first
    List {
        #[arg(long, default_value = "")]
        nome: String,
    },
    /// Show one role
    Show { id: i64 },
    /// Create a role from a JSON body, e.g. '{"nome": "Enfermeiro", "salario": 3200}'
    Create { dados: String },
    /// Update only the fields present in a JSON body
    Update { id: i64, dados: String },
    /// Delete a role that no employee references
    Delete { id: i64 },
}

pub async fn run(db: Database, args: CargosArgs) -> Result<Value> {
    let repo = SqlRoleRepository::new(db);

    match args.command {
        CargosCommand::List { nome } => to_json(&repo.list(&nome).await?),
        CargosCommand::Show { id } => {
            let role = repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| StorageError::not_found("Cargo", id))?;
            to_json(&role)
        }
        CargosCommand::Create { dados } => {
            let role: NewRole = parse_body(&dados)?;
            let id = repo.create(&role).await?;
            Ok(json!({ "id": id }))
        }
        CargosCommand::Update { id, dados } => {
            let patch: RolePatch = parse_body(&dados)?;
            if patch.is_empty() {
                return Err(StorageError::Validation(Messages::NOTHING_TO_UPDATE.to_string()).into());
            }
            to_json(&repo.update(id, &patch).await?)
        }
        CargosCommand::Delete { id } => {
            repo.delete(id).await?;
            Ok(json!({ "id": id, "excluido": true }))
        }
    }
}
