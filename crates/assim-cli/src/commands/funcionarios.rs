use super::{parse_body, to_json};
use anyhow::Result;
use assim_storage::models::{EmployeeFilter, EmployeePatch, NewEmployee};
use assim_storage::{Database, EmployeeRepository, Messages, SqlEmployeeRepository, StorageError};
use clap::{Args, Subcommand};
use serde_json::{Value, json};

#[derive(Args, Debug)]
pub struct FuncionariosArgs {
    #[command(subcommand)]
    pub command: FuncionariosCommand,
}

#[derive(Subcommand, Debug)]
pub enum FuncionariosCommand {
    /// List employees, newest first. Filters are case-sensitive substrings.
    List {
        #[arg(long)]
        nome: Option<String>,
        /// Punctuation is ignored
        #[arg(long)]
        cpf: Option<String>,
    },
    /// Show one employee with its role
    Show { id: i64 },
    /// Hire from a JSON body, e.g. '{"nome": "Ana Silva", "cpf": "111.444.777-35", "cargo_id": 1}'
    Create { dados: String },
    /// Update only the fields present in a JSON body; `null` clears a field
    Update { id: i64, dados: String },
    Delete { id: i64 },
}

pub async fn run(db: Database, args: FuncionariosArgs) -> Result<Value> {
    let repo = SqlEmployeeRepository::new(db);

    match args.command {
        FuncionariosCommand::List { nome, cpf } => {
            let filter = EmployeeFilter { nome, cpf };
            to_json(&repo.list(&filter).await?)
        }
        FuncionariosCommand::Show { id } => {
            let employee = repo
                .find_by_id(id)
                .await?
                .ok_or_else(|| StorageError::not_found("Funcionário", id))?;
            to_json(&employee)
        }
        FuncionariosCommand::Create { dados } => {
            let employee: NewEmployee = parse_body(&dados)?;
            let id = repo.create(&employee).await?;
            Ok(json!({ "id": id }))
        }
        FuncionariosCommand::Update { id, dados } => {
            let patch: EmployeePatch = parse_body(&dados)?;
            if patch.is_empty() {
                return Err(StorageError::Validation(Messages::NOTHING_TO_UPDATE.to_string()).into());
            }
            to_json(&repo.update(id, &patch).await?)
        }
        FuncionariosCommand::Delete { id } => {
            repo.delete(id).await?;
            Ok(json!({ "id": id, "excluido": true }))
        }
    }
}
