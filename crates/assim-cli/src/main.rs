//! assim CLI - HR records for Assim Saúde
//!
//! Entry point that owns the database handle. It provides:
//! - Schema migration and health checks (`migrate`, `health`, `counts`)
//! - CPF checking without a database (`validate-cpf`)
//! - Role and employee CRUD (`cargos`, `funcionarios`) with JSON bodies
//!
//! Results are printed as JSON on stdout. Failures print
//! `{"erro": ..., "status": ...}` and exit non-zero.

use anyhow::Result;
use assim_core::{Cpf, validate_cpf};
use assim_storage::connection::ConnectionTarget;
use assim_storage::{
    Database, DatabaseConfig, EmployeeRepository, Messages, RoleRepository, SqlEmployeeRepository,
    SqlRoleRepository, StorageError,
};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::process::ExitCode;
use tracing::{debug, error};

mod commands;
mod tracing_setup;

use commands::cargos::CargosArgs;
use commands::funcionarios::FuncionariosArgs;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "assim",
    author,
    version,
    about = "Role and employee records for Assim Saúde",
    long_about = "Manage cargos and funcionarios on MySQL, PostgreSQL or SQLite. \
                  Without --database-url the DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_NAME \
                  variables describe a MySQL server."
)]
struct Cli {
    /// Connection URL: mysql://, postgres:// or sqlite:
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a CPF's check digits (no database needed)
    ValidateCpf { cpf: String },
    #[command(flatten)]
    Database(DatabaseCommand),
}

/// Commands that open a connection first.
#[derive(Subcommand, Debug)]
enum DatabaseCommand {
    /// Apply pending schema migrations
    Migrate,
    /// Check that the database answers
    Health,
    /// Number of roles and employees
    Counts,
    /// Job roles
    Cargos(CargosArgs),
    /// Employees
    Funcionarios(FuncionariosArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = tracing_setup::init(&TracingConfig { debug: cli.debug }) {
        eprintln!("Failed to initialize tracing: {e}");
    }

    match run(cli).await {
        Ok(value) => {
            print_json(&value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            let (message, status) = describe_error(&err);
            print_json(&json!({ "erro": message, "status": status }));
            ExitCode::FAILURE
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

/// Public message and HTTP-style status for a failed command.
fn describe_error(err: &anyhow::Error) -> (String, u16) {
    match err.downcast_ref::<StorageError>() {
        Some(storage) => (storage.public_message(), storage.status_code().as_u16()),
        None => {
            error!("Unexpected error: {:#}", err);
            (Messages::INTERNAL_ERROR.to_string(), 500)
        }
    }
}

fn database_config(database_url: Option<String>) -> Result<DatabaseConfig> {
    let mut config = DatabaseConfig::from_env()?;
    if let Some(url) = database_url {
        config.target = ConnectionTarget::Url(url);
    }
    debug!("Database target: {}", config.target.redacted());
    Ok(config)
}

fn cpf_report(cpf: &str) -> Value {
    json!({
        "cpf": cpf,
        "valido": validate_cpf(cpf),
        "formatado": Cpf::new(cpf).ok().map(|c| c.formatted()),
    })
}

async fn run(cli: Cli) -> Result<Value> {
    let command = match cli.command {
        Commands::ValidateCpf { cpf } => return Ok(cpf_report(&cpf)),
        Commands::Database(command) => command,
    };

    let config = database_config(cli.database_url)?;
    let db = Database::connect(&config).await?;

    let result = execute(&db, command).await;
    db.close().await;
    result
}

async fn execute(db: &Database, command: DatabaseCommand) -> Result<Value> {
    match command {
        DatabaseCommand::Migrate => {
            db.migrate().await?;
            Ok(json!({ "migrado": true, "dialeto": db.dialect() }))
        }
        DatabaseCommand::Health => {
            db.health_check().await?;
            Ok(json!({ "status": "ok", "dialeto": db.dialect() }))
        }
        DatabaseCommand::Counts => {
            let cargos = SqlRoleRepository::new(db.clone()).count().await?;
            let funcionarios = SqlEmployeeRepository::new(db.clone()).count().await?;
            Ok(json!({ "cargos": cargos, "funcionarios": funcionarios }))
        }
        DatabaseCommand::Cargos(args) => commands::cargos::run(db.clone(), args).await,
        DatabaseCommand::Funcionarios(args) => commands::funcionarios::run(db.clone(), args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "assim",
            "--database-url",
            "sqlite::memory:",
            "cargos",
            "list",
            "--nome",
            "Enfer",
        ])
        .unwrap();

        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert!(matches!(cli.command, Commands::Database(DatabaseCommand::Cargos(_))));

        let cli = Cli::try_parse_from(["assim", "health"]).unwrap();
        assert!(matches!(cli.command, Commands::Database(DatabaseCommand::Health)));
    }

    #[test]
    fn test_validate_cpf_is_not_a_database_command() {
        let cli = Cli::try_parse_from(["assim", "validate-cpf", "111.444.777-35"]).unwrap();
        assert!(matches!(cli.command, Commands::ValidateCpf { ref cpf } if cpf == "111.444.777-35"));
    }

    #[test]
    fn test_storage_errors_keep_their_status() {
        let err = anyhow::Error::from(StorageError::not_found("Cargo", 3));
        assert_eq!(describe_error(&err), ("Cargo não encontrado".to_string(), 404));

        let err = anyhow::Error::from(StorageError::Conflict(Messages::DUPLICATE_CPF.to_string()));
        assert_eq!(describe_error(&err), (Messages::DUPLICATE_CPF.to_string(), 409));
    }

    #[test]
    fn test_cpf_report() {
        let report = cpf_report("11144477735");
        assert_eq!(report["valido"], true);
        assert_eq!(report["formatado"], "111.444.777-35");

        let report = cpf_report("11111111111");
        assert_eq!(report["valido"], false);
        assert!(report["formatado"].is_null());
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = anyhow::anyhow!("disk on fire");
        assert_eq!(describe_error(&err), (Messages::INTERNAL_ERROR.to_string(), 500));
    }
}
