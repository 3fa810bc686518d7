#![allow(async_fn_in_trait)]

use super::{count_rows, push_where};
use crate::connection::{Database, DbCursor, Dialect};
use crate::cursor::{Cursor, SqlParam};
use crate::error::{ConflictExt, StorageError, StorageResult};
use crate::messages::Messages;
use crate::models::{Employee, EmployeeFilter, EmployeePatch, NewEmployee};
use crate::params;
use tracing::{debug, info};

const ENTITY: &str = "Funcionário";

/// Employee columns plus the joined role title and salary.
const EMPLOYEE_SELECT: &str = r#"
    SELECT f.id AS id, f.nome AS nome, f.cpf AS cpf,
           f.data_nascimento AS data_nascimento, f.endereco AS endereco,
           f.email AS email, f.telefone AS telefone, f.cargo_id AS cargo_id,
           f.ativo AS ativo, f.created_at AS created_at, f.updated_at AS updated_at,
           c.nome AS cargo_nome, c.salario AS cargo_salario
    FROM funcionarios f
    LEFT JOIN cargos c ON c.id = f.cargo_id
"#;

/// Repository trait for Employee (`funcionarios`) operations
pub trait EmployeeRepository: Send + Sync {
    /// Employees matching every fragment set in `filter`, newest first
    async fn list(&self, filter: &EmployeeFilter) -> StorageResult<Vec<Employee>>;

    /// Find an employee by ID, role joined in
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Employee>>;

    /// Hire an employee, returning the generated ID when the driver reports one
    async fn create(&self, employee: &NewEmployee) -> StorageResult<Option<i64>>;

    /// Overwrite the fields present in `patch`
    async fn update(&self, id: i64, patch: &EmployeePatch) -> StorageResult<Employee>;

    async fn delete(&self, id: i64) -> StorageResult<()>;

    async fn count(&self) -> StorageResult<i64>;
}

/// SQL implementation of EmployeeRepository, for any dialect
pub struct SqlEmployeeRepository {
    db: Database,
}

impl SqlEmployeeRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

async fn fetch_employee(cursor: &mut DbCursor, id: i64) -> StorageResult<Option<Employee>> {
    let sql = format!("{EMPLOYEE_SELECT} WHERE f.id = ?");
    cursor
        .fetch_optional(&sql, params![id])
        .await?
        .as_ref()
        .map(Employee::try_from)
        .transpose()
}

async fn cpf_taken(cursor: &mut DbCursor, cpf: &str, except_id: Option<i64>) -> StorageResult<bool> {
    let total = count_rows(
        cursor,
        "SELECT COUNT(*) AS total FROM funcionarios WHERE cpf = ? AND id <> ?",
        params![cpf, except_id.unwrap_or(0)],
    )
    .await?;
    Ok(total > 0)
}

/// Checks the role exists and keeps it from being deleted until the
/// transaction ends.
async fn ensure_role_exists(cursor: &mut DbCursor, dialect: Dialect, cargo_id: i64) -> StorageResult<()> {
    let sql = format!("SELECT id FROM cargos WHERE id = ?{}", dialect.for_share());

    if cursor.fetch_optional(&sql, params![cargo_id]).await?.is_none() {
        return Err(StorageError::Conflict(Messages::UNKNOWN_ROLE.to_string()));
    }
    Ok(())
}

impl EmployeeRepository for SqlEmployeeRepository {
    async fn list(&self, filter: &EmployeeFilter) -> StorageResult<Vec<Employee>> {
        let dialect = self.db.dialect();
        let mut sql = EMPLOYEE_SELECT.to_string();
        let mut conditions = Vec::new();
        let mut params: Vec<SqlParam> = Vec::new();

        if let Some(nome) = filter.nome_fragment() {
            conditions.push(dialect.contains("f.nome"));
            params.push(nome.into());
        }
        if let Some(cpf) = filter.cpf_fragment() {
            conditions.push(dialect.contains("f.cpf"));
            params.push(cpf.into());
        }
        push_where(&mut sql, &conditions);
        sql.push_str(" ORDER BY f.id DESC");

        let mut cursor = self.db.cursor().await?;
        let records = cursor.fetch_all(&sql, &params).await?;
        debug!("Listed {} funcionarios ({:?})", records.len(), filter);

        records.iter().map(Employee::try_from).collect()
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Employee>> {
        let mut cursor = self.db.cursor().await?;
        fetch_employee(&mut cursor, id).await
    }

    async fn create(&self, employee: &NewEmployee) -> StorageResult<Option<i64>> {
        let employee = employee.validated()?;

        let mut tx = self.db.begin().await?;

        if cpf_taken(&mut tx, &employee.cpf, None).await? {
            tx.rollback().await?;
            return Err(StorageError::Conflict(Messages::DUPLICATE_CPF.to_string()));
        }
        if let Some(cargo_id) = employee.cargo_id {
            ensure_role_exists(&mut tx, self.db.dialect(), cargo_id).await?;
        }

        let id = tx
            .insert(
                r#"
                INSERT INTO funcionarios
                    (nome, cpf, data_nascimento, endereco, email, telefone, cargo_id, ativo)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    employee.nome.as_str(),
                    employee.cpf.as_str(),
                    employee.data_nascimento,
                    employee.endereco.clone(),
                    employee.email.clone(),
                    employee.telefone.clone(),
                    employee.cargo_id,
                    employee.ativo,
                ],
            )
            .await
            .or_conflict(Messages::DUPLICATE_CPF, Messages::UNKNOWN_ROLE)?;

        tx.commit().await?;
        info!("Created funcionario {:?} ({})", id, employee.nome);

        Ok(id)
    }

    async fn update(&self, id: i64, patch: &EmployeePatch) -> StorageResult<Employee> {
        let patch = patch.validated()?;

        let mut tx = self.db.begin().await?;

        let current = fetch_employee(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        let employee = patch.apply(&current)?;

        if employee.cpf != current.cpf && cpf_taken(&mut tx, &employee.cpf, Some(id)).await? {
            tx.rollback().await?;
            return Err(StorageError::Conflict(Messages::DUPLICATE_CPF.to_string()));
        }
        if employee.cargo_id != current.cargo_id
            && let Some(cargo_id) = employee.cargo_id
        {
            ensure_role_exists(&mut tx, self.db.dialect(), cargo_id).await?;
        }

        tx.execute(
            r#"
            UPDATE funcionarios
            SET nome = ?, cpf = ?, data_nascimento = ?, endereco = ?, email = ?,
                telefone = ?, cargo_id = ?, ativo = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                employee.nome.as_str(),
                employee.cpf.as_str(),
                employee.data_nascimento,
                employee.endereco.clone(),
                employee.email.clone(),
                employee.telefone.clone(),
                employee.cargo_id,
                employee.ativo,
                id,
            ],
        )
        .await
        .or_conflict(Messages::DUPLICATE_CPF, Messages::UNKNOWN_ROLE)?;

        let updated = fetch_employee(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;

        tx.commit().await?;
        info!("Updated funcionario {}", id);

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut cursor = self.db.cursor().await?;
        let affected = cursor
            .execute("DELETE FROM funcionarios WHERE id = ?", params![id])
            .await?;

        if affected == 0 {
            return Err(StorageError::not_found(ENTITY, id));
        }

        info!("Deleted funcionario {}", id);
        Ok(())
    }

    async fn count(&self) -> StorageResult<i64> {
        let mut cursor = self.db.cursor().await?;
        count_rows(&mut cursor, "SELECT COUNT(*) AS total FROM funcionarios", params![]).await
    }
}
