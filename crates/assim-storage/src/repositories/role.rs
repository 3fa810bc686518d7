#![allow(async_fn_in_trait)]

use super::{count_rows, push_where};
use crate::connection::{Database, DbCursor};
use crate::cursor::{Cursor, SqlParam};
use crate::error::{ConflictExt, StorageError, StorageResult};
use crate::messages::Messages;
use crate::models::{NewRole, Role, RolePatch};
use crate::params;
use tracing::{debug, info, warn};

const ENTITY: &str = "Cargo";

const ROLE_COLUMNS: &str = "id, nome, salario, descricao, ativo, created_at, updated_at";

/// Repository trait for Role (`cargos`) operations
///
/// Uses native async trait methods (Edition 2024), no async-trait crate.
pub trait RoleRepository: Send + Sync {
    /// Roles whose name contains `nome` (case-sensitive), newest first.
    /// An empty `nome` lists every role.
    async fn list(&self, nome: &str) -> StorageResult<Vec<Role>>;

    /// Find a role by its ID
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Role>>;

    /// Create a role, returning its generated ID when the driver reports one
    async fn create(&self, role: &NewRole) -> StorageResult<Option<i64>>;

    /// Overwrite the fields present in `patch`, returning the stored result
    async fn update(&self, id: i64, patch: &RolePatch) -> StorageResult<Role>;

    /// Delete a role. Refused while any employee references it.
    async fn delete(&self, id: i64) -> StorageResult<()>;

    /// Number of roles
    async fn count(&self) -> StorageResult<i64>;
}

/// SQL implementation of RoleRepository, for any dialect
pub struct SqlRoleRepository {
    db: Database,
}

impl SqlRoleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

async fn fetch_role(cursor: &mut DbCursor, id: i64) -> StorageResult<Option<Role>> {
    let sql = format!("SELECT {ROLE_COLUMNS} FROM cargos WHERE id = ?");
    cursor
        .fetch_optional(&sql, params![id])
        .await?
        .as_ref()
        .map(Role::try_from)
        .transpose()
}

async fn name_taken(cursor: &mut DbCursor, nome: &str, except_id: Option<i64>) -> StorageResult<bool> {
    let total = count_rows(
        cursor,
        "SELECT COUNT(*) AS total FROM cargos WHERE nome = ? AND id <> ?",
        params![nome, except_id.unwrap_or(0)],
    )
    .await?;
    Ok(total > 0)
}

impl RoleRepository for SqlRoleRepository {
    async fn list(&self, nome: &str) -> StorageResult<Vec<Role>> {
        let mut sql = format!("SELECT {ROLE_COLUMNS} FROM cargos");
        let mut conditions = Vec::new();
        let mut params: Vec<SqlParam> = Vec::new();

        if !nome.is_empty() {
            conditions.push(self.db.dialect().contains("nome"));
            params.push(nome.into());
        }
        push_where(&mut sql, &conditions);
        sql.push_str(" ORDER BY id DESC");

        let mut cursor = self.db.cursor().await?;
        let records = cursor.fetch_all(&sql, &params).await?;
        debug!("Listed {} cargos (filter {:?})", records.len(), nome);

        records.iter().map(Role::try_from).collect()
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<Role>> {
        let mut cursor = self.db.cursor().await?;
        fetch_role(&mut cursor, id).await
    }

    async fn create(&self, role: &NewRole) -> StorageResult<Option<i64>> {
        let role = role.validated()?;

        let mut tx = self.db.begin().await?;

        if name_taken(&mut tx, &role.nome, None).await? {
            tx.rollback().await?;
            return Err(StorageError::Conflict(Messages::DUPLICATE_ROLE.to_string()));
        }

        let id = tx
            .insert(
                r#"
                INSERT INTO cargos (nome, salario, descricao, ativo)
                VALUES (?, ?, ?, ?)
                "#,
                params![role.nome.as_str(), role.salario, role.descricao.clone(), role.ativo],
            )
            .await
            .or_conflict(Messages::DUPLICATE_ROLE, Messages::DUPLICATE_ROLE)?;

        tx.commit().await?;
        info!("Created cargo {:?} ({})", id, role.nome);

        Ok(id)
    }

    async fn update(&self, id: i64, patch: &RolePatch) -> StorageResult<Role> {
        let patch = patch.validated()?;

        let mut tx = self.db.begin().await?;

        let current = fetch_role(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;
        let role = patch.apply(&current)?;

        if role.nome != current.nome && name_taken(&mut tx, &role.nome, Some(id)).await? {
            tx.rollback().await?;
            return Err(StorageError::Conflict(Messages::DUPLICATE_ROLE.to_string()));
        }

        tx.execute(
            r#"
            UPDATE cargos
            SET nome = ?, salario = ?, descricao = ?, ativo = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![role.nome.as_str(), role.salario, role.descricao.clone(), role.ativo, id],
        )
        .await
        .or_conflict(Messages::DUPLICATE_ROLE, Messages::DUPLICATE_ROLE)?;

        let updated = fetch_role(&mut tx, id)
            .await?
            .ok_or_else(|| StorageError::not_found(ENTITY, id))?;

        tx.commit().await?;
        info!("Updated cargo {}", id);

        Ok(updated)
    }

    async fn delete(&self, id: i64) -> StorageResult<()> {
        let mut tx = self.db.begin().await?;

        // Hold the role so no hire can reference it between the count and the delete
        let sql = format!("SELECT id FROM cargos WHERE id = ?{}", self.db.dialect().for_update());
        if tx.fetch_optional(&sql, params![id]).await?.is_none() {
            tx.rollback().await?;
            return Err(StorageError::not_found(ENTITY, id));
        }

        let dependents = count_rows(
            &mut tx,
            "SELECT COUNT(*) AS total FROM funcionarios WHERE cargo_id = ?",
            params![id],
        )
        .await?;

        if dependents > 0 {
            tx.rollback().await?;
            warn!("Refused to delete cargo {}: {} funcionarios linked", id, dependents);
            return Err(StorageError::Conflict(Messages::ROLE_IN_USE.to_string()));
        }

        let affected = tx
            .execute("DELETE FROM cargos WHERE id = ?", params![id])
            .await
            .or_conflict(Messages::ROLE_IN_USE, Messages::ROLE_IN_USE)?;

        if affected == 0 {
            tx.rollback().await?;
            return Err(StorageError::not_found(ENTITY, id));
        }

        tx.commit().await?;
        info!("Deleted cargo {}", id);

        Ok(())
    }

    async fn count(&self) -> StorageResult<i64> {
        let mut cursor = self.db.cursor().await?;
        count_rows(&mut cursor, "SELECT COUNT(*) AS total FROM cargos", params![]).await
    }
}
