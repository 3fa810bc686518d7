use super::{default_true, double_option};
use crate::cursor::Record;
use crate::error::StorageError;
use assim_core::constants::MAX_ROLE_NAME_LENGTH;
use assim_core::validation::{check_salary, optional_text, require_text};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Job role (`cargos` row)
///
/// # Fields
///
/// * `id` - Surrogate key
/// * `nome` - Role title, unique, at most 150 characters
/// * `salario` - Base salary, two decimal places, never negative
/// * `descricao` - Free text description
/// * `ativo` - Whether the role is still offered
/// * `created_at` - Record creation timestamp
/// * `updated_at` - Last modification, `None` until the first update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub nome: String,
    pub salario: f64,
    pub descricao: Option<String>,
    pub ativo: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<&Record> for Role {
    type Error = StorageError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Role {
            id: record.get("id")?,
            nome: record.get("nome")?,
            salario: record.get("salario")?,
            descricao: record.get("descricao")?,
            ativo: record.get("ativo")?,
            created_at: record.get("created_at")?,
            updated_at: record.get("updated_at")?,
        })
    }
}

/// Fields accepted when creating a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRole {
    #[serde(default)]
    pub nome: String,
    pub salario: f64,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

impl NewRole {
    pub fn new(nome: impl Into<String>, salario: f64) -> Self {
        Self {
            nome: nome.into(),
            salario,
            descricao: None,
            ativo: true,
        }
    }

    pub fn descricao(mut self, descricao: impl Into<String>) -> Self {
        self.descricao = Some(descricao.into());
        self
    }

    /// Trimmed copy, or the first rule it breaks.
    pub fn validated(&self) -> assim_core::Result<Self> {
        Ok(Self {
            nome: require_text("nome", &self.nome, MAX_ROLE_NAME_LENGTH)?,
            salario: check_salary(self.salario)?,
            descricao: optional_text("descricao", self.descricao.as_deref(), None)?,
            ativo: self.ativo,
        })
    }
}

/// Partial update of a role. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RolePatch {
    pub nome: Option<String>,
    pub salario: Option<f64>,
    /// `Some(None)` clears the description
    #[serde(default, deserialize_with = "double_option")]
    pub descricao: Option<Option<String>>,
    pub ativo: Option<bool>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.nome.is_none() && self.salario.is_none() && self.descricao.is_none() && self.ativo.is_none()
    }

    /// Trimmed copy, or the first rule a present field breaks.
    ///
    /// Needs no stored row, so it runs before the store is touched.
    pub fn validated(&self) -> assim_core::Result<Self> {
        Ok(Self {
            nome: self
                .nome
                .as_deref()
                .map(|nome| require_text("nome", nome, MAX_ROLE_NAME_LENGTH))
                .transpose()?,
            salario: self.salario.map(check_salary).transpose()?,
            descricao: self
                .descricao
                .as_ref()
                .map(|descricao| optional_text("descricao", descricao.as_deref(), None))
                .transpose()?,
            ativo: self.ativo,
        })
    }

    /// Merge onto `current`, validating only the fields present.
    pub fn apply(&self, current: &Role) -> assim_core::Result<Role> {
        let patch = self.validated()?;
        let mut role = current.clone();

        if let Some(nome) = patch.nome {
            role.nome = nome;
        }
        if let Some(salario) = patch.salario {
            role.salario = salario;
        }
        if let Some(descricao) = patch.descricao {
            role.descricao = descricao;
        }
        if let Some(ativo) = patch.ativo {
            role.ativo = ativo;
        }

        Ok(role)
    }
}
