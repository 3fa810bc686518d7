use super::{default_true, double_option};
use crate::cursor::Record;
use crate::error::StorageError;
use assim_core::constants::{MAX_EMAIL_LENGTH, MAX_EMPLOYEE_NAME_LENGTH, MAX_PHONE_LENGTH};
use assim_core::validation::{optional_text, require_text};
use assim_core::{Cpf, Error, normalize_cpf};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Employee (`funcionarios` row) with its role joined in.
///
/// # Fields
///
/// * `id` - Surrogate key
/// * `nome` - Full name, at most 200 characters
/// * `cpf` - CPF (Cadastro de Pessoas Físicas), stored as its 11 digits, unique
/// * `data_nascimento` - Birth date
/// * `endereco` - Postal address, free text
/// * `email` - At most 150 characters
/// * `telefone` - At most 50 characters
/// * `cargo_id` - Role reference, cleared if the role is removed
/// * `cargo` - Joined role title, `None` without a role
/// * `cargo_salario` - Joined role salary
/// * `ativo` - Whether the employee is active
/// * `created_at` - Record creation timestamp
/// * `updated_at` - Last modification, `None` until the first update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub nome: String,
    pub cpf: String,
    pub data_nascimento: Option<NaiveDate>,
    pub endereco: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub cargo_id: Option<i64>,
    pub cargo: Option<String>,
    pub cargo_salario: Option<f64>,
    pub ativo: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl TryFrom<&Record> for Employee {
    type Error = StorageError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        Ok(Employee {
            id: record.get("id")?,
            nome: record.get("nome")?,
            cpf: record.get("cpf")?,
            data_nascimento: record.get("data_nascimento")?,
            endereco: record.get("endereco")?,
            email: record.get("email")?,
            telefone: record.get("telefone")?,
            cargo_id: record.get("cargo_id")?,
            cargo: record.get("cargo_nome")?,
            cargo_salario: record.get("cargo_salario")?,
            ativo: record.get("ativo")?,
            created_at: record.get("created_at")?,
            updated_at: record.get("updated_at")?,
        })
    }
}

/// Fields accepted when hiring an employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    #[serde(default)]
    pub nome: String,
    #[serde(default)]
    pub cpf: String,
    #[serde(default)]
    pub data_nascimento: Option<NaiveDate>,
    #[serde(default)]
    pub endereco: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub cargo_id: Option<i64>,
    #[serde(default = "default_true")]
    pub ativo: bool,
}

impl NewEmployee {
    pub fn new(nome: impl Into<String>, cpf: impl Into<String>) -> Self {
        Self {
            nome: nome.into(),
            cpf: cpf.into(),
            data_nascimento: None,
            endereco: None,
            email: None,
            telefone: None,
            cargo_id: None,
            ativo: true,
        }
    }

    pub fn cargo_id(mut self, cargo_id: i64) -> Self {
        self.cargo_id = Some(cargo_id);
        self
    }

    pub fn data_nascimento(mut self, data_nascimento: NaiveDate) -> Self {
        self.data_nascimento = Some(data_nascimento);
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn telefone(mut self, telefone: impl Into<String>) -> Self {
        self.telefone = Some(telefone.into());
        self
    }

    pub fn endereco(mut self, endereco: impl Into<String>) -> Self {
        self.endereco = Some(endereco.into());
        self
    }

    /// Trimmed copy with the CPF reduced to digits, or the first rule it breaks.
    pub fn validated(&self) -> assim_core::Result<Self> {
        let nome = require_text("nome", &self.nome, MAX_EMPLOYEE_NAME_LENGTH)?;
        let cpf = validated_cpf(&self.cpf)?;

        Ok(Self {
            nome,
            cpf,
            data_nascimento: self.data_nascimento,
            endereco: optional_text("endereco", self.endereco.as_deref(), None)?,
            email: optional_text("email", self.email.as_deref(), Some(MAX_EMAIL_LENGTH))?,
            telefone: optional_text("telefone", self.telefone.as_deref(), Some(MAX_PHONE_LENGTH))?,
            cargo_id: self.cargo_id,
            ativo: self.ativo,
        })
    }
}

fn validated_cpf(cpf: &str) -> assim_core::Result<String> {
    if cpf.trim().is_empty() {
        return Err(Error::MissingField("cpf"));
    }
    Ok(Cpf::new(cpf)?.into())
}

/// Partial update of an employee. Absent fields keep their stored value;
/// `null` clears a nullable one.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmployeePatch {
    pub nome: Option<String>,
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub data_nascimento: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub endereco: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub telefone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub cargo_id: Option<Option<i64>>,
    pub ativo: Option<bool>,
}

impl EmployeePatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Trimmed copy with a present CPF reduced to digits, or the first rule
    /// a present field breaks. The CPF is checked before anything else.
    ///
    /// Needs no stored row, so it runs before the store is touched.
    pub fn validated(&self) -> assim_core::Result<Self> {
        Ok(Self {
            cpf: self.cpf.as_deref().map(validated_cpf).transpose()?,
            nome: self
                .nome
                .as_deref()
                .map(|nome| require_text("nome", nome, MAX_EMPLOYEE_NAME_LENGTH))
                .transpose()?,
            data_nascimento: self.data_nascimento,
            endereco: self
                .endereco
                .as_ref()
                .map(|endereco| optional_text("endereco", endereco.as_deref(), None))
                .transpose()?,
            email: self
                .email
                .as_ref()
                .map(|email| optional_text("email", email.as_deref(), Some(MAX_EMAIL_LENGTH)))
                .transpose()?,
            telefone: self
                .telefone
                .as_ref()
                .map(|telefone| optional_text("telefone", telefone.as_deref(), Some(MAX_PHONE_LENGTH)))
                .transpose()?,
            cargo_id: self.cargo_id,
            ativo: self.ativo,
        })
    }

    /// Merge onto `current`, validating only the fields present.
    pub fn apply(&self, current: &Employee) -> assim_core::Result<Employee> {
        let patch = self.validated()?;
        let mut employee = current.clone();

        if let Some(cpf) = patch.cpf {
            employee.cpf = cpf;
        }
        if let Some(nome) = patch.nome {
            employee.nome = nome;
        }
        if let Some(data_nascimento) = patch.data_nascimento {
            employee.data_nascimento = data_nascimento;
        }
        if let Some(endereco) = patch.endereco {
            employee.endereco = endereco;
        }
        if let Some(email) = patch.email {
            employee.email = email;
        }
        if let Some(telefone) = patch.telefone {
            employee.telefone = telefone;
        }
        if let Some(cargo_id) = patch.cargo_id {
            if employee.cargo_id != cargo_id {
                employee.cargo = None;
                employee.cargo_salario = None;
            }
            employee.cargo_id = cargo_id;
        }
        if let Some(ativo) = patch.ativo {
            employee.ativo = ativo;
        }

        Ok(employee)
    }
}

/// Substring filters for listing employees. Both must match when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EmployeeFilter {
    pub nome: Option<String>,
    pub cpf: Option<String>,
}

impl EmployeeFilter {
    pub fn nome(mut self, nome: impl Into<String>) -> Self {
        self.nome = Some(nome.into());
        self
    }

    pub fn cpf(mut self, cpf: impl Into<String>) -> Self {
        self.cpf = Some(cpf.into());
        self
    }

    /// Name fragment, `None` when blank.
    pub(crate) fn nome_fragment(&self) -> Option<&str> {
        self.nome.as_deref().filter(|n| !n.is_empty())
    }

    /// CPF fragment reduced to digits, matching how CPFs are stored.
    ///
    /// `None` only when blank. A fragment without digits is kept as given,
    /// so it matches no stored CPF.
    pub(crate) fn cpf_fragment(&self) -> Option<String> {
        let fragment = self.cpf.as_deref().filter(|c| !c.is_empty())?;
        let digits = normalize_cpf(fragment);

        if digits.is_empty() {
            Some(fragment.to_string())
        } else {
            Some(digits)
        }
    }
}
