// CPF
pub const CPF_LENGTH: usize = 11;
pub const CPF_BASE_DIGITS: usize = 9;

// cargos
pub const MAX_ROLE_NAME_LENGTH: usize = 150;

// funcionarios
pub const MAX_EMPLOYEE_NAME_LENGTH: usize = 200;
pub const MAX_EMAIL_LENGTH: usize = 150;
pub const MAX_PHONE_LENGTH: usize = 50;
