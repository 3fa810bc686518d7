use crate::{Result, error::Error};

/// Trim a required text field and enforce its column width.
///
/// # Errors
/// `Error::MissingField` when blank, `Error::FieldTooLong` past `max` characters.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::MissingField(field));
    }
    check_length(field, value, max)?;
    Ok(value.to_string())
}

/// Trim an optional text field. Blank input collapses to `None`.
pub fn optional_text(field: &'static str, value: Option<&str>, max: Option<usize>) -> Result<Option<String>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Some(max) = max {
        check_length(field, value, max)?;
    }
    Ok(Some(value.to_string()))
}

/// Salaries are finite and never negative.
pub fn check_salary(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::InvalidField {
            field: "salario",
            reason: "valor não numérico".to_string(),
        });
    }
    if value < 0.0 {
        return Err(Error::InvalidField {
            field: "salario",
            reason: "não pode ser negativo".to_string(),
        });
    }
    Ok(value)
}

fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::FieldTooLong { field, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_require_text_trims() {
        assert_eq!(require_text("nome", "  Ana  ", 10).unwrap(), "Ana");
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_require_text_blank(#[case] input: &str) {
        assert_eq!(require_text("nome", input, 10), Err(Error::MissingField("nome")));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 5 chars, 10 bytes
        assert!(require_text("nome", "ãéíõú", 5).is_ok());
        assert_eq!(
            require_text("nome", "ãéíõúç", 5),
            Err(Error::FieldTooLong { field: "nome", max: 5 })
        );
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(optional_text("email", None, Some(5)).unwrap(), None);
        assert_eq!(optional_text("email", Some("  "), Some(5)).unwrap(), None);
        assert_eq!(optional_text("email", Some(" a@b "), Some(5)).unwrap(), Some("a@b".to_string()));
        assert!(optional_text("email", Some("abcdef"), Some(5)).is_err());
        assert!(optional_text("endereco", Some(&"x".repeat(1000)), None).is_ok());
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(3200.0, true)]
    #[case(-0.01, false)]
    #[case(f64::NAN, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_salary(#[case] value: f64, #[case] ok: bool) {
        assert_eq!(check_salary(value).is_ok(), ok);
    }
}
