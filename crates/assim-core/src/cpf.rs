use crate::{
    Result,
    constants::{CPF_BASE_DIGITS, CPF_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Strip everything that is not an ASCII digit.
///
/// `"111.444.777-35"` and `"11144477735"` normalize to the same value.
#[must_use]
pub fn normalize_cpf(candidate: &str) -> String {
    candidate.chars().filter(char::is_ascii_digit).collect()
}

/// Validate a CPF by its two check digits.
///
/// Punctuation is ignored. Anything that does not reduce to exactly 11
/// digits, or is a run of one repeated digit, is rejected. Never panics.
#[must_use]
pub fn validate_cpf(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate
        .chars()
        .filter_map(|c| if c.is_ascii() { c.to_digit(10) } else { None })
        .collect();

    if digits.len() != CPF_LENGTH {
        return false;
    }

    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let first = check_digit(&digits[..CPF_BASE_DIGITS]);
    let second = check_digit(&digits[..CPF_BASE_DIGITS + 1]);

    digits[CPF_BASE_DIGITS] == first && digits[CPF_BASE_DIGITS + 1] == second
}

/// Weighted sum with weights `len + 1` down to 2, reduced mod 11.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .zip((2..=top).rev())
        .map(|(d, weight)| d * weight)
        .sum();

    let remainder = (sum * 10) % 11;
    if remainder >= 10 { 0 } else { remainder }
}

/// A CPF that passed checksum validation, stored as its 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Normalize and validate a CPF.
    ///
    /// # Errors
    /// Returns `Error::InvalidCpf` when the checksum does not hold.
    pub fn new(candidate: &str) -> Result<Self> {
        if !validate_cpf(candidate) {
            return Err(Error::InvalidCpf);
        }
        Ok(Cpf(normalize_cpf(candidate)))
    }

    /// The bare 11 digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as `XXX.XXX.XXX-XX`.
    #[must_use]
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
    }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Cpf {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Cpf::new(s)
    }
}

impl TryFrom<String> for Cpf {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Cpf::new(&value)
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

impl AsRef<str> for Cpf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("11144477735")]
    #[case("52998224725")]
    #[case("71428793860")]
    #[case("12345678909")]
    #[case("39053344705")]
    #[case("00000000191")]
    #[case("111.444.777-35")]
    #[case(" 529.982.247-25 ")]
    fn test_valid_cpf(#[case] input: &str) {
        assert!(validate_cpf(input), "{input} should be valid");
    }

    #[rstest]
    #[case("")]
    #[case("1114447773")] // 10 digits
    #[case("111444777350")] // 12 digits
    #[case("11144477736")] // wrong second digit
    #[case("11144477725")] // wrong first digit
    #[case("00000000000")]
    #[case("99999999999")]
    #[case("abcdefghijk")]
    #[case("111٤٤٤77735")] // arabic-indic digits are not ASCII
    fn test_invalid_cpf(#[case] input: &str) {
        assert!(!validate_cpf(input), "{input} should be invalid");
    }

    #[test]
    fn test_first_check_digit() {
        // sum 2 -> 20 % 11 = 9
        assert_eq!(check_digit(&[0, 0, 0, 0, 0, 0, 0, 0, 1]), 9);
        // sum 210 -> 2100 % 11 = 10 -> 0
        assert_eq!(check_digit(&[1, 2, 3, 4, 5, 6, 7, 8, 9]), 0);
    }

    #[test]
    fn test_second_check_digit_uses_ten_digits() {
        assert_eq!(check_digit(&[1, 1, 1, 4, 4, 4, 7, 7, 7, 3]), 5);
    }

    #[test]
    fn test_normalize_cpf() {
        assert_eq!(normalize_cpf("111.444.777-35"), "11144477735");
        assert_eq!(normalize_cpf("abc"), "");
    }

    #[test]
    fn test_cpf_newtype() {
        let cpf = Cpf::new("111.444.777-35").unwrap();
        assert_eq!(cpf.as_str(), "11144477735");
        assert_eq!(cpf.formatted(), "111.444.777-35");
        assert_eq!(cpf.to_string(), "11144477735");

        assert_eq!(Cpf::new("11144477736"), Err(Error::InvalidCpf));
        assert!("52998224725".parse::<Cpf>().is_ok());
    }

    #[test]
    fn test_cpf_serde() {
        let cpf: Cpf = serde_json::from_str("\"111.444.777-35\"").unwrap();
        assert_eq!(serde_json::to_string(&cpf).unwrap(), "\"11144477735\"");

        assert!(serde_json::from_str::<Cpf>("\"00000000000\"").is_err());
    }
}
