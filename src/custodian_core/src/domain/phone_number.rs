use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

// E.164: '+' followed by 2-15 digits, never starting with 0.
static E164_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern is valid"));

/// Phone number normalized to E.164.
///
/// Formatting characters (spaces, dashes, dots, parentheses) are dropped before
/// validation. Bare 10-digit numbers, and 11-digit numbers starting with `1`,
/// are treated as North American numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();

        if cleaned.is_empty() {
            return Err(ValidationError::EmptyPhoneNumber);
        }

        let normalized = if cleaned.starts_with('+') {
            cleaned
        } else if cleaned.len() == 10 {
            format!("+1{cleaned}")
        } else if cleaned.len() == 11 && cleaned.starts_with('1') {
            format!("+{cleaned}")
        } else {
            return Err(ValidationError::InvalidPhoneNumber(format!(
                "{cleaned} must include a country code or be a valid US number"
            )));
        };

        if !E164_REGEX.is_match(&normalized) {
            return Err(ValidationError::InvalidPhoneNumber(format!(
                "{normalized} is not in E.164 format"
            )));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(NXX) NXX-XXXX` for North American numbers, E.164 for everything else.
    pub fn national_format(&self) -> String {
        match self.0.strip_prefix("+1") {
            Some(national) if national.len() == 10 => format!(
                "({}) {}-{}",
                &national[..3],
                &national[3..6],
                &national[6..]
            ),
            _ => self.0.clone(),
        }
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
