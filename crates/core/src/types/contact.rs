//! Phone numbers and contact selectors.
//!
//! Users register and log in with either a phone number or an email address.
//! `ContactType` selects which one a request carries.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty after trimming.
    #[error("phone cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, `+`, `-`, `(`, `)`.
    #[error("phone contains invalid characters")]
    InvalidCharacters,
    /// Digit count outside the accepted range.
    #[error("phone must contain between {min} and {max} digits")]
    InvalidLength {
        /// Minimum number of digits.
        min: usize,
        /// Maximum number of digits.
        max: usize,
    },
}

/// A phone number normalized to `+` followed by digits.
///
/// Formatting characters (spaces, dashes, parentheses) are stripped so that
/// `+7 (999) 000-00-01` and `+79990000001` refer to the same account.
///
/// ```
/// use dronshop_core::Phone;
///
/// let phone = Phone::parse("+7 (999) 000-00-01").unwrap();
/// assert_eq!(phone.as_str(), "+79990000001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (E.164 allows very short national numbers).
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains unsupported
    /// characters, or has too few or too many digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let mut digits = String::with_capacity(s.len());
        for (i, c) in s.chars().enumerate() {
            match c {
                '0'..='9' => digits.push(c),
                '+' if i == 0 => {}
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacters),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(format!("+{digits}")))
    }

    /// Returns the normalized phone number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

/// Which contact channel a registration or login request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Email,
    Phone,
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => f.write_str("email"),
            Self::Phone => f.write_str("phone"),
        }
    }
}

impl std::str::FromStr for ContactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            other => Err(format!("contact_type must be email or phone, got '{other}'")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_strips_formatting() {
        let phone = Phone::parse(" +7 (999) 000-00-01 ").unwrap();
        assert_eq!(phone.as_str(), "+79990000001");
    }

    #[test]
    fn test_phone_without_plus_is_normalized() {
        assert_eq!(Phone::parse("70000000001").unwrap().as_str(), "+70000000001");
    }

    #[test]
    fn test_phone_rejects_letters_and_inner_plus() {
        assert_eq!(Phone::parse("+7999abc"), Err(PhoneError::InvalidCharacters));
        assert_eq!(Phone::parse("79+99000001"), Err(PhoneError::InvalidCharacters));
    }

    #[test]
    fn test_phone_length_bounds() {
        assert!(matches!(
            Phone::parse("+12345"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(matches!(
            Phone::parse("+1234567890123456"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
    }

    #[test]
    fn test_contact_type_parse() {
        assert_eq!("EMAIL".parse::<ContactType>().unwrap(), ContactType::Email);
        assert_eq!(" phone ".parse::<ContactType>().unwrap(), ContactType::Phone);
        assert!("fax".parse::<ContactType>().is_err());
    }

    #[test]
    fn test_contact_type_serde() {
        let ct: ContactType = serde_json::from_str("\"phone\"").unwrap();
        assert_eq!(ct, ContactType::Phone);
        assert_eq!(serde_json::to_string(&ContactType::Email).unwrap(), "\"email\"");
    }
}
