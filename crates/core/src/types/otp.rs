//! One-time passcode types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    /// The code is not exactly six characters.
    #[error("code must be exactly {expected} digits (got {got})")]
    BadLength {
        /// Required length.
        expected: usize,
        /// Actual length.
        got: usize,
    },
    /// The code contains a non-digit character.
    #[error("code may only contain digits")]
    NonDigit,
}

/// A six-digit one-time passcode.
///
/// Validation happens locally, before any network dispatch: a code that is
/// not exactly six ASCII digits is never sent to the server.
///
/// ```
/// use allblackery_core::OtpCode;
///
/// assert!(OtpCode::parse("123456").is_ok());
/// assert!(OtpCode::parse("12345").is_err());
/// assert!(OtpCode::parse("12345a").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Required number of digits.
    pub const LENGTH: usize = 6;

    /// Parse an `OtpCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        if s.len() != Self::LENGTH {
            return Err(OtpCodeError::BadLength {
                expected: Self::LENGTH,
                got: s.len(),
            });
        }
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OtpCode {
    type Err = OtpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What an OTP challenge authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    Login,
    PasswordReset,
    ProfileUpdate,
}

impl OtpPurpose {
    /// The backend's wire name for this purpose.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Login => "login",
            Self::PasswordReset => "password_reset",
            Self::ProfileUpdate => "profile_update",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_code() {
        let code = OtpCode::parse("042137").unwrap();
        assert_eq!(code.as_str(), "042137");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            OtpCode::parse("12345"),
            Err(OtpCodeError::BadLength {
                expected: 6,
                got: 5
            })
        );
        assert_eq!(
            OtpCode::parse("1234567"),
            Err(OtpCodeError::BadLength {
                expected: 6,
                got: 7
            })
        );
        assert_eq!(
            OtpCode::parse(""),
            Err(OtpCodeError::BadLength {
                expected: 6,
                got: 0
            })
        );
    }

    #[test]
    fn test_parse_non_digit() {
        assert_eq!(OtpCode::parse("12345a"), Err(OtpCodeError::NonDigit));
        assert_eq!(OtpCode::parse("12 456"), Err(OtpCodeError::NonDigit));
    }

    #[test]
    fn test_purpose_wire_names() {
        assert_eq!(OtpPurpose::Registration.as_str(), "registration");
        assert_eq!(OtpPurpose::PasswordReset.as_str(), "password_reset");

        let json = serde_json::to_string(&OtpPurpose::ProfileUpdate).unwrap();
        assert_eq!(json, "\"profile_update\"");
    }
}
