//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email must be at most {0} characters")]
    TooLong(usize),
    #[error("email must look like name@domain")]
    Malformed,
    #[error("email must not contain whitespace")]
    Whitespace,
}

/// A normalized email address.
///
/// Accounts are looked up by email in backend filters, so the address is
/// trimmed and lowercased on parse; two spellings of the same mailbox compare
/// equal.
///
/// ```
/// use madio_core::Email;
///
/// let email = Email::parse("  Sara@Madio.IR ").unwrap();
/// assert_eq!(email.as_str(), "sara@madio.ir");
/// assert!(Email::parse("sara.madio.ir").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Longest address the backend accepts.
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an address.
    ///
    /// # Errors
    ///
    /// Returns an error for empty or over-long input, embedded whitespace, or
    /// anything that is not exactly one `@` between two non-empty parts.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong(Self::MAX_LENGTH));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        match s.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(s.to_lowercase()))
            }
            _ => Err(EmailError::Malformed),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for raw in [
            "sara@madio.ir",
            "sara.ahmadi+orders@mail.example.com",
            "a@b",
        ] {
            assert!(Email::parse(raw).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_normalizes_case_and_padding() {
        let email = Email::parse("  Shopper@Madio.IR \n").unwrap();
        assert_eq!(email.as_str(), "shopper@madio.ir");
        assert_eq!(email, "shopper@madio.ir".parse().unwrap());
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("@madio.ir"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("sara@"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("a@b@c.ir"), Err(EmailError::Malformed));
        assert_eq!(Email::parse("sara ahmadi@madio.ir"), Err(EmailError::Whitespace));

        let long = format!("{}@madio.ir", "a".repeat(250));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong(254)));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = Email::parse("sara@madio.ir").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), r#""sara@madio.ir""#);
        assert_eq!(format!("{email}"), "sara@madio.ir");
    }
}
