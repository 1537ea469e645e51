//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`EmailAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty after trimming.
    #[error("email cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace inside the address.
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    /// The mailbox (before @) is empty.
    #[error("email mailbox cannot be empty")]
    EmptyMailbox,
    /// The host (after @) is empty or has no dot.
    #[error("email host must be a dotted domain name")]
    InvalidHost,
}

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lower-cases the whole address,
/// so two spellings of the same login compare equal. The backend stores
/// profile emails lower-cased as well.
///
/// ```
/// use stockroom_core::EmailAddress;
///
/// let email = EmailAddress::parse("  Ana.Lopez@Example.com ").unwrap();
/// assert_eq!(email.as_str(), "ana.lopez@example.com");
///
/// assert!(EmailAddress::parse("ana@localhost").is_err());
/// assert!(EmailAddress::parse("a@b@c.com").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an email address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (mailbox, host) = trimmed.split_once('@').ok_or(EmailError::AtSymbol)?;
        if host.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if mailbox.is_empty() {
            return Err(EmailError::EmptyMailbox);
        }
        let dotted = host
            .split('.')
            .all(|label| !label.is_empty())
            && host.contains('.');
        if !dotted {
            return Err(EmailError::InvalidHost);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part before the @.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.0.split_once('@').map_or("", |(mailbox, _)| mailbox)
    }

    /// Returns the part after the @.
    #[must_use]
    pub fn host(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, host)| host)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(email: EmailAddress) -> Self {
        email.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let email = EmailAddress::parse("  Sales@Stockroom.IO\n").unwrap();
        assert_eq!(email.as_str(), "sales@stockroom.io");
        assert_eq!(email.mailbox(), "sales");
        assert_eq!(email.host(), "stockroom.io");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(EmailAddress::parse("   "), Err(EmailError::Empty));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            EmailAddress::parse(&long),
            Err(EmailError::TooLong { max: 254 })
        ));
    }

    #[test]
    fn test_parse_rejects_inner_whitespace() {
        assert_eq!(
            EmailAddress::parse("ana lopez@example.com"),
            Err(EmailError::Whitespace)
        );
    }

    #[test]
    fn test_parse_rejects_bad_at_usage() {
        assert_eq!(
            EmailAddress::parse("example.com"),
            Err(EmailError::AtSymbol)
        );
        assert_eq!(
            EmailAddress::parse("a@b@example.com"),
            Err(EmailError::AtSymbol)
        );
        assert_eq!(
            EmailAddress::parse("@example.com"),
            Err(EmailError::EmptyMailbox)
        );
    }

    #[test]
    fn test_parse_rejects_undotted_host() {
        assert_eq!(
            EmailAddress::parse("ana@localhost"),
            Err(EmailError::InvalidHost)
        );
        assert_eq!(
            EmailAddress::parse("ana@example."),
            Err(EmailError::InvalidHost)
        );
        assert_eq!(EmailAddress::parse("ana@"), Err(EmailError::InvalidHost));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: EmailAddress = serde_json::from_str("\"Ops@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "ops@example.com");

        let bad: Result<EmailAddress, _> = serde_json::from_str("\"not-an-email\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let email = EmailAddress::parse("ops@example.com").unwrap();
        assert_eq!(
            serde_json::to_string(&email).unwrap(),
            "\"ops@example.com\""
        );
    }
}
