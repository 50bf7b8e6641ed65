//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty (after trimming whitespace).
    #[error("email cannot be empty")]
    Empty,
    /// The input is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain a single @ symbol")]
    AtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain part (after @) is empty or has no dot.
    #[error("email domain is invalid")]
    InvalidDomain,
    /// The input contains whitespace.
    #[error("email cannot contain whitespace")]
    Whitespace,
}

/// A normalized email address.
///
/// Parsing trims surrounding whitespace and lowercases the domain so that
/// `Jo@Example.COM` and `Jo@example.com` compare equal. The local part is kept
/// as typed since the identity provider treats it case-sensitively.
///
/// ```
/// use beanvoyage_core::Email;
///
/// let email = Email::parse("  jo@BeanVoyage.Coffee ").unwrap();
/// assert_eq!(email.as_str(), "jo@beanvoyage.coffee");
///
/// assert!(Email::parse("jo@localhost").is_err()); // domain needs a dot
/// assert!(Email::parse("a b@c.d").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an `Email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, contains
    /// whitespace, lacks exactly one `@`, or has an empty local part or a
    /// domain without a dot.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
        {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
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

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
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
    fn test_parse_valid_emails() {
        assert!(Email::parse("user@example.com").is_ok());
        assert!(Email::parse("user.name+tag@example.co.uk").is_ok());
        assert!(Email::parse("a@b.c").is_ok());
    }

    #[test]
    fn test_parse_normalizes_domain_only() {
        let email = Email::parse(" Barista@Example.COM\n").unwrap();
        assert_eq!(email.as_str(), "Barista@example.com");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at-symbol"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c.com"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@domain.com"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@.com"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("us er@x.com"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<Email>("\"bad\"").is_err());
        let email: Email = serde_json::from_str("\"jo@X.io\"").unwrap();
        assert_eq!(email.as_str(), "jo@x.io");
    }
}
