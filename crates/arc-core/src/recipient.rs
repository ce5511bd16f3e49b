//! Recipient identity: an email address used to namespace key storage.
//!
//! The address is never embedded in a container; it only decides where the
//! recipient's private keys are written.

use std::fmt;
use std::str::FromStr;

use crate::error::{ArcError, ArcResult};

/// A validated recipient email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient {
    address: String,
}

impl Recipient {
    /// Validate and wrap an email address.
    ///
    /// Accepts `local@domain.tld` where the local part is drawn from
    /// `[A-Za-z0-9._%+-]`, the domain from `[A-Za-z0-9.-]`, and the final
    /// label is at least two ASCII letters.
    pub fn parse(address: &str) -> ArcResult<Self> {
        if is_valid_address(address) {
            Ok(Self {
                address: address.to_string(),
            })
        } else {
            Err(ArcError::Validation(format!(
                "invalid email address: {address}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Directory name for this recipient's keys: `@` becomes `_at_` and
    /// `.` becomes `_dot_`.
    pub fn sanitized(&self) -> String {
        sanitize(&self.address)
    }
}

/// Path-segment-safe rendering of an address.
///
/// `@` becomes `_at_` and `.` becomes `_dot_`. A literal `_` is doubled so
/// that distinct addresses never share a directory.
pub fn sanitize(address: &str) -> String {
    let mut out = String::with_capacity(address.len() + 8);
    for c in address.chars() {
        match c {
            '_' => out.push_str("__"),
            '@' => out.push_str("_at_"),
            '.' => out.push_str("_dot_"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for Recipient {
    type Err = ArcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Recipient {
    fn as_ref(&self) -> &str {
        &self.address
    }
}

fn is_valid_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-'))
    {
        return false;
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return false;
    }

    // The TLD is whatever follows the last dot; everything before it must be
    // non-empty.
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        for addr in [
            "daughter@example.com",
            "first.last+tag@mail.example.co.uk",
            "a_b%c-d@sub-domain.example.org",
        ] {
            assert!(Recipient::parse(addr).is_ok(), "{addr} should be valid");
        }
    }

    #[test]
    fn test_invalid_addresses() {
        for addr in [
            "",
            "no-at-sign.example.com",
            "@example.com",
            "user@",
            "user@example",
            "user@example.c",
            "user@example.c0m",
            "user@.com",
            "us er@example.com",
            "user@exa_mple.com",
            "user@@example.com",
        ] {
            let err = Recipient::parse(addr).unwrap_err();
            assert!(err.is_validation(), "{addr:?} should be a validation error");
        }
    }

    #[test]
    fn test_sanitized() {
        let r = Recipient::parse("daughter.one@example.com").unwrap();
        assert_eq!(r.sanitized(), "daughter_dot_one_at_example_dot_com");
        assert!(!r.sanitized().contains('@'));
        assert!(!r.sanitized().contains('.'));
    }

    #[test]
    fn test_sanitized_is_one_to_one() {
        let dotted = Recipient::parse("a.b@x.com").unwrap();
        let literal = Recipient::parse("a_dot_b@x.com").unwrap();
        assert_eq!(dotted.sanitized(), "a_dot_b_at_x_dot_com");
        assert_eq!(literal.sanitized(), "a__dot__b_at_x_dot_com");

        assert_ne!(sanitize("a_@x.com"), sanitize("a@_x.com"));
        assert_eq!(sanitize("first_last@example.com"), "first__last_at_example_dot_com");
    }

    #[test]
    fn test_from_str_and_display() {
        let r: Recipient = "someone@example.com".parse().unwrap();
        assert_eq!(r.to_string(), "someone@example.com");
        assert_eq!(r.as_str(), "someone@example.com");
    }
}
