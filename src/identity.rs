//! Actor identity supplied by the surrounding application.
//!
//! Authentication happens outside this crate. Every operation receives the
//! acting user's identifier from the caller and trusts it as given.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a user identifier, matching `VARCHAR(128)`.
const MAX_USER_ID_LENGTH: usize = 128;

/// Opaque, stable identifier for a marketplace user.
///
/// Identifiers are ordered so that an unordered pair of users can be stored
/// in a canonical sorted form.
///
/// # Examples
///
/// ```
/// use taskmarket::identity::UserId;
///
/// let user = UserId::new("u-1001").expect("valid user id");
/// assert_eq!(user.as_str(), "u-1001");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a validated user identifier.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUserId`] when the value is blank, longer than 128
    /// bytes, or contains interior whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidUserId> {
        let raw = value.into();
        let normalized = raw.trim();
        let is_valid = !normalized.is_empty()
            && normalized.len() <= MAX_USER_ID_LENGTH
            && !normalized.chars().any(char::is_whitespace);

        if !is_valid {
            return Err(InvalidUserId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for UserId {
    type Error = InvalidUserId;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Error returned for malformed user identifiers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid user identifier '{0}'")]
pub struct InvalidUserId(pub String);
