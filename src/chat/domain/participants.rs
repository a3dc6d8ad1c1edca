//! Canonical unordered user pairs.

use super::ChatDomainError;
use crate::identity::UserId;
use serde::{Deserialize, Serialize};

/// Two distinct users stored in sorted order.
///
/// `ParticipantPair::new(a, b)` and `ParticipantPair::new(b, a)` are equal,
/// which is what makes the pair usable as a thread lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantPair {
    low: UserId,
    high: UserId,
}

impl ParticipantPair {
    /// Canonicalises two users into a pair.
    ///
    /// # Errors
    ///
    /// Returns [`ChatDomainError::SameParticipant`] when both are the same
    /// user.
    pub fn new(first: UserId, second: UserId) -> Result<Self, ChatDomainError> {
        match first.cmp(&second) {
            std::cmp::Ordering::Less => Ok(Self {
                low: first,
                high: second,
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                low: second,
                high: first,
            }),
            std::cmp::Ordering::Equal => Err(ChatDomainError::SameParticipant(first)),
        }
    }

    /// Returns the lexicographically smaller user.
    #[must_use]
    pub const fn low(&self) -> &UserId {
        &self.low
    }

    /// Returns the lexicographically larger user.
    #[must_use]
    pub const fn high(&self) -> &UserId {
        &self.high
    }

    /// Returns `true` when `user` is one of the pair.
    #[must_use]
    pub fn contains(&self, user: &UserId) -> bool {
        self.low == *user || self.high == *user
    }

    /// Returns the other member of the pair.
    #[must_use]
    pub fn other(&self, user: &UserId) -> Option<&UserId> {
        if self.low == *user {
            Some(&self.high)
        } else if self.high == *user {
            Some(&self.low)
        } else {
            None
        }
    }
}
