//! Cooperative record locking.
//!
//! A [`FeatureLock`] pairs an authorization token with a duration. Records
//! locked under a token can only be modified by transactions holding that
//! token as an authorization. The [`LockManager`] keeps the lock table.

mod manager;
mod token;

pub use manager::{CheckedWriter, LockManager};
pub use token::{generate_token, generate_token_at, reset_counter};

use std::time::Duration;

/// An immutable lock: authorization token and duration.
///
/// The duration counts from the moment a record is locked; the manager
/// stores the resulting expiry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureLock {
    authorization: String,
    duration: Duration,
}

impl FeatureLock {
    /// Authorization of the transaction lock.
    pub const TRANSACTION_AUTHORIZATION: &'static str = "TRANSACTION";

    /// Creates a lock from an existing token.
    pub fn new(authorization: impl Into<String>, duration: Duration) -> Self {
        Self {
            authorization: authorization.into(),
            duration,
        }
    }

    /// Creates a lock with a freshly generated token.
    pub fn generate(name: &str, duration: Duration) -> Self {
        Self::new(generate_token(name, duration), duration)
    }

    /// The lock held until the locking transaction commits or rolls back.
    pub fn transaction() -> Self {
        Self::new(Self::TRANSACTION_AUTHORIZATION, Duration::ZERO)
    }

    /// True for [`FeatureLock::transaction`].
    pub fn is_transaction(&self) -> bool {
        self.authorization == Self::TRANSACTION_AUTHORIZATION
    }

    /// The authorization token.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    /// How long a lock lasts once taken.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}
