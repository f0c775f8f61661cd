use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::UserId;

/// A registered account as seen by the recommendation subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

impl User {
    /// Creates a new user.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutuals::{User, UserId};
    /// use time::OffsetDateTime;
    ///
    /// let user = User::new(UserId::new("u1"), "ada", OffsetDateTime::UNIX_EPOCH);
    /// assert_eq!(user.id().as_str(), "u1");
    /// assert_eq!(user.username(), "ada");
    /// ```
    pub fn new(id: UserId, username: impl Into<String>, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            username: username.into(),
            created_at,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name shown on recommendation cards.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}
