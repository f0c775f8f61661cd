use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ProjectId, Tag, UserId};

/// A project owned by exactly one user, together with its tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier from the database.
    pub id: ProjectId,
    /// The owning user.
    pub owner: UserId,
    /// Human readable title.
    pub title: String,
    /// When this project was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Tags attached via `have_tags`.
    pub tags: Vec<Tag>,
}

impl Project {
    /// Returns the tag labels in attachment order.
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(Tag::name).collect()
    }
}
