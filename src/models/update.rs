use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ProjectId, UpdateId, UserId};

/// A progress note posted against a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    pub id: UpdateId,
    pub project_id: ProjectId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An update joined with the project and owner it belongs to, as shown in
/// the activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub update: ProjectUpdate,
    pub project_title: String,
    pub owner: UserId,
    /// Owner's display name, or "Unknown" when the account is gone.
    pub username: String,
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_item_flattens_update_fields() {
        let item = FeedItem {
            update: ProjectUpdate {
                id: UpdateId::new(3),
                project_id: ProjectId::new(7),
                content: "shipped the parser".to_string(),
                created_at: OffsetDateTime::UNIX_EPOCH,
            },
            project_title: "compiler".to_string(),
            owner: UserId::new("u1"),
            username: "ada".to_string(),
            tags: vec!["rust".to_string()],
        };

        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["project_id"], 7);
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["project_title"], "compiler");
        assert_eq!(json["tags"][0], "rust");
    }
}
