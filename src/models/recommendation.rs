use serde::{Deserialize, Serialize};

use super::UserId;

/// A ranked friend suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub user_id: UserId,
    pub username: String,
    pub score: f64,
}

impl Recommendation {
    pub fn new(user_id: UserId, username: impl Into<String>, score: f64) -> Self {
        Self {
            user_id,
            username: username.into(),
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_fields() {
        let rec = Recommendation::new(UserId::new("u7"), "grace", 1.5);
        let json = serde_json::to_value(&rec).unwrap();

        assert_eq!(json["user_id"], "u7");
        assert_eq!(json["username"], "grace");
        assert_eq!(json["score"], 1.5);
    }
}
