pub mod config;
pub mod db;
pub mod engine;
pub mod leaderboard;
pub mod models;
pub mod profile;
pub mod scoring;
pub mod service;
pub mod source;

pub use config::{EngineConfig, FailurePolicy};
pub use db::Database;
pub use engine::{ConnectOutcome, RecommendError, RecommendationEngine};
pub use leaderboard::LeaderboardEntry;
pub use models::{
    FeedItem, Project, ProjectId, ProjectUpdate, Recommendation, Tag, TagId, UpdateId, User,
    UserId,
};
pub use service::SocialService;
pub use source::{DataSource, Filter, Row, SourceError, Table};
