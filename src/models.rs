mod ids;
mod project;
mod recommendation;
mod tag;
mod update;
mod user;

pub use ids::{ProjectId, TagId, UpdateId, UserId};
pub use project::Project;
pub use recommendation::Recommendation;
pub use tag::Tag;
pub use update::{FeedItem, ProjectUpdate};
pub use user::User;
