use serde::{Deserialize, Serialize};

use super::TagId;

/// A topical label attached to projects through the `have_tags` association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
}

impl Tag {
    /// Creates a new tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutuals::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "rust");
    /// assert_eq!(tag.id(), TagId::new(1));
    /// assert_eq!(tag.name(), "rust");
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the tag's unique identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the tag's label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalizes a raw tag label: trims surrounding whitespace and lower-cases it.
    ///
    /// # Examples
    ///
    /// ```
    /// use mutuals::Tag;
    ///
    /// assert_eq!(Tag::normalize("  Rust "), "rust");
    /// ```
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}
