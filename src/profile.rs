//! Per-user social profiles and an optional cache for them.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use crate::source::{DataSource, Filter, SourceError, Table, row_i64, row_text};
use crate::{TagId, UserId};

/// Transient view of a user's place in the social graph.
///
/// `connected_users_tags` is a multiset: every direct connection contributes
/// its own project tags, so a tag shared by several connections appears
/// several times and weighs more when scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub connections: HashSet<UserId>,
    pub project_tags: HashSet<TagId>,
    pub connected_users_tags: Vec<TagId>,
}

impl UserProfile {
    /// Builds a profile for `user` from the data source.
    ///
    /// Connections are read in both directions: a row with `user_id = user`
    /// yields its `friend_id`, a row with `friend_id = user` yields its
    /// `user_id`.
    pub fn load<S: DataSource + ?Sized>(source: &S, user: &UserId) -> Result<Self, SourceError> {
        let connections = fetch_connections(source, user)?;
        let project_tags = fetch_project_tags(source, user)?;

        let mut connected_users_tags = Vec::new();
        for friend in &connections {
            connected_users_tags.extend(fetch_project_tags(source, friend)?);
        }

        Ok(Self {
            connections,
            project_tags,
            connected_users_tags,
        })
    }

    /// Returns true if `user` is a direct connection.
    pub fn is_connected_to(&self, user: &UserId) -> bool {
        self.connections.contains(user)
    }
}

/// Ids of every user directly connected to `user`.
pub fn fetch_connections<S: DataSource + ?Sized>(
    source: &S,
    user: &UserId,
) -> Result<HashSet<UserId>, SourceError> {
    let mut connections = HashSet::new();

    for (filter_column, other_column) in [("user_id", "friend_id"), ("friend_id", "user_id")] {
        let rows = source.query_rows(
            Table::Connections,
            &Filter::eq(filter_column, user.as_str()),
        )?;
        for row in rows {
            if let Some(other) = row_text(&row, Table::Connections, other_column)? {
                let other = UserId::new(other);
                if !other.is_blank() && &other != user {
                    connections.insert(other);
                }
            }
        }
    }

    Ok(connections)
}

/// Distinct tags across every project owned by `user`.
pub fn fetch_project_tags<S: DataSource + ?Sized>(
    source: &S,
    user: &UserId,
) -> Result<HashSet<TagId>, SourceError> {
    let projects = source.query_rows(Table::Projects, &Filter::eq("user_id", user.as_str()))?;
    let project_ids = projects
        .iter()
        .map(|row| row_i64(row, Table::Projects, "id"))
        .collect::<Result<Vec<_>, _>>()?;

    if project_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let links = source.query_rows(Table::HaveTags, &Filter::one_of("project_id", project_ids))?;
    links
        .iter()
        .map(|row| row_i64(row, Table::HaveTags, "tag_id").map(TagId::new))
        .collect()
}

/// Cache of loaded profiles keyed by user.
///
/// Entries stay valid until explicitly invalidated; callers that write
/// connections or tags must invalidate the affected users.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: Mutex<HashMap<UserId, UserProfile>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached profile for `user`, if present.
    pub fn get(&self, user: &UserId) -> Option<UserProfile> {
        self.lock().get(user).cloned()
    }

    pub fn insert(&self, user: UserId, profile: UserProfile) {
        self.lock().insert(user, profile);
    }

    /// Drops `user`'s profile and every profile that lists `user` as a
    /// connection, since their second-degree tags depend on it.
    pub fn invalidate(&self, user: &UserId) {
        self.lock()
            .retain(|key, profile| key != user && !profile.is_connected_to(user));
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, UserProfile>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
