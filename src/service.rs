
use std::collections::HashSet;

use anyhow::{Context, Result, bail};
use rusqlite::OptionalExtension;
use time::OffsetDateTime;

use crate::leaderboard::{self, LeaderboardEntry};
use crate::profile::fetch_connections;
use crate::{
    Database, FeedItem, Project, ProjectId, ProjectUpdate, Tag, TagId, UpdateId, User, UserId,
};

/// Display name used when a project's owner no longer exists.
const UNKNOWN_USERNAME: &str = "Unknown";

/// Service layer for accounts, projects, tags and project updates.
///
/// SocialService owns a Database instance and provides the write paths that
/// populate the social graph the recommendation engine reads from.
///
/// # Examples
///
/// ```
/// use mutuals::{Database, SocialService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = SocialService::new(db);
/// let user = service.create_user("auth-1", "ada")?;
/// assert_eq!(user.username(), "ada");
/// # Ok(())
/// # }
/// ```
pub struct SocialService {
    db: Database,
}

impl SocialService {
    /// Creates a new SocialService with the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Registers a new user.
    ///
    /// Both the id and the username must be non-blank. Registering an id
    /// twice is an error.
    pub fn create_user(&self, auth_id: &str, username: &str) -> Result<User> {
        let id = UserId::new(auth_id.trim());
        let username = username.trim();
        if id.is_blank() {
            bail!("User id cannot be empty");
        }
        if username.is_empty() {
            bail!("Username cannot be empty");
        }
        if self.get_user(&id)?.is_some() {
            bail!("User {id} already exists");
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.db
            .connection()
            .execute(
                "INSERT INTO users (auth_id, username, created_at) VALUES (?1, ?2, ?3)",
                (id.as_str(), username, now),
            )
            .with_context(|| format!("Failed to create user {id}"))?;

        Ok(User::new(
            id,
            username,
            OffsetDateTime::from_unix_timestamp(now)?,
        ))
    }

    /// Retrieves a user by id.
    ///
    /// Returns `None` if no such user exists.
    pub fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row = self
            .db
            .connection()
            .query_row(
                "SELECT auth_id, username, created_at FROM users WHERE auth_id = ?1",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, username, created_at)| build_user(id, username, created_at))
            .transpose()
    }

    /// Lists all users in registration order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.db.connection();
        let mut stmt =
            conn.prepare("SELECT auth_id, username, created_at FROM users ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut users = Vec::new();
        for row in rows {
            let (id, username, created_at) = row?;
            users.push(build_user(id, username, created_at)?);
        }
        Ok(users)
    }

    /// Gets the id of the tag named `name`, creating the tag if needed.
    ///
    /// Names are normalized (trimmed, lower-cased) before lookup.
    pub fn get_or_create_tag(&self, name: &str) -> Result<TagId> {
        let normalized = Tag::normalize(name);
        if normalized.is_empty() {
            bail!("Tag name cannot be empty");
        }
        let conn = self.db.connection();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE",
                [&normalized],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(TagId::new(id));
        }

        conn.execute("INSERT INTO tags (name) VALUES (?1)", [&normalized])?;
        Ok(TagId::new(conn.last_insert_rowid()))
    }

    /// Creates a project owned by `owner` with optional tags.
    ///
    /// Runs in a single transaction. Duplicate and blank tag names are
    /// dropped after normalization.
    pub fn create_project(
        &self,
        owner: &UserId,
        title: &str,
        tags: Option<&[&str]>,
    ) -> Result<Project> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Project title cannot be empty");
        }
        if self.get_user(owner)?.is_none() {
            bail!("Unknown user: {owner}");
        }

        let conn = self.db.connection();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        conn.execute("BEGIN TRANSACTION", [])?;

        let result: Result<Project> = (|| {
            conn.execute(
                "INSERT INTO projects (user_id, title, created_at) VALUES (?1, ?2, ?3)",
                (owner.as_str(), title, now),
            )?;
            let project_id = conn.last_insert_rowid();

            let mut attached = Vec::new();
            let mut seen = HashSet::new();
            for name in tags.unwrap_or_default() {
                let normalized = Tag::normalize(name);
                if normalized.is_empty() || !seen.insert(normalized.clone()) {
                    continue;
                }

                let tag_id = self.get_or_create_tag(&normalized)?;
                conn.execute(
                    "INSERT INTO have_tags (project_id, tag_id) VALUES (?1, ?2)",
                    (project_id, tag_id.get()),
                )?;
                attached.push(Tag::new(tag_id, normalized));
            }

            Ok(Project {
                id: ProjectId::new(project_id),
                owner: owner.clone(),
                title: title.to_string(),
                created_at: OffsetDateTime::from_unix_timestamp(now)?,
                tags: attached,
            })
        })();

        match result {
            Ok(project) => {
                conn.execute("COMMIT", [])?;
                Ok(project)
            }
            Err(e) => {
                conn.execute("ROLLBACK", []).ok();
                Err(e)
            }
        }
    }

    /// Lists `owner`'s projects, newest first, with their tags.
    pub fn list_projects(&self, owner: &UserId) -> Result<Vec<Project>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, title, created_at FROM projects
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([owner.as_str()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut tag_stmt = conn.prepare(
            "SELECT t.id, t.name FROM have_tags ht
             JOIN tags t ON ht.tag_id = t.id
             WHERE ht.project_id = ?1
             ORDER BY ht.rowid",
        )?;

        let mut projects = Vec::new();
        for row in rows {
            let (id, title, created_at) = row?;
            let tags = tag_stmt
                .query_map([id], |row| {
                    Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            projects.push(Project {
                id: ProjectId::new(id),
                owner: owner.clone(),
                title,
                created_at: OffsetDateTime::from_unix_timestamp(created_at.unwrap_or(0))?,
                tags,
            });
        }
        Ok(projects)
    }

    /// Lists the users directly connected to `user`, in either direction, sorted by id.
    pub fn list_connections(&self, user: &UserId) -> Result<Vec<UserId>> {
        let mut connections: Vec<UserId> = fetch_connections(&self.db, user)
            .with_context(|| format!("Failed to load connections for {user}"))?
            .into_iter()
            .collect();
        connections.sort();
        Ok(connections)
    }

    /// Posts an update to `project`, timestamped now.
    pub fn add_update(&self, project: ProjectId, content: &str) -> Result<ProjectUpdate> {
        self.add_update_at(project, content, OffsetDateTime::now_utc())
    }

    /// Posts an update to `project` with an explicit timestamp.
    ///
    /// Timestamps are stored with whole-second precision.
    pub fn add_update_at(
        &self,
        project: ProjectId,
        content: &str,
        at: OffsetDateTime,
    ) -> Result<ProjectUpdate> {
        let content = content.trim();
        if content.is_empty() {
            bail!("Update content cannot be empty");
        }

        let conn = self.db.connection();
        let exists = conn
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                [project.get()],
                |_| Ok(()),
            )
            .optional()?;
        if exists.is_none() {
            bail!("Unknown project: {project}");
        }

        let timestamp = at.unix_timestamp();
        conn.execute(
            "INSERT INTO project_updates (project_id, content, created_at) VALUES (?1, ?2, ?3)",
            (project.get(), content, timestamp),
        )
        .with_context(|| format!("Failed to add update to project {project}"))?;

        Ok(ProjectUpdate {
            id: UpdateId::new(conn.last_insert_rowid()),
            project_id: project,
            content: content.to_string(),
            created_at: OffsetDateTime::from_unix_timestamp(timestamp)?,
        })
    }

    /// Lists `project`'s updates, oldest first.
    pub fn list_updates(&self, project: ProjectId) -> Result<Vec<ProjectUpdate>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, content, created_at FROM project_updates
             WHERE project_id = ?1
             ORDER BY created_at, id",
        )?;
        let rows = stmt.query_map([project.get()], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut updates = Vec::new();
        for row in rows {
            let (id, content, created_at) = row?;
            updates.push(ProjectUpdate {
                id: UpdateId::new(id),
                project_id: project,
                content,
                created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
            });
        }
        Ok(updates)
    }

    /// Most recent updates across all projects, newest first, joined with
    /// their project, owner and tags.
    pub fn update_feed(&self, limit: usize) -> Result<Vec<FeedItem>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT pu.id, pu.project_id, pu.content, pu.created_at,
                    p.title, p.user_id, u.username
             FROM project_updates pu
             JOIN projects p ON pu.project_id = p.id
             LEFT JOIN users u ON p.user_id = u.auth_id
             ORDER BY pu.created_at DESC, pu.id DESC
             LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map([limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut tag_stmt = conn.prepare(
            "SELECT t.name FROM have_tags ht
             JOIN tags t ON ht.tag_id = t.id
             WHERE ht.project_id = ?1
             ORDER BY ht.rowid",
        )?;

        let mut feed = Vec::new();
        for row in rows {
            let (id, project_id, content, created_at, title, owner, username) = row?;
            let tags = tag_stmt
                .query_map([project_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            feed.push(FeedItem {
                update: ProjectUpdate {
                    id: UpdateId::new(id),
                    project_id: ProjectId::new(project_id),
                    content,
                    created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
                },
                project_title: title,
                owner: UserId::new(owner),
                username: username.unwrap_or_else(|| UNKNOWN_USERNAME.to_string()),
                tags,
            });
        }
        Ok(feed)
    }

    /// Ranks every project by update activity as of `now`.
    ///
    /// See [`leaderboard::rank`] for the ordering. Projects that tie on
    /// every key stay in creation order.
    pub fn leaderboard(&self, now: OffsetDateTime) -> Result<Vec<LeaderboardEntry>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT p.user_id, u.username FROM projects p
             LEFT JOIN users u ON p.user_id = u.auth_id
             GROUP BY p.user_id
             ORDER BY MIN(p.id)",
        )?;
        let owners = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut entries = Vec::new();
        for (owner, username) in owners {
            let owner = UserId::new(owner);
            let username = username.unwrap_or_else(|| UNKNOWN_USERNAME.to_string());
            for project in self.list_projects(&owner)? {
                let updates: Vec<OffsetDateTime> = self
                    .list_updates(project.id)?
                    .into_iter()
                    .map(|update| update.created_at)
                    .collect();
                entries.push(LeaderboardEntry::new(&project, &username, &updates, now));
            }
        }

        entries.sort_by_key(|entry| entry.project_id.get());
        leaderboard::rank(&mut entries);
        Ok(entries)
    }
}

fn build_user(id: String, username: String, created_at: Option<i64>) -> Result<User> {
    Ok(User::new(
        UserId::new(id),
        username,
        OffsetDateTime::from_unix_timestamp(created_at.unwrap_or(0))?,
    ))
}
