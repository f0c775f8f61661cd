/// Complete database schema for the social graph store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
pub const INITIAL_SCHEMA: &str = r#"
-- Users table: one row per account, keyed by the auth provider id
CREATE TABLE IF NOT EXISTS users (
    auth_id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL,
    created_at INTEGER
);

-- Connections table: directed (user_id, friend_id) rows, one per connect action
CREATE TABLE IF NOT EXISTS connections (
    user_id TEXT NOT NULL,
    friend_id TEXT NOT NULL,
    UNIQUE (user_id, friend_id),
    FOREIGN KEY (user_id) REFERENCES users(auth_id) ON DELETE CASCADE,
    FOREIGN KEY (friend_id) REFERENCES users(auth_id) ON DELETE CASCADE
);

-- Projects table: each project belongs to exactly one user
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at INTEGER,
    FOREIGN KEY (user_id) REFERENCES users(auth_id) ON DELETE CASCADE
);

-- Tags table: stores unique tag names (case-insensitive)
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE COLLATE NOCASE
);

-- Junction table: links projects to tags (many-to-many)
CREATE TABLE IF NOT EXISTS have_tags (
    project_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (project_id, tag_id),
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

-- Project updates: dated progress notes feeding the activity feed and leaderboard
CREATE TABLE IF NOT EXISTS project_updates (
    id INTEGER PRIMARY KEY,
    project_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
);

-- Connection lookups run in both directions
CREATE INDEX IF NOT EXISTS idx_connections_user ON connections(user_id);
CREATE INDEX IF NOT EXISTS idx_connections_friend ON connections(friend_id);

CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id);
CREATE INDEX IF NOT EXISTS idx_have_tags_project ON have_tags(project_id);
CREATE INDEX IF NOT EXISTS idx_project_updates_project ON project_updates(project_id);
"#;
