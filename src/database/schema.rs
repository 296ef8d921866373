use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;

/// Every statement is `IF NOT EXISTS`, so applying this to an initialized
/// store creates nothing and fails on nothing.
pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS videos (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL DEFAULT '',
        url TEXT NOT NULL DEFAULT '',
        date TEXT NOT NULL DEFAULT '',
        jpg TEXT NOT NULL DEFAULT '',
        pictures_dir TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_videos_date ON videos(date);
    CREATE INDEX IF NOT EXISTS idx_videos_title ON videos(title);

    CREATE TABLE IF NOT EXISTS actors (
        id INTEGER PRIMARY KEY,
        name TEXT UNIQUE NOT NULL
    );

    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY,
        name TEXT UNIQUE NOT NULL
    );

    CREATE TABLE IF NOT EXISTS video_actors (
        video_id TEXT NOT NULL,
        actor_id INTEGER NOT NULL,
        FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE,
        FOREIGN KEY(actor_id) REFERENCES actors(id),
        PRIMARY KEY(video_id, actor_id)
    );
    CREATE INDEX IF NOT EXISTS idx_video_actors_actor ON video_actors(actor_id);

    CREATE TABLE IF NOT EXISTS video_tags (
        video_id TEXT NOT NULL,
        tag_id INTEGER NOT NULL,
        FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE,
        FOREIGN KEY(tag_id) REFERENCES tags(id),
        PRIMARY KEY(video_id, tag_id)
    );
    CREATE INDEX IF NOT EXISTS idx_video_tags_tag ON video_tags(tag_id);

    CREATE TABLE IF NOT EXISTS video_formats (
        id INTEGER PRIMARY KEY,
        video_id TEXT NOT NULL,
        name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE,
        UNIQUE(video_id, name)
    );

    CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY,
        video_id TEXT UNIQUE NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS ratings (
        id INTEGER PRIMARY KEY,
        video_id TEXT UNIQUE NOT NULL,
        rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS search_index USING fts5(video_id UNINDEXED, title, actors, tags);
";

/// Tables the bootstrap is expected to produce.
pub const TABLES: [&str; 9] = [
    "videos",
    "actors",
    "tags",
    "video_actors",
    "video_tags",
    "video_formats",
    "favorites",
    "ratings",
    "search_index",
];

pub fn bootstrap(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    debug!("Schema bootstrap applied");
    Ok(())
}
