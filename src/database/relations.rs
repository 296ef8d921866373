//! Hydrates a video's actors, tags, formats, favorite flag and rating.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::model::{Actor, Tag, Video, VideoFormat};

/// Strategy for enriching listing rows with their relations.
///
/// Implementations must leave every collection present (empty when the
/// video has no related rows) and sort actors and tags by name, formats by
/// variant name.
pub trait RelationLoader {
    fn hydrate(&self, conn: &Connection, videos: &mut [Video]) -> Result<()>;
}

/// Issues one set of lookups per video.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerRowLoader;

impl RelationLoader for PerRowLoader {
    fn hydrate(&self, conn: &Connection, videos: &mut [Video]) -> Result<()> {
        for video in videos.iter_mut() {
            load_relations(conn, video)?;
        }
        Ok(())
    }
}

pub fn load_relations(conn: &Connection, video: &mut Video) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.id, a.name FROM actors a
         JOIN video_actors va ON va.actor_id = a.id
         WHERE va.video_id = ?1 ORDER BY a.name",
    )?;
    video.actors = stmt
        .query_map(params![video.id], |row| {
            Ok(Actor {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT t.id, t.name FROM tags t
         JOIN video_tags vt ON vt.tag_id = t.id
         WHERE vt.video_id = ?1 ORDER BY t.name",
    )?;
    video.tags = stmt
        .query_map(params![video.id], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare_cached(
        "SELECT id, name, file_path FROM video_formats WHERE video_id = ?1 ORDER BY name",
    )?;
    video.formats = stmt
        .query_map(params![video.id], |row| {
            Ok(VideoFormat {
                id: row.get(0)?,
                name: row.get(1)?,
                file_path: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    video.is_favorite = conn
        .prepare_cached("SELECT EXISTS(SELECT 1 FROM favorites WHERE video_id = ?1)")?
        .query_row(params![video.id], |row| row.get(0))?;

    video.rating = conn
        .prepare_cached("SELECT rating FROM ratings WHERE video_id = ?1")?
        .query_row(params![video.id], |row| row.get::<_, u8>(0))
        .optional()?;

    Ok(())
}
