//! Favorites and ratings: user-owned state, mutated independently of imports.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::query::video_exists;
use crate::database::store::Store;
use crate::error::{CatalogError, Result};
use crate::model::{Favorite, Rating};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn set_rating(store: &Store, video_id: &str, rating: i64) -> Result<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(CatalogError::InvalidRating(rating));
    }
    if !video_exists(store, video_id)? {
        return Err(CatalogError::not_found(video_id));
    }
    store.conn().execute(
        "INSERT INTO ratings (video_id, rating) VALUES (?1, ?2)
         ON CONFLICT(video_id) DO UPDATE SET
             rating = excluded.rating,
             updated_at = datetime('now')",
        params![video_id, rating],
    )?;
    debug!(video_id, rating, "Rating set");
    Ok(())
}

/// Idempotent: removing an absent rating succeeds.
pub fn remove_rating(store: &Store, video_id: &str) -> Result<()> {
    store
        .conn()
        .execute("DELETE FROM ratings WHERE video_id = ?1", params![video_id])?;
    Ok(())
}

pub fn get_rating(store: &Store, video_id: &str) -> Result<Option<u8>> {
    let rating = store
        .conn()
        .query_row(
            "SELECT rating FROM ratings WHERE video_id = ?1",
            params![video_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(rating)
}

pub fn list_ratings(store: &Store) -> Result<Vec<Rating>> {
    let mut stmt = store.conn().prepare(
        "SELECT id, video_id, rating, created_at, updated_at
         FROM ratings ORDER BY updated_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Rating {
            id: row.get(0)?,
            video_id: row.get(1)?,
            rating: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

/// Idempotent: favoriting twice keeps the original row.
pub fn add_favorite(store: &Store, video_id: &str) -> Result<()> {
    if !video_exists(store, video_id)? {
        return Err(CatalogError::not_found(video_id));
    }
    store.conn().execute(
        "INSERT OR IGNORE INTO favorites (video_id) VALUES (?1)",
        params![video_id],
    )?;
    Ok(())
}

pub fn remove_favorite(store: &Store, video_id: &str) -> Result<()> {
    store
        .conn()
        .execute("DELETE FROM favorites WHERE video_id = ?1", params![video_id])?;
    Ok(())
}

/// Newest first.
pub fn list_favorites(store: &Store) -> Result<Vec<Favorite>> {
    let mut stmt = store.conn().prepare(
        "SELECT id, video_id, created_at FROM favorites ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Favorite {
            id: row.get(0)?,
            video_id: row.get(1)?,
            created_at: row.get(2)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}
