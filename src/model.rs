//! Wire types returned by the catalog.
//!
//! Relation collections are always present (possibly empty) so they
//! serialize as JSON arrays, never `null`.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoFormat {
    pub id: i64,
    pub name: String,
    pub file_path: String,
}

/// One catalog entry with its hydrated relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub date: String,
    pub jpg: String,
    pub pictures_dir: String,
    pub actors: Vec<Actor>,
    pub tags: Vec<Tag>,
    pub formats: Vec<VideoFormat>,
    pub is_favorite: bool,
    /// `None` means unrated; stored ratings are always 1-5.
    pub rating: Option<u8>,
    pub created_at: String,
    pub updated_at: String,
}

impl Video {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Video {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            date: row.get(3)?,
            jpg: row.get(4)?,
            pictures_dir: row.get(5)?,
            actors: Vec::new(),
            tags: Vec::new(),
            formats: Vec::new(),
            is_favorite: false,
            rating: None,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Favorite {
    pub id: i64,
    pub video_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rating {
    pub id: i64,
    pub video_id: String,
    pub rating: u8,
    pub created_at: String,
    pub updated_at: String,
}

/// A page of listing results plus the pagination math for the whole match set.
#[derive(Debug, Clone, Serialize)]
pub struct VideoPage {
    pub data: Vec<Video>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Row counts for every catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub videos: i64,
    pub actors: i64,
    pub tags: i64,
    pub video_actors: i64,
    pub video_tags: i64,
    pub video_formats: i64,
    pub search_entries: i64,
    pub favorites: i64,
    pub ratings: i64,
}
