use std::collections::BTreeMap;

use rusqlite::{params, Transaction};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::database::store::Store;
use crate::error::Result;

/// One catalog entry as submitted for import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub jpg: String,
    #[serde(default)]
    pub pictures_dir: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub actors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    /// Variant name (e.g. "720p") to file path.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub formats: BTreeMap<String, String>,
}

/// Explicit `null` reads as an empty collection.
fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Parse a JSON array of records. Fails before any database work.
pub fn parse_batch(data: &[u8]) -> Result<Vec<CatalogRecord>> {
    Ok(serde_json::from_slice(data)?)
}

pub fn import_json(store: &mut Store, data: &[u8]) -> Result<usize> {
    let records = parse_batch(data)?;
    import_batch(store, &records)
}

pub fn import_batch(store: &mut Store, records: &[CatalogRecord]) -> Result<usize> {
    import_batch_with(store, records, |_| {})
}

/// Upsert every record and replace its relations inside one transaction.
/// `on_record` is called after each record is written (not yet committed).
pub fn import_batch_with<F>(
    store: &mut Store,
    records: &[CatalogRecord],
    mut on_record: F,
) -> Result<usize>
where
    F: FnMut(&CatalogRecord),
{
    info!("Importing {} catalog records", records.len());

    let result = store.write(|tx| {
        let mut writer = RecordWriter::new(tx)?;
        for record in records {
            writer.write(record)?;
            on_record(record);
        }
        Ok(records.len())
    });

    match result {
        Ok(count) => {
            info!("Imported {} catalog records", count);
            Ok(count)
        }
        Err(e) => {
            warn!("Import rolled back: {}", e);
            Err(e)
        }
    }
}

/// Prepared statements for one import transaction.
struct RecordWriter<'conn> {
    upsert_video: rusqlite::CachedStatement<'conn>,
    clear_actors: rusqlite::CachedStatement<'conn>,
    clear_tags: rusqlite::CachedStatement<'conn>,
    clear_formats: rusqlite::CachedStatement<'conn>,
    clear_search: rusqlite::CachedStatement<'conn>,
    insert_actor: rusqlite::CachedStatement<'conn>,
    actor_id: rusqlite::CachedStatement<'conn>,
    link_actor: rusqlite::CachedStatement<'conn>,
    insert_tag: rusqlite::CachedStatement<'conn>,
    tag_id: rusqlite::CachedStatement<'conn>,
    link_tag: rusqlite::CachedStatement<'conn>,
    insert_format: rusqlite::CachedStatement<'conn>,
    insert_search: rusqlite::CachedStatement<'conn>,
}

impl<'conn> RecordWriter<'conn> {
    fn new(tx: &'conn Transaction<'_>) -> Result<Self> {
        Ok(Self {
            upsert_video: tx.prepare_cached(
                "INSERT INTO videos (id, title, url, date, jpg, pictures_dir)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     title = excluded.title,
                     url = excluded.url,
                     date = excluded.date,
                     jpg = excluded.jpg,
                     pictures_dir = excluded.pictures_dir,
                     updated_at = datetime('now')",
            )?,
            clear_actors: tx.prepare_cached("DELETE FROM video_actors WHERE video_id = ?1")?,
            clear_tags: tx.prepare_cached("DELETE FROM video_tags WHERE video_id = ?1")?,
            clear_formats: tx.prepare_cached("DELETE FROM video_formats WHERE video_id = ?1")?,
            clear_search: tx.prepare_cached("DELETE FROM search_index WHERE video_id = ?1")?,
            insert_actor: tx.prepare_cached("INSERT OR IGNORE INTO actors (name) VALUES (?1)")?,
            actor_id: tx.prepare_cached("SELECT id FROM actors WHERE name = ?1")?,
            link_actor: tx.prepare_cached(
                "INSERT OR IGNORE INTO video_actors (video_id, actor_id) VALUES (?1, ?2)",
            )?,
            insert_tag: tx.prepare_cached("INSERT OR IGNORE INTO tags (name) VALUES (?1)")?,
            tag_id: tx.prepare_cached("SELECT id FROM tags WHERE name = ?1")?,
            link_tag: tx.prepare_cached(
                "INSERT OR IGNORE INTO video_tags (video_id, tag_id) VALUES (?1, ?2)",
            )?,
            insert_format: tx.prepare_cached(
                "INSERT INTO video_formats (video_id, name, file_path) VALUES (?1, ?2, ?3)",
            )?,
            insert_search: tx.prepare_cached(
                "INSERT INTO search_index (video_id, title, actors, tags) VALUES (?1, ?2, ?3, ?4)",
            )?,
        })
    }

    fn write(&mut self, record: &CatalogRecord) -> Result<()> {
        let id = record.id.as_str();

        self.upsert_video.execute(params![
            id,
            record.title,
            record.url,
            record.date,
            record.jpg,
            record.pictures_dir,
        ])?;

        // Re-import replaces relations wholesale.
        self.clear_actors.execute(params![id])?;
        self.clear_tags.execute(params![id])?;
        self.clear_formats.execute(params![id])?;
        self.clear_search.execute(params![id])?;

        for name in &record.actors {
            self.insert_actor.execute(params![name])?;
            let actor_id: i64 = self.actor_id.query_row(params![name], |row| row.get(0))?;
            self.link_actor.execute(params![id, actor_id])?;
        }

        for name in &record.tags {
            self.insert_tag.execute(params![name])?;
            let tag_id: i64 = self.tag_id.query_row(params![name], |row| row.get(0))?;
            self.link_tag.execute(params![id, tag_id])?;
        }

        for (name, file_path) in &record.formats {
            self.insert_format.execute(params![id, name, file_path])?;
        }

        self.insert_search.execute(params![
            id,
            record.title,
            record.actors.join(","),
            record.tags.join(","),
        ])?;

        debug!(
            video_id = id,
            actors = record.actors.len(),
            tags = record.tags.len(),
            formats = record.formats.len(),
            "Wrote catalog record"
        );
        Ok(())
    }
}
