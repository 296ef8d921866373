//! Media catalog core: schema bootstrap, filtered listing, relation
//! hydration, user favorites/ratings and transactional bulk import, all
//! backed by one SQLite store.

pub mod database;
pub mod error;
pub mod ingest;
pub mod model;
pub mod utils;

pub use database::query::{
    catalog_stats, get_video, list_actors, list_tags, list_videos, list_videos_with, SortOrder,
    VideoFilter,
};
pub use database::relations::{PerRowLoader, RelationLoader};
pub use database::store::Store;
pub use database::user_state::{
    add_favorite, get_rating, list_favorites, list_ratings, remove_favorite, remove_rating,
    set_rating,
};
pub use error::{CatalogError, Result};
pub use ingest::importer::{import_batch, import_batch_with, import_json, parse_batch, CatalogRecord};
