//! Filtered, sorted, paginated listing of the catalog.
//!
//! Filters are composed into a single parameterized statement: every filter
//! value is bound through a numbered placeholder, never spliced into SQL.

use std::collections::BTreeSet;

use rusqlite::types::ToSql;
use rusqlite::{params, OptionalExtension};
use tracing::debug;

use crate::database::relations::{load_relations, PerRowLoader, RelationLoader};
use crate::database::store::Store;
use crate::error::{CatalogError, Result};
use crate::model::{Actor, CatalogStats, Tag, Video, VideoPage};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 20;

const VIDEO_COLUMNS: &str =
    "v.id, v.title, v.url, v.date, v.jpg, v.pictures_dir, v.created_at, v.updated_at";

/// Listing order. Ties on the sort key come back in whatever order the
/// store yields them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    TitleAsc,
    TitleDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date_desc",
            SortOrder::DateAsc => "date_asc",
            SortOrder::TitleAsc => "title_asc",
            SortOrder::TitleDesc => "title_desc",
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            SortOrder::DateDesc => "v.date DESC",
            SortOrder::DateAsc => "v.date ASC",
            SortOrder::TitleAsc => "v.title ASC",
            SortOrder::TitleDesc => "v.title DESC",
        }
    }
}

/// Unknown keys fall back to `date_desc`.
impl From<&str> for SortOrder {
    fn from(key: &str) -> Self {
        match key {
            "date_asc" => SortOrder::DateAsc,
            "title_asc" => SortOrder::TitleAsc,
            "title_desc" => SortOrder::TitleDesc,
            _ => SortOrder::DateDesc,
        }
    }
}

/// The enumerated set of listing filters. Every present filter narrows the
/// result; filters combine with AND.
#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    /// Literal substring of the search-index entry. Matching follows SQLite
    /// `LIKE`, so ASCII letters ignore case (`second` matches `Second`).
    pub query: Option<String>,
    /// The video must carry every one of these tags.
    pub tags: Vec<String>,
    /// The video must feature every one of these actors.
    pub actors: Vec<String>,
    /// Inclusive, compared lexicographically (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub favorite_only: bool,
    /// Values below 1 impose no constraint.
    pub min_rating: Option<i64>,
    pub has_formats: bool,
    /// Values below 1 normalize to 1.
    pub page: i64,
    /// Values below 1 normalize to 20.
    pub per_page: i64,
    pub sort: SortOrder,
}

impl VideoFilter {
    pub fn page(&self) -> i64 {
        if self.page < 1 {
            DEFAULT_PAGE
        } else {
            self.page
        }
    }

    pub fn per_page(&self) -> i64 {
        if self.per_page < 1 {
            DEFAULT_PER_PAGE
        } else {
            self.per_page
        }
    }

    fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.per_page())
    }
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    let per_page = per_page.max(1);
    (total / per_page + i64::from(total % per_page != 0)).max(1)
}

/// Escape SQL LIKE wildcard characters so they are matched literally.
pub fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Accumulates WHERE clauses and their bound values. Placeholders are
/// numbered in the order values are bound, so clause text and parameter
/// list can never drift apart.
#[derive(Default)]
pub struct QueryBuilder {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl QueryBuilder {
    pub fn bind<T: ToSql + 'static>(&mut self, value: T) -> String {
        self.values.push(Box::new(value));
        format!("?{}", self.values.len())
    }

    pub fn push(&mut self, clause: String) {
        self.clauses.push(clause);
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.values.iter().map(|v| v.as_ref()).collect()
    }

    pub fn from_filter(filter: &VideoFilter) -> Self {
        let mut qb = QueryBuilder::default();

        if let Some(q) = filter.query.as_deref().filter(|q| !q.is_empty()) {
            let p = qb.bind(format!("%{}%", escape_like(q)));
            qb.push(format!(
                r"v.id IN (SELECT video_id FROM search_index
                   WHERE title LIKE {p} ESCAPE '\'
                      OR actors LIKE {p} ESCAPE '\'
                      OR tags LIKE {p} ESCAPE '\')"
            ));
        }

        // One membership test per distinct name gives AND semantics.
        for name in distinct_names(&filter.tags) {
            let p = qb.bind(name);
            qb.push(format!(
                "EXISTS (SELECT 1 FROM video_tags vt JOIN tags t ON t.id = vt.tag_id
                  WHERE vt.video_id = v.id AND t.name = {p})"
            ));
        }
        for name in distinct_names(&filter.actors) {
            let p = qb.bind(name);
            qb.push(format!(
                "EXISTS (SELECT 1 FROM video_actors va JOIN actors a ON a.id = va.actor_id
                  WHERE va.video_id = v.id AND a.name = {p})"
            ));
        }

        if let Some(from) = filter.date_from.as_deref().filter(|d| !d.is_empty()) {
            let p = qb.bind(from.to_string());
            qb.push(format!("v.date >= {p}"));
        }
        if let Some(to) = filter.date_to.as_deref().filter(|d| !d.is_empty()) {
            let p = qb.bind(to.to_string());
            qb.push(format!("v.date <= {p}"));
        }

        if filter.favorite_only {
            qb.push("v.id IN (SELECT video_id FROM favorites)".to_string());
        }

        if let Some(min) = filter.min_rating.filter(|m| *m >= 1) {
            let p = qb.bind(min);
            qb.push(format!(
                "v.id IN (SELECT video_id FROM ratings WHERE rating >= {p})"
            ));
        }

        if filter.has_formats {
            qb.push(
                "EXISTS (SELECT 1 FROM video_formats f WHERE f.video_id = v.id)".to_string(),
            );
        }

        qb
    }
}

fn distinct_names(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .filter(|n| !n.is_empty())
        .cloned()
        .collect()
}

/// List videos matching `filter`, hydrating each row one at a time.
pub fn list_videos(store: &Store, filter: &VideoFilter) -> Result<VideoPage> {
    list_videos_with(store, filter, &PerRowLoader)
}

pub fn list_videos_with(
    store: &Store,
    filter: &VideoFilter,
    loader: &dyn RelationLoader,
) -> Result<VideoPage> {
    let conn = store.conn();
    let mut qb = QueryBuilder::from_filter(filter);
    let where_sql = qb.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM videos v{where_sql}");
    let total: i64 = conn.query_row(&count_sql, qb.params().as_slice(), |row| row.get(0))?;

    let page = filter.page();
    let per_page = filter.per_page();
    let limit = qb.bind(per_page);
    let offset = qb.bind(filter.offset());
    let page_sql = format!(
        "SELECT {VIDEO_COLUMNS} FROM videos v{where_sql} ORDER BY {} LIMIT {limit} OFFSET {offset}",
        filter.sort.order_by()
    );

    let mut stmt = conn.prepare(&page_sql)?;
    let mut videos = stmt
        .query_map(qb.params().as_slice(), Video::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    loader.hydrate(conn, &mut videos)?;

    debug!(
        total,
        page,
        per_page,
        returned = videos.len(),
        sort = filter.sort.as_str(),
        "Listed videos"
    );

    Ok(VideoPage {
        data: videos,
        total,
        page,
        per_page,
        total_pages: total_pages(total, per_page),
    })
}

/// Full enriched record for one identifier.
pub fn get_video(store: &Store, id: &str) -> Result<Video> {
    let conn = store.conn();
    let mut video = conn
        .query_row(
            &format!("SELECT {VIDEO_COLUMNS} FROM videos v WHERE v.id = ?1"),
            params![id],
            Video::from_row,
        )
        .optional()?
        .ok_or_else(|| CatalogError::not_found(id))?;
    load_relations(conn, &mut video)?;
    Ok(video)
}

pub fn video_exists(store: &Store, id: &str) -> Result<bool> {
    let exists = store.conn().query_row(
        "SELECT EXISTS(SELECT 1 FROM videos WHERE id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn list_tags(store: &Store) -> Result<Vec<Tag>> {
    let mut stmt = store.conn().prepare("SELECT id, name FROM tags ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn list_actors(store: &Store) -> Result<Vec<Actor>> {
    let mut stmt = store
        .conn()
        .prepare("SELECT id, name FROM actors ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Actor {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
}

pub fn catalog_stats(store: &Store) -> Result<CatalogStats> {
    let conn = store.conn();
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
    };
    Ok(CatalogStats {
        videos: count("videos")?,
        actors: count("actors")?,
        tags: count("tags")?,
        video_actors: count("video_actors")?,
        video_tags: count("video_tags")?,
        video_formats: count("video_formats")?,
        search_entries: count("search_index")?,
        favorites: count("favorites")?,
        ratings: count("ratings")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute_batch(
                "INSERT INTO videos (id, title, url, date, jpg, pictures_dir) VALUES
                    ('vid1', 'First Video', 'https://example.com/1', '2024-01-15', '/thumb1.jpg', '/pics/vid1/'),
                    ('vid2', 'Second Video', 'https://example.com/2', '2024-02-20', '/thumb2.jpg', '/pics/vid2/'),
                    ('vid3', 'Third Video', 'https://example.com/3', '2024-03-10', '/thumb3.jpg', '/pics/vid3/');
                 INSERT INTO actors (name) VALUES ('Actor A'), ('Actor B'), ('Actor C');
                 INSERT INTO tags (name) VALUES ('tag1'), ('tag2'), ('tag3');
                 INSERT INTO video_actors (video_id, actor_id) VALUES
                    ('vid1', 1), ('vid1', 2), ('vid2', 2), ('vid2', 3), ('vid3', 1);
                 INSERT INTO video_tags (video_id, tag_id) VALUES
                    ('vid1', 1), ('vid1', 2), ('vid2', 2), ('vid2', 3), ('vid3', 3);
                 INSERT INTO video_formats (video_id, name, file_path) VALUES
                    ('vid1', '720p', '/720p_1.mp4'), ('vid1', '1080p', '/1080p_1.mp4'),
                    ('vid2', '480p', '/480p_2.mp4');
                 INSERT INTO favorites (video_id) VALUES ('vid1');
                 INSERT INTO ratings (video_id, rating) VALUES ('vid1', 5), ('vid2', 3);
                 INSERT INTO search_index (video_id, title, actors, tags) VALUES
                    ('vid1', 'First Video', 'Actor A,Actor B', 'tag1,tag2'),
                    ('vid2', 'Second Video', 'Actor B,Actor C', 'tag2,tag3'),
                    ('vid3', 'Third Video', 'Actor A', 'tag3');",
            )
            .unwrap();
        store
    }

    fn ids(page: &VideoPage) -> Vec<&str> {
        page.data.iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn no_filters_lists_everything_newest_first() {
        let store = seeded();
        let page = list_videos(&store, &VideoFilter::default()).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.total_pages, 1);
        assert_eq!(ids(&page), ["vid3", "vid2", "vid1"]);
    }

    #[test]
    fn sort_keys() {
        let store = seeded();
        let mut filter = VideoFilter {
            sort: SortOrder::DateAsc,
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid1", "vid2", "vid3"]);
        filter.sort = SortOrder::TitleAsc;
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid1", "vid2", "vid3"]);
        filter.sort = SortOrder::TitleDesc;
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid3", "vid2", "vid1"]);
    }

    #[test]
    fn unknown_sort_key_falls_back() {
        assert_eq!(SortOrder::from("popularity"), SortOrder::DateDesc);
        assert_eq!(SortOrder::from("title_desc"), SortOrder::TitleDesc);
    }

    #[test]
    fn tags_combine_with_and() {
        let store = seeded();
        let by_tags = |tags: &[&str]| {
            let filter = VideoFilter {
                tags: tags.iter().map(|t| t.to_string()).collect(),
                sort: SortOrder::DateAsc,
                ..Default::default()
            };
            list_videos(&store, &filter).unwrap()
        };
        assert_eq!(ids(&by_tags(&["tag1", "tag2"])), ["vid1"]);
        assert_eq!(ids(&by_tags(&["tag2"])), ["vid1", "vid2"]);
        assert!(ids(&by_tags(&["tag1", "tag3"])).is_empty());
        assert_eq!(by_tags(&["tag1", "tag3"]).total_pages, 1);
    }

    #[test]
    fn actors_combine_with_and() {
        let store = seeded();
        let filter = VideoFilter {
            actors: vec!["Actor A".into(), "Actor B".into()],
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid1"]);
    }

    #[test]
    fn duplicate_tag_names_do_not_change_result() {
        let store = seeded();
        let filter = VideoFilter {
            tags: vec!["tag2".into(), "tag2".into()],
            ..Default::default()
        };
        assert_eq!(list_videos(&store, &filter).unwrap().total, 2);
    }

    #[test]
    fn text_query_is_literal_substring() {
        let store = seeded();
        let search = |q: &str| {
            let filter = VideoFilter {
                query: Some(q.to_string()),
                ..Default::default()
            };
            list_videos(&store, &filter).unwrap()
        };
        assert_eq!(ids(&search("Second")), ["vid2"]);
        assert_eq!(search("Actor A").total, 2);
        assert_eq!(search("tag3").total, 2);
        assert_eq!(search("%").total, 0);
        assert_eq!(search("_").total, 0);
        assert_eq!(search("nothing like this").total, 0);
    }

    #[test]
    fn videos_without_search_entry_never_match_text() {
        let store = seeded();
        store
            .conn()
            .execute(
                "INSERT INTO videos (id, title, date) VALUES ('raw', 'Second Video Raw', '2024-05-01')",
                [],
            )
            .unwrap();
        let filter = VideoFilter {
            query: Some("Second".into()),
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid2"]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let store = seeded();
        let filter = VideoFilter {
            date_from: Some("2024-02-20".into()),
            date_to: Some("2024-03-10".into()),
            sort: SortOrder::DateAsc,
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid2", "vid3"]);
    }

    #[test]
    fn favorite_rating_and_format_filters() {
        let store = seeded();
        let favorites = VideoFilter {
            favorite_only: true,
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &favorites).unwrap()), ["vid1"]);

        let rated = VideoFilter {
            min_rating: Some(4),
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &rated).unwrap()), ["vid1"]);

        let any_rating = VideoFilter {
            min_rating: Some(1),
            ..Default::default()
        };
        assert_eq!(list_videos(&store, &any_rating).unwrap().total, 2);

        let with_formats = VideoFilter {
            has_formats: true,
            sort: SortOrder::DateAsc,
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &with_formats).unwrap()), ["vid1", "vid2"]);
    }

    #[test]
    fn pagination_math() {
        let store = seeded();
        let mut filter = VideoFilter {
            per_page: 2,
            page: 2,
            ..Default::default()
        };
        let page = list_videos(&store, &filter).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);

        filter.page = 99;
        let page = list_videos(&store, &filter).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.page, 99);
    }

    #[test]
    fn bad_pagination_normalizes() {
        let store = seeded();
        let filter = VideoFilter {
            page: -3,
            per_page: 0,
            ..Default::default()
        };
        let page = list_videos(&store, &filter).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 20);
        assert_eq!(page.data.len(), 3);
    }

    #[test]
    fn total_pages_floor() {
        assert_eq!(total_pages(0, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(i64::MAX, i64::MAX), 1);
        assert_eq!(total_pages(3, i64::MAX), 1);
    }

    #[test]
    fn huge_page_size_returns_everything_on_one_page() {
        let store = seeded();
        let filter = VideoFilter {
            per_page: i64::MAX,
            ..Default::default()
        };
        let page = list_videos(&store, &filter).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.data.len(), 3);

        let beyond = VideoFilter {
            per_page: i64::MAX,
            page: 3,
            ..Default::default()
        };
        let page = list_videos(&store, &beyond).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn text_query_ignores_ascii_case() {
        let store = seeded();
        let filter = VideoFilter {
            query: Some("second".into()),
            ..Default::default()
        };
        assert_eq!(ids(&list_videos(&store, &filter).unwrap()), ["vid2"]);
    }

    #[test]
    fn builder_numbers_placeholders_in_bind_order() {
        let filter = VideoFilter {
            query: Some("x".into()),
            tags: vec!["a".into(), "b".into()],
            date_to: Some("2024-12-31".into()),
            ..Default::default()
        };
        let qb = QueryBuilder::from_filter(&filter);
        assert_eq!(qb.params().len(), 4);
        let sql = qb.where_sql();
        for n in 1..=4 {
            assert!(sql.contains(&format!("?{n}")), "missing ?{n} in {sql}");
        }
        assert!(!sql.contains("?5"));
        assert!(!sql.contains("2024-12-31"));
    }

    #[test]
    fn detail_lookup() {
        let store = seeded();
        let video = get_video(&store, "vid1").unwrap();
        assert_eq!(video.title, "First Video");
        assert_eq!(video.actors.len(), 2);
        assert_eq!(video.formats.len(), 2);
        assert!(video.is_favorite);
        assert_eq!(video.rating, Some(5));

        let err = get_video(&store, "missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn facet_listings_sorted() {
        let store = seeded();
        let tags: Vec<_> = list_tags(&store).unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(tags, ["tag1", "tag2", "tag3"]);
        let actors = list_actors(&store).unwrap();
        assert_eq!(actors[0].name, "Actor A");
        assert_eq!(actors.len(), 3);
    }
}
