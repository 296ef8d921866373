use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::database::query::get_video;
use crate::database::store::Store;
use crate::error::Result;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Image files directly inside `pictures_dir` (resolved under `media_root`),
/// returned as `pictures_dir/<file>` and sorted by file name. A missing
/// directory yields an empty list.
pub fn list_pictures(media_root: &Path, pictures_dir: &str) -> Result<Vec<String>> {
    let dir = resolve(media_root, pictures_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let walker = WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter();

    let mut pictures = Vec::new();
    for entry in walker.filter_entry(|e| !is_hidden(e)) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_image(&entry) {
            let relative = Path::new(pictures_dir).join(entry.file_name());
            pictures.push(relative.to_string_lossy().into_owned());
        }
    }
    Ok(pictures)
}

pub fn pictures_for(store: &Store, media_root: &Path, video_id: &str) -> Result<Vec<String>> {
    let video = get_video(store, video_id)?;
    list_pictures(media_root, &video.pictures_dir)
}

fn resolve(media_root: &Path, pictures_dir: &str) -> PathBuf {
    media_root.join(pictures_dir.trim_start_matches('/'))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn is_image(entry: &DirEntry) -> bool {
    entry
        .path()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
