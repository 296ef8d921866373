use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub const DB_PATH_KEY: &str = "VIDEO_SHELF_DB_PATH";
pub const MEDIA_ROOT_KEY: &str = "VIDEO_SHELF_MEDIA_ROOT";

const DEFAULT_DB_PATH: &str = "video-shelf.db";
const DEFAULT_MEDIA_ROOT: &str = "./media";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub media_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
        }
    }
}

/// Resolve configuration: process environment first, then `.env` in the
/// working directory, then defaults.
pub fn load() -> Result<Config> {
    let env_path = Path::new(".env");
    let file_vars = if env_path.exists() {
        let vars = load_env_file(env_path)?;
        info!("Loaded settings from .env");
        vars
    } else {
        HashMap::new()
    };
    Ok(resolve(|key| std::env::var(key).ok(), &file_vars))
}

fn resolve<F>(env: F, file_vars: &HashMap<String, String>) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| {
        env(key)
            .filter(|v| !v.is_empty())
            .or_else(|| file_vars.get(key).cloned())
    };
    let defaults = Config::default();
    Config {
        db_path: lookup(DB_PATH_KEY).map(PathBuf::from).unwrap_or(defaults.db_path),
        media_root: lookup(MEDIA_ROOT_KEY)
            .map(PathBuf::from)
            .unwrap_or(defaults.media_root),
    }
}

fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let reader = BufReader::new(file);

    let mut vars = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                k @ (DB_PATH_KEY | MEDIA_ROOT_KEY) => {
                    vars.insert(k.to_string(), value.trim().to_string());
                }
                _ => {}
            }
        }
    }
    Ok(vars)
}
