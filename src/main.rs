use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use video_shelf::database::query::{self, SortOrder, VideoFilter};
use video_shelf::database::store::Store;
use video_shelf::database::user_state;
use video_shelf::ingest::{gallery, importer};
use video_shelf::utils::config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Overrides VIDEO_SHELF_DB_PATH
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Overrides VIDEO_SHELF_MEDIA_ROOT
    #[arg(long, global = true)]
    media_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON array of catalog records ("-" reads stdin)
    Import { input: PathBuf },
    /// List videos with filters
    List(ListArgs),
    /// Show one video
    Show { id: String },
    /// List gallery images for a video
    Pictures { id: String },
    Tags,
    Actors,
    /// Rate a video from 1 to 5
    Rate { id: String, rating: i64 },
    Unrate { id: String },
    Ratings,
    #[command(subcommand)]
    Favorite(FavoriteCommand),
    /// Row counts per table
    Stats,
    /// Verify the catalog store answers queries
    Check,
}

#[derive(Subcommand, Debug)]
enum FavoriteCommand {
    Add { id: String },
    Remove { id: String },
    List,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
    #[arg(short, long)]
    q: Option<String>,
    /// Repeatable; every tag must match
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Repeatable; every actor must match
    #[arg(long = "actor")]
    actors: Vec<String>,
    #[arg(long)]
    date_from: Option<String>,
    #[arg(long)]
    date_to: Option<String>,
    #[arg(long)]
    favorite: bool,
    #[arg(long)]
    min_rating: Option<i64>,
    #[arg(long)]
    has_formats: bool,
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    page: i64,
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    per_page: i64,
    /// date_desc, date_asc, title_asc or title_desc
    #[arg(long, default_value = "date_desc")]
    sort: String,
}

impl From<ListArgs> for VideoFilter {
    fn from(args: ListArgs) -> Self {
        VideoFilter {
            query: args.q,
            tags: args.tags,
            actors: args.actors,
            date_from: args.date_from,
            date_to: args.date_to,
            favorite_only: args.favorite,
            min_rating: args.min_rating,
            has_formats: args.has_formats,
            page: args.page,
            per_page: args.per_page,
            sort: SortOrder::from(args.sort.as_str()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = config::load()?;
    if let Some(db_path) = args.db_path {
        config.db_path = db_path;
    }
    if let Some(media_root) = args.media_root {
        config.media_root = media_root;
    }

    let mut store = Store::open(&config.db_path)
        .with_context(|| format!("Failed to open catalog at {:?}", config.db_path))?;

    match args.command {
        Command::Import { input } => {
            let data = read_input(&input)?;
            let records = importer::parse_batch(&data).context("Invalid import payload")?;

            let pb = ProgressBar::new(records.len() as u64);
            pb.set_style(ProgressStyle::with_template(
                "{spinner} [{bar:40}] {pos}/{len} {msg}",
            )?);
            let result = importer::import_batch_with(&mut store, &records, |record| {
                pb.set_message(record.id.clone());
                pb.inc(1);
            });
            pb.finish_and_clear();
            let count = result.context("Import failed")?;
            print_json(&json!({ "imported": count }))?;
        }
        Command::List(list) => {
            let filter = VideoFilter::from(list);
            print_json(&query::list_videos(&store, &filter)?)?;
        }
        Command::Show { id } => print_json(&query::get_video(&store, &id)?)?,
        Command::Pictures { id } => {
            let pictures = gallery::pictures_for(&store, &config.media_root, &id)?;
            print_json(&json!({ "pictures": pictures }))?;
        }
        Command::Tags => print_json(&json!({ "tags": query::list_tags(&store)? }))?,
        Command::Actors => print_json(&json!({ "actors": query::list_actors(&store)? }))?,
        Command::Rate { id, rating } => {
            user_state::set_rating(&store, &id, rating)?;
            info!("Rated {} as {}", id, rating);
        }
        Command::Unrate { id } => user_state::remove_rating(&store, &id)?,
        Command::Ratings => {
            print_json(&json!({ "ratings": user_state::list_ratings(&store)? }))?
        }
        Command::Favorite(FavoriteCommand::Add { id }) => user_state::add_favorite(&store, &id)?,
        Command::Favorite(FavoriteCommand::Remove { id }) => {
            user_state::remove_favorite(&store, &id)?
        }
        Command::Favorite(FavoriteCommand::List) => {
            print_json(&json!({ "favorites": user_state::list_favorites(&store)? }))?
        }
        Command::Stats => print_json(&query::catalog_stats(&store)?)?,
        Command::Check => {
            store.ping().context("Catalog store is not responding")?;
            print_json(&json!({ "status": "ok" }))?;
        }
    }

    store.close()?;
    Ok(())
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    if input.as_os_str() == "-" {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("Failed to read stdin")?;
        Ok(data)
    } else {
        std::fs::read(input).with_context(|| format!("Failed to read {:?}", input))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
