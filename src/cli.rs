use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_BASE_URL;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Log every page step (same as RUST_LOG=shelfscout=debug).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Harvest the reviews of one book.
    Reviews(ReviewsArgs),
    /// Harvest the titles on one user shelf.
    Shelf(ShelfArgs),
    /// Recommend books from the favorite shelves of a book's reviewers.
    Recommend(RecommendArgs),
    /// Merge every review document in a directory into `all_reviews.json`.
    Condense(CondenseArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BrowserArgs {
    /// Site root.
    #[arg(long, env = "SHELFSCOUT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Chrome/Chromium executable (default: searched in well-known paths and PATH).
    #[arg(long, env = "SHELFSCOUT_CHROME")]
    pub chrome: Option<String>,

    /// DevTools endpoint of a running browser, e.g. http://localhost:9222.
    #[arg(long, env = "SHELFSCOUT_REMOTE_URL")]
    pub remote_url: Option<String>,

    /// Show the browser window.
    #[arg(long)]
    pub headed: bool,
}

#[derive(Debug, Args)]
pub struct ReviewsArgs {
    /// Book id as it appears in the book URL (e.g. `2767052.The_Hunger_Games`).
    #[arg(long)]
    pub book_id: String,

    /// Number of review pages to read.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Also write the reviews to this JSON file (must not exist).
    #[arg(long)]
    pub out: Option<String>,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Debug, Args)]
pub struct ShelfArgs {
    /// Shelf id as it appears in the shelf URL (e.g. `12345-jane?shelf=favorites`).
    #[arg(long)]
    pub shelf_id: String,

    /// Number of scroll loads to read.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Also write the titles to this JSON file (must not exist).
    #[arg(long)]
    pub out: Option<String>,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Book id of a book you love.
    #[arg(long)]
    pub book_id: String,

    /// Page bound for the review harvest and for each shelf harvest.
    #[arg(long, default_value_t = 1)]
    pub pages: u32,

    /// Directory for the intermediate `favorite_shelves_<book-id>.json` (must not exist yet).
    #[arg(long, default_value = ".")]
    pub artifacts: String,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Debug, Args)]
pub struct CondenseArgs {
    /// Directory holding review JSON documents.
    #[arg(long)]
    pub dir: String,

    /// Output path (default: `<dir>/all_reviews.json`).
    #[arg(long)]
    pub out: Option<String>,
}
