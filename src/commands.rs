use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::chrome::ChromeDriver;
use crate::cli::{BrowserArgs, CondenseArgs, RecommendArgs, ReviewsArgs, ShelfArgs};
use crate::config::{ChromeOptions, HarvestPolicy, Site};
use crate::extract::{DEFAULT_SORT_ORDER, ReviewExtractor, ShelfExtractor};
use crate::formats::Review;
use crate::harvest::PaginationController;
use crate::navigator::{NextLinkNavigator, ScrollNavigator};
use crate::recommend::{Recommender, favorite_shelves_path};

pub async fn reviews(args: ReviewsArgs) -> anyhow::Result<()> {
    let site = Site::parse(&args.browser.base_url)?;
    let out = args.out.as_deref().map(PathBuf::from);
    ensure_output_does_not_exist(out.as_deref())?;

    let source = ReviewExtractor::new(site, DEFAULT_SORT_ORDER).context("build review extractor")?;
    let navigator = NextLinkNavigator::reviews();

    let mut driver = start_driver(&args.browser).await?;
    let harvested = PaginationController::new(&mut driver, HarvestPolicy::default())
        .harvest(&source, &navigator, &args.book_id, args.pages)
        .await;
    stop_driver(driver).await;
    let reviews = harvested.context("harvest reviews")?;

    emit(&reviews, out.as_deref())
}

pub async fn shelf(args: ShelfArgs) -> anyhow::Result<()> {
    let site = Site::parse(&args.browser.base_url)?;
    let out = args.out.as_deref().map(PathBuf::from);
    ensure_output_does_not_exist(out.as_deref())?;

    let policy = HarvestPolicy::default();
    let source = ShelfExtractor::new(site).context("build shelf extractor")?;
    let navigator = ScrollNavigator::new(policy.scroll_settle);

    let mut driver = start_driver(&args.browser).await?;
    let harvested = PaginationController::new(&mut driver, policy)
        .harvest(&source, &navigator, &args.shelf_id, args.pages)
        .await;
    stop_driver(driver).await;
    let books = harvested.context("harvest shelf")?;

    let titles: Vec<String> = books.into_iter().map(|book| book.title).collect();
    emit(&titles, out.as_deref())
}

pub async fn recommend(args: RecommendArgs) -> anyhow::Result<()> {
    let site = Site::parse(&args.browser.base_url)?;
    let artifacts = PathBuf::from(&args.artifacts);
    ensure_output_does_not_exist(Some(&favorite_shelves_path(&artifacts, &args.book_id)))?;
    let recommender =
        Recommender::new(site, HarvestPolicy::default()).with_artifacts_dir(artifacts);

    let mut driver = start_driver(&args.browser).await?;
    let recommended = recommender
        .recommend(&mut driver, &args.book_id, args.pages)
        .await;
    stop_driver(driver).await;
    let recommendations = recommended.context("recommend")?;

    emit(&recommendations, None)
}

pub fn condense(args: CondenseArgs) -> anyhow::Result<()> {
    let dir = PathBuf::from(&args.dir);
    let out = match args.out.as_deref() {
        Some(out) => PathBuf::from(out),
        None => dir.join(crate::store::ALL_REVIEWS_FILE),
    };
    ensure_output_does_not_exist(Some(&out))?;

    let reviews: Vec<Review> = crate::store::condense(&dir)?;
    crate::store::write_json(&out, &reviews).context("write condensed reviews")?;
    tracing::info!(reviews = reviews.len(), out = %out.display(), "condensed");
    Ok(())
}

/// Browser start-up failure is the one error that always aborts.
async fn start_driver(args: &BrowserArgs) -> anyhow::Result<ChromeDriver> {
    let options = ChromeOptions {
        headless: !args.headed,
        executable: args.chrome.as_deref().map(PathBuf::from),
        remote_url: args.remote_url.clone(),
        ..ChromeOptions::default()
    };
    ChromeDriver::start(&options)
        .await
        .context("start browser session")
}

async fn stop_driver(driver: ChromeDriver) {
    if let Err(err) = driver.quit().await {
        tracing::warn!(?err, "browser did not shut down cleanly");
    }
}

fn ensure_output_does_not_exist(out: Option<&Path>) -> anyhow::Result<()> {
    if let Some(out) = out {
        if out.exists() {
            anyhow::bail!("output already exists: {}", out.display());
        }
    }
    Ok(())
}

fn emit<T: Serialize + ?Sized>(value: &T, out: Option<&Path>) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("write json to stdout")?;
    stdout.write_all(b"\n").context("write stdout newline")?;
    stdout.flush().context("flush stdout")?;

    if let Some(out) = out {
        crate::store::write_json(out, value)?;
    }
    Ok(())
}
