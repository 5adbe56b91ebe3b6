use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::{HarvestPolicy, Site};
use crate::driver::BrowserDriver;
use crate::extract::{DEFAULT_SORT_ORDER, ReviewExtractor, ShelfExtractor};
use crate::formats::{FavoriteShelves, Recommendation, Review};
use crate::harvest::PaginationController;
use crate::navigator::{NextLinkNavigator, ScrollNavigator};

pub const MAX_RECOMMENDATIONS: usize = 25;

/// Matches the site's own spellings, as rendered (case-sensitive).
pub fn is_favorite_shelf(name: &str) -> bool {
    name.contains("favorite") || name.contains("favourite")
}

pub fn favorite_shelf_ids(reviews: &[Review]) -> Vec<String> {
    let mut seen = HashSet::new();
    reviews
        .iter()
        .flat_map(|review| review.shelves.iter())
        .filter(|shelf| is_favorite_shelf(&shelf.name))
        .filter(|shelf| seen.insert(shelf.shelf_id.as_str()))
        .map(|shelf| shelf.shelf_id.clone())
        .collect()
}

/// Counts titles and keeps the `limit` most frequent. Ties keep first-seen order.
pub fn rank_titles<I>(titles: I, limit: usize) -> Vec<Recommendation>
where
    I: IntoIterator<Item = String>,
{
    let mut ranked: Vec<Recommendation> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for title in titles {
        match position.get(&title) {
            Some(&index) => ranked[index].count += 1,
            None => {
                position.insert(title.clone(), ranked.len());
                ranked.push(Recommendation { title, count: 1 });
            }
        }
    }

    // stable: equal counts stay in first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

pub fn favorite_shelves_path(dir: &Path, book_id: &str) -> PathBuf {
    dir.join(format!("favorite_shelves_{}.json", book_id.replace('/', "_")))
}

pub struct Recommender {
    site: Site,
    policy: HarvestPolicy,
    artifacts_dir: Option<PathBuf>,
}

impl Recommender {
    pub fn new(site: Site, policy: HarvestPolicy) -> Self {
        Self {
            site,
            policy,
            artifacts_dir: None,
        }
    }

    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub async fn recommend<D: BrowserDriver>(
        &self,
        driver: &mut D,
        book_id: &str,
        page_bound: u32,
    ) -> anyhow::Result<Vec<Recommendation>> {
        let shelves_artifact = self
            .artifacts_dir
            .as_deref()
            .map(|dir| favorite_shelves_path(dir, book_id));
        if let Some(path) = shelves_artifact.as_deref() {
            if path.exists() {
                anyhow::bail!("favorite shelves artifact already exists: {}", path.display());
            }
        }

        let reviews_source = ReviewExtractor::new(self.site.clone(), DEFAULT_SORT_ORDER)
            .context("build review extractor")?;
        let shelf_source =
            ShelfExtractor::new(self.site.clone()).context("build shelf extractor")?;
        let review_pager = NextLinkNavigator::reviews();
        let shelf_scroller = ScrollNavigator::new(self.policy.scroll_settle);

        let mut controller = PaginationController::new(driver, self.policy.clone());
        let reviews = controller
            .harvest(&reviews_source, &review_pager, book_id, page_bound)
            .await
            .context("harvest reviews")?;

        let shelf_ids = favorite_shelf_ids(&reviews);
        tracing::info!(
            book_id,
            reviews = reviews.len(),
            shelves = shelf_ids.len(),
            ?shelf_ids,
            "favorite shelves collected"
        );

        if let Some(path) = shelves_artifact.as_deref() {
            let artifact = FavoriteShelves {
                book_id: book_id.to_owned(),
                shelf_ids: shelf_ids.clone(),
            };
            crate::store::write_json(path, &artifact).context("write favorite shelves")?;
        }

        let mut titles = Vec::new();
        for shelf_id in &shelf_ids {
            tracing::info!(shelf_id = %shelf_id, "harvesting shelf");
            match controller
                .harvest(&shelf_source, &shelf_scroller, shelf_id, page_bound)
                .await
            {
                Ok(books) => titles.extend(books.into_iter().map(|book| book.title)),
                Err(err) => {
                    tracing::warn!(shelf_id = %shelf_id, error = %err, "skipping shelf");
                }
            }
        }

        Ok(rank_titles(titles, MAX_RECOMMENDATIONS))
    }
}
