use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.goodreads.com";

#[derive(Debug, Clone)]
pub struct HarvestPolicy {
    /// Highest page the site will render for a review listing (10).
    pub site_page_limit: u32,
    /// Wait after every navigation, page advance and recovery action (3 s).
    pub cooldown: Duration,
    pub probe_cooldown: Duration,
    pub scroll_settle: Duration,
    pub max_restarts: u32,
    /// Duplicate ids at or above which a finished harvest is discarded (30).
    pub duplicate_threshold: usize,
    /// Reruns allowed after a duplicate anomaly before giving up (3).
    pub max_duplicate_rescrapes: u32,
}

impl Default for HarvestPolicy {
    fn default() -> Self {
        Self {
            site_page_limit: 10,
            cooldown: Duration::from_secs(3),
            probe_cooldown: Duration::from_secs(2),
            scroll_settle: Duration::from_secs(2),
            max_restarts: 3,
            duplicate_threshold: 30,
            max_duplicate_rescrapes: 3,
        }
    }
}

impl HarvestPolicy {
    pub fn without_waits() -> Self {
        Self {
            cooldown: Duration::ZERO,
            probe_cooldown: Duration::ZERO,
            scroll_settle: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub window_size: (u32, u32),
    /// How long `find` keeps polling for a selector before reporting it missing.
    pub implicit_wait: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            remote_url: None,
            window_size: (1920, 1080),
            implicit_wait: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Site {
    base_url: String,
}

impl Site {
    pub fn parse(base_url: &str) -> anyhow::Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|err| anyhow::anyhow!("parse base url {base_url}: {err}"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("base url must be http/https: {parsed}");
        }
        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_owned(),
        })
    }

    pub fn book_url(&self, book_id: &str) -> String {
        format!("{}/book/show/{book_id}", self.base_url)
    }

    pub fn shelf_url(&self, shelf_id: &str) -> String {
        format!("{}/review/list/{shelf_id}", self.base_url)
    }

    pub fn review_url(&self, review_id: &str) -> String {
        format!("{}/review/show/{review_id}", self.base_url)
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}
