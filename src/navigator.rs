use std::time::Duration;

use async_trait::async_trait;

use crate::driver::{BrowserDriver, DriverError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved,
    /// The site has nothing more to show. Natural completion, not an error.
    Exhausted,
}

#[async_trait]
pub trait PageNavigator<D: BrowserDriver>: Send + Sync {
    async fn advance(&self, driver: &mut D, to_page: u32) -> Result<Advance, DriverError>;

    /// Second chance after `advance` could not find its control at the site's page
    /// limit. Navigators without an alternative route report exhaustion.
    async fn probe(&self, _driver: &mut D, _to_page: u32) -> Result<Advance, DriverError> {
        Ok(Advance::Exhausted)
    }
}

/// Review listings: scroll to the pager and click "next". The explicit
/// page-number link is the recovery route.
#[derive(Debug, Clone)]
pub struct NextLinkNavigator {
    next_selector: String,
    page_link_prefix: String,
}

impl NextLinkNavigator {
    pub fn new(next_selector: impl Into<String>, page_link_prefix: impl Into<String>) -> Self {
        Self {
            next_selector: next_selector.into(),
            page_link_prefix: page_link_prefix.into(),
        }
    }

    pub fn reviews() -> Self {
        Self::new("a.next_page", "div.uitext a")
    }

    pub fn page_link_selector(&self, page: u32) -> String {
        let prefix = &self.page_link_prefix;
        format!("{prefix}[href*=\"page={page}&\"], {prefix}[href$=\"page={page}\"]")
    }
}

#[async_trait]
impl<D: BrowserDriver> PageNavigator<D> for NextLinkNavigator {
    async fn advance(&self, driver: &mut D, to_page: u32) -> Result<Advance, DriverError> {
        tracing::debug!(to_page, selector = %self.next_selector, "click next");
        driver.scroll_to_bottom().await?;
        let next = driver.find(&self.next_selector).await?;
        driver.click(&next).await?;
        Ok(Advance::Moved)
    }

    async fn probe(&self, driver: &mut D, to_page: u32) -> Result<Advance, DriverError> {
        // Targets the page being advanced to (10 at the site limit), not the
        // page currently on screen.
        let selector = self.page_link_selector(to_page);
        tracing::debug!(to_page, %selector, "probe explicit page link");
        driver.scroll_to_bottom().await?;
        let link = match driver.find(&selector).await {
            Ok(link) => link,
            Err(DriverError::ElementNotFound { .. }) => return Ok(Advance::Exhausted),
            Err(err) => return Err(err),
        };
        driver.click(&link).await?;
        Ok(Advance::Moved)
    }
}

/// Infinite-scroll listings: a "page" is whatever one scroll to the bottom loads.
#[derive(Debug, Clone)]
pub struct ScrollNavigator {
    settle: Duration,
}

const SCROLL_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight";

impl ScrollNavigator {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }

    async fn scroll_height<D: BrowserDriver>(driver: &mut D) -> Result<i64, DriverError> {
        let value = driver.execute_script(SCROLL_HEIGHT_SCRIPT).await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|height| height as i64))
            .ok_or_else(|| {
                DriverError::Unclassified(format!("scrollHeight is not a number: {value}"))
            })
    }
}

#[async_trait]
impl<D: BrowserDriver> PageNavigator<D> for ScrollNavigator {
    async fn advance(&self, driver: &mut D, to_page: u32) -> Result<Advance, DriverError> {
        let before = Self::scroll_height(driver).await?;
        driver.scroll_to_bottom().await?;
        tokio::time::sleep(self.settle).await;
        let after = Self::scroll_height(driver).await?;
        tracing::debug!(to_page, before, after, "scrolled");

        if after == before {
            Ok(Advance::Exhausted)
        } else {
            Ok(Advance::Moved)
        }
    }
}
