use std::collections::HashMap;

use crate::config::HarvestPolicy;
use crate::driver::{BrowserDriver, DriverError};
use crate::extract::{ExtractError, HarvestSource};
use crate::formats::HarvestRecord;
use crate::navigator::{Advance, PageNavigator};

#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("harvest {target}: {source}")]
    Driver {
        target: String,
        #[source]
        source: DriverError,
    },
    #[error("harvest {target}: {source}")]
    Extract {
        target: String,
        #[source]
        source: ExtractError,
    },
    #[error(
        "harvest {target}: {duplicates} duplicated ids after {attempts} attempts; pages are not advancing"
    )]
    DuplicateAnomaly {
        target: String,
        duplicates: usize,
        attempts: u32,
    },
}

pub fn duplicate_count<R: HarvestRecord>(records: &[R]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.dedup_key()).or_default() += 1;
    }
    counts.values().filter(|&&count| count > 1).count()
}

#[derive(Debug)]
struct HarvestSession<R> {
    url: String,
    page_bound: u32,
    page: u32,
    records: Vec<R>,
}

impl<R> HarvestSession<R> {
    fn new(url: String, page_bound: u32) -> Self {
        Self {
            url,
            page_bound,
            page: 1,
            records: Vec::new(),
        }
    }

    fn has_more(&self) -> bool {
        self.page < self.page_bound
    }
}

enum SessionEnd<R> {
    Complete(Vec<R>),
    Restart { reason: DriverError, partial: Vec<R> },
}

enum PageFailure {
    Driver(DriverError),
    Extract(ExtractError),
}

impl From<DriverError> for PageFailure {
    fn from(err: DriverError) -> Self {
        Self::Driver(err)
    }
}

pub struct PaginationController<'d, D> {
    driver: &'d mut D,
    policy: HarvestPolicy,
}

impl<'d, D: BrowserDriver> PaginationController<'d, D> {
    pub fn new(driver: &'d mut D, policy: HarvestPolicy) -> Self {
        Self { driver, policy }
    }

    /// A short or empty result is not proof the target has little data: it is
    /// also what an exhausted restart budget returns.
    pub async fn harvest<S, N>(
        &mut self,
        source: &S,
        navigator: &N,
        target_id: &str,
        page_bound: u32,
    ) -> Result<Vec<S::Record>, HarvestError>
    where
        S: HarvestSource,
        N: PageNavigator<D>,
    {
        let page_bound = page_bound.max(1);
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let records = self
                .harvest_with_restarts(source, navigator, target_id, page_bound)
                .await?;

            let duplicates = duplicate_count(&records);
            if duplicates < self.policy.duplicate_threshold {
                tracing::info!(target_id, records = records.len(), attempts, "harvest complete");
                return Ok(records);
            }
            if attempts > self.policy.max_duplicate_rescrapes {
                return Err(HarvestError::DuplicateAnomaly {
                    target: target_id.to_owned(),
                    duplicates,
                    attempts,
                });
            }
            tracing::warn!(
                target_id,
                duplicates,
                attempts,
                "duplicate records found; re-scraping from scratch"
            );
        }
    }

    async fn harvest_with_restarts<S, N>(
        &mut self,
        source: &S,
        navigator: &N,
        target_id: &str,
        page_bound: u32,
    ) -> Result<Vec<S::Record>, HarvestError>
    where
        S: HarvestSource,
        N: PageNavigator<D>,
    {
        let mut restarts: u32 = 0;

        loop {
            match self
                .run_session(source, navigator, target_id, page_bound)
                .await?
            {
                SessionEnd::Complete(records) => return Ok(records),
                SessionEnd::Restart { reason, partial } => {
                    if restarts >= self.policy.max_restarts {
                        tracing::warn!(
                            target_id,
                            restarts,
                            records = partial.len(),
                            error = %reason,
                            "restart budget exhausted; keeping partial harvest"
                        );
                        return Ok(partial);
                    }
                    restarts += 1;
                    tracing::warn!(
                        target_id,
                        restarts,
                        kind = reason.kind(),
                        error = %reason,
                        "transient failure; restarting from page 1"
                    );
                    tokio::time::sleep(self.policy.cooldown).await;
                }
            }
        }
    }

    async fn run_session<S, N>(
        &mut self,
        source: &S,
        navigator: &N,
        target_id: &str,
        page_bound: u32,
    ) -> Result<SessionEnd<S::Record>, HarvestError>
    where
        S: HarvestSource,
        N: PageNavigator<D>,
    {
        let mut session = HarvestSession::new(source.target_url(target_id), page_bound);

        if let Err(failure) = self.open(&session.url).await {
            return abandon(failure.into(), session, target_id);
        }
        match self.read_page(source, target_id).await {
            Ok(page) => source.merge(&mut session.records, page),
            Err(failure) => return abandon(failure, session, target_id),
        }
        tracing::info!(target_id, page = 1, records = session.records.len(), "scraped page");

        while session.has_more() {
            let next = session.page + 1;
            let advanced = match navigator.advance(self.driver, next).await {
                Ok(advance) => advance,
                Err(DriverError::ElementNotFound { selector }) => {
                    if next != self.policy.site_page_limit {
                        tracing::info!(
                            target_id,
                            pages = session.page,
                            requested = page_bound,
                            %selector,
                            "fewer pages than requested"
                        );
                        return Ok(SessionEnd::Complete(session.records));
                    }
                    self.probe(navigator, target_id, next).await
                }
                Err(err @ (DriverError::ClickIntercepted(_) | DriverError::StaleReference(_))) => {
                    tracing::warn!(
                        target_id,
                        page = next,
                        kind = err.kind(),
                        error = %err,
                        "reloading and skipping page"
                    );
                    if let Err(failure) = self.open(&session.url).await {
                        return abandon(failure.into(), session, target_id);
                    }
                    session.page = next;
                    continue;
                }
                Err(err) => return abandon(PageFailure::Driver(err), session, target_id),
            };

            if advanced == Advance::Exhausted {
                tracing::info!(target_id, pages = session.page, "no more content");
                return Ok(SessionEnd::Complete(session.records));
            }

            tokio::time::sleep(self.policy.cooldown).await;
            match self.read_page(source, target_id).await {
                Ok(page) => source.merge(&mut session.records, page),
                Err(failure) => return abandon(failure, session, target_id),
            }
            session.page = next;
            tracing::info!(
                target_id,
                page = session.page,
                records = session.records.len(),
                "scraped page"
            );
        }

        Ok(SessionEnd::Complete(session.records))
    }

    /// One extra try at the site's last page, whose pager link sometimes
    /// fails to render. Any failure here ends pagination normally.
    async fn probe<N: PageNavigator<D>>(
        &mut self,
        navigator: &N,
        target_id: &str,
        page: u32,
    ) -> Advance {
        tracing::info!(
            target_id,
            page,
            "pager missing at site page limit; probing page link"
        );
        let outcome = navigator.probe(self.driver, page).await;
        tokio::time::sleep(self.policy.probe_cooldown).await;
        match outcome {
            Ok(advance) => advance,
            Err(err) => {
                tracing::info!(target_id, page, error = %err, "probe failed; ending pagination");
                Advance::Exhausted
            }
        }
    }

    async fn open(&mut self, url: &str) -> Result<(), DriverError> {
        self.driver.navigate(url).await?;
        tokio::time::sleep(self.policy.cooldown).await;
        Ok(())
    }

    async fn read_page<S: HarvestSource>(
        &mut self,
        source: &S,
        target_id: &str,
    ) -> Result<Vec<S::Record>, PageFailure> {
        let markup = self.driver.current_markup().await?;
        source
            .extract(&markup, target_id)
            .map_err(PageFailure::Extract)
    }
}

fn abandon<R>(
    failure: PageFailure,
    session: HarvestSession<R>,
    target_id: &str,
) -> Result<SessionEnd<R>, HarvestError> {
    match failure {
        PageFailure::Driver(err) if err.is_transient() => Ok(SessionEnd::Restart {
            reason: err,
            partial: session.records,
        }),
        PageFailure::Driver(err) => Err(HarvestError::Driver {
            target: target_id.to_owned(),
            source: err,
        }),
        PageFailure::Extract(err) => Err(HarvestError::Extract {
            target: target_id.to_owned(),
            source: err,
        }),
    }
}
