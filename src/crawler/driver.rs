//! Crawl driver - runs the worker pool over the request queue
//!
//! Each worker owns at most one browser at a time and launches a new one on
//! demand. A browser is retired (dropped) after a failed navigation or a
//! tainted page, so the next request goes through a fresh proxy session.
//! Failed requests are reclaimed, and tainted ones re-queued under a fresh key,
//! until their retry budget is spent; they are then recorded in the dataset as
//! failures.

use crate::browser::{
    find_working_browser, prepare_page, ActiveBrowser, BrowserLauncher, ProxySession,
    MAX_PROXY_ATTEMPTS, NAVIGATION_TIMEOUT,
};
use crate::crawler::classifier::{handle_page, CrawlContext, PageOutcome};
use crate::crawler::CrawlRequest;
use crate::state::{RequestState, PROGRESS_KEY};
use crate::storage::{Dataset, RequestQueue, SqliteStorage};
use crate::SweepError;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How long an idle worker waits before polling the queue again
pub const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Totals of a finished (or interrupted) crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub handled: u64,
    pub failed: u64,
    pub records: u64,
    pub cancelled: bool,
}

/// Runs the crawl over the queue held by a [`CrawlContext`]
pub struct CrawlDriver {
    ctx: CrawlContext,
    launcher: Arc<dyn BrowserLauncher>,
    shutdown: CancellationToken,
    idle_wait: Duration,
}

impl CrawlDriver {
    /// Creates a driver
    ///
    /// # Arguments
    ///
    /// * `ctx` - Input, storage and extractors shared by every worker
    /// * `launcher` - Creates browsers for new proxy sessions
    /// * `shutdown` - Cancelled when the process is asked to stop; the
    ///   driver then persists the crawl progress before returning
    pub fn new(
        ctx: CrawlContext,
        launcher: Arc<dyn BrowserLauncher>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            launcher,
            shutdown,
            idle_wait: IDLE_WAIT,
        }
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    /// Runs workers until the queue is finished or the shutdown token fires
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Totals read back from storage
    /// * `Err(SweepError)` - A worker hit a storage failure or could not find
    ///   a working proxy; the remaining workers are stopped
    pub async fn run(&self) -> Result<CrawlSummary, SweepError> {
        let recovered = self.ctx.storage()?.recover_interrupted()?;
        if recovered > 0 {
            tracing::info!("Recovered {} interrupted requests", recovered);
        }

        let workers = self.ctx.input.max_concurrency.max(1);
        tracing::info!("Starting crawl with {} workers", workers);
        let start_time = Instant::now();

        let stop = self.shutdown.child_token();
        let mut set = JoinSet::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                ctx: self.ctx.clone(),
                launcher: Arc::clone(&self.launcher),
                stop: stop.clone(),
                idle_wait: self.idle_wait,
            };
            set.spawn(worker.run());
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            let result = joined
                .map_err(|e| SweepError::Storage(format!("worker task failed: {}", e)))
                .and_then(|result| result);
            if let Err(e) = result {
                tracing::error!("Worker stopped: {}", e);
                stop.cancel();
                first_error.get_or_insert(e);
            }
        }

        let cancelled = self.shutdown.is_cancelled();
        if cancelled {
            self.persist_progress()?;
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let summary = self.summary(cancelled)?;
        tracing::info!(
            "Crawl finished in {:?}: {} handled, {} failed, {} records",
            start_time.elapsed(),
            summary.handled,
            summary.failed,
            summary.records
        );
        Ok(summary)
    }

    fn persist_progress(&self) -> Result<(), SweepError> {
        let (bytes, count) = {
            let progress = self.ctx.progress()?;
            (progress.to_json()?, progress.len())
        };
        self.ctx.set_value(PROGRESS_KEY, &bytes, "application/json")?;
        tracing::info!("Saved crawl progress ({} items)", count);
        Ok(())
    }

    fn summary(&self, cancelled: bool) -> Result<CrawlSummary, SweepError> {
        let storage = self.ctx.storage()?;
        Ok(CrawlSummary {
            handled: storage.count_by_state(RequestState::Handled)?,
            failed: storage.count_by_state(RequestState::Failed)?,
            records: storage.record_count()?,
            cancelled,
        })
    }
}

struct Worker {
    id: usize,
    ctx: CrawlContext,
    launcher: Arc<dyn BrowserLauncher>,
    stop: CancellationToken,
    idle_wait: Duration,
}

impl Worker {
    async fn run(self) -> Result<(), SweepError> {
        let mut browser: Option<ActiveBrowser> = None;

        loop {
            if self.stop.is_cancelled() {
                tracing::debug!("Worker {} stopping", self.id);
                break;
            }

            let next = self.ctx.storage()?.fetch_next()?;
            let Some(request) = next else {
                let finished = self.ctx.storage()?.is_finished()?;
                if finished {
                    break;
                }
                tokio::select! {
                    _ = self.stop.cancelled() => break,
                    _ = tokio::time::sleep(self.idle_wait) => {}
                }
                continue;
            };

            self.process(&mut browser, request).await?;
            tokio::task::yield_now().await;
        }

        Ok(())
    }

    /// Runs one request and settles it in the queue
    async fn process(
        &self,
        browser: &mut Option<ActiveBrowser>,
        mut request: CrawlRequest,
    ) -> Result<(), SweepError> {
        let max_retries = self.ctx.input.max_request_retries;

        match self.load_and_classify(browser, &request).await {
            Ok(PageOutcome::Done) => {
                self.ctx.storage()?.mark_handled(&request.unique_key)?;
            }
            Ok(PageOutcome::Retire { reason }) => {
                request.error_messages.push(reason);

                let mut storage = self.ctx.storage()?;
                if request.retry_count < max_retries {
                    let mut copy = request.with_random_key();
                    copy.retry_count += 1;
                    storage.add_request(&copy, false)?;
                    storage.mark_handled(&request.unique_key)?;
                } else {
                    give_up(&mut storage, &request)?;
                }
            }
            Err(e @ SweepError::NoWorkingProxy { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!("Request {} failed: {}", request.url, e);
                request.error_messages.push(e.to_string());

                let mut storage = self.ctx.storage()?;
                if request.retry_count < max_retries {
                    request.retry_count += 1;
                    storage.reclaim(&request)?;
                } else {
                    give_up(&mut storage, &request)?;
                }
            }
        }
        Ok(())
    }

    /// Loads `request` in the worker's browser and classifies the page
    ///
    /// The browser goes back into `slot` unless navigation failed or the page
    /// asked for it to be retired.
    async fn load_and_classify(
        &self,
        slot: &mut Option<ActiveBrowser>,
        request: &CrawlRequest,
    ) -> Result<PageOutcome, SweepError> {
        let mut active = match slot.take() {
            Some(active) => active,
            None => self.launch().await?,
        };

        prepare_page(active.page.as_mut(), &self.ctx.input, &active.session).await?;
        if let Err(e) = active.page.navigate(&request.url, NAVIGATION_TIMEOUT).await {
            tracing::info!("Retiring session {}: {}", active.session.id(), e);
            return Err(e.into());
        }

        let outcome = handle_page(&self.ctx, active.page.as_ref(), request).await;
        match outcome {
            Ok(PageOutcome::Retire { .. }) => {
                tracing::info!("Retiring session {}", active.session.id());
            }
            _ => *slot = Some(active),
        }
        outcome
    }

    async fn launch(&self) -> Result<ActiveBrowser, SweepError> {
        if self.ctx.input.test_proxy {
            return find_working_browser(self.launcher.as_ref(), &self.ctx.input, MAX_PROXY_ATTEMPTS)
                .await;
        }

        let session = ProxySession::random();
        tracing::debug!("Worker {} launching session {}", self.id, session.id());
        let page = self.launcher.launch(&session).await?;
        Ok(ActiveBrowser { page, session })
    }
}

/// Marks `request` failed and records it in the dataset
fn give_up(storage: &mut SqliteStorage, request: &CrawlRequest) -> Result<(), SweepError> {
    tracing::error!("Request {} failed too many times, giving up", request.url);
    storage.mark_failed(request)?;
    storage.push_records(&[json!({
        "url": request.url,
        "succeeded": false,
        "errors": request.error_messages,
    })])?;
    Ok(())
}
