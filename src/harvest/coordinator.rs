//! Batch orchestration: routes tasks to the right extraction path and
//! guarantees one result per task.
//!
//! Document tasks fan out onto the runtime (the global rate limiter is the
//! only throttle); page tasks run one at a time through the injected
//! renderer. A task failing in any way, including a panicked worker, still
//! yields an inaccessible result rather than aborting the batch.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::browser::BrowserSession;
use super::document::DocumentFetcher;
use super::error::{HarvestFailure, HarvestRunError};
use super::fetcher::HttpFetcher;
use super::rate_limiter::RateLimiter;
use super::render::{PageRenderer, RenderExtractor};
use super::robots::RobotsPolicyCache;
use super::{ContentType, HarvestResult, HarvestTask};
use crate::config::HarvestConfig;

/// Orchestrates a batch of harvest tasks over shared run resources.
pub struct HarvestCoordinator {
    documents: DocumentFetcher,
    pages: RenderExtractor,
}

impl HarvestCoordinator {
    /// Builds the run's shared resources: one rate limiter, one HTTP
    /// client, one robots cache.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestRunError::HttpClient`] when the transport cannot
    /// be constructed.
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestRunError> {
        let rate_limiter = if config.rate_limit == 0 {
            Arc::new(RateLimiter::disabled())
        } else {
            Arc::new(RateLimiter::new(config.rate_limit, config.rate_window()))
        };
        let fetcher = Arc::new(HttpFetcher::new(&config, rate_limiter)?);
        let robots = Arc::new(RobotsPolicyCache::new(config.robots_cache_capacity));

        Ok(Self {
            documents: DocumentFetcher::new(
                Arc::clone(&fetcher),
                Arc::clone(&robots),
                config.clone(),
            ),
            pages: RenderExtractor::new(fetcher, robots, config),
        })
    }

    /// Harvests every task, returning results in submission order.
    ///
    /// The returned vector always has exactly `tasks.len()` entries.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub async fn run(
        &self,
        renderer: &mut dyn PageRenderer,
        tasks: &[HarvestTask],
    ) -> Vec<HarvestResult> {
        let mut slots: Vec<Option<HarvestResult>> = vec![None; tasks.len()];
        let mut document_jobs = Vec::new();
        let mut page_jobs = Vec::new();

        for (index, task) in tasks.iter().enumerate() {
            match ContentType::resolve(task) {
                ContentType::Unknown => {
                    // Rejected before any network traffic.
                    slots[index] = Some(HarvestResult::inaccessible(
                        &task.name,
                        ContentType::Unknown,
                        &HarvestFailure::UnsupportedType,
                    ));
                }
                ContentType::Pdf => {
                    let documents = self.documents.clone();
                    let url = task.url.clone();
                    let name = task.name.clone();
                    document_jobs.push((
                        index,
                        tokio::spawn(async move { documents.fetch(&url, &name).await }),
                    ));
                }
                ContentType::Html => page_jobs.push(index),
            }
        }

        // Page tasks share one renderer, so they run sequentially while the
        // spawned document tasks proceed in the background.
        for index in page_jobs {
            let task = &tasks[index];
            slots[index] = Some(self.pages.extract(renderer, &task.url, &task.name).await);
        }

        for (index, job) in document_jobs {
            slots[index] = Some(match job.await {
                Ok(result) => result,
                Err(join_error) => {
                    warn!(%join_error, "document task aborted");
                    HarvestResult::inaccessible(
                        &tasks[index].name,
                        ContentType::Pdf,
                        &HarvestFailure::fault(format!("harvest task aborted: {join_error}")),
                    )
                }
            });
        }

        let results: Vec<HarvestResult> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    // Unreachable by construction; still produce a row.
                    HarvestResult::inaccessible(
                        &tasks[index].name,
                        ContentType::resolve(&tasks[index]),
                        &HarvestFailure::fault("task produced no result"),
                    )
                })
            })
            .collect();

        let accessible = results.iter().filter(|r| r.accessible).count();
        info!(
            total = results.len(),
            accessible,
            inaccessible = results.len() - accessible,
            "harvest batch complete"
        );
        results
    }
}

/// Runs a full harvest: launches the browser, processes every task, and
/// shuts the browser down.
///
/// # Errors
///
/// Returns a [`HarvestRunError`] only for startup failures (HTTP client or
/// browser). Per-task failures are reported inside the results.
pub async fn run_harvest(
    tasks: &[HarvestTask],
    config: &HarvestConfig,
) -> Result<Vec<HarvestResult>, HarvestRunError> {
    let coordinator = HarvestCoordinator::new(config.clone())?;
    let mut session = BrowserSession::launch(config).await?;
    let results = coordinator.run(&mut session, tasks).await;
    session.close().await;
    Ok(results)
}
