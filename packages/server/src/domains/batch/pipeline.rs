//! The batch pipeline: lease pending work, run each item through
//! discovery -> fetch/index -> scope extraction -> enrichment, and commit
//! one terminal outcome per item.
//!
//! Failure isolation is per item: a collaborator blowing up on one company
//! records that company as failed and the batch moves on. The only fatal
//! condition for a batch call is the record store itself (leasing or the
//! failure writes' own infrastructure being unreachable).

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::summary::{BatchSummary, ItemResult};
use crate::domains::companies::{Company, CompanyStatus, ItemOutcome, PolicyPage};
use crate::kernel::scraper::DEFAULT_CHUNK_SIZE;
use crate::kernel::traits::ChunkMetadata;
use crate::kernel::ServerDeps;

/// Upper bound on chunks handed to the fact extractor per item. Truncation,
/// not summarization; see the extractor for the matching bound.
const MAX_EXTRACTION_CHUNKS: usize = 5;

/// Attempts for recording an item failure before giving up on the write.
const FAILURE_WRITE_ATTEMPTS: u32 = 3;

pub struct BatchProcessor {
    deps: ServerDeps,
}

impl BatchProcessor {
    pub fn new(deps: ServerDeps) -> Self {
        Self { deps }
    }

    /// Lease up to `limit` pending companies and process them sequentially.
    ///
    /// Always returns a summary on success; individual item failures are
    /// data in the summary, not errors. Only store unavailability during
    /// leasing aborts the call.
    pub async fn process_pending(&self, limit: i64) -> Result<BatchSummary> {
        let started = Instant::now();

        let leased = self
            .deps
            .store
            .lease_pending(limit)
            .await
            .context("failed to lease pending companies")?;

        if leased.is_empty() {
            return Ok(BatchSummary::empty(elapsed_secs(started)));
        }

        info!(leased = leased.len(), "processing batch");

        let mut details = Vec::with_capacity(leased.len());
        let mut successful = 0usize;
        let mut failed = 0usize;

        for company in &leased {
            match self.process_item(company).await {
                Ok(()) => {
                    successful += 1;
                    details.push(ItemResult {
                        id: company.id.clone(),
                        domain: company.domain.clone(),
                        status: CompanyStatus::Completed,
                        error: None,
                    });
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    warn!(
                        company_id = %company.id,
                        domain = %company.domain,
                        error = %message,
                        "item failed, recording and continuing"
                    );
                    self.record_failure(&company.id, &message).await;
                    failed += 1;
                    details.push(ItemResult {
                        id: company.id.clone(),
                        domain: company.domain.clone(),
                        status: CompanyStatus::Failed,
                        error: Some(message),
                    });
                }
            }
        }

        info!(
            total = leased.len(),
            successful, failed, "batch finished"
        );

        Ok(BatchSummary {
            status: "completed".to_string(),
            message: format!("Processed {} companies", leased.len()),
            total_processed: leased.len(),
            successful,
            failed,
            processing_time_seconds: elapsed_secs(started),
            details,
        })
    }

    /// Run the per-item pipeline and commit its outcome in one transaction.
    ///
    /// All network calls happen before the commit, so no database
    /// transaction is ever held across a collaborator call.
    async fn process_item(&self, company: &Company) -> Result<()> {
        let links = self
            .deps
            .discoverer
            .find(&company.domain)
            .await
            .context("link discovery failed")?;

        let mut outcome = ItemOutcome::default();
        let mut all_chunks: Vec<String> = Vec::new();

        for (page_type, url) in &links {
            outcome.pages.push(PolicyPage {
                page_type: *page_type,
                url: url.clone(),
            });

            // One bad page never sinks the item: skip and keep whatever the
            // other pages yield.
            let html = match self.deps.fetcher.fetch(url).await {
                Ok(html) if !html.trim().is_empty() => html,
                Ok(_) => {
                    warn!(url = %url, "page had no content, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(url = %url, error = %format!("{:#}", e), "fetch failed, skipping page");
                    continue;
                }
            };

            let text = self.deps.fetcher.clean(&html);
            let chunks = self.deps.fetcher.chunk(&text, DEFAULT_CHUNK_SIZE);
            if chunks.is_empty() {
                continue;
            }

            let metadatas: Vec<ChunkMetadata> = chunks
                .iter()
                .map(|chunk| ChunkMetadata {
                    domain: company.domain.clone(),
                    page_type: *page_type,
                    url: url.clone(),
                    text: chunk.clone(),
                })
                .collect();

            self.deps
                .indexer
                .index(&chunks, &metadatas)
                .await
                .with_context(|| format!("failed to index chunks from {}", url))?;

            all_chunks.extend(chunks);
        }

        // No discoverable policy content is a valid terminal success:
        // extraction is skipped entirely and the item still completes.
        if !all_chunks.is_empty() {
            let prefix = &all_chunks[..all_chunks.len().min(MAX_EXTRACTION_CHUNKS)];

            let scopes = self
                .deps
                .extractor
                .classify_scopes(prefix)
                .await
                .context("scope classification failed")?;
            outcome.scopes = Some(scopes);

            let enrichment = self
                .deps
                .extractor
                .extract_fields(prefix)
                .await
                .context("field extraction failed")?;
            outcome.enrichment = Some(enrichment);
        }

        outcome.log_message = format!(
            "Finished pipeline: {} pages, {} chunks",
            outcome.pages.len(),
            all_chunks.len()
        );

        self.deps
            .store
            .complete_item(&company.id, &outcome)
            .await
            .context("failed to commit item outcome")?;

        Ok(())
    }

    /// Record an item failure in its own transaction, retrying briefly.
    ///
    /// If the store rejects even the failure write, the error is logged and
    /// swallowed so the rest of the batch still runs; the item keeps
    /// whatever status it last committed to.
    async fn record_failure(&self, company_id: &str, message: &str) {
        for attempt in 1..=FAILURE_WRITE_ATTEMPTS {
            match self.deps.store.fail_item(company_id, message).await {
                Ok(()) => return,
                Err(e) if attempt < FAILURE_WRITE_ATTEMPTS => {
                    warn!(
                        company_id = %company_id,
                        attempt,
                        error = %format!("{:#}", e),
                        "failure write rejected, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(e) => {
                    error!(
                        company_id = %company_id,
                        error = %format!("{:#}", e),
                        "could not record item failure, item may be stuck in processing"
                    );
                }
            }
        }
    }
}

fn elapsed_secs(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}
