//! Test doubles for the collaborator traits and the record store.
//!
//! Hand-written mocks with canned responses, used by the integration tests
//! to drive the batch pipeline without a database or any network access.
//! `InMemoryCompanyStore` honors the same contract as the Postgres store:
//! leasing is an atomic disjoint claim, a completed item's writes land as a
//! unit, and failure recording is its own step.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::scraper::chunk_text;
use super::traits::{
    BaseAI, BaseContentFetcher, BaseFactExtractor, BaseLinkDiscoverer, BaseSemanticIndexer,
    ChunkMetadata,
};
use crate::domains::companies::{
    Company, CompanyStatus, CompanyStore, EnrichmentFields, InsertError, ItemOutcome, NewCompany,
    PageType, PolicyPage, ProcessingLogEntry, ScopeFlags,
};

// =============================================================================
// In-memory record store
// =============================================================================

#[derive(Default)]
struct StoreState {
    order: Vec<String>,
    companies: HashMap<String, Company>,
    pages: HashMap<String, HashMap<PageType, String>>,
    scopes: HashMap<String, ScopeFlags>,
    log: Vec<ProcessingLogEntry>,
}

#[derive(Default)]
pub struct InMemoryCompanyStore {
    state: Mutex<StoreState>,
    fail_insert_at: Mutex<Option<usize>>,
    fail_completes: AtomicBool,
    fail_failure_writes: AtomicBool,
}

impl InMemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing company row.
    pub fn with_company(self, company: Company) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.order.push(company.id.clone());
            state.companies.insert(company.id.clone(), company);
        }
        self
    }

    /// Make `insert_pending` fail when it reaches the given row index,
    /// simulating a bulk insert that dies partway through its transaction.
    pub fn with_failing_insert_at(self, row_index: usize) -> Self {
        *self.fail_insert_at.lock().unwrap() = Some(row_index);
        self
    }

    /// Make `complete_item` fail, simulating a commit error.
    pub fn with_failing_completes(self) -> Self {
        self.fail_completes.store(true, Ordering::SeqCst);
        self
    }

    /// Make `fail_item` fail, simulating a dead record store during
    /// failure recording.
    pub fn with_failing_failure_writes(self) -> Self {
        self.fail_failure_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn company(&self, id: &str) -> Option<Company> {
        self.state.lock().unwrap().companies.get(id).cloned()
    }

    pub fn pages(&self, id: &str) -> Vec<PolicyPage> {
        let state = self.state.lock().unwrap();
        state
            .pages
            .get(id)
            .map(|pages| {
                pages
                    .iter()
                    .map(|(page_type, url)| PolicyPage {
                        page_type: *page_type,
                        url: url.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn scopes(&self, id: &str) -> Option<ScopeFlags> {
        self.state.lock().unwrap().scopes.get(id).copied()
    }

    pub fn log_entries(&self) -> Vec<ProcessingLogEntry> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count_with_status(&self, status: CompanyStatus) -> usize {
        self.state
            .lock()
            .unwrap()
            .companies
            .values()
            .filter(|c| c.status == status)
            .count()
    }
}

#[async_trait]
impl CompanyStore for InMemoryCompanyStore {
    async fn insert_pending(&self, rows: &[NewCompany]) -> Result<u64, InsertError> {
        let fail_at = *self.fail_insert_at.lock().unwrap();
        let mut state = self.state.lock().unwrap();

        // Stage first, apply after: an injected failure rolls the whole
        // insert back like the real transaction would.
        let mut staged: Vec<Company> = Vec::new();
        let mut attempted = 0u64;
        for row in rows {
            if fail_at == Some(attempted as usize) {
                return Err(InsertError {
                    attempted,
                    source: anyhow!("simulated insert failure for {}", row.id),
                });
            }
            if !state.companies.contains_key(&row.id)
                && !staged.iter().any(|c| c.id == row.id)
            {
                staged.push(Company::pending(&row.id, &row.name, &row.domain));
            }
            attempted += 1;
        }

        for company in staged {
            state.order.push(company.id.clone());
            state.companies.insert(company.id.clone(), company);
        }
        Ok(attempted)
    }

    async fn lease_pending(&self, limit: i64) -> Result<Vec<Company>> {
        // Claim under one lock acquisition: the in-memory equivalent of the
        // atomic SKIP LOCKED + UPDATE claim.
        let mut state = self.state.lock().unwrap();
        let candidates: Vec<String> = state
            .order
            .iter()
            .filter(|id| {
                state
                    .companies
                    .get(*id)
                    .map(|c| c.status == CompanyStatus::Pending)
                    .unwrap_or(false)
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect();

        let mut leased = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(company) = state.companies.get_mut(&id) {
                company.status = CompanyStatus::Processing;
                leased.push(company.clone());
            }
        }
        Ok(leased)
    }

    async fn complete_item(&self, id: &str, outcome: &ItemOutcome) -> Result<()> {
        if self.fail_completes.load(Ordering::SeqCst) {
            bail!("simulated commit failure for {}", id);
        }

        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        if !state.companies.contains_key(id) {
            bail!("unknown company {}", id);
        }

        let pages = state.pages.entry(id.to_string()).or_default();
        for page in &outcome.pages {
            // insert-if-absent: a later discovery never overwrites
            pages.entry(page.page_type).or_insert_with(|| page.url.clone());
        }

        if let Some(scopes) = outcome.scopes {
            state.scopes.insert(id.to_string(), scopes);
        }

        let company = state.companies.get_mut(id).expect("checked above");
        if let Some(enrichment) = &outcome.enrichment {
            coalesce(&mut company.generic_email, &enrichment.generic_email);
            coalesce(&mut company.contact_email, &enrichment.contact_email);
            coalesce(&mut company.privacy_email, &enrichment.privacy_email);
            coalesce(&mut company.delete_link, &enrichment.delete_link);
            coalesce(&mut company.country, &enrichment.country);
        }
        company.status = CompanyStatus::Completed;
        company.error_message = None;
        company.processed_at = Some(Utc::now());

        state.log.push(ProcessingLogEntry::new(
            id,
            "batch_complete",
            "completed",
            &outcome.log_message,
        ));
        Ok(())
    }

    async fn fail_item(&self, id: &str, error: &str) -> Result<()> {
        if self.fail_failure_writes.load(Ordering::SeqCst) {
            bail!("simulated failure-write error for {}", id);
        }

        let mut state = self.state.lock().unwrap();
        if let Some(company) = state.companies.get_mut(id) {
            company.status = CompanyStatus::Failed;
            company.error_message = Some(error.to_string());
        }
        state
            .log
            .push(ProcessingLogEntry::new(id, "batch_complete", "failed", error));
        Ok(())
    }
}

fn coalesce(existing: &mut Option<String>, new: &Option<String>) {
    if let Some(value) = new {
        *existing = Some(value.clone());
    }
}

// =============================================================================
// Collaborator mocks
// =============================================================================

enum MockReply {
    Reply(String),
    Error(String),
}

/// Scripted completion backend: each call consumes the next entry.
#[derive(Default)]
pub struct MockAI {
    script: Mutex<VecDeque<MockReply>>,
    calls: AtomicUsize,
}

impl MockAI {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockReply::Reply(reply.into()));
        self
    }

    pub fn then_error(self, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(MockReply::Error(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, _preamble: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(MockReply::Reply(reply)) => Ok(reply),
            Some(MockReply::Error(message)) => bail!("{}", message),
            None => bail!("no scripted reply left"),
        }
    }
}

#[derive(Default)]
pub struct MockLinkDiscoverer {
    links: HashMap<PageType, String>,
    fail_domains: HashSet<String>,
}

impl MockLinkDiscoverer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(mut self, page_type: PageType, url: impl Into<String>) -> Self {
        self.links.insert(page_type, url.into());
        self
    }

    pub fn failing_for(mut self, domain: impl Into<String>) -> Self {
        self.fail_domains.insert(domain.into());
        self
    }
}

#[async_trait]
impl BaseLinkDiscoverer for MockLinkDiscoverer {
    async fn find(&self, domain: &str) -> Result<HashMap<PageType, String>> {
        if self.fail_domains.contains(domain) {
            bail!("discovery refused for {}", domain);
        }
        Ok(self.links.clone())
    }
}

#[derive(Default)]
pub struct MockContentFetcher {
    pages: HashMap<String, String>,
    fail_urls: HashSet<String>,
}

impl MockContentFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn failing_for(mut self, url: impl Into<String>) -> Self {
        self.fail_urls.insert(url.into());
        self
    }
}

#[async_trait]
impl BaseContentFetcher for MockContentFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        if self.fail_urls.contains(url) {
            bail!("connection refused: {}", url);
        }
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }

    fn clean(&self, html: &str) -> String {
        html.trim().to_string()
    }

    fn chunk(&self, text: &str, size: usize) -> Vec<String> {
        chunk_text(text, size)
    }
}

#[derive(Default)]
pub struct MockSemanticIndexer {
    indexed: Mutex<Vec<ChunkMetadata>>,
    fail: AtomicBool,
}

impl MockSemanticIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn indexed(&self) -> Vec<ChunkMetadata> {
        self.indexed.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseSemanticIndexer for MockSemanticIndexer {
    async fn index(&self, _chunks: &[String], metadatas: &[ChunkMetadata]) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("vector index unavailable");
        }
        self.indexed.lock().unwrap().extend_from_slice(metadatas);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockFactExtractor {
    scopes: ScopeFlags,
    fields: EnrichmentFields,
    fail: AtomicBool,
    scope_chunk_counts: Mutex<Vec<usize>>,
}

impl MockFactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scopes(mut self, scopes: ScopeFlags) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_fields(mut self, fields: EnrichmentFields) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_failure(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    /// Chunk counts seen by `classify_scopes`, in call order.
    pub fn scope_chunk_counts(&self) -> Vec<usize> {
        self.scope_chunk_counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseFactExtractor for MockFactExtractor {
    async fn classify_scopes(&self, chunks: &[String]) -> Result<ScopeFlags> {
        self.scope_chunk_counts.lock().unwrap().push(chunks.len());
        if self.fail.load(Ordering::SeqCst) {
            bail!("model unavailable");
        }
        Ok(self.scopes)
    }

    async fn extract_fields(&self, _chunks: &[String]) -> Result<EnrichmentFields> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("model unavailable");
        }
        Ok(self.fields.clone())
    }
}
