// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The batch pipeline (domains/batch) drives these collaborators and owns
// every durable write; collaborators return data, never write it.
//
// Naming convention: Base* for trait names (e.g., BaseLinkDiscoverer)

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;

use crate::domains::companies::{EnrichmentFields, PageType, ScopeFlags};

/// Metadata attached to every indexed chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    pub domain: String,
    pub page_type: PageType,
    pub url: String,
    pub text: String,
}

// =============================================================================
// AI (Infrastructure - LLM completion)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Run a single completion: system preamble plus one user prompt.
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String>;
}

// =============================================================================
// Link Discoverer (Infrastructure - policy page discovery)
// =============================================================================

#[async_trait]
pub trait BaseLinkDiscoverer: Send + Sync {
    /// Discover categorized policy page URLs for a domain.
    ///
    /// Returns zero or more entries; an unreachable or link-less homepage is
    /// an empty map, not an error.
    async fn find(&self, domain: &str) -> Result<HashMap<PageType, String>>;
}

// =============================================================================
// Content Fetcher (Infrastructure - page text acquisition)
// =============================================================================

#[async_trait]
pub trait BaseContentFetcher: Send + Sync {
    /// Fetch the raw HTML for a URL. May return an empty string for a page
    /// with no body; transport and HTTP errors surface as `Err`.
    async fn fetch(&self, url: &str) -> Result<String>;

    /// Strip boilerplate markup and collapse the remaining text.
    fn clean(&self, html: &str) -> String;

    /// Split cleaned text into bounded-size contiguous chunks.
    fn chunk(&self, text: &str, size: usize) -> Vec<String>;
}

// =============================================================================
// Semantic Indexer (Infrastructure - vector persistence)
// =============================================================================

#[async_trait]
pub trait BaseSemanticIndexer: Send + Sync {
    /// Persist chunks with their metadata as retrievable vectors.
    /// Fire-and-forget from the pipeline's perspective; an error here is
    /// fatal for the item being processed.
    async fn index(&self, chunks: &[String], metadatas: &[ChunkMetadata]) -> Result<()>;
}

// =============================================================================
// Fact Extractor (Infrastructure - LLM-backed classification)
// =============================================================================

#[async_trait]
pub trait BaseFactExtractor: Send + Sync {
    /// Classify the five compliance scopes from policy text chunks.
    ///
    /// Implementations retry transient upstream failures internally and fall
    /// back to all-false rather than leaking warm-up errors to the caller.
    async fn classify_scopes(&self, chunks: &[String]) -> Result<ScopeFlags>;

    /// Extract contact/jurisdiction fields from policy text chunks.
    /// Missing fields are `None`; the all-null fallback mirrors
    /// `classify_scopes`.
    async fn extract_fields(&self, chunks: &[String]) -> Result<EnrichmentFields>;
}
