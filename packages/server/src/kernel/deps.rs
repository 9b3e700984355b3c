//! Dependency container for the batch pipeline (traits for testability)
//!
//! Collaborator handles are built once at startup and shared; the pipeline
//! receives this container explicitly rather than reaching for singletons,
//! so tests can substitute any collaborator.

use std::sync::Arc;

use super::traits::{
    BaseContentFetcher, BaseFactExtractor, BaseLinkDiscoverer, BaseSemanticIndexer,
};
use crate::domains::companies::CompanyStore;

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn CompanyStore>,
    pub discoverer: Arc<dyn BaseLinkDiscoverer>,
    pub fetcher: Arc<dyn BaseContentFetcher>,
    pub indexer: Arc<dyn BaseSemanticIndexer>,
    pub extractor: Arc<dyn BaseFactExtractor>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn CompanyStore>,
        discoverer: Arc<dyn BaseLinkDiscoverer>,
        fetcher: Arc<dyn BaseContentFetcher>,
        indexer: Arc<dyn BaseSemanticIndexer>,
        extractor: Arc<dyn BaseFactExtractor>,
    ) -> Self {
        Self {
            store,
            discoverer,
            fetcher,
            indexer,
            extractor,
        }
    }
}
