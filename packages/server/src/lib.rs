// Policy Scanner - Batch Core
//
// Backend library for bulk-importing organization domains, leasing pending
// work, and running the per-company policy pipeline: discover privacy/terms
// pages, index their text for semantic search, and extract structured
// compliance facts.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
