pub mod importer;
pub mod pipeline;
pub mod summary;

pub use importer::import_csv;
pub use pipeline::BatchProcessor;
pub use summary::{BatchSummary, ImportSummary, ItemResult};
