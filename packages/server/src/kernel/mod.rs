pub mod ai;
pub mod deps;
pub mod discovery;
pub mod extractor;
pub mod scraper;
pub mod test_dependencies;
pub mod traits;
pub mod vector_store;

pub use deps::ServerDeps;
