pub mod models;
pub mod store;

pub use models::{
    Company, CompanyStatus, EnrichmentFields, ItemOutcome, NewCompany, PageType, PolicyPage,
    ProcessingLogEntry, ScopeFlags,
};
pub use store::{CompanyStore, InsertError, PgCompanyStore};
