//! Bulk importer integration tests against the in-memory store.

use std::sync::Arc;

use server_core::domains::batch::import_csv;
use server_core::domains::companies::{Company, CompanyStatus, CompanyStore};
use server_core::kernel::test_dependencies::InMemoryCompanyStore;

#[tokio::test]
async fn imports_rows_and_skips_blank_domains() {
    let store = InMemoryCompanyStore::new();
    let csv = "\
id,name,domain
c1,Acme,acme.example
c2,NoDomain,
c3,Beta,beta.example
";

    let summary = import_csv(csv.as_bytes(), &store).await;

    assert_eq!(summary.status, "completed");
    assert_eq!(summary.imported_count, 2);
    assert_eq!(summary.skipped_count, 1);

    let acme = store.company("c1").unwrap();
    assert_eq!(acme.status, CompanyStatus::Pending);
    assert_eq!(acme.name, "Acme");
    assert_eq!(acme.domain, "acme.example");
    assert!(store.company("c2").is_none());
}

#[tokio::test]
async fn missing_id_column_gets_synthetic_ids() {
    let store = Arc::new(InMemoryCompanyStore::new());
    let csv = "\
name,domain
Acme,acme.example
Beta,beta.example
";

    let summary = import_csv(csv.as_bytes(), store.as_ref()).await;

    assert_eq!(summary.imported_count, 2);
    let leased = store.lease_pending(10).await.unwrap();
    assert_eq!(leased.len(), 2);
    for company in &leased {
        assert!(
            company.id.starts_with("auto_"),
            "expected synthetic id, got {}",
            company.id
        );
    }
}

#[tokio::test]
async fn blank_cell_in_present_id_column_is_kept_as_is() {
    let store = Arc::new(InMemoryCompanyStore::new());
    let csv = "\
id,name,domain
,Acme,acme.example
";

    let summary = import_csv(csv.as_bytes(), store.as_ref()).await;

    assert_eq!(summary.imported_count, 1);
    // The id column exists, so no synthetic id is generated even for a
    // blank cell.
    let company = store.company("").unwrap();
    assert_eq!(company.domain, "acme.example");
}

#[tokio::test]
async fn reimport_never_resets_a_processed_item() {
    let mut done = Company::pending("c1", "Acme", "acme.example");
    done.status = CompanyStatus::Completed;
    done.country = Some("US".to_string());
    let store = InMemoryCompanyStore::new().with_company(done);

    let csv = "\
id,name,domain
c1,Acme,acme.example
";
    let summary = import_csv(csv.as_bytes(), &store).await;

    assert_eq!(summary.status, "completed");
    let company = store.company("c1").unwrap();
    assert_eq!(company.status, CompanyStatus::Completed);
    assert_eq!(company.country.as_deref(), Some("US"));
}

#[tokio::test]
async fn malformed_row_aborts_the_import() {
    let store = InMemoryCompanyStore::new();
    // Second record has an extra field, which the reader rejects.
    let csv = "\
id,name,domain
c1,Acme,acme.example
c2,Bad,broken.example,surprise
";

    let summary = import_csv(csv.as_bytes(), &store).await;

    assert_eq!(summary.status, "failed");
    assert_eq!(summary.imported_count, 1);
}

#[tokio::test]
async fn store_error_reports_rows_written_before_the_failure() {
    // The insert dies on the third row (index 2).
    let store = InMemoryCompanyStore::new().with_failing_insert_at(2);
    let csv = "\
id,name,domain
c1,Acme,acme.example
c2,Beta,beta.example
c3,Gamma,gamma.example
";

    let summary = import_csv(csv.as_bytes(), &store).await;

    assert_eq!(summary.status, "failed");
    assert_eq!(summary.imported_count, 2);
    assert_eq!(summary.skipped_count, 0);
    // The transaction rolled back: nothing is visible, not even the rows
    // counted in the summary.
    assert!(store.company("c1").is_none());
    assert!(store.company("c2").is_none());
}

#[tokio::test]
async fn headers_are_matched_after_trimming() {
    let store = InMemoryCompanyStore::new();
    let csv = "\
id , name , domain
c1,Acme,acme.example
";

    let summary = import_csv(csv.as_bytes(), &store).await;

    assert_eq!(summary.imported_count, 1);
    assert!(store.company("c1").is_some());
}
