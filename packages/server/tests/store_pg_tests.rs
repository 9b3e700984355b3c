//! Postgres store tests. These need a real database with the pgvector
//! extension, so they are ignored by default:
//!
//!     DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use server_core::domains::companies::{
    CompanyStatus, CompanyStore, EnrichmentFields, ItemOutcome, NewCompany, PageType, PgCompanyStore,
    PolicyPage, ScopeFlags,
};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrate");
    pool
}

fn unique_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore = "requires a Postgres database with pgvector"]
async fn insert_lease_complete_roundtrip() {
    let store = PgCompanyStore::new(pool().await);
    let id = unique_id("rt");

    store
        .insert_pending(&[NewCompany {
            id: id.clone(),
            name: "Acme".to_string(),
            domain: format!("{}.example", id),
        }])
        .await
        .unwrap();

    let leased = store.lease_pending(1000).await.unwrap();
    let claimed = leased.iter().find(|c| c.id == id).expect("row was leased");
    assert_eq!(claimed.status, CompanyStatus::Processing);

    let outcome = ItemOutcome {
        pages: vec![PolicyPage {
            page_type: PageType::Privacy,
            url: format!("https://{}.example/privacy", id),
        }],
        scopes: Some(ScopeFlags {
            scope_legal: true,
            ..Default::default()
        }),
        enrichment: Some(EnrichmentFields {
            country: Some("US".to_string()),
            ..Default::default()
        }),
        log_message: "roundtrip".to_string(),
    };
    store.complete_item(&id, &outcome).await.unwrap();

    let row: (String, Option<String>) = sqlx::query_as(
        "SELECT status::text, country FROM companies WHERE id = $1",
    )
    .bind(&id)
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(row.0, "completed");
    assert_eq!(row.1.as_deref(), Some("US"));
}

#[tokio::test]
#[ignore = "requires a Postgres database with pgvector"]
async fn conflicting_insert_is_a_no_op() {
    let store = PgCompanyStore::new(pool().await);
    let id = unique_id("dup");

    let row = NewCompany {
        id: id.clone(),
        name: "First".to_string(),
        domain: "first.example".to_string(),
    };
    store.insert_pending(std::slice::from_ref(&row)).await.unwrap();

    let changed = NewCompany {
        name: "Second".to_string(),
        ..row
    };
    store.insert_pending(&[changed]).await.unwrap();

    let name: (String,) = sqlx::query_as("SELECT name FROM companies WHERE id = $1")
        .bind(&id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(name.0, "First");
}

#[tokio::test]
#[ignore = "requires a Postgres database with pgvector"]
async fn failed_item_records_error_and_log() {
    let store = Arc::new(PgCompanyStore::new(pool().await));
    let id = unique_id("fail");

    store
        .insert_pending(&[NewCompany {
            id: id.clone(),
            name: "Broken".to_string(),
            domain: "broken.example".to_string(),
        }])
        .await
        .unwrap();
    store.lease_pending(1000).await.unwrap();

    store.fail_item(&id, "discovery refused").await.unwrap();

    let row: (String, Option<String>) = sqlx::query_as(
        "SELECT status::text, error_message FROM companies WHERE id = $1",
    )
    .bind(&id)
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(row.0, "failed");
    assert_eq!(row.1.as_deref(), Some("discovery refused"));

    let log_count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM processing_log WHERE company_id = $1 AND status = 'failed'",
    )
    .bind(&id)
    .fetch_one(store.pool())
    .await
    .unwrap();
    assert_eq!(log_count.0, 1);
}
