//! Record store for work items.
//!
//! The store is the only transactional boundary in the system: leasing is an
//! atomic non-blocking claim, and each item's outcome is committed (or rolled
//! back) as a unit. Collaborators never write here directly.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::models::{Company, ItemOutcome, NewCompany};

/// An aborted bulk insert. The transaction rolls back, so nothing is
/// committed; `attempted` reports how many rows had been written before
/// the failure.
#[derive(Debug, Error)]
#[error("bulk insert aborted after {attempted} rows: {source}")]
pub struct InsertError {
    pub attempted: u64,
    #[source]
    pub source: anyhow::Error,
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Insert rows as `pending` in a single all-or-nothing transaction.
    ///
    /// Conflicting ids are left untouched so a re-import never resets the
    /// status of an item that already ran. Returns the number of rows
    /// attempted (conflicts included); an error reports the rows attempted
    /// before the failure.
    async fn insert_pending(&self, rows: &[NewCompany]) -> Result<u64, InsertError>;

    /// Atomically claim up to `limit` pending items for processing.
    ///
    /// Two concurrent callers always receive disjoint sets, and a contending
    /// caller skips rows another has claimed instead of waiting on them.
    /// Claimed items move to `processing` as part of the same atomic step.
    async fn lease_pending(&self, limit: i64) -> Result<Vec<Company>>;

    /// Commit one item's successful attempt in a single transaction:
    /// discovered pages (insert-if-absent), scope flags (five-flag upsert),
    /// enrichment (coalesce update), an audit log entry, and the transition
    /// to `completed` with `processed_at` stamped.
    async fn complete_item(&self, id: &str, outcome: &ItemOutcome) -> Result<()>;

    /// Record a failed attempt in a fresh transaction: `failed` status plus
    /// the error message, and an audit log entry.
    async fn fail_item(&self, id: &str, error: &str) -> Result<()>;
}

/// PostgreSQL-backed store.
pub struct PgCompanyStore {
    pool: PgPool,
}

impl PgCompanyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CompanyStore for PgCompanyStore {
    async fn insert_pending(&self, rows: &[NewCompany]) -> Result<u64, InsertError> {
        let mut tx = self.pool.begin().await.map_err(|e| InsertError {
            attempted: 0,
            source: anyhow::Error::new(e).context("failed to begin import transaction"),
        })?;

        let mut attempted = 0u64;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO companies (id, name, domain, status)
                VALUES ($1, $2, $3, 'pending')
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&row.id)
            .bind(&row.name)
            .bind(&row.domain)
            .execute(&mut *tx)
            .await
            .map_err(|e| InsertError {
                attempted,
                source: anyhow::Error::new(e)
                    .context(format!("failed to insert company {}", row.id)),
            })?;
            attempted += 1;
        }

        tx.commit().await.map_err(|e| InsertError {
            attempted,
            source: anyhow::Error::new(e).context("failed to commit import transaction"),
        })?;
        Ok(attempted)
    }

    async fn lease_pending(&self, limit: i64) -> Result<Vec<Company>> {
        // SKIP LOCKED keeps contending workers from queuing behind each
        // other's claims; the UPDATE makes the claim itself the atomic step.
        let companies = sqlx::query_as::<_, Company>(
            r#"
            WITH leased AS (
                SELECT id
                FROM companies
                WHERE status = 'pending'
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE companies
            SET status = 'processing'
            WHERE id IN (SELECT id FROM leased)
            RETURNING id, name, domain, status, generic_email, contact_email,
                      privacy_email, delete_link, country, error_message,
                      processed_at, created_at
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to lease pending companies")?;

        Ok(companies)
    }

    async fn complete_item(&self, id: &str, outcome: &ItemOutcome) -> Result<()> {
        let mut tx = self.pool.begin().await.context("failed to begin item transaction")?;

        for page in &outcome.pages {
            sqlx::query(
                r#"
                INSERT INTO policy_pages (company_id, page_type, url)
                VALUES ($1, $2, $3)
                ON CONFLICT (company_id, page_type) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(page.page_type.as_str())
            .bind(&page.url)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(scopes) = &outcome.scopes {
            sqlx::query(
                r#"
                INSERT INTO policy_scopes (
                    company_id, scope_registration, scope_legal,
                    scope_customization, scope_marketing, scope_security
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (company_id) DO UPDATE SET
                    scope_registration = EXCLUDED.scope_registration,
                    scope_legal = EXCLUDED.scope_legal,
                    scope_customization = EXCLUDED.scope_customization,
                    scope_marketing = EXCLUDED.scope_marketing,
                    scope_security = EXCLUDED.scope_security,
                    updated_at = NOW()
                "#,
            )
            .bind(id)
            .bind(scopes.scope_registration)
            .bind(scopes.scope_legal)
            .bind(scopes.scope_customization)
            .bind(scopes.scope_marketing)
            .bind(scopes.scope_security)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(enrichment) = &outcome.enrichment {
            sqlx::query(
                r#"
                UPDATE companies SET
                    generic_email = COALESCE($1, generic_email),
                    contact_email = COALESCE($2, contact_email),
                    privacy_email = COALESCE($3, privacy_email),
                    delete_link = COALESCE($4, delete_link),
                    country = COALESCE($5, country)
                WHERE id = $6
                "#,
            )
            .bind(&enrichment.generic_email)
            .bind(&enrichment.contact_email)
            .bind(&enrichment.privacy_email)
            .bind(&enrichment.delete_link)
            .bind(&enrichment.country)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO processing_log (company_id, step, status, message)
            VALUES ($1, 'batch_complete', 'completed', $2)
            "#,
        )
        .bind(id)
        .bind(&outcome.log_message)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE companies
            SET status = 'completed', error_message = NULL, processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .with_context(|| format!("failed to commit outcome for company {}", id))?;
        Ok(())
    }

    async fn fail_item(&self, id: &str, error: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.context("failed to begin failure transaction")?;

        sqlx::query(
            r#"
            UPDATE companies
            SET status = 'failed', error_message = $1
            WHERE id = $2
            "#,
        )
        .bind(error)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO processing_log (company_id, step, status, message)
            VALUES ($1, 'batch_complete', 'failed', $2)
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .with_context(|| format!("failed to record failure for company {}", id))?;
        Ok(())
    }
}
