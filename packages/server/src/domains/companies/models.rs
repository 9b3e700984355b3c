//! Work item model and the structured facts derived from policy text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle of a work item. Transitions within one processing attempt are
/// monotonic: pending -> processing -> {completed | failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "company_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompanyStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Pending => "pending",
            CompanyStatus::Processing => "processing",
            CompanyStatus::Completed => "completed",
            CompanyStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CompanyStatus::Completed | CompanyStatus::Failed)
    }
}

/// Category of a discovered policy page. At most one URL is retained per
/// (company, page type) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Privacy,
    Terms,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Privacy => "privacy",
            PageType::Terms => "terms",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Company (work item)
// ============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub status: CompanyStatus,
    pub generic_email: Option<String>,
    pub contact_email: Option<String>,
    pub privacy_email: Option<String>,
    pub delete_link: Option<String>,
    pub country: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// A fresh pending work item, as created by the bulk importer.
    pub fn pending(id: impl Into<String>, name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            domain: domain.into(),
            status: CompanyStatus::Pending,
            generic_email: None,
            contact_email: None,
            privacy_email: None,
            delete_link: None,
            country: None,
            error_message: None,
            processed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// Row shape accepted by the bulk importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCompany {
    pub id: String,
    pub name: String,
    pub domain: String,
}

// ============================================================================
// Derived facts
// ============================================================================

/// A categorized policy page URL discovered for a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyPage {
    pub page_type: PageType,
    pub url: String,
}

/// The five boolean compliance scopes inferred from policy text.
/// Upserted as a unit; a re-run replaces all five flags atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeFlags {
    pub scope_registration: bool,
    pub scope_legal: bool,
    pub scope_customization: bool,
    pub scope_marketing: bool,
    pub scope_security: bool,
}

/// Contact and jurisdiction fields extracted from policy text. `None` means
/// "not found" and never clobbers an existing value (coalesce update).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentFields {
    pub generic_email: Option<String>,
    pub contact_email: Option<String>,
    pub privacy_email: Option<String>,
    pub delete_link: Option<String>,
    pub country: Option<String>,
}

impl EnrichmentFields {
    pub fn is_empty(&self) -> bool {
        self.generic_email.is_none()
            && self.contact_email.is_none()
            && self.privacy_email.is_none()
            && self.delete_link.is_none()
            && self.country.is_none()
    }
}

/// Append-only audit entry. Observability only, never control flow.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingLogEntry {
    pub company_id: String,
    pub step: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ProcessingLogEntry {
    pub fn new(
        company_id: impl Into<String>,
        step: impl Into<String>,
        status: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            step: step.into(),
            status: status.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Everything a single processing attempt wants to persist. Applied by the
/// store in one transaction so a failed attempt leaves no partial writes.
#[derive(Debug, Clone, Default)]
pub struct ItemOutcome {
    pub pages: Vec<PolicyPage>,
    pub scopes: Option<ScopeFlags>,
    pub enrichment: Option<EnrichmentFields>,
    pub log_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_terminality() {
        assert!(!CompanyStatus::Pending.is_terminal());
        assert!(!CompanyStatus::Processing.is_terminal());
        assert!(CompanyStatus::Completed.is_terminal());
        assert!(CompanyStatus::Failed.is_terminal());
    }

    #[test]
    fn enrichment_emptiness() {
        assert!(EnrichmentFields::default().is_empty());
        let fields = EnrichmentFields {
            country: Some("US".to_string()),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }
}
