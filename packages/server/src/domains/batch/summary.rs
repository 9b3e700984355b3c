//! Caller-facing summaries for bulk import and batch processing.

use serde::Serialize;

use crate::domains::companies::CompanyStatus;

/// Result of one bulk import call. Counts only; per-row results are not
/// reported.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub status: String,
    pub message: String,
    pub imported_count: u64,
    pub skipped_count: u64,
}

impl ImportSummary {
    pub fn completed(imported_count: u64, skipped_count: u64) -> Self {
        Self {
            status: "completed".to_string(),
            message: format!("Imported {} companies", imported_count),
            imported_count,
            skipped_count,
        }
    }

    pub fn failed(error: &str, imported_count: u64, skipped_count: u64) -> Self {
        Self {
            status: "failed".to_string(),
            message: format!("Error importing companies: {}", error),
            imported_count,
            skipped_count,
        }
    }
}

/// Outcome of a single item within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub domain: String,
    pub status: CompanyStatus,
    pub error: Option<String>,
}

/// Result of one batch call. Invariant: `successful + failed ==
/// total_processed == number of leased items`. Item failures are data here,
/// never an error of the batch call itself.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub status: String,
    pub message: String,
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub processing_time_seconds: f64,
    pub details: Vec<ItemResult>,
}

impl BatchSummary {
    pub fn empty(elapsed_seconds: f64) -> Self {
        Self {
            status: "completed".to_string(),
            message: "No pending companies found".to_string(),
            total_processed: 0,
            successful: 0,
            failed: 0,
            processing_time_seconds: elapsed_seconds,
            details: Vec::new(),
        }
    }
}
