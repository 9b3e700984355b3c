//! Bulk import of company rows from a CSV source.
//!
//! Rows land with `status = pending`; conflicting ids are left untouched so
//! a re-import never resets an item that already ran. The whole import is a
//! single all-or-nothing store transaction.

use chrono::Utc;
use csv::StringRecord;
use std::io::Read;
use tracing::{info, warn};

use super::summary::ImportSummary;
use crate::domains::companies::{CompanyStore, NewCompany};

/// Import CSV rows into the store as pending work items.
///
/// Rows with an empty `domain` are skipped (not an error). A synthetic id is
/// generated only when the source has no `id` column at all; a present but
/// blank id cell is taken as-is. Any malformed row or store error aborts the
/// whole import and reports failure with the counts accumulated so far.
pub async fn import_csv<R: Read>(source: R, store: &dyn CompanyStore) -> ImportSummary {
    let mut reader = csv::Reader::from_reader(source);

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            warn!(error = %e, "unreadable CSV header");
            return ImportSummary::failed(&e.to_string(), 0, 0);
        }
    };
    let id_col = find_column(&headers, "id");
    let name_col = find_column(&headers, "name");
    let domain_col = find_column(&headers, "domain");

    let mut rows: Vec<NewCompany> = Vec::new();
    let mut skipped = 0u64;
    let started = Utc::now().timestamp();

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = index, error = %e, "malformed CSV row, aborting import");
                return ImportSummary::failed(&e.to_string(), rows.len() as u64, skipped);
            }
        };

        let domain = field(&record, domain_col);
        if domain.is_empty() {
            skipped += 1;
            continue;
        }

        // Only a source without an id column gets synthetic ids; a blank
        // cell in an existing id column is used as-is.
        let id = match id_col {
            Some(col) => field(&record, Some(col)),
            None => format!("auto_{}_{}", started, index),
        };

        rows.push(NewCompany {
            id,
            name: field(&record, name_col),
            domain,
        });
    }

    match store.insert_pending(&rows).await {
        Ok(imported) => {
            info!(imported, skipped, "bulk import committed");
            ImportSummary::completed(imported, skipped)
        }
        Err(e) => {
            // Nothing was committed; the summary reports the rows written
            // before the transaction was rolled back.
            warn!(error = %e, "bulk import aborted");
            ImportSummary::failed(&e.to_string(), e.attempted, skipped)
        }
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim() == name)
}

fn field(record: &StringRecord, column: Option<usize>) -> String {
    column
        .and_then(|col| record.get(col))
        .unwrap_or_default()
        .trim()
        .to_string()
}
