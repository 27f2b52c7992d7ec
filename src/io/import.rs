use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use tracing::{info, warn};

use crate::application::{AppError, LedgerService};
use crate::io::{DocumentError, SaleDocument};
use crate::storage::RecordStore;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred for one document during import
#[derive(Debug, Clone)]
pub struct ImportError {
    /// Position of the document in the input, starting at 0
    pub index: usize,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub skip_duplicates: bool,
    pub validate_only: bool,
}

/// Accepted input shapes: a bare array, or an object holding a `sales` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentBatch {
    List(Vec<Value>),
    Wrapped { sales: Vec<Value> },
}

impl DocumentBatch {
    fn into_documents(self) -> Vec<Value> {
        match self {
            DocumentBatch::List(docs) | DocumentBatch::Wrapped { sales: docs } => docs,
        }
    }
}

/// Importer for loading sale documents into the ledger
pub struct Importer<'a, S: RecordStore> {
    service: &'a LedgerService<S>,
}

impl<'a, S: RecordStore> Importer<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Import sales from JSON documents. A bad document is reported and
    /// skipped; the rest of the batch continues.
    pub async fn import_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let batch: DocumentBatch =
            serde_json::from_reader(reader).context("Input is not a JSON array of sales")?;
        let received_at = Utc::now();
        let mut result = ImportResult::default();

        for (index, value) in batch.into_documents().into_iter().enumerate() {
            let document: SaleDocument = match serde_json::from_value(value) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed sale document");
                    result.errors.push(ImportError {
                        index,
                        field: None,
                        error: format!("Malformed document: {}", e),
                    });
                    continue;
                }
            };

            let record = match document.into_record(received_at) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "Skipping invalid sale document");
                    result.errors.push(ImportError {
                        index,
                        field: Some(field_of(&e).to_string()),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if options.dry_run || options.validate_only {
                result.imported += 1;
                continue;
            }

            match self.service.import_sale(record).await {
                Ok(_) => result.imported += 1,
                Err(AppError::SaleAlreadyExists(id)) if options.skip_duplicates => {
                    warn!(index, id = %id, "Skipping duplicate sale");
                    result.skipped += 1;
                }
                Err(e) => {
                    warn!(index, error = %e, "Failed to import sale");
                    result.errors.push(ImportError {
                        index,
                        field: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Import finished"
        );
        Ok(result)
    }
}

fn field_of(error: &DocumentError) -> &'static str {
    match error {
        DocumentError::MissingCustomerName => "customerName",
        DocumentError::InvalidTimestamp(_) => "timestamp",
        DocumentError::AmountOutOfRange(field) => field,
    }
}
