use thiserror::Error;

use crate::domain::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not signed in: initialize the ledger or configure an account first")]
    NotSignedIn,

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale already exists: {0}")]
    SaleAlreadyExists(String),

    #[error("Invalid sale: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid month: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
