//! Ordering engine error taxonomy

use crate::db::repository::RepoError;
use thiserror::Error;

/// Engine errors
///
/// Validation errors abort the whole aggregation call before any write
/// commits; `Forbidden` aborts a transition before any mutation;
/// `Persistence` surfaces unit-of-work failures as-is.
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Resident not verified: {0}")]
    UnverifiedResident(String),

    #[error("No active listing for product: {0}")]
    ListingNotFound(String),

    #[error("Insufficient inventory for {product_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        product_id: String,
        requested: i32,
        available: i32,
    },

    #[error("Purchase cap exceeded for {product_id}: requested {requested}, cap {cap}")]
    PurchaseCapExceeded {
        product_id: String,
        requested: i32,
        cap: i32,
    },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] RepoError),
}

pub type OrderingResult<T> = Result<T, OrderingError>;
