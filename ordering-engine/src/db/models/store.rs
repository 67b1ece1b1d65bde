//! Merchant Store Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Merchant store entity
///
/// `merchant` links to the owning merchant account; store-level
/// authorization for order transitions resolves through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Record link to the owning merchant account
    pub merchant: RecordId,
    pub name: String,
    pub phone: Option<String>,
    #[serde(default = "default_true")]
    pub is_open: bool,
    pub created_at: i64,
}

fn default_true() -> bool {
    true
}

/// Create store payload (seeding)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantStoreCreate {
    pub merchant: RecordId,
    pub name: String,
    pub phone: Option<String>,
}
