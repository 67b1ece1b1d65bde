//! Resident Model

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Resident lifecycle status
///
/// Only VERIFIED residents may place orders.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentStatus {
    Pending,
    Verified,
    Suspended,
}

/// Resident entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    /// Apartment unit, e.g. "103-1204"
    pub unit_no: Option<String>,
    pub phone: Option<String>,
    pub status: ResidentStatus,
    pub created_at: i64,
}

impl Resident {
    pub fn is_verified(&self) -> bool {
        self.status == ResidentStatus::Verified
    }
}

/// Create resident payload (seeding / account flow)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentCreate {
    pub name: String,
    pub unit_no: Option<String>,
    pub phone: Option<String>,
    pub status: Option<ResidentStatus>,
}
