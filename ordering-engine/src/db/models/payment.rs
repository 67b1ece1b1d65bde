//! Payment Model
//!
//! 独立 payment 表，order_id 为普通字符串字段。
//! payment_id UNIQUE 索引保证幂等。

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

/// Payment record
///
/// Created alongside an order when settlement is immediate (guest cash
/// flow); otherwise created later by the external payment subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// External payment identifier (UNIQUE)
    pub payment_id: String,
    /// Full record id string of the order ("order:…")
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: f64,
    pub status: PaymentStatus,
    pub timestamp: i64,
    pub created_at: i64,
}
