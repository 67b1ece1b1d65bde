//! Order Model (Graph Model)
//!
//! 订单行通过 `->has_line->order_line` 图边挂在订单上。
//! 订单从不物理删除，取消是状态流转并触发库存回补。

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

// =============================================================================
// Order Status
// =============================================================================

/// Order status state machine
///
/// ```text
/// OPEN ──> PREPARING ──> COMPLETED
///   │          │
///   └──────────┴───────> CANCELED
/// ```
///
/// `COMPLETED` and `CANCELED` are terminal. Illegal transitions are
/// rejected by `can_transition_to`, so a canceled order can never be
/// canceled (and restocked) twice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Preparing,
    Completed,
    Canceled,
}

impl OrderStatus {
    /// Parse an externally supplied status value
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPEN" => Some(Self::Open),
            "PREPARING" => Some(Self::Preparing),
            "COMPLETED" => Some(Self::Completed),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Preparing => "PREPARING",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Closed transition table
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Preparing)
                | (Self::Open, Self::Completed)
                | (Self::Open, Self::Canceled)
                | (Self::Preparing, Self::Completed)
                | (Self::Preparing, Self::Canceled)
        )
    }
}

// =============================================================================
// Entities
// =============================================================================

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Record link to the ordering resident
    pub resident: RecordId,
    /// Record link to the store this order was grouped under
    pub merchant_store: RecordId,
    pub delivery_address: Option<String>,
    pub status: OrderStatus,
    /// Σ line.final_amount — recomputed from lines, never accumulated
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line entity (connected via has_line edge)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Record link to the catalog product
    pub product: RecordId,
    /// Record link to the listing the price was captured from
    pub menu_listing: RecordId,
    pub name: String,
    /// Price captured at reservation time; later listing price changes
    /// must not alter placed orders
    pub unit_price: f64,
    pub quantity: i32,
    /// unit_price × quantity, fixed at creation
    pub final_amount: f64,
    /// Position within the input batch; keeps line order deterministic
    pub line_no: i32,
    pub ordered_at: i64,
    pub status: OrderStatus,
}

// =============================================================================
// Request Types
// =============================================================================

/// A single requested line item (transient, not persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

/// Order list filter
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub resident_id: Option<String>,
    pub merchant_store_id: Option<String>,
    pub status: Option<OrderStatus>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Order line for detail view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineDetail {
    pub line_id: String,
    pub product_id: String,
    pub menu_listing_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub final_amount: f64,
    pub line_no: i32,
    pub ordered_at: i64,
    pub status: OrderStatus,
}

/// Full order detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_id: String,
    pub resident_id: String,
    pub merchant_store_id: String,
    pub delivery_address: Option<String>,
    pub status: OrderStatus,
    pub total_amount: f64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub lines: Vec<OrderLineDetail>,
}

/// Minimal view for transition authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAccessView {
    pub order_id: String,
    pub resident_id: String,
    pub merchant_store_id: String,
    /// Owning merchant of the order's store (`merchant_store.merchant`)
    pub merchant_id: String,
    pub status: OrderStatus,
}
