//! Menu Domain Models
//!
//! 菜单条目 (`menu_listing`) 的 `quantity` 是库存的权威可售数量；
//! 数量账本缓存只是它的镜像。

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

/// Menu entity — a store's published menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Record link to the owning store
    pub merchant_store: RecordId,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Sellable inventory for a product within a menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuListing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Record link to the owning menu
    pub menu: RecordId,
    /// Record link to the catalog product
    pub product: RecordId,
    pub name: String,
    pub price: f64,
    /// Authoritative available count
    pub quantity: i32,
    /// Per-order purchase cap for this listing
    pub max_buy_per_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub updated_at: i64,
}

fn default_true() -> bool {
    true
}

/// Create menu payload (seeding)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuCreate {
    pub merchant_store: RecordId,
    pub name: String,
}

/// Create listing payload (seeding)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuListingCreate {
    pub menu: RecordId,
    pub product: RecordId,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub max_buy_per_order: i32,
}

/// Listing joined with its owning store (`menu.merchant_store`)
///
/// This is the view the inventory guard works against; ids are plain
/// strings for the service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedListing {
    pub listing_id: String,
    pub product_id: String,
    pub merchant_store_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub max_buy_per_order: i32,
    pub updated_at: i64,
}
