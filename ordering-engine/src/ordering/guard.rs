//! Inventory Guard
//!
//! Validates a requested quantity against availability and the per-order
//! purchase cap, and captures the unit price for the line.
//!
//! 数量视图选择：账本快照的 `updated_at` 与持久化条目一致时以快照为准；
//! 不一致说明缓存已陈旧，以数据库为准并就地修复快照。
//!
//! The guard itself never decrements and never writes the ledger on the
//! accept path — the authoritative decrement is the conditional update
//! inside the aggregation unit of work, and the ledger is refreshed only
//! after that commit.

use super::amounts::{validate_line, validate_price};
use super::error::{OrderingError, OrderingResult};
use crate::db::models::ResolvedListing;
use crate::db::repository::CatalogRepository;
use crate::ledger::QuantityLedger;

/// A validated line: the resolved listing plus the accepted quantity.
/// `listing.price` is the captured unit price.
#[derive(Debug, Clone)]
pub struct ReservedLine {
    pub listing: ResolvedListing,
    pub quantity: i32,
}

pub struct InventoryGuard {
    catalog: CatalogRepository,
    ledger: QuantityLedger,
}

impl InventoryGuard {
    pub fn new(catalog: CatalogRepository, ledger: QuantityLedger) -> Self {
        Self { catalog, ledger }
    }

    /// Validate a requested quantity against the product's listing
    pub async fn reserve(&self, product_id: &str, requested: i32) -> OrderingResult<ReservedLine> {
        validate_line(product_id, requested)?;

        let listing = self
            .catalog
            .find_active_by_product(product_id)
            .await?
            .ok_or_else(|| OrderingError::ListingNotFound(product_id.to_string()))?;
        validate_price(listing.price)?;

        let current = self.current_quantity(&listing);

        if requested > listing.max_buy_per_order {
            tracing::debug!(
                product_id = %product_id,
                requested,
                cap = listing.max_buy_per_order,
                "Reservation rejected: purchase cap exceeded"
            );
            return Err(OrderingError::PurchaseCapExceeded {
                product_id: product_id.to_string(),
                requested,
                cap: listing.max_buy_per_order,
            });
        }

        if requested > current {
            tracing::debug!(
                product_id = %product_id,
                requested,
                available = current,
                "Reservation rejected: insufficient inventory"
            );
            return Err(OrderingError::InsufficientInventory {
                product_id: product_id.to_string(),
                requested,
                available: current,
            });
        }

        Ok(ReservedLine {
            listing,
            quantity: requested,
        })
    }

    /// Pick the quantity view and read-repair a stale snapshot
    fn current_quantity(&self, listing: &ResolvedListing) -> i32 {
        match self.ledger.get(&listing.product_id) {
            Some(snapshot) if snapshot.updated_at == listing.updated_at => snapshot.quantity,
            _ => {
                // 缓存陈旧或缺失：数据库为准，顺手修复
                self.ledger
                    .put(&listing.product_id, listing.quantity, listing.updated_at);
                listing.quantity
            }
        }
    }
}
