//! Order Aggregator
//!
//! Turns a flat batch of requested line items into one persisted order
//! per merchant store.
//!
//! # Flow
//!
//! ```text
//! aggregate(resident_id, lines, …)
//!     ├─ 1. Resident must be VERIFIED
//!     ├─ 2. Validate every line through the inventory guard (input order)
//!     ├─ 3. Group lines by merchant store (insertion order preserved)
//!     ├─ 4. Compute per-line and per-order amounts
//!     ├─ 5. Stage guest cash payments when requested
//!     ├─ 6. Commit one transaction (conditional decrements + creates)
//!     ├─ 7. Refresh the ledger from committed state
//!     └─ 8. Return the fully populated orders
//! ```
//!
//! A conditional-decrement conflict (a concurrent reservation won the
//! race between validation and commit) retries the whole
//! validate-and-commit cycle up to `reserve_max_retries` times.

use super::amounts::{line_amount, order_total};
use super::error::{OrderingError, OrderingResult};
use super::guard::{InventoryGuard, ReservedLine};
use super::settlement::guest_cash_payment;
use crate::db::models::{
    LineItemRequest, Order, OrderDetail, OrderLine, OrderStatus, Resident,
};
use crate::db::repository::order::{
    AggregationPlan, CONFLICT_INSUFFICIENT, CONFLICT_TXN_RETRY, StagedDecrement, StagedLine,
    StagedOrder,
};
use crate::db::repository::{
    CatalogRepository, OrderRepository, RepoError, ResidentRepository, new_record_id,
    parse_record_id,
};
use crate::ledger::QuantityLedger;
use crate::utils::now_millis;
use std::collections::HashMap;

/// One per-store group accumulated during aggregation
struct StoreGroup {
    store_id: String,
    lines: Vec<ReservedLine>,
}

/// Ids surviving a committed batch, used for ledger refresh and response
struct CommittedBatch {
    order_ids: Vec<String>,
    listing_ids: Vec<String>,
}

pub struct OrderAggregator {
    residents: ResidentRepository,
    catalog: CatalogRepository,
    orders: OrderRepository,
    guard: InventoryGuard,
    ledger: QuantityLedger,
    max_retries: u32,
}

impl OrderAggregator {
    pub fn new(
        residents: ResidentRepository,
        catalog: CatalogRepository,
        orders: OrderRepository,
        ledger: QuantityLedger,
        max_retries: u32,
    ) -> Self {
        let guard = InventoryGuard::new(catalog.clone(), ledger.clone());
        Self {
            residents,
            catalog,
            orders,
            guard,
            ledger,
            max_retries,
        }
    }

    /// Aggregate a batch of line items into per-store orders
    ///
    /// All-or-nothing: the first rejection aborts the whole batch and
    /// nothing is persisted.
    pub async fn aggregate(
        &self,
        resident_id: &str,
        lines: &[LineItemRequest],
        delivery_address: Option<String>,
        guest_settlement: bool,
    ) -> OrderingResult<Vec<OrderDetail>> {
        if lines.is_empty() {
            return Err(OrderingError::Validation("no line items".into()));
        }

        let resident = self.verified_resident(resident_id).await?;
        let delivery_address = delivery_address.or_else(|| resident.unit_no.clone());

        let mut attempt: u32 = 0;
        let committed = loop {
            let result = self
                .try_once(resident_id, lines, delivery_address.clone(), guest_settlement)
                .await;
            match result {
                Err(OrderingError::Persistence(RepoError::Conflict(marker)))
                    if marker.starts_with(CONFLICT_INSUFFICIENT)
                        || marker == CONFLICT_TXN_RETRY =>
                {
                    attempt += 1;
                    if attempt > self.max_retries {
                        if marker.starts_with(CONFLICT_INSUFFICIENT) {
                            return Err(self.conflict_to_insufficient(&marker, lines).await);
                        }
                        return Err(OrderingError::Persistence(RepoError::Database(
                            "Reservation retry budget exhausted".to_string(),
                        )));
                    }
                    tracing::warn!(
                        resident_id = %resident_id,
                        attempt,
                        marker = %marker,
                        "Reservation conflict, re-validating batch"
                    );
                }
                Err(err) => return Err(err),
                Ok(batch) => break batch,
            }
        };

        // Ledger refresh strictly after the durable commit
        self.refresh_ledger(&committed.listing_ids).await;

        let mut details = Vec::with_capacity(committed.order_ids.len());
        for order_id in &committed.order_ids {
            details.push(self.orders.find_detail(order_id).await?);
        }

        tracing::info!(
            resident_id = %resident_id,
            orders = details.len(),
            lines = lines.len(),
            "Order batch committed"
        );
        Ok(details)
    }

    /// Resident precondition — enforced before any line is processed
    async fn verified_resident(&self, resident_id: &str) -> OrderingResult<Resident> {
        let resident = self
            .residents
            .find_by_id(resident_id)
            .await?
            .ok_or_else(|| OrderingError::UnverifiedResident(resident_id.to_string()))?;
        if !resident.is_verified() {
            return Err(OrderingError::UnverifiedResident(resident_id.to_string()));
        }
        Ok(resident)
    }

    /// One validate-and-commit cycle
    async fn try_once(
        &self,
        resident_id: &str,
        lines: &[LineItemRequest],
        delivery_address: Option<String>,
        guest_settlement: bool,
    ) -> OrderingResult<CommittedBatch> {
        let now = now_millis();
        let resident = parse_record_id(resident_id).map_err(OrderingError::Persistence)?;

        // 1. Validate every line in input order; track per-product totals so
        //    repeated products are checked cumulatively, not just per line
        let mut groups: Vec<StoreGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut reserved_per_product: HashMap<String, i32> = HashMap::new();

        for request in lines {
            let reserved = self.guard.reserve(&request.product_id, request.quantity).await?;

            let total = reserved_per_product
                .entry(reserved.listing.product_id.clone())
                .and_modify(|sum| *sum += reserved.quantity)
                .or_insert(reserved.quantity);
            if *total > reserved.listing.max_buy_per_order {
                return Err(OrderingError::PurchaseCapExceeded {
                    product_id: reserved.listing.product_id.clone(),
                    requested: *total,
                    cap: reserved.listing.max_buy_per_order,
                });
            }
            if *total > reserved.listing.quantity {
                return Err(OrderingError::InsufficientInventory {
                    product_id: reserved.listing.product_id.clone(),
                    requested: *total,
                    available: reserved.listing.quantity,
                });
            }

            // 2. Group by owning store, first-seen order
            let store_id = reserved.listing.merchant_store_id.clone();
            let idx = match group_index.get(&store_id) {
                Some(idx) => *idx,
                None => {
                    groups.push(StoreGroup {
                        store_id: store_id.clone(),
                        lines: Vec::new(),
                    });
                    group_index.insert(store_id, groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[idx].lines.push(reserved);
        }

        // 3. Decrements summed per listing, first-seen order
        let mut decrements: Vec<StagedDecrement> = Vec::new();
        let mut decrement_index: HashMap<String, usize> = HashMap::new();
        for group in &groups {
            for reserved in &group.lines {
                match decrement_index.get(&reserved.listing.listing_id) {
                    Some(idx) => decrements[*idx].quantity += reserved.quantity,
                    None => {
                        decrements.push(StagedDecrement {
                            listing: parse_record_id(&reserved.listing.listing_id)
                                .map_err(OrderingError::Persistence)?,
                            product_id: reserved.listing.product_id.clone(),
                            quantity: reserved.quantity,
                        });
                        decrement_index
                            .insert(reserved.listing.listing_id.clone(), decrements.len() - 1);
                    }
                }
            }
        }

        // 4. Stage one order per store
        let mut staged_orders = Vec::with_capacity(groups.len());
        for group in &groups {
            let order_id = new_record_id("order");

            let mut staged_lines = Vec::with_capacity(group.lines.len());
            for (line_no, reserved) in group.lines.iter().enumerate() {
                let unit_price = reserved.listing.price;
                staged_lines.push(StagedLine {
                    id: new_record_id("order_line"),
                    line: OrderLine {
                        id: None,
                        product: parse_record_id(&reserved.listing.product_id)
                            .map_err(OrderingError::Persistence)?,
                        menu_listing: parse_record_id(&reserved.listing.listing_id)
                            .map_err(OrderingError::Persistence)?,
                        name: reserved.listing.name.clone(),
                        unit_price,
                        quantity: reserved.quantity,
                        final_amount: line_amount(unit_price, reserved.quantity),
                        line_no: line_no as i32,
                        ordered_at: now,
                        status: OrderStatus::Open,
                    },
                });
            }

            let model_lines: Vec<OrderLine> =
                staged_lines.iter().map(|staged| staged.line.clone()).collect();
            let total_amount = order_total(&model_lines);

            let payment = guest_settlement
                .then(|| guest_cash_payment(&order_id.to_string(), total_amount, now));

            staged_orders.push(StagedOrder {
                order: Order {
                    id: None,
                    resident: resident.clone(),
                    merchant_store: parse_record_id(&group.store_id)
                        .map_err(OrderingError::Persistence)?,
                    delivery_address: delivery_address.clone(),
                    status: OrderStatus::Open,
                    total_amount,
                    created_at: now,
                    updated_at: now,
                },
                id: order_id,
                lines: staged_lines,
                payment,
            });
        }

        // 5. One unit of work
        let plan = AggregationPlan {
            decrements,
            orders: staged_orders,
            now,
        };
        self.orders.commit_aggregation(&plan).await?;

        Ok(CommittedBatch {
            order_ids: plan.orders.iter().map(|staged| staged.id.to_string()).collect(),
            listing_ids: plan
                .decrements
                .iter()
                .map(|dec| dec.listing.to_string())
                .collect(),
        })
    }

    /// Overwrite ledger snapshots from committed listing state
    async fn refresh_ledger(&self, listing_ids: &[String]) {
        match self.catalog.snapshot_quantities(listing_ids).await {
            Ok(rows) => {
                for row in rows {
                    self.ledger.put(&row.product_id, row.quantity, row.updated_at);
                }
            }
            Err(err) => {
                // 刷新失败只影响缓存新鲜度，guard 读取时会自动修复
                tracing::warn!(error = %err, "Ledger refresh failed after commit");
            }
        }
    }

    /// Translate an exhausted-retries conflict into the caller-facing
    /// rejection, with fresh availability numbers
    async fn conflict_to_insufficient(
        &self,
        marker: &str,
        lines: &[LineItemRequest],
    ) -> OrderingError {
        let product_id = marker
            .trim_start_matches(CONFLICT_INSUFFICIENT)
            .to_string();
        let requested: i32 = lines
            .iter()
            .filter(|line| line.product_id == product_id)
            .map(|line| line.quantity)
            .sum();
        let available = match self.catalog.find_active_by_product(&product_id).await {
            Ok(Some(listing)) => listing.quantity,
            _ => 0,
        };
        OrderingError::InsufficientInventory {
            product_id,
            requested,
            available,
        }
    }
}
