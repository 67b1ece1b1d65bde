//! Status Transition Handler
//!
//! Applies order-status changes under the closed transition table, with
//! the two side-effecting transitions:
//!
//! - `COMPLETED`: any unpaid cash payment for the order is settled
//! - `CANCELED`: every line's quantity is given back to its listing —
//!   the compensating action for the reservation made at aggregation
//!
//! The status flip is conditional on the observed current status, so a
//! racing transition loses cleanly and a terminal order can never be
//! canceled (and restocked) twice.

use super::error::{OrderingError, OrderingResult};
use crate::db::models::{OrderDetail, OrderStatus};
use crate::db::repository::order::{CONFLICT_STATUS, CONFLICT_TXN_RETRY, StagedRestock};
use crate::db::repository::{CatalogRepository, OrderRepository, RepoError, parse_record_id};
use crate::ledger::QuantityLedger;
use crate::utils::now_millis;
use std::collections::HashMap;

/// Bounded retries for engine-level transaction conflicts
const TXN_RETRY_LIMIT: u32 = 3;

/// The party requesting a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Resident who owns the order
    Resident(String),
    /// Merchant account owning the order's store
    Merchant(String),
}

pub struct StatusTransitionHandler {
    orders: OrderRepository,
    catalog: CatalogRepository,
    ledger: QuantityLedger,
}

impl StatusTransitionHandler {
    pub fn new(
        orders: OrderRepository,
        catalog: CatalogRepository,
        ledger: QuantityLedger,
    ) -> Self {
        Self {
            orders,
            catalog,
            ledger,
        }
    }

    /// Apply one status transition and return the updated order
    pub async fn transition(
        &self,
        order_id: &str,
        new_status: &str,
        actor: &Actor,
    ) -> OrderingResult<OrderDetail> {
        let target = OrderStatus::parse(new_status).ok_or_else(|| {
            OrderingError::InvalidStatus(format!("Unknown status value: {new_status}"))
        })?;

        let view = self.orders.access_view(order_id).await?;

        // Authorization before any mutation
        let authorized = match actor {
            Actor::Resident(id) => *id == view.resident_id,
            Actor::Merchant(id) => *id == view.merchant_id,
        };
        if !authorized {
            tracing::warn!(
                order_id = %order_id,
                actor = ?actor,
                "Unauthorized transition attempt"
            );
            return Err(OrderingError::Forbidden(format!(
                "Actor may not transition order {order_id}"
            )));
        }

        if !view.status.can_transition_to(target) {
            return Err(OrderingError::InvalidStatus(format!(
                "Cannot transition from {} to {}",
                view.status.as_str(),
                target.as_str()
            )));
        }

        let now = now_millis();
        let mut attempt: u32 = 0;
        loop {
            let result = match target {
                OrderStatus::Completed => self.complete(order_id, view.status, now).await,
                OrderStatus::Canceled => self.cancel(order_id, view.status, now).await,
                _ => self
                    .orders
                    .set_status(order_id, view.status, target, now)
                    .await
                    .map_err(OrderingError::Persistence),
            };

            match result {
                Ok(()) => break,
                // 条件翻转输给并发流转：按非法流转处理
                Err(OrderingError::Persistence(RepoError::Conflict(marker)))
                    if marker.starts_with(CONFLICT_STATUS) =>
                {
                    return Err(OrderingError::InvalidStatus(format!(
                        "Order {order_id} was transitioned concurrently"
                    )));
                }
                // 存储引擎乐观冲突：有界重试
                Err(OrderingError::Persistence(RepoError::Conflict(marker)))
                    if marker == CONFLICT_TXN_RETRY && attempt < TXN_RETRY_LIMIT =>
                {
                    attempt += 1;
                    tracing::warn!(order_id = %order_id, attempt, "Transition transaction conflict, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            order_id = %order_id,
            from = view.status.as_str(),
            to = target.as_str(),
            "Order status transitioned"
        );
        self.orders.find_detail(order_id).await.map_err(Into::into)
    }

    async fn complete(
        &self,
        order_id: &str,
        from: OrderStatus,
        now: i64,
    ) -> OrderingResult<()> {
        let detail = self.orders.find_detail(order_id).await?;
        let line_ids: Vec<String> = detail.lines.iter().map(|line| line.line_id.clone()).collect();
        self.orders
            .complete(order_id, from, &line_ids, now)
            .await
            .map_err(OrderingError::Persistence)
    }

    async fn cancel(&self, order_id: &str, from: OrderStatus, now: i64) -> OrderingResult<()> {
        let detail = self.orders.find_detail(order_id).await?;
        let line_ids: Vec<String> = detail.lines.iter().map(|line| line.line_id.clone()).collect();

        // Restocks summed per listing
        let mut restocks: Vec<StagedRestock> = Vec::new();
        let mut restock_index: HashMap<String, usize> = HashMap::new();
        for line in &detail.lines {
            match restock_index.get(&line.menu_listing_id) {
                Some(idx) => restocks[*idx].quantity += line.quantity,
                None => {
                    restocks.push(StagedRestock {
                        listing: parse_record_id(&line.menu_listing_id)
                            .map_err(OrderingError::Persistence)?,
                        quantity: line.quantity,
                    });
                    restock_index.insert(line.menu_listing_id.clone(), restocks.len() - 1);
                }
            }
        }
        let listing_ids: Vec<String> = detail
            .lines
            .iter()
            .map(|line| line.menu_listing_id.clone())
            .collect();

        self.orders
            .cancel_with_restock(order_id, from, &line_ids, &restocks, now)
            .await?;

        // Ledger overwritten with the restored quantities, post-commit
        match self.catalog.snapshot_quantities(&listing_ids).await {
            Ok(rows) => {
                for row in rows {
                    self.ledger.put(&row.product_id, row.quantity, row.updated_at);
                }
            }
            Err(err) => {
                tracing::warn!(order_id = %order_id, error = %err, "Ledger refresh failed after cancel");
            }
        }
        Ok(())
    }
}
