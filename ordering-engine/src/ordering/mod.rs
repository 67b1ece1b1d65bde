//! Ordering Engine - 聚合、库存守卫、金额、状态流转
//!
//! `OrderingService` is the caller-facing operation surface, consumed by
//! the (out-of-scope) HTTP layer.

pub mod aggregator;
pub mod amounts;
pub mod error;
pub mod guard;
pub mod settlement;
pub mod transition;

pub use aggregator::OrderAggregator;
pub use error::{OrderingError, OrderingResult};
pub use guard::{InventoryGuard, ReservedLine};
pub use transition::{Actor, StatusTransitionHandler};

use crate::core::Config;
use crate::db::DbService;
use crate::db::models::{OrderDetail, OrderFilter};
use crate::db::repository::{
    CatalogRepository, OrderRepository, PaymentRepository, ResidentRepository,
};
use crate::ledger::QuantityLedger;

pub use crate::db::models::LineItemRequest;

/// Order placement request
#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub resident_id: String,
    pub lines: Vec<LineItemRequest>,
    pub delivery_address: Option<String>,
    /// Create a placeholder cash payment per order (no online flow)
    pub guest_settlement: bool,
}

/// Caller-facing ordering service
pub struct OrderingService {
    aggregator: OrderAggregator,
    transitions: StatusTransitionHandler,
    orders: OrderRepository,
    payments: PaymentRepository,
    ledger: QuantityLedger,
}

impl OrderingService {
    pub fn new(config: &Config, db: &DbService) -> Self {
        let ledger = QuantityLedger::new();
        let residents = ResidentRepository::new(db.db().clone());
        let catalog = CatalogRepository::new(db.db().clone());
        let orders = OrderRepository::new(db.db().clone());
        let payments = PaymentRepository::new(db.db().clone());

        let aggregator = OrderAggregator::new(
            residents,
            catalog.clone(),
            orders.clone(),
            ledger.clone(),
            config.reserve_max_retries,
        );
        let transitions =
            StatusTransitionHandler::new(orders.clone(), catalog, ledger.clone());

        Self {
            aggregator,
            transitions,
            orders,
            payments,
            ledger,
        }
    }

    /// Place an order batch for a resident
    pub async fn create_order(
        &self,
        resident_id: &str,
        lines: &[LineItemRequest],
        delivery_address: Option<String>,
    ) -> OrderingResult<Vec<OrderDetail>> {
        self.aggregator
            .aggregate(resident_id, lines, delivery_address, false)
            .await
    }

    /// Place an order batch on behalf of a resident (admin / front-desk
    /// flow); guest settlement creates the cash placeholder per order
    pub async fn create_order_on_behalf(
        &self,
        request: PlaceOrderRequest,
        acting_party_id: &str,
    ) -> OrderingResult<Vec<OrderDetail>> {
        tracing::info!(
            resident_id = %request.resident_id,
            acting_party_id = %acting_party_id,
            guest_settlement = request.guest_settlement,
            "Order placed on behalf"
        );
        self.aggregator
            .aggregate(
                &request.resident_id,
                &request.lines,
                request.delivery_address,
                request.guest_settlement,
            )
            .await
    }

    /// List orders with optional resident / store / status filters
    pub async fn get_orders(&self, filter: &OrderFilter) -> OrderingResult<Vec<OrderDetail>> {
        self.orders.list(filter).await.map_err(Into::into)
    }

    /// Apply a status transition requested by an authorized actor
    pub async fn update_order_status(
        &self,
        order_id: &str,
        new_status: &str,
        actor: &Actor,
    ) -> OrderingResult<OrderDetail> {
        self.transitions.transition(order_id, new_status, actor).await
    }

    /// Payment lookups (settlement inspection)
    pub fn payments(&self) -> &PaymentRepository {
        &self.payments
    }

    /// The shared quantity ledger
    pub fn ledger(&self) -> &QuantityLedger {
        &self.ledger
    }
}
