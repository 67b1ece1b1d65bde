//! End-to-end ordering flow tests against the in-memory engine
//!
//! 覆盖：按店分组、购买上限、库存不足、取消回补、现金占位支付、
//! 未验证住户拒单、批次原子性、状态机与鉴权。

use ordering_engine::db::DbService;
use ordering_engine::db::models::{
    LineItemRequest, MenuCreate, MenuListingCreate, MerchantStoreCreate, OrderFilter, OrderStatus,
    ResidentCreate, ResidentStatus,
};
use ordering_engine::db::repository::{CatalogRepository, ResidentRepository};
use ordering_engine::ordering::{Actor, OrderingError, OrderingService, PlaceOrderRequest};
use ordering_engine::{Config, QuantityLedger};
use surrealdb::RecordId;

const MERCHANT_1: &str = "merchant:m1";
const MERCHANT_2: &str = "merchant:m2";

struct World {
    db: DbService,
    service: OrderingService,
    catalog: CatalogRepository,
    residents: ResidentRepository,
    resident_id: String,
    unverified_id: String,
    store1_id: String,
    store2_id: String,
    listing_p: String,
    listing_q: String,
    listing_r: String,
}

fn line(product: &str, quantity: i32) -> LineItemRequest {
    LineItemRequest {
        product_id: product.to_string(),
        quantity,
    }
}

/// Seed two stores:
/// - store1 (merchant m1): P (25000, qty 5, cap 3), R (1000, qty 5, cap 10)
/// - store2 (merchant m2): Q (3000, qty 10, cap 5)
async fn setup() -> World {
    let db = DbService::memory().await.unwrap();
    let config = Config::with_overrides("unused", 3);
    let service = OrderingService::new(&config, &db);

    let residents = ResidentRepository::new(db.db().clone());
    let catalog = CatalogRepository::new(db.db().clone());

    let resident = residents
        .create(ResidentCreate {
            name: "Kim Jiwoo".to_string(),
            unit_no: Some("103-1204".to_string()),
            phone: None,
            status: Some(ResidentStatus::Verified),
        })
        .await
        .unwrap();
    let unverified = residents
        .create(ResidentCreate {
            name: "Lee Min".to_string(),
            unit_no: Some("105-301".to_string()),
            phone: None,
            status: Some(ResidentStatus::Pending),
        })
        .await
        .unwrap();

    let store1 = catalog
        .create_store(MerchantStoreCreate {
            merchant: MERCHANT_1.parse().unwrap(),
            name: "Riverside Deli".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    let store2 = catalog
        .create_store(MerchantStoreCreate {
            merchant: MERCHANT_2.parse().unwrap(),
            name: "Corner Fruits".to_string(),
            phone: None,
        })
        .await
        .unwrap();

    let menu1 = catalog
        .create_menu(MenuCreate {
            merchant_store: store1.id.clone().unwrap(),
            name: "Deli Menu".to_string(),
        })
        .await
        .unwrap();
    let menu2 = catalog
        .create_menu(MenuCreate {
            merchant_store: store2.id.clone().unwrap(),
            name: "Fruit Menu".to_string(),
        })
        .await
        .unwrap();

    let listing_p = catalog
        .create_listing(MenuListingCreate {
            menu: menu1.id.clone().unwrap(),
            product: RecordId::from_table_key("product", "p"),
            name: "Bulgogi Box".to_string(),
            price: 25000.0,
            quantity: 5,
            max_buy_per_order: 3,
        })
        .await
        .unwrap();
    let listing_r = catalog
        .create_listing(MenuListingCreate {
            menu: menu1.id.unwrap(),
            product: RecordId::from_table_key("product", "r"),
            name: "Rice Ball".to_string(),
            price: 1000.0,
            quantity: 5,
            max_buy_per_order: 10,
        })
        .await
        .unwrap();
    let listing_q = catalog
        .create_listing(MenuListingCreate {
            menu: menu2.id.unwrap(),
            product: RecordId::from_table_key("product", "q"),
            name: "Apple Crate".to_string(),
            price: 3000.0,
            quantity: 10,
            max_buy_per_order: 5,
        })
        .await
        .unwrap();

    World {
        db,
        service,
        catalog,
        residents,
        resident_id: resident.id.unwrap().to_string(),
        unverified_id: unverified.id.unwrap().to_string(),
        store1_id: store1.id.unwrap().to_string(),
        store2_id: store2.id.unwrap().to_string(),
        listing_p: listing_p.id.unwrap().to_string(),
        listing_q: listing_q.id.unwrap().to_string(),
        listing_r: listing_r.id.unwrap().to_string(),
    }
}

async fn quantity_of(world: &World, listing_id: &str) -> i32 {
    world
        .catalog
        .find_listing_by_id(listing_id)
        .await
        .unwrap()
        .unwrap()
        .quantity
}

#[tokio::test]
async fn batch_is_grouped_per_store_and_decrements_inventory() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(
            &world.resident_id,
            &[line("product:p", 2), line("product:q", 1)],
            None,
        )
        .await
        .unwrap();

    // One order per distinct store, stores unique across the set
    assert_eq!(orders.len(), 2);
    let stores: Vec<&str> = orders.iter().map(|o| o.merchant_store_id.as_str()).collect();
    assert!(stores.contains(&world.store1_id.as_str()));
    assert!(stores.contains(&world.store2_id.as_str()));
    assert_ne!(stores[0], stores[1]);

    // Every input line appears in exactly one returned line
    let total_lines: usize = orders.iter().map(|o| o.lines.len()).sum();
    assert_eq!(total_lines, 2);

    // Total invariant, recomputed
    for order in &orders {
        assert_eq!(order.status, OrderStatus::Open);
        let recomputed: f64 = order.lines.iter().map(|l| l.final_amount).sum();
        assert_eq!(order.total_amount, recomputed);
        for l in &order.lines {
            assert_eq!(l.final_amount, l.unit_price * l.quantity as f64);
        }
    }

    // P: 5 - 2 = 3, Q: 10 - 1 = 9
    assert_eq!(quantity_of(&world, &world.listing_p).await, 3);
    assert_eq!(quantity_of(&world, &world.listing_q).await, 9);
}

#[tokio::test]
async fn purchase_cap_rejection_leaves_state_untouched() {
    let world = setup().await;

    let result = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 4)], None)
        .await;

    assert!(matches!(
        result,
        Err(OrderingError::PurchaseCapExceeded { requested: 4, cap: 3, .. })
    ));
    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);

    let orders = world
        .service
        .get_orders(&OrderFilter {
            resident_id: Some(world.resident_id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn insufficient_inventory_rejection_leaves_state_untouched() {
    let world = setup().await;

    let result = world
        .service
        .create_order(&world.resident_id, &[line("product:r", 6)], None)
        .await;

    assert!(matches!(
        result,
        Err(OrderingError::InsufficientInventory { requested: 6, available: 5, .. })
    ));
    assert_eq!(quantity_of(&world, &world.listing_r).await, 5);
}

#[tokio::test]
async fn repeated_product_is_checked_cumulatively() {
    let world = setup().await;

    // 2 + 2 = 4 exceeds the per-order cap of 3 even though each line passes
    let result = world
        .service
        .create_order(
            &world.resident_id,
            &[line("product:p", 2), line("product:p", 2)],
            None,
        )
        .await;

    assert!(matches!(
        result,
        Err(OrderingError::PurchaseCapExceeded { requested: 4, cap: 3, .. })
    ));
    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);
}

#[tokio::test]
async fn rejected_batch_persists_nothing() {
    let world = setup().await;

    // First line is fine, second is insufficient: the whole batch aborts
    let result = world
        .service
        .create_order(
            &world.resident_id,
            &[line("product:p", 2), line("product:r", 6)],
            None,
        )
        .await;
    assert!(matches!(result, Err(OrderingError::InsufficientInventory { .. })));

    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);
    assert_eq!(quantity_of(&world, &world.listing_r).await, 5);
    let orders = world
        .service
        .get_orders(&OrderFilter {
            resident_id: Some(world.resident_id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn unverified_resident_cannot_order() {
    let world = setup().await;

    let result = world
        .service
        .create_order(&world.unverified_id, &[line("product:p", 1)], None)
        .await;

    assert!(matches!(result, Err(OrderingError::UnverifiedResident(_))));
    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);
}

#[tokio::test]
async fn merchant_cancel_restocks_listing_once() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 2)], None)
        .await
        .unwrap();
    let order_id = orders[0].order_id.clone();
    assert_eq!(quantity_of(&world, &world.listing_p).await, 3);

    let canceled = world
        .service
        .update_order_status(
            &order_id,
            "CANCELED",
            &Actor::Merchant(MERCHANT_1.to_string()),
        )
        .await
        .unwrap();
    assert_eq!(canceled.status, OrderStatus::Canceled);
    assert!(canceled.lines.iter().all(|l| l.status == OrderStatus::Canceled));
    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);

    // Canceling a canceled order is rejected and must not double-restock
    let again = world
        .service
        .update_order_status(
            &order_id,
            "CANCELED",
            &Actor::Merchant(MERCHANT_1.to_string()),
        )
        .await;
    assert!(matches!(again, Err(OrderingError::InvalidStatus(_))));
    assert_eq!(quantity_of(&world, &world.listing_p).await, 5);
}

#[tokio::test]
async fn guest_settlement_stages_unpaid_cash_payment() {
    let world = setup().await;

    let orders = world
        .service
        .create_order_on_behalf(
            PlaceOrderRequest {
                resident_id: world.resident_id.clone(),
                lines: vec![line("product:p", 2)],
                delivery_address: Some("Front desk pickup".to_string()),
                guest_settlement: true,
            },
            "employee:front_desk",
        )
        .await
        .unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].total_amount, 50000.0);

    let payments = world
        .service
        .payments()
        .list_by_order(&orders[0].order_id)
        .await
        .unwrap();
    assert_eq!(payments.len(), 1);
    let payment = &payments[0];
    assert_eq!(payment.amount, 50000.0);
    assert_eq!(
        payment.method,
        ordering_engine::db::models::PaymentMethod::Cash
    );
    assert_eq!(
        payment.status,
        ordering_engine::db::models::PaymentStatus::Unpaid
    );
}

#[tokio::test]
async fn completion_settles_cash_payment() {
    let world = setup().await;

    let orders = world
        .service
        .create_order_on_behalf(
            PlaceOrderRequest {
                resident_id: world.resident_id.clone(),
                lines: vec![line("product:q", 2)],
                delivery_address: None,
                guest_settlement: true,
            },
            "employee:front_desk",
        )
        .await
        .unwrap();
    let order_id = orders[0].order_id.clone();

    let completed = world
        .service
        .update_order_status(
            &order_id,
            "COMPLETED",
            &Actor::Merchant(MERCHANT_2.to_string()),
        )
        .await
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);

    let payments = world.service.payments().list_by_order(&order_id).await.unwrap();
    assert_eq!(
        payments[0].status,
        ordering_engine::db::models::PaymentStatus::Paid
    );

    // Settled payment shows up in the reporting window
    let settled = world
        .service
        .payments()
        .list_by_time_range(payments[0].timestamp - 1_000, payments[0].timestamp + 1_000)
        .await
        .unwrap();
    assert_eq!(settled.len(), 1);

    // Completion has no inventory effect
    assert_eq!(quantity_of(&world, &world.listing_q).await, 8);
}

#[tokio::test]
async fn merchant_restock_raises_availability() {
    let world = setup().await;

    world
        .service
        .create_order(&world.resident_id, &[line("product:p", 3)], None)
        .await
        .unwrap();
    assert_eq!(quantity_of(&world, &world.listing_p).await, 2);

    // Merchant restocks; the stale ledger snapshot is repaired on the
    // next guard read
    world.catalog.set_quantity(&world.listing_p, 10).await.unwrap();

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 3)], None)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(quantity_of(&world, &world.listing_p).await, 7);
}

#[tokio::test]
async fn preparing_hop_then_complete() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 1)], None)
        .await
        .unwrap();
    let order_id = orders[0].order_id.clone();

    let preparing = world
        .service
        .update_order_status(
            &order_id,
            "PREPARING",
            &Actor::Merchant(MERCHANT_1.to_string()),
        )
        .await
        .unwrap();
    assert_eq!(preparing.status, OrderStatus::Preparing);

    let completed = world
        .service
        .update_order_status(&order_id, "COMPLETED", &Actor::Resident(world.resident_id.clone()))
        .await
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);

    // Terminal: no further transitions
    let result = world
        .service
        .update_order_status(&order_id, "PREPARING", &Actor::Resident(world.resident_id.clone()))
        .await;
    assert!(matches!(result, Err(OrderingError::InvalidStatus(_))));
}

#[tokio::test]
async fn unknown_status_value_is_rejected() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 1)], None)
        .await
        .unwrap();

    let result = world
        .service
        .update_order_status(
            &orders[0].order_id,
            "SHIPPED",
            &Actor::Resident(world.resident_id.clone()),
        )
        .await;
    assert!(matches!(result, Err(OrderingError::InvalidStatus(_))));
}

#[tokio::test]
async fn unrelated_actors_are_forbidden() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 1)], None)
        .await
        .unwrap();
    let order_id = orders[0].order_id.clone();

    // Another resident
    let other = world
        .residents
        .create(ResidentCreate {
            name: "Park Dohyun".to_string(),
            unit_no: None,
            phone: None,
            status: Some(ResidentStatus::Verified),
        })
        .await
        .unwrap();
    let result = world
        .service
        .update_order_status(
            &order_id,
            "CANCELED",
            &Actor::Resident(other.id.unwrap().to_string()),
        )
        .await;
    assert!(matches!(result, Err(OrderingError::Forbidden(_))));

    // A merchant that does not own the store
    let result = world
        .service
        .update_order_status(&order_id, "CANCELED", &Actor::Merchant(MERCHANT_2.to_string()))
        .await;
    assert!(matches!(result, Err(OrderingError::Forbidden(_))));

    // Nothing moved
    assert_eq!(quantity_of(&world, &world.listing_p).await, 4);
}

#[tokio::test]
async fn ledger_tracks_committed_quantities() {
    let world = setup().await;
    let ledger: &QuantityLedger = world.service.ledger();

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 2)], None)
        .await
        .unwrap();

    let snapshot = ledger.get("product:p").unwrap();
    assert_eq!(snapshot.quantity, 3);

    world
        .service
        .update_order_status(
            &orders[0].order_id,
            "CANCELED",
            &Actor::Resident(world.resident_id.clone()),
        )
        .await
        .unwrap();

    let snapshot = ledger.get("product:p").unwrap();
    assert_eq!(snapshot.quantity, 5);
}

#[tokio::test]
async fn captured_price_survives_listing_price_change() {
    let world = setup().await;

    let orders = world
        .service
        .create_order(&world.resident_id, &[line("product:p", 2)], None)
        .await
        .unwrap();
    let order_id = orders[0].order_id.clone();

    // Merchant re-prices the listing afterwards
    world
        .db
        .db()
        .query("UPDATE $listing SET price = 99000.0")
        .bind(("listing", world.listing_p.parse::<RecordId>().unwrap()))
        .await
        .unwrap()
        .check()
        .unwrap();

    let detail = world
        .service
        .get_orders(&OrderFilter {
            resident_id: Some(world.resident_id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let order = detail.iter().find(|o| o.order_id == order_id).unwrap();
    assert_eq!(order.lines[0].unit_price, 25000.0);
    assert_eq!(order.total_amount, 50000.0);
}

#[tokio::test]
async fn filters_select_by_store_and_status() {
    let world = setup().await;

    world
        .service
        .create_order(
            &world.resident_id,
            &[line("product:p", 1), line("product:q", 1)],
            None,
        )
        .await
        .unwrap();

    let store1_orders = world
        .service
        .get_orders(&OrderFilter {
            merchant_store_id: Some(world.store1_id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(store1_orders.len(), 1);
    assert_eq!(store1_orders[0].merchant_store_id, world.store1_id);

    let open_orders = world
        .service
        .get_orders(&OrderFilter {
            resident_id: Some(world.resident_id.clone()),
            status: Some(OrderStatus::Open),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(open_orders.len(), 2);
}
