//! 并发下单压力测试 - 同一商品的并发预订不得超卖
//!
//! 命令交叉执行模式：多个住户同时抢购同一条目，条件扣减保证
//! 已接受数量之和永不超过库存。

use ordering_engine::db::DbService;
use ordering_engine::db::models::{
    LineItemRequest, MenuCreate, MenuListingCreate, MerchantStoreCreate, ResidentCreate,
    ResidentStatus,
};
use ordering_engine::db::repository::{CatalogRepository, ResidentRepository};
use ordering_engine::ordering::{OrderingError, OrderingService};
use ordering_engine::Config;
use std::sync::Arc;
use surrealdb::RecordId;

const STOCK: i32 = 10;
const BUYERS: usize = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_reservations_never_oversell() {
    let db = DbService::memory().await.unwrap();
    // Generous retry budget: engine-level transaction conflicts are
    // expected under this contention and must not masquerade as failures
    let config = Config::with_overrides("unused", 100);
    let service = Arc::new(OrderingService::new(&config, &db));

    let residents = ResidentRepository::new(db.db().clone());
    let catalog = CatalogRepository::new(db.db().clone());

    let store = catalog
        .create_store(MerchantStoreCreate {
            merchant: "merchant:m1".parse().unwrap(),
            name: "Rush Hour Mart".to_string(),
            phone: None,
        })
        .await
        .unwrap();
    let menu = catalog
        .create_menu(MenuCreate {
            merchant_store: store.id.unwrap(),
            name: "Flash Sale".to_string(),
        })
        .await
        .unwrap();
    let listing = catalog
        .create_listing(MenuListingCreate {
            menu: menu.id.unwrap(),
            product: RecordId::from_table_key("product", "hot"),
            name: "Limited Box".to_string(),
            price: 12000.0,
            quantity: STOCK,
            max_buy_per_order: 1,
        })
        .await
        .unwrap();
    let listing_id = listing.id.unwrap().to_string();

    let mut buyer_ids = Vec::with_capacity(BUYERS);
    for i in 0..BUYERS {
        let resident = residents
            .create(ResidentCreate {
                name: format!("Buyer {i}"),
                unit_no: None,
                phone: None,
                status: Some(ResidentStatus::Verified),
            })
            .await
            .unwrap();
        buyer_ids.push(resident.id.unwrap().to_string());
    }

    let mut handles = Vec::with_capacity(BUYERS);
    for resident_id in buyer_ids {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .create_order(
                    &resident_id,
                    &[LineItemRequest {
                        product_id: "product:hot".to_string(),
                        quantity: 1,
                    }],
                    None,
                )
                .await
        }));
    }

    let mut accepted: i32 = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(orders) => {
                assert_eq!(orders.len(), 1);
                accepted += orders[0].lines[0].quantity;
            }
            Err(OrderingError::InsufficientInventory { available, .. }) => {
                assert!(available < 1);
            }
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }

    // Accepted total never exceeds the seeded stock, and persisted state
    // reflects exactly the accepted decrements
    assert!(accepted <= STOCK, "oversold: accepted {accepted} of {STOCK}");
    let final_quantity = catalog
        .find_listing_by_id(&listing_id)
        .await
        .unwrap()
        .unwrap()
        .quantity;
    assert_eq!(final_quantity, STOCK - accepted);
    assert!(final_quantity >= 0);

    // With a sufficient retry budget every buyer either commits or sees a
    // genuine sell-out
    assert_eq!(accepted, STOCK);
}
