//! Catalog Repository
//!
//! Store / menu / listing query support for the ordering engine.
//! Listing `quantity` mutations happen inside the order unit of work
//! (`OrderRepository`), never here.

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{
    Menu, MenuCreate, MenuListing, MenuListingCreate, MerchantStore, MerchantStoreCreate,
    ResolvedListing,
};
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const STORE_TABLE: &str = "merchant_store";
const MENU_TABLE: &str = "menu";
const LISTING_TABLE: &str = "menu_listing";

/// Quantity snapshot row, read after a unit of work commits to refresh
/// the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingQuantityRow {
    pub listing_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub updated_at: i64,
}

#[derive(Clone)]
pub struct CatalogRepository {
    base: BaseRepository,
}

impl CatalogRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Resolve the active listing selling a product, joined with its
    /// owning store via the menu link
    pub async fn find_active_by_product(
        &self,
        product_id: &str,
    ) -> RepoResult<Option<ResolvedListing>> {
        let product = parse_record_id(product_id)?;
        let mut result = self
            .base
            .db()
            .query(
                r#"
                SELECT
                    <string>id AS listing_id,
                    <string>product AS product_id,
                    <string>menu.merchant_store AS merchant_store_id,
                    name,
                    price,
                    quantity,
                    max_buy_per_order,
                    updated_at
                FROM menu_listing
                WHERE product = $product AND is_active = true AND menu.is_active = true
                LIMIT 1
                "#,
            )
            .bind(("product", product))
            .await?;
        let listings: Vec<ResolvedListing> = result.take(0)?;
        Ok(listings.into_iter().next())
    }

    /// Listing by full id string
    pub async fn find_listing_by_id(&self, id: &str) -> RepoResult<Option<MenuListing>> {
        let record_id = parse_record_id(id)?;
        let listing: Option<MenuListing> = self.base.db().select(record_id).await?;
        Ok(listing)
    }

    /// Re-read quantity + updated_at for a set of listings (ledger refresh)
    pub async fn snapshot_quantities(
        &self,
        listing_ids: &[String],
    ) -> RepoResult<Vec<ListingQuantityRow>> {
        let ids = listing_ids
            .iter()
            .map(|id| parse_record_id(id))
            .collect::<RepoResult<Vec<_>>>()?;
        let rows: Vec<ListingQuantityRow> = self
            .base
            .db()
            .query(
                "SELECT <string>id AS listing_id, <string>product AS product_id, \
                 quantity, updated_at FROM menu_listing WHERE id INSIDE $ids",
            )
            .bind(("ids", ids))
            .await?
            .take(0)?;
        Ok(rows)
    }

    /// Set a listing's quantity directly (merchant restock / seeding)
    pub async fn set_quantity(&self, listing_id: &str, quantity: i32) -> RepoResult<MenuListing> {
        let record_id = parse_record_id(listing_id)?;
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE $listing SET quantity = $quantity, updated_at = $now RETURN AFTER",
            )
            .bind(("listing", record_id))
            .bind(("quantity", quantity))
            .bind(("now", now_millis()))
            .await?;
        let listings: Vec<MenuListing> = result.take(0)?;
        listings
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Listing {} not found", listing_id)))
    }

    /// Create a merchant store (seeding)
    pub async fn create_store(&self, data: MerchantStoreCreate) -> RepoResult<MerchantStore> {
        let store = MerchantStore {
            id: None,
            merchant: data.merchant,
            name: data.name,
            phone: data.phone,
            is_open: true,
            created_at: now_millis(),
        };
        let created: Option<MerchantStore> =
            self.base.db().create(STORE_TABLE).content(store).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create store".to_string()))
    }

    /// Create a menu (seeding)
    pub async fn create_menu(&self, data: MenuCreate) -> RepoResult<Menu> {
        let menu = Menu {
            id: None,
            merchant_store: data.merchant_store,
            name: data.name,
            is_active: true,
        };
        let created: Option<Menu> = self.base.db().create(MENU_TABLE).content(menu).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create menu".to_string()))
    }

    /// Create a listing (seeding)
    pub async fn create_listing(&self, data: MenuListingCreate) -> RepoResult<MenuListing> {
        if data.quantity < 0 {
            return Err(RepoError::Validation("quantity cannot be negative".into()));
        }
        if data.max_buy_per_order <= 0 {
            return Err(RepoError::Validation(
                "max_buy_per_order must be positive".into(),
            ));
        }

        let listing = MenuListing {
            id: None,
            menu: data.menu,
            product: data.product,
            name: data.name,
            price: data.price,
            quantity: data.quantity,
            max_buy_per_order: data.max_buy_per_order,
            is_active: true,
            updated_at: now_millis(),
        };
        let created: Option<MenuListing> =
            self.base.db().create(LISTING_TABLE).content(listing).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create listing".to_string()))
    }
}
