//! Database Module
//!
//! Embedded SurrealDB storage (RocksDB engine on disk, Mem engine for tests).

pub mod models;
pub mod repository;

use repository::{RepoError, RepoResult};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

const NAMESPACE: &str = "plaza";
const DATABASE: &str = "ordering";

/// Database service — owns the embedded SurrealDB handle
#[derive(Clone)]
pub struct DbService {
    db: Surreal<Db>,
}

impl DbService {
    /// Open the on-disk database under the given work directory
    pub async fn new(work_dir: &str) -> RepoResult<Self> {
        let path = format!("{}/ordering.db", work_dir.trim_end_matches('/'));
        let db = Surreal::new::<RocksDb>(path.as_str())
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open database: {e}")))?;
        let service = Self::init(db).await?;
        tracing::info!(path = %path, "Database connection established (SurrealDB RocksDB)");
        Ok(service)
    }

    /// In-memory database (tests)
    pub async fn memory() -> RepoResult<Self> {
        let db = Surreal::new::<Mem>(())
            .await
            .map_err(|e| RepoError::Database(format!("Failed to open in-memory database: {e}")))?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> RepoResult<Self> {
        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| RepoError::Database(format!("Failed to select namespace: {e}")))?;
        let service = Self { db };
        service.init_schema().await?;
        Ok(service)
    }

    /// 定义索引（幂等，启动时执行）
    ///
    /// - payment.payment_id UNIQUE 保证支付记录幂等
    /// - menu_listing.product 加速按商品解析在售条目
    async fn init_schema(&self) -> RepoResult<()> {
        self.db
            .query(
                r#"
                DEFINE INDEX IF NOT EXISTS payment_payment_id ON TABLE payment COLUMNS payment_id UNIQUE;
                DEFINE INDEX IF NOT EXISTS menu_listing_product ON TABLE menu_listing COLUMNS product;
                DEFINE INDEX IF NOT EXISTS order_resident ON TABLE order COLUMNS resident;
                "#,
            )
            .await?
            .check()?;
        tracing::info!("Database indexes defined");
        Ok(())
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
