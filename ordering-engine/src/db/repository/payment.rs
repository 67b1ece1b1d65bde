//! Payment Repository
//!
//! 独立 payment 表，guest 结算记录在订单事务内写入（见 OrderRepository）。
//! 这里只提供查询。

use super::{BaseRepository, RepoResult};
use crate::db::models::Payment;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

#[derive(Clone)]
pub struct PaymentRepository {
    base: BaseRepository,
}

impl PaymentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// 按订单查询支付记录
    pub async fn list_by_order(&self, order_id: &str) -> RepoResult<Vec<Payment>> {
        let result: Vec<Payment> = self
            .base
            .db()
            .query("SELECT * FROM payment WHERE order_id = $order_id ORDER BY timestamp ASC")
            .bind(("order_id", order_id.to_string()))
            .await?
            .take(0)?;
        Ok(result)
    }

    /// 按时间范围查询（统计用）
    pub async fn list_by_time_range(&self, from: i64, to: i64) -> RepoResult<Vec<Payment>> {
        let result: Vec<Payment> = self
            .base
            .db()
            .query(
                "SELECT * FROM payment WHERE timestamp >= $from AND timestamp <= $to \
                 ORDER BY timestamp ASC",
            )
            .bind(("from", from))
            .bind(("to", to))
            .await?
            .take(0)?;
        Ok(result)
    }
}
