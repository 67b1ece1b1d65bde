//! Order Repository (Graph Model)
//!
//! 订单/订单行/支付/库存扣减在同一事务内提交；
//! 条件扣减 (`WHERE quantity >= $qty`) + THROW 保证不超卖。
//! Lines hang off orders via `->has_line->order_line` edges.

use super::{BaseRepository, RepoError, RepoResult, parse_record_id};
use crate::db::models::{
    Order, OrderAccessView, OrderDetail, OrderFilter, OrderLine, OrderStatus, Payment,
};
use std::fmt::Write as _;
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

/// Conflict marker prefixes thrown inside units of work
pub const CONFLICT_INSUFFICIENT: &str = "INSUFFICIENT:";
pub const CONFLICT_STATUS: &str = "STATUS_CONFLICT:";
/// Marker for engine-level optimistic transaction conflicts, always retryable
pub const CONFLICT_TXN_RETRY: &str = "TXN_RETRY";

/// Order detail projection, shared by `find_detail` and `list`
const DETAIL_FIELDS: &str = r#"
    <string>id AS order_id,
    <string>resident AS resident_id,
    <string>merchant_store AS merchant_store_id,
    delivery_address,
    status,
    total_amount,
    created_at,
    updated_at,
    (
        SELECT
            <string>id AS line_id,
            <string>product AS product_id,
            <string>menu_listing AS menu_listing_id,
            name,
            unit_price,
            quantity,
            final_amount,
            line_no,
            ordered_at,
            status
        FROM ->has_line->order_line
        ORDER BY line_no
    ) AS lines
"#;

// =============================================================================
// Unit-of-work input
// =============================================================================

/// A line staged for creation, with its pre-generated record id
#[derive(Debug, Clone)]
pub struct StagedLine {
    pub id: RecordId,
    pub line: OrderLine,
}

/// An order staged for creation, with its lines and optional guest payment
#[derive(Debug, Clone)]
pub struct StagedOrder {
    pub id: RecordId,
    pub order: Order,
    pub lines: Vec<StagedLine>,
    pub payment: Option<Payment>,
}

/// A conditional listing decrement; quantities already summed per listing
#[derive(Debug, Clone)]
pub struct StagedDecrement {
    pub listing: RecordId,
    pub product_id: String,
    pub quantity: i32,
}

/// Everything one aggregation call persists atomically
#[derive(Debug, Clone)]
pub struct AggregationPlan {
    pub decrements: Vec<StagedDecrement>,
    pub orders: Vec<StagedOrder>,
    pub now: i64,
}

/// A listing restock applied when an order is canceled
#[derive(Debug, Clone)]
pub struct StagedRestock {
    pub listing: RecordId,
    pub quantity: i32,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Commit one aggregation call as a single transaction
    ///
    /// Statement order: conditional decrements first (a shortfall THROWs
    /// and cancels the whole transaction), then orders, lines, edges and
    /// payments. A `RepoError::Conflict` carrying `INSUFFICIENT:<product>`
    /// means a concurrent reservation won the race; the caller may
    /// re-validate and retry.
    pub async fn commit_aggregation(&self, plan: &AggregationPlan) -> RepoResult<()> {
        let mut sql = String::from("BEGIN TRANSACTION;\n");

        for (k, _) in plan.decrements.iter().enumerate() {
            let _ = writeln!(
                sql,
                "LET $dec_{k} = (UPDATE $listing_{k} SET quantity -= $dqty_{k}, updated_at = $now \
                 WHERE quantity >= $dqty_{k} RETURN AFTER);"
            );
            let _ = writeln!(sql, "IF array::len($dec_{k}) == 0 {{ THROW $dmsg_{k} }};");
        }

        for (i, staged) in plan.orders.iter().enumerate() {
            let _ = writeln!(sql, "CREATE $order_{i} CONTENT $order_data_{i};");
            for (j, _) in staged.lines.iter().enumerate() {
                let _ = writeln!(sql, "CREATE $line_{i}_{j} CONTENT $line_data_{i}_{j};");
                let _ = writeln!(sql, "RELATE $order_{i}->has_line->$line_{i}_{j};");
            }
            if staged.payment.is_some() {
                let _ = writeln!(sql, "CREATE payment CONTENT $pay_data_{i};");
            }
        }

        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self.base.db().query(sql).bind(("now", plan.now));

        for (k, dec) in plan.decrements.iter().enumerate() {
            query = query
                .bind((format!("listing_{k}"), dec.listing.clone()))
                .bind((format!("dqty_{k}"), dec.quantity))
                .bind((
                    format!("dmsg_{k}"),
                    format!("{}{}", CONFLICT_INSUFFICIENT, dec.product_id),
                ));
        }

        for (i, staged) in plan.orders.iter().enumerate() {
            query = query
                .bind((format!("order_{i}"), staged.id.clone()))
                .bind((format!("order_data_{i}"), staged.order.clone()));
            for (j, staged_line) in staged.lines.iter().enumerate() {
                query = query
                    .bind((format!("line_{i}_{j}"), staged_line.id.clone()))
                    .bind((format!("line_data_{i}_{j}"), staged_line.line.clone()));
            }
            if let Some(payment) = &staged.payment {
                query = query.bind((format!("pay_data_{i}"), payment.clone()));
            }
        }

        let response = query.await?;
        Self::check_txn(response)
    }

    /// Get full order detail using graph traversal
    pub async fn find_detail(&self, order_id: &str) -> RepoResult<OrderDetail> {
        let record_id = parse_record_id(order_id)?;
        let mut result = self
            .base
            .db()
            .query(format!("SELECT {DETAIL_FIELDS} FROM order WHERE id = $id"))
            .bind(("id", record_id))
            .await?;
        let details: Vec<OrderDetail> = result.take(0)?;
        details
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", order_id)))
    }

    /// List orders with optional filters, newest first
    pub async fn list(&self, filter: &OrderFilter) -> RepoResult<Vec<OrderDetail>> {
        let mut conds: Vec<&str> = Vec::new();
        if filter.resident_id.is_some() {
            conds.push("resident = $resident");
        }
        if filter.merchant_store_id.is_some() {
            conds.push("merchant_store = $store");
        }
        if filter.status.is_some() {
            conds.push("status = $status");
        }
        let where_clause = if conds.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conds.join(" AND "))
        };

        let sql = format!("SELECT {DETAIL_FIELDS} FROM order{where_clause} ORDER BY created_at DESC");
        let mut query = self.base.db().query(sql);
        if let Some(resident_id) = &filter.resident_id {
            query = query.bind(("resident", parse_record_id(resident_id)?));
        }
        if let Some(store_id) = &filter.merchant_store_id {
            query = query.bind(("store", parse_record_id(store_id)?));
        }
        if let Some(status) = filter.status {
            query = query.bind(("status", status));
        }

        let details: Vec<OrderDetail> = query.await?.take(0)?;
        Ok(details)
    }

    /// Minimal view for transition authorization
    pub async fn access_view(&self, order_id: &str) -> RepoResult<OrderAccessView> {
        let record_id = parse_record_id(order_id)?;
        let mut result = self
            .base
            .db()
            .query(
                r#"
                SELECT
                    <string>id AS order_id,
                    <string>resident AS resident_id,
                    <string>merchant_store AS merchant_store_id,
                    <string>merchant_store.merchant AS merchant_id,
                    status
                FROM order WHERE id = $id
                "#,
            )
            .bind(("id", record_id))
            .await?;
        let views: Vec<OrderAccessView> = result.take(0)?;
        views
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Order {} not found", order_id)))
    }

    /// Plain status hop with no inventory or payment effect (e.g. PREPARING)
    ///
    /// The flip is conditional on the observed `from` status; losing a
    /// race surfaces as `Conflict`.
    pub async fn set_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        now: i64,
    ) -> RepoResult<()> {
        let record_id = parse_record_id(order_id)?;
        let rows: Vec<Order> = self
            .base
            .db()
            .query(
                "UPDATE $order SET status = $to, updated_at = $now WHERE status = $from \
                 RETURN AFTER",
            )
            .bind(("order", record_id))
            .bind(("from", from))
            .bind(("to", to))
            .bind(("now", now))
            .await?
            .take(0)?;
        if rows.is_empty() {
            return Err(RepoError::Conflict(format!(
                "{}{}",
                CONFLICT_STATUS, order_id
            )));
        }
        Ok(())
    }

    /// Complete an order: conditional status flip, line statuses, and
    /// settlement of any unpaid cash payment, in one transaction
    pub async fn complete(
        &self,
        order_id: &str,
        from: OrderStatus,
        line_ids: &[String],
        now: i64,
    ) -> RepoResult<()> {
        let record_id = parse_record_id(order_id)?;
        let lines = line_ids
            .iter()
            .map(|id| parse_record_id(id))
            .collect::<RepoResult<Vec<_>>>()?;

        let mut sql = String::from(
            "BEGIN TRANSACTION;\n\
             LET $ord = (UPDATE $order SET status = $to, updated_at = $now \
             WHERE status = $from RETURN AFTER);\n\
             IF array::len($ord) == 0 { THROW $conflict };\n",
        );
        for (j, _) in lines.iter().enumerate() {
            let _ = writeln!(sql, "UPDATE $cline_{j} SET status = $to;");
        }
        sql.push_str(
            "UPDATE payment SET status = 'PAID', timestamp = $now \
             WHERE order_id = $oid AND method = 'CASH' AND status = 'UNPAID';\n\
             COMMIT TRANSACTION;",
        );

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("order", record_id))
            .bind(("from", from))
            .bind(("to", OrderStatus::Completed))
            .bind(("now", now))
            .bind(("oid", order_id.to_string()))
            .bind(("conflict", format!("{}{}", CONFLICT_STATUS, order_id)));
        for (j, line) in lines.into_iter().enumerate() {
            query = query.bind((format!("cline_{j}"), line));
        }

        let response = query.await?;
        Self::check_txn(response)
    }

    /// Cancel an order: conditional status flip, line statuses, and the
    /// compensating restock of every line's listing, in one transaction
    pub async fn cancel_with_restock(
        &self,
        order_id: &str,
        from: OrderStatus,
        line_ids: &[String],
        restocks: &[StagedRestock],
        now: i64,
    ) -> RepoResult<()> {
        let record_id = parse_record_id(order_id)?;
        let lines = line_ids
            .iter()
            .map(|id| parse_record_id(id))
            .collect::<RepoResult<Vec<_>>>()?;

        let mut sql = String::from(
            "BEGIN TRANSACTION;\n\
             LET $ord = (UPDATE $order SET status = $to, updated_at = $now \
             WHERE status = $from RETURN AFTER);\n\
             IF array::len($ord) == 0 { THROW $conflict };\n",
        );
        for (j, _) in lines.iter().enumerate() {
            let _ = writeln!(sql, "UPDATE $cline_{j} SET status = $to;");
        }
        for (k, _) in restocks.iter().enumerate() {
            let _ = writeln!(
                sql,
                "UPDATE $rlisting_{k} SET quantity += $rqty_{k}, updated_at = $now;"
            );
        }
        sql.push_str("COMMIT TRANSACTION;");

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("order", record_id))
            .bind(("from", from))
            .bind(("to", OrderStatus::Canceled))
            .bind(("now", now))
            .bind(("conflict", format!("{}{}", CONFLICT_STATUS, order_id)));
        for (j, line) in lines.into_iter().enumerate() {
            query = query.bind((format!("cline_{j}"), line));
        }
        for (k, restock) in restocks.iter().enumerate() {
            query = query
                .bind((format!("rlisting_{k}"), restock.listing.clone()))
                .bind((format!("rqty_{k}"), restock.quantity));
        }

        let response = query.await?;
        Self::check_txn(response)
    }

    /// Surface transaction errors, preferring the thrown conflict marker
    ///
    /// 事务被 THROW 取消时所有语句都报错；逐条扫描找出真正的冲突标记。
    fn check_txn(mut response: surrealdb::Response) -> RepoResult<()> {
        let errors = response.take_errors();
        if errors.is_empty() {
            return Ok(());
        }

        let mut first: Option<String> = None;
        let mut retryable = false;
        for (_, err) in errors {
            let text = err.to_string();
            if let Some(pos) = text.find(CONFLICT_INSUFFICIENT) {
                return Err(RepoError::Conflict(text[pos..].trim_matches('\'').to_string()));
            }
            if let Some(pos) = text.find(CONFLICT_STATUS) {
                return Err(RepoError::Conflict(text[pos..].trim_matches('\'').to_string()));
            }
            // 存储引擎乐观并发冲突，事务可整体重试
            if text.contains("read or write conflict") || text.contains("can be retried") {
                retryable = true;
            }
            first.get_or_insert(text);
        }
        if retryable {
            return Err(RepoError::Conflict(CONFLICT_TXN_RETRY.to_string()));
        }
        Err(RepoError::Database(
            first.unwrap_or_else(|| "Transaction failed".to_string()),
        ))
    }
}
