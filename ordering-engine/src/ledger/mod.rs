//! Quantity Ledger
//!
//! 进程内库存快照缓存：product id → {quantity, updated_at}。
//!
//! 只是读路径加速，不是正确性仲裁者。快照的 `updated_at` 与持久化
//! 条目一致时才可信（见 inventory guard）；写入只发生在工作单元
//! 持久提交之后，失败路径最多留下陈旧快照，下次读取时自动修复。

use dashmap::DashMap;
use std::sync::Arc;

/// Cached mirror of a listing's available quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantitySnapshot {
    pub quantity: i32,
    pub updated_at: i64,
}

/// Shared, clone-cheap quantity cache keyed by product id
#[derive(Debug, Clone, Default)]
pub struct QuantityLedger {
    entries: Arc<DashMap<String, QuantitySnapshot>>,
}

impl QuantityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取商品快照
    pub fn get(&self, product_id: &str) -> Option<QuantitySnapshot> {
        self.entries.get(product_id).map(|entry| *entry.value())
    }

    /// 覆盖商品快照（每个商品一条，持续覆盖）
    pub fn put(&self, product_id: &str, quantity: i32, updated_at: i64) {
        self.entries.insert(
            product_id.to_string(),
            QuantitySnapshot {
                quantity,
                updated_at,
            },
        );
    }

    /// 移除商品快照
    pub fn invalidate(&self, product_id: &str) {
        self.entries.remove(product_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
