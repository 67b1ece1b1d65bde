//! Repository Module
//!
//! Provides storage operations over SurrealDB tables using record links
//! and graph edges.

// Parties
pub mod resident;

// Menu Domain
pub mod catalog;

// Orders
pub mod order;
pub mod payment;

// Re-exports
pub use catalog::CatalogRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use resident::ResidentRepository;

use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional write lost to a concurrent writer; the carried
    /// marker ("INSUFFICIENT:…" / "STATUS_CONFLICT:…") names the loser
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

// =============================================================================
// ID Convention: 全栈统一使用 "table:id" 格式
// =============================================================================
//
// 使用 surrealdb::RecordId 处理所有 ID：
//   - 解析: let id: RecordId = "order:abc".parse()?;
//   - 创建: new_record_id("order")
//   - 查询输出用 <string>id 转成字符串交给服务层

/// Parse a full "table:id" string, mapping failure to NotFound
pub(crate) fn parse_record_id(id: &str) -> RepoResult<RecordId> {
    id.parse()
        .map_err(|_| RepoError::NotFound(format!("Invalid record ID format: {}", id)))
}

/// Generate a fresh record id with a uuid key
pub(crate) fn new_record_id(table: &str) -> RecordId {
    RecordId::from_table_key(table, uuid::Uuid::new_v4().simple().to_string())
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
