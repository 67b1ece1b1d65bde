//! Plaza Ordering Engine - 社区商城订单聚合与库存一致性引擎
//!
//! # 架构概述
//!
//! 本 crate 是社区商城后端的订单核心，提供以下功能：
//!
//! - **订单聚合** (`ordering::aggregator`): 按商家店铺分组生成订单
//! - **库存守卫** (`ordering::guard`): 快照校验 + 条件扣减，杜绝超卖
//! - **数量账本** (`ledger`): 进程内库存快照缓存（读穿透，提交后回写）
//! - **状态机** (`ordering::transition`): 订单状态流转与取消回补
//! - **数据库** (`db`): 嵌入式 SurrealDB 存储
//!
//! # 模块结构
//!
//! ```text
//! ordering-engine/src/
//! ├── core/          # 配置
//! ├── utils/         # 日志、时间工具
//! ├── db/            # 数据库层（models + repository）
//! ├── ledger/        # 数量账本缓存
//! └── ordering/      # 聚合、守卫、金额、状态流转
//! ```

pub mod core;
pub mod db;
pub mod ledger;
pub mod ordering;
pub mod utils;

// Re-export 公共类型
pub use crate::core::Config;
pub use db::DbService;
pub use ledger::{QuantityLedger, QuantitySnapshot};
pub use ordering::{
    Actor, LineItemRequest, OrderingError, OrderingResult, OrderingService, PlaceOrderRequest,
};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
