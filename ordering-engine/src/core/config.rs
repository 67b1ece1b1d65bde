/// 引擎配置 - 订单核心的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/plaza/ordering | 工作目录（数据库、日志） |
/// | ENVIRONMENT | development | 运行环境 |
/// | RESERVE_MAX_RETRIES | 3 | 库存扣减冲突重试次数 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/plaza RESERVE_MAX_RETRIES=5 cargo test
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 库存条件扣减冲突时的最大重试次数
    pub reserve_max_retries: u32,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR")
                .unwrap_or_else(|_| "/var/lib/plaza/ordering".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            reserve_max_retries: std::env::var("RESERVE_MAX_RETRIES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, reserve_max_retries: u32) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.reserve_max_retries = reserve_max_retries;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
