// ==========================================
// 订单处理系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 订单状态流转服务（订单由外部创建，本核心只做流转）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::OrderStatus;

// 领域实体
pub use domain::{ImportBatch, ImportReport, Order, TransitionLog};

// 引擎
pub use engine::{TransitionDecision, TransitionEngine};

// API
pub use api::{ApiError, ApiResult, ImportApi, OrderApi, TransitionOutcome};

// 应用
pub use app::{get_default_db_path, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "订单状态流转服务";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
