// ==========================================
// 订单处理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口，屏蔽数据库细节
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

pub mod error;
pub mod import_batch_repo;
pub mod order_repo;
pub mod transition_log_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use import_batch_repo::ImportBatchRepository;
pub use order_repo::{OrderRepository, StatusTransitionRow};
pub use transition_log_repo::TransitionLogRepository;
