// ==========================================
// 订单处理系统 - 应用层
// ==========================================
// 职责: 应用组装（共享连接、Repository、API 实例）
// ==========================================

pub mod state;

pub use state::{get_default_db_path, AppState};
