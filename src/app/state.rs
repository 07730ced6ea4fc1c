// ==========================================
// 订单处理系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 以显式传递的共享连接句柄取代全局连接状态；
//       连接获取按调用范围持锁，释放由 drop 保证
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ImportApi, OrderApi};
use crate::config::config_manager::ConfigManager;
use crate::db;
use crate::engine::transition::TransitionEngine;
use crate::importer::{
    CsvParser, OrderConflictHandler, OrderDqValidator, OrderFieldMapper, OrderImporterImpl,
};
use crate::repository::{ImportBatchRepository, OrderRepository, TransitionLogRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 订单API
    pub order_api: Arc<OrderApi>,

    /// 订单导入API
    pub import_api: Arc<ImportApi<ConfigManager>>,

    /// 订单仓储（供测试/维护任务直接使用）
    pub order_repo: Arc<OrderRepository>,

    /// 流转审计日志仓储（用于审计追踪）
    pub transition_log_repo: Arc<TransitionLogRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并应用统一 PRAGMA
    /// 2. 初始化 schema（幂等）
    /// 3. 初始化所有Repository与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接，统一 PRAGMA）
        let conn = db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        // 初始化 schema（幂等）
        db::init_schema(&conn).map_err(|e| format!("无法初始化 schema: {}", e))?;

        // schema 版本提示（不做自动迁移）
        match db::read_schema_version(&conn) {
            Ok(Some(v)) if v != db::CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    "schema_version={} 与期望版本 {} 不一致",
                    v,
                    db::CURRENT_SCHEMA_VERSION
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("schema_version 读取失败(将继续启动): {}", e);
            }
        }

        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let order_repo = Arc::new(OrderRepository::from_connection(conn.clone()));
        let transition_log_repo = Arc::new(TransitionLogRepository::new(conn.clone()));
        let import_batch_repo = Arc::new(ImportBatchRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // 状态流转引擎
        let transition_engine = Arc::new(TransitionEngine::new());

        // ==========================================
        // 初始化API层
        // ==========================================

        // 订单API
        let order_api = Arc::new(OrderApi::new(
            order_repo.clone(),
            transition_log_repo.clone(),
            transition_engine,
            config_manager.clone(),
        ));

        // 订单导入API
        let importer = OrderImporterImpl::new(
            order_repo.clone(),
            import_batch_repo.clone(),
            transition_log_repo.clone(),
            config_manager.clone(),
            Box::new(CsvParser),
            Box::new(OrderFieldMapper),
            Box::new(OrderDqValidator),
            Box::new(OrderConflictHandler),
        );
        let import_api = Arc::new(ImportApi::new(importer, import_batch_repo));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            order_api,
            import_api,
            order_repo,
            transition_log_repo,
            config_manager,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 优先使用环境变量 ORDER_FLOW_DB_PATH（便于调试/测试/CI）
/// - 否则使用用户数据目录/order-flow/order_flow.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径
    if let Ok(path) = std::env::var("ORDER_FLOW_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // 先给一个默认回退值，后续如果能拿到 data_dir 再覆盖
    let mut path = PathBuf::from("./order_flow.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("order-flow");
        // 确保目录存在
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("order_flow.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的测试需要真实的数据库文件
    // 这些测试在集成测试中进行
}
