// ==========================================
// 订单处理系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ===== 配置键与默认值 =====
pub const KEY_TRANSITION_MAX_RETRIES: &str = "transition_max_retries";
pub const KEY_AMOUNT_ANOMALY_THRESHOLD: &str = "amount_anomaly_threshold";
pub const KEY_IMPORT_UPDATE_EXISTING: &str = "import_update_existing";
pub const KEY_LOG_RETENTION_DAYS: &str = "log_retention_days";

pub const DEFAULT_TRANSITION_MAX_RETRIES: u32 = 3;
pub const DEFAULT_AMOUNT_ANOMALY_THRESHOLD: f64 = 1_000_000.0;
pub const DEFAULT_LOG_RETENTION_DAYS: i64 = 90;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（upsert）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    // ==========================================
    // 类型化配置读取
    // ==========================================

    /// 流转瞬时错误最大重试次数
    pub fn get_transition_max_retries(&self) -> Result<u32, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_TRANSITION_MAX_RETRIES,
            &DEFAULT_TRANSITION_MAX_RETRIES.to_string(),
        )?;
        raw.parse::<u32>()
            .map_err(|e| format!("配置 {} 格式错误 ({}): {}", KEY_TRANSITION_MAX_RETRIES, raw, e).into())
    }

    /// 订单金额异常阈值（导入 DQ 校验上限）
    pub fn get_amount_anomaly_threshold(&self) -> Result<f64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_AMOUNT_ANOMALY_THRESHOLD,
            &DEFAULT_AMOUNT_ANOMALY_THRESHOLD.to_string(),
        )?;
        raw.parse::<f64>()
            .map_err(|e| format!("配置 {} 格式错误 ({}): {}", KEY_AMOUNT_ANOMALY_THRESHOLD, raw, e).into())
    }

    /// 导入时已存在订单是否更新（'1'=更新，'0'=跳过）
    pub fn get_import_update_existing(&self) -> Result<bool, Box<dyn Error>> {
        let raw = self.get_config_or_default(KEY_IMPORT_UPDATE_EXISTING, "1")?;
        Ok(raw == "1")
    }

    /// 流转审计日志保留天数
    pub fn get_log_retention_days(&self) -> Result<i64, Box<dyn Error>> {
        let raw = self.get_config_or_default(
            KEY_LOG_RETENTION_DAYS,
            &DEFAULT_LOG_RETENTION_DAYS.to_string(),
        )?;
        raw.parse::<i64>()
            .map_err(|e| format!("配置 {} 格式错误 ({}): {}", KEY_LOG_RETENTION_DAYS, raw, e).into())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 审计/问题回溯时记录当时生效的配置
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut kv = HashMap::new();
        for row in rows {
            let (k, v) = row?;
            kv.insert(k, v);
        }

        Ok(json!(kv).to_string())
    }
}

// ==========================================
// ImportConfigReader 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_amount_anomaly_threshold(&self) -> Result<f64, Box<dyn Error>> {
        ConfigManager::get_amount_anomaly_threshold(self)
    }

    async fn get_import_update_existing(&self) -> Result<bool, Box<dyn Error>> {
        ConfigManager::get_import_update_existing(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn memory_config() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        db::configure_sqlite_connection(&conn).unwrap();
        db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = memory_config();
        assert_eq!(
            config.get_transition_max_retries().unwrap(),
            DEFAULT_TRANSITION_MAX_RETRIES
        );
        assert!(config.get_import_update_existing().unwrap());
        assert_eq!(
            config.get_log_retention_days().unwrap(),
            DEFAULT_LOG_RETENTION_DAYS
        );
    }

    #[test]
    fn test_set_and_read_back() {
        let config = memory_config();
        config
            .set_global_config_value(KEY_TRANSITION_MAX_RETRIES, "5")
            .unwrap();
        assert_eq!(config.get_transition_max_retries().unwrap(), 5);

        config
            .set_global_config_value(KEY_IMPORT_UPDATE_EXISTING, "0")
            .unwrap();
        assert!(!config.get_import_update_existing().unwrap());
    }

    #[test]
    fn test_invalid_value_is_error() {
        // 非法配置值应显式报错，不得静默回退默认值
        let config = memory_config();
        config
            .set_global_config_value(KEY_TRANSITION_MAX_RETRIES, "abc")
            .unwrap();
        assert!(config.get_transition_max_retries().is_err());
    }
}
