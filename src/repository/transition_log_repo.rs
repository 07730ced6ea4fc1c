use crate::domain::transition_log::TransitionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// TransitionLogRepository - 流转审计日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑，只做数据映射
pub struct TransitionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransitionLogRepository {
    /// 创建新的流转审计日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行 → TransitionLog 映射
    fn map_log_row(row: &Row<'_>) -> SqliteResult<TransitionLog> {
        Ok(TransitionLog {
            log_id: row.get(0)?,
            order_id: row.get(1)?,
            action_type: row.get(2)?,
            from_status: row.get(3)?,
            to_status: row.get(4)?,
            action_ts: {
                let raw: String = row.get(5)?;
                chrono::NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
                    .unwrap_or_else(|_| chrono::Utc::now().naive_utc())
            },
            actor: row.get(6)?,
            payload_json: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| serde_json::from_str(&s).ok()),
            detail: row.get(8)?,
        })
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入流转审计日志
    ///
    /// # 返回
    /// - Ok(log_id): 成功插入，返回 log_id
    pub fn insert(&self, log: &TransitionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO transition_log (
                log_id, order_id, action_type, from_status, to_status,
                action_ts, actor, payload_json, detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                log.log_id,
                log.order_id,
                log.action_type,
                log.from_status,
                log.to_status,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.log_id.clone())
    }

    /// 批量插入流转审计日志
    pub fn batch_insert(&self, logs: Vec<TransitionLog>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transition_log (
                    log_id, order_id, action_type, from_status, to_status,
                    action_ts, actor, payload_json, detail
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;

            for log in logs {
                stmt.execute(params![
                    log.log_id,
                    log.order_id,
                    log.action_type,
                    log.from_status,
                    log.to_status,
                    log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                    log.actor,
                    log.payload_json.as_ref().map(|v| v.to_string()),
                    log.detail,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按订单号查询流转日志（时间倒序）
    pub fn list_by_order(&self, order_id: i64, limit: i32) -> RepositoryResult<Vec<TransitionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT log_id, order_id, action_type, from_status, to_status,
                   action_ts, actor, payload_json, detail
            FROM transition_log
            WHERE order_id = ?1
            ORDER BY action_ts DESC, log_id DESC
            LIMIT ?2
            "#,
        )?;

        let logs = stmt
            .query_map(params![order_id, limit], Self::map_log_row)?
            .collect::<SqliteResult<Vec<TransitionLog>>>()?;
        Ok(logs)
    }

    /// 查询最近的流转日志（时间倒序）
    pub fn list_recent(&self, limit: i32) -> RepositoryResult<Vec<TransitionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT log_id, order_id, action_type, from_status, to_status,
                   action_ts, actor, payload_json, detail
            FROM transition_log
            ORDER BY action_ts DESC, log_id DESC
            LIMIT ?1
            "#,
        )?;

        let logs = stmt
            .query_map(params![limit], Self::map_log_row)?
            .collect::<SqliteResult<Vec<TransitionLog>>>()?;
        Ok(logs)
    }

    /// 按订单号统计日志条数
    pub fn count_by_order(&self, order_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transition_log WHERE order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 清理操作
    // ==========================================

    /// 清理保留期之外的历史日志
    ///
    /// # 参数
    /// - retention_days: 保留天数（配置 log_retention_days）
    ///
    /// # 返回
    /// - Ok(usize): 被删除的行数
    pub fn purge_older_than(&self, retention_days: i64) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM transition_log WHERE action_ts < datetime('now', ?1)",
            params![format!("-{} days", retention_days)],
        )?;
        Ok(rows)
    }
}
