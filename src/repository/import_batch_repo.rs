use crate::domain::order::ImportBatch;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ImportBatchRepository - 导入批次仓储
// ==========================================
// 红线: Repository 不做业务逻辑，只做数据映射
pub struct ImportBatchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportBatchRepository {
    /// 创建新的导入批次仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行 → ImportBatch 映射
    fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
        Ok(ImportBatch {
            batch_id: row.get(0)?,
            file_name: row.get(1)?,
            total_rows: row.get(2)?,
            success_rows: row.get(3)?,
            blocked_rows: row.get(4)?,
            conflict_rows: row.get(5)?,
            imported_at: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&chrono::Utc)),
            imported_by: row.get(7)?,
            elapsed_ms: row.get(8)?,
            dq_report_json: row.get(9)?,
        })
    }

    /// 插入导入批次记录
    pub fn insert(&self, batch: &ImportBatch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, total_rows, success_rows, blocked_rows,
                conflict_rows, imported_at, imported_by, elapsed_ms, dq_report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.total_rows,
                batch.success_rows,
                batch.blocked_rows,
                batch.conflict_rows,
                batch.imported_at.map(|dt| dt.to_rfc3339()),
                batch.imported_by,
                batch.elapsed_ms,
                batch.dq_report_json,
            ],
        )?;
        Ok(())
    }

    /// 按 batch_id 查询批次记录
    pub fn find_by_id(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                r#"
                SELECT batch_id, file_name, total_rows, success_rows, blocked_rows,
                       conflict_rows, imported_at, imported_by, elapsed_ms, dq_report_json
                FROM import_batch
                WHERE batch_id = ?1
                "#,
                params![batch_id],
                Self::map_batch_row,
            )
            .optional()?;
        Ok(result)
    }

    /// 查询最近的导入批次（时间倒序）
    pub fn list_recent(&self, limit: i32) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT batch_id, file_name, total_rows, success_rows, blocked_rows,
                   conflict_rows, imported_at, imported_by, elapsed_ms, dq_report_json
            FROM import_batch
            ORDER BY imported_at DESC
            LIMIT ?1
            "#,
        )?;

        let batches = stmt
            .query_map(params![limit], Self::map_batch_row)?
            .collect::<rusqlite::Result<Vec<ImportBatch>>>()?;
        Ok(batches)
    }
}
