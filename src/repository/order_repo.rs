use crate::db::open_sqlite_connection;
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单数据仓储
// ==========================================
/// 订单数据仓储
/// 职责: 管理 orders 表的数据访问
/// 红线: 不含业务逻辑，只负责数据访问；流转规则由引擎层给定
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

/// 单行状态变更结果
///
/// 说明：
/// - old_status == new_status 表示本次调用未改写该行
///   （当前状态不在 allowed_from 内，或已等于目标状态）；
/// - 解释（幂等/拒绝）由引擎层完成，仓储只报告事实。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransitionRow {
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
}

impl OrderRepository {
    /// 创建新的 OrderRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 行 → Order 映射
    fn map_order_row(row: &Row<'_>) -> SqliteResult<Order> {
        let status_raw: String = row.get(4)?;
        let status = OrderStatus::parse(&status_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("未知订单状态字面量: {}", status_raw).into(),
            )
        })?;

        Ok(Order {
            order_id: row.get(0)?,
            customer_code: row.get(1)?,
            total_amount: row.get(2)?,
            placed_at: row
                .get::<_, Option<String>>(3)?
                .and_then(|s| chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            status,
            created_at: row
                .get::<_, String>(5)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_by: row.get(7)?,
        })
    }

    const ORDER_COLUMNS: &'static str = r#"
        order_id, customer_code, total_amount, placed_at, status,
        created_at, updated_at, updated_by
    "#;

    /// 插入单个订单
    ///
    /// # 返回
    /// - Ok(()): 插入成功
    /// - Err(UniqueConstraintViolation): order_id 已存在
    pub fn insert_order(&self, order: &Order) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO orders (
                order_id, customer_code, total_amount, placed_at, status,
                created_at, updated_at, updated_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                order.order_id,
                order.customer_code,
                order.total_amount,
                order.placed_at.map(|d| d.to_string()),
                order.status.as_str(),
                order.created_at.to_rfc3339(),
                order.updated_at.to_rfc3339(),
                order.updated_by,
            ],
        )?;
        Ok(())
    }

    /// 批量写入订单（upsert）
    ///
    /// # 参数
    /// - orders: 订单列表
    /// - update_existing: 已存在的 order_id 是否更新（false 时跳过）
    ///
    /// # 返回
    /// - Ok(usize): 实际写入的记录数
    ///
    /// # 说明
    /// - 使用事务确保整批原子性
    /// - upsert 不改写 created_at，status 以导入数据为准
    pub fn batch_upsert_orders(
        &self,
        orders: Vec<Order>,
        update_existing: bool,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        {
            let sql = if update_existing {
                r#"
                INSERT INTO orders (
                    order_id, customer_code, total_amount, placed_at, status,
                    created_at, updated_at, updated_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(order_id) DO UPDATE SET
                    customer_code = excluded.customer_code,
                    total_amount = excluded.total_amount,
                    placed_at = excluded.placed_at,
                    status = excluded.status,
                    updated_at = excluded.updated_at,
                    updated_by = excluded.updated_by
                "#
            } else {
                r#"
                INSERT OR IGNORE INTO orders (
                    order_id, customer_code, total_amount, placed_at, status,
                    created_at, updated_at, updated_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#
            };

            let mut stmt = tx.prepare(sql)?;
            for order in orders {
                count += stmt.execute(params![
                    order.order_id,
                    order.customer_code,
                    order.total_amount,
                    order.placed_at.map(|d| d.to_string()),
                    order.status.as_str(),
                    order.created_at.to_rfc3339(),
                    order.updated_at.to_rfc3339(),
                    order.updated_by,
                ])?;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// 按 order_id 查询订单
    ///
    /// # 返回
    /// - Ok(Some(Order)): 找到记录
    /// - Ok(None): 未找到记录
    pub fn find_by_id(&self, order_id: i64) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM orders WHERE order_id = ?1",
            Self::ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let result = stmt
            .query_row(params![order_id], Self::map_order_row)
            .optional()?;
        Ok(result)
    }

    /// 按 order_id 查询当前状态
    ///
    /// # 返回
    /// - Ok(OrderStatus): 当前状态
    /// - Err(NotFound): 订单不存在
    pub fn find_status(&self, order_id: i64) -> RepositoryResult<OrderStatus> {
        let conn = self.get_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT status FROM orders WHERE order_id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            None => Err(RepositoryError::NotFound {
                entity: "Order".to_string(),
                id: order_id.to_string(),
            }),
            Some(s) => OrderStatus::parse(&s).ok_or(RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知订单状态字面量: {}", s),
            }),
        }
    }

    /// 单行受控状态变更（事务内 读取 → 条件更新）
    ///
    /// # 参数
    /// - order_id: 订单号
    /// - allowed_from: 允许改写的当前状态集合（引擎层给定）
    /// - to: 目标状态
    /// - updated_by: 操作人/系统标识
    ///
    /// # 返回
    /// - Ok(StatusTransitionRow): 变更前后状态（未改写时两者相等）
    /// - Err(NotFound): 订单不存在
    ///
    /// # 说明
    /// - 读取与条件更新在同一事务内完成，避免并发流转请求间的丢失更新；
    /// - 当前状态 ∉ allowed_from 时不触碰该行，由引擎层解释幂等/拒绝。
    pub fn apply_transition(
        &self,
        order_id: i64,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        updated_by: &str,
    ) -> RepositoryResult<StatusTransitionRow> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT status FROM orders WHERE order_id = ?1",
                params![order_id],
                |row| row.get(0),
            )
            .optional()?;

        let old_status = match raw {
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "Order".to_string(),
                    id: order_id.to_string(),
                })
            }
            Some(s) => OrderStatus::parse(&s).ok_or(RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知订单状态字面量: {}", s),
            })?,
        };

        let new_status = if allowed_from.contains(&old_status) {
            tx.execute(
                r#"
                UPDATE orders
                SET status = ?1, updated_at = ?2, updated_by = ?3
                WHERE order_id = ?4
                "#,
                params![
                    to.as_str(),
                    Utc::now().to_rfc3339(),
                    updated_by,
                    order_id
                ],
            )?;
            to
        } else {
            old_status
        };

        tx.commit()?;
        Ok(StatusTransitionRow {
            old_status,
            new_status,
        })
    }

    /// 按状态查询订单（带分页）
    pub fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i32,
        offset: i32,
    ) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM orders
            WHERE status = ?1
            ORDER BY order_id
            LIMIT ?2 OFFSET ?3
            "#,
            Self::ORDER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let orders = stmt
            .query_map(
                params![status.as_str(), limit, offset],
                Self::map_order_row,
            )?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 查询所有订单（带分页）
    ///
    /// # 参数
    /// - limit: 返回记录数上限（0 或负数表示不限制）
    /// - offset: 偏移量（分页）
    pub fn list_all(&self, limit: i32, offset: i32) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;

        // 根据 limit 决定是否使用分页
        let sql = if limit > 0 {
            format!(
                "SELECT {} FROM orders ORDER BY order_id LIMIT {} OFFSET {}",
                Self::ORDER_COLUMNS,
                limit,
                offset
            )
        } else {
            format!("SELECT {} FROM orders ORDER BY order_id", Self::ORDER_COLUMNS)
        };

        let mut stmt = conn.prepare(&sql)?;
        let orders = stmt
            .query_map([], Self::map_order_row)?
            .collect::<SqliteResult<Vec<Order>>>()?;
        Ok(orders)
    }

    /// 按状态统计订单数
    ///
    /// # 返回
    /// - Ok(Vec<(OrderStatus, i64)>): 每个出现过的状态及其订单数
    pub fn count_by_status(&self) -> RepositoryResult<Vec<(OrderStatus, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status",
        )?;

        let rows = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((raw, count))
            })?
            .collect::<SqliteResult<Vec<(String, i64)>>>()?;

        let mut result = Vec::with_capacity(rows.len());
        for (raw, count) in rows {
            let status = OrderStatus::parse(&raw).ok_or(RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知订单状态字面量: {}", raw),
            })?;
            result.push((status, count));
        }
        Ok(result)
    }

    /// 批量检查订单是否存在（用于导入冲突检测）
    ///
    /// # 返回
    /// - Ok(Vec<i64>): 已存在的 order_id 列表
    pub fn batch_check_exists(&self, order_ids: &[i64]) -> RepositoryResult<Vec<i64>> {
        if order_ids.is_empty() {
            return Ok(vec![]);
        }

        const CHUNK_SIZE: usize = 900;

        let conn = self.get_conn()?;
        let mut existing = Vec::new();

        for chunk in order_ids.chunks(CHUNK_SIZE) {
            let placeholders = std::iter::repeat("?")
                .take(chunk.len())
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT order_id FROM orders WHERE order_id IN ({})",
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let ids = stmt
                .query_map(params_vec.as_slice(), |row| row.get::<_, i64>(0))?
                .collect::<SqliteResult<Vec<i64>>>()?;
            existing.extend(ids);
        }

        Ok(existing)
    }
}
