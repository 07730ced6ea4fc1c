// ==========================================
// 订单处理系统 - 订单 API
// ==========================================
// 职责: 订单查询、发货流转、流转审计
// 约定: 状态变更写入必须记录审计日志（可解释性）
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::order::Order;
use crate::domain::transition_log::{ActionType, TransitionLog};
use crate::domain::types::OrderStatus;
use crate::engine::transition::{TransitionDecision, TransitionEngine};
use crate::repository::order_repo::OrderRepository;
use crate::repository::transition_log_repo::TransitionLogRepository;

// ==========================================
// TransitionOutcome - 发货流转结果
// ==========================================
/// 发货流转结果（old_status == new_status 表示幂等跳过）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order_id: i64,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed: bool,
}

// ==========================================
// StatusCount - 状态汇总
// ==========================================
/// 用于前端展示的状态分布汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

// ==========================================
// OrderApi - 订单 API
// ==========================================

/// 订单API
///
/// 职责：
/// 1. 订单查询（单条、列表、状态汇总）
/// 2. 发货流转（transition_to_shipped）
/// 3. 瞬时存储错误的有限次重试
/// 4. TransitionLog记录
pub struct OrderApi {
    order_repo: Arc<OrderRepository>,
    log_repo: Arc<TransitionLogRepository>,
    engine: Arc<TransitionEngine>,
    config: Arc<ConfigManager>,
}

impl OrderApi {
    /// 创建新的OrderApi实例
    ///
    /// # 参数
    /// - order_repo: 订单数据仓储
    /// - log_repo: 流转审计日志仓储
    /// - engine: 状态流转引擎
    /// - config: 配置管理器
    pub fn new(
        order_repo: Arc<OrderRepository>,
        log_repo: Arc<TransitionLogRepository>,
        engine: Arc<TransitionEngine>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            order_repo,
            log_repo,
            engine,
            config,
        }
    }

    // ==========================================
    // 发货流转
    // ==========================================

    /// 将订单流转为 Shipped
    ///
    /// # 规则
    /// - Pending/Processing → Shipped（落库并记录审计）
    /// - Shipped → Shipped（幂等跳过，不触碰存储，不写审计）
    /// - 其他状态（如 Cancelled）→ InvalidStateTransition
    ///
    /// # 参数
    /// - order_id: 订单号
    /// - actor: 操作人/系统标识
    ///
    /// # 返回
    /// - Ok(TransitionOutcome): 变更前后状态
    /// - Err(NotFound): 订单不存在
    /// - Err(InvalidStateTransition): 当前状态不允许发货
    /// - Err(StoreUnavailable): 存储失败且瞬时错误重试耗尽
    #[instrument(skip(self), fields(order_id = order_id, actor = %actor))]
    pub fn transition_to_shipped(
        &self,
        order_id: i64,
        actor: &str,
    ) -> ApiResult<TransitionOutcome> {
        // 参数验证
        if order_id <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "订单号必须为正: {}",
                order_id
            )));
        }
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let max_retries = self
            .config
            .get_transition_max_retries()
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))?;

        // 受控更新：读取与条件改写在仓储层同一事务内完成；
        // 仅对瞬时错误（busy/locked）做有限次重试
        let mut attempt: u32 = 0;
        let row = loop {
            match self.order_repo.apply_transition(
                order_id,
                self.engine.shippable_from(),
                self.engine.target_status(),
                actor,
            ) {
                Ok(row) => break row,
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        order_id = order_id,
                        attempt = attempt,
                        error = %e,
                        "发货流转遇到瞬时存储错误，重试"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        };

        // 引擎判定结果解释
        match self.engine.decide_shipment(row.old_status) {
            TransitionDecision::Apply => {
                let log = TransitionLog {
                    log_id: uuid::Uuid::new_v4().to_string(),
                    order_id: Some(order_id),
                    action_type: ActionType::Ship.to_string(),
                    from_status: Some(row.old_status.to_string()),
                    to_status: Some(row.new_status.to_string()),
                    action_ts: chrono::Utc::now().naive_utc(),
                    actor: actor.to_string(),
                    payload_json: Some(serde_json::json!({ "order_id": order_id })),
                    detail: None,
                };
                self.log_repo.insert(&log)?;

                info!(
                    order_id = order_id,
                    from = %row.old_status,
                    to = %row.new_status,
                    "订单已发货"
                );
                Ok(TransitionOutcome {
                    order_id,
                    old_status: row.old_status,
                    new_status: row.new_status,
                    changed: true,
                })
            }
            TransitionDecision::AlreadyShipped => {
                debug!(order_id = order_id, "订单已是 Shipped，幂等跳过");
                Ok(TransitionOutcome {
                    order_id,
                    old_status: row.old_status,
                    new_status: row.new_status,
                    changed: false,
                })
            }
            TransitionDecision::Rejected => {
                warn!(
                    order_id = order_id,
                    from = %row.old_status,
                    "当前状态不允许发货"
                );
                Err(ApiError::InvalidStateTransition {
                    from: row.old_status.to_string(),
                    to: OrderStatus::Shipped.to_string(),
                })
            }
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询单个订单
    ///
    /// # 返回
    /// - Ok(Order): 订单
    /// - Err(NotFound): 订单不存在
    pub fn get_order(&self, order_id: i64) -> ApiResult<Order> {
        if order_id <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "订单号必须为正: {}",
                order_id
            )));
        }

        self.order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Order(id={})不存在", order_id)))
    }

    /// 查询订单列表（可按状态过滤，带分页）
    ///
    /// # 参数
    /// - status: 可选状态过滤
    /// - limit: 返回记录数上限（0 或负数表示不限制；过滤查询时按 1000 截断）
    /// - offset: 偏移量（分页）
    pub fn list_orders(
        &self,
        status: Option<OrderStatus>,
        limit: i32,
        offset: i32,
    ) -> ApiResult<Vec<Order>> {
        if offset < 0 {
            return Err(ApiError::InvalidInput(format!("偏移量不能为负: {}", offset)));
        }

        let orders = match status {
            Some(status) => {
                let effective_limit = if limit > 0 { limit } else { 1000 };
                self.order_repo
                    .list_by_status(status, effective_limit, offset)?
            }
            None => self.order_repo.list_all(limit, offset)?,
        };
        Ok(orders)
    }

    /// 状态分布汇总
    pub fn get_status_summary(&self) -> ApiResult<Vec<StatusCount>> {
        let counts = self.order_repo.count_by_status()?;
        Ok(counts
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect())
    }

    /// 查询订单的流转日志（时间倒序）
    pub fn list_transition_logs(
        &self,
        order_id: i64,
        limit: i32,
    ) -> ApiResult<Vec<crate::domain::transition_log::TransitionLog>> {
        if order_id <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "订单号必须为正: {}",
                order_id
            )));
        }

        let effective_limit = if limit > 0 { limit } else { 100 };
        Ok(self.log_repo.list_by_order(order_id, effective_limit)?)
    }

    // ==========================================
    // 维护接口
    // ==========================================

    /// 清理保留期之外的流转日志
    ///
    /// # 返回
    /// - Ok(usize): 被删除的日志行数
    pub fn purge_expired_logs(&self) -> ApiResult<usize> {
        let retention_days = self
            .config
            .get_log_retention_days()
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))?;

        let purged = self.log_repo.purge_older_than(retention_days)?;
        if purged > 0 {
            info!(purged = purged, retention_days = retention_days, "已清理过期流转日志");
        }
        Ok(purged)
    }
}
