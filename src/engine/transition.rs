// ==========================================
// 订单处理系统 - 状态流转引擎
// ==========================================
// 规则: Pending → Shipped; Processing → Shipped; Shipped 保持 Shipped
// 红线: 不直接写库，只做规则判定；落库由仓储层在事务内完成
// ==========================================
// 输入: 订单当前状态
// 输出: 流转判定（应用 / 幂等跳过 / 拒绝）
// ==========================================

use crate::domain::types::OrderStatus;

// ==========================================
// TransitionDecision - 流转判定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// 当前状态允许发货，应用 status := Shipped
    Apply,
    /// 已是 Shipped，幂等跳过（不触碰存储）
    AlreadyShipped,
    /// 其他状态（如 Cancelled）不得发货，显式拒绝而非静默
    Rejected,
}

// ==========================================
// TransitionEngine - 状态流转引擎
// ==========================================
#[derive(Debug, Default)]
pub struct TransitionEngine;

/// 允许流转到 Shipped 的起始状态集合
const SHIPPABLE_FROM: &[OrderStatus] = &[OrderStatus::Pending, OrderStatus::Processing];

impl TransitionEngine {
    /// 创建新的 TransitionEngine 实例
    pub fn new() -> Self {
        Self
    }

    /// 允许发货的起始状态集合（仓储层条件更新的守卫集）
    pub fn shippable_from(&self) -> &'static [OrderStatus] {
        SHIPPABLE_FROM
    }

    /// 发货流转的目标状态
    pub fn target_status(&self) -> OrderStatus {
        OrderStatus::Shipped
    }

    /// 判定单个订单的发货流转
    ///
    /// # 参数
    /// - current: 订单当前状态
    ///
    /// # 返回
    /// - TransitionDecision: Apply / AlreadyShipped / Rejected
    pub fn decide_shipment(&self, current: OrderStatus) -> TransitionDecision {
        if current == OrderStatus::Shipped {
            return TransitionDecision::AlreadyShipped;
        }
        if SHIPPABLE_FROM.contains(&current) {
            TransitionDecision::Apply
        } else {
            TransitionDecision::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_and_processing_ship() {
        let engine = TransitionEngine::new();
        assert_eq!(
            engine.decide_shipment(OrderStatus::Pending),
            TransitionDecision::Apply
        );
        assert_eq!(
            engine.decide_shipment(OrderStatus::Processing),
            TransitionDecision::Apply
        );
    }

    #[test]
    fn test_shipped_is_idempotent() {
        let engine = TransitionEngine::new();
        assert_eq!(
            engine.decide_shipment(OrderStatus::Shipped),
            TransitionDecision::AlreadyShipped
        );
    }

    #[test]
    fn test_cancelled_is_rejected() {
        // 已取消订单不得发货，必须显式拒绝而非静默改写
        let engine = TransitionEngine::new();
        assert_eq!(
            engine.decide_shipment(OrderStatus::Cancelled),
            TransitionDecision::Rejected
        );
    }

    #[test]
    fn test_shipped_not_in_guard_set() {
        // 守卫集与判定规则保持一致: Shipped 不在允许改写集合内
        let engine = TransitionEngine::new();
        assert!(!engine.shippable_from().contains(&OrderStatus::Shipped));
        assert!(!engine.shippable_from().contains(&OrderStatus::Cancelled));
    }
}
