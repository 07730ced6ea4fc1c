// ==========================================
// 订单处理系统 - 领域类型定义
// ==========================================
// 订单状态为字面量存储（orders.status TEXT 列）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 序列化格式: 与数据库字面量一致（Pending/Processing/Shipped/Cancelled）
// 红线: Shipped 为终态，流转引擎不得再改写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,    // 待处理
    Processing, // 处理中
    Shipped,    // 已发货（终态）
    Cancelled,  // 已取消（上游作废，不可发货）
}

impl OrderStatus {
    /// 数据库字面量
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// 从数据库字面量解析
    ///
    /// # 返回
    /// - Some(OrderStatus): 合法字面量
    /// - None: 未知状态值
    pub fn parse(s: &str) -> Option<OrderStatus> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "Processing" => Some(OrderStatus::Processing),
            "Shipped" => Some(OrderStatus::Shipped),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// 全部合法状态（用于校验/汇总）
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Cancelled,
        ]
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals_match_store() {
        assert_eq!(OrderStatus::Pending.as_str(), "Pending");
        assert_eq!(OrderStatus::Shipped.to_string(), "Shipped");
        assert_eq!(OrderStatus::parse("Processing"), Some(OrderStatus::Processing));
        assert_eq!(OrderStatus::parse("Cancelled"), Some(OrderStatus::Cancelled));
    }

    #[test]
    fn test_parse_rejects_unknown_literal() {
        // 未知状态不得静默落到默认值
        assert_eq!(OrderStatus::parse("Delivered"), None);
        assert_eq!(OrderStatus::parse("shipped"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }
}
