// ==========================================
// 订单处理系统 - 流转审计日志领域模型
// ==========================================
// 红线: 状态变更写入必须记录
// 用途: 审计追踪，问题回溯
// 对齐: transition_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// TransitionLog - 流转审计日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionLog {
    // ===== 主键 =====
    pub log_id: String,        // 日志ID（UUID）
    pub order_id: Option<i64>, // 关联订单（批次级操作可为 None）

    // ===== 操作内容 =====
    pub action_type: String,        // 操作类型（存储为字符串）
    pub from_status: Option<String>, // 变更前状态字面量
    pub to_status: Option<String>,   // 变更后状态字面量

    // ===== 审计字段 =====
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 扩展字段 =====
    pub payload_json: Option<JsonValue>, // 操作参数（JSON）
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Ship,   // 发货流转（Pending/Processing → Shipped）
    Import, // 导入订单
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Ship => "SHIP",
            ActionType::Import => "IMPORT",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
